//! Position bounded context.
//!
//! Value objects for option references, legs, and iron-fly structures,
//! including the ACTIVE → CLOSED position lifecycle.

mod errors;

/// Value objects for the position context.
pub mod value_objects;

pub use errors::PositionError;
pub use value_objects::{Fly, FlyDraft, Leg, OptionReference, OptionRight, PositionSide};
