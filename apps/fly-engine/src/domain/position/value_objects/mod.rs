//! Position Value Objects

mod fly;
mod leg;
mod option_reference;

pub use fly::{Fly, FlyDraft};
pub use leg::{Leg, PositionSide};
pub use option_reference::{OptionReference, OptionRight};
