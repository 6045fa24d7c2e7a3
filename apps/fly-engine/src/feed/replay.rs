//! JSON-lines mark replay feed.
//!
//! Reads one batch of [`MarkUpdate`]s per line (a JSON array), yielding one
//! batch per cycle. Used to drive the engine from recorded data; live
//! transports implement [`MarkFeed`](super::MarkFeed) outside this crate.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use tracing::warn;

use super::{MarkFeed, MarkUpdate};

/// Replays recorded mark batches from a JSON-lines file.
#[derive(Debug)]
pub struct JsonlMarkFeed {
    lines: Lines<BufReader<File>>,
    path: String,
    line_no: usize,
}

impl JsonlMarkFeed {
    /// Open a replay feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.display().to_string(),
            line_no: 0,
        })
    }
}

impl MarkFeed for JsonlMarkFeed {
    fn poll_marks(&mut self) -> Option<Vec<MarkUpdate>> {
        loop {
            self.line_no += 1;
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match serde_json::from_str::<Vec<MarkUpdate>>(&line) {
                    Ok(batch) => return Some(batch),
                    Err(e) => {
                        // A malformed line is transient data, not fatal.
                        warn!(
                            path = %self.path,
                            line = self.line_no,
                            error = %e,
                            "Skipping unparseable mark batch"
                        );
                    }
                },
                Err(e) => {
                    warn!(path = %self.path, line = self.line_no, error = %e, "Read error in mark replay");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::value_objects::OptionReference;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn update() -> MarkUpdate {
        MarkUpdate::from_quote(
            OptionReference::call(
                "SPX",
                dec!(6000),
                NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
                "",
            ),
            Some(dec!(2.40)),
            Some(dec!(2.60)),
            "2025-08-15T15:00:00Z".parse().unwrap(),
        )
    }

    #[test]
    fn replays_batches_line_by_line() {
        let batch = vec![update()];
        let line = serde_json::to_string(&batch).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{line}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{line}").unwrap();
        file.flush().unwrap();

        let mut feed = JsonlMarkFeed::open(file.path()).unwrap();
        assert_eq!(feed.poll_marks(), Some(batch.clone()));
        assert_eq!(feed.poll_marks(), Some(batch));
        assert_eq!(feed.poll_marks(), None);
    }

    #[test]
    fn skips_malformed_lines() {
        let batch = vec![update()];
        let line = serde_json::to_string(&batch).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, "{line}").unwrap();
        file.flush().unwrap();

        let mut feed = JsonlMarkFeed::open(file.path()).unwrap();
        assert_eq!(feed.poll_marks(), Some(batch));
        assert_eq!(feed.poll_marks(), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(JsonlMarkFeed::open("/nonexistent/marks.jsonl").is_err());
    }
}
