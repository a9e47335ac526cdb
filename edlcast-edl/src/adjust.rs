//! Per-clip reference timecodes used to rebase recorded source positions.

use std::collections::HashMap;
use std::path::Path;

use edlcast_timecode::Timecode;

use crate::error::{Error, Result};

/// Raw clip name -> timecode at which the clip's content actually begins.
#[derive(Debug, Clone, Default)]
pub struct AdjustmentTable {
    entries: HashMap<String, Timecode>,
}

impl AdjustmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, clip_name: impl Into<String>, reference: Timecode) {
        self.entries.insert(clip_name.into(), reference);
    }

    pub fn get(&self, clip_name: &str) -> Option<&Timecode> {
        self.entries.get(clip_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse CSV rows of `(ignored, reference timecode, ignored, clip name)`.
    ///
    /// A first row whose timecode column does not parse is taken as a header.
    pub fn parse_csv(input: &str) -> Result<Self> {
        let mut table = Self::new();
        let mut first_row = true;

        for (line_idx, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(|f| f.trim().trim_matches('"')).collect();
            if fields.len() < 4 {
                return Err(Error::parse(
                    line_idx + 1,
                    format!("Expected 4 fields, got {}", fields.len()),
                ));
            }

            let reference = match fields[1].parse::<Timecode>() {
                Ok(tc) => tc,
                Err(_) if first_row => {
                    first_row = false;
                    continue;
                }
                Err(e) => {
                    return Err(Error::parse(
                        line_idx + 1,
                        format!("Invalid reference timecode '{}': {e}", fields[1]),
                    ))
                }
            };
            first_row = false;

            table.insert(fields[3], reference);
        }

        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_csv(&content)
    }
}

impl<S: Into<String>> FromIterator<(S, Timecode)> for AdjustmentTable {
    fn from_iter<I: IntoIterator<Item = (S, Timecode)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, tc) in iter {
            table.insert(name, tc);
        }
        table
    }
}
