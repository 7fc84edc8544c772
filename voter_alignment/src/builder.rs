pub use crate::config::*;

use log::debug;
use std::collections::HashMap;

/// A builder for the canonical election registry.
///
/// Feed it the election map rows of every county, in a stable order. Dates keep
/// the order in which they were first seen, and so will the election columns of
/// the output tables.
///
/// ```
/// use voter_alignment::builder::RegistryBuilder;
/// use voter_alignment::ElectionMapRow;
///
/// let mut builder = RegistryBuilder::new();
/// builder.add_row(&ElectionMapRow {
///     index: 7,
///     description: "2022 GENERAL".to_string(),
///     date: "11/08/2022".to_string(),
/// });
/// builder.add_row(&ElectionMapRow {
///     index: 3,
///     description: "GENERAL ELECTION".to_string(),
///     date: "11/08/2022".to_string(),
/// });
/// let registry = builder.build();
///
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.get("11/08/2022").unwrap().descriptions.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    elections: Vec<Election>,
    by_date: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn add_row(&mut self, row: &ElectionMapRow) {
        self.add_description(&row.date, &row.description);
    }

    pub fn add_rows(&mut self, rows: &[ElectionMapRow]) {
        for row in rows {
            self.add_row(row);
        }
    }

    /// Registers a date with no description yet. Does nothing if it is known.
    pub fn add_date(&mut self, date: &str) -> usize {
        if let Some(idx) = self.by_date.get(date) {
            return *idx;
        }
        let idx = self.elections.len();
        debug!("add_date: new election date {:?}", date);
        self.elections.push(Election {
            date: date.to_string(),
            descriptions: Vec::new(),
        });
        self.by_date.insert(date.to_string(), idx);
        idx
    }

    /// Adds a description to a date. Identical descriptions are only kept once.
    pub fn add_description(&mut self, date: &str, description: &str) {
        let idx = self.add_date(date);
        let descriptions = &mut self.elections[idx].descriptions;
        if !descriptions.iter().any(|d| d == description) {
            descriptions.push(description.to_string());
        }
    }

    pub fn build(self) -> ElectionRegistry {
        ElectionRegistry {
            elections: self.elections,
            by_date: self.by_date,
        }
    }
}
