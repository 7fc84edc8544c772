use log::debug;
use std::collections::HashMap;

/// The union of several table headers, in first-seen order.
///
/// Each input keeps a projection from the union columns to its own columns, so
/// rows can be rewritten one at a time without holding the tables in memory.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnUnion {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    headers: Vec<Vec<String>>,
}

impl ColumnUnion {
    pub fn new() -> ColumnUnion {
        ColumnUnion::default()
    }

    /// Registers the header of the next input. Returns the input number.
    pub fn add_header(&mut self, header: &[String]) -> usize {
        for name in header {
            if !self.positions.contains_key(name) {
                debug!("add_header: new column {:?}", name);
                self.positions.insert(name.clone(), self.columns.len());
                self.columns.push(name.clone());
            }
        }
        self.headers.push(header.to_vec());
        self.headers.len() - 1
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// For every union column, where to read it in the given input, if anywhere.
    pub fn projection(&self, input: usize) -> Vec<Option<usize>> {
        let header = match self.headers.get(input) {
            Some(h) => h,
            None => return vec![None; self.columns.len()],
        };
        // A repeated name in one header reads from its first occurrence.
        let mut local: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            local.entry(name.as_str()).or_insert(idx);
        }
        self.columns
            .iter()
            .map(|c| local.get(c.as_str()).copied())
            .collect()
    }

    /// Rewrites a row of the given input in the union layout. Missing columns
    /// are empty.
    pub fn project<'a>(&self, projection: &[Option<usize>], row: &'a [String]) -> Vec<&'a str> {
        projection
            .iter()
            .map(|p| p.and_then(|idx| row.get(idx)).map(|s| s.as_str()).unwrap_or(""))
            .collect()
    }
}
