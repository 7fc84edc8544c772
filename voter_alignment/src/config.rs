// ********* Input data structures ***********

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::Display;

/// One row of a county election map extract.
///
/// The index is local to the county: index 7 in one county has nothing to do
/// with index 7 in another one. The date is the canonical key shared by all
/// the counties.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionMapRow {
    pub index: u32,
    pub description: String,
    pub date: String,
}

/// The ordered list of field descriptions, one per raw column position.
///
/// Position `i` means the same semantic field in every county voter extract.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnTemplate {
    fields: Vec<String>,
}

impl ColumnTemplate {
    pub fn new(fields: Vec<String>) -> Result<ColumnTemplate, AlignmentErrors> {
        if fields.is_empty() {
            return Err(AlignmentErrors::EmptyTemplate);
        }
        Ok(ColumnTemplate { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The fields that never make it to the output, for privacy and bias reasons.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WithheldFeatures(HashSet<String>);

impl WithheldFeatures {
    pub fn new<I, S>(names: I) -> WithheldFeatures
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WithheldFeatures(names.into_iter().map(|s| s.into()).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl Default for WithheldFeatures {
    fn default() -> Self {
        WithheldFeatures::new([
            "Home Phone",
            "Mail Country",
            "ID Number",
            "Title",
            // Names could be used to guess race and other attributes. The risk of
            // stereotyping is too high to keep them.
            "Last Name",
            "First Name",
            "Middle Name",
            "Suffix",
            "Custom Data 1",
            "House Number",
            "House Number Suffix",
            "Street Name",
            "Apartment Number",
            "Address Line 2",
            "City",
            "State",
            "Zip",
            "Mail Address 1",
            "Mail Address 2",
            "Mail City",
            "Mail State",
            "Mail Zip",
            "Precinct Code",
            "Precinct Split ID",
            // Text, would need an encoding first.
            "County",
        ])
    }
}

/// One canonical election: a date and every description seen for it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    pub date: String,
    pub descriptions: Vec<String>,
}

/// The canonical elections of the whole corpus, in discovery order.
///
/// The order matters: the election columns of every output table follow it.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionRegistry {
    pub(crate) elections: Vec<Election>,
    pub(crate) by_date: HashMap<String, usize>,
}

impl ElectionRegistry {
    /// Rebuilds a registry from an already deduplicated list, for example a
    /// manifest written by a previous run.
    pub fn from_elections(elections: Vec<Election>) -> ElectionRegistry {
        let mut builder = crate::builder::RegistryBuilder::new();
        for e in elections {
            builder.add_date(&e.date);
            for d in e.descriptions {
                builder.add_description(&e.date, &d);
            }
        }
        builder.build()
    }

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn get(&self, date: &str) -> Option<&Election> {
        self.by_date.get(date).map(|idx| &self.elections[*idx])
    }

    pub fn contains(&self, date: &str) -> bool {
        self.by_date.contains_key(date)
    }

    pub fn len(&self) -> usize {
        self.elections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }

    /// Six columns per date, in registry order.
    pub fn election_feature_names(&self) -> Vec<String> {
        self.elections
            .iter()
            .flat_map(|e| election_feature_names(&e.date))
            .collect()
    }
}

pub const ELECTION_FEATURE_SUFFIXES: [&str; 6] = [
    "Presence", "Party D", "Party R", "Party I", "Voted", "By Mail",
];

pub fn election_feature_names(date: &str) -> Vec<String> {
    ELECTION_FEATURE_SUFFIXES
        .iter()
        .map(|suffix| format!("Election {} {}", date, suffix))
        .collect()
}

// ********* Configuration **********

/// What to do with a raw field that has no transform and is not part of the
/// canonical schema.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnknownFieldPolicy {
    /// Emit an all-null column under the raw name, after the canonical columns.
    Widen,
    /// Refuse the whole county.
    Reject,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AlignOptions {
    /// The upper bound of the date normalization. Dates after it are clamped.
    pub today: NaiveDate,
    pub unknown_fields: UnknownFieldPolicy,
}

impl AlignOptions {
    pub fn new(today: NaiveDate) -> AlignOptions {
        AlignOptions {
            today,
            unknown_fields: UnknownFieldPolicy::Widen,
        }
    }
}

// ******** Output data structures *********

/// A single value of an aligned table.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Null,
    Flag(bool),
    Fraction(f64),
    Text(String),
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Flag(true) => write!(f, "1"),
            Cell::Flag(false) => write!(f, "0"),
            Cell::Fraction(x) => write!(f, "{}", x),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AlignedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl AlignedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The value of a named column for one row, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// Data quality notes collected while aligning a county. None of them stop
/// the alignment.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Diagnostic {
    /// Two raw positions were renamed to the same semantic name.
    DuplicateColumn { name: String, positions: Vec<usize> },
    /// The county election map points to a date outside the registry.
    UnknownElectionDate { index: u32, date: String },
    /// The county election map lists the same index for two dates. The last
    /// one is kept.
    RemappedElectionIndex {
        index: u32,
        previous: String,
        date: String,
    },
    /// A raw field with no transform rule.
    UnrecognizedField { name: String, position: usize },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DuplicateColumn { name, positions } => {
                write!(f, "column {:?} appears at positions {:?}", name, positions)
            }
            Diagnostic::UnknownElectionDate { index, date } => write!(
                f,
                "election index {} refers to date {:?} which is not registered",
                index, date
            ),
            Diagnostic::RemappedElectionIndex {
                index,
                previous,
                date,
            } => write!(
                f,
                "election index {} is mapped to {:?} and then to {:?}",
                index, previous, date
            ),
            Diagnostic::UnrecognizedField { name, position } => write!(
                f,
                "no transform for field {:?} (position {})",
                name, position
            ),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AlignedCounty {
    pub table: AlignedTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Errors that prevent a county from being aligned.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AlignmentErrors {
    EmptyTemplate,
    RejectedField { name: String, position: usize },
}

impl Error for AlignmentErrors {}

impl Display for AlignmentErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentErrors::EmptyTemplate => write!(f, "the column template has no field"),
            AlignmentErrors::RejectedField { name, position } => write!(
                f,
                "field {:?} at position {} has no transform rule",
                name, position
            ),
        }
    }
}
