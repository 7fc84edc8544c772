use log::debug;
use std::collections::HashMap;

use crate::config::*;

pub const GENDER: &str = "Gender";
pub const PARTY_CODE: &str = "Party Code";
pub const LAST_VOTE_DATE: &str = "Last Vote Date";
pub const LAST_VOTE_DATE_PRESENCE: &str = "Last Vote Date Presence";
pub const VOTER_STATUS: &str = "Voter Status";

pub const GENDER_COLUMNS: [&str; 3] = ["Gender M", "Gender F", "Gender U"];
pub const PARTY_COLUMNS: [&str; 3] = ["Party D", "Party R", "Party I"];

/// Fields normalized as a fraction of the span between the date floor and today.
pub const DATE_FIELDS: [&str; 4] = [
    "DOB",
    "Registration Date",
    "Status Change Date",
    "Date Last Changed",
];

/// Raw fields that are not demographic features: the numbered election slots
/// and the district assignments.
pub fn is_election_field(name: &str) -> bool {
    name.contains("Election")
}

pub fn is_district_field(name: &str) -> bool {
    name.contains("District")
}

/// The canonical columns shared by every aligned county table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FeatureSchema {
    demographic: Vec<String>,
    elections: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Derives the schema from the template and the registry.
    ///
    /// The demographic part keeps the template order, minus the withheld, the
    /// election and the district fields. Then the categorical fields are moved
    /// to the end as indicator columns, in a fixed order:
    /// gender, party, last vote date.
    pub fn derive(
        template: &ColumnTemplate,
        registry: &ElectionRegistry,
        withheld: &WithheldFeatures,
    ) -> FeatureSchema {
        let mut demographic: Vec<String> = Vec::new();
        for name in template.fields() {
            if is_election_field(name) || is_district_field(name) || withheld.contains(name) {
                continue;
            }
            if demographic.contains(name) {
                debug!("derive: field {:?} appears twice in the template", name);
                continue;
            }
            demographic.push(name.clone());
        }

        substitute(&mut demographic, GENDER, &GENDER_COLUMNS);
        substitute(&mut demographic, PARTY_CODE, &PARTY_COLUMNS);
        substitute(
            &mut demographic,
            LAST_VOTE_DATE,
            &[LAST_VOTE_DATE_PRESENCE, LAST_VOTE_DATE],
        );

        FeatureSchema::from_parts(demographic, registry.election_feature_names())
    }

    pub fn from_parts(demographic: Vec<String>, elections: Vec<String>) -> FeatureSchema {
        let positions = demographic
            .iter()
            .chain(elections.iter())
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        FeatureSchema {
            demographic,
            elections,
            positions,
        }
    }

    pub fn demographic(&self) -> &[String] {
        &self.demographic
    }

    pub fn elections(&self) -> &[String] {
        &self.elections
    }

    /// Demographic columns followed by election columns.
    pub fn columns(&self) -> Vec<String> {
        self.demographic
            .iter()
            .chain(self.elections.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.demographic.len() + self.elections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }
}

// Only applied when the template actually has the field.
fn substitute(columns: &mut Vec<String>, field: &str, replacements: &[&str]) {
    if let Some(idx) = columns.iter().position(|c| c == field) {
        columns.remove(idx);
        columns.extend(replacements.iter().map(|s| s.to_string()));
    }
}
