mod config;
pub mod assemble;
pub mod builder;
pub mod manual;
pub mod schema;

use chrono::NaiveDate;
use log::{debug, info, warn};

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::schema::FeatureSchema;
use crate::schema::*;

// **** Encoders ****

/// Vote method codes meaning that a ballot was cast: absentee permanent, mail
/// ballot, absentee ballot and in person.
pub const VOTED_CODES: [&str; 4] = ["AP", "MB", "AB", "P"];
/// The subset of `VOTED_CODES` that went through the mail.
pub const BY_MAIL_CODES: [&str; 2] = ["MB", "AB"];

const DATE_FORMAT: &str = "%m/%d/%Y";

/// The lower bound of every date feature.
pub fn date_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// A date encoded as a fraction of [1900-01-01, today].
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DateFeature {
    /// The raw value parsed to a date, before any clamping.
    pub present: bool,
    /// In [0, 1], rounded to 3 decimals.
    pub fraction: f64,
}

/// Parses a month/day/year date and normalizes it.
///
/// Missing or unparseable values are treated as the floor date, so they encode
/// as 0 and are marked as absent.
pub fn normalize_date(raw: &str, today: NaiveDate) -> DateFeature {
    let floor = date_floor();
    let parsed = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok();
    let date = parsed.unwrap_or(floor).clamp(floor, today.max(floor));
    let span = (today - floor).num_days();
    let fraction = if span <= 0 {
        0.0
    } else {
        let x = (date - floor).num_days() as f64 / span as f64;
        (x * 1000.0).round() / 1000.0
    };
    DateFeature {
        present: parsed.is_some(),
        fraction,
    }
}

/// Three mutually exclusive flags: the two known codes, then everything else.
pub fn one_hot(value: &str, known: [&str; 2]) -> [bool; 3] {
    let first = value == known[0];
    let second = value == known[1];
    [first, second, !first && !second]
}

pub fn party_one_hot(code: &str) -> [bool; 3] {
    one_hot(code, ["D", "R"])
}

pub fn gender_one_hot(code: &str) -> [bool; 3] {
    one_hot(code, ["M", "F"])
}

pub fn has_voted(vote_method: &str) -> bool {
    VOTED_CODES.contains(&vote_method)
}

pub fn voted_by_mail(vote_method: &str) -> bool {
    BY_MAIL_CODES.contains(&vote_method)
}

// **** County election mapping ****

/// For one county: local election index -> canonical date.
///
/// Only dates present in the registry are kept.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct LocalElectionMap {
    dates: HashMap<u32, String>,
}

impl LocalElectionMap {
    /// Filters the county election map rows against the registry. Rows that
    /// point to an unknown date are dropped and reported.
    pub fn build(
        rows: &[ElectionMapRow],
        registry: &ElectionRegistry,
    ) -> (LocalElectionMap, Vec<Diagnostic>) {
        let mut dates: HashMap<u32, String> = HashMap::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        for row in rows {
            if registry.contains(&row.date) {
                if let Some(previous) = dates.insert(row.index, row.date.clone()) {
                    if previous != row.date {
                        diagnostics.push(Diagnostic::RemappedElectionIndex {
                            index: row.index,
                            previous,
                            date: row.date.clone(),
                        });
                    }
                }
            } else {
                diagnostics.push(Diagnostic::UnknownElectionDate {
                    index: row.index,
                    date: row.date.clone(),
                });
            }
        }
        (LocalElectionMap { dates }, diagnostics)
    }

    /// The distinct mapped dates, in increasing local index order.
    pub fn dates(&self) -> Vec<&str> {
        let mut indices: Vec<&u32> = self.dates.keys().collect();
        indices.sort();
        let mut res: Vec<&str> = Vec::new();
        for idx in indices {
            let date = self.dates[idx].as_str();
            if !res.contains(&date) {
                res.push(date);
            }
        }
        res
    }

    pub fn date(&self, index: u32) -> Option<&str> {
        self.dates.get(&index).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum SlotKind {
    Party,
    VoteMethod,
}

/// Reads `Election <n> Party` and `Election <n> Vote Method`.
fn parse_election_slot(name: &str) -> Option<(u32, SlotKind)> {
    let rest = name.strip_prefix("Election ")?;
    let (number, kind) = rest.split_once(' ')?;
    let index = number.parse::<u32>().ok()?;
    match kind {
        "Party" => Some((index, SlotKind::Party)),
        "Vote Method" => Some((index, SlotKind::VoteMethod)),
        _ => None,
    }
}

// **** Alignment plan ****

// Everything is resolved to positions once per county, before touching the rows.
#[derive(Eq, PartialEq, Debug, Clone)]
enum FieldRule {
    Gender { source: usize, targets: [usize; 3] },
    Party { source: usize, targets: [usize; 3] },
    Date { source: usize, target: usize },
    LastVoteDate { source: usize, presence: usize, target: usize },
    Active { source: usize, target: usize },
    Copy { source: usize, target: usize },
}

// One canonical election date for this county. The sources are in template
// order: the first one holding a value for a voter wins.
#[derive(Eq, PartialEq, Debug, Clone)]
struct ElectionRule {
    date: String,
    party_sources: Vec<usize>,
    method_sources: Vec<usize>,
    presence: usize,
    party: [usize; 3],
    voted: usize,
    by_mail: usize,
}

#[derive(Debug)]
struct AlignmentPlan {
    columns: Vec<String>,
    fields: Vec<FieldRule>,
    elections: Vec<ElectionRule>,
    // Presence column of every canonical election, set to 0 before the rules run.
    absent_presence: Vec<usize>,
    diagnostics: Vec<Diagnostic>,
}

fn positions<const N: usize>(schema: &FeatureSchema, names: [&str; N]) -> Option<[usize; N]> {
    let mut res = [0usize; N];
    for (slot, name) in res.iter_mut().zip(names.iter()) {
        *slot = schema.position(name)?;
    }
    Some(res)
}

fn demographic_rule(name: &str, source: usize, schema: &FeatureSchema) -> Option<FieldRule> {
    match name {
        GENDER => positions(schema, GENDER_COLUMNS).map(|targets| FieldRule::Gender { source, targets }),
        PARTY_CODE => positions(schema, PARTY_COLUMNS).map(|targets| FieldRule::Party { source, targets }),
        LAST_VOTE_DATE => positions(schema, [LAST_VOTE_DATE_PRESENCE, LAST_VOTE_DATE]).map(
            |[presence, target]| FieldRule::LastVoteDate {
                source,
                presence,
                target,
            },
        ),
        VOTER_STATUS => schema
            .position(name)
            .map(|target| FieldRule::Active { source, target }),
        n if DATE_FIELDS.contains(&n) => schema
            .position(name)
            .map(|target| FieldRule::Date { source, target }),
        n => schema
            .position(n)
            .map(|target| FieldRule::Copy { source, target }),
    }
}

fn election_rule(date: &str, schema: &FeatureSchema) -> Option<ElectionRule> {
    let names = election_feature_names(date);
    let [presence, d, r, i, voted, by_mail] = positions(
        schema,
        [
            names[0].as_str(),
            names[1].as_str(),
            names[2].as_str(),
            names[3].as_str(),
            names[4].as_str(),
            names[5].as_str(),
        ],
    )?;
    Some(ElectionRule {
        date: date.to_string(),
        party_sources: Vec::new(),
        method_sources: Vec::new(),
        presence,
        party: [d, r, i],
        voted,
        by_mail,
    })
}

fn build_plan(
    template: &ColumnTemplate,
    schema: &FeatureSchema,
    local_map: &LocalElectionMap,
    withheld: &WithheldFeatures,
    policy: UnknownFieldPolicy,
) -> Result<AlignmentPlan, AlignmentErrors> {
    let mut columns = schema.columns();
    let mut fields: Vec<FieldRule> = Vec::new();
    let mut elections: Vec<ElectionRule> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    // Semantic name after renaming -> raw positions, to spot collisions.
    let mut renamed: Vec<(String, Vec<usize>)> = Vec::new();

    let mut note_rename = |name: String, position: usize| -> bool {
        if let Some((_, seen)) = renamed.iter_mut().find(|(n, _)| *n == name) {
            seen.push(position);
            false
        } else {
            renamed.push((name, vec![position]));
            true
        }
    };

    for (position, name) in template.fields().iter().enumerate() {
        if withheld.contains(name) || is_district_field(name) {
            continue;
        }

        if let Some((index, kind)) = parse_election_slot(name) {
            let date = match local_map.date(index) {
                Some(d) => d,
                None => {
                    debug!("build_plan: election slot {:?} is not mapped, dropped", name);
                    continue;
                }
            };
            let suffix = match kind {
                SlotKind::Party => "Party",
                SlotKind::VoteMethod => "Vote Method",
            };
            note_rename(format!("Election {} {}", date, suffix), position);

            let idx = match elections.iter().position(|e| e.date == date) {
                Some(idx) => idx,
                None => match election_rule(date, schema) {
                    Some(rule) => {
                        elections.push(rule);
                        elections.len() - 1
                    }
                    None => {
                        // The schema does not know this date even though the
                        // registry does: the schema came from another registry.
                        warn!(
                            "build_plan: no canonical columns for election date {:?}",
                            date
                        );
                        continue;
                    }
                },
            };
            match kind {
                SlotKind::Party => elections[idx].party_sources.push(position),
                SlotKind::VoteMethod => elections[idx].method_sources.push(position),
            }
            continue;
        }

        // Any other election field has no counterpart in the schema.
        if is_election_field(name) {
            debug!("build_plan: election field {:?} is not a slot, dropped", name);
            continue;
        }

        // Also catches a raw field already named like a canonical column.
        if let Some(rule) = demographic_rule(name, position, schema) {
            if note_rename(name.clone(), position) {
                fields.push(rule);
            }
            continue;
        }

        // Nothing knows what to do with this field.
        diagnostics.push(Diagnostic::UnrecognizedField {
            name: name.clone(),
            position,
        });
        match policy {
            UnknownFieldPolicy::Reject => {
                return Err(AlignmentErrors::RejectedField {
                    name: name.clone(),
                    position,
                });
            }
            UnknownFieldPolicy::Widen => {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
    }

    // A mapped date without any slot in the template is still present, with
    // blank party and vote method.
    for date in local_map.dates() {
        if elections.iter().any(|e| e.date == date) {
            continue;
        }
        match election_rule(date, schema) {
            Some(rule) => {
                debug!("build_plan: election date {:?} has no template slot", date);
                elections.push(rule);
            }
            None => warn!(
                "build_plan: no canonical columns for election date {:?}",
                date
            ),
        }
    }

    for (name, seen) in renamed.into_iter() {
        if seen.len() > 1 {
            diagnostics.push(Diagnostic::DuplicateColumn {
                name,
                positions: seen,
            });
        }
    }

    let absent_presence: Vec<usize> = schema
        .elections()
        .chunks(ELECTION_FEATURE_SUFFIXES.len())
        .filter_map(|chunk| chunk.first())
        .filter_map(|name| schema.position(name))
        .collect();

    Ok(AlignmentPlan {
        columns,
        fields,
        elections,
        absent_presence,
        diagnostics,
    })
}

// **** Row assembly ****

/// Assembles one output row in the fixed column order.
struct RowBuilder {
    cells: Vec<Cell>,
}

impl RowBuilder {
    fn new(width: usize) -> RowBuilder {
        RowBuilder {
            cells: vec![Cell::Null; width],
        }
    }

    fn set(&mut self, position: usize, cell: Cell) {
        self.cells[position] = cell;
    }

    fn set_flags<const N: usize>(&mut self, positions: [usize; N], flags: [bool; N]) {
        for (p, f) in positions.iter().zip(flags.iter()) {
            self.set(*p, Cell::Flag(*f));
        }
    }

    fn finish(self) -> Vec<Cell> {
        self.cells
    }
}

fn raw_cell(row: &[String], position: usize) -> &str {
    row.get(position).map(|s| s.as_str()).unwrap_or("")
}

// First non-blank value among the sources.
fn first_present<'a>(row: &'a [String], sources: &[usize]) -> &'a str {
    sources
        .iter()
        .map(|p| raw_cell(row, *p))
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

fn align_row(row: &[String], plan: &AlignmentPlan, today: NaiveDate) -> Vec<Cell> {
    let mut builder = RowBuilder::new(plan.columns.len());

    for p in plan.absent_presence.iter() {
        builder.set(*p, Cell::Flag(false));
    }

    for rule in plan.fields.iter() {
        match rule {
            FieldRule::Gender { source, targets } => {
                builder.set_flags(*targets, gender_one_hot(raw_cell(row, *source)))
            }
            FieldRule::Party { source, targets } => {
                builder.set_flags(*targets, party_one_hot(raw_cell(row, *source)))
            }
            FieldRule::Date { source, target } => {
                let df = normalize_date(raw_cell(row, *source), today);
                builder.set(*target, Cell::Fraction(df.fraction));
            }
            FieldRule::LastVoteDate {
                source,
                presence,
                target,
            } => {
                let df = normalize_date(raw_cell(row, *source), today);
                builder.set(*presence, Cell::Flag(df.present));
                builder.set(*target, Cell::Fraction(df.fraction));
            }
            FieldRule::Active { source, target } => {
                builder.set(*target, Cell::Flag(raw_cell(row, *source) == "A"))
            }
            FieldRule::Copy { source, target } => {
                let value = raw_cell(row, *source);
                let cell = if value.is_empty() {
                    Cell::Null
                } else {
                    Cell::Text(value.to_string())
                };
                builder.set(*target, cell);
            }
        }
    }

    for e in plan.elections.iter() {
        let party = first_present(row, &e.party_sources);
        let method = first_present(row, &e.method_sources);
        builder.set(e.presence, Cell::Flag(true));
        builder.set_flags(e.party, party_one_hot(party));
        builder.set(e.voted, Cell::Flag(has_voted(method)));
        builder.set(e.by_mail, Cell::Flag(voted_by_mail(method)));
    }

    builder.finish()
}

/// Aligns the raw voter rows of one county onto the canonical schema.
///
/// Arguments:
/// * `county` the county name, only used for logging
/// * `rows` the raw rows, positional, as read from the voter extract
/// * `template` the shared column template
/// * `schema` the canonical schema, derived once for the whole corpus
/// * `local_map` this county's election index -> canonical date mapping
/// * `withheld` the fields that must not reach the output
/// * `options` the reference date and the policy for unknown fields
pub fn align_county(
    county: &str,
    rows: &[Vec<String>],
    template: &ColumnTemplate,
    schema: &FeatureSchema,
    local_map: &LocalElectionMap,
    withheld: &WithheldFeatures,
    options: &AlignOptions,
) -> Result<AlignedCounty, AlignmentErrors> {
    info!(
        "align_county: {}: {} rows, {} mapped elections",
        county,
        rows.len(),
        local_map.len()
    );
    let plan = build_plan(template, schema, local_map, withheld, options.unknown_fields)?;
    debug!(
        "align_county: {}: {} field rules, {} election rules, {} columns",
        county,
        plan.fields.len(),
        plan.elections.len(),
        plan.columns.len()
    );

    let wide_rows = rows.iter().filter(|r| r.len() > template.len()).count();
    if wide_rows > 0 {
        debug!(
            "align_county: {}: {} rows are wider than the template, extra cells ignored",
            county, wide_rows
        );
    }

    let aligned: Vec<Vec<Cell>> = rows
        .iter()
        .map(|row| align_row(row, &plan, options.today))
        .collect();

    Ok(AlignedCounty {
        table: AlignedTable {
            columns: plan.columns,
            rows: aligned,
        },
        diagnostics: plan.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RegistryBuilder;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 7, 15).unwrap()
    }

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn template() -> ColumnTemplate {
        ColumnTemplate::new(strings(&[
            "ID Number",
            "Last Name",
            "Gender",
            "DOB",
            "Registration Date",
            "Voter Status",
            "Party Code",
            "Last Vote Date",
            "Precinct Code",
            "District 1",
            "Election 1 Vote Method",
            "Election 1 Party",
            "Election 2 Vote Method",
            "Election 2 Party",
            "Election 3 Vote Method",
            "Election 3 Party",
        ]))
        .unwrap()
    }

    fn registry() -> ElectionRegistry {
        let mut b = RegistryBuilder::new();
        b.add_description("11/08/2022", "GENERAL");
        b.add_description("05/16/2023", "PRIMARY");
        b.add_description("11/07/2023", "MUNICIPAL");
        b.build()
    }

    fn row(
        gender: &str,
        party: &str,
        dob: &str,
        e1: (&str, &str),
        e2: (&str, &str),
        e3: (&str, &str),
    ) -> Vec<String> {
        strings(&[
            "012345", "DOE", gender, dob, "03/01/1990", "A", party, "11/08/2022", "P1", "D1",
            e1.0, e1.1, e2.0, e2.1, e3.0, e3.1,
        ])
    }

    fn map_rows(pairs: &[(u32, &str)]) -> Vec<ElectionMapRow> {
        pairs
            .iter()
            .map(|(index, date)| ElectionMapRow {
                index: *index,
                description: format!("ELECTION {}", index),
                date: date.to_string(),
            })
            .collect()
    }

    fn align(rows: &[Vec<String>], pairs: &[(u32, &str)]) -> AlignedCounty {
        init();
        let t = template();
        let reg = registry();
        let withheld = WithheldFeatures::default();
        let schema = FeatureSchema::derive(&t, &reg, &withheld);
        let (local, _) = LocalElectionMap::build(&map_rows(pairs), &reg);
        align_county(
            "Test",
            rows,
            &t,
            &schema,
            &local,
            &withheld,
            &AlignOptions::new(today()),
        )
        .unwrap()
    }

    fn flag(t: &AlignedTable, row: usize, col: &str) -> Option<bool> {
        match t.get(row, col) {
            Some(Cell::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    #[test]
    fn date_bounds() {
        let floor = normalize_date("01/01/1900", today());
        assert_eq!(floor.fraction, 0.0);
        assert!(floor.present);
        assert_eq!(normalize_date("07/15/2023", today()).fraction, 1.0);
        assert_eq!(normalize_date("01/01/2090", today()).fraction, 1.0);
        assert_eq!(normalize_date("05/05/1850", today()).fraction, 0.0);
        let missing = normalize_date("", today());
        assert_eq!(missing.fraction, 0.0);
        assert!(!missing.present);
        let garbage = normalize_date("13/45/19x9", today());
        assert_eq!(garbage.fraction, 0.0);
        assert!(!garbage.present);
    }

    #[test]
    fn date_is_monotonic_and_rounded() {
        let a = normalize_date("01/01/1950", today()).fraction;
        let b = normalize_date("06/30/1980", today()).fraction;
        let c = normalize_date("12/31/2010", today()).fraction;
        assert!(0.0 < a && a < b && b < c && c < 1.0);
        assert_eq!((a * 1000.0).round() / 1000.0, a);
    }

    #[test]
    fn one_hot_partitions() {
        for code in ["D", "R", "I", "", "GR", "d"] {
            let flags = party_one_hot(code);
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{:?}", code);
        }
        assert_eq!(gender_one_hot("M"), [true, false, false]);
        assert_eq!(gender_one_hot("F"), [false, true, false]);
        assert_eq!(gender_one_hot("X"), [false, false, true]);
        assert_eq!(party_one_hot(""), [false, false, true]);
    }

    #[test]
    fn vote_methods() {
        for code in ["AP", "MB", "AB", "P"] {
            assert!(has_voted(code));
        }
        for code in ["", "X", "mb", "PR"] {
            assert!(!has_voted(code));
            assert!(!voted_by_mail(code));
        }
        for code in BY_MAIL_CODES {
            assert!(has_voted(code));
        }
        assert!(!voted_by_mail("P"));
        assert!(!voted_by_mail("AP"));
    }

    #[test]
    fn end_to_end_single_voter() {
        let rows = vec![row("M", "D", "01/01/1950", ("MB", "R"), ("", ""), ("", ""))];
        let out = align(&rows, &[(1, "11/08/2022")]);
        let t = &out.table;

        assert_eq!(flag(t, 0, "Gender M"), Some(true));
        assert_eq!(flag(t, 0, "Gender F"), Some(false));
        assert_eq!(flag(t, 0, "Gender U"), Some(false));
        assert_eq!(flag(t, 0, "Party D"), Some(true));
        assert_eq!(flag(t, 0, "Party R"), Some(false));
        assert_eq!(flag(t, 0, "Party I"), Some(false));

        let expected = (NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() - date_floor()).num_days()
            as f64
            / (today() - date_floor()).num_days() as f64;
        match t.get(0, "DOB") {
            Some(Cell::Fraction(x)) => assert!((x - expected).abs() < 0.0006),
            other => panic!("unexpected DOB {:?}", other),
        }

        assert_eq!(flag(t, 0, "Election 11/08/2022 Presence"), Some(true));
        assert_eq!(flag(t, 0, "Election 11/08/2022 Party D"), Some(false));
        assert_eq!(flag(t, 0, "Election 11/08/2022 Party R"), Some(true));
        assert_eq!(flag(t, 0, "Election 11/08/2022 Party I"), Some(false));
        assert_eq!(flag(t, 0, "Election 11/08/2022 Voted"), Some(true));
        assert_eq!(flag(t, 0, "Election 11/08/2022 By Mail"), Some(true));

        for date in ["05/16/2023", "11/07/2023"] {
            let names = election_feature_names(date);
            assert_eq!(flag(t, 0, &names[0]), Some(false));
            for n in names[1..].iter() {
                assert_eq!(t.get(0, n), Some(&Cell::Null));
            }
        }
    }

    #[test]
    fn output_columns_equal_schema() {
        let t = template();
        let reg = registry();
        let schema = FeatureSchema::derive(&t, &reg, &WithheldFeatures::default());
        let rows = vec![row("F", "R", "02/02/1960", ("P", "R"), ("AB", "D"), ("", ""))];
        for pairs in [
            vec![],
            vec![(1, "11/08/2022")],
            vec![(1, "11/08/2022"), (2, "05/16/2023"), (3, "11/07/2023")],
        ] {
            let out = align(&rows, &pairs);
            assert_eq!(out.table.columns, schema.columns());
            assert!(out.table.rows.iter().all(|r| r.len() == schema.len()));
        }
    }

    #[test]
    fn withheld_and_district_fields_are_dropped() {
        let rows = vec![row("M", "D", "01/01/1950", ("", ""), ("", ""), ("", ""))];
        let out = align(&rows, &[]);
        for name in ["ID Number", "Last Name", "Precinct Code", "District 1", "Gender", "Party Code"] {
            assert!(out.table.column_index(name).is_none(), "{}", name);
        }
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn last_vote_date_presence() {
        let mut r = row("M", "D", "01/01/1950", ("", ""), ("", ""), ("", ""));
        r[7] = "".to_string();
        let rows = vec![
            row("M", "D", "01/01/1950", ("", ""), ("", ""), ("", "")),
            r,
        ];
        let out = align(&rows, &[]);
        assert_eq!(flag(&out.table, 0, "Last Vote Date Presence"), Some(true));
        assert_eq!(flag(&out.table, 1, "Last Vote Date Presence"), Some(false));
        assert_eq!(out.table.get(1, "Last Vote Date"), Some(&Cell::Fraction(0.0)));
        assert_eq!(flag(&out.table, 0, "Voter Status"), Some(true));
    }

    #[test]
    fn concurrent_elections_first_value_wins() {
        let rows = vec![
            // Only the first contest.
            row("M", "D", "01/01/1950", ("P", "D"), ("", ""), ("", "")),
            // Only the second contest.
            row("F", "R", "01/01/1960", ("", ""), ("MB", "R"), ("", "")),
            // Both: the first one is kept.
            row("U", "", "01/01/1970", ("AP", "D"), ("AB", "R"), ("", "")),
            // Neither.
            row("M", "R", "01/01/1980", ("", ""), ("", ""), ("", "")),
        ];
        let out = align(&rows, &[(1, "11/08/2022"), (2, "11/08/2022")]);
        let t = &out.table;
        let n = election_feature_names("11/08/2022");

        assert_eq!(flag(t, 0, &n[1]), Some(true));
        assert_eq!(flag(t, 0, &n[4]), Some(true));
        assert_eq!(flag(t, 0, &n[5]), Some(false));

        assert_eq!(flag(t, 1, &n[2]), Some(true));
        assert_eq!(flag(t, 1, &n[5]), Some(true));

        assert_eq!(flag(t, 2, &n[1]), Some(true));
        assert_eq!(flag(t, 2, &n[2]), Some(false));
        assert_eq!(flag(t, 2, &n[5]), Some(false));

        assert_eq!(flag(t, 3, &n[0]), Some(true));
        assert_eq!(flag(t, 3, &n[3]), Some(true));
        assert_eq!(flag(t, 3, &n[4]), Some(false));

        assert!(out.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::DuplicateColumn { name, positions } if name == "Election 11/08/2022 Party" && positions == &vec![11, 13]
        )));
    }

    #[test]
    fn unknown_dates_are_reported() {
        let (local, diags) = LocalElectionMap::build(
            &map_rows(&[(1, "11/08/2022"), (9, "01/01/1999")]),
            &registry(),
        );
        assert_eq!(local.len(), 1);
        assert_eq!(local.date(1), Some("11/08/2022"));
        assert_eq!(local.date(9), None);
        assert_eq!(
            diags,
            vec![Diagnostic::UnknownElectionDate {
                index: 9,
                date: "01/01/1999".to_string()
            }]
        );
    }

    #[test]
    fn status_and_date_fields() {
        init();
        let t = ColumnTemplate::new(strings(&[
            "Voter Status",
            "Registration Date",
            "Status Change Date",
            "Date Last Changed",
        ]))
        .unwrap();
        let reg = registry();
        let withheld = WithheldFeatures::default();
        let schema = FeatureSchema::derive(&t, &reg, &withheld);
        let rows = vec![
            strings(&["I", "03/01/1990", "", "12/31/2010"]),
            strings(&["A", "", "06/30/1980", "garbage"]),
        ];
        let out = align_county(
            "Test",
            &rows,
            &t,
            &schema,
            &LocalElectionMap::default(),
            &withheld,
            &AlignOptions::new(today()),
        )
        .unwrap();
        let tb = &out.table;
        assert_eq!(flag(tb, 0, "Voter Status"), Some(false));
        assert_eq!(flag(tb, 1, "Voter Status"), Some(true));
        let fraction = |raw: &str| Some(Cell::Fraction(normalize_date(raw, today()).fraction));
        assert_eq!(tb.get(0, "Registration Date").cloned(), fraction("03/01/1990"));
        assert_eq!(tb.get(0, "Status Change Date"), Some(&Cell::Fraction(0.0)));
        assert_eq!(tb.get(0, "Date Last Changed").cloned(), fraction("12/31/2010"));
        assert_eq!(tb.get(1, "Registration Date"), Some(&Cell::Fraction(0.0)));
        assert_eq!(tb.get(1, "Status Change Date").cloned(), fraction("06/30/1980"));
        assert_eq!(tb.get(1, "Date Last Changed"), Some(&Cell::Fraction(0.0)));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn election_fields_outside_slots_are_dropped() {
        init();
        let t = ColumnTemplate::new(strings(&[
            "DOB",
            "Election Board Worker",
            "Election 1 Party",
            "Election 1 Vote Method",
        ]))
        .unwrap();
        let reg = registry();
        let withheld = WithheldFeatures::default();
        let schema = FeatureSchema::derive(&t, &reg, &withheld);
        let (local, _) = LocalElectionMap::build(&map_rows(&[(1, "11/08/2022")]), &reg);
        let rows = vec![strings(&["01/01/1950", "Y", "D", "P"])];

        let mut options = AlignOptions::new(today());
        options.unknown_fields = UnknownFieldPolicy::Reject;
        let out = align_county("Test", &rows, &t, &schema, &local, &withheld, &options).unwrap();
        assert_eq!(out.table.columns, schema.columns());
        assert!(out.table.column_index("Election Board Worker").is_none());
        assert!(out.diagnostics.is_empty());
        assert_eq!(flag(&out.table, 0, "Election 11/08/2022 Party D"), Some(true));
        assert_eq!(flag(&out.table, 0, "Election 11/08/2022 Voted"), Some(true));
    }

    #[test]
    fn mapped_date_without_slot_is_present() {
        init();
        let t = ColumnTemplate::new(strings(&[
            "DOB",
            "Election 1 Party",
            "Election 1 Vote Method",
        ]))
        .unwrap();
        let reg = registry();
        let withheld = WithheldFeatures::default();
        let schema = FeatureSchema::derive(&t, &reg, &withheld);
        let (local, _) = LocalElectionMap::build(&map_rows(&[(2, "11/08/2022")]), &reg);
        let rows = vec![strings(&["01/01/1950", "R", "MB"])];
        let out = align_county(
            "Test",
            &rows,
            &t,
            &schema,
            &local,
            &withheld,
            &AlignOptions::new(today()),
        )
        .unwrap();
        let tb = &out.table;
        assert_eq!(tb.columns, schema.columns());

        let n = election_feature_names("11/08/2022");
        assert_eq!(flag(tb, 0, &n[0]), Some(true));
        assert_eq!(flag(tb, 0, &n[1]), Some(false));
        assert_eq!(flag(tb, 0, &n[2]), Some(false));
        assert_eq!(flag(tb, 0, &n[3]), Some(true));
        assert_eq!(flag(tb, 0, &n[4]), Some(false));
        assert_eq!(flag(tb, 0, &n[5]), Some(false));

        let other = election_feature_names("05/16/2023");
        assert_eq!(flag(tb, 0, &other[0]), Some(false));
        assert_eq!(tb.get(0, &other[1]), Some(&Cell::Null));
    }

    #[test]
    fn remapped_indices_are_reported() {
        let (local, diags) = LocalElectionMap::build(
            &map_rows(&[(1, "11/08/2022"), (4, "11/08/2022"), (1, "05/16/2023")]),
            &registry(),
        );
        assert_eq!(local.date(1), Some("05/16/2023"));
        assert_eq!(local.dates(), vec!["05/16/2023", "11/08/2022"]);
        assert_eq!(
            diags,
            vec![Diagnostic::RemappedElectionIndex {
                index: 1,
                previous: "11/08/2022".to_string(),
                date: "05/16/2023".to_string()
            }]
        );
    }

    #[test]
    fn unrecognized_fields_widen_or_reject() {
        init();
        let t = ColumnTemplate::new(strings(&["DOB", "Mystery"])).unwrap();
        let reg = registry();
        let withheld = WithheldFeatures::default();
        let schema = FeatureSchema::from_parts(strings(&["DOB"]), reg.election_feature_names());
        let rows = vec![strings(&["01/01/1950", "x"])];
        let local = LocalElectionMap::default();

        let mut options = AlignOptions::new(today());
        let out = align_county("Test", &rows, &t, &schema, &local, &withheld, &options).unwrap();
        assert_eq!(out.table.columns.last().map(|s| s.as_str()), Some("Mystery"));
        assert_eq!(out.table.get(0, "Mystery"), Some(&Cell::Null));
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::UnrecognizedField {
                name: "Mystery".to_string(),
                position: 1
            }]
        );

        options.unknown_fields = UnknownFieldPolicy::Reject;
        let err = align_county("Test", &rows, &t, &schema, &local, &withheld, &options);
        assert_eq!(
            err,
            Err(AlignmentErrors::RejectedField {
                name: "Mystery".to_string(),
                position: 1
            })
        );
    }

    #[test]
    fn short_rows_degrade_fields() {
        let rows = vec![strings(&["012345", "DOE", "F"])];
        let out = align(&rows, &[(1, "11/08/2022")]);
        let t = &out.table;
        assert_eq!(out.table.rows.len(), 1);
        assert_eq!(flag(t, 0, "Gender F"), Some(true));
        assert_eq!(t.get(0, "DOB"), Some(&Cell::Fraction(0.0)));
        assert_eq!(flag(t, 0, "Party I"), Some(true));
        assert_eq!(flag(t, 0, "Election 11/08/2022 Voted"), Some(false));
    }

    #[test]
    fn cells_print_like_csv_values() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Flag(true).to_string(), "1");
        assert_eq!(Cell::Fraction(0.5).to_string(), "0.5");
        assert_eq!(Cell::Fraction(0.0).to_string(), "0");
        assert_eq!(Cell::Text("abc".to_string()).to_string(), "abc");
    }
}
