use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value as JSValue;
use text_diff::print_diff;
use voter_alignment::builder::RegistryBuilder;
use voter_alignment::*;

use crate::pipeline::config_reader::Settings;
use crate::pipeline::io_common::{discover_counties, simplify_file_name, CountyFiles};
use crate::pipeline::io_csv::*;
use crate::pipeline::manifest::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod manifest;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("CSV error in {path}"))]
    Csv { source: csv::Error, path: String },

    #[snafu(display("The input directory {path} does not exist"))]
    MissingInputDir { path: String },
    #[snafu(display("The column template {path} does not exist"))]
    MissingTemplate { path: String },
    #[snafu(display("The column template {path} has no column {column:?}"))]
    MissingTemplateColumn { path: String, column: String },
    #[snafu(display("The column template {path} cannot be used"))]
    InvalidTemplate {
        source: AlignmentErrors,
        path: String,
    },
    #[snafu(display("Either --config or --input must be provided"))]
    MissingInput {},
    #[snafu(display("Unknown policy for unrecognized fields: {value:?} (expected widen or reject)"))]
    UnknownPolicy { value: String },
    #[snafu(display("Cannot read the reference date {value:?} (expected YYYY-MM-DD)"))]
    ReferenceDate {
        source: chrono::ParseError,
        value: String,
    },

    #[snafu(display("County {county} cannot be aligned"))]
    Alignment {
        source: AlignmentErrors,
        county: String,
    },
    #[snafu(display("County {county} has no {what}"))]
    MissingCountyFile { county: String, what: String },

    #[snafu(display("The features manifest differs from the reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type PResult<T> = Result<T, PipelineError>;
pub type BPResult<T> = Result<T, Box<PipelineError>>;

/// What a run produced.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunSummary {
    pub counties_written: usize,
    pub counties_skipped: usize,
    pub rows_written: usize,
}

// The read-only state shared by all the counties.
struct RunContext<'a> {
    settings: &'a Settings,
    template: ColumnTemplate,
    schema: FeatureSchema,
    registry: ElectionRegistry,
}

// One county, with the election map already read.
struct CountyInput {
    files: CountyFiles,
    election_map: Option<Vec<ElectionMapRow>>,
}

fn county_output_path(output_dir: &Path, county: &str) -> PathBuf {
    output_dir.join(format!("{}_voter_data.csv", county))
}

fn read_election_maps(settings: &Settings, counties: Vec<CountyFiles>) -> Vec<CountyInput> {
    let mut res: Vec<CountyInput> = Vec::new();
    for files in counties {
        let election_map = match &files.election_map {
            Some(p) => match read_election_map(p, &settings.layout) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!("{}: cannot read the election map: {}", files.county, e);
                    None
                }
            },
            None => None,
        };
        res.push(CountyInput {
            files,
            election_map,
        });
    }
    res
}

fn build_registry(inputs: &[CountyInput]) -> ElectionRegistry {
    let mut b = RegistryBuilder::new();
    for input in inputs {
        if let Some(rows) = &input.election_map {
            b.add_rows(rows);
        }
    }
    b.build()
}

/// Aligns and writes one county. Returns the path of the table and its
/// number of rows.
fn process_county(ctx: &RunContext, input: &CountyInput) -> BPResult<(PathBuf, usize)> {
    let county = input.files.county.as_str();
    let voter_file = input
        .files
        .voter_file
        .as_ref()
        .context(MissingCountyFileSnafu {
            county,
            what: "voter file",
        })?;
    let map_rows = input
        .election_map
        .as_ref()
        .context(MissingCountyFileSnafu {
            county,
            what: "readable election map",
        })?;
    for p in [&input.files.zone_codes, &input.files.zone_types]
        .into_iter()
        .flatten()
    {
        debug!("{}: zone file {} is not used", county, simplify_file_name(p));
    }

    let (local_map, map_diagnostics) = LocalElectionMap::build(map_rows, &ctx.registry);
    let rows = read_tsv_rows(voter_file)?;
    let aligned = align_county(
        county,
        &rows,
        &ctx.template,
        &ctx.schema,
        &local_map,
        &ctx.settings.withheld,
        &ctx.settings.options,
    )
    .context(AlignmentSnafu { county })?;

    for d in map_diagnostics.iter().chain(aligned.diagnostics.iter()) {
        warn!("{}: {}", county, d);
    }

    let path = county_output_path(&ctx.settings.output_dir, county);
    write_aligned_table(&path, &aligned.table)?;
    info!(
        "{}: wrote {} rows to {}",
        county,
        aligned.table.rows.len(),
        simplify_file_name(&path)
    );
    Ok((path, aligned.table.rows.len()))
}

fn check_reference(reference: &Path, produced: &JSValue) -> BPResult<()> {
    let reference_js = read_json(reference)?;
    let pretty_reference = pretty(&reference_js)?;
    let pretty_produced = pretty(produced)?;
    if pretty_reference != pretty_produced {
        warn!("Found differences with the reference features manifest");
        print_diff(pretty_reference.as_str(), pretty_produced.as_str(), "\n");
        return Err(Box::new(PipelineError::ReferenceMismatch {
            path: reference.display().to_string(),
        }));
    }
    info!("The features manifest matches {}", reference.display());
    Ok(())
}

/// Runs the whole batch: registry, manifests, one table per county and the
/// combined table.
///
/// A county that cannot be processed is skipped. Only the setup errors, the
/// manifests and the combined table can fail the run.
pub fn run(settings: &Settings) -> BPResult<RunSummary> {
    info!("run: settings: {:?}", settings);
    ensure!(
        settings.input_dir.is_dir(),
        MissingInputDirSnafu {
            path: settings.input_dir.display().to_string()
        }
    );
    ensure!(
        settings.template_file.is_file(),
        MissingTemplateSnafu {
            path: settings.template_file.display().to_string()
        }
    );
    let template = read_column_template(&settings.template_file, &settings.template_column)?;
    info!("run: column template with {} fields", template.len());

    let counties = discover_counties(&settings.input_dir, &settings.template_file, &settings.markers)?;
    info!("run: {} counties found", counties.len());
    let inputs = read_election_maps(settings, counties);

    let registry = build_registry(&inputs);
    info!("run: {} canonical elections", registry.len());
    let schema = FeatureSchema::derive(&template, &registry, &settings.withheld);

    fs::create_dir_all(&settings.output_dir).context(WritingFileSnafu {
        path: settings.output_dir.display().to_string(),
    })?;
    write_json(&settings.output_dir.join(ELECTIONS_FILE), &elections_to_json(&registry))?;
    let features_js = features_to_json(&schema);
    write_json(&settings.output_dir.join(FEATURES_FILE), &features_js)?;

    let ctx = RunContext {
        settings,
        template,
        schema,
        registry,
    };
    let outcomes: Vec<BPResult<(PathBuf, usize)>> = if settings.parallel {
        inputs.par_iter().map(|i| process_county(&ctx, i)).collect()
    } else {
        inputs.iter().map(|i| process_county(&ctx, i)).collect()
    };

    let mut summary = RunSummary::default();
    let mut tables: Vec<PathBuf> = Vec::new();
    for (input, outcome) in inputs.iter().zip(outcomes) {
        match outcome {
            Ok((path, rows)) => {
                tables.push(path);
                summary.counties_written += 1;
                summary.rows_written += rows;
            }
            Err(e) => {
                warn!("{}: skipped: {}", input.files.county, e);
                summary.counties_skipped += 1;
            }
        }
    }

    let combined_rows = concat_tables(&tables, &settings.combined_file)?;
    info!(
        "run: {} counties written, {} skipped, {} rows in {}",
        summary.counties_written,
        summary.counties_skipped,
        combined_rows,
        settings.combined_file.display()
    );

    if let Some(reference) = &settings.reference {
        check_reference(reference, &features_js)?;
    }
    Ok(summary)
}
