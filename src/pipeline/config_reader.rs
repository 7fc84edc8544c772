use crate::args::Args;
use crate::pipeline::*;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use voter_alignment::{AlignOptions, UnknownFieldPolicy, WithheldFeatures};

/// Where the local index, the description and the date live in an election
/// map row. Zero-based.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElectionMapLayout {
    #[serde(rename = "indexColumn")]
    pub index_column: usize,
    #[serde(rename = "descriptionColumn")]
    pub description_column: usize,
    #[serde(rename = "dateColumn")]
    pub date_column: usize,
}

impl Default for ElectionMapLayout {
    fn default() -> Self {
        ElectionMapLayout {
            index_column: 1,
            description_column: 2,
            date_column: 3,
        }
    }
}

impl ElectionMapLayout {
    /// The number of cells a row needs to be readable.
    pub fn min_width(&self) -> usize {
        self.index_column
            .max(self.description_column)
            .max(self.date_column)
            + 1
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    #[serde(rename = "inputDirectory")]
    pub input_directory: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "columnTemplateFile")]
    pub column_template_file: Option<String>,
    #[serde(rename = "templateColumn")]
    pub template_column: Option<String>,
    #[serde(rename = "voterFileMarker")]
    pub voter_file_marker: Option<String>,
    #[serde(rename = "electionMapMarker")]
    pub election_map_marker: Option<String>,
    #[serde(rename = "zoneCodesMarker")]
    pub zone_codes_marker: Option<String>,
    #[serde(rename = "zoneTypesMarker")]
    pub zone_types_marker: Option<String>,
    #[serde(rename = "electionMap")]
    pub election_map: Option<ElectionMapLayout>,
    #[serde(rename = "withheldFeatures")]
    pub withheld_features: Option<Vec<String>>,
    #[serde(rename = "unknownFields")]
    pub unknown_fields: Option<String>,
    #[serde(rename = "referenceDate")]
    pub reference_date: Option<String>,
    #[serde(rename = "combinedOutputFile")]
    pub combined_output_file: Option<String>,
    pub parallel: Option<bool>,
}

/// The strings that tell the county extracts apart in the file names.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FileMarkers {
    pub voter_file: String,
    pub election_map: String,
    pub zone_codes: String,
    pub zone_types: String,
}

impl Default for FileMarkers {
    fn default() -> Self {
        FileMarkers {
            voter_file: "FVE".to_string(),
            election_map: "Election Map".to_string(),
            zone_codes: "Zone Codes".to_string(),
            zone_types: "Zone Types".to_string(),
        }
    }
}

pub const DEFAULT_TEMPLATE_FILE: &str = "column_mapping.csv";
pub const DEFAULT_TEMPLATE_COLUMN: &str = "Field Description";
pub const DEFAULT_OUTPUT_DIR: &str = "processed_data";
pub const DEFAULT_COMBINED_FILE: &str = "all_counties.csv";

/// Everything a run needs, once the command line and the configuration file
/// have been reconciled.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_file: PathBuf,
    pub template_column: String,
    pub markers: FileMarkers,
    pub layout: ElectionMapLayout,
    pub withheld: WithheldFeatures,
    pub options: AlignOptions,
    pub combined_file: PathBuf,
    pub parallel: bool,
    pub reference: Option<PathBuf>,
}

pub fn read_config(path: &str) -> BPResult<RunConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RunConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn parse_policy(value: &str) -> PResult<UnknownFieldPolicy> {
    match value {
        "widen" => Ok(UnknownFieldPolicy::Widen),
        "reject" => Ok(UnknownFieldPolicy::Reject),
        x => UnknownPolicySnafu { value: x }.fail(),
    }
}

pub fn parse_reference_date(value: &str) -> PResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").context(ReferenceDateSnafu { value })
}

// Paths from the configuration file are relative to the file itself.
fn relative_to(base: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Settings {
    pub fn resolve(args: &Args) -> BPResult<Settings> {
        let (config, base) = match &args.config {
            Some(p) => {
                let config = read_config(p)?;
                let base = Path::new(p)
                    .parent()
                    .map(|b| b.to_path_buf())
                    .unwrap_or_default();
                (config, base)
            }
            None => (RunConfig::default(), PathBuf::new()),
        };
        Settings::from_parts(args, config, &base)
    }

    pub fn from_parts(args: &Args, config: RunConfig, base: &Path) -> BPResult<Settings> {
        let input_dir = match (&args.input, &config.input_directory) {
            (Some(p), _) => PathBuf::from(p),
            (None, Some(p)) => relative_to(base, p),
            (None, None) => return Err(Box::new(PipelineError::MissingInput {})),
        };
        let output_dir = match (&args.out, &config.output_directory) {
            (Some(p), _) => PathBuf::from(p),
            (None, Some(p)) => relative_to(base, p),
            (None, None) => PathBuf::from(DEFAULT_OUTPUT_DIR),
        };
        let template_file = match (&args.template, &config.column_template_file) {
            (Some(p), _) => PathBuf::from(p),
            (None, Some(p)) => relative_to(base, p),
            (None, None) => input_dir.join(DEFAULT_TEMPLATE_FILE),
        };

        let defaults = FileMarkers::default();
        let markers = FileMarkers {
            voter_file: config.voter_file_marker.unwrap_or(defaults.voter_file),
            election_map: config.election_map_marker.unwrap_or(defaults.election_map),
            zone_codes: config.zone_codes_marker.unwrap_or(defaults.zone_codes),
            zone_types: config.zone_types_marker.unwrap_or(defaults.zone_types),
        };

        let withheld = match config.withheld_features {
            Some(names) => WithheldFeatures::new(names),
            None => WithheldFeatures::default(),
        };

        let today = match args.reference_date.as_ref().or(config.reference_date.as_ref()) {
            Some(d) => parse_reference_date(d)?,
            None => Local::now().date_naive(),
        };
        let unknown_fields = match args.unknown_fields.as_ref().or(config.unknown_fields.as_ref()) {
            Some(p) => parse_policy(p)?,
            None => UnknownFieldPolicy::Widen,
        };

        let combined_file = output_dir.join(
            config
                .combined_output_file
                .unwrap_or_else(|| DEFAULT_COMBINED_FILE.to_string()),
        );

        Ok(Settings {
            input_dir,
            output_dir,
            template_file,
            template_column: config
                .template_column
                .unwrap_or_else(|| DEFAULT_TEMPLATE_COLUMN.to_string()),
            markers,
            layout: config.election_map.unwrap_or_default(),
            withheld,
            options: AlignOptions {
                today,
                unknown_fields,
            },
            combined_file,
            parallel: args.parallel || config.parallel.unwrap_or(false),
            reference: args.reference.as_ref().map(PathBuf::from),
        })
    }
}
