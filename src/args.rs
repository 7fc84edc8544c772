use clap::Parser;

/// Aligns the county voter file extracts onto one canonical feature table.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the run configuration. Paths in it are relative to
    /// the location of the file. See the manual for the list of keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) The directory with the county extracts and the column template. Setting this
    /// option overrides the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (directory, default processed_data) Where the aligned tables and the manifests are written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, default <input>/column_mapping.csv) The column template.
    #[clap(short, long, value_parser)]
    pub template: Option<String>,

    /// (file path) A reference features manifest in JSON format. If provided, pavoter will
    /// check that the produced manifest matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (YYYY-MM-DD, default today) The upper bound of the date features.
    #[clap(long, value_parser)]
    pub reference_date: Option<String>,

    /// (widen or reject, default widen) What to do with a raw field that has no transform.
    #[clap(long, value_parser)]
    pub unknown_fields: Option<String>,

    /// If passed as an argument, the counties are aligned in parallel.
    #[clap(long, takes_value = false)]
    pub parallel: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
