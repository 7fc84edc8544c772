use clap::Parser;
use log::{info, warn, LevelFilter};

mod args;
mod pipeline;

use crate::pipeline::config_reader::Settings;

fn main() {
    let args = args::Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let res = Settings::resolve(&args).and_then(|settings| pipeline::run(&settings));
    match res {
        Ok(summary) => {
            info!(
                "Done: {} counties written, {} skipped, {} rows",
                summary.counties_written, summary.counties_skipped, summary.rows_written
            );
        }
        Err(e) => {
            warn!("Error occurred {:?}", e);
            eprintln!("An error occurred: {}", e);
            if let Some(source) = std::error::Error::source(e.as_ref()) {
                eprintln!("Caused by: {}", source);
            }
            std::process::exit(1);
        }
    }
}
