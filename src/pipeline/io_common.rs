use std::path::{Path, PathBuf};

use crate::pipeline::{config_reader::FileMarkers, *};

/// The extracts of one county. Any of them may be missing.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CountyFiles {
    pub county: String,
    pub voter_file: Option<PathBuf>,
    pub election_map: Option<PathBuf>,
    pub zone_codes: Option<PathBuf>,
    pub zone_types: Option<PathBuf>,
}

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// The extracts are Latin-1. Windows-1252 is a superset for the printable range,
/// and the decoding never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors {
        debug!("decode_latin1: some bytes were replaced");
    }
    text.into_owned()
}

pub fn read_latin1(path: &Path) -> BPResult<String> {
    let bytes = fs::read(path).context(OpeningFileSnafu {
        path: path.display().to_string(),
    })?;
    Ok(decode_latin1(&bytes))
}

/// Lists the county extracts of the input directory, sorted by county name.
///
/// The county name is the first word of the file name. The column template is
/// not a county file.
pub fn discover_counties(
    input_dir: &Path,
    template_file: &Path,
    markers: &FileMarkers,
) -> BPResult<Vec<CountyFiles>> {
    let template_name = simplify_file_name(template_file);
    let entries = fs::read_dir(input_dir).context(OpeningFileSnafu {
        path: input_dir.display().to_string(),
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context(OpeningFileSnafu {
            path: input_dir.display().to_string(),
        })?;
        let path = entry.path();
        if path.is_file() && simplify_file_name(&path) != template_name {
            paths.push(path);
        }
    }
    paths.sort();

    let mut counties: BTreeMap<String, CountyFiles> = BTreeMap::new();
    for path in paths {
        let name = simplify_file_name(&path);
        let county = match name.split_whitespace().next() {
            Some(c) => c.to_string(),
            None => continue,
        };
        let files = counties.entry(county.clone()).or_insert_with(|| CountyFiles {
            county,
            ..CountyFiles::default()
        });
        let slot = if name.contains(&markers.voter_file) {
            &mut files.voter_file
        } else if name.contains(&markers.election_map) {
            &mut files.election_map
        } else if name.contains(&markers.zone_codes) {
            &mut files.zone_codes
        } else if name.contains(&markers.zone_types) {
            &mut files.zone_types
        } else {
            debug!("discover_counties: ignoring {:?}", name);
            continue;
        };
        if let Some(previous) = slot.replace(path) {
            warn!(
                "discover_counties: {:?} replaces {:?}",
                name,
                simplify_file_name(&previous)
            );
        }
    }

    Ok(counties.into_values().collect())
}
