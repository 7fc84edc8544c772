// The JSON manifests: the canonical elections and the canonical feature names.

use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use voter_alignment::{ElectionRegistry, FeatureSchema};

use crate::pipeline::*;

pub const ELECTIONS_FILE: &str = "elections.json";
pub const FEATURES_FILE: &str = "features.json";

/// date -> descriptions, in registry order.
pub fn elections_to_json(registry: &ElectionRegistry) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for e in registry.elections() {
        m.insert(e.date.clone(), json!(e.descriptions));
    }
    JSValue::Object(m)
}

pub fn features_to_json(schema: &FeatureSchema) -> JSValue {
    json!({
        "demographic": schema.demographic(),
        "elections": schema.elections(),
    })
}

pub fn pretty(js: &JSValue) -> BPResult<String> {
    let s = serde_json::to_string_pretty(js).context(ParsingJsonSnafu {})?;
    Ok(s)
}

pub fn write_json(path: &Path, js: &JSValue) -> BPResult<()> {
    let mut text = pretty(js)?;
    text.push('\n');
    fs::write(path, text).context(WritingFileSnafu {
        path: path.display().to_string(),
    })?;
    debug!("write_json: wrote {:?}", path);
    Ok(())
}

pub fn read_json(path: &Path) -> BPResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.display().to_string(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
