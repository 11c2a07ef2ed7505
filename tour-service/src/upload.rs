//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use regex::Regex;
use serde_json::Value;
use std::path::Path;
use tour_core::core::Issue;

/// Prefix of a JavaScript upload: `var json_<name> = `
const JSON_VAR_REGEX: &str = r"^.*var(\s)+json_(\w)*(\s)+=(\s)+";

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum UploadKind {
    Json,
    /// JavaScript source assigning a GeoJSON literal to a `json_` variable
    JavaScript,
}

impl UploadKind {
    pub fn from_path(path: &str) -> Option<UploadKind> {
        let ext = Path::new(path).extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" | "geojson" => Some(UploadKind::Json),
            "js" => Some(UploadKind::JavaScript),
            _ => None,
        }
    }
    pub fn from_mime(mime: &str) -> Option<UploadKind> {
        match mime {
            "application/json" | "application/geo+json" => Some(UploadKind::Json),
            "text/javascript" | "application/javascript" => Some(UploadKind::JavaScript),
            _ => None,
        }
    }
}

/// Strip the variable assignment of a JavaScript upload.
///
/// The prefix pattern is first applied across lines. If it does not match, a single-line match
/// is tried.
pub fn strip_js_assignment(text: &str) -> Result<String, Issue> {
    for pattern in &[format!("(?s){}", JSON_VAR_REGEX), JSON_VAR_REGEX.to_string()] {
        let re = Regex::new(pattern).map_err(|e| Issue::UnreadableUpload(e.to_string()))?;
        if re.is_match(text) {
            let json = re.replacen(text, 1, "");
            return Ok(json.trim_end().trim_end_matches(';').to_string());
        }
    }
    Err(Issue::UnreadableUpload(
        "no `var json_<name> = ...` assignment found".to_string(),
    ))
}

/// Parse an uploaded file into JSON
pub fn parse_upload(kind: UploadKind, content: &[u8]) -> Result<Value, Issue> {
    let text =
        std::str::from_utf8(content).map_err(|e| Issue::UnreadableUpload(e.to_string()))?;
    let json = match kind {
        UploadKind::Json => text.to_string(),
        UploadKind::JavaScript => strip_js_assignment(text)?,
    };
    let value: Value =
        serde_json::from_str(&json).map_err(|e| Issue::UnreadableUpload(e.to_string()))?;
    if !value.is_object() {
        return Err(Issue::UnreadableUpload(
            "expected a FeatureCollection object".to_string(),
        ));
    }
    debug!("Parsed {:?} upload ({} bytes)", kind, content.len());
    Ok(value)
}

/// Parse an uploaded file, detecting its kind from the file name
pub fn parse_upload_file(path: &str, content: &[u8]) -> Result<Value, Issue> {
    let kind = UploadKind::from_path(path).ok_or_else(|| {
        Issue::UnreadableUpload(format!("unsupported file type: {}", path))
    })?;
    parse_upload(kind, content)
}
