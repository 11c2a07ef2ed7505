//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::dataset::Dataset;
use crate::core::feature::Feature;
use crate::core::EnumString;
use indexmap::IndexMap;

/// How uploaded features are matched to existing ones
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MatchKey {
    None,
    Coordinates,
    Property,
}

impl EnumString<MatchKey> for MatchKey {
    fn from_str(val: &str) -> Result<MatchKey, String> {
        match val.to_lowercase().as_str() {
            "none" | "" => Ok(MatchKey::None),
            "coords" | "coordinates" => Ok(MatchKey::Coordinates),
            "property" => Ok(MatchKey::Property),
            _ => Err(format!("Unknown match key '{}'", val)),
        }
    }
    fn as_str(&self) -> &'static str {
        match self {
            MatchKey::None => "none",
            MatchKey::Coordinates => "coordinates",
            MatchKey::Property => "property",
        }
    }
}

enum_string_serialization!(MatchKey MatchKeyVisitor);

impl Default for MatchKey {
    fn default() -> Self {
        MatchKey::None
    }
}

/// Uploaded feature key -> existing feature id
pub type Matches = IndexMap<String, String>;

/// Match uploaded features to existing ones.
///
/// Every existing feature matches at most one uploaded feature, the first one in upload order.
/// With `Property` the existing features are compared by `existing_property` and the uploaded
/// ones by `uploaded_property`, which defaults to `existing_property`. Absent values never match.
pub fn match_features(
    key: MatchKey,
    existing_property: Option<&str>,
    uploaded_property: Option<&str>,
    existing: &IndexMap<String, Feature>,
    uploaded: &IndexMap<String, Feature>,
) -> Matches {
    let mut matches = Matches::new();
    let same = |e: &Feature, u: &Feature| -> bool {
        match key {
            MatchKey::None => false,
            MatchKey::Coordinates => e.coordinates == u.coordinates,
            MatchKey::Property => {
                let existing_value =
                    existing_property.and_then(|p| e.properties.get(p));
                let uploaded_value = uploaded_property
                    .or(existing_property)
                    .and_then(|p| u.properties.get(p));
                match (existing_value, uploaded_value) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
        }
    };
    if key == MatchKey::None {
        return matches;
    }
    let mut taken: Vec<&str> = Vec::new();
    for (upload_key, u) in uploaded {
        let found = existing
            .iter()
            .find(|(id, e)| !taken.contains(&id.as_str()) && same(*e, u));
        if let Some((id, _)) = found {
            taken.push(id.as_str());
            matches.insert(upload_key.clone(), id.clone());
        }
    }
    debug!("Matched {} of {} uploaded features", matches.len(), uploaded.len());
    matches
}

const MATCH_SUMMARY_LIMIT: usize = 15;

/// Names of matched existing features, at most 15 followed by `...and N more`
pub fn matched_names(matches: &Matches, dataset: &Dataset) -> Vec<String> {
    let mut names: Vec<String> = matches
        .values()
        .take(MATCH_SUMMARY_LIMIT)
        .map(|id| dataset.feature_name(id).unwrap_or_else(|| id.clone()))
        .collect();
    if matches.len() > MATCH_SUMMARY_LIMIT {
        names.push(format!("...and {} more", matches.len() - MATCH_SUMMARY_LIMIT));
    }
    names
}
