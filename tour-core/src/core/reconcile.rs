//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::dataset::Dataset;
use crate::core::matcher::Matches;
use crate::core::Issue;
use std::collections::HashMap;

/// Operations of a standard update
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct StandardOps {
    /// Add uploaded features without match
    pub add: bool,
    /// Update matched features with uploaded geometry and properties
    pub modify: bool,
    /// Remove existing features without match
    pub remove: bool,
}

impl StandardOps {
    pub fn any(&self) -> bool {
        self.add || self.modify || self.remove
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpdateMode {
    Standard(StandardOps),
    /// Uploaded features replace the dataset features
    Replace,
    /// Matched features are removed from the dataset
    Remove,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateOutcome {
    pub candidate: Dataset,
    /// Ids of new features
    pub added: Vec<String>,
    /// Ids of matched features that took uploaded data
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl UpdateOutcome {
    fn new(candidate: Dataset) -> UpdateOutcome {
        UpdateOutcome {
            candidate,
            added: Vec::new(),
            modified: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Compute the updated dataset. The existing dataset is never modified.
pub fn reconcile(
    mode: UpdateMode,
    matches: &Matches,
    existing: &Dataset,
    uploaded: &Dataset,
) -> Result<UpdateOutcome, Issue> {
    if mode != UpdateMode::Remove && existing.feature_type() != uploaded.feature_type() {
        return Err(Issue::FeatureTypeMismatch {
            expected: existing.feature_type(),
            found: uploaded.feature_type(),
        });
    }
    let outcome = match mode {
        UpdateMode::Replace => replace(matches, existing, uploaded)?,
        UpdateMode::Remove => remove(matches, existing),
        UpdateMode::Standard(ops) => standard(ops, matches, existing, uploaded)?,
    };
    info!(
        "Update of dataset {}: {} added, {} modified, {} removed",
        existing.id(),
        outcome.added.len(),
        outcome.modified.len(),
        outcome.removed.len()
    );
    Ok(outcome)
}

/// Uploaded features become the dataset features. Matched features keep id and authored content.
pub fn replace(
    matches: &Matches,
    existing: &Dataset,
    uploaded: &Dataset,
) -> Result<UpdateOutcome, Issue> {
    let mut outcome = UpdateOutcome::new(existing.without_features());
    for (key, feature) in uploaded.features() {
        let mut feature = feature.detached();
        let matched = matches
            .get(key)
            .and_then(|id| existing.feature(id).map(|f| (id, f)));
        if let Some((id, old)) = matched {
            feature.copy_authored_from(old);
            feature.set_id(id);
        }
        let id = outcome.candidate.add_feature(feature)?;
        if matched.is_some() {
            outcome.modified.push(id);
        } else {
            outcome.added.push(id);
        }
    }
    for id in existing.features().keys() {
        if outcome.candidate.feature(id).is_none() {
            outcome.removed.push(id.clone());
        }
    }
    outcome
        .candidate
        .set_property_list(uploaded.property_list().to_vec(), uploaded.name_property());
    Ok(outcome)
}

/// Drop every matched feature
pub fn remove(matches: &Matches, existing: &Dataset) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::new(existing.clone());
    for id in matches.values() {
        if outcome.candidate.remove_feature(id).is_some() {
            outcome.removed.push(id.clone());
        }
    }
    outcome
}

pub fn standard(
    ops: StandardOps,
    matches: &Matches,
    existing: &Dataset,
    uploaded: &Dataset,
) -> Result<UpdateOutcome, Issue> {
    if !ops.any() {
        return Err(Issue::NoStandardOperation);
    }
    let by_existing: HashMap<&str, &str> = matches
        .iter()
        .map(|(upload_key, id)| (id.as_str(), upload_key.as_str()))
        .collect();
    let mut outcome = UpdateOutcome::new(existing.without_features());
    for (id, feature) in existing.features() {
        let upload = by_existing
            .get(id.as_str())
            .and_then(|key| uploaded.feature(key));
        match upload {
            Some(upload) if ops.modify => {
                let mut feature = feature.clone();
                feature.absorb(upload);
                outcome.candidate.add_feature(feature)?;
                outcome.modified.push(id.clone());
            }
            None if ops.remove => outcome.removed.push(id.clone()),
            _ => {
                outcome.candidate.add_feature(feature.clone())?;
            }
        }
    }
    if ops.add {
        for (key, feature) in uploaded.features() {
            if !matches.contains_key(key) {
                let id = outcome.candidate.add_feature(feature.detached())?;
                outcome.added.push(id);
            }
        }
    }
    if ops.add || ops.modify {
        outcome
            .candidate
            .extend_property_list(uploaded.property_list());
    }
    Ok(outcome)
}
