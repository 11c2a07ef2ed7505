//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::geom::FeatureType;
use std::fmt;

/// Validation problems reported to authors. Issues are collected, never raised one by one.
#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    /// No upload file selected
    NoFile,
    /// Upload could not be read or parsed
    UnreadableUpload(String),
    /// Upload contains no feature with valid geometry
    NoValidFeatures,
    /// No dataset selected
    NoDataset,
    UnknownDataset(String),
    FeatureTypeMismatch {
        expected: FeatureType,
        found: FeatureType,
    },
    /// Property matching requested without a property
    NoMatchProperty,
    /// Property is not part of the dataset (`upload == false`) or upload property list
    UnknownProperty { property: String, upload: bool },
    /// Standard update without add, modify or remove
    NoStandardOperation,
    /// Update requires a way to match features
    NoMatchKey,
    /// Staged update file disappeared
    StagedFileMissing,
    /// Live dataset changed after the update was staged
    DatasetModified,
}

impl Issue {
    /// Stale-state issues are recoverable by recomputing the staged update
    pub fn is_not_ready(&self) -> bool {
        match self {
            Issue::StagedFileMissing | Issue::DatasetModified => true,
            _ => false,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Issue::NoFile => write!(f, "Please upload a file."),
            Issue::UnreadableUpload(msg) => write!(f, "The uploaded file could not be read: {}", msg),
            Issue::NoValidFeatures => write!(f, "The uploaded file contains no valid features."),
            Issue::NoDataset => write!(f, "Please select a dataset to update."),
            Issue::UnknownDataset(id) => write!(f, "Dataset '{}' does not exist.", id),
            Issue::FeatureTypeMismatch { expected, found } => write!(
                f,
                "Feature type mismatch: the dataset has type {}, the upload has type {}.",
                expected, found
            ),
            Issue::NoMatchProperty => {
                write!(f, "Please select a property to match features by.")
            }
            Issue::UnknownProperty { property, upload } => write!(
                f,
                "Property '{}' does not exist in the {}.",
                property,
                if *upload { "uploaded file" } else { "dataset" }
            ),
            Issue::NoStandardOperation => write!(
                f,
                "Standard updates need at least one of the options add, modify or remove."
            ),
            Issue::NoMatchKey => write!(
                f,
                "Please select coordinates or a property to match existing features."
            ),
            Issue::StagedFileMissing => write!(
                f,
                "The staged update could not be found and has been regenerated."
            ),
            Issue::DatasetModified => write!(
                f,
                "The dataset has been modified since the update was prepared. Please review the regenerated update."
            ),
        }
    }
}

impl std::error::Error for Issue {}

/// One message line per issue
pub fn issue_list(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}
