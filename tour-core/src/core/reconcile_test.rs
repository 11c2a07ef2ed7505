//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::dataset::Dataset;
use crate::core::dataset_test::cities;
use crate::core::feature::PropertyValue;
use crate::core::geom::{Coordinates, FeatureType};
use crate::core::matcher::{match_features, MatchKey, Matches};
use crate::core::reconcile::*;
use crate::core::Issue;

fn point(x: f64, code: i64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [x, 1.0]},
        "properties": {"code": code, "extra": "upload"}
    })
}

/// Existing dataset with codes 0..3 and an upload with codes 0..10
fn datasets() -> (Dataset, Dataset) {
    let existing = json!({
        "type": "FeatureCollection",
        "name": "Codes",
        "features": (0..3).map(|i| point(i as f64, i)).collect::<Vec<_>>()
    });
    let mut existing = Dataset::from_geojson(&existing).unwrap();
    existing.initialize(None, &[]);
    let upload = json!({
        "type": "FeatureCollection",
        "features": (0..10).map(|i| point(100.0 + i as f64, i)).collect::<Vec<_>>()
    });
    (existing, Dataset::from_geojson(&upload).unwrap())
}

fn by_code(existing: &Dataset, uploaded: &Dataset) -> Matches {
    match_features(
        MatchKey::Property,
        Some("code"),
        None,
        existing.features(),
        uploaded.features(),
    )
}

fn authored(dataset: &mut Dataset) {
    let mut header = dataset.as_header();
    for entry in header.features.iter_mut() {
        entry.custom_name = Some(format!("Custom {}", entry.id.clone().unwrap_or_default()));
        entry.popup_content = Some("Authored".to_string());
        entry.hide = Some(true);
    }
    dataset.update_from_header(&header);
}

#[test]
fn test_standard_add() {
    let (existing, uploaded) = datasets();
    let matches = by_code(&existing, &uploaded);
    assert_eq!(matches.len(), 3);
    let ops = StandardOps {
        add: true,
        ..Default::default()
    };
    let outcome = reconcile(UpdateMode::Standard(ops), &matches, &existing, &uploaded).unwrap();
    assert_eq!(outcome.added.len(), 7);
    assert_eq!(outcome.added[0], "codes--3");
    assert_eq!(outcome.added[6], "codes--9");
    assert!(outcome.modified.is_empty());
    assert!(outcome.removed.is_empty());
    assert_eq!(outcome.candidate.features().len(), 10);
    assert_eq!(outcome.candidate.feature_counter(), 10);
    // matched features untouched
    assert_eq!(
        outcome.candidate.feature("codes--0").unwrap().coordinates,
        Coordinates::Point([0.0, 1.0])
    );
    // live dataset untouched
    assert_eq!(existing.features().len(), 3);
    assert_eq!(existing.feature_counter(), 3);
}

#[test]
fn test_standard_modify_remove() {
    let (mut existing, uploaded) = datasets();
    authored(&mut existing);
    let uploaded_subset = {
        let mut u = uploaded.clone();
        for key in &["0", "2", "3", "4", "5", "6", "7", "8", "9"] {
            u.remove_feature(key);
        }
        u
    };
    let matches = by_code(&existing, &uploaded_subset);
    assert_eq!(matches.len(), 1);
    let ops = StandardOps {
        modify: true,
        remove: true,
        ..Default::default()
    };
    let outcome = reconcile(
        UpdateMode::Standard(ops),
        &matches,
        &existing,
        &uploaded_subset,
    )
    .unwrap();
    assert_eq!(outcome.modified, vec!["codes--1"]);
    assert_eq!(outcome.removed, vec!["codes--0", "codes--2"]);
    let feature = outcome.candidate.feature("codes--1").unwrap();
    assert_eq!(feature.coordinates, Coordinates::Point([101.0, 1.0]));
    assert_eq!(feature.custom_name, Some("Custom codes--1".to_string()));
    assert_eq!(feature.popup_content, Some("Authored".to_string()));
    assert_eq!(
        feature.properties.get("extra"),
        Some(&PropertyValue::String("upload".to_string()))
    );
    assert_eq!(outcome.candidate.features().len(), 1);
}

#[test]
fn test_standard_no_ops() {
    let (existing, uploaded) = datasets();
    assert_eq!(
        reconcile(
            UpdateMode::Standard(StandardOps::default()),
            &Matches::new(),
            &existing,
            &uploaded
        ),
        Err(Issue::NoStandardOperation)
    );
}

#[test]
fn test_replace() {
    let (mut existing, uploaded) = datasets();
    authored(&mut existing);
    let matches = by_code(&existing, &uploaded);
    let outcome = reconcile(UpdateMode::Replace, &matches, &existing, &uploaded).unwrap();
    let candidate = &outcome.candidate;
    assert_eq!(candidate.features().len(), 10);
    assert_eq!(outcome.modified, vec!["codes--0", "codes--1", "codes--2"]);
    assert_eq!(outcome.added.len(), 7);
    assert!(outcome.removed.is_empty());
    let first = candidate.feature("codes--0").unwrap();
    assert_eq!(first.custom_name, Some("Custom codes--0".to_string()));
    assert!(first.is_hidden());
    assert_eq!(first.coordinates, Coordinates::Point([100.0, 1.0]));
    let fresh = candidate.feature("codes--3").unwrap();
    assert_eq!(fresh.custom_name, None);
    assert_eq!(fresh.dataset_id(), Some("codes"));

    // unmatched existing features are gone
    let outcome = reconcile(UpdateMode::Replace, &Matches::new(), &existing, &uploaded).unwrap();
    assert_eq!(outcome.removed.len(), 3);
    assert_eq!(outcome.candidate.feature("codes--0"), None);
    assert_eq!(outcome.added[0], "codes--3");
}

#[test]
fn test_replace_property_list() {
    let mut existing = cities();
    existing.auto_popup_properties = vec!["canton".to_string()];
    let uploaded = Dataset::from_geojson(&json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]}, "properties": {"label": "A"}}
        ]
    }))
    .unwrap();
    let outcome = replace(&Matches::new(), &existing, &uploaded).unwrap();
    assert_eq!(outcome.candidate.property_list(), &["label"]);
    assert_eq!(outcome.candidate.name_property(), Some("label"));
    assert!(outcome.candidate.auto_popup_properties.is_empty());
}

#[test]
fn test_remove() {
    let (existing, uploaded) = datasets();
    let mut matches = by_code(&existing, &uploaded);
    matches.shift_remove("1");
    let outcome = reconcile(UpdateMode::Remove, &matches, &existing, &uploaded).unwrap();
    assert_eq!(outcome.removed, vec!["codes--0", "codes--2"]);
    assert_eq!(
        outcome.candidate.features().keys().collect::<Vec<_>>(),
        vec!["codes--1"]
    );
    assert!(outcome.added.is_empty());
}

#[test]
fn test_type_mismatch() {
    let (existing, _) = datasets();
    let lines = Dataset::from_geojson(&json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[1, 1], [2, 2]]}, "properties": {}}
        ]
    }))
    .unwrap();
    assert_eq!(
        reconcile(UpdateMode::Replace, &Matches::new(), &existing, &lines),
        Err(Issue::FeatureTypeMismatch {
            expected: FeatureType::Point,
            found: FeatureType::LineString
        })
    );
    // removal does not look at geometry types
    assert!(reconcile(UpdateMode::Remove, &Matches::new(), &existing, &lines).is_ok());
}
