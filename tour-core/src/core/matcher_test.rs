//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::dataset::Dataset;
use crate::core::dataset_test::{cities, upload};
use crate::core::feature::{Feature, Properties, PropertyValue};
use crate::core::geom::Coordinates;
use crate::core::matcher::*;
use crate::core::EnumString;
use indexmap::IndexMap;

fn features(points: &[(f64, Option<i64>)]) -> IndexMap<String, Feature> {
    points
        .iter()
        .enumerate()
        .map(|(i, (x, code))| {
            let mut props = Properties::new();
            if let Some(code) = code {
                props.insert("code".to_string(), PropertyValue::Int(*code));
                props.insert("other".to_string(), PropertyValue::Int(*code));
            }
            (i.to_string(), Feature::new(Coordinates::Point([*x, 0.0]), props))
        })
        .collect()
}

#[test]
fn test_match_key() {
    assert_eq!(MatchKey::from_str("coords"), Ok(MatchKey::Coordinates));
    assert_eq!(MatchKey::from_str("Property"), Ok(MatchKey::Property));
    assert_eq!(MatchKey::from_str(""), Ok(MatchKey::None));
    assert!(MatchKey::from_str("name").is_err());
    assert_eq!(serde_json::to_value(MatchKey::Coordinates).unwrap(), json!("coordinates"));
}

#[test]
fn test_identity() {
    let dataset = cities();
    let matches = match_features(
        MatchKey::Coordinates,
        None,
        None,
        dataset.features(),
        dataset.features(),
    );
    assert_eq!(matches.len(), 3);
    for (uploaded, existing) in &matches {
        assert_eq!(uploaded, existing);
    }
}

#[test]
fn test_none() {
    let dataset = cities();
    let matches = match_features(
        MatchKey::None,
        Some("id"),
        None,
        dataset.features(),
        dataset.features(),
    );
    assert!(matches.is_empty());
}

#[test]
fn test_coordinates() {
    let existing = features(&[(1.0, None), (2.0, None), (2.0, None)]);
    let uploaded = features(&[(2.0, None), (3.0, None), (2.0, None), (2.0, None)]);
    let matches = match_features(MatchKey::Coordinates, None, None, &existing, &uploaded);
    // one-to-one, first match wins
    assert_eq!(matches.get("0").map(|s| s.as_str()), Some("1"));
    assert_eq!(matches.get("2").map(|s| s.as_str()), Some("2"));
    assert_eq!(matches.get("3"), None);
    assert_eq!(matches.len(), 2);
}

#[test]
fn test_property() {
    let existing = features(&[(1.0, Some(10)), (2.0, None), (3.0, Some(30))]);
    let uploaded = features(&[(9.0, Some(30)), (9.0, None), (9.0, Some(10)), (9.0, Some(10))]);
    let matches = match_features(MatchKey::Property, Some("code"), None, &existing, &uploaded);
    assert_eq!(
        matches.iter().map(|(u, e)| (u.as_str(), e.as_str())).collect::<Vec<_>>(),
        vec![("0", "2"), ("2", "0")]
    );
    let matches = match_features(
        MatchKey::Property,
        Some("code"),
        Some("other"),
        &existing,
        &uploaded,
    );
    assert_eq!(matches.len(), 2);
    let matches = match_features(
        MatchKey::Property,
        Some("code"),
        Some("missing"),
        &existing,
        &uploaded,
    );
    assert!(matches.is_empty());
    let matches = match_features(MatchKey::Property, None, None, &existing, &uploaded);
    assert!(matches.is_empty());
}

#[test]
fn test_upload_by_property() {
    let dataset = cities();
    let uploaded = Dataset::from_geojson(&upload()).unwrap();
    let matches = match_features(
        MatchKey::Property,
        Some("City Name"),
        None,
        dataset.features(),
        uploaded.features(),
    );
    assert_eq!(matches.get("4").map(|s| s.as_str()), Some("swiss-cities--2"));
    assert_eq!(
        matched_names(&matches, &dataset),
        vec!["Zurich", "Bern", "Geneva"]
    );
}

#[test]
fn test_matched_names_limit() {
    let mut dataset = cities();
    let mut matches = Matches::new();
    for i in 0..20 {
        let fid = dataset
            .add_feature(Feature::new(Coordinates::Point([0.0, i as f64]), Properties::new()))
            .unwrap();
        matches.insert(i.to_string(), fid);
    }
    let names = matched_names(&matches, &dataset);
    assert_eq!(names.len(), 16);
    assert_eq!(names[0], "swiss-cities--3");
    assert_eq!(names[15], "...and 5 more");
}
