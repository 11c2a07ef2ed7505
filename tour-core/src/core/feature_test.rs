//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::feature::*;
use crate::core::geom::{Coordinates, FeatureType, GeometryError};

fn point_feature() -> Feature {
    Feature::from_geojson(
        &json!({
            "type": "Feature",
            "id": "ignored",
            "geometry": {"type": "Point", "coordinates": [8.5, 47.25]},
            "properties": {"NAME": "Zurich", "pop": 415367, "area": 87.88, "capital": false, "note": null}
        }),
        Some(FeatureType::Point),
    )
    .unwrap()
}

#[test]
fn test_from_geojson() {
    let feature = point_feature();
    assert_eq!(feature.id(), None);
    assert_eq!(feature.coordinates, Coordinates::Point([8.5, 47.25]));
    assert_eq!(
        feature.properties.keys().collect::<Vec<_>>(),
        vec!["NAME", "pop", "area", "capital"]
    );
    assert_eq!(feature.properties["pop"], PropertyValue::Int(415367));
    assert_eq!(feature.properties["area"], PropertyValue::Double(87.88));
    assert_eq!(feature.properties["capital"], PropertyValue::Bool(false));

    let err = Feature::from_geojson(
        &json!({"geometry": {"type": "Point", "coordinates": [8.5, 47.25]}}),
        Some(FeatureType::LineString),
    );
    assert_eq!(
        err,
        Err(GeometryError::TypeMismatch {
            expected: FeatureType::LineString,
            found: FeatureType::Point
        })
    );
    assert_eq!(
        Feature::from_geojson(&json!({"properties": {}}), None),
        Err(GeometryError::MissingGeometry)
    );
}

#[test]
fn test_set_once() {
    let mut feature = point_feature();
    feature.set_id("zh--0");
    feature.set_id("zh--1");
    assert_eq!(feature.id(), Some("zh--0"));
    feature.set_dataset_id("zh");
    feature.set_dataset_id("other");
    assert_eq!(feature.dataset_id(), Some("zh"));
    let copy = feature.detached();
    assert_eq!(copy.id(), None);
    assert_eq!(copy.dataset_id(), None);
    assert_eq!(copy.coordinates, feature.coordinates);
}

#[test]
fn test_name() {
    let mut feature = point_feature();
    assert_eq!(feature.name(Some("NAME")), "Zurich");
    assert_eq!(feature.name(None), "");
    feature.set_id("zh--0");
    assert_eq!(feature.name(Some("missing")), "zh--0");
    assert_eq!(feature.name(Some("pop")), "415367");
    feature.custom_name = Some("Züri".to_string());
    assert_eq!(feature.name(Some("NAME")), "Züri");
}

#[test]
fn test_update() {
    let mut feature = point_feature();
    let mut props = Properties::new();
    props.insert("pop".to_string(), PropertyValue::Int(1));
    props.insert("canton".to_string(), PropertyValue::String("ZH".to_string()));
    feature.update(&FeatureHeader {
        custom_name: Some("City".to_string()),
        hide: Some(true),
        coordinates: Some(json!({"lng": 9, "lat": 47})),
        properties: Some(props),
        ..Default::default()
    });
    assert_eq!(feature.custom_name, Some("City".to_string()));
    assert!(feature.is_hidden());
    assert_eq!(feature.coordinates, Coordinates::Point([9.0, 47.0]));
    assert_eq!(feature.properties["pop"], PropertyValue::Int(1));
    assert_eq!(feature.properties["NAME"], PropertyValue::String("Zurich".to_string()));
    assert_eq!(
        feature.properties.keys().last().map(|k| k.as_str()),
        Some("canton")
    );

    // invalid coordinates are ignored
    feature.update(&FeatureHeader {
        coordinates: Some(json!({"lng": 200, "lat": 47})),
        ..Default::default()
    });
    assert_eq!(feature.coordinates, Coordinates::Point([9.0, 47.0]));
    assert_eq!(feature.custom_name, None);
}

#[test]
fn test_absorb() {
    let mut existing = point_feature();
    existing.set_id("zh--0");
    existing.custom_name = Some("Custom".to_string());
    existing.popup_content = Some("Popup".to_string());
    let uploaded = Feature::from_geojson(
        &json!({"geometry": {"type": "Point", "coordinates": [1, 2]}, "properties": {"pop": 2}}),
        None,
    )
    .unwrap();
    existing.absorb(&uploaded);
    assert_eq!(existing.id(), Some("zh--0"));
    assert_eq!(existing.coordinates, Coordinates::Point([1.0, 2.0]));
    assert_eq!(existing.properties["pop"], PropertyValue::Int(2));
    assert_eq!(existing.properties.len(), 4);
    assert_eq!(existing.custom_name, Some("Custom".to_string()));

    let mut fresh = uploaded.clone();
    fresh.copy_authored_from(&existing);
    assert_eq!(fresh.popup_content, Some("Popup".to_string()));
}

#[test]
fn test_header() {
    let header: FeatureHeader = serde_yaml::from_str(
        r#"
id: zh--0
custom_name: ''
hide: 'true'
popup_content: Hello
coordinates:
  lng: 8.5
  lat: 47
properties:
  pop: 10
  empty: ~
"#,
    )
    .unwrap();
    assert_eq!(header.id, Some("zh--0".to_string()));
    assert_eq!(header.custom_name, None);
    assert_eq!(header.hide, Some(true));
    assert_eq!(
        header.properties.as_ref().map(|p| p.len()),
        Some(1)
    );

    let mut feature = point_feature();
    feature.set_id("zh--0");
    let out = feature.as_header(Some("NAME"));
    assert_eq!(out.name, Some("Zurich".to_string()));
    assert_eq!(out.coordinates, Some(json!({"lng": 8.5, "lat": 47.25})));
    assert_eq!(
        feature.as_geojson(),
        json!({
            "type": "Feature",
            "id": "zh--0",
            "geometry": {"type": "Point", "coordinates": [8.5, 47.25]},
            "properties": {"NAME": "Zurich", "pop": 415367, "area": 87.88, "capital": false}
        })
    );
}
