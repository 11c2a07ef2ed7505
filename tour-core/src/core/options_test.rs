//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::{parse_config, ApplicationCfg, Config};
use crate::core::feature::{Feature, Properties};
use crate::core::geom::{Coordinates, FeatureType};
use crate::core::options::*;
use indexmap::IndexMap;

#[test]
fn test_builtin_icon() {
    let defaults = MarkerDefaults::default();
    let (icon, alt) = merge_icon_options(
        &defaults,
        &IconOptions::default(),
        None,
        &IconOptions::default(),
    );
    assert_eq!(
        icon.icon_url,
        "user/plugins/leaflet-tour/images/marker-icon.png"
    );
    assert_eq!(icon.icon_size, [25, 41]);
    assert_eq!(icon.icon_anchor, Some([12, 41]));
    assert_eq!(icon.tooltip_anchor, [16, -28]);
    assert_eq!(icon.class_name, "leaflet-marker");
    assert_eq!(
        icon.shadow_url.as_ref().map(|s| s.as_str()),
        Some("user/plugins/leaflet-tour/images/marker-shadow.png")
    );
    assert_eq!(icon.shadow_size, Some([41, 41]));
    assert_eq!(icon.shadow_anchor, None);
    assert!(icon.icon_retina_url.is_some());
    assert_eq!(alt, None);
    assert_eq!(
        serde_json::to_value(&icon).unwrap()["iconUrl"],
        json!("user/plugins/leaflet-tour/images/marker-icon.png")
    );
}

#[test]
fn test_custom_icon() {
    let defaults = MarkerDefaults::default();
    let dataset = IconOptions {
        file: Some("x.png".to_string()),
        anchor_x: Some(3),
        ..Default::default()
    };
    let (icon, alt) =
        merge_icon_options(&defaults, &dataset, Some("Dataset icon"), &IconOptions::default());
    assert_eq!(icon.icon_url, "user/data/leaflet-tour/images/markers/x.png");
    assert_eq!(icon.icon_size, [14, 14]);
    assert_eq!(icon.tooltip_anchor, [7, 0]);
    // only one anchor coordinate
    assert_eq!(icon.icon_anchor, None);
    assert_eq!(icon.icon_retina_url, None);
    assert_eq!(icon.shadow_url, None);
    assert_eq!(icon.shadow_size, None);
    assert_eq!(alt, Some("Dataset icon".to_string()));

    let json = serde_json::to_value(&icon).unwrap();
    assert!(json.get("iconAnchor").is_none());
    assert!(json.get("shadowUrl").is_none());

    let dataset = IconOptions {
        anchor_y: Some(0),
        shadow: Some("s.png".to_string()),
        shadow_anchor_x: Some(1),
        shadow_anchor_y: Some(2),
        width: Some(20),
        class: Some("big".to_string()),
        ..dataset
    };
    let (icon, _) = merge_icon_options(&defaults, &dataset, None, &IconOptions::default());
    assert_eq!(icon.icon_anchor, Some([3, 0]));
    assert_eq!(
        icon.shadow_url,
        Some("user/data/leaflet-tour/images/markerShadows/s.png".to_string())
    );
    // shadow size falls back to the icon size
    assert_eq!(icon.shadow_size, Some([20, 14]));
    assert_eq!(icon.shadow_anchor, Some([1, 2]));
    assert_eq!(icon.class_name, "leaflet-marker big");
}

#[test]
fn test_tour_icon_override() {
    let defaults = MarkerDefaults::default();
    let dataset = IconOptions {
        file: Some("x.png".to_string()),
        width: Some(30),
        height: Some(30),
        ..Default::default()
    };
    let tour = IconOptions {
        height: Some(40),
        ..Default::default()
    };
    let (icon, alt) = merge_icon_options(&defaults, &dataset, Some("alt"), &tour);
    assert_eq!(icon.icon_size, [30, 40]);
    assert_eq!(alt, Some("alt".to_string()));

    // own tour file drops the dataset alt text
    let tour = IconOptions {
        file: Some("y.png".to_string()),
        ..Default::default()
    };
    let (icon, alt) = merge_icon_options(&defaults, &dataset, Some("alt"), &tour);
    assert_eq!(icon.icon_url, "user/data/leaflet-tour/images/markers/y.png");
    assert_eq!(icon.icon_size, [30, 30]);
    assert_eq!(alt, None);

    let tour = IconOptions {
        use_defaults: true,
        icon_alt: Some("tour alt".to_string()),
        ..Default::default()
    };
    let (icon, alt) = merge_icon_options(&defaults, &dataset, Some("alt"), &tour);
    assert_eq!(icon.icon_url, "user/plugins/leaflet-tour/images/marker-icon.png");
    assert_eq!(icon.icon_size, [25, 41]);
    assert_eq!(alt, Some("tour alt".to_string()));
}

#[test]
fn test_marker_config() {
    let config: ApplicationCfg = parse_config(
        r#"
[store]
pages = "p"
data = "d"

[markers]
image_route = "images/"
icon_size = [20, 30]
custom_icon_size = [10, 10]
"#
        .to_string(),
        "",
    )
    .unwrap();
    let defaults = MarkerDefaults::from_config(&config).unwrap();
    assert_eq!(defaults.image_route, "images/");
    assert_eq!(defaults.builtin.icon_size, [20, 30]);
    assert_eq!(defaults.builtin.icon_anchor, Some([12, 41]));
    assert_eq!(defaults.custom.icon_size, [10, 10]);

    let config: ApplicationCfg = parse_config(
        "[store]\npages = \"p\"\ndata = \"d\"\n[markers]\nimage_route = \"images\"\n".to_string(),
        "",
    )
    .unwrap();
    assert!(MarkerDefaults::from_config(&config).is_err());
    assert!(MarkerDefaults::gen_config().contains("#[markers]"));
}

#[test]
fn test_path_options() {
    let dataset = PathOptions::default_path();
    let active = PathOptions::default_active();
    let tour = PathOptions {
        color: Some("#ff0000".to_string()),
        fill: Some(false),
        ..Default::default()
    };
    let (path, path_active) = merge_path_options(
        FeatureType::Polygon,
        &dataset,
        &active,
        &tour,
        &PathOptions::default(),
    );
    assert_eq!(path.color, Some("#ff0000".to_string()));
    assert_eq!(path.fill, Some(false));
    assert_eq!(path.weight, Some(3.0));
    assert_eq!(path_active.weight, Some(5.0));
    assert_eq!(path_active.color, None);

    let (line, line_active) = merge_path_options(
        FeatureType::MultiLineString,
        &dataset,
        &active,
        &tour,
        &PathOptions::default(),
    );
    assert_eq!(line.fill, None);
    assert_eq!(line.fill_opacity, None);
    assert_eq!(line_active.fill_opacity, None);
    assert_eq!(
        serde_json::to_value(&line).unwrap(),
        json!({"stroke": true, "weight": 3.0, "color": "#ff0000", "opacity": 1.0})
    );

    let header: PathOptions =
        serde_yaml::from_str("weight: '0'\nfillColor: ''\nfill_opacity: 0.5\nstroke: false").unwrap();
    assert_eq!(header.weight, Some(0.0));
    assert_eq!(header.fill_color, None);
    assert_eq!(header.fill_opacity, Some(0.5));
    assert_eq!(header.stroke, Some(false));
}

fn legend(text: Option<&str>, alt: Option<&str>) -> LegendText {
    LegendText {
        text: text.map(|s| s.to_string()),
        alt: alt.map(|s| s.to_string()),
    }
}

#[test]
fn test_legend() {
    let (icon, _) = merge_icon_options(
        &MarkerDefaults::default(),
        &IconOptions::default(),
        None,
        &IconOptions::default(),
    );
    let style = || LegendStyle::Icon {
        icon: &icon,
        alt: Some("marker"),
    };
    assert_eq!(
        merge_legend("points", FeatureType::Point, &legend(None, None), &legend(Some(""), None), style(), 3),
        None
    );
    assert_eq!(
        merge_legend("points", FeatureType::Point, &legend(Some("Points"), None), &legend(None, None), style(), 0),
        None
    );
    let entry = merge_legend(
        "points",
        FeatureType::Point,
        &legend(Some("Points"), Some("Point alt")),
        &legend(None, None),
        style(),
        2,
    )
    .unwrap();
    assert_eq!(entry.legend_text, "Points");
    assert_eq!(entry.legend_alt_text, "Point alt");
    assert_eq!(entry.icon_width, Some(25));
    assert_eq!(entry.icon_alt_text, Some("marker".to_string()));

    let entry = merge_legend(
        "points",
        FeatureType::Point,
        &legend(Some("Points"), Some("Point alt")),
        &legend(Some("Tour points"), None),
        style(),
        2,
    )
    .unwrap();
    assert_eq!(entry.legend_text, "Tour points");
    assert_eq!(entry.legend_alt_text, "Tour points");

    let line = merge_legend(
        "rivers",
        FeatureType::LineString,
        &legend(Some("Rivers"), None),
        &legend(None, None),
        LegendStyle::Path(&PathOptions::default()),
        1,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&line).unwrap(),
        json!({
            "dataSource": "rivers",
            "legendText": "Rivers",
            "legendAltText": "Rivers",
            "featureType": "line",
            "color": "#3388ff"
        })
    );

    let path = PathOptions {
        stroke: Some(false),
        color: Some("#00ff00".to_string()),
        ..Default::default()
    };
    let polygon = merge_legend(
        "lakes",
        FeatureType::MultiPolygon,
        &legend(Some("Lakes"), None),
        &legend(None, None),
        LegendStyle::Path(&path),
        1,
    )
    .unwrap();
    assert_eq!(polygon.feature_type, Some("polygon".to_string()));
    assert_eq!(polygon.color, None);
    assert_eq!(polygon.weight, None);
    assert_eq!(polygon.fill_color, Some("#00ff00".to_string()));
    assert_eq!(polygon.fill_opacity, Some(0.2));
}

#[test]
fn test_popups() {
    let remove = PopupOverride {
        remove_popup: true,
        popup_content: None,
    };
    let replace = PopupOverride {
        remove_popup: true,
        popup_content: Some("Tour text".to_string()),
    };
    assert_eq!(resolve_popup(Some("Authored"), None), Some("Authored".to_string()));
    assert_eq!(resolve_popup(Some("Authored"), Some(&remove)), None);
    assert_eq!(
        resolve_popup(Some("Authored"), Some(&replace)),
        Some("Tour text".to_string())
    );
    assert_eq!(
        resolve_popup(Some("Authored"), Some(&PopupOverride::default())),
        Some("Authored".to_string())
    );
    assert_eq!(resolve_popup(Some(""), None), None);
}

#[test]
fn test_merge_features() {
    let features: Vec<Feature> = (0..3)
        .map(|i| {
            let mut f = Feature::new(Coordinates::Point([i as f64, 0.0]), Properties::new());
            f.set_id(&format!("ds--{}", i));
            f.popup_content = Some(format!("Popup {}", i));
            f
        })
        .collect();
    let mut overrides = IndexMap::new();
    overrides.insert(
        "ds--1".to_string(),
        PopupOverride {
            remove_popup: true,
            popup_content: None,
        },
    );

    let merged = merge_features(false, &overrides, &features);
    assert_eq!(merged.visible.len(), 1);
    assert_eq!(merged.visible[0].feature.id(), Some("ds--1"));
    assert_eq!(merged.visible[0].popup_content, None);
    assert_eq!(
        merged.hidden.iter().map(|f| f.id().unwrap()).collect::<Vec<_>>(),
        vec!["ds--0", "ds--2"]
    );

    let merged = merge_features(true, &overrides, &features);
    assert_eq!(merged.visible.len(), 3);
    assert!(merged.hidden.is_empty());
    assert_eq!(merged.visible[2].popup_content, Some("Popup 2".to_string()));
}
