//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::{ApplicationCfg, Config, MarkerCfg};
use crate::core::feature::Feature;
use crate::core::geom::FeatureType;
use crate::core::header;
use indexmap::IndexMap;

pub const DEFAULT_PATH_COLOR: &'static str = "#3388ff";
pub const DEFAULT_PATH_WEIGHT: f64 = 3.0;
pub const DEFAULT_PATH_OPACITY: f64 = 1.0;
pub const DEFAULT_FILL_OPACITY: f64 = 0.2;

/// Marker icon settings of a dataset or a tour override
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct IconOptions {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub anchor_x: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub anchor_y: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub tooltip_anchor_x: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub tooltip_anchor_y: Option<i64>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub shadow_width: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub shadow_height: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub shadow_anchor_x: Option<i64>,
    #[serde(deserialize_with = "header::opt_int", skip_serializing_if = "Option::is_none")]
    pub shadow_anchor_y: Option<i64>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub retina: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub icon_alt: Option<String>,
    /// Tour overrides only: ignore the dataset icon
    #[serde(deserialize_with = "header::flag", skip_serializing_if = "is_false")]
    pub use_defaults: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl IconOptions {
    /// Values of `self`, falling back to `lower` per key
    pub fn over(&self, lower: &IconOptions) -> IconOptions {
        IconOptions {
            file: self.file.clone().or_else(|| lower.file.clone()),
            width: self.width.or(lower.width),
            height: self.height.or(lower.height),
            anchor_x: self.anchor_x.or(lower.anchor_x),
            anchor_y: self.anchor_y.or(lower.anchor_y),
            tooltip_anchor_x: self.tooltip_anchor_x.or(lower.tooltip_anchor_x),
            tooltip_anchor_y: self.tooltip_anchor_y.or(lower.tooltip_anchor_y),
            shadow: self.shadow.clone().or_else(|| lower.shadow.clone()),
            shadow_width: self.shadow_width.or(lower.shadow_width),
            shadow_height: self.shadow_height.or(lower.shadow_height),
            shadow_anchor_x: self.shadow_anchor_x.or(lower.shadow_anchor_x),
            shadow_anchor_y: self.shadow_anchor_y.or(lower.shadow_anchor_y),
            class: self.class.clone().or_else(|| lower.class.clone()),
            retina: self.retina.clone().or_else(|| lower.retina.clone()),
            icon_alt: self.icon_alt.clone().or_else(|| lower.icon_alt.clone()),
            use_defaults: self.use_defaults,
        }
    }
}

/// System defaults for one kind of marker
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerProfile {
    pub icon_url: Option<String>,
    pub icon_retina_url: Option<String>,
    pub shadow_url: Option<String>,
    pub icon_size: [i64; 2],
    pub icon_anchor: Option<[i64; 2]>,
    pub tooltip_anchor: [i64; 2],
    pub shadow_size: Option<[i64; 2]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDefaults {
    /// Route prefix of uploaded marker and shadow images
    pub image_route: String,
    /// Leaflet's default marker
    pub builtin: MarkerProfile,
    /// Fallbacks for uploaded marker images
    pub custom: MarkerProfile,
}

const BUILTIN_IMAGES: &'static str = "user/plugins/leaflet-tour/images/";

impl Default for MarkerDefaults {
    fn default() -> Self {
        MarkerDefaults {
            image_route: "user/data/leaflet-tour/images/".to_string(),
            builtin: MarkerProfile {
                icon_url: Some(format!("{}marker-icon.png", BUILTIN_IMAGES)),
                icon_retina_url: Some(format!("{}marker-icon-2x.png", BUILTIN_IMAGES)),
                shadow_url: Some(format!("{}marker-shadow.png", BUILTIN_IMAGES)),
                icon_size: [25, 41],
                icon_anchor: Some([12, 41]),
                tooltip_anchor: [16, -28],
                shadow_size: Some([41, 41]),
            },
            custom: MarkerProfile {
                icon_url: None,
                icon_retina_url: None,
                shadow_url: None,
                icon_size: [14, 14],
                icon_anchor: None,
                tooltip_anchor: [7, 0],
                shadow_size: None,
            },
        }
    }
}

fn pair(p: [i32; 2]) -> [i64; 2] {
    [p[0] as i64, p[1] as i64]
}

impl<'a> Config<'a, ApplicationCfg> for MarkerDefaults {
    fn from_config(config: &ApplicationCfg) -> Result<Self, String> {
        let mut defaults = MarkerDefaults::default();
        let cfg = match &config.markers {
            Some(cfg) => cfg,
            None => return Ok(defaults),
        };
        let MarkerCfg {
            image_route,
            icon_url,
            icon_retina_url,
            shadow_url,
            icon_size,
            icon_anchor,
            tooltip_anchor,
            shadow_size,
            custom_icon_size,
            custom_tooltip_anchor,
        } = cfg.clone();
        if let Some(route) = image_route {
            if !route.ends_with('/') {
                return Err(format!(
                    "markers.image_route '{}' must end with '/'",
                    route
                ));
            }
            defaults.image_route = route;
        }
        let builtin = &mut defaults.builtin;
        builtin.icon_url = icon_url.or(builtin.icon_url.take());
        builtin.icon_retina_url = icon_retina_url.or(builtin.icon_retina_url.take());
        builtin.shadow_url = shadow_url.or(builtin.shadow_url.take());
        builtin.icon_size = icon_size.map(pair).unwrap_or(builtin.icon_size);
        builtin.icon_anchor = icon_anchor.map(pair).or(builtin.icon_anchor);
        builtin.tooltip_anchor = tooltip_anchor.map(pair).unwrap_or(builtin.tooltip_anchor);
        builtin.shadow_size = shadow_size.map(pair).or(builtin.shadow_size);
        let custom = &mut defaults.custom;
        custom.icon_size = custom_icon_size.map(pair).unwrap_or(custom.icon_size);
        custom.tooltip_anchor = custom_tooltip_anchor
            .map(pair)
            .unwrap_or(custom.tooltip_anchor);
        Ok(defaults)
    }
    fn gen_config() -> String {
        let toml = r#"
#[markers]
# Route prefix of uploaded marker images (markers/ and markerShadows/ below it)
#image_route = "user/data/leaflet-tour/images/"
# Default Leaflet marker
#icon_url = "user/plugins/leaflet-tour/images/marker-icon.png"
#icon_retina_url = "user/plugins/leaflet-tour/images/marker-icon-2x.png"
#shadow_url = "user/plugins/leaflet-tour/images/marker-shadow.png"
#icon_size = [25, 41]
#icon_anchor = [12, 41]
#tooltip_anchor = [16, -28]
#shadow_size = [41, 41]
# Uploaded marker images without explicit size
#custom_icon_size = [14, 14]
#custom_tooltip_anchor = [7, 0]
"#;
        toml.to_string()
    }
}

/// Leaflet icon options
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIcon {
    pub icon_url: String,
    pub icon_size: [i64; 2],
    pub class_name: String,
    pub tooltip_anchor: [i64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_anchor: Option<[i64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_retina_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_size: Option<[i64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_anchor: Option<[i64; 2]>,
}

/// Resolve marker icon options and icon alt text.
///
/// With `use_defaults` on the tour override the dataset icon is ignored. Otherwise each key is
/// taken from the tour override, then the dataset icon, then the system defaults. The dataset alt
/// text applies only when the tour does not set its own icon file.
pub fn merge_icon_options(
    defaults: &MarkerDefaults,
    dataset_icon: &IconOptions,
    dataset_alt: Option<&str>,
    tour_icon: &IconOptions,
) -> (ResolvedIcon, Option<String>) {
    let options = if tour_icon.use_defaults {
        tour_icon.clone()
    } else {
        let mut base = dataset_icon.clone();
        if tour_icon.file.is_none() {
            base.icon_alt = dataset_alt.map(|s| s.to_string()).or(base.icon_alt);
        }
        tour_icon.over(&base)
    };
    let custom_file = options.file.is_some();
    let profile = if custom_file {
        &defaults.custom
    } else {
        &defaults.builtin
    };
    let marker_url = |file: &str| format!("{}markers/{}", defaults.image_route, file);

    let icon_size = [
        options.width.unwrap_or(profile.icon_size[0]),
        options.height.unwrap_or(profile.icon_size[1]),
    ];
    let icon_anchor = match (options.anchor_x, options.anchor_y) {
        (Some(x), Some(y)) => Some([x, y]),
        (x, y) if !custom_file => profile
            .icon_anchor
            .map(|anchor| [x.unwrap_or(anchor[0]), y.unwrap_or(anchor[1])]),
        _ => None,
    };
    let mut icon = ResolvedIcon {
        icon_url: match &options.file {
            Some(file) => marker_url(file),
            None => profile.icon_url.clone().unwrap_or_default(),
        },
        icon_size,
        class_name: match &options.class {
            Some(class) => format!("leaflet-marker {}", class),
            None => "leaflet-marker".to_string(),
        },
        tooltip_anchor: [
            options.tooltip_anchor_x.unwrap_or(profile.tooltip_anchor[0]),
            options.tooltip_anchor_y.unwrap_or(profile.tooltip_anchor[1]),
        ],
        icon_anchor,
        icon_retina_url: match &options.retina {
            Some(retina) => Some(marker_url(retina)),
            None => profile.icon_retina_url.clone(),
        },
        shadow_url: None,
        shadow_size: None,
        shadow_anchor: None,
    };
    if options.shadow.is_some() || !custom_file {
        icon.shadow_url = match &options.shadow {
            Some(shadow) => Some(format!("{}markerShadows/{}", defaults.image_route, shadow)),
            None => profile.shadow_url.clone(),
        };
        let fallback = profile.shadow_size.unwrap_or(icon_size);
        icon.shadow_size = Some([
            options.shadow_width.unwrap_or(fallback[0]),
            options.shadow_height.unwrap_or(fallback[1]),
        ]);
        if let (Some(x), Some(y)) = (options.shadow_anchor_x, options.shadow_anchor_y) {
            icon.shadow_anchor = Some([x, y]);
        }
    }
    (icon, options.icon_alt)
}

/// Leaflet path options. Header keys are camelCase like the rendered options.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PathOptions {
    #[serde(deserialize_with = "header::opt_bool", skip_serializing_if = "Option::is_none")]
    pub stroke: Option<bool>,
    #[serde(deserialize_with = "header::opt_float", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(deserialize_with = "header::opt_float", skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(deserialize_with = "header::opt_bool", skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(
        alias = "fill_color",
        deserialize_with = "header::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_color: Option<String>,
    #[serde(
        alias = "fill_opacity",
        deserialize_with = "header::opt_float",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_opacity: Option<f64>,
}

impl PathOptions {
    /// Default stroke and fill for new datasets
    pub fn default_path() -> PathOptions {
        PathOptions {
            stroke: Some(true),
            weight: Some(DEFAULT_PATH_WEIGHT),
            color: Some(DEFAULT_PATH_COLOR.to_string()),
            opacity: Some(DEFAULT_PATH_OPACITY),
            fill: Some(true),
            fill_color: None,
            fill_opacity: Some(DEFAULT_FILL_OPACITY),
        }
    }
    /// Default highlight for new datasets
    pub fn default_active() -> PathOptions {
        PathOptions {
            weight: Some(5.0),
            fill_opacity: Some(0.4),
            ..Default::default()
        }
    }
    pub fn is_empty(&self) -> bool {
        *self == PathOptions::default()
    }
    pub fn over(&self, lower: &PathOptions) -> PathOptions {
        PathOptions {
            stroke: self.stroke.or(lower.stroke),
            weight: self.weight.or(lower.weight),
            color: self.color.clone().or_else(|| lower.color.clone()),
            opacity: self.opacity.or(lower.opacity),
            fill: self.fill.or(lower.fill),
            fill_color: self.fill_color.clone().or_else(|| lower.fill_color.clone()),
            fill_opacity: self.fill_opacity.or(lower.fill_opacity),
        }
    }
    /// Lines have no fill keys
    pub fn for_feature_type(mut self, feature_type: FeatureType) -> PathOptions {
        if feature_type.is_line() {
            self.fill = None;
            self.fill_color = None;
            self.fill_opacity = None;
        }
        self
    }
}

/// Resolve path and active path options. Keys absent at both levels stay absent.
pub fn merge_path_options(
    feature_type: FeatureType,
    dataset_path: &PathOptions,
    dataset_active: &PathOptions,
    tour_path: &PathOptions,
    tour_active: &PathOptions,
) -> (PathOptions, PathOptions) {
    (
        tour_path.over(dataset_path).for_feature_type(feature_type),
        tour_active.over(dataset_active).for_feature_type(feature_type),
    )
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegendText {
    pub text: Option<String>,
    pub alt: Option<String>,
}

/// Resolved styling used to draw a legend symbol
pub enum LegendStyle<'a> {
    Icon {
        icon: &'a ResolvedIcon,
        alt: Option<&'a str>,
    },
    Path(&'a PathOptions),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub data_source: String,
    pub legend_text: String,
    pub legend_alt_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_ref().map(|s| s.as_str()).filter(|s| !s.is_empty())
}

/// Legend entry of a dataset in a tour, if it has legend text and at least one included feature
pub fn merge_legend(
    data_source: &str,
    feature_type: FeatureType,
    dataset_legend: &LegendText,
    tour_legend: &LegendText,
    style: LegendStyle,
    feature_count: usize,
) -> Option<LegendEntry> {
    let legend_text = non_empty(&tour_legend.text).or(non_empty(&dataset_legend.text))?;
    if feature_count == 0 {
        return None;
    }
    let alt = non_empty(&tour_legend.alt)
        .or(non_empty(&tour_legend.text))
        .or(non_empty(&dataset_legend.alt))
        .unwrap_or(legend_text);
    let mut entry = LegendEntry {
        data_source: data_source.to_string(),
        legend_text: legend_text.to_string(),
        legend_alt_text: alt.to_string(),
        icon_file: None,
        icon_width: None,
        icon_height: None,
        icon_alt_text: None,
        feature_type: None,
        color: None,
        weight: None,
        opacity: None,
        fill_color: None,
        fill_opacity: None,
    };
    match style {
        LegendStyle::Icon { icon, alt } => {
            entry.icon_file = Some(icon.icon_url.clone());
            entry.icon_width = Some(icon.icon_size[0]);
            entry.icon_height = Some(icon.icon_size[1]);
            entry.icon_alt_text = alt.filter(|a| !a.is_empty()).map(|a| a.to_string());
        }
        LegendStyle::Path(path) if feature_type.is_line() => {
            entry.feature_type = Some("line".to_string());
            entry.color = Some(non_empty(&path.color).unwrap_or(DEFAULT_PATH_COLOR).to_string());
        }
        LegendStyle::Path(path) => {
            entry.feature_type = Some("polygon".to_string());
            let color = non_empty(&path.color).unwrap_or(DEFAULT_PATH_COLOR);
            if path.stroke.unwrap_or(true) {
                entry.color = Some(color.to_string());
                entry.weight = Some(path.weight.unwrap_or(DEFAULT_PATH_WEIGHT));
                entry.opacity = Some(path.opacity.unwrap_or(DEFAULT_PATH_OPACITY));
            }
            if path.fill.unwrap_or(true) {
                entry.fill_color = Some(non_empty(&path.fill_color).unwrap_or(color).to_string());
                entry.fill_opacity = Some(path.fill_opacity.unwrap_or(DEFAULT_FILL_OPACITY));
            }
        }
    }
    Some(entry)
}

/// Popup settings of a feature listed in a tour
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopupOverride {
    pub remove_popup: bool,
    pub popup_content: Option<String>,
}

/// Override text beats the remove flag, the remove flag beats authored content
pub fn resolve_popup(authored: Option<&str>, popup_override: Option<&PopupOverride>) -> Option<String> {
    match popup_override {
        Some(o) if non_empty(&o.popup_content).is_some() => o.popup_content.clone(),
        Some(o) if o.remove_popup => None,
        _ => authored.filter(|a| !a.is_empty()).map(|a| a.to_string()),
    }
}

#[derive(Debug)]
pub struct VisibleFeature<'a> {
    pub feature: &'a Feature,
    pub popup_content: Option<String>,
}

#[derive(Debug)]
pub struct FeatureMerge<'a> {
    pub visible: Vec<VisibleFeature<'a>>,
    /// Rendered as geometry only
    pub hidden: Vec<&'a Feature>,
}

/// Split dataset features into visible features with resolved popups and hidden ones
pub fn merge_features<'a, I>(
    show_all: bool,
    overrides: &IndexMap<String, PopupOverride>,
    features: I,
) -> FeatureMerge<'a>
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut merge = FeatureMerge {
        visible: Vec::new(),
        hidden: Vec::new(),
    };
    for feature in features {
        let popup_override = feature.id().and_then(|id| overrides.get(id));
        if show_all || popup_override.is_some() {
            merge.visible.push(VisibleFeature {
                feature,
                popup_content: resolve_popup(feature.popup_content.as_deref(), popup_override),
            });
        } else {
            merge.hidden.push(feature);
        }
    }
    merge
}
