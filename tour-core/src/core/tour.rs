//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::dataset::Dataset;
use crate::core::geom::FeatureType;
use crate::core::header;
use crate::core::tiles::TileServers;
use crate::core::options::{
    merge_features, merge_icon_options, merge_legend, merge_path_options, IconOptions,
    LegendEntry, LegendStyle, LegendText, MarkerDefaults, PathOptions, PopupOverride,
    ResolvedIcon,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Access to loaded datasets by id
pub trait DatasetLookup {
    fn dataset(&self, id: &str) -> Option<&Dataset>;
}

impl DatasetLookup for IndexMap<String, Dataset> {
    fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.get(id)
    }
}

/// Dataset entry of a tour page
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct TourDatasetEntry {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "header::flag")]
    pub include_all: bool,
    #[serde(deserialize_with = "header::flag")]
    pub add_all: bool,
}

/// Feature entry of a tour page
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct TourFeatureEntry {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "header::flag")]
    pub remove_popup: bool,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub popup_content: Option<String>,
}

/// Tour settings replacing dataset settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DatasetOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconOptions>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub icon_alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<PathOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_active: Option<PathOptions>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub legend_text: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub legend_alt: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(deserialize_with = "header::string_list", skip_serializing_if = "Option::is_none")]
    pub auto_popup_properties: Option<Vec<String>>,
}

/// Tour page header
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct TourHeader {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Key of the basemap tile server
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub tile_server: Option<String>,
    pub datasets: Vec<TourDatasetEntry>,
    pub dataset_overrides: IndexMap<String, DatasetOverride>,
    pub features: Vec<TourFeatureEntry>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TourDataset {
    pub include_all: bool,
    pub add_all: bool,
}

/// Dataset with styling resolved for a tour
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergedDataset {
    pub id: String,
    pub name: String,
    pub feature_type: FeatureType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_options: Option<ResolvedIcon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_options: Option<PathOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_active_options: Option<PathOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<LegendEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub auto_popup_properties: Vec<String>,
    /// Ids of visible features
    pub features: Vec<String>,
    /// GeoJSON of features shown as geometry only
    pub hidden_features: Vec<Value>,
}

/// Visible feature with popup resolved for a tour
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergedFeature {
    pub id: String,
    pub dataset: String,
    pub name: String,
    pub geojson: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_content: Option<String>,
    /// Values of the auto popup properties
    pub popup_properties: IndexMap<String, String>,
}

impl MergedFeature {
    pub fn has_popup(&self) -> bool {
        self.popup_content.is_some() || !self.popup_properties.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Included {
    feature_ids: Vec<String>,
    dataset_ids: Vec<String>,
}

/// Derived views, dropped together on every change
#[derive(Clone, Debug, Default, PartialEq)]
struct TourCache {
    all_features: Option<IndexMap<String, String>>,
    included: Option<Included>,
    merged_datasets: Option<Vec<MergedDataset>>,
    merged_features: Option<Vec<MergedFeature>>,
    /// Marker defaults the merged views were built with
    merged_with: Option<MarkerDefaults>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tour {
    id: Option<String>,
    pub title: Option<String>,
    pub tile_server: Option<String>,
    datasets: IndexMap<String, TourDataset>,
    overrides: IndexMap<String, DatasetOverride>,
    features: IndexMap<String, PopupOverride>,
    cache: TourCache,
}

impl Tour {
    pub fn new(id: Option<&str>, title: Option<&str>) -> Tour {
        Tour {
            id: id.map(|s| s.to_string()),
            title: title.map(|s| s.to_string()),
            tile_server: None,
            datasets: IndexMap::new(),
            overrides: IndexMap::new(),
            features: IndexMap::new(),
            cache: TourCache::default(),
        }
    }

    /// Entries without id are skipped, the first entry of an id wins
    pub fn from_header(header: &TourHeader) -> Tour {
        let mut tour = Tour::new(header.id.as_deref(), header.title.as_deref());
        tour.tile_server = header.tile_server.clone();
        for entry in &header.datasets {
            if let Some(id) = &entry.id {
                tour.datasets.entry(id.clone()).or_insert(TourDataset {
                    include_all: entry.include_all,
                    add_all: entry.add_all,
                });
            }
        }
        tour.overrides = header.dataset_overrides.clone();
        for entry in &header.features {
            if let Some(id) = &entry.id {
                tour.features.entry(id.clone()).or_insert(PopupOverride {
                    remove_popup: entry.remove_popup,
                    popup_content: entry.popup_content.clone(),
                });
            }
        }
        tour
    }

    pub fn as_header(&self) -> TourHeader {
        TourHeader {
            id: self.id.clone(),
            title: self.title.clone(),
            tile_server: self.tile_server.clone(),
            datasets: self
                .datasets
                .iter()
                .map(|(id, d)| TourDatasetEntry {
                    id: Some(id.clone()),
                    include_all: d.include_all,
                    add_all: d.add_all,
                })
                .collect(),
            dataset_overrides: self.overrides.clone(),
            features: self
                .features
                .iter()
                .map(|(id, f)| TourFeatureEntry {
                    id: Some(id.clone()),
                    remove_popup: f.remove_popup,
                    popup_content: f.popup_content.clone(),
                })
                .collect(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    /// Set the id once. Later calls are ignored.
    pub fn set_id(&mut self, id: &str) {
        if self.id.is_none() {
            self.id = Some(id.to_string());
        }
    }

    pub fn datasets(&self) -> &IndexMap<String, TourDataset> {
        &self.datasets
    }
    pub fn dataset_overrides(&self) -> &IndexMap<String, DatasetOverride> {
        &self.overrides
    }
    pub fn features(&self) -> &IndexMap<String, PopupOverride> {
        &self.features
    }
    pub fn references_dataset(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    pub fn clear_cache(&mut self) {
        self.cache = TourCache::default();
    }

    pub fn add_dataset(&mut self, id: &str, include_all: bool, add_all: bool) {
        self.datasets.insert(
            id.to_string(),
            TourDataset {
                include_all,
                add_all,
            },
        );
        self.clear_cache();
    }

    /// Remove a dataset with its override. Returns false if the tour did not reference it.
    pub fn remove_dataset(&mut self, id: &str) -> bool {
        let removed = self.datasets.shift_remove(id).is_some();
        self.overrides.shift_remove(id);
        self.clear_cache();
        removed
    }

    pub fn set_override(&mut self, id: &str, dataset_override: DatasetOverride) {
        self.overrides.insert(id.to_string(), dataset_override);
        self.clear_cache();
    }

    pub fn set_feature(&mut self, id: &str, popup: PopupOverride) {
        self.features.insert(id.to_string(), popup);
        self.clear_cache();
    }

    pub fn remove_feature(&mut self, id: &str) -> bool {
        let removed = self.features.shift_remove(id).is_some();
        self.clear_cache();
        removed
    }

    /// Drop references to missing datasets and features, then expand add-all datasets.
    /// Returns true if anything changed.
    pub fn revalidate<L: DatasetLookup>(&mut self, lookup: &L) -> bool {
        self.clear_cache();
        let before = (
            self.datasets.len(),
            self.overrides.len(),
            self.features.len(),
        );
        self.datasets.retain(|id, _| lookup.dataset(id).is_some());
        let datasets = &self.datasets;
        self.overrides.retain(|id, _| datasets.contains_key(id));
        let all = collect_all_features(&self.datasets, lookup);
        self.features.retain(|id, _| all.contains_key(id));
        let after = (
            self.datasets.len(),
            self.overrides.len(),
            self.features.len(),
        );
        if before != after {
            debug!(
                "Tour {}: dropped missing datasets or features",
                self.id().unwrap_or("?")
            );
        }
        let expanded = self.expand_add_all(lookup);
        before != after || expanded
    }

    /// Add the non-hidden features of every add-all dataset to the feature list and clear the
    /// flag. Returns true if a flag was cleared.
    pub fn expand_add_all<L: DatasetLookup>(&mut self, lookup: &L) -> bool {
        let mut expanded = false;
        for (id, entry) in self.datasets.iter_mut() {
            if !entry.add_all {
                continue;
            }
            entry.add_all = false;
            expanded = true;
            if let Some(dataset) = lookup.dataset(id) {
                for (fid, feature) in dataset.features() {
                    if !feature.is_hidden() && !self.features.contains_key(fid) {
                        self.features.insert(fid.clone(), PopupOverride::default());
                    }
                }
            }
        }
        if expanded {
            self.clear_cache();
        }
        expanded
    }

    /// Feature id -> dataset id for all features of the referenced datasets
    pub fn all_features<L: DatasetLookup>(&mut self, lookup: &L) -> &IndexMap<String, String> {
        let datasets = &self.datasets;
        self.cache
            .all_features
            .get_or_insert_with(|| collect_all_features(datasets, lookup))
    }

    fn included<L: DatasetLookup>(&mut self, lookup: &L) -> &Included {
        let datasets = &self.datasets;
        let features = &self.features;
        self.cache
            .included
            .get_or_insert_with(|| collect_included(datasets, features, lookup))
    }

    /// Non-hidden features of include-all datasets and all listed features
    pub fn included_feature_ids<L: DatasetLookup>(&mut self, lookup: &L) -> &[String] {
        &self.included(lookup).feature_ids
    }

    /// Datasets with at least one included feature
    pub fn included_dataset_ids<L: DatasetLookup>(&mut self, lookup: &L) -> &[String] {
        &self.included(lookup).dataset_ids
    }

    /// Build merged datasets and merged features together
    fn ensure_merged<L: DatasetLookup>(&mut self, defaults: &MarkerDefaults, lookup: &L) {
        if self.cache.merged_with.as_ref() == Some(defaults)
            && self.cache.merged_datasets.is_some()
            && self.cache.merged_features.is_some()
        {
            return;
        }
        let included = self.included(lookup).clone();
        let mut datasets = Vec::new();
        let mut features = Vec::new();
        for dataset in included.dataset_ids.iter().filter_map(|id| lookup.dataset(id)) {
            let (merged, merged_features) = self.merge_dataset(dataset, defaults);
            datasets.push(merged);
            features.extend(merged_features);
        }
        debug!(
            "Tour {}: merged {} datasets with {} visible features",
            self.id().unwrap_or("?"),
            datasets.len(),
            features.len()
        );
        self.cache.merged_datasets = Some(datasets);
        self.cache.merged_features = Some(features);
        self.cache.merged_with = Some(defaults.clone());
    }

    pub fn merged_datasets<L: DatasetLookup>(
        &mut self,
        defaults: &MarkerDefaults,
        lookup: &L,
    ) -> &[MergedDataset] {
        self.ensure_merged(defaults, lookup);
        self.cache.merged_datasets.as_deref().unwrap_or(&[])
    }

    pub fn merged_features<L: DatasetLookup>(
        &mut self,
        defaults: &MarkerDefaults,
        lookup: &L,
    ) -> &[MergedFeature] {
        self.ensure_merged(defaults, lookup);
        self.cache.merged_features.as_deref().unwrap_or(&[])
    }

    pub fn legend_entries<L: DatasetLookup>(
        &mut self,
        defaults: &MarkerDefaults,
        lookup: &L,
    ) -> Vec<LegendEntry> {
        self.merged_datasets(defaults, lookup)
            .iter()
            .filter_map(|m| m.legend.clone())
            .collect()
    }

    /// Visible features with popup content or popup properties
    pub fn popup_entries<L: DatasetLookup>(
        &mut self,
        defaults: &MarkerDefaults,
        lookup: &L,
    ) -> Vec<MergedFeature> {
        self.merged_features(defaults, lookup)
            .iter()
            .filter(|f| f.has_popup())
            .cloned()
            .collect()
    }

    /// JSON document with everything needed to render the tour
    pub fn render_data<L: DatasetLookup>(
        &mut self,
        defaults: &MarkerDefaults,
        tiles: &TileServers,
        lookup: &L,
    ) -> Value {
        let datasets = self.merged_datasets(defaults, lookup).to_vec();
        let features = self.merged_features(defaults, lookup).to_vec();
        let legend = self.legend_entries(defaults, lookup);
        let popups: Vec<&str> = features
            .iter()
            .filter(|f| f.has_popup())
            .map(|f| f.id.as_str())
            .collect();
        json!({
            "tour": {"id": self.id, "title": self.title},
            "tile_server": tiles.select(self.tile_server.as_deref()),
            "datasets": datasets,
            "features": features,
            "legend": legend,
            "popups": popups,
        })
    }

    fn merge_dataset(
        &self,
        dataset: &Dataset,
        defaults: &MarkerDefaults,
    ) -> (MergedDataset, Vec<MergedFeature>) {
        let empty = DatasetOverride::default();
        let tour = self.overrides.get(dataset.id()).unwrap_or(&empty);
        let include_all = self
            .datasets
            .get(dataset.id())
            .map(|d| d.include_all)
            .unwrap_or(false);
        let feature_type = dataset.feature_type();

        let mut icon_options = None;
        let mut icon_alt = None;
        let mut path_options = None;
        let mut path_active_options = None;
        if feature_type == FeatureType::Point {
            let mut tour_icon = tour.icon.clone().unwrap_or_default();
            tour_icon.icon_alt = tour.icon_alt.clone().or(tour_icon.icon_alt);
            let (icon, alt) =
                merge_icon_options(defaults, &dataset.icon, dataset.icon_alt.as_deref(), &tour_icon);
            icon_options = Some(icon);
            icon_alt = alt;
        } else {
            let no_path = PathOptions::default();
            let (path, active) = merge_path_options(
                feature_type,
                &dataset.path,
                &dataset.path_active,
                tour.svg.as_ref().unwrap_or(&no_path),
                tour.svg_active.as_ref().unwrap_or(&no_path),
            );
            path_options = Some(path);
            path_active_options = Some(active);
        }

        // authored hidden features stay hidden unless listed in the tour
        let (candidates, hidden_by_author): (Vec<_>, Vec<_>) = dataset
            .features()
            .values()
            .partition(|f| !f.is_hidden() || f.id().map(|id| self.features.contains_key(id)).unwrap_or(false));
        let merge = merge_features(include_all, &self.features, candidates);
        let auto_popup_properties: Vec<String> = tour
            .auto_popup_properties
            .as_ref()
            .map(|props| {
                props
                    .iter()
                    .filter(|p| dataset.has_property(p))
                    .cloned()
                    .collect()
            })
            .unwrap_or_else(|| dataset.auto_popup_properties.clone());
        let features: Vec<MergedFeature> = merge
            .visible
            .iter()
            .map(|v| MergedFeature {
                id: v.feature.id().unwrap_or_default().to_string(),
                dataset: dataset.id().to_string(),
                name: v.feature.name(dataset.name_property()),
                geojson: v.feature.as_geojson(),
                popup_content: v.popup_content.clone(),
                popup_properties: auto_popup_properties
                    .iter()
                    .filter_map(|p| {
                        v.feature
                            .properties
                            .get(p)
                            .map(|value| (p.clone(), value.to_string()))
                    })
                    .collect(),
            })
            .collect();
        let hidden_features = merge
            .hidden
            .iter()
            .chain(hidden_by_author.iter())
            .map(|f| f.as_geojson())
            .collect();

        let style = match (&icon_options, &path_options) {
            (Some(icon), _) => LegendStyle::Icon {
                icon,
                alt: icon_alt.as_deref(),
            },
            (None, Some(path)) => LegendStyle::Path(path),
            (None, None) => LegendStyle::Path(&dataset.path),
        };
        let legend = merge_legend(
            dataset.id(),
            feature_type,
            &dataset.legend,
            &LegendText {
                text: tour.legend_text.clone(),
                alt: tour.legend_alt.clone(),
            },
            style,
            features.len(),
        );

        let merged = MergedDataset {
            id: dataset.id().to_string(),
            name: dataset.name.clone(),
            feature_type,
            icon_options,
            path_options,
            path_active_options,
            legend,
            attribution: tour.attribution.clone().or_else(|| dataset.attribution.clone()),
            auto_popup_properties,
            features: features.iter().map(|f| f.id.clone()).collect(),
            hidden_features,
        };
        (merged, features)
    }
}

fn collect_all_features<L: DatasetLookup>(
    datasets: &IndexMap<String, TourDataset>,
    lookup: &L,
) -> IndexMap<String, String> {
    let mut all = IndexMap::new();
    for id in datasets.keys() {
        if let Some(dataset) = lookup.dataset(id) {
            for fid in dataset.features().keys() {
                all.insert(fid.clone(), id.clone());
            }
        }
    }
    all
}

fn collect_included<L: DatasetLookup>(
    datasets: &IndexMap<String, TourDataset>,
    features: &IndexMap<String, PopupOverride>,
    lookup: &L,
) -> Included {
    let mut included = Included::default();
    for (id, entry) in datasets {
        let dataset = match lookup.dataset(id) {
            Some(dataset) => dataset,
            None => continue,
        };
        let before = included.feature_ids.len();
        for (fid, feature) in dataset.features() {
            if (entry.include_all && !feature.is_hidden()) || features.contains_key(fid) {
                included.feature_ids.push(fid.clone());
            }
        }
        if included.feature_ids.len() > before {
            included.dataset_ids.push(id.clone());
        }
    }
    included
}
