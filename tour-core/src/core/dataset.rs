//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::feature::{Feature, FeatureHeader};
use crate::core::geom::{self, FeatureType};
use crate::core::header;
use crate::core::options::{IconOptions, LegendText, PathOptions};
use crate::core::{EnumString, Issue};
use indexmap::IndexMap;
use serde_json::Value;

/// Dataset blob as stored in the data directory
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetJson {
    #[serde(rename = "type", default = "feature_collection")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub feature_counter: u64,
    #[serde(default)]
    pub feature_type: String,
    #[serde(default)]
    pub name_property: Option<String>,
    #[serde(default)]
    pub property_list: Vec<String>,
    #[serde(default)]
    pub features: Vec<Value>,
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

/// Dataset page header
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DatasetHeader {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub name_prop: Option<String>,
    pub features: Vec<FeatureHeader>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub legend_text: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub legend_alt: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub icon_alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<PathOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_active: Option<PathOptions>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(deserialize_with = "header::string_list", skip_serializing_if = "Option::is_none")]
    pub auto_popup_properties: Option<Vec<String>>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub upload_file_path: Option<String>,
}

/// Unique id derived from a title, numbered on collision.
///
/// Letters, digits and `_` are kept lowercased, every other run of characters becomes a
/// single `-`. Ids are used as file names, so they never contain path separators or dots.
pub fn generate_id(title: &str, existing: &[String]) -> String {
    let lower = title.to_lowercase();
    let mut base = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if base.is_empty() {
        base = "untitled".to_string();
    }
    let mut id = base.clone();
    let mut n = 1;
    while existing.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    id
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    id: String,
    pub name: String,
    feature_type: FeatureType,
    name_property: Option<String>,
    property_list: Vec<String>,
    /// Keyed by feature id, or by upload position before `initialize`
    features: IndexMap<String, Feature>,
    feature_counter: u64,
    pub icon: IconOptions,
    pub path: PathOptions,
    pub path_active: PathOptions,
    pub legend: LegendText,
    pub icon_alt: Option<String>,
    pub attribution: Option<String>,
    pub auto_popup_properties: Vec<String>,
    pub upload_file_path: Option<String>,
}

impl Dataset {
    fn empty(id: &str, name: &str, feature_type: FeatureType) -> Dataset {
        Dataset {
            id: id.to_string(),
            name: name.to_string(),
            feature_type,
            name_property: None,
            property_list: Vec::new(),
            features: IndexMap::new(),
            feature_counter: 0,
            icon: IconOptions::default(),
            path: PathOptions::default(),
            path_active: PathOptions::default(),
            legend: LegendText::default(),
            icon_alt: None,
            attribution: None,
            auto_popup_properties: Vec::new(),
            upload_file_path: None,
        }
    }

    /// Read an uploaded FeatureCollection.
    ///
    /// The feature type is the type of the first feature with valid geometry. Features with
    /// other types or invalid geometry are skipped. Features are keyed by upload position until
    /// the dataset is initialized.
    pub fn from_geojson(json: &Value) -> Result<Dataset, Issue> {
        let raw_features = json
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| Issue::UnreadableUpload("no features list found".to_string()))?;
        let feature_type = raw_features
            .iter()
            .filter_map(|f| f.get("geometry"))
            .filter_map(|g| geom::validate_geometry(g, None).ok())
            .map(|c| c.feature_type())
            .next()
            .ok_or(Issue::NoValidFeatures)?;
        let name = json.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let mut dataset = Dataset::empty("", name, feature_type);
        let mut skipped = 0;
        for (pos, raw) in raw_features.iter().enumerate() {
            match Feature::from_geojson(raw, Some(feature_type)) {
                Ok(feature) => {
                    for key in feature.properties.keys() {
                        if !dataset.property_list.contains(key) {
                            dataset.property_list.push(key.clone());
                        }
                    }
                    dataset.features.insert(pos.to_string(), feature);
                }
                Err(e) => {
                    debug!("Skipping uploaded feature {}: {}", pos, e);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(
                "{} of {} uploaded features skipped",
                skipped,
                raw_features.len()
            );
        }
        dataset.name_property = guess_name_property(&dataset.property_list);
        Ok(dataset)
    }

    /// Load a stored dataset from its blob and page header
    pub fn from_persisted(
        id: &str,
        blob: &DatasetJson,
        header: Option<&DatasetHeader>,
    ) -> Dataset {
        let (feature_type, fallback) = FeatureType::from_name_or_point(&blob.feature_type);
        if fallback {
            warn!(
                "Dataset {}: unknown feature type '{}', using Point",
                id, blob.feature_type
            );
        }
        let name = blob
            .name
            .clone()
            .or_else(|| header.and_then(|h| h.title.clone()))
            .unwrap_or_else(|| id.to_string());
        let mut dataset = Dataset::empty(id, &name, feature_type);
        dataset.feature_counter = blob.feature_counter;
        dataset.name_property = blob.name_property.clone();
        dataset.property_list = blob.property_list.clone();
        for raw in &blob.features {
            match Feature::from_geojson(raw, Some(feature_type)) {
                Ok(mut feature) => {
                    if let Some(fid) = raw.get("id").and_then(|i| i.as_str()) {
                        feature.set_id(fid);
                    }
                    if let Err(e) = dataset.add_feature(feature) {
                        warn!("Dataset {}: {}", id, e);
                    }
                }
                Err(e) => warn!("Dataset {}: skipping stored feature: {}", id, e),
            }
        }
        if let Some(header) = header {
            dataset.set_page_info(header);
            for entry in &header.features {
                if let Some(feature) = entry.id.as_ref().and_then(|fid| dataset.features.get_mut(fid)) {
                    feature.set_authored(entry);
                }
            }
        }
        dataset
    }

    /// Assign a unique id and mint ids for all features
    pub fn initialize(&mut self, name: Option<&str>, existing_ids: &[String]) {
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            self.name = name.to_string();
        }
        if self.name.trim().is_empty() {
            self.name = "Untitled".to_string();
        }
        self.id = generate_id(&self.name, existing_ids);
        let pending = std::mem::replace(&mut self.features, IndexMap::new());
        for (_, mut feature) in pending {
            let fid = self.mint_feature_id();
            feature.set_id(&fid);
            feature.set_dataset_id(&self.id);
            self.features.insert(fid, feature);
        }
        self.set_defaults();
        info!("Initialized dataset {} with {} features", self.id, self.features.len());
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn is_initialized(&self) -> bool {
        !self.id.is_empty()
    }
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }
    pub fn name_property(&self) -> Option<&str> {
        self.name_property.as_ref().map(|s| s.as_str())
    }
    pub fn property_list(&self) -> &[String] {
        &self.property_list
    }
    pub fn has_property(&self, property: &str) -> bool {
        self.property_list.iter().any(|p| p == property)
    }
    pub fn feature_counter(&self) -> u64 {
        self.feature_counter
    }
    pub fn features(&self) -> &IndexMap<String, Feature> {
        &self.features
    }
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }
    pub fn feature_name(&self, id: &str) -> Option<String> {
        self.features.get(id).map(|f| f.name(self.name_property()))
    }

    /// Next feature id `<dataset id>--<counter>`
    pub fn mint_feature_id(&mut self) -> String {
        let fid = format!("{}--{}", self.id, self.feature_counter);
        self.feature_counter += 1;
        fid
    }

    /// Attach a feature. Features without id get a minted one.
    pub fn add_feature(&mut self, mut feature: Feature) -> Result<String, Issue> {
        if feature.feature_type() != self.feature_type {
            return Err(Issue::FeatureTypeMismatch {
                expected: self.feature_type,
                found: feature.feature_type(),
            });
        }
        let fid = match feature.id() {
            Some(fid) => fid.to_string(),
            None => {
                let fid = self.mint_feature_id();
                feature.set_id(&fid);
                fid
            }
        };
        feature.set_dataset_id(&self.id);
        self.features.insert(fid.clone(), feature);
        Ok(fid)
    }

    pub fn remove_feature(&mut self, id: &str) -> Option<Feature> {
        self.features.shift_remove(id)
    }

    /// Copy with the same settings and counter but without features
    pub fn without_features(&self) -> Dataset {
        Dataset {
            features: IndexMap::new(),
            ..self.clone()
        }
    }

    /// Append unknown properties to the property list
    pub fn extend_property_list(&mut self, properties: &[String]) {
        for property in properties {
            if !self.has_property(property) {
                self.property_list.push(property.clone());
            }
        }
    }

    /// Replace the property list. Name and popup properties not in the new list are dropped.
    pub fn set_property_list(&mut self, properties: Vec<String>, name_property: Option<&str>) {
        self.property_list = properties;
        if !self.name_property().map(|p| self.has_property(p)).unwrap_or(false) {
            self.name_property = name_property
                .filter(|p| self.has_property(p))
                .map(|p| p.to_string());
        }
        let list = &self.property_list;
        self.auto_popup_properties.retain(|p| list.contains(p));
    }

    /// Styling defaults for new datasets
    pub fn set_defaults(&mut self) {
        if self.path.is_empty() {
            self.path = PathOptions::default_path();
        }
        if self.path_active.is_empty() {
            self.path_active = PathOptions::default_active();
        }
    }

    fn set_page_info(&mut self, header: &DatasetHeader) {
        self.legend = LegendText {
            text: header.legend_text.clone(),
            alt: header.legend_alt.clone(),
        };
        self.icon_alt = header.icon_alt.clone();
        self.attribution = header.attribution.clone();
        if let Some(icon) = &header.icon {
            self.icon = icon.clone();
        }
        if let Some(svg) = &header.svg {
            self.path = svg.clone();
        }
        if let Some(svg_active) = &header.svg_active {
            self.path_active = svg_active.clone();
        }
        if let Some(props) = &header.auto_popup_properties {
            self.auto_popup_properties = props
                .iter()
                .filter(|p| self.has_property(p))
                .cloned()
                .collect();
        }
        if header.upload_file_path.is_some() {
            self.upload_file_path = header.upload_file_path.clone();
        }
    }

    /// Apply a saved dataset page and return the corrected header.
    ///
    /// An empty title keeps the current name, an unknown name property is ignored and the
    /// feature list always reflects the dataset's actual features.
    pub fn update_from_header(&mut self, header: &DatasetHeader) -> DatasetHeader {
        if let Some(title) = &header.title {
            self.name = title.clone();
        }
        if let Some(name_prop) = &header.name_prop {
            if self.has_property(name_prop) {
                self.name_property = Some(name_prop.clone());
            } else {
                debug!("Dataset {}: ignoring unknown name property {}", self.id, name_prop);
            }
        }
        for entry in &header.features {
            if let Some(feature) = entry.id.as_ref().and_then(|fid| self.features.get_mut(fid)) {
                feature.update(entry);
            }
        }
        for feature in self.features.values() {
            let keys: Vec<String> = feature.properties.keys().cloned().collect();
            for key in keys {
                if !self.property_list.contains(&key) {
                    self.property_list.push(key);
                }
            }
        }
        self.set_page_info(header);
        self.as_header()
    }

    pub fn as_header(&self) -> DatasetHeader {
        DatasetHeader {
            id: Some(self.id.clone()),
            title: Some(self.name.clone()),
            name_prop: self.name_property.clone(),
            features: self
                .features
                .values()
                .map(|f| f.as_header(self.name_property()))
                .collect(),
            legend_text: self.legend.text.clone(),
            legend_alt: self.legend.alt.clone(),
            icon_alt: self.icon_alt.clone(),
            icon: Some(self.icon.clone()),
            svg: Some(self.path.clone()),
            svg_active: Some(self.path_active.clone()),
            attribution: self.attribution.clone(),
            auto_popup_properties: Some(self.auto_popup_properties.clone()),
            upload_file_path: self.upload_file_path.clone(),
        }
    }

    pub fn as_json(&self) -> DatasetJson {
        DatasetJson {
            kind: feature_collection(),
            name: Some(self.name.clone()),
            feature_counter: self.feature_counter,
            feature_type: self.feature_type.as_str().to_string(),
            name_property: self.name_property.clone(),
            property_list: self.property_list.clone(),
            features: self.features.values().map(|f| f.as_geojson()).collect(),
        }
    }
}

/// First property equal to or containing `name`, else the first property
fn guess_name_property(properties: &[String]) -> Option<String> {
    properties
        .iter()
        .find(|p| p.eq_ignore_ascii_case("name"))
        .or_else(|| properties.iter().find(|p| p.to_lowercase().contains("name")))
        .or_else(|| properties.first())
        .cloned()
}
