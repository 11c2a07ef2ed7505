//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::geom::{self, Coordinates, FeatureType, GeometryError};
use crate::core::header;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Supported feature property value types
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    /// Convert a JSON value. `null` has no property value, nested values are kept as JSON text.
    pub fn from_json(value: &Value) -> Option<PropertyValue> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(PropertyValue::Int(i)),
                None => n.as_f64().map(PropertyValue::Double),
            },
            Value::String(s) => Some(PropertyValue::String(s.clone())),
            other => Some(PropertyValue::String(other.to_string())),
        }
    }
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => json!(b),
            PropertyValue::Int(i) => json!(i),
            PropertyValue::Double(d) => json!(d),
            PropertyValue::String(s) => json!(s),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Double(d) => write!(f, "{}", d),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

/// Ordered property bag
pub type Properties = IndexMap<String, PropertyValue>;

pub fn properties_from_json(value: &Value) -> Properties {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| PropertyValue::from_json(v).map(|pv| (k.clone(), pv)))
                .collect()
        })
        .unwrap_or_default()
}

/// Properties of `base` with values from `overlay` replacing or extending them
pub fn merge_properties(base: &Properties, overlay: &Properties) -> Properties {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    id: Option<String>,
    dataset_id: Option<String>,
    pub coordinates: Coordinates,
    pub properties: Properties,
    pub custom_name: Option<String>,
    pub hidden: Option<bool>,
    pub popup_content: Option<String>,
}

impl Feature {
    pub fn new(coordinates: Coordinates, properties: Properties) -> Feature {
        Feature {
            id: None,
            dataset_id: None,
            coordinates,
            properties,
            custom_name: None,
            hidden: None,
            popup_content: None,
        }
    }

    /// Read a GeoJSON feature. Ids of uploaded features are ignored.
    pub fn from_geojson(
        json: &Value,
        expected: Option<FeatureType>,
    ) -> Result<Feature, GeometryError> {
        let geometry = json.get("geometry").ok_or(GeometryError::MissingGeometry)?;
        let coordinates = geom::validate_geometry(geometry, expected)?;
        let properties = json
            .get("properties")
            .map(properties_from_json)
            .unwrap_or_default();
        Ok(Feature::new(coordinates, properties))
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_ref().map(|s| s.as_str())
    }
    /// Set the id once. Later calls are ignored.
    pub fn set_id(&mut self, id: &str) {
        if self.id.is_none() {
            self.id = Some(id.to_string());
        }
    }
    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_ref().map(|s| s.as_str())
    }
    /// Set the owning dataset once. Later calls are ignored.
    pub fn set_dataset_id(&mut self, dataset_id: &str) {
        if self.dataset_id.is_none() {
            self.dataset_id = Some(dataset_id.to_string());
        }
    }
    pub fn feature_type(&self) -> FeatureType {
        self.coordinates.feature_type()
    }
    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }

    /// Copy without id and dataset reference
    pub fn detached(&self) -> Feature {
        Feature {
            id: None,
            dataset_id: None,
            ..self.clone()
        }
    }

    /// Custom name, else the value of the name property, else the id
    pub fn name(&self, name_property: Option<&str>) -> String {
        if let Some(name) = self.custom_name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        if let Some(value) = name_property.and_then(|p| self.properties.get(p)) {
            let name = value.to_string();
            if !name.is_empty() {
                return name;
            }
        }
        self.id.clone().unwrap_or_default()
    }

    /// Take custom name, visibility and popup content from a page entry
    pub fn set_authored(&mut self, header: &FeatureHeader) {
        self.custom_name = header.custom_name.clone();
        self.hidden = header.hide;
        self.popup_content = header.popup_content.clone();
    }

    /// Apply authored changes. Invalid coordinates are ignored.
    pub fn update(&mut self, header: &FeatureHeader) {
        self.set_authored(header);
        if let Some(raw) = &header.coordinates {
            match geom::from_authoring(self.feature_type(), raw) {
                Ok(coordinates) => self.coordinates = coordinates,
                Err(e) => warn!(
                    "Ignoring coordinates of feature {}: {}",
                    self.id().unwrap_or("?"),
                    e
                ),
            }
        }
        if let Some(properties) = &header.properties {
            self.properties = merge_properties(&self.properties, properties);
        }
    }

    pub fn copy_authored_from(&mut self, other: &Feature) {
        self.custom_name = other.custom_name.clone();
        self.hidden = other.hidden;
        self.popup_content = other.popup_content.clone();
    }

    /// Take geometry and properties of an uploaded feature, keeping id and authored fields
    pub fn absorb(&mut self, uploaded: &Feature) {
        self.coordinates = uploaded.coordinates.clone();
        self.properties = merge_properties(&self.properties, &uploaded.properties);
    }

    pub fn as_geojson(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": self.coordinates.geometry(),
            "properties": properties,
        })
    }

    pub fn as_header(&self, name_property: Option<&str>) -> FeatureHeader {
        FeatureHeader {
            id: self.id.clone(),
            name: Some(self.name(name_property)),
            custom_name: self.custom_name.clone(),
            coordinates: Some(self.coordinates.to_authoring()),
            properties: Some(self.properties.clone()),
            hide: self.hidden,
            popup_content: self.popup_content.clone(),
        }
    }
}

/// Feature entry of a dataset page
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FeatureHeader {
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name, never read back
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
    #[serde(deserialize_with = "header::properties", skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(deserialize_with = "header::opt_bool", skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub popup_content: Option<String>,
}
