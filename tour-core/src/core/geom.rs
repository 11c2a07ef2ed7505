//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::EnumString;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Supported GeoJSON geometry types
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeatureType {
    Point,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

pub const FEATURE_TYPES: [FeatureType; 5] = [
    FeatureType::Point,
    FeatureType::LineString,
    FeatureType::MultiLineString,
    FeatureType::Polygon,
    FeatureType::MultiPolygon,
];

impl EnumString<FeatureType> for FeatureType {
    fn from_str(val: &str) -> Result<FeatureType, String> {
        FEATURE_TYPES
            .iter()
            .cloned()
            .find(|t| t.as_str().eq_ignore_ascii_case(val))
            .ok_or(format!("Unsupported feature type '{}'", val))
    }
    fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Point => "Point",
            FeatureType::LineString => "LineString",
            FeatureType::MultiLineString => "MultiLineString",
            FeatureType::Polygon => "Polygon",
            FeatureType::MultiPolygon => "MultiPolygon",
        }
    }
}

enum_string_serialization!(FeatureType FeatureTypeVisitor);

impl FeatureType {
    /// Unknown type names resolve to `Point`. The flag is true when the fallback was used.
    pub fn from_name_or_point(name: &str) -> (FeatureType, bool) {
        match FeatureType::from_str(name) {
            Ok(feature_type) => (feature_type, false),
            Err(_) => (FeatureType::Point, true),
        }
    }
    pub fn is_line(&self) -> bool {
        match self {
            FeatureType::LineString | FeatureType::MultiLineString => true,
            _ => false,
        }
    }
    pub fn is_polygon(&self) -> bool {
        match self {
            FeatureType::Polygon | FeatureType::MultiPolygon => true,
            _ => false,
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[lng, lat]`
pub type Position = [f64; 2];

/// Validated GeoJSON coordinates
#[derive(Clone, PartialEq, Debug)]
pub enum Coordinates {
    Point(Position),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Coordinates {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Coordinates::Point(_) => FeatureType::Point,
            Coordinates::LineString(_) => FeatureType::LineString,
            Coordinates::MultiLineString(_) => FeatureType::MultiLineString,
            Coordinates::Polygon(_) => FeatureType::Polygon,
            Coordinates::MultiPolygon(_) => FeatureType::MultiPolygon,
        }
    }
    /// Nested array form
    pub fn to_json(&self) -> Value {
        match self {
            Coordinates::Point(p) => json!(p),
            Coordinates::LineString(l) => json!(l),
            Coordinates::MultiLineString(l) => json!(l),
            Coordinates::Polygon(p) => json!(p),
            Coordinates::MultiPolygon(p) => json!(p),
        }
    }
    /// Authoring form: `{lng, lat}` for points, nested arrays otherwise
    pub fn to_authoring(&self) -> Value {
        match self {
            Coordinates::Point(p) => json!({"lng": p[0], "lat": p[1]}),
            _ => self.to_json(),
        }
    }
    /// GeoJSON geometry object
    pub fn geometry(&self) -> Value {
        json!({
            "type": self.feature_type().as_str(),
            "coordinates": self.to_json(),
        })
    }
}

impl Serialize for Coordinates {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Coordinates::Point(p) => p.serialize(serializer),
            Coordinates::LineString(l) => l.serialize(serializer),
            Coordinates::MultiLineString(l) => l.serialize(serializer),
            Coordinates::Polygon(p) => p.serialize(serializer),
            Coordinates::MultiPolygon(p) => p.serialize(serializer),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    MissingGeometry,
    UnknownType(String),
    TypeMismatch {
        expected: FeatureType,
        found: FeatureType,
    },
    NotAnArray(String),
    InvalidPosition(String),
    TooFewPoints {
        expected: usize,
        found: usize,
    },
    UnclosedRing,
    Empty(FeatureType),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeometryError::MissingGeometry => write!(f, "missing geometry"),
            GeometryError::UnknownType(t) => write!(f, "unsupported geometry type '{}'", t),
            GeometryError::TypeMismatch { expected, found } => {
                write!(f, "expected {} geometry, found {}", expected, found)
            }
            GeometryError::NotAnArray(v) => write!(f, "expected coordinate array, found {}", v),
            GeometryError::InvalidPosition(v) => write!(f, "invalid position {}", v),
            GeometryError::TooFewPoints { expected, found } => write!(
                f,
                "expected at least {} points, found {}",
                expected, found
            ),
            GeometryError::UnclosedRing => write!(f, "polygon ring is not closed"),
            GeometryError::Empty(t) => write!(f, "empty {} coordinates", t),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Validate raw coordinates against the declared feature type
pub fn validate(feature_type: FeatureType, raw: &Value) -> Result<Coordinates, GeometryError> {
    match feature_type {
        FeatureType::Point => parse_position(raw).map(Coordinates::Point),
        FeatureType::LineString => parse_line(raw).map(Coordinates::LineString),
        FeatureType::MultiLineString => {
            parse_non_empty(raw, feature_type, parse_line).map(Coordinates::MultiLineString)
        }
        FeatureType::Polygon => parse_polygon(raw).map(Coordinates::Polygon),
        FeatureType::MultiPolygon => {
            parse_non_empty(raw, feature_type, parse_polygon).map(Coordinates::MultiPolygon)
        }
    }
}

/// Validate a GeoJSON geometry object. Unknown type names are rejected here.
pub fn validate_geometry(
    geometry: &Value,
    expected: Option<FeatureType>,
) -> Result<Coordinates, GeometryError> {
    let type_name = geometry
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or(GeometryError::MissingGeometry)?;
    let feature_type = FeatureType::from_str(type_name)
        .map_err(|_| GeometryError::UnknownType(type_name.to_string()))?;
    if let Some(expected) = expected {
        if expected != feature_type {
            return Err(GeometryError::TypeMismatch {
                expected,
                found: feature_type,
            });
        }
    }
    let raw = geometry
        .get("coordinates")
        .ok_or(GeometryError::MissingGeometry)?;
    validate(feature_type, raw)
}

/// Read coordinates in authoring form: `{lng, lat}` objects, nested arrays or
/// JSON encoded strings.
pub fn from_authoring(feature_type: FeatureType, raw: &Value) -> Result<Coordinates, GeometryError> {
    match raw {
        Value::Object(map) if feature_type == FeatureType::Point => {
            let lng = map.get("lng").cloned().unwrap_or(Value::Null);
            let lat = map.get("lat").cloned().unwrap_or(Value::Null);
            validate(feature_type, &json!([lng, lat]))
        }
        Value::String(encoded) => {
            let decoded: Value = serde_json::from_str(encoded)
                .map_err(|_| GeometryError::NotAnArray(encoded.clone()))?;
            validate(feature_type, &decoded)
        }
        _ => validate(feature_type, raw),
    }
}

fn as_array(raw: &Value) -> Result<&Vec<Value>, GeometryError> {
    raw.as_array()
        .ok_or_else(|| GeometryError::NotAnArray(raw.to_string()))
}

fn parse_position(raw: &Value) -> Result<Position, GeometryError> {
    let values = as_array(raw)?;
    if values.len() != 2 {
        return Err(GeometryError::InvalidPosition(raw.to_string()));
    }
    match (values[0].as_f64(), values[1].as_f64()) {
        (Some(lng), Some(lat))
            if lng.is_finite()
                && lat.is_finite()
                && lng >= -180.0
                && lng <= 180.0
                && lat >= -90.0
                && lat <= 90.0 =>
        {
            Ok([lng, lat])
        }
        _ => Err(GeometryError::InvalidPosition(raw.to_string())),
    }
}

fn parse_points(raw: &Value, min: usize) -> Result<Vec<Position>, GeometryError> {
    let points = as_array(raw)?
        .iter()
        .map(parse_position)
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() < min {
        return Err(GeometryError::TooFewPoints {
            expected: min,
            found: points.len(),
        });
    }
    Ok(points)
}

fn parse_line(raw: &Value) -> Result<Vec<Position>, GeometryError> {
    parse_points(raw, 2)
}

fn parse_ring(raw: &Value) -> Result<Vec<Position>, GeometryError> {
    let ring = parse_points(raw, 4)?;
    if ring.first() != ring.last() {
        return Err(GeometryError::UnclosedRing);
    }
    Ok(ring)
}

fn parse_polygon(raw: &Value) -> Result<Vec<Vec<Position>>, GeometryError> {
    parse_non_empty(raw, FeatureType::Polygon, parse_ring)
}

fn parse_non_empty<T, F>(
    raw: &Value,
    feature_type: FeatureType,
    parse: F,
) -> Result<Vec<T>, GeometryError>
where
    F: Fn(&Value) -> Result<T, GeometryError>,
{
    let parts = as_array(raw)?
        .iter()
        .map(|part| parse(part))
        .collect::<Result<Vec<_>, _>>()?;
    if parts.is_empty() {
        return Err(GeometryError::Empty(feature_type));
    }
    Ok(parts)
}
