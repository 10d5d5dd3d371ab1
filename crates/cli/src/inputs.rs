//! Command-line input parsing: dated snapshots and GeoJSON inland seas

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use std::path::{Path, PathBuf};
use waterdriver_core::vector::{AttributeValue, Feature, FeatureCollection};

/// Parse a `DATE=PATH` snapshot argument, DATE as `YYYY-MM-DD`.
pub fn parse_snapshot(arg: &str) -> Result<(NaiveDate, PathBuf)> {
    let (date, path) = arg
        .split_once('=')
        .with_context(|| format!("Expected DATE=PATH, got '{}'", arg))?;
    let date = parse_date(date)?;
    if path.trim().is_empty() {
        bail!("Missing path for snapshot {}", date);
    }
    Ok((date, PathBuf::from(path.trim())))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s.trim()))
}

/// Read a GeoJSON file of Polygon/MultiPolygon features.
pub fn read_geojson(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    parse_geojson(&value)
}

/// Convert a GeoJSON FeatureCollection, Feature or bare geometry.
///
/// Only polygonal geometries are accepted; inland seas are areas.
pub fn parse_geojson(value: &Value) -> Result<FeatureCollection> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .context("FeatureCollection without a features array")?;
            features.iter().map(parse_feature).collect()
        }
        Some("Feature") => Ok(std::iter::once(parse_feature(value)?).collect()),
        Some(_) => Ok(std::iter::once(Feature::new(parse_geometry(value)?)).collect()),
        None => bail!("GeoJSON object without a type"),
    }
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let geometry = value.get("geometry").context("Feature without a geometry")?;
    let mut feature = Feature::new(parse_geometry(geometry)?);
    if let Some(props) = value.get("properties").and_then(Value::as_object) {
        for (key, v) in props {
            feature.set_property(key.clone(), attribute(v));
        }
    }
    feature.id = match value.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Ok(feature)
}

fn attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        _ => AttributeValue::Null,
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    let coords = value.get("coordinates").context("Geometry without coordinates")?;
    match kind {
        "Polygon" => Ok(Geometry::Polygon(polygon(coords)?)),
        "MultiPolygon" => {
            let parts = coords
                .as_array()
                .context("MultiPolygon coordinates must be an array")?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon(parts)))
        }
        other => bail!("Unsupported geometry type '{}', expected Polygon or MultiPolygon", other),
    }
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value.as_array().context("Polygon coordinates must be an array of rings")?;
    let mut rings = rings.iter().map(ring);
    let exterior = rings.next().context("Polygon without an exterior ring")??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring(value: &Value) -> Result<LineString<f64>> {
    let points = value.as_array().context("Ring must be an array of positions")?;
    points
        .iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("Invalid position {}", p),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_snapshot() {
        let (date, path) = parse_snapshot("2020-01-01=pop/2020.tif").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(path, PathBuf::from("pop/2020.tif"));

        assert!(parse_snapshot("pop/2020.tif").is_err());
        assert!(parse_snapshot("2020-13-01=pop.tif").is_err());
        assert!(parse_snapshot("2020-01-01=").is_err());
    }

    #[test]
    fn test_feature_collection_with_properties() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 7,
                "properties": {"glwd_id": 1, "name": "Caspian"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]]]
                }
            }]
        });
        let fc = parse_geojson(&doc).unwrap();
        assert_eq!(fc.len(), 1);

        let feature = fc.iter().next().unwrap();
        assert_eq!(feature.get_property("glwd_id"), Some(&AttributeValue::Int(1)));
        assert_eq!(feature.id.as_deref(), Some("7"));
        assert!(matches!(feature.geometry, Some(Geometry::Polygon(_))));
    }

    #[test]
    fn test_multipolygon_geometry() {
        let doc = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]
        });
        let fc = parse_geojson(&doc).unwrap();
        match &fc.iter().next().unwrap().geometry {
            Some(Geometry::MultiPolygon(mp)) => assert_eq!(mp.0.len(), 2),
            other => panic!("unexpected geometry {:?}", other),
        };
    }

    #[test]
    fn test_non_polygonal_geometry_rejected() {
        let doc = json!({"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]});
        assert!(parse_geojson(&doc).is_err());
        assert!(parse_geojson(&json!({"coordinates": []})).is_err());
    }
}
