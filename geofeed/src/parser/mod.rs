//! Parsers GeoJSON (FeatureCollection et séquences ligne à ligne)

pub mod collection;
pub mod crs;
pub mod properties;
pub mod seq;

use geo::Geometry;
use serde_json::Value;

use crate::types::{Crs, SourceFormat, SourceRecord};
use crate::GeofeedError;

/// Résultat du parsing d'un texte source
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub records: Vec<SourceRecord>,
    pub crs: Crs,
    /// Membre `crs` présent mais non reconnu
    pub unknown_crs: Option<String>,
    pub errors: Vec<GeofeedError>,
}

/// Parse un texte source selon son format
pub fn parse(text: &str, format: SourceFormat, file: &str) -> Result<ParsedSource, GeofeedError> {
    match format {
        SourceFormat::FeatureCollection => collection::parse(text, file),
        SourceFormat::Sequence => Ok(seq::parse(text, file)),
    }
}

/// Devine le format depuis le contenu quand l'extension ne suffit pas.
///
/// Un document commençant par RS (0x1E) ou dont la première ligne est une
/// `Feature` complète est traité comme une séquence.
pub fn sniff_format(text: &str) -> SourceFormat {
    let trimmed = text.trim_start();
    if trimmed.starts_with('\u{1e}') {
        return SourceFormat::Sequence;
    }

    let first_line = trimmed.lines().next().unwrap_or("");
    match serde_json::from_str::<Value>(first_line) {
        Ok(Value::Object(obj)) if obj.get("type").and_then(Value::as_str) == Some("Feature") => {
            SourceFormat::Sequence
        }
        _ => SourceFormat::FeatureCollection,
    }
}

/// Convertit une feature GeoJSON (valeur JSON) en enregistrement source.
///
/// Retourne l'enregistrement (si la valeur est bien une feature) et une
/// éventuelle erreur non fatale (géométrie non convertible).
pub(crate) fn convert_feature(
    value: Value,
    index: usize,
    file: &str,
) -> (Option<SourceRecord>, Option<GeofeedError>) {
    let Value::Object(mut object) = value else {
        return (None, Some(GeofeedError::invalid_feature(file, index, "feature is not an object")));
    };

    // La géométrie est convertie à part : une géométrie illisible ne doit pas
    // faire perdre l'enregistrement (il sera compté comme sans géométrie).
    let geometry_value = object.insert("geometry".to_string(), Value::Null);

    let feature = match geojson::Feature::try_from(object) {
        Ok(f) => f,
        Err(e) => {
            return (None, Some(GeofeedError::invalid_feature(file, index, e.to_string())));
        }
    };

    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });

    let (geometry, error) = match geometry_value {
        None | Some(Value::Null) => (None, None),
        Some(value) => match convert_geometry(value) {
            Ok(geometry) => (Some(geometry), None),
            Err(reason) => (
                None,
                Some(GeofeedError::invalid_feature(file, index, format!("geometry: {}", reason))),
            ),
        },
    };

    let record = SourceRecord {
        index,
        id,
        geometry,
        properties: feature.properties.unwrap_or_default(),
    };

    (Some(record), error)
}

fn convert_geometry(value: Value) -> Result<Geometry, String> {
    let geometry = geojson::Geometry::try_from(value).map_err(|e| e.to_string())?;
    Geometry::<f64>::try_from(geometry.value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sniff_format() {
        let seq = "{\"type\":\"Feature\",\"geometry\":null,\"properties\":{}}\n{\"type\":\"Feature\",\"geometry\":null,\"properties\":{}}";
        assert_eq!(sniff_format(seq), SourceFormat::Sequence);
        assert_eq!(sniff_format("\u{1e}{\"type\":\"Feature\"}"), SourceFormat::Sequence);

        let fc = "{\n  \"type\": \"FeatureCollection\",\n  \"features\": []\n}";
        assert_eq!(sniff_format(fc), SourceFormat::FeatureCollection);
    }

    #[test]
    fn test_convert_feature_with_numeric_id() {
        let value = json!({
            "type": "Feature",
            "id": 42,
            "geometry": {"type": "Point", "coordinates": [-118.2, 34.0]},
            "properties": {"APN": "5133-012-001"}
        });

        let (record, error) = convert_feature(value, 3, "t.geojson");
        let record = record.unwrap();
        assert!(error.is_none());
        assert_eq!(record.index, 3);
        assert_eq!(record.id.as_deref(), Some("42"));
        assert!(matches!(record.geometry, Some(Geometry::Point(_))));
        assert_eq!(record.properties["APN"], "5133-012-001");
    }

    #[test]
    fn test_convert_feature_null_geometry() {
        let value = json!({"type": "Feature", "geometry": null, "properties": null});
        let (record, error) = convert_feature(value, 0, "t.geojson");
        let record = record.unwrap();
        assert!(error.is_none());
        assert!(record.geometry.is_none());
        assert!(record.properties.is_empty());
    }

    #[test]
    fn test_convert_feature_bad_geometry_keeps_record() {
        let value = json!({
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0.0]]]},
            "properties": {"APN": "1"}
        });
        let (record, error) = convert_feature(value, 1, "t.geojson");
        let record = record.unwrap();
        assert!(record.geometry.is_none());
        assert_eq!(record.properties["APN"], "1");
        assert!(matches!(error, Some(GeofeedError::InvalidFeature { index: 1, .. })));
    }

    #[test]
    fn test_convert_not_a_feature() {
        let value = json!({"type": "Point", "coordinates": [0.0, 0.0]});
        let (record, error) = convert_feature(value, 7, "t.geojson");
        assert!(record.is_none());
        assert!(matches!(error, Some(GeofeedError::InvalidFeature { index: 7, .. })));
    }
}
