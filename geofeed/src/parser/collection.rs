//! Parser pour les documents GeoJSON `FeatureCollection`

use serde_json::Value;
use tracing::warn;

use super::{convert_feature, crs, ParsedSource};
use crate::GeofeedError;

/// Parse un document GeoJSON complet.
///
/// Accepte une `FeatureCollection` (cas normal) ou une `Feature` isolée.
/// Chaque feature est convertie séparément : une feature illisible n'invalide
/// pas le reste du document.
pub fn parse(text: &str, file: &str) -> Result<ParsedSource, GeofeedError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| GeofeedError::parse_error(file, e.to_string()))?;

    let Value::Object(mut root) = root else {
        return Err(GeofeedError::parse_error(file, "top-level value is not an object"));
    };

    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let mut result = ParsedSource::default();

    match kind.as_str() {
        "FeatureCollection" => {
            if let Some(crs_value) = root.get("crs") {
                match crs::parse(crs_value) {
                    Ok(crs) => result.crs = crs,
                    Err(e) => {
                        warn!(file = file, error = %e, "Unrecognised crs member");
                        result.unknown_crs = Some(match &e {
                            GeofeedError::UnknownCrs(name) => name.clone(),
                            other => other.to_string(),
                        });
                        result.errors.push(e);
                    }
                }
            }

            let features = match root.remove("features") {
                Some(Value::Array(features)) => features,
                Some(_) => {
                    return Err(GeofeedError::parse_error(file, "`features` is not an array"));
                }
                None => Vec::new(),
            };

            result.records.reserve(features.len());
            for (index, value) in features.into_iter().enumerate() {
                let (record, error) = convert_feature(value, index, file);
                if let Some(record) = record {
                    result.records.push(record);
                }
                if let Some(error) = error {
                    result.errors.push(error);
                }
            }
        }
        "Feature" => {
            let (record, error) = convert_feature(Value::Object(root), 0, file);
            result.records.extend(record);
            result.errors.extend(error);
        }
        other => {
            return Err(GeofeedError::parse_error(
                file,
                format!("expected a FeatureCollection, found `{}`", other),
            ));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Crs;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
        "features": [
            {"type": "Feature", "id": "a",
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
             "properties": {"APN": "001"}},
            {"type": "Feature",
             "geometry": {"type": "Polygon", "coordinates": [[[0]]]},
             "properties": {"APN": "002"}},
            {"type": "Nope"}
        ]
    }"#;

    #[test]
    fn test_parse_collection() {
        let parsed = parse(COLLECTION, "t.geojson").unwrap();

        assert_eq!(parsed.crs, Crs { epsg: 3857 });
        // La feature "Nope" est rejetée, les deux autres sont gardées
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].id.as_deref(), Some("a"));
        assert!(parsed.records[0].geometry.is_some());
        assert_eq!(parsed.records[1].index, 1);
        assert_eq!(parsed.errors.len(), 2);
    }

    #[test]
    fn test_parse_unknown_crs_is_kept() {
        let text = r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:ESRI::102645"}},
            "features": []}"#;
        let parsed = parse(text, "t.geojson").unwrap();

        assert_eq!(parsed.unknown_crs.as_deref(), Some("urn:ogc:def:crs:ESRI::102645"));
        assert_eq!(parsed.errors.len(), 1);
    }

    #[test]
    fn test_parse_single_feature() {
        let text = r#"{"type":"Feature","geometry":null,"properties":{"APN":"9"}}"#;
        let parsed = parse(text, "t.geojson").unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.crs, Crs::WGS84);
    }

    #[test]
    fn test_parse_rejects_geometry_document() {
        let text = r#"{"type":"Point","coordinates":[0,0]}"#;
        assert!(matches!(
            parse(text, "t.geojson"),
            Err(GeofeedError::ParseError { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse("{not json", "t.geojson").is_err());
        assert!(parse("[1, 2]", "t.geojson").is_err());
    }
}
