//! Lecture du membre `crs` (GeoJSON 2008, encore produit par beaucoup d'outils)

use serde_json::Value;

use crate::types::Crs;
use crate::GeofeedError;

/// Parse un membre `crs` GeoJSON.
///
/// Formes reconnues :
/// - `{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::3857"}}`
/// - `{"type":"name","properties":{"name":"EPSG:2229"}}`
/// - `{"type":"EPSG","properties":{"code":3310}}`
/// - `urn:ogc:def:crs:OGC:1.3:CRS84` (équivalent à EPSG:4326 en ordre lon/lat)
pub fn parse(value: &Value) -> Result<Crs, GeofeedError> {
    if value.is_null() {
        return Ok(Crs::WGS84);
    }

    let properties = value.get("properties");

    if let Some(code) = properties.and_then(|p| p.get("code")).and_then(Value::as_u64) {
        return u32::try_from(code)
            .map(|epsg| Crs { epsg })
            .map_err(|_| GeofeedError::UnknownCrs(code.to_string()));
    }

    let name = properties
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| GeofeedError::UnknownCrs(value.to_string()))?;

    parse_name(name).ok_or_else(|| GeofeedError::UnknownCrs(name.to_string()))
}

/// Parse un nom de CRS (`EPSG:n`, URN OGC, CRS84)
pub fn parse_name(name: &str) -> Option<Crs> {
    let name = name.trim();
    let upper = name.to_ascii_uppercase();

    if upper.ends_with("CRS84") || upper.ends_with("CRS:84") {
        return Some(Crs::WGS84);
    }

    // "EPSG:3857", "urn:ogc:def:crs:EPSG::3857", "urn:ogc:def:crs:EPSG:6.6:3857"
    let pos = upper.find("EPSG:")?;
    let code = upper[pos + 5..].rsplit(':').next()?;
    code.trim().parse::<u32>().ok().map(|epsg| Crs { epsg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_name() {
        assert_eq!(parse_name("EPSG:2229"), Some(Crs { epsg: 2229 }));
        assert_eq!(parse_name("urn:ogc:def:crs:EPSG::3857"), Some(Crs { epsg: 3857 }));
        assert_eq!(parse_name("urn:ogc:def:crs:EPSG:6.6:3310"), Some(Crs { epsg: 3310 }));
        assert_eq!(parse_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::WGS84));
        assert_eq!(parse_name("LOCAL_CS"), None);
    }

    #[test]
    fn test_parse_member() {
        let named = json!({"type": "name", "properties": {"name": "EPSG:26911"}});
        assert_eq!(parse(&named).unwrap(), Crs { epsg: 26911 });

        let coded = json!({"type": "EPSG", "properties": {"code": 3310}});
        assert_eq!(parse(&coded).unwrap(), Crs { epsg: 3310 });

        assert_eq!(parse(&Value::Null).unwrap(), Crs::WGS84);
        assert!(parse(&json!({"type": "link"})).is_err());
    }
}
