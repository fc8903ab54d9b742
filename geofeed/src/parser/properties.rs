//! Lecture tolérante des propriétés (valeurs textuelles ou numériques)

use serde_json::Value;

/// Valeur textuelle d'une propriété, `None` si absente ou vide
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Valeur numérique d'une propriété.
///
/// Les exports de tableurs ou de DBF stockent souvent les nombres en texte :
/// `"0.97"`, `" 2 "`. Les valeurs non finies sont rejetées.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => fast_float::parse::<f64, _>(s.trim()).ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
