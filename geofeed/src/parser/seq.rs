//! Parser pour les séquences de features (une feature GeoJSON par ligne)
//!
//! Couvre GeoJSONL / NDJSON et GeoJSONSeq (RFC 8142, préfixe RS `0x1E`).

use memchr::memchr_iter;
use serde_json::Value;

use super::{convert_feature, ParsedSource};
use crate::GeofeedError;

const RECORD_SEPARATOR: u8 = 0x1E;

/// Parse une séquence ligne à ligne.
///
/// Les lignes vides sont ignorées ; une ligne illisible produit une erreur non
/// fatale et la lecture continue. L'index d'un enregistrement est son rang
/// parmi les lignes non vides.
pub fn parse(text: &str, file: &str) -> ParsedSource {
    let mut result = ParsedSource::default();
    let mut index = 0usize;

    for line in lines(text.as_bytes()) {
        let line = trim_line(line);
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(value) => {
                let (record, error) = convert_feature(value, index, file);
                if let Some(record) = record {
                    result.records.push(record);
                }
                if let Some(error) = error {
                    result.errors.push(error);
                }
            }
            Err(e) => {
                result
                    .errors
                    .push(GeofeedError::invalid_feature(file, index, e.to_string()));
            }
        }
        index += 1;
    }

    result
}

/// Découpe un buffer en lignes (recherche SIMD des `\n`)
fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut start = 0usize;
    memchr_iter(b'\n', data)
        .chain(std::iter::once(data.len()))
        .map(move |end| {
            let line = &data[start.min(end)..end];
            start = end + 1;
            line
        })
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_prefix(&[RECORD_SEPARATOR]).unwrap_or(line);
    line.trim_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        let data = b"a\nbb\n\nccc";
        let collected: Vec<&[u8]> = lines(data).collect();
        let expected: Vec<&[u8]> = vec![&b"a"[..], &b"bb"[..], &b""[..], &b"ccc"[..]];
        assert_eq!(collected, expected);

        let trailing = b"a\n";
        let collected: Vec<&[u8]> = lines(trailing).collect();
        let expected: Vec<&[u8]> = vec![&b"a"[..], &b""[..]];
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_parse_sequence() {
        let text = concat!(
            "{\"type\":\"Feature\",\"geometry\":{\"type\":\"Point\",\"coordinates\":[-118.1,34.1]},\"properties\":{\"confidence\":0.9}}\r\n",
            "\n",
            "\u{1e}{\"type\":\"Feature\",\"geometry\":null,\"properties\":{\"release\":2}}\n",
            "{broken\n",
            "{\"type\":\"Feature\",\"geometry\":null,\"properties\":{}}\n",
        );

        let parsed = parse(text, "t.geojsonl");
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.records[0].index, 0);
        assert_eq!(parsed.records[1].index, 1);
        // La ligne cassée consomme l'index 2
        assert_eq!(parsed.records[2].index, 3);
        assert!(parsed.records[0].geometry.is_some());
    }

    #[test]
    fn test_parse_empty() {
        let parsed = parse("\n\n", "t.geojsonl");
        assert!(parsed.records.is_empty());
        assert!(parsed.errors.is_empty());
    }
}
