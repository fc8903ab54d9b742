//! Lecture des fichiers sources (décompression `.bz2` et décodage du texte)

use bzip2::read::BzDecoder;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::types::SourceFormat;
use crate::GeofeedError;

/// Contenu brut d'un fichier source, décompressé
#[derive(Debug)]
pub struct SourceFile {
    /// Octets décompressés
    pub data: Vec<u8>,

    /// Format déduit de l'extension (`None` si l'extension est inconnue)
    pub format: Option<SourceFormat>,

    /// Le fichier était compressé en bzip2
    pub compressed: bool,
}

/// Charge un fichier source en mémoire.
///
/// Les fichiers `.bz2` sont décompressés à la volée ; le format est déduit de
/// l'extension qui précède (`parcels.geojson.bz2` → FeatureCollection).
pub fn load(path: &Path) -> Result<SourceFile, GeofeedError> {
    let file = std::fs::File::open(path)?;
    let compressed = has_extension(path, "bz2");

    let mut data = Vec::new();
    if compressed {
        BzDecoder::new(file).read_to_end(&mut data)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut data)?;
    }

    Ok(SourceFile {
        data,
        format: format_from_path(path),
        compressed,
    })
}

/// Déduit le format depuis le nom de fichier, en ignorant un suffixe `.bz2`
pub fn format_from_path(path: &Path) -> Option<SourceFormat> {
    let name = path.file_name()?.to_str()?;
    let name = strip_ascii_suffix(name, ".bz2").unwrap_or(name);
    let ext = name.rsplit_once('.')?.1;
    SourceFormat::from_extension(ext)
}

/// Vérifie si un chemin est une source lisible (extension connue, `.bz2` compris)
pub fn is_source_path(path: &Path) -> bool {
    format_from_path(path).is_some()
}

/// Décode le texte d'une source.
///
/// UTF-8 est validé en SIMD ; en cas d'échec, le contenu est décodé avec
/// `fallback` (Windows-1252 par défaut, fréquent dans les exports DBF).
pub fn decode<'a>(data: &'a [u8], fallback: &'static Encoding, file: &str) -> Cow<'a, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    match simdutf8::basic::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            warn!(file = file, encoding = fallback.name(), "Source is not valid UTF-8, decoding with fallback");
            let (decoded, _, _) = fallback.decode(data);
            decoded
        }
    }
}

/// Résout un label d'encodage (`"utf-8"`, `"windows-1252"`, `"latin1"`...)
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, GeofeedError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| GeofeedError::UnsupportedEncoding(label.to_string()))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}

fn strip_ascii_suffix<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(suffix) {
        Some(&name[..split])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let result = load(Path::new("nonexistent.geojson"));
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            format_from_path(Path::new("parcels_06037.geojson")),
            Some(SourceFormat::FeatureCollection)
        );
        assert_eq!(
            format_from_path(Path::new("California.geojsonl.bz2")),
            Some(SourceFormat::Sequence)
        );
        assert_eq!(
            format_from_path(Path::new("/data/tiles/part-0001.NDJSON")),
            Some(SourceFormat::Sequence)
        );
        assert_eq!(format_from_path(Path::new("readme.txt")), None);
        assert_eq!(format_from_path(Path::new("archive.bz2")), None);
    }

    #[test]
    fn test_decode_utf8_and_fallback() {
        let utf8 = "{\"city\":\"San José\"}".as_bytes();
        assert_eq!(decode(utf8, encoding_rs::WINDOWS_1252, "t"), "{\"city\":\"San José\"}");

        // "San Jos\xE9" en Windows-1252
        let latin = b"San Jos\xE9";
        assert_eq!(decode(latin, encoding_rs::WINDOWS_1252, "t"), "San José");
    }

    #[test]
    fn test_decode_strips_bom() {
        let data = b"\xEF\xBB\xBF{}";
        assert_eq!(decode(data, encoding_rs::WINDOWS_1252, "t"), "{}");
    }

    #[test]
    fn test_encoding_for_label() {
        assert_eq!(encoding_for_label("latin1").unwrap(), encoding_rs::WINDOWS_1252);
        assert!(encoding_for_label("klingon").is_err());
    }
}
