//! Comtés de Californie (codes FIPS 06xxx)

use std::path::Path;

/// Comté de Californie identifié par son code FIPS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct County {
    /// Code FIPS à 5 chiffres (état + comté), ex: "06037"
    pub fips: &'static str,

    /// Nom du comté, ex: "Los Angeles"
    pub name: &'static str,
}

/// Table des 58 comtés
const COUNTIES: &[(&str, &str)] = &[
    ("06001", "Alameda"),
    ("06003", "Alpine"),
    ("06005", "Amador"),
    ("06007", "Butte"),
    ("06009", "Calaveras"),
    ("06011", "Colusa"),
    ("06013", "Contra Costa"),
    ("06015", "Del Norte"),
    ("06017", "El Dorado"),
    ("06019", "Fresno"),
    ("06021", "Glenn"),
    ("06023", "Humboldt"),
    ("06025", "Imperial"),
    ("06027", "Inyo"),
    ("06029", "Kern"),
    ("06031", "Kings"),
    ("06033", "Lake"),
    ("06035", "Lassen"),
    ("06037", "Los Angeles"),
    ("06039", "Madera"),
    ("06041", "Marin"),
    ("06043", "Mariposa"),
    ("06045", "Mendocino"),
    ("06047", "Merced"),
    ("06049", "Modoc"),
    ("06051", "Mono"),
    ("06053", "Monterey"),
    ("06055", "Napa"),
    ("06057", "Nevada"),
    ("06059", "Orange"),
    ("06061", "Placer"),
    ("06063", "Plumas"),
    ("06065", "Riverside"),
    ("06067", "Sacramento"),
    ("06069", "San Benito"),
    ("06071", "San Bernardino"),
    ("06073", "San Diego"),
    ("06075", "San Francisco"),
    ("06077", "San Joaquin"),
    ("06079", "San Luis Obispo"),
    ("06081", "San Mateo"),
    ("06083", "Santa Barbara"),
    ("06085", "Santa Clara"),
    ("06087", "Santa Cruz"),
    ("06089", "Shasta"),
    ("06091", "Sierra"),
    ("06093", "Siskiyou"),
    ("06095", "Solano"),
    ("06097", "Sonoma"),
    ("06099", "Stanislaus"),
    ("06101", "Sutter"),
    ("06103", "Tehama"),
    ("06105", "Trinity"),
    ("06107", "Tulare"),
    ("06109", "Tuolumne"),
    ("06111", "Ventura"),
    ("06113", "Yolo"),
    ("06115", "Yuba"),
];

/// Recherche un comté par code FIPS (5 chiffres, ou 3 chiffres de comté)
pub fn by_fips(code: &str) -> Option<County> {
    let code = code.trim();
    let full = match code.len() {
        5 => code.to_string(),
        3 => format!("06{}", code),
        _ => return None,
    };

    COUNTIES
        .iter()
        .find(|(fips, _)| *fips == full)
        .map(|&(fips, name)| County { fips, name })
}

/// Extrait le comté depuis le nom d'un fichier source.
///
/// Cherche une suite de exactement 5 chiffres commençant par "06" (ex:
/// `parcels_06037.geojson`, `06075-sf.geojsonl.bz2`).
pub fn county_from_path(path: &Path) -> Option<County> {
    let name = path.file_name()?.to_str()?;
    let bytes = name.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        if i - start == 5 && name[start..i].starts_with("06") {
            if let Some(county) = by_fips(&name[start..i]) {
                return Some(county);
            }
        }
    }

    None
}
