//! Types d'erreurs pour le crate geofeed

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'une source
#[derive(Debug, Error)]
pub enum GeofeedError {
    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source illisible ou format non reconnu
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Erreur de parsing d'un fichier
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// Feature illisible dans une source (non fatale)
    #[error("Invalid feature #{index} in {file}: {reason}")]
    InvalidFeature {
        file: String,
        index: usize,
        reason: String,
    },

    /// Encodage non supporté
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// CRS non reconnu dans le membre `crs`
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),
}

impl GeofeedError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de feature invalide
    pub fn invalid_feature(file: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidFeature {
            file: file.into(),
            index,
            reason: reason.into(),
        }
    }
}
