//! Réglages d'exécution (parallélisme, taille des lots, compression)

use parquet::basic::{Compression, ZstdLevel};

/// Taille de lot par défaut (lignes par RecordBatch)
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Compression des fichiers Parquet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParquetCompression {
    /// ZSTD niveau par défaut
    #[default]
    Zstd,
    Snappy,
    Uncompressed,
}

impl std::str::FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zstd" => Ok(ParquetCompression::Zstd),
            "snappy" => Ok(ParquetCompression::Snappy),
            "uncompressed" | "none" | "off" => Ok(ParquetCompression::Uncompressed),
            _ => Err(format!("Invalid compression: {}. Use: zstd, snappy, uncompressed", s)),
        }
    }
}

impl ParquetCompression {
    pub fn to_parquet(self) -> Compression {
        match self {
            Self::Zstd => Compression::ZSTD(ZstdLevel::default()),
            Self::Snappy => Compression::SNAPPY,
            Self::Uncompressed => Compression::UNCOMPRESSED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Snappy => "snappy",
            Self::Uncompressed => "uncompressed",
        }
    }
}

/// Réglages d'un export
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Threads du pool rayon
    pub jobs: usize,
    pub batch_size: usize,
    pub compression: ParquetCompression,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            batch_size: DEFAULT_BATCH_SIZE,
            compression: ParquetCompression::Zstd,
        }
    }
}

impl ExportSettings {
    /// Charge les réglages depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jobs: std::env::var("CAL_EXPORT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.jobs),
            batch_size: std::env::var("CAL_EXPORT_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.batch_size),
            compression: std::env::var("CAL_EXPORT_COMPRESSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compression),
        }
    }

    /// Applique les options de la ligne de commande
    pub fn with_overrides(
        mut self,
        jobs: Option<usize>,
        batch_size: Option<usize>,
        compression: Option<ParquetCompression>,
    ) -> Self {
        if let Some(jobs) = jobs.filter(|&n| n > 0) {
            self.jobs = jobs;
        }
        if let Some(batch_size) = batch_size.filter(|&n| n > 0) {
            self.batch_size = batch_size;
        }
        if let Some(compression) = compression {
            self.compression = compression;
        }
        self
    }
}
