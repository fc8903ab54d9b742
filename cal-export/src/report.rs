//! Rapport d'export avec graceful degradation
//!
//! Ce module fournit des structures pour collecter et afficher
//! les résultats d'un export : enregistrements émis, abandons par raison,
//! sources en échec et erreurs non fatales.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::export::parquet::BBox;
use crate::export::record::DropReason;

/// Nombre maximal d'erreurs détaillées conservées
pub const MAX_REPORTED_ERRORS: usize = 1000;

/// Statut global de l'export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStatus {
    /// Export réussi sans erreur
    Success,
    /// Export réussi avec des sources en échec
    PartialSuccess,
    /// Export échoué
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Erreur: source ignorée
    Error,
    /// Warning: problème dans une source, lecture poursuivie
    Warning,
}

/// Erreur d'export avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct ExportError {
    /// Niveau de sévérité
    pub level: ErrorLevel,
    /// Fichier source (optionnel)
    pub source: Option<String>,
    /// Message d'erreur
    pub message: String,
}

/// Statistiques par fichier source
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStats {
    pub path: String,
    /// Checksum blake3 du fichier
    pub checksum: Option<String>,
    pub format: String,
    pub epsg: u32,
    pub county: Option<String>,
    pub records_read: usize,
    pub emitted: usize,
    pub dropped: usize,
    /// Erreurs non fatales de lecture
    pub read_errors: usize,
}

/// Rapport complet d'export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Jeu de données (`parcels`, `buildings`)
    pub dataset: String,
    /// Fichier produit
    pub output: String,
    /// Horodatage estampillé sur les enregistrements (RFC 3339)
    pub export_timestamp: String,
    /// Durée de l'export
    pub duration_secs: f64,
    /// Statut global
    pub status: ExportStatus,

    // Compteurs globaux
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub records_read: usize,
    pub records_emitted: usize,
    pub records_dropped: usize,

    /// Abandons par raison
    pub drops: BTreeMap<String, usize>,
    /// Géométries invalides par règle violée
    pub invalid_geometries: BTreeMap<String, usize>,

    /// Détail par source
    pub sources: Vec<SourceStats>,

    /// Emprise des géométries émises
    pub bbox: Option<BBox>,

    /// Erreurs (liste tronquée à `MAX_REPORTED_ERRORS`)
    pub errors: Vec<ExportError>,
    /// Nombre total d'erreurs
    pub errors_total: usize,
}

impl ExportReport {
    /// Crée un nouveau rapport
    pub fn new(dataset: &str, output: &Path, export_timestamp: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            output: output.display().to_string(),
            export_timestamp: export_timestamp.to_string(),
            duration_secs: 0.0,
            status: ExportStatus::Success,
            sources_processed: 0,
            sources_failed: 0,
            records_read: 0,
            records_emitted: 0,
            records_dropped: 0,
            drops: BTreeMap::new(),
            invalid_geometries: BTreeMap::new(),
            sources: Vec::new(),
            bbox: None,
            errors: Vec::new(),
            errors_total: 0,
        }
    }

    /// Enregistre un enregistrement émis
    pub fn record_emitted(&mut self) {
        self.records_emitted += 1;
    }

    /// Enregistre un enregistrement abandonné
    pub fn record_drop(&mut self, reason: DropReason) {
        self.records_dropped += 1;
        *self.drops.entry(reason.as_str().to_string()).or_default() += 1;
        if let DropReason::InvalidGeometry(rule) = reason {
            *self
                .invalid_geometries
                .entry(rule.as_str().to_string())
                .or_default() += 1;
        }
    }

    /// Enregistre une source traitée
    pub fn record_source(&mut self, stats: SourceStats) {
        self.sources_processed += 1;
        self.records_read += stats.records_read;
        self.sources.push(stats);
    }

    /// Enregistre une source en échec
    pub fn record_source_failure(&mut self, source: &str, message: &str) {
        self.sources_processed += 1;
        self.sources_failed += 1;
        self.push_error(ExportError {
            level: ErrorLevel::Error,
            source: Some(source.to_string()),
            message: message.to_string(),
        });
    }

    /// Enregistre un problème non fatal dans une source
    pub fn record_warning(&mut self, source: &str, message: &str) {
        self.push_error(ExportError {
            level: ErrorLevel::Warning,
            source: Some(source.to_string()),
            message: message.to_string(),
        });
    }

    fn push_error(&mut self, error: ExportError) {
        self.errors_total += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(error);
        }
    }

    /// Définit la durée de l'export
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final basé sur les erreurs
    pub fn finalize(&mut self) {
        let all_failed = self.sources_processed > 0 && self.sources_failed == self.sources_processed;

        self.status = if all_failed || self.sources_processed == 0 {
            ExportStatus::Failed
        } else if self.sources_failed > 0 {
            ExportStatus::PartialSuccess
        } else {
            ExportStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("EXPORT REPORT - {}", self.dataset);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Output: {}", self.output);
        println!("Export timestamp: {}", self.export_timestamp);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Sources: {} processed, {} failed",
            self.sources_processed, self.sources_failed
        );
        println!(
            "Records: {} read, {} emitted, {} dropped",
            self.records_read, self.records_emitted, self.records_dropped
        );
        if let Some(bbox) = &self.bbox {
            println!(
                "BBox: [{:.6}, {:.6}, {:.6}, {:.6}]",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            );
        }

        if !self.drops.is_empty() {
            println!("\n--- DROPS ---");
            for (reason, count) in &self.drops {
                println!("  {}: {}", reason, count);
            }
            for (rule, count) in &self.invalid_geometries {
                println!("    {}: {}", rule, count);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors_total);
            for e in self.errors.iter().take(20) {
                let location = e.source.as_deref().map(|s| format!("[{}]", s)).unwrap_or_default();
                println!("  {:?} {} {}", e.level, location, e.message);
            }
            if self.errors_total > 20 {
                println!("  ... and {} more", self.errors_total - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write report {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} emitted, {} dropped, {} sources failed",
            self.dataset, self.records_emitted, self.records_dropped, self.sources_failed
        )
    }
}
