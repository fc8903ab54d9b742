//! Export des parcelles et bâtiments vers Parquet

pub mod area;
pub mod dedup;
pub mod exporter;
pub mod parquet;
pub mod pipeline;
pub mod precision;
pub mod record;
pub mod settings;

pub use area::{AreaBounds, AreaModel};
pub use exporter::{BuildingExporter, ExportOptions, ParcelExporter, SourceContext};
pub use pipeline::{ExportRequest, Exporter};
pub use record::{BuildingRecord, DropReason, Outcome, ParcelRecord};
pub use settings::{ExportSettings, ParquetCompression};
