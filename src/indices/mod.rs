pub mod catalog;
pub mod formulas;
pub mod snapshot;

pub use catalog::{HeatIndexKind, MapLayer};
pub use snapshot::{IndexSnapshot, SnapshotError, SummaryRow};
