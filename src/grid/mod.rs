pub mod error;
pub mod field;
pub mod loader;
pub mod series;

pub use error::GridDataError;
pub use field::{GridAxis, GriddedField};
pub use loader::{GridFetcher, GridSource};
pub use series::{GridMetadata, GridSeries};
