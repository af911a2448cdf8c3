pub mod aggregate;
pub mod archive;
pub mod error;

pub use aggregate::{AnnualExceedances, DailyMaxSeries, TrendArchive};
pub use archive::{ArchiveSource, TrendFetcher, STAT_COLUMN, STAT_LABEL};
pub use error::TrendError;
