use crate::basemap::BasemapError;
use crate::grid::GridDataError;
use crate::indices::SnapshotError;
use crate::trends::TrendError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeatStressError {
    #[error(transparent)]
    GridData(#[from] GridDataError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Basemap(#[from] BasemapError),

    #[error(transparent)]
    Trend(#[from] TrendError),

    #[error("Grid axes are empty; nothing to render")]
    EmptyGrid,

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] anyhow::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] anyhow::Error),
}
