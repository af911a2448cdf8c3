mod basemap;
mod error;
mod grid;
mod heatstress;
mod indices;
mod projection;
mod render;
mod trends;
mod utils;

pub use error::HeatStressError;
pub use heatstress::HeatStress;

pub use basemap::{BasemapError, BasemapFetcher, WmsRequest, DEFAULT_ENDPOINT, DEFAULT_SIZE};
pub use grid::{
    GridAxis, GridDataError, GridFetcher, GridMetadata, GridSeries, GridSource, GriddedField,
};
pub use indices::{HeatIndexKind, IndexSnapshot, MapLayer, SnapshotError, SummaryRow};
pub use projection::{GeoBounds, LatLonMesh, RotatedPole};
pub use render::{
    colorbar, grayscale, overlay_field, surface_relief, Colormap, MapRender, SurfaceRelief,
    DEFAULT_ALPHA, SURFACE_Z_EXAGGERATION,
};
pub use trends::{
    AnnualExceedances, ArchiveSource, DailyMaxSeries, TrendArchive, TrendError, TrendFetcher,
    STAT_COLUMN, STAT_LABEL,
};
