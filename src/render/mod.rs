pub mod colorbar;
pub mod colormap;
pub mod overlay;

pub use colorbar::colorbar;
pub use colormap::Colormap;
pub use overlay::{
    grayscale, overlay_field, surface_relief, SurfaceRelief, DEFAULT_ALPHA,
    SURFACE_Z_EXAGGERATION,
};

use crate::projection::GeoBounds;
use image::RgbaImage;

/// The output of a map render: the composed image, its colorbar, and the
/// value range the colormap was normalized over.
pub struct MapRender {
    /// Basemap with the colormapped field blended on top.
    pub image: RgbaImage,
    /// Matching horizontal colorbar strip.
    pub colorbar: RgbaImage,
    /// Geographic extent of the image.
    pub bounds: GeoBounds,
    /// Low end of the color scale (field minimum).
    pub vmin: f64,
    /// High end of the color scale (field maximum).
    pub vmax: f64,
}
