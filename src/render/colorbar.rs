//! Horizontal colorbar strips for rendered maps.

use crate::render::colormap::Colormap;
use image::{Rgba, RgbaImage};

/// Renders a horizontal gradient strip for a colormap. Tick labels are left
/// to the presentation layer; the matching value range travels alongside in
/// [`crate::render::MapRender`].
pub fn colorbar(colormap: Colormap, width: u32, height: u32) -> RgbaImage {
    let width = width.max(2);
    let height = height.max(1);
    let mut img = RgbaImage::new(width, height);
    for px in 0..width {
        let t = px as f64 / (width - 1) as f64;
        let [r, g, b] = colormap.sample(t);
        for py in 0..height {
            img.put_pixel(px, py, Rgba([r, g, b, 255]));
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_spans_the_colormap() {
        let bar = colorbar(Colormap::Viridis, 256, 12);
        assert_eq!(bar.dimensions(), (256, 12));
        assert_eq!(bar.get_pixel(0, 0).0[..3], Colormap::Viridis.sample(0.0));
        assert_eq!(bar.get_pixel(255, 11).0[..3], Colormap::Viridis.sample(1.0));
    }

    #[test]
    fn degenerate_sizes_are_clamped() {
        let bar = colorbar(Colormap::Blues, 0, 0);
        assert_eq!(bar.dimensions(), (2, 1));
    }
}
