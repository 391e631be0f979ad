//! Image to occupancy grid conversion.
//!
//! Follows the ROS map_server conventions:
//! - PGM uses: 254/255=free (white), 0=occupied (black), 205=unknown (gray)
//! - Grid uses: 0=free, 100=occupied, -1=unknown
//! - The image's top row becomes the grid's last row (Y-axis flip)

use image::DynamicImage;

use super::descriptor::{MapDescriptor, MapMode};
use super::grid::{CELL_FREE, CELL_OCCUPIED, CELL_UNKNOWN, GridArtifact};
use crate::error::RasterizeError;

/// Decode the descriptor's image and convert it to a grid.
pub fn rasterize(descriptor: &MapDescriptor) -> Result<GridArtifact, RasterizeError> {
    log::info!(
        "Loading map from image \"{}\"",
        descriptor.image_path.display()
    );

    let img = image::open(&descriptor.image_path).map_err(|source| RasterizeError::Image {
        path: descriptor.image_path.clone(),
        source,
    })?;

    if img.width() == 0 || img.height() == 0 {
        return Err(RasterizeError::EmptyImage(descriptor.image_path.clone()));
    }

    rasterize_image(&img, descriptor)
}

/// Convert an already decoded image using the descriptor's parameters.
pub fn rasterize_image(
    img: &DynamicImage,
    descriptor: &MapDescriptor,
) -> Result<GridArtifact, RasterizeError> {
    let has_alpha = img.color().has_alpha();
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut cells = vec![CELL_UNKNOWN; width as usize * height as usize];
    for (px, py, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = if has_alpha { a } else { u8::MAX };
        let color_avg = (r as f64 + g as f64 + b as f64) / 3.0;

        // Flip Y: image row 0 is the top of the map
        let gy = (height - 1 - py) as usize;
        cells[gy * width as usize + px as usize] = classify(color_avg, alpha, descriptor);
    }

    GridArtifact::new(
        width,
        height,
        descriptor.resolution,
        descriptor.origin,
        cells,
    )
}

/// Map one pixel to a cell value.
fn classify(color_avg: f64, alpha: u8, descriptor: &MapDescriptor) -> i8 {
    let color_avg = if descriptor.negate {
        255.0 - color_avg
    } else {
        color_avg
    };
    let occ = (255.0 - color_avg) / 255.0;

    if occ > descriptor.occupied_thresh {
        CELL_OCCUPIED
    } else if occ < descriptor.free_thresh {
        CELL_FREE
    } else if descriptor.mode == MapMode::Trinary || alpha == 0 {
        CELL_UNKNOWN
    } else {
        let span = descriptor.occupied_thresh - descriptor.free_thresh;
        if span <= 0.0 {
            return CELL_UNKNOWN;
        }
        let ratio = (occ - descriptor.free_thresh) / span;
        (1.0 + 98.0 * ratio).round().clamp(1.0, 99.0) as i8
    }
}
