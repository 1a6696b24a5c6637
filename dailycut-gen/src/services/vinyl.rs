//! Vinyl disk transform
//!
//! Turns square-ish album artwork into a vinyl record: centre crop to
//! a square, resize, circular mask with a transparent centre hole at
//! the standard 14% of the outer diameter, PNG output with alpha.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Hole diameter as a ratio of the outer diameter
pub const VINYL_HOLE_RATIO: f64 = 0.14;

/// Transform artwork bytes into a vinyl disk PNG of `disk_size` pixels
pub fn create_vinyl_disk(image_data: &[u8], disk_size: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(image_data).context("failed to decode artwork image")?;

    // Centre crop to a square, then resize to the disk size
    let (width, height) = (img.width(), img.height());
    let side = width.min(height);
    let left = (width - side) / 2;
    let top = (height - side) / 2;
    let square = img.crop_imm(left, top, side, side);
    let resized = square.resize_exact(disk_size, disk_size, image::imageops::FilterType::Lanczos3);

    let masked = apply_vinyl_mask(resized.to_rgba8(), VINYL_HOLE_RATIO);

    let mut out = Vec::new();
    DynamicImage::ImageRgba8(masked)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("failed to encode vinyl disk PNG")?;

    tracing::debug!(disk_size, hole_ratio = VINYL_HOLE_RATIO, "Vinyl disk created");

    Ok(out)
}

/// Zero the alpha of every pixel outside the outer circle or inside
/// the centre hole
fn apply_vinyl_mask(mut img: RgbaImage, hole_ratio: f64) -> RgbaImage {
    let size = img.width();
    let center = (size as f64 - 1.0) / 2.0;
    let outer_radius = size as f64 / 2.0;
    let inner_radius = outer_radius * hole_ratio;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f64 - center;
        let dy = y as f64 - center;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > outer_radius || distance < inner_radius {
            pixel.0[3] = 0;
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_output_is_square_png_of_requested_size() {
        let disk = create_vinyl_disk(&solid_png(300, 200), 128).unwrap();
        let decoded = image::load_from_memory(&disk).unwrap();
        assert_eq!(decoded.width(), 128);
        assert_eq!(decoded.height(), 128);
    }

    #[test]
    fn test_corners_and_hole_are_transparent_face_is_opaque() {
        let size = 200u32;
        let disk = create_vinyl_disk(&solid_png(400, 400), size).unwrap();
        let decoded = image::load_from_memory(&disk).unwrap().to_rgba8();

        // Corners lie outside the outer circle
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
        assert_eq!(decoded.get_pixel(size - 1, size - 1).0[3], 0);

        // Dead centre lies inside the 14% hole
        assert_eq!(decoded.get_pixel(size / 2, size / 2).0[3], 0);

        // A point between hole and rim is part of the disk face:
        // halfway along the radius clears the 14% hole comfortably
        let face = decoded.get_pixel(size / 2 + size / 4, size / 2);
        assert_eq!(face.0[3], 255);
    }

    #[test]
    fn test_hole_ratio_geometry() {
        let size = 400u32;
        let disk = create_vinyl_disk(&solid_png(size, size), size).unwrap();
        let decoded = image::load_from_memory(&disk).unwrap().to_rgba8();

        let center = size / 2;
        let inner_radius = (size as f64 / 2.0) * VINYL_HOLE_RATIO;

        // Just inside the hole boundary: transparent
        let inside = (center as f64 + inner_radius - 2.0) as u32;
        assert_eq!(decoded.get_pixel(inside, center).0[3], 0);

        // Just outside the hole boundary: opaque
        let outside = (center as f64 + inner_radius + 2.0) as u32;
        assert_eq!(decoded.get_pixel(outside, center).0[3], 255);
    }
}
