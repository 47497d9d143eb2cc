//! Pixel-level primitives: cropping, corner masking, PSNR scoring and the
//! flood-fill probe the layout detectors are built on.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::geometry::Rect;

/// Normalised diamond size used when corner-masking icons; values below 1
/// grow the corner masks and shrink the diamond.
pub const DIAMOND_RATIO: f32 = 0.9;

/// Extract a sub-image, or `None` when the rectangle leaves the image.
pub fn crop(image: &RgbImage, rect: Rect) -> Option<RgbImage> {
    if rect.width <= 0 || rect.height <= 0 || !rect.within_image(image.width(), image.height()) {
        return None;
    }

    Some(
        imageops::crop_imm(
            image,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image(),
    )
}

/// Resize with cubic interpolation.
pub fn resize_to(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(image, width, height, FilterType::CatmullRom)
}

/// Mask out the 4 corners of an image to isolate the diamond-shaped icon
/// art, so catalog references and screen crops become visually comparable.
pub fn make_comparable(input: &RgbImage, size: f32) -> RgbImage {
    let mut output = input.clone();
    let (width, height) = output.dimensions();

    let reach = 1.0 - size / 2.0;
    let half_x = width as f32 * reach;
    let half_y = height as f32 * reach;
    if half_x <= 0.0 || half_y <= 0.0 {
        return output;
    }

    let white = Rgb([255u8, 255, 255]);
    let max_x = width as f32 - 1.0;
    let max_y = height as f32 - 1.0;

    for y in 0..height {
        for x in 0..width {
            let fx = x as f32;
            let fy = y as f32;

            let top_left = fx / half_x + fy / half_y < 1.0;
            let top_right = (max_x - fx) / half_x + fy / half_y < 1.0;
            let bottom_left = fx / half_x + (max_y - fy) / half_y < 1.0;
            let bottom_right = (max_x - fx) / half_x + (max_y - fy) / half_y < 1.0;

            if top_left || top_right || bottom_left || bottom_right {
                output.put_pixel(x, y, white);
            }
        }
    }

    output
}

/// Peak signal-to-noise ratio between two equally-sized images, in dB.
/// Higher means more alike; identical images score infinity.
pub fn psnr(a: &RgbImage, b: &RgbImage) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions());

    let mut sum = 0.0f64;
    for (pa, pb) in a.as_raw().iter().zip(b.as_raw()) {
        let diff = *pa as f64 - *pb as f64;
        sum += diff * diff;
    }

    let count = a.as_raw().len().min(b.as_raw().len());
    if count == 0 {
        return f64::INFINITY;
    }

    let mse = sum / count as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * ((255.0 * 255.0) / mse).log10()
    }
}

/// Region-grow from `seed`, constrained to `region`, accepting 4-connected
/// neighbours whose channels all sit within `tolerance` of the pixel they
/// were reached from. Returns the bounding box of the filled component, or
/// `None` when the seed lies outside the usable region.
pub fn flood_fill_bounds(
    image: &RgbImage,
    seed: (i32, i32),
    tolerance: u8,
    region: Rect,
) -> Option<Rect> {
    let bounds = region.intersection(&Rect::new(0, 0, image.width() as i32, image.height() as i32))?;
    if !bounds.contains(seed.0, seed.1) {
        return None;
    }

    let stride = bounds.width as usize;
    let mut visited = vec![false; stride * bounds.height as usize];
    let index = |x: i32, y: i32| (y - bounds.y) as usize * stride + (x - bounds.x) as usize;

    let mut stack = vec![seed];
    visited[index(seed.0, seed.1)] = true;

    let (mut min_x, mut min_y) = seed;
    let (mut max_x, mut max_y) = seed;

    while let Some((x, y)) = stack.pop() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        let here = image.get_pixel(x as u32, y as u32);
        for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            if !bounds.contains(nx, ny) || visited[index(nx, ny)] {
                continue;
            }

            let there = image.get_pixel(nx as u32, ny as u32);
            let close = here
                .0
                .iter()
                .zip(&there.0)
                .all(|(a, b)| a.abs_diff(*b) <= tolerance);
            if close {
                visited[index(nx, ny)] = true;
                stack.push((nx, ny));
            }
        }
    }

    Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn crop_rejects_out_of_bounds_rects() {
        let image = solid(100, 100, [10, 10, 10]);
        assert!(crop(&image, Rect::new(90, 90, 20, 20)).is_none());
        assert!(crop(&image, Rect::new(-5, 0, 10, 10)).is_none());

        let sub = crop(&image, Rect::new(10, 20, 30, 40)).unwrap();
        assert_eq!(sub.dimensions(), (30, 40));
    }

    #[test]
    fn make_comparable_is_idempotent() {
        let mut image = solid(64, 64, [80, 40, 120]);
        image.put_pixel(0, 0, Rgb([1, 2, 3]));
        image.put_pixel(63, 63, Rgb([4, 5, 6]));

        let once = make_comparable(&image, DIAMOND_RATIO);
        let twice = make_comparable(&once, DIAMOND_RATIO);
        assert_eq!(once.as_raw(), twice.as_raw());

        // the corner pixels are masked, the middle is untouched
        assert_eq!(once.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(once.get_pixel(63, 63), &Rgb([255, 255, 255]));
        assert_eq!(once.get_pixel(32, 32), &Rgb([80, 40, 120]));
    }

    #[test]
    fn psnr_ranks_similarity() {
        let a = solid(16, 16, [100, 100, 100]);
        let near = solid(16, 16, [102, 100, 99]);
        let far = solid(16, 16, [10, 200, 100]);

        assert_eq!(psnr(&a, &a), f64::INFINITY);
        assert!(psnr(&a, &near) > psnr(&a, &far));
    }

    #[test]
    fn flood_fill_finds_blob_bounds() {
        let mut image = solid(50, 50, [255, 255, 255]);
        for y in 10..30 {
            for x in 5..25 {
                image.put_pixel(x, y, Rgb([40, 40, 40]));
            }
        }

        let region = Rect::new(0, 0, 50, 50);
        let bounds = flood_fill_bounds(&image, (10, 15), 10, region).unwrap();
        assert_eq!(bounds, Rect::new(5, 10, 20, 20));
    }

    #[test]
    fn flood_fill_respects_region_mask() {
        let image = solid(50, 50, [40, 40, 40]);

        let region = Rect::new(10, 10, 20, 20);
        let bounds = flood_fill_bounds(&image, (15, 15), 10, region).unwrap();
        assert_eq!(bounds, region);

        // seeds outside the masked region probe nothing
        assert!(flood_fill_bounds(&image, (5, 5), 10, region).is_none());
    }
}
