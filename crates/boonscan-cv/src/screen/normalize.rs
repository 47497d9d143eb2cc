//! Initial screenshot checks: strip letterboxing, settle on one color
//! format and gate on the two supported aspect ratios. The cheapest and
//! first validity filter in the pipeline.

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

use crate::geometry::Rect;
use crate::utils::image::crop;

/// People crop their screenshots a little, so ratio matching needs slack.
pub const ASPECT_EPSILON: f64 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    /// 16:9, the layout the metadata constants describe.
    Standard,
    /// "21:9" is only a marketing term; the real ratio is 64:27.
    Wide,
}

impl AspectRatio {
    pub fn value(self) -> f64 {
        match self {
            AspectRatio::Standard => 16.0 / 9.0,
            AspectRatio::Wide => 64.0 / 27.0,
        }
    }

    pub fn measure(width: u32, height: u32) -> Option<Self> {
        if height == 0 {
            return None;
        }

        let ratio = width as f64 / height as f64;
        [AspectRatio::Standard, AspectRatio::Wide]
            .into_iter()
            .find(|aspect| (ratio - aspect.value()).abs() < ASPECT_EPSILON)
    }
}

/// Correct a raw screenshot into the supported 16:9 RGB form, or `None`
/// when it cannot be one of the known layouts.
pub fn normalize_screen(original: &DynamicImage) -> Option<RgbImage> {
    // some images arrive with a strange <255 alpha border, remove that
    let mut image = if original.color().has_alpha() {
        let rgba = original.to_rgba8();
        let bound = opaque_bounds(&rgba)?;
        if bound.width < rgba.width() as i32 || bound.height < rgba.height() as i32 {
            log::debug!("found alpha channel letterboxing");
        }
        flatten_cropped(&rgba, bound)
    } else {
        original.to_rgb8()
    };

    // then undo any conventional letterboxing
    let bound = content_bounds(&image)?;
    if bound.width < image.width() as i32 || bound.height < image.height() as i32 {
        log::debug!("found rgb letterboxing");
        image = crop(&image, bound)?;
    }

    match AspectRatio::measure(image.width(), image.height())? {
        AspectRatio::Standard => Some(image),
        AspectRatio::Wide => {
            // the game pads widescreen output with side borders; chop them
            // off symmetrically to get back to 16:9
            let width_for_height =
                (image.height() as f64 * AspectRatio::Standard.value()).round() as i32;
            let sub = Rect::new(
                image.width() as i32 / 2 - width_for_height / 2,
                0,
                width_for_height,
                image.height() as i32,
            );
            crop(&image, sub)
        }
    }
}

/// Bounding box of fully opaque pixels.
fn opaque_bounds(image: &RgbaImage) -> Option<Rect> {
    bounds_where(image.width(), image.height(), |x, y| {
        image.get_pixel(x, y).0[3] == 255
    })
}

/// Bounding box of pixels that aren't pure black.
fn content_bounds(image: &RgbImage) -> Option<Rect> {
    bounds_where(image.width(), image.height(), |x, y| {
        image.get_pixel(x, y).0.iter().any(|channel| *channel > 0)
    })
}

fn bounds_where(width: u32, height: u32, predicate: impl Fn(u32, u32) -> bool) -> Option<Rect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;

    for y in 0..height {
        for x in 0..width {
            if predicate(x, y) {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    any.then(|| {
        Rect::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as i32,
            (max_y - min_y + 1) as i32,
        )
    })
}

fn flatten_cropped(image: &RgbaImage, bound: Rect) -> RgbImage {
    let mut rgb = RgbImage::new(bound.width as u32, bound.height as u32);
    for y in 0..bound.height as u32 {
        for x in 0..bound.width as u32 {
            let pixel = image.get_pixel(bound.x as u32 + x, bound.y as u32 + y);
            rgb.put_pixel(x, y, Rgb([pixel[0], pixel[1], pixel[2]]));
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn accepts_16_9_and_rejects_others() {
        let square = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 1000, Rgb([50, 50, 50])));
        assert!(normalize_screen(&square).is_none());

        let fhd = DynamicImage::ImageRgb8(RgbImage::from_pixel(1920, 1080, Rgb([50, 50, 50])));
        let normalized = normalize_screen(&fhd).unwrap();
        assert_eq!(normalized.dimensions(), (1920, 1080));
    }

    #[test]
    fn wide_screens_are_cropped_back_to_16_9() {
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(2560, 1080, Rgb([50, 50, 50])));
        let normalized = normalize_screen(&wide).unwrap();
        assert_eq!(normalized.dimensions(), (1920, 1080));
    }

    #[test]
    fn rgb_letterboxing_is_stripped() {
        // black bars above and below a 16:9 payload
        let mut image = RgbImage::from_pixel(1920, 1280, Rgb([0, 0, 0]));
        for y in 100..1180 {
            for x in 0..1920 {
                image.put_pixel(x, y, Rgb([60, 60, 60]));
            }
        }

        let normalized = normalize_screen(&DynamicImage::ImageRgb8(image)).unwrap();
        assert_eq!(normalized.dimensions(), (1920, 1080));
    }

    #[test]
    fn alpha_letterboxing_is_stripped() {
        // a translucent border around a 16:9 payload
        let mut image = RgbaImage::from_pixel(1940, 1100, Rgba([30, 30, 30, 200]));
        for y in 10..1090 {
            for x in 10..1930 {
                image.put_pixel(x, y, Rgba([60, 60, 60, 255]));
            }
        }

        let normalized = normalize_screen(&DynamicImage::ImageRgba8(image)).unwrap();
        assert_eq!(normalized.dimensions(), (1920, 1080));
    }
}
