use image::{GrayImage, Luma, Rgb};
use imageproc::{
    contrast::{otsu_level, threshold},
    filter::gaussian_blur_f32,
};
use log::warn;
use logging_timer::time;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Gaussian sigma matching a 5x5 smoothing kernel.
pub const SMOOTHING_SIGMA: f32 = 1.1;

/// The three derived rasters every downstream stage reads from.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub gray: GrayImage,
    pub smoothed: GrayImage,
    pub binary: GrayImage,
}

/// Decodes an encoded raster and derives its grayscale, smoothed, and
/// binarized versions. Returns `None` if the bytes are empty or do not
/// decode to an image.
#[time]
pub fn preprocess_image(bytes: &[u8]) -> Option<PreprocessedImage> {
    if bytes.is_empty() {
        return None;
    }

    let gray = match image::load_from_memory(bytes) {
        Ok(img) => img.into_luma8(),
        Err(e) => {
            warn!("unable to decode image: {}", e);
            return None;
        }
    };

    if gray.width() == 0 || gray.height() == 0 {
        return None;
    }

    Some(preprocess_gray(gray))
}

/// Derives the smoothed and binarized rasters from a grayscale image.
pub fn preprocess_gray(gray: GrayImage) -> PreprocessedImage {
    let smoothed = gaussian_blur_f32(&gray, SMOOTHING_SIGMA);
    let binary = threshold(&smoothed, otsu_level(&smoothed));
    PreprocessedImage {
        gray,
        smoothed,
        binary,
    }
}

/// Counts `(black, white)` pixels of a binary image strictly inside the disk
/// of radius `r` centered at `(cx, cy)`. Parts of the disk outside the image
/// are not counted.
pub fn count_pixels_in_disk(img: &GrayImage, cx: u32, cy: u32, r: u32) -> (u32, u32) {
    let (width, height) = img.dimensions();
    let r = r as i64;
    let (cx, cy) = (cx as i64, cy as i64);
    let mut black = 0;
    let mut white = 0;

    for y in (cy - r).max(0)..=(cy + r).min(height as i64 - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(width as i64 - 1) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy >= r * r {
                continue;
            }

            let pixel = img.get_pixel(x as u32, y as u32);
            if *pixel == BLACK {
                black += 1;
            } else if *pixel == WHITE {
                white += 1;
            }
        }
    }

    (black, white)
}

#[cfg(test)]
mod tests {
    use imageproc::drawing::draw_filled_circle_mut;

    use super::*;
    use crate::test_utils::encode_png;

    #[test]
    fn test_preprocess_rejects_empty_and_garbage() {
        assert!(preprocess_image(&[]).is_none());
        assert!(preprocess_image(b"definitely not an image").is_none());
    }

    #[test]
    fn test_preprocess_keeps_dimensions_and_binarizes() {
        let mut img = GrayImage::from_pixel(60, 40, WHITE);
        draw_filled_circle_mut(&mut img, (30, 20), 10, BLACK);

        let preprocessed = preprocess_image(&encode_png(&img)).unwrap();
        assert_eq!(preprocessed.gray.dimensions(), (60, 40));
        assert_eq!(preprocessed.smoothed.dimensions(), (60, 40));
        assert_eq!(preprocessed.binary.dimensions(), (60, 40));
        assert!(preprocessed
            .binary
            .pixels()
            .all(|p| *p == BLACK || *p == WHITE));
        assert_eq!(*preprocessed.binary.get_pixel(30, 20), BLACK);
        assert_eq!(*preprocessed.binary.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn test_count_pixels_in_disk() {
        let img = GrayImage::from_pixel(20, 20, WHITE);
        let (black, white) = count_pixels_in_disk(&img, 10, 10, 2);
        // (dx, dy) with dx^2 + dy^2 < 4: the center, its 4 neighbours at
        // distance 1, and the 4 diagonals at distance sqrt(2).
        assert_eq!((black, white), (0, 9));

        let img = GrayImage::from_pixel(20, 20, BLACK);
        assert_eq!(count_pixels_in_disk(&img, 10, 10, 2), (9, 0));
    }

    #[test]
    fn test_count_pixels_in_disk_clips_to_image() {
        let img = GrayImage::from_pixel(20, 20, WHITE);
        let (_, inside) = count_pixels_in_disk(&img, 10, 10, 3);
        let (_, corner) = count_pixels_in_disk(&img, 0, 0, 3);
        assert!(corner < inside);
        assert!(corner > 0);
    }
}
