use image::GrayImage;
use logging_timer::time;

use crate::{
    image_utils::count_pixels_in_disk,
    types::{BubbleFeature, Circle},
};

/// Counts black and white pixels of `binary` inside each circle's disk.
///
/// Features come back in the same order as `circles`. Disks that reach past
/// the image edge are only counted over their in-bounds part.
#[time]
pub fn extract_bubble_features(binary: &GrayImage, circles: &[Circle]) -> Vec<BubbleFeature> {
    circles
        .iter()
        .map(|circle| {
            let (black_count, white_count) =
                count_pixels_in_disk(binary, circle.x, circle.y, circle.r);
            BubbleFeature {
                x: circle.x,
                y: circle.y,
                r: circle.r,
                black_count,
                white_count,
            }
        })
        .collect()
}
