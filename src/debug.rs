use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageResult, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_filled_circle_mut, draw_hollow_circle_mut};
use log::debug;

use crate::{
    image_utils::{BLUE, GREEN, RED},
    interpret::InterpretedSheet,
    types::{AnswerVector, Circle, Row},
};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes annotated copies of an input image next to it, or does nothing if
/// disabled.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<GrayImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: GrayImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    /// Draws on a color copy of the input image and saves it with `label`.
    /// Returns the written path, or `None` when disabled.
    pub fn write(
        &self,
        label: &str,
        draw: impl FnOnce(&mut RgbImage),
    ) -> ImageResult<Option<PathBuf>> {
        let input_image = match &self.input_image {
            Some(image) => image,
            None => return Ok(None),
        };

        let mut canvas = DynamicImage::ImageLuma8(input_image.clone()).into_rgb8();
        draw(&mut canvas);

        let path = debug_image_path(&self.input_path, label);
        canvas.save(&path)?;
        debug!("wrote debug image {}", path.display());
        Ok(Some(path))
    }
}

/// Outlines every detected circle and marks its center.
pub fn draw_circles_debug_image_mut(canvas: &mut RgbImage, circles: &[Circle]) {
    for circle in circles {
        let center = (circle.x as i32, circle.y as i32);
        draw_hollow_circle_mut(canvas, center, circle.r as i32, GREEN);
        draw_cross_mut(canvas, RED, center.0, center.1);
    }
}

/// Fills the bubbles classified as marked.
pub fn draw_marked_bubbles_debug_image_mut(
    canvas: &mut RgbImage,
    rows: &[Row],
    answers: &[AnswerVector],
    options: usize,
) {
    let bubbles = rows.iter().flatten().collect::<Vec<_>>();
    for (question, answer) in answers.iter().enumerate() {
        if let Some(index) = answer.marked_index() {
            if let Some(bubble) = bubbles.get(question * options + index) {
                let circle = bubble.circle();
                draw_filled_circle_mut(
                    canvas,
                    (circle.x as i32, circle.y as i32),
                    (circle.r as i32 / 2).max(1),
                    BLUE,
                );
            }
        }
    }
}

/// Writes the annotated circles image for one interpreted sheet.
pub fn write_sheet_debug_image(
    writer: &ImageDebugWriter,
    sheet: &InterpretedSheet,
    options: usize,
) -> ImageResult<Option<PathBuf>> {
    writer.write("circles", |canvas| {
        draw_circles_debug_image_mut(canvas, &sheet.circles);
        if let Some(answers) = &sheet.answers {
            draw_marked_bubbles_debug_image_mut(canvas, &sheet.rows, answers, options);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BubbleFeature;

    #[test]
    fn test_debug_image_path() {
        assert_eq!(
            debug_image_path(Path::new("/scans/student-7.png"), "circles"),
            PathBuf::from("/scans/student-7_debug_circles.png")
        );
    }

    #[test]
    fn test_disabled_writer_writes_nothing() {
        let writer = ImageDebugWriter::disabled();
        assert_eq!(writer.write("circles", |_| {}).unwrap(), None);
    }

    #[test]
    fn test_writer_saves_annotated_image() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("key.png");
        let writer = ImageDebugWriter::new(
            input_path,
            GrayImage::from_pixel(60, 40, image::Luma([255])),
        );

        let path = writer
            .write("circles", |canvas| {
                draw_circles_debug_image_mut(canvas, &[Circle::new(20, 20, 8)]);
            })
            .unwrap()
            .unwrap();

        assert_eq!(path, dir.path().join("key_debug_circles.png"));
        let saved = image::open(&path).unwrap().into_rgb8();
        assert_eq!(*saved.get_pixel(20, 20), RED);
        assert_eq!(*saved.get_pixel(28, 20), GREEN);
    }

    #[test]
    fn test_marked_bubbles_are_filled() {
        let bubble = |x| BubbleFeature {
            x,
            y: 20,
            r: 8,
            black_count: 0,
            white_count: 0,
        };
        let rows = vec![vec![bubble(20), bubble(60)]];
        let mut canvas = RgbImage::new(80, 40);

        let answers = [AnswerVector::marked(2, 1)];
        draw_marked_bubbles_debug_image_mut(&mut canvas, &rows, &answers, 2);
        assert_eq!(*canvas.get_pixel(60, 20), BLUE);
        assert_ne!(*canvas.get_pixel(20, 20), BLUE);
    }
}
