//! Synthetic answer sheets for tests.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

use crate::image_utils::{BLACK, WHITE};

/// A grid of bubbles: `rows` lines of `columns` bubbles each.
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    pub rows: u32,
    pub columns: u32,
    pub radius: i32,
    pub spacing: i32,
    pub margin: i32,
}

impl SheetLayout {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows,
            columns,
            radius: 10,
            spacing: 40,
            margin: 30,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        let width = 2 * self.margin + self.spacing * (self.columns as i32 - 1);
        let height = 2 * self.margin + self.spacing * (self.rows as i32 - 1);
        (width as u32, height as u32)
    }

    /// Bubble centers, row-major.
    pub fn centers(&self) -> Vec<(i32, i32)> {
        (0..self.rows as i32)
            .flat_map(|row| {
                (0..self.columns as i32).map(move |column| {
                    (
                        self.margin + column * self.spacing,
                        self.margin + row * self.spacing,
                    )
                })
            })
            .collect()
    }
}

/// Draws every bubble as a 3px outline, filling the ones whose row-major
/// index is in `filled`.
pub fn render_sheet(layout: &SheetLayout, filled: &[usize]) -> GrayImage {
    let (width, height) = layout.size();
    let mut img = GrayImage::from_pixel(width, height, WHITE);
    for (i, center) in layout.centers().into_iter().enumerate() {
        if filled.contains(&i) {
            draw_filled_circle_mut(&mut img, center, layout.radius, BLACK);
        } else {
            for inset in 0..3 {
                draw_hollow_circle_mut(&mut img, center, layout.radius - inset, BLACK);
            }
        }
    }
    img
}

pub fn encode_png(img: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("PNG encoding to succeed");
    bytes
}
