//! Gradient Hough transform for circles.
//!
//! Each edge pixel votes along its gradient line, in both directions, at
//! every radius in the search band. Bubble outlines produce a peak in the
//! accumulator at their centers because their gradients converge radially.
//! Peaks are then accepted strongest first, skipping any that fall too close
//! to an already accepted circle, and each accepted center gets the radius
//! best supported by the surrounding edge pixels.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::{
    edges::canny,
    gradients::{horizontal_sobel, vertical_sobel},
    point::Point,
};

use crate::{geometry::is_within_distance_of_any, image_utils::WHITE, types::Circle};

type GradientImage = ImageBuffer<Luma<i16>, Vec<i16>>;

/// Thresholds and bounds for a single detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoughParams {
    /// Minimum distance between accepted circle centers.
    pub min_distance: u32,
    pub min_radius: u32,
    pub max_radius: u32,
    /// Upper Canny threshold; the lower one is half of it.
    pub edge_threshold: u32,
    /// Votes (and radius support) a center needs to be accepted.
    pub accumulator_threshold: u32,
}

impl HoughParams {
    /// Derives detection parameters from a `(sensitivity, separation)` grid
    /// point: radii span `[separation / 2, separation]`, the edge threshold is
    /// the sensitivity and the accumulator threshold three times that.
    pub fn for_grid_point(sensitivity: u32, separation: u32) -> Self {
        Self {
            min_distance: separation,
            min_radius: separation / 2,
            max_radius: separation,
            edge_threshold: sensitivity,
            accumulator_threshold: 3 * sensitivity,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgePoint {
    x: u32,
    y: u32,
    /// Unit gradient direction.
    ux: f32,
    uy: f32,
}

/// Edge pixels of an image for one edge threshold.
pub struct EdgeMap {
    mask: GrayImage,
    points: Vec<EdgePoint>,
}

impl EdgeMap {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Circle detector over a single smoothed image. Gradients are computed once
/// and shared by every edge map and detection pass.
pub struct CircleDetector {
    image: GrayImage,
    gx: GradientImage,
    gy: GradientImage,
}

impl CircleDetector {
    pub fn new(smoothed: &GrayImage) -> Self {
        Self {
            image: smoothed.clone(),
            gx: horizontal_sobel(smoothed),
            gy: vertical_sobel(smoothed),
        }
    }

    /// Finds edges with Canny thresholds `(edge_threshold / 2, edge_threshold)`.
    pub fn edge_map(&self, edge_threshold: u32) -> EdgeMap {
        let high = edge_threshold as f32;
        let mask = canny(&self.image, high / 2.0, high);
        let points = mask
            .enumerate_pixels()
            .filter(|(_, _, pixel)| **pixel == WHITE)
            .filter_map(|(x, y, _)| {
                let dx = self.gx.get_pixel(x, y)[0] as f32;
                let dy = self.gy.get_pixel(x, y)[0] as f32;
                let magnitude = (dx * dx + dy * dy).sqrt();
                if magnitude < f32::EPSILON {
                    return None;
                }
                Some(EdgePoint {
                    x,
                    y,
                    ux: dx / magnitude,
                    uy: dy / magnitude,
                })
            })
            .collect();

        EdgeMap { mask, points }
    }

    /// Detects circles using an edge map previously computed by
    /// [`CircleDetector::edge_map`]. Circles are returned strongest first.
    pub fn detect(&self, edges: &EdgeMap, params: &HoughParams) -> Vec<Circle> {
        let (width, height) = self.image.dimensions();
        let min_radius = params.min_radius.max(1);
        let max_radius = params.max_radius;
        if params.min_distance == 0 || min_radius > max_radius || width < 3 || height < 3 {
            return vec![];
        }

        let accumulator = accumulate_votes(edges, width, height, min_radius, max_radius);
        let centers = find_center_candidates(&accumulator, width, height, params);

        let mut circles: Vec<Circle> = vec![];
        for (x, y) in centers {
            let center = Point::new(x as f32, y as f32);
            if is_within_distance_of_any(&center, &circles, params.min_distance as f32) {
                continue;
            }

            if let Some((r, support)) = estimate_radius(edges, x, y, min_radius, max_radius) {
                if support > params.accumulator_threshold {
                    circles.push(Circle::new(x, y, r));
                }
            }
        }

        circles
    }
}

fn accumulate_votes(
    edges: &EdgeMap,
    width: u32,
    height: u32,
    min_radius: u32,
    max_radius: u32,
) -> Vec<u32> {
    let mut accumulator = vec![0u32; (width * height) as usize];
    let stride = width as usize;

    for point in &edges.points {
        for sign in [-1.0f32, 1.0] {
            for r in min_radius..=max_radius {
                let vx = (point.x as f32 + sign * point.ux * r as f32).round();
                let vy = (point.y as f32 + sign * point.uy * r as f32).round();
                // once a ray leaves the image it cannot come back
                if vx < 0.0 || vy < 0.0 || vx >= width as f32 || vy >= height as f32 {
                    break;
                }
                accumulator[vy as usize * stride + vx as usize] += 1;
            }
        }
    }

    accumulator
}

/// Local maxima above the accumulator threshold, most votes first and
/// row-major among equals. Plateaus yield a single cell because the
/// comparison is strict towards the left/top and non-strict towards the
/// right/bottom.
fn find_center_candidates(
    accumulator: &[u32],
    width: u32,
    height: u32,
    params: &HoughParams,
) -> Vec<(u32, u32)> {
    let stride = width as usize;
    let mut candidates = vec![];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y as usize * stride + x as usize;
            let votes = accumulator[idx];
            if votes > params.accumulator_threshold
                && votes > accumulator[idx - 1]
                && votes >= accumulator[idx + 1]
                && votes > accumulator[idx - stride]
                && votes >= accumulator[idx + stride]
            {
                candidates.push((x, y, votes));
            }
        }
    }

    candidates.sort_by(|a, b| b.2.cmp(&a.2));
    candidates.into_iter().map(|(x, y, _)| (x, y)).collect()
}

/// Picks the radius in `[min_radius, max_radius]` with the best ratio of
/// supporting edge pixels to radius. An edge pixel supports radius `r` when
/// its rounded distance from the center is within one pixel of `r`. Returns
/// the radius and its support, or `None` if no edge pixel supports any
/// radius.
fn estimate_radius(
    edges: &EdgeMap,
    cx: u32,
    cy: u32,
    min_radius: u32,
    max_radius: u32,
) -> Option<(u32, u32)> {
    let (width, height) = edges.mask.dimensions();
    let reach = max_radius as i64 + 1;
    let (cx, cy) = (cx as i64, cy as i64);
    let mut histogram = vec![0u32; max_radius as usize + 3];

    for y in (cy - reach).max(0)..=(cy + reach).min(height as i64 - 1) {
        for x in (cx - reach).max(0)..=(cx + reach).min(width as i64 - 1) {
            if *edges.mask.get_pixel(x as u32, y as u32) != WHITE {
                continue;
            }
            let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
            let distance = (dx * dx + dy * dy).sqrt().round() as usize;
            if let Some(bin) = histogram.get_mut(distance) {
                *bin += 1;
            }
        }
    }

    let mut best: Option<(u32, u32)> = None;
    for r in min_radius..=max_radius {
        let i = r as usize;
        let support = histogram[i - 1] + histogram[i] + histogram[i + 1];
        if support == 0 {
            continue;
        }
        best = match best {
            Some((best_r, best_support))
                if support as u64 * best_r as u64 <= best_support as u64 * r as u64 =>
            {
                Some((best_r, best_support))
            }
            _ => Some((r, support)),
        };
    }

    best
}
