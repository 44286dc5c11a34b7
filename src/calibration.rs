use image::GrayImage;
use log::debug;
use logging_timer::time;
use rayon::prelude::*;

use crate::{
    config::SearchConfig,
    hough::{CircleDetector, EdgeMap, HoughParams},
    types::{CalibrationParams, Circle},
};

/// The outcome of a successful template calibration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    pub circles: Vec<Circle>,
    pub mode_radius: u32,
    pub params: CalibrationParams,
}

/// Sensitivities of the template grid, strictest first.
pub fn template_sensitivities(search: &SearchConfig) -> Vec<u32> {
    (search.sensitivity_min..=search.sensitivity_max).rev().collect()
}

/// Separations of the template grid, smallest first.
pub fn template_separations(search: &SearchConfig) -> Vec<u32> {
    (search.separation_min..=search.separation_max).collect()
}

/// Every `(sensitivity, separation)` pair of the template grid in the order
/// the sequential search visits them.
pub fn template_grid(search: &SearchConfig) -> Vec<(u32, u32)> {
    let separations = template_separations(search);
    template_sensitivities(search)
        .into_iter()
        .flat_map(|s| separations.iter().map(move |a| (s, *a)))
        .collect()
}

/// The most frequent radius, ties going to whichever radius was detected
/// first.
pub fn mode_radius(circles: &[Circle]) -> Option<u32> {
    let mut counts: Vec<(u32, usize)> = vec![];
    for circle in circles {
        match counts.iter_mut().find(|(r, _)| *r == circle.r) {
            Some((_, count)) => *count += 1,
            None => counts.push((circle.r, 1)),
        }
    }

    let mut best: Option<(u32, usize)> = None;
    for (r, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((r, count));
        }
    }
    best.map(|(r, _)| r)
}

fn accept(circles: Vec<Circle>, sensitivity: u32, separation: u32) -> Option<Calibration> {
    let mode_radius = mode_radius(&circles)?;
    Some(Calibration {
        circles,
        mode_radius,
        params: CalibrationParams {
            sensitivity,
            separation,
            radius_estimate: mode_radius,
        },
    })
}

fn detect_exact(
    detector: &CircleDetector,
    edges: &EdgeMap,
    sensitivity: u32,
    separation: u32,
    min_radius: u32,
    expected: usize,
) -> Option<Vec<Circle>> {
    let mut params = HoughParams::for_grid_point(sensitivity, separation);
    params.min_radius = params.min_radius.max(min_radius);
    let circles = detector.detect(edges, &params);
    debug!(
        "sensitivity={} separation={} found {} circles",
        sensitivity,
        separation,
        circles.len()
    );
    (circles.len() == expected).then_some(circles)
}

/// Walks `sensitivities` (outer) and `separations` (inner) in the given order
/// and returns the first grid point whose detection yields exactly
/// `expected` circles. No detected radius is smaller than `min_radius`.
fn first_exact_match(
    detector: &CircleDetector,
    sensitivities: &[u32],
    separations: &[u32],
    min_radius: u32,
    expected: usize,
) -> Option<(Vec<Circle>, u32, u32)> {
    for &sensitivity in sensitivities {
        let edges = detector.edge_map(sensitivity);
        if edges.is_empty() {
            continue;
        }
        for &separation in separations {
            if let Some(circles) =
                detect_exact(detector, &edges, sensitivity, separation, min_radius, expected)
            {
                return Some((circles, sensitivity, separation));
            }
        }
    }
    None
}

/// Searches the template grid for a detection configuration that yields
/// exactly `expected` circles. The first match in grid order wins.
#[time]
pub fn calibrate(
    smoothed: &GrayImage,
    expected: usize,
    search: &SearchConfig,
) -> Option<Calibration> {
    if expected == 0 {
        return None;
    }
    let detector = CircleDetector::new(smoothed);
    let (circles, sensitivity, separation) = first_exact_match(
        &detector,
        &template_sensitivities(search),
        &template_separations(search),
        0,
        expected,
    )?;
    accept(circles, sensitivity, separation)
}

/// Same contract as [`calibrate`], with every grid point evaluated on the
/// rayon thread pool. The match returned is still the first in grid order.
#[time]
pub fn calibrate_parallel(
    smoothed: &GrayImage,
    expected: usize,
    search: &SearchConfig,
) -> Option<Calibration> {
    if expected == 0 {
        return None;
    }
    let detector = CircleDetector::new(smoothed);
    let edge_maps = template_sensitivities(search)
        .par_iter()
        .map(|s| detector.edge_map(*s))
        .collect::<Vec<EdgeMap>>();

    let (circles, sensitivity, separation) = template_grid(search)
        .into_par_iter()
        .find_map_first(|(sensitivity, separation)| {
            let edges = &edge_maps[(search.sensitivity_max - sensitivity) as usize];
            if edges.is_empty() {
                return None;
            }
            detect_exact(&detector, edges, sensitivity, separation, 0, expected)
                .map(|circles| (circles, sensitivity, separation))
        })?;
    accept(circles, sensitivity, separation)
}

/// Radius window `[lower, upper]` for transfers: the larger of the template
/// separation and mode radius widened by the tolerance, and the smaller of
/// the two narrowed by it.
pub fn radius_window(params: &CalibrationParams, tolerance: f64) -> (u32, u32) {
    let upper = params.separation.max(params.radius_estimate) as f64;
    let lower = params.separation.min(params.radius_estimate) as f64;
    let upper = (upper + upper * tolerance).ceil().max(0.0) as u32;
    let lower = (lower - lower * tolerance).floor().max(0.0) as u32;
    (lower, upper)
}

/// Sensitivities a transfer tries: from the template's value down to, but
/// not including, `span` levels below it (never below 1).
pub fn transfer_sensitivities(params: &CalibrationParams, search: &SearchConfig) -> Vec<u32> {
    let floor = params
        .sensitivity
        .saturating_sub(search.transfer_sensitivity_span);
    ((floor + 1)..=params.sensitivity).rev().collect()
}

/// Separations a transfer tries: the radius window, largest first.
pub fn transfer_separations(params: &CalibrationParams, search: &SearchConfig) -> Vec<u32> {
    let (lower, upper) = radius_window(params, search.radius_tolerance);
    (lower..=upper).rev().collect()
}

/// Locates `expected` circles on another sheet using a grid anchored on the
/// template calibration instead of the full template grid. Detected radii
/// stay inside the transfer radius window.
#[time]
pub fn transfer(
    smoothed: &GrayImage,
    expected: usize,
    params: &CalibrationParams,
    search: &SearchConfig,
) -> Option<Vec<Circle>> {
    if expected == 0 {
        return None;
    }
    let detector = CircleDetector::new(smoothed);
    let (lower, _) = radius_window(params, search.radius_tolerance);
    // radii below the window's lower bound are never proposed
    first_exact_match(
        &detector,
        &transfer_sensitivities(params, search),
        &transfer_separations(params, search),
        lower,
        expected,
    )
    .map(|(circles, _, _)| circles)
}
