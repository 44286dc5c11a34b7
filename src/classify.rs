use log::debug;
use logging_timer::time;
use serde::{Deserialize, Serialize};

use crate::types::{AnswerVector, BubbleFeature, Row};

/// Mean and population standard deviation of the white pixel counts of one
/// question's bubbles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationStat {
    pub mean: f64,
    pub stddev: f64,
}

impl DeviationStat {
    pub fn of_white_counts(group: &[BubbleFeature]) -> Self {
        if group.is_empty() {
            return Self {
                mean: 0.0,
                stddev: 0.0,
            };
        }

        let n = group.len() as f64;
        let mean = group.iter().map(|f| f.white_count as f64).sum::<f64>() / n;
        let variance = group
            .iter()
            .map(|f| (f.white_count as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            mean,
            stddev: variance.sqrt(),
        }
    }
}

/// Splits rows into questions of `options` consecutive bubbles, in row-major
/// order. Returns `None` if a row's length is not a multiple of `options`.
pub fn question_groups(rows: &[Row], options: usize) -> Option<Vec<&[BubbleFeature]>> {
    if options == 0 {
        return None;
    }

    let mut groups = vec![];
    for row in rows {
        if row.len() % options != 0 {
            return None;
        }
        groups.extend(row.chunks(options));
    }
    Some(groups)
}

pub fn deviation_stats(rows: &[Row], options: usize) -> Option<Vec<DeviationStat>> {
    Some(
        question_groups(rows, options)?
            .into_iter()
            .map(DeviationStat::of_white_counts)
            .collect(),
    )
}

/// The largest per-question deviation found on the blank template. Questions
/// varying less than this are treated as unmarked.
#[time]
pub fn deviation_threshold(template_rows: &[Row], options: usize) -> Option<f64> {
    let threshold = deviation_stats(template_rows, options)?
        .into_iter()
        .map(|stat| stat.stddev)
        .fold(0.0, f64::max);
    debug!("deviation threshold: {:.3}", threshold);
    Some(threshold)
}

/// Classifies one question. A question is blank when its deviation is below
/// the threshold or zero; otherwise the bubble with the fewest white pixels
/// is marked, the leftmost one if several share that count.
pub fn classify_question(group: &[BubbleFeature], deviation_threshold: f64) -> AnswerVector {
    let stat = DeviationStat::of_white_counts(group);
    if stat.stddev < deviation_threshold || stat.stddev == 0.0 {
        return AnswerVector::blank(group.len());
    }

    let mut marked = 0;
    for (i, feature) in group.iter().enumerate() {
        if feature.white_count < group[marked].white_count {
            marked = i;
        }
    }
    AnswerVector::marked(group.len(), marked)
}

/// Classifies every question of a sheet, in row-major order.
#[time]
pub fn classify_marks(
    rows: &[Row],
    options: usize,
    deviation_threshold: f64,
) -> Option<Vec<AnswerVector>> {
    Some(
        question_groups(rows, options)?
            .into_iter()
            .map(|group| classify_question(group, deviation_threshold))
            .collect(),
    )
}
