use log::{debug, warn};
use logging_timer::time;

use crate::types::{BubbleFeature, Row};

/// Clusters bubbles by their y coordinate and returns the clusters as rows,
/// top to bottom, each ordered left to right.
///
/// This is density-based clustering in one dimension with a minimum cluster
/// size of one: every bubble is a core point, so two bubbles share a row
/// whenever a chain of bubbles connects them with y gaps of at most `eps`.
pub fn cluster_rows(features: &[BubbleFeature], eps: f32) -> Vec<Row> {
    let mut by_y = features.to_vec();
    by_y.sort_by_key(|f| f.y);

    let mut clusters: Vec<Row> = vec![];
    for feature in by_y {
        let joins_previous = clusters
            .last()
            .and_then(|cluster| cluster.last())
            .map_or(false, |last| (feature.y - last.y) as f32 <= eps);
        match clusters.last_mut() {
            Some(cluster) if joins_previous => cluster.push(feature),
            _ => clusters.push(vec![feature]),
        }
    }

    let mut rows = clusters
        .into_iter()
        .map(|mut row| {
            row.sort_by_key(|f| f.x);
            row
        })
        .collect::<Vec<Row>>();
    rows.sort_by(|a, b| mean_y(a).total_cmp(&mean_y(b)));
    rows
}

fn mean_y(row: &Row) -> f64 {
    row.iter().map(|f| f.y as f64).sum::<f64>() / row.len().max(1) as f64
}

/// Whether every row holds the same number of bubbles.
pub fn rows_are_uniform(rows: &[Row]) -> bool {
    rows.windows(2).all(|w| w[0].len() == w[1].len())
}

/// Groups bubbles into rows, retrying once with the tighter `fallback_eps`
/// if the first pass produces rows of differing lengths. Returns `None` if
/// neither pass is uniform.
#[time]
pub fn group_rows(features: &[BubbleFeature], eps: f32, fallback_eps: f32) -> Option<Vec<Row>> {
    let rows = cluster_rows(features, eps);
    if rows_are_uniform(&rows) {
        debug!("grouped {} bubbles into {} rows", features.len(), rows.len());
        return Some(rows);
    }

    warn!(
        "row lengths {:?} are not uniform, retrying with a tighter neighbourhood",
        rows.iter().map(Vec::len).collect::<Vec<usize>>()
    );
    let rows = cluster_rows(features, fallback_eps);
    if rows_are_uniform(&rows) {
        debug!("grouped {} bubbles into {} rows", features.len(), rows.len());
        return Some(rows);
    }

    None
}
