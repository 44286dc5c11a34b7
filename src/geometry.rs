use imageproc::point::Point;

use crate::types::Circle;

pub fn distance_from_point_to_point(p1: &Point<f32>, p2: &Point<f32>) -> f32 {
    ((p1.x - p2.x).powf(2.0) + (p1.y - p2.y).powf(2.0)).sqrt()
}

pub fn center_of_circle(circle: &Circle) -> Point<f32> {
    Point::new(circle.x as f32, circle.y as f32)
}

/// Determines whether `point` lies closer than `min_distance` to the center
/// of any of `circles`.
pub fn is_within_distance_of_any(
    point: &Point<f32>,
    circles: &[Circle],
    min_distance: f32,
) -> bool {
    circles
        .iter()
        .any(|c| distance_from_point_to_point(point, &center_of_circle(c)) < min_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let d = distance_from_point_to_point(&Point::new(0.0, 0.0), &Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_is_within_distance_of_any() {
        let circles = [Circle::new(10, 10, 4), Circle::new(50, 10, 4)];
        assert!(is_within_distance_of_any(&Point::new(14.0, 10.0), &circles, 5.0));
        assert!(!is_within_distance_of_any(&Point::new(30.0, 10.0), &circles, 5.0));
        assert!(!is_within_distance_of_any(&Point::new(15.0, 10.0), &circles, 5.0));
    }
}
