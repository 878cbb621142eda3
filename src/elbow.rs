//! Elbow detection over a sorted score curve.
//!
//! Both methods return the 1-based index of the last item on the relevant
//! side of the cliff, or `None` when the curve has no cliff worth cutting at.

use crate::config::ElbowMethod;

/// Minimum normalized perpendicular distance to count as a cliff.
pub const PERPENDICULAR_MIN_DISTANCE: f64 = 0.01;

pub fn detect_elbow(scores: &[f64], method: ElbowMethod) -> Option<usize> {
    match method {
        ElbowMethod::Curvature => curvature_elbow(scores),
        ElbowMethod::Perpendicular => perpendicular_elbow(scores),
    }
}

/// Maximum discrete second difference, gated by a noise floor of one
/// standard deviation of the second differences.
fn curvature_elbow(scores: &[f64]) -> Option<usize> {
    let len = scores.len();
    if len < 3 {
        return None;
    }

    let second_diffs: Vec<f64> = (1..len - 1)
        .map(|i| scores[i + 1] - 2.0 * scores[i] + scores[i - 1])
        .collect();

    let (best_idx, best) = second_diffs
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let mean = second_diffs.iter().sum::<f64>() / second_diffs.len() as f64;
    let variance = second_diffs
        .iter()
        .map(|d| (d - mean) * (d - mean))
        .sum::<f64>()
        / second_diffs.len() as f64;
    let noise_floor = variance.sqrt();

    if best < noise_floor {
        return None;
    }
    // second_diffs[i] describes curve position i+1 (0-based); report 1-based.
    Some(best_idx + 2)
}

/// Maximum perpendicular distance from the line through the normalized
/// endpoints (0,0)..(1,1).
fn perpendicular_elbow(scores: &[f64]) -> Option<usize> {
    let len = scores.len();
    if len < 3 {
        return None;
    }
    let span = scores[len - 1] - scores[0];
    if span <= 0.0 {
        // Flat curve: nothing to cut.
        return None;
    }

    let mut best_idx = 0usize;
    let mut best = f64::MIN;
    for (i, score) in scores.iter().enumerate() {
        let x = i as f64 / (len - 1) as f64;
        let y = (score - scores[0]) / span;
        let distance = (x - y).abs() / std::f64::consts::SQRT_2;
        if distance > best {
            best = distance;
            best_idx = i;
        }
    }

    if best < PERPENDICULAR_MIN_DISTANCE {
        return None;
    }
    Some(best_idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curvature_finds_a_sharp_cliff() {
        // Flat head, cliff after the fourth item.
        let scores = [1.0, 1.0, 1.0, 1.0, 9.0, 9.2, 9.4];
        let elbow = detect_elbow(&scores, ElbowMethod::Curvature).unwrap();
        assert!((4..=5).contains(&elbow), "elbow at {elbow}");
    }

    #[test]
    fn curvature_needs_three_points() {
        assert_eq!(detect_elbow(&[1.0, 2.0], ElbowMethod::Curvature), None);
        assert_eq!(detect_elbow(&[], ElbowMethod::Curvature), None);
    }

    #[test]
    fn perpendicular_finds_the_knee() {
        let scores = [1.0, 1.1, 1.2, 1.3, 8.0, 9.0, 10.0];
        let elbow = detect_elbow(&scores, ElbowMethod::Perpendicular).unwrap();
        assert_eq!(elbow, 4);
    }

    #[test]
    fn perpendicular_rejects_flat_and_straight_curves() {
        assert_eq!(
            detect_elbow(&[2.0, 2.0, 2.0, 2.0], ElbowMethod::Perpendicular),
            None
        );
        // A perfectly linear curve never strays from the endpoint line.
        let linear: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(detect_elbow(&linear, ElbowMethod::Perpendicular), None);
    }

    #[test]
    fn elbow_indices_are_one_based_and_in_range() {
        let scores = [1.0, 1.0, 1.0, 50.0, 51.0, 52.0, 53.0, 54.0];
        for method in [ElbowMethod::Curvature, ElbowMethod::Perpendicular] {
            if let Some(e) = detect_elbow(&scores, method) {
                assert!(e >= 1 && e <= scores.len());
            }
        }
    }
}
