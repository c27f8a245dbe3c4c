// matcher.rs — Similarity score between two minutiae sets.
//
// Alignment is crude: translate set A so its centroid (integer means)
// coincides with B's, then score each point by its closest counterpart
// with the soft kernel 1 / (dist^e + 1) and average over the set. Both
// directions are scored and summed, scaled to roughly 0..100. The two
// directions intentionally use different distance exponents (0.2 and
// 0.3 applied to the squared distance); matched prints score high under
// either.
//
// The translation happens on an internal copy; callers keep their sets.

use crate::error::{Error, Result};
use crate::minutiae::MinutiaeSet;

/// Score the similarity of two minutiae sets. Typical same-finger
/// captures score well above translated or unrelated sets.
pub fn score(mset1: &MinutiaeSet, mset2: &MinutiaeSet) -> Result<f32> {
    if mset1.is_empty() || mset2.is_empty() {
        return Err(Error::InvalidInput("cannot match an empty minutiae set"));
    }

    let mut aligned = mset1.clone();
    align_centroids(&mut aligned, mset2);

    let forward = directed_score(&aligned, mset2, 0.2);
    let backward = directed_score(mset2, &aligned, 0.3);

    Ok((forward + backward) * 50.0)
}

/// Translate `a` so its integer-mean centroid matches `b`'s.
fn align_centroids(a: &mut MinutiaeSet, b: &MinutiaeSet) {
    let (ax, ay) = centroid(a);
    let (bx, by) = centroid(b);

    for m in a.as_mut_slice() {
        m.x -= ax - bx;
        m.y -= ay - by;
    }
}

fn centroid(set: &MinutiaeSet) -> (i32, i32) {
    let mut sx = 0i32;
    let mut sy = 0i32;
    for m in set.iter() {
        sx += m.x;
        sy += m.y;
    }
    let n = set.len() as i32;
    (sx / n, sy / n)
}

/// Mean over `from` of the best per-point kernel value against `to`.
/// `exponent` is applied to the squared distance.
fn directed_score(from: &MinutiaeSet, to: &MinutiaeSet, exponent: f32) -> f32 {
    let mut total = 0.0f32;

    for m in from.iter() {
        let mut best = 0.0f32;
        for n in to.iter() {
            let dx = (n.x - m.x) as f32;
            let dy = (n.y - m.y) as f32;
            let d2 = dx * dx + dy * dy;
            let value = 1.0 / (d2.powf(exponent) + 1.0);
            if value > best {
                best = value;
            }
        }
        total += best;
    }

    total / from.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minutiae::Minutia;

    fn set_of(points: &[(i32, i32)]) -> MinutiaeSet {
        let mut s = MinutiaeSet::new();
        for &(x, y) in points {
            s.push(Minutia { x, y });
        }
        s
    }

    #[test]
    fn identical_sets_score_maximum() {
        let a = set_of(&[(10, 10), (50, 80), (120, 40)]);
        // Every point pairs with itself at distance 0: each directed
        // score is 1, total 100.
        let s = score(&a, &a.clone()).unwrap();
        assert!((s - 100.0).abs() < 1e-4);
    }

    #[test]
    fn translation_is_compensated() {
        let a = set_of(&[(10, 10), (50, 80), (120, 40)]);
        let b = set_of(&[(60, 30), (100, 100), (170, 60)]);
        // b is a shifted by (50, 20); centroid alignment undoes it.
        let s = score(&a, &b).unwrap();
        assert!((s - 100.0).abs() < 1e-4);
    }

    #[test]
    fn distorted_set_scores_lower() {
        let a = set_of(&[(10, 10), (50, 80), (120, 40), (200, 150)]);
        let b = set_of(&[(15, 25), (40, 95), (133, 31), (190, 170)]);
        let self_score = score(&a, &a.clone()).unwrap();
        let cross_score = score(&a, &b).unwrap();
        assert!(cross_score < self_score);
    }

    #[test]
    fn empty_set_is_rejected() {
        let a = set_of(&[(1, 1)]);
        assert!(score(&a, &MinutiaeSet::new()).is_err());
        assert!(score(&MinutiaeSet::new(), &a).is_err());
    }

    #[test]
    fn inputs_are_not_mutated() {
        let a = set_of(&[(10, 10), (50, 80)]);
        let b = set_of(&[(110, 110), (150, 180)]);
        let before = a.as_slice().to_vec();
        score(&a, &b).unwrap();
        assert_eq!(before, a.as_slice());
    }
}
