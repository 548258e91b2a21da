//! Seeded Lloyd's k-means used to train coarse and product quantizers.

use ordered_float::OrderedFloat;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use super::metric::squared_l2;

/// Train `k` centroids over `data` (all rows of equal length).
///
/// Initial centroids are `k` distinct rows drawn from `rng`. Empty clusters
/// are reseeded with a random row. With `spherical` set, centroids are
/// renormalised to unit length after every update so that nearest-by-L2
/// coincides with nearest-by-cosine. `k` is capped at `data.len()`.
#[must_use]
pub fn train(data: &[&[f32]], k: usize, iterations: usize, spherical: bool, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = data.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }
    let dim = data[0].len();

    let mut centroids: Vec<Vec<f32>> = sample(rng, n, k).into_iter().map(|i| data[i].to_vec()).collect();
    let mut assignment = vec![usize::MAX; n];

    for _ in 0..iterations.max(1) {
        let mut changed = false;
        for (i, row) in data.iter().enumerate() {
            let c = nearest(&centroids, row);
            if assignment[i] != c {
                assignment[i] = c;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0_f32; dim]; k];
        let mut counts = vec![0_usize; k];
        for (row, &c) in data.iter().zip(&assignment) {
            counts[c] += 1;
            for (s, x) in sums[c].iter_mut().zip(row.iter()) {
                *s += x;
            }
        }

        for (c, centroid) in centroids.iter_mut().enumerate() {
            if counts[c] == 0 {
                *centroid = data[rng.gen_range(0..n)].to_vec();
                changed = true;
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let inv = 1.0 / counts[c] as f32;
            for (x, s) in centroid.iter_mut().zip(&sums[c]) {
                *x = s * inv;
            }
            if spherical {
                normalize(centroid);
            }
        }

        if !changed {
            break;
        }
    }

    centroids
}

/// Position of the centroid closest to `v` by squared L2.
#[must_use]
pub fn nearest(centroids: &[Vec<f32>], v: &[f32]) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by_key(|(i, c)| (OrderedFloat(squared_l2(c, v)), *i))
        .map_or(0, |(i, _)| i)
}

/// Positions of the `n` centroids closest to `v`, closest first.
#[must_use]
pub fn nearest_n(centroids: &[Vec<f32>], v: &[f32], n: usize) -> Vec<usize> {
    let mut scored: Vec<(OrderedFloat<f32>, usize)> = centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (OrderedFloat(squared_l2(c, v)), i))
        .collect();
    scored.sort_unstable();
    scored.into_iter().take(n).map(|(_, i)| i).collect()
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn blobs() -> Vec<Vec<f32>> {
        let mut rows = Vec::new();
        for i in 0..20 {
            #[allow(clippy::cast_precision_loss)]
            let jitter = i as f32 * 0.01;
            rows.push(vec![jitter, jitter]);
            rows.push(vec![10.0 + jitter, 10.0 - jitter]);
        }
        rows
    }

    #[test]
    fn separates_two_blobs() {
        let data = blobs();
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let centroids = train(&refs, 2, 10, false, &mut rng);
        assert_eq!(centroids.len(), 2);
        let a = nearest(&centroids, &[0.0, 0.0]);
        let b = nearest(&centroids, &[10.0, 10.0]);
        assert_ne!(a, b);
    }

    #[test]
    fn k_is_capped_by_rows() {
        let data = [vec![1.0_f32, 0.0], vec![0.0, 1.0]];
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(train(&refs, 8, 5, true, &mut rng).len(), 2);
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let data = blobs();
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let a = train(&refs, 4, 10, false, &mut StdRng::seed_from_u64(42));
        let b = train(&refs, 4, 10, false, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn nearest_n_orders_by_distance() {
        let centroids = vec![vec![0.0, 0.0], vec![5.0, 0.0], vec![1.0, 0.0]];
        assert_eq!(nearest_n(&centroids, &[0.2, 0.0], 2), vec![0, 2]);
    }
}
