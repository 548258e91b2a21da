//! Exact nearest-neighbour search by linear scan.

use ordered_float::OrderedFloat;

use super::metric::DistanceMetric;

/// Brute-force index: every query is compared against every vector.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: DistanceMetric,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build from prepared vectors.
    #[must_use]
    pub fn new(metric: DistanceMetric, vectors: Vec<Vec<f32>>) -> Self {
        Self { metric, vectors }
    }

    /// Append prepared vectors.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) {
        self.vectors.extend(vectors);
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether no vectors are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The `k` closest positions, ascending by distance, ties by position.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        exact_top_k(
            self.metric,
            query,
            self.vectors.iter().enumerate().map(|(i, v)| (i, v.as_slice())),
            k,
        )
    }
}

/// Score every candidate exactly and keep the `k` closest.
pub(crate) fn exact_top_k<'a>(
    metric: DistanceMetric,
    query: &[f32],
    candidates: impl Iterator<Item = (usize, &'a [f32])>,
    k: usize,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .map(|(i, v)| (i, metric.distance(query, v)))
        .collect();
    sort_hits(&mut scored);
    scored.truncate(k);
    scored
}

/// Sort `(position, distance)` pairs ascending by distance, then position.
pub(crate) fn sort_hits(hits: &mut [(usize, f32)]) {
    hits.sort_by_key(|&(i, d)| (OrderedFloat(d), i));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_exact_neighbours_in_order() {
        let index = FlatIndex::new(
            DistanceMetric::Euclidean,
            vec![vec![0.0, 0.0], vec![5.0, 5.0], vec![1.0, 1.0]],
        );
        let hits = index.search(&[0.9, 0.9], 2);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![2, 0]);
    }

    #[test]
    fn k_larger_than_corpus() {
        let mut index = FlatIndex::new(DistanceMetric::Cosine, vec![vec![1.0, 0.0]]);
        index.add(vec![vec![0.0, 1.0]]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn ties_break_by_position() {
        let index = FlatIndex::new(DistanceMetric::Cosine, vec![vec![1.0, 0.0]; 3]);
        let hits = index.search(&[1.0, 0.0], 3);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
