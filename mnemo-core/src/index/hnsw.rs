//! Hierarchical proximity-graph index.
//!
//! Wraps `instant-distance`. The graph is immutable once built, so points
//! added afterwards go to an unindexed tail that is scanned exactly and
//! merged into graph results. The graph is rebuilt when the tail grows past
//! a fraction of the corpus.

use instant_distance::{Builder, HnswMap, Point, Search};

use super::flat::{exact_top_k, sort_hits};
use super::metric::DistanceMetric;

// ---------------------------------------------------------------------------
// GraphPoint: adapter to the instant-distance Point trait
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct GraphPoint {
    vector: Vec<f32>,
    metric: DistanceMetric,
}

impl Point for GraphPoint {
    fn distance(&self, other: &Self) -> f32 {
        if self.vector.len() != other.vector.len() {
            return f32::MAX;
        }
        self.metric.distance(&self.vector, &other.vector)
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Graph build and search quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnswParams {
    /// Candidate list size while building.
    pub ef_construction: usize,
    /// Candidate list size while searching.
    pub ef_search: usize,
    /// Rebuild once unindexed points exceed this fraction of the corpus.
    pub rebuild_fraction: f32,
    /// Seed for level assignment.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            ef_construction: 40,
            ef_search: 32,
            rebuild_fraction: 0.2,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// HnswIndex
// ---------------------------------------------------------------------------

/// Graph index over positions `0..len`.
pub struct HnswIndex {
    metric: DistanceMetric,
    params: HnswParams,
    points: Vec<GraphPoint>,
    map: Option<HnswMap<GraphPoint, usize>>,
    /// Points `built_len..` are not in the graph.
    built_len: usize,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("metric", &self.metric)
            .field("params", &self.params)
            .field("points", &self.points.len())
            .field("built_len", &self.built_len)
            .finish_non_exhaustive()
    }
}

impl HnswIndex {
    /// Build a graph over prepared vectors.
    #[must_use]
    pub fn build(metric: DistanceMetric, params: HnswParams, vectors: Vec<Vec<f32>>) -> Self {
        let points = vectors
            .into_iter()
            .map(|vector| GraphPoint { vector, metric })
            .collect();
        let mut index = Self {
            metric,
            params,
            points,
            map: None,
            built_len: 0,
        };
        index.rebuild();
        index
    }

    fn rebuild(&mut self) {
        if self.points.is_empty() {
            self.map = None;
            self.built_len = 0;
            return;
        }
        let values: Vec<usize> = (0..self.points.len()).collect();
        let map = Builder::default()
            .ef_construction(self.params.ef_construction)
            .ef_search(self.params.ef_search)
            .seed(self.params.seed)
            .build(self.points.clone(), values);
        self.map = Some(map);
        self.built_len = self.points.len();
        tracing::debug!(points = self.built_len, "hnsw graph built");
    }

    /// Append prepared vectors to the unindexed tail, rebuilding when it grows too large.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) {
        let metric = self.metric;
        self.points
            .extend(vectors.into_iter().map(|vector| GraphPoint { vector, metric }));
        if self.needs_rebuild() {
            self.rebuild();
        }
    }

    /// Whether the unindexed tail exceeds the rebuild fraction.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        let total = self.points.len();
        if total == 0 {
            return false;
        }
        if self.map.is_none() {
            return true;
        }
        #[allow(clippy::cast_precision_loss)]
        let tail_fraction = (total - self.built_len) as f32 / total as f32;
        tail_fraction > self.params.rebuild_fraction
    }

    /// Number of points (graph plus tail).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points not yet in the graph.
    #[must_use]
    pub fn unindexed(&self) -> usize {
        self.points.len() - self.built_len
    }

    /// Approximate `k` nearest positions, ascending by distance.
    ///
    /// Requests at least `ef_search` wide fall back to an exact scan, since
    /// the graph never yields more than `ef_search` candidates.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let Some(map) = &self.map else {
            return self.exact(query, k, 0);
        };
        if k >= self.params.ef_search {
            return self.exact(query, k, 0);
        }

        let q = GraphPoint {
            vector: query.to_vec(),
            metric: self.metric,
        };
        let mut search = Search::default();
        let mut hits: Vec<(usize, f32)> = map
            .search(&q, &mut search)
            .take(k)
            .map(|item| (*item.value, item.distance))
            .collect();
        hits.extend(self.exact(query, k, self.built_len));
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }

    fn exact(&self, query: &[f32], k: usize, from: usize) -> Vec<(usize, f32)> {
        let candidates = self.points[from..]
            .iter()
            .enumerate()
            .map(|(i, p)| (from + i, p.vector.as_slice()));
        exact_top_k(self.metric, query, candidates, k)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = (i as f32 / n as f32) * std::f32::consts::TAU;
                vec![angle.cos(), angle.sin(), 0.0]
            })
            .collect()
    }

    #[test]
    fn empty_index_returns_no_results() {
        let index = HnswIndex::build(DistanceMetric::Cosine, HnswParams::default(), Vec::new());
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_empty());
        assert!(!index.needs_rebuild());
    }

    #[test]
    fn build_and_search() {
        let index = HnswIndex::build(DistanceMetric::Cosine, HnswParams::default(), circle(50));
        let results = index.search(&[1.0, 0.0, 0.0], 5);
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 < 0.01, "top distance {}", results[0].1);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn tail_points_are_found_before_rebuild() {
        let mut index = HnswIndex::build(DistanceMetric::Cosine, HnswParams::default(), circle(100));
        index.add(vec![vec![0.0, 0.0, 1.0]]);
        assert_eq!(index.unindexed(), 1);
        let results = index.search(&[0.0, 0.0, 1.0], 1);
        assert_eq!(results[0].0, 100);
    }

    #[test]
    fn tail_triggers_rebuild() {
        let mut index = HnswIndex::build(DistanceMetric::Cosine, HnswParams::default(), circle(10));
        index.add(circle(3));
        assert_eq!(index.unindexed(), 0);
        assert_eq!(index.len(), 13);
    }

    #[test]
    fn wide_requests_fall_back_to_exact() {
        let index = HnswIndex::build(DistanceMetric::Euclidean, HnswParams::default(), circle(60));
        let results = index.search(&[1.0, 0.0, 0.0], 40);
        assert_eq!(results.len(), 40);
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn point_distance_mismatched_dims() {
        let a = GraphPoint { vector: vec![1.0, 0.0], metric: DistanceMetric::Cosine };
        let b = GraphPoint { vector: vec![1.0, 0.0, 0.0], metric: DistanceMetric::Cosine };
        assert_eq!(a.distance(&b), f32::MAX);
    }
}
