//! Inverted-file index: vectors partitioned by a trained coarse quantizer.
//!
//! A query probes only the `nprobe` lists whose centroids are closest, so
//! results are approximate. Vectors are kept uncompressed and scored exactly
//! within the probed lists.

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::flat::exact_top_k;
use super::kmeans;
use super::metric::DistanceMetric;

/// Training and probing parameters for clustered structures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvfParams {
    /// Number of clusters.
    pub nlist: usize,
    /// Clusters probed per query.
    pub nprobe: usize,
    /// Lloyd iterations.
    pub iterations: usize,
    /// RNG seed for training.
    pub seed: u64,
    /// Retrain once the corpus exceeds this multiple of the trained size.
    pub retrain_growth_factor: f32,
}

impl IvfParams {
    /// Derive cluster counts for a corpus of `n` vectors.
    ///
    /// `nlist = max(min(⌊√n·4⌋, n/10), min_clusters)` and
    /// `nprobe = max(1, min(nlist/2, max_probes))`.
    #[must_use]
    pub fn for_corpus(
        n: usize,
        min_clusters: usize,
        max_probes: usize,
        iterations: usize,
        seed: u64,
        retrain_growth_factor: f32,
    ) -> Self {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let by_sqrt = ((n as f64).sqrt() * 4.0).floor() as usize;
        let nlist = by_sqrt.min(n / 10).max(min_clusters);
        let nprobe = (nlist / 2).min(max_probes).max(1);
        Self {
            nlist,
            nprobe,
            iterations,
            seed,
            retrain_growth_factor,
        }
    }
}

/// Clustered index with exact scoring inside probed lists.
#[derive(Debug, Clone)]
pub struct IvfIndex {
    metric: DistanceMetric,
    params: IvfParams,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    vectors: Vec<Vec<f32>>,
    trained_size: usize,
}

impl IvfIndex {
    /// Train the quantizer on `vectors` and assign each to its list.
    #[must_use]
    pub fn train(metric: DistanceMetric, params: IvfParams, vectors: Vec<Vec<f32>>) -> Self {
        let mut index = Self {
            metric,
            params,
            centroids: Vec::new(),
            lists: Vec::new(),
            vectors,
            trained_size: 0,
        };
        index.retrain();
        index
    }

    fn retrain(&mut self) {
        let refs: Vec<&[f32]> = self.vectors.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.centroids = kmeans::train(
            &refs,
            self.params.nlist,
            self.params.iterations,
            self.metric.normalizes(),
            &mut rng,
        );
        self.lists = vec![Vec::new(); self.centroids.len()];
        for (i, v) in self.vectors.iter().enumerate() {
            let c = kmeans::nearest(&self.centroids, v);
            self.lists[c].push(i);
        }
        self.trained_size = self.vectors.len();
        tracing::debug!(
            nlist = self.centroids.len(),
            vectors = self.trained_size,
            "ivf quantizer trained"
        );
    }

    /// Append vectors, assigning each to its nearest existing centroid.
    ///
    /// Retrains once the corpus outgrows the trained size by the configured factor.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) {
        for v in vectors {
            let c = kmeans::nearest(&self.centroids, &v);
            let pos = self.vectors.len();
            self.vectors.push(v);
            if let Some(list) = self.lists.get_mut(c) {
                list.push(pos);
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let limit = self.trained_size as f32 * self.params.retrain_growth_factor;
        #[allow(clippy::cast_precision_loss)]
        if self.vectors.len() as f32 > limit {
            self.retrain();
        }
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

    /// Number of trained clusters.
    #[must_use]
    pub fn nlist(&self) -> usize {
        self.centroids.len()
    }

    /// Clusters probed per query.
    #[must_use]
    pub fn nprobe(&self) -> usize {
        self.params.nprobe
    }

    /// Approximate `k` nearest positions, ascending by distance.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let probes = kmeans::nearest_n(&self.centroids, query, self.params.nprobe);
        let candidates = probes
            .into_iter()
            .filter_map(|c| self.lists.get(c))
            .flatten()
            .map(|&i| (i, self.vectors[i].as_slice()));
        exact_top_k(self.metric, query, candidates, k)
    }
}
