//! Product quantization and the compressed inverted-file index built on it.
//!
//! Each vector is split into `m` equal sub-vectors; every sub-vector is
//! replaced by the id of its nearest centroid in a per-subspace codebook.
//! Queries are scored with asymmetric distance tables (exact query,
//! quantized database).

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::flat::sort_hits;
use super::ivf::IvfParams;
use super::kmeans;
use super::metric::{DistanceMetric, squared_l2};

/// Trained product quantizer.
#[derive(Debug, Clone)]
pub struct ProductQuantizer {
    dsub: usize,
    codebooks: Vec<Vec<Vec<f32>>>,
}

impl ProductQuantizer {
    /// Train on `data`.
    ///
    /// `subquantizers` is reduced until it divides the dimension; each
    /// codebook has `2^bits` centroids, capped by the number of rows.
    #[must_use]
    pub fn train(data: &[&[f32]], subquantizers: usize, bits: u32, iterations: usize, seed: u64) -> Self {
        let dim = data.first().map_or(0, |r| r.len());
        let mut m = subquantizers.clamp(1, dim.max(1));
        while m > 1 && dim % m != 0 {
            m -= 1;
        }
        let dsub = (dim / m).max(1);
        let ksub = (1_usize << bits.min(8)).min(data.len());

        let mut rng = StdRng::seed_from_u64(seed);
        let codebooks = (0..m)
            .map(|j| {
                let sub: Vec<&[f32]> = data.iter().map(|r| &r[j * dsub..(j + 1) * dsub]).collect();
                kmeans::train(&sub, ksub, iterations, false, &mut rng)
            })
            .collect();

        Self { dsub, codebooks }
    }

    /// Number of sub-quantizers.
    #[must_use]
    pub fn subquantizers(&self) -> usize {
        self.codebooks.len()
    }

    /// Centroids per sub-quantizer.
    #[must_use]
    pub fn codebook_size(&self) -> usize {
        self.codebooks.first().map_or(0, Vec::len)
    }

    /// Compress a vector to one byte per sub-quantizer.
    #[must_use]
    pub fn encode(&self, v: &[f32]) -> Vec<u8> {
        self.codebooks
            .iter()
            .enumerate()
            .map(|(j, book)| {
                let c = kmeans::nearest(book, &v[j * self.dsub..(j + 1) * self.dsub]);
                u8::try_from(c).unwrap_or(u8::MAX)
            })
            .collect()
    }

    /// Approximate reconstruction of an encoded vector.
    #[must_use]
    pub fn decode(&self, code: &[u8]) -> Vec<f32> {
        self.codebooks
            .iter()
            .zip(code)
            .flat_map(|(book, &c)| book[usize::from(c)].iter().copied())
            .collect()
    }

    /// Per-subspace squared distances from `query` to every centroid.
    #[must_use]
    pub fn distance_table(&self, query: &[f32]) -> Vec<Vec<f32>> {
        self.codebooks
            .iter()
            .enumerate()
            .map(|(j, book)| {
                let q = &query[j * self.dsub..(j + 1) * self.dsub];
                book.iter().map(|c| squared_l2(q, c)).collect()
            })
            .collect()
    }

    /// Asymmetric squared L2 distance of an encoded vector.
    #[must_use]
    pub fn adc(table: &[Vec<f32>], code: &[u8]) -> f32 {
        table.iter().zip(code).map(|(row, &c)| row[usize::from(c)]).sum()
    }
}

/// Compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PqParams {
    /// Requested sub-quantizers.
    pub subquantizers: usize,
    /// Bits per code.
    pub bits: u32,
}

/// Inverted file over product-quantized codes.
///
/// Only codes are retained, so the quantizers cannot be retrained from
/// stored data; [`needs_retrain`](Self::needs_retrain) signals the owner to
/// rebuild from source texts instead.
#[derive(Debug, Clone)]
pub struct IvfPqIndex {
    metric: DistanceMetric,
    params: IvfParams,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    codes: Vec<Vec<u8>>,
    pq: ProductQuantizer,
    trained_size: usize,
}

impl IvfPqIndex {
    /// Train the coarse and product quantizers and encode `vectors`.
    #[must_use]
    pub fn train(metric: DistanceMetric, params: IvfParams, pq: PqParams, vectors: &[Vec<f32>]) -> Self {
        let refs: Vec<&[f32]> = vectors.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let centroids = kmeans::train(&refs, params.nlist, params.iterations, metric.normalizes(), &mut rng);
        let quantizer = ProductQuantizer::train(&refs, pq.subquantizers, pq.bits, params.iterations, params.seed);

        let mut index = Self {
            metric,
            params,
            lists: vec![Vec::new(); centroids.len()],
            centroids,
            codes: Vec::with_capacity(vectors.len()),
            pq: quantizer,
            trained_size: vectors.len(),
        };
        index.add(vectors);
        tracing::debug!(
            nlist = index.centroids.len(),
            subquantizers = index.pq.subquantizers(),
            codebook = index.pq.codebook_size(),
            vectors = index.trained_size,
            "ivf-pq quantizers trained"
        );
        index
    }

    /// Encode and append vectors with the existing quantizers.
    pub fn add(&mut self, vectors: &[Vec<f32>]) {
        for v in vectors {
            let c = kmeans::nearest(&self.centroids, v);
            let pos = self.codes.len();
            self.codes.push(self.pq.encode(v));
            if let Some(list) = self.lists.get_mut(c) {
                list.push(pos);
            }
        }
    }

    /// Whether the corpus has outgrown the trained quantizers.
    #[must_use]
    pub fn needs_retrain(&self) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let grown = self.codes.len() as f32 > self.trained_size as f32 * self.params.retrain_growth_factor;
        grown
    }

    /// Number of stored codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no codes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Approximate `k` nearest positions, ascending by estimated distance.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let table = self.pq.distance_table(query);
        let mut hits: Vec<(usize, f32)> = kmeans::nearest_n(&self.centroids, query, self.params.nprobe)
            .into_iter()
            .filter_map(|c| self.lists.get(c))
            .flatten()
            .map(|&i| (i, self.metric.from_squared_l2(ProductQuantizer::adc(&table, &self.codes[i]))))
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()).collect()
    }

    #[test]
    fn subquantizers_divide_dimension() {
        let data = random_vectors(50, 12, 1);
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let pq = ProductQuantizer::train(&refs, 8, 4, 5, 42);
        assert_eq!(pq.subquantizers(), 6);
        assert_eq!(pq.codebook_size(), 16);
        assert_eq!(pq.encode(&data[0]).len(), 6);
    }

    #[test]
    fn codebook_capped_by_rows() {
        let data = random_vectors(10, 8, 2);
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let pq = ProductQuantizer::train(&refs, 8, 8, 5, 42);
        assert_eq!(pq.codebook_size(), 10);
    }

    #[test]
    fn reconstruction_error_is_small_relative_to_spread() {
        let data = random_vectors(300, 16, 3);
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let pq = ProductQuantizer::train(&refs, 8, 8, 10, 42);
        #[allow(clippy::cast_precision_loss)]
        let mean_err: f32 = data
            .iter()
            .map(|v| squared_l2(v, &pq.decode(&pq.encode(v))))
            .sum::<f32>()
            / data.len() as f32;
        let spread = squared_l2(&data[0], &data[1]);
        assert!(mean_err < spread.max(1.0), "error {mean_err} vs spread {spread}");
    }

    #[test]
    fn adc_matches_reconstruction_distance() {
        let data = random_vectors(64, 8, 4);
        let refs: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let pq = ProductQuantizer::train(&refs, 4, 4, 5, 42);
        let q = &data[3];
        let code = pq.encode(&data[9]);
        let table = pq.distance_table(q);
        let via_table = ProductQuantizer::adc(&table, &code);
        let via_decode = squared_l2(q, &pq.decode(&code));
        assert!((via_table - via_decode).abs() < 1e-4);
    }

    #[test]
    fn ivf_pq_finds_near_duplicates() {
        let data = random_vectors(600, 16, 5);
        let params = IvfParams::for_corpus(data.len(), 8, 16, 8, 42, 2.0);
        let index = IvfPqIndex::train(
            DistanceMetric::Euclidean,
            params,
            PqParams { subquantizers: 8, bits: 8 },
            &data,
        );
        assert_eq!(index.len(), 600);
        let mut top10_hits = 0;
        for probe in 0..20 {
            let hits = index.search(&data[probe], 10);
            if hits.iter().any(|h| h.0 == probe) {
                top10_hits += 1;
            }
        }
        assert!(top10_hits >= 15, "only {top10_hits}/20 self-matches in top 10");
        assert!(!index.needs_retrain());
    }
}
