//! Isolation forest outlier detector
//!
//! Anomalies are isolated by fewer random axis-aligned splits than normal
//! points, so their average path length across trees is short. Scores follow
//! the usual normalisation `s(x) = 2^(-E[h(x)] / c(psi))`, where values close
//! to 1 are anomalous.

use crate::error::InsightError;
use crate::models::FEATURE_COUNT;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant, used for the harmonic number approximation
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Minimum rows needed to fit a forest
pub const MIN_TRAINING_ROWS: usize = 2;

pub type FeatureRow = [f64; FEATURE_COUNT];

/// Training parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Rows drawn (without replacement) per tree, capped at the data size
    pub sample_size: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    /// RNG seed for reproducible training
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Single isolation tree stored as a flat node arena; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(data: &[FeatureRow], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(data, sample, 0, max_depth, rng);
        tree
    }

    fn grow_node(
        &mut self,
        data: &[FeatureRow],
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return id;
        }

        // Only features with spread can separate rows
        let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    (lo.min(data[r][feature]), hi.max(data[r][feature]))
                });
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return id;
        };

        let value = rng.gen_range(min..max);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[r][feature] < value);

        let left = self.grow_node(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow_node(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            value,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &FeatureRow) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[id] {
                Node::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    id = if row[*feature] < *value { *left } else { *right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

/// Trained isolation forest with its decision threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    contamination: f64,
    threshold: f64,
}

impl IsolationForest {
    /// Fit a forest and derive the threshold from the training scores
    pub fn fit(data: &[FeatureRow], config: &ForestConfig) -> Result<Self, InsightError> {
        if data.len() < MIN_TRAINING_ROWS {
            return Err(InsightError::InsufficientTrainingData {
                needed: MIN_TRAINING_ROWS,
                have: data.len(),
            });
        }
        if !(config.contamination > 0.0 && config.contamination <= 0.5) {
            return Err(InsightError::InvalidContamination(config.contamination));
        }

        let sample_size = config.sample_size.clamp(MIN_TRAINING_ROWS, data.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, data.len(), sample_size).into_vec();
                IsolationTree::grow(data, sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            contamination: config.contamination,
            threshold: 0.0,
        };

        let scores: Vec<f64> = data.iter().map(|row| forest.anomaly_score(row)).collect();
        forest.threshold = percentile(&scores, 1.0 - config.contamination);
        Ok(forest)
    }

    /// Normalised anomaly score in (0, 1]; higher is more anomalous
    pub fn anomaly_score(&self, row: &FeatureRow) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / average_path_length(self.sample_size))
    }

    pub fn is_anomaly(&self, row: &FeatureRow) -> bool {
        self.anomaly_score(row) > self.threshold
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated quantile, `q` in [0, 1]
fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}
