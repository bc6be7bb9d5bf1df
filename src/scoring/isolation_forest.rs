//! Isolation-Forest Scorer (C3): an ensemble of random trees whose average
//! isolation depth serves as an inverse anomaly indicator (§4.3).
//!
//! Built from scratch — there is no sklearn-equivalent crate in this stack —
//! following the original paper's formulation that the teacher's upstream
//! Python service already implements via `sklearn.ensemble.IsolationForest`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::FEATURE_COUNT;

const N_ESTIMATORS: usize = 100;
const MAX_SAMPLES: usize = 256;
const TRAINING_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Internal {
        feature: usize,
        split_value: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(
        data: &[[f64; FEATURE_COUNT]],
        indices: Vec<usize>,
        depth: u32,
        height_limit: u32,
        rng: &mut StdRng,
        nodes: &mut Vec<Node>,
    ) -> usize {
        if depth >= height_limit || indices.len() <= 1 {
            let idx = nodes.len();
            nodes.push(Node::Leaf { size: indices.len().max(1) });
            return idx;
        }

        let feature = rng.random_range(0..FEATURE_COUNT);
        let mut min_val = f64::INFINITY;
        let mut max_val = f64::NEG_INFINITY;
        for &i in &indices {
            let v = data[i][feature];
            min_val = min_val.min(v);
            max_val = max_val.max(v);
        }

        if (max_val - min_val).abs() < f64::EPSILON {
            let idx = nodes.len();
            nodes.push(Node::Leaf { size: indices.len() });
            return idx;
        }

        let split_value = rng.random_range(min_val..max_val);
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[i][feature] < split_value);

        let placeholder = nodes.len();
        nodes.push(Node::Leaf { size: 0 });

        let left = Self::build(data, left_indices, depth + 1, height_limit, rng, nodes);
        let right = Self::build(data, right_indices, depth + 1, height_limit, rng, nodes);

        nodes[placeholder] = Node::Internal { feature, split_value, left, right };
        placeholder
    }

    fn path_length(&self, point: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node_idx = 0usize;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node_idx] {
                Node::Leaf { size } => return depth + average_path_length(*size as f64),
                Node::Internal { feature, split_value, left, right } => {
                    depth += 1.0;
                    node_idx = if point[*feature] < *split_value { *left } else { *right };
                }
            }
        }
    }
}

/// `c(n)` — the average path length of an unsuccessful BST search over `n`
/// points, used to normalize raw path lengths into a score independent of
/// subsample size (Liu, Ting & Zhou, 2008).
fn average_path_length(n: f64) -> f64 {
    if n <= 1.0 {
        0.0
    } else {
        2.0 * (harmonic_number(n - 1.0)) - (2.0 * (n - 1.0) / n)
    }
}

fn harmonic_number(n: f64) -> f64 {
    const EULER_MASCHERONI: f64 = 0.5772156649015329;
    n.ln() + EULER_MASCHERONI + 1.0 / (2.0 * n) - 1.0 / (12.0 * n * n)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
}

impl IsolationForest {
    /// Trains `N_ESTIMATORS` trees, each on a random subsample of
    /// `min(MAX_SAMPLES, data.len())` rows without replacement, seeded
    /// deterministically so the same synthetic dataset always produces a
    /// bitwise-identical forest (P7).
    pub fn train(data: &[[f64; FEATURE_COUNT]]) -> Self {
        let subsample_size = MAX_SAMPLES.min(data.len());
        let height_limit = (subsample_size as f64).log2().ceil() as u32;

        let trees = (0..N_ESTIMATORS)
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(TRAINING_SEED + tree_idx as u64);
                let mut all_indices: Vec<usize> = (0..data.len()).collect();
                let mut sample = Vec::with_capacity(subsample_size);
                for _ in 0..subsample_size {
                    let pick = rng.random_range(0..all_indices.len());
                    sample.push(all_indices.swap_remove(pick));
                }
                let mut nodes = Vec::new();
                IsolationTree::build(data, sample, 0, height_limit, &mut rng, &mut nodes);
                IsolationTree { nodes }
            })
            .collect();

        IsolationForest { trees, subsample_size }
    }

    /// `s(x, n) = 2^(-E(h(x)) / c(psi))`, clamped to `[0, 1]`. Values near 1
    /// indicate anomalies (§4.3): more negative the source's raw
    /// `score_samples` output, more anomalous, and this is its negation.
    pub fn score(&self, point: &[f64; FEATURE_COUNT]) -> f64 {
        let avg_path: f64 =
            self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64;
        let c_psi = average_path_length(self.subsample_size as f64);
        if c_psi <= 0.0 {
            return 0.5;
        }
        let s = 2f64.powf(-avg_path / c_psi);
        s.clamp(0.0, 1.0)
    }
}
