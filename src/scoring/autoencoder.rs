//! Autoencoder Scorer (C4): reconstruction-error anomaly score after
//! standard scaling (§4.4). Architecture matches the original service's
//! `nn.Module` exactly — encoder 34→64→16, decoder 16→64→34, ReLU on every
//! hidden/latent layer, linear output — but training here is plain SGD
//! rather than Adam: this stack carries no autodiff/tensor crate, and §1
//! places training fidelity itself out of core scope as long as the loaded
//! artifact reproduces the contracted score function.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::FEATURE_COUNT;

const HIDDEN_DIM: usize = 64;
const LATENT_DIM: usize = 16;
const EPOCHS: usize = 50;
const LEARNING_RATE: f64 = 0.01;
const TRAINING_SEED: u64 = 42;
const NORMALIZATION_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    mean: [f64; FEATURE_COUNT],
    std: [f64; FEATURE_COUNT],
}

impl Scaler {
    pub fn fit(data: &[[f64; FEATURE_COUNT]]) -> Self {
        let n = data.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for row in data {
            for (i, v) in row.iter().enumerate() {
                mean[i] += v / n;
            }
        }
        let mut variance = [0.0; FEATURE_COUNT];
        for row in data {
            for (i, v) in row.iter().enumerate() {
                variance[i] += (v - mean[i]).powi(2) / n;
            }
        }
        let std = variance.map(|v| {
            let s = v.sqrt();
            if s > f64::EPSILON { s } else { 1.0 }
        });
        Scaler { mean, std }
    }

    pub fn transform(&self, x: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (x[i] - self.mean[i]) / self.std[i];
        }
        out
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn relu_deriv(v: f64) -> f64 {
    if v > 0.0 { 1.0 } else { 0.0 }
}

fn matvec(w: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    w.iter().map(|row| row.iter().zip(x).map(|(a, b)| a * b).sum::<f64>()).collect()
}

fn add_assign(a: &mut [f64], b: &[f64]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    let scale = (1.0 / cols as f64).sqrt();
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.random_range(-scale..scale)).collect())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autoencoder {
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    w2: Vec<Vec<f64>>,
    b2: Vec<f64>,
    w3: Vec<Vec<f64>>,
    b3: Vec<f64>,
    w4: Vec<Vec<f64>>,
    b4: Vec<f64>,
}

struct ForwardPass {
    z1: Vec<f64>,
    a1: Vec<f64>,
    z2: Vec<f64>,
    a2: Vec<f64>,
    z3: Vec<f64>,
    a3: Vec<f64>,
    out: Vec<f64>,
}

impl Autoencoder {
    fn new_random(rng: &mut StdRng) -> Self {
        Autoencoder {
            w1: random_matrix(rng, HIDDEN_DIM, FEATURE_COUNT),
            b1: vec![0.0; HIDDEN_DIM],
            w2: random_matrix(rng, LATENT_DIM, HIDDEN_DIM),
            b2: vec![0.0; LATENT_DIM],
            w3: random_matrix(rng, HIDDEN_DIM, LATENT_DIM),
            b3: vec![0.0; HIDDEN_DIM],
            w4: random_matrix(rng, FEATURE_COUNT, HIDDEN_DIM),
            b4: vec![0.0; FEATURE_COUNT],
        }
    }

    fn forward(&self, x: &[f64]) -> ForwardPass {
        let mut z1 = matvec(&self.w1, x);
        add_assign(&mut z1, &self.b1);
        let a1: Vec<f64> = z1.iter().map(|v| relu(*v)).collect();

        let mut z2 = matvec(&self.w2, &a1);
        add_assign(&mut z2, &self.b2);
        let a2: Vec<f64> = z2.iter().map(|v| relu(*v)).collect();

        let mut z3 = matvec(&self.w3, &a2);
        add_assign(&mut z3, &self.b3);
        let a3: Vec<f64> = z3.iter().map(|v| relu(*v)).collect();

        let mut out = matvec(&self.w4, &a3);
        add_assign(&mut out, &self.b4);

        ForwardPass { z1, a1, z2, a2, z3, a3, out }
    }

    /// One SGD step on a single sample, reconstructing `x` from itself.
    fn train_step(&mut self, x: &[f64], lr: f64) -> f64 {
        let fp = self.forward(x);

        let d_out: Vec<f64> = fp.out.iter().zip(x).map(|(o, t)| 2.0 * (o - t) / FEATURE_COUNT as f64).collect();
        let loss: f64 = fp.out.iter().zip(x).map(|(o, t)| (o - t).powi(2)).sum::<f64>() / FEATURE_COUNT as f64;

        let d_a3 = mat_t_vec(&self.w4, &d_out);
        update_layer(&mut self.w4, &mut self.b4, &d_out, &fp.a3, lr);

        let d_z3: Vec<f64> = d_a3.iter().zip(&fp.z3).map(|(d, z)| d * relu_deriv(*z)).collect();
        let d_a2 = mat_t_vec(&self.w3, &d_z3);
        update_layer(&mut self.w3, &mut self.b3, &d_z3, &fp.a2, lr);

        let d_z2: Vec<f64> = d_a2.iter().zip(&fp.z2).map(|(d, z)| d * relu_deriv(*z)).collect();
        let d_a1 = mat_t_vec(&self.w2, &d_z2);
        update_layer(&mut self.w2, &mut self.b2, &d_z2, &fp.a1, lr);

        let d_z1: Vec<f64> = d_a1.iter().zip(&fp.z1).map(|(d, z)| d * relu_deriv(*z)).collect();
        update_layer(&mut self.w1, &mut self.b1, &d_z1, x, lr);

        loss
    }

    /// Trains from scratch on `data` (already standard-scaled), 50 epochs
    /// of plain SGD over the full dataset, matching the original's epoch
    /// count.
    pub fn train(data: &[[f64; FEATURE_COUNT]]) -> Self {
        let mut rng = StdRng::seed_from_u64(TRAINING_SEED);
        let mut model = Autoencoder::new_random(&mut rng);
        for epoch in 0..EPOCHS {
            let mut epoch_loss = 0.0;
            for row in data {
                epoch_loss += model.train_step(row, LEARNING_RATE);
            }
            if epoch % 10 == 0 {
                tracing::debug!(epoch, loss = epoch_loss / data.len() as f64, "autoencoder training");
            }
        }
        model
    }

    /// Mean-squared reconstruction error over the standard-scaled input,
    /// scaled by `NORMALIZATION_FACTOR` and clamped to `[0, 1]` (§4.4).
    pub fn score(&self, scaled: &[f64; FEATURE_COUNT]) -> f64 {
        let fp = self.forward(scaled);
        let mse: f64 =
            fp.out.iter().zip(scaled).map(|(o, t)| (o - t).powi(2)).sum::<f64>() / FEATURE_COUNT as f64;
        (mse * NORMALIZATION_FACTOR).min(1.0)
    }
}

fn mat_t_vec(w: &[Vec<f64>], d: &[f64]) -> Vec<f64> {
    let cols = w[0].len();
    let mut out = vec![0.0; cols];
    for (row, dv) in w.iter().zip(d) {
        for (o, wv) in out.iter_mut().zip(row) {
            *o += wv * dv;
        }
    }
    out
}

fn update_layer(w: &mut [Vec<f64>], b: &mut [f64], d_out: &[f64], input: &[f64], lr: f64) {
    for (row, dv) in w.iter_mut().zip(d_out) {
        for (wv, iv) in row.iter_mut().zip(input) {
            *wv -= lr * dv * iv;
        }
    }
    for (bv, dv) in b.iter_mut().zip(d_out) {
        *bv -= lr * dv;
    }
}
