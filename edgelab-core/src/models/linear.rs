//! L2-regularized logistic regression on standardized features.
//!
//! Objective (intercept unpenalized):
//!   0.5·‖w‖² + C · Σ sᵢ · [softplus(zᵢ) − yᵢ·zᵢ],   zᵢ = w·x̃ᵢ + b
//! where x̃ is the standardized feature vector and sᵢ the balanced class weight
//! n / (2 · n_class(yᵢ)). Solved with damped Newton steps (backtracking line
//! search on the objective).

use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;

use super::{sigmoid, FeatureImportance, ModelError, ProbabilityEstimator};

/// Smallest pivot accepted by the Newton solve.
const PIVOT_EPSILON: f64 = 1e-12;

/// Step-halving limit for the line search.
const MAX_BACKTRACKS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearModelParams {
    /// Inverse regularization strength. Smaller = stronger shrinkage.
    pub c: f64,
    pub max_iter: usize,
    /// Convergence threshold on the largest Newton step component.
    pub tol: f64,
    /// Reweight samples so both classes carry equal total weight.
    pub balanced: bool,
}

impl Default for LinearModelParams {
    fn default() -> Self {
        Self {
            c: 0.1,
            max_iter: 100,
            tol: 1e-8,
            balanced: true,
        }
    }
}

/// Everything learned by `fit`: scaler, coefficients, importances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedLinear {
    pub names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coef: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    params: LinearModelParams,
    fitted: Option<FittedLinear>,
}

impl LinearModel {
    pub fn new(params: LinearModelParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &LinearModelParams {
        &self.params
    }

    pub fn fitted(&self) -> Option<&FittedLinear> {
        self.fitted.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit on dense rows. Replaces any previous fit.
    pub fn fit_dense(
        &mut self,
        names: &[String],
        x: &[Vec<f64>],
        y: &[u8],
    ) -> Result<(), ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if y.len() != x.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let d = names.len();
        if let Some(bad) = x.iter().find(|row| row.len() != d) {
            return Err(ModelError::DimensionMismatch {
                expected: d,
                actual: bad.len(),
            });
        }
        let positives = y.iter().filter(|&&t| t == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ModelError::SingleClass { class: y[0] });
        }

        let (means, scales) = standardizer(x, d);
        let z: Vec<Vec<f64>> = x
            .iter()
            .map(|row| standardize(row, &means, &scales))
            .collect();
        let weights = sample_weights(y, positives, self.params.balanced);

        let (coef, intercept, iterations) = newton_solve(&z, y, &weights, &self.params)?;

        self.fitted = Some(FittedLinear {
            names: names.to_vec(),
            means,
            scales,
            coef,
            intercept,
            iterations,
        });
        Ok(())
    }

    /// P(up) for a dense vector in fitted feature order.
    pub fn predict_dense(&self, x: &[f64]) -> Result<f64, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        if x.len() != fitted.coef.len() {
            return Err(ModelError::DimensionMismatch {
                expected: fitted.coef.len(),
                actual: x.len(),
            });
        }
        let z = standardize(x, &fitted.means, &fitted.scales);
        Ok(sigmoid(dot(&fitted.coef, &z) + fitted.intercept))
    }

    /// Importances sorted by |standardized coefficient|, largest first.
    pub fn importances(&self) -> Result<Vec<FeatureImportance>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        let mut out: Vec<FeatureImportance> = fitted
            .names
            .iter()
            .zip(&fitted.coef)
            .map(|(name, c)| FeatureImportance {
                name: name.clone(),
                importance: c.abs(),
            })
            .collect();
        out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(out)
    }
}

impl ProbabilityEstimator for LinearModel {
    fn name(&self) -> &str {
        "logistic"
    }

    fn fit(&mut self, names: &[String], x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        self.fit_dense(names, x, y)
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        let x = fitted
            .names
            .iter()
            .map(|n| row.get(n).ok_or_else(|| ModelError::MissingFeature(n.clone())))
            .collect::<Result<Vec<f64>, _>>()?;
        self.predict_dense(&x)
    }

    fn feature_importances(&self) -> Option<Vec<FeatureImportance>> {
        self.importances().ok()
    }
}

/// Column means and population standard deviations. Zero-variance columns get scale 1.
fn standardizer(x: &[Vec<f64>], d: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len() as f64;
    let mut means = vec![0.0; d];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);

    let mut scales = vec![0.0; d];
    for row in x {
        for j in 0..d {
            scales[j] += (row[j] - means[j]).powi(2);
        }
    }
    for s in &mut scales {
        let sd = (*s / n).sqrt();
        *s = if sd > 0.0 { sd } else { 1.0 };
    }
    (means, scales)
}

fn standardize(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(scales)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn sample_weights(y: &[u8], positives: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; y.len()];
    }
    let n = y.len() as f64;
    let w_pos = n / (2.0 * positives as f64);
    let w_neg = n / (2.0 * (y.len() - positives) as f64);
    y.iter().map(|&t| if t == 1 { w_pos } else { w_neg }).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// log(1 + e^z) without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Parameters are packed as [w_0 .. w_{d-1}, b].
fn objective(z: &[Vec<f64>], y: &[u8], s: &[f64], c: f64, theta: &[f64]) -> f64 {
    let d = theta.len() - 1;
    let penalty = 0.5 * theta[..d].iter().map(|w| w * w).sum::<f64>();
    let loss: f64 = z
        .iter()
        .zip(y)
        .zip(s)
        .map(|((row, &t), &si)| {
            let zi = dot(&theta[..d], row) + theta[d];
            si * (softplus(zi) - f64::from(t) * zi)
        })
        .sum();
    penalty + c * loss
}

fn newton_solve(
    z: &[Vec<f64>],
    y: &[u8],
    s: &[f64],
    params: &LinearModelParams,
) -> Result<(Vec<f64>, f64, usize), ModelError> {
    let d = z[0].len();
    let p = d + 1;
    let c = params.c;
    let mut theta = vec![0.0; p];
    let mut current = objective(z, y, s, c, &theta);
    let mut iterations = 0;

    for _ in 0..params.max_iter {
        iterations += 1;

        // Gradient and Hessian.
        let mut grad = vec![0.0; p];
        let mut hess = vec![vec![0.0; p]; p];
        for j in 0..d {
            grad[j] = theta[j];
            hess[j][j] = 1.0;
        }
        for ((row, &t), &si) in z.iter().zip(y).zip(s) {
            let prob = sigmoid(dot(&theta[..d], row) + theta[d]);
            let r = c * si * (prob - f64::from(t));
            let h = c * si * prob * (1.0 - prob);
            for j in 0..d {
                grad[j] += r * row[j];
                let hj = h * row[j];
                for k in j..d {
                    hess[j][k] += hj * row[k];
                }
                hess[j][d] += hj;
            }
            grad[d] += r;
            hess[d][d] += h;
        }
        for j in 0..p {
            for k in 0..j {
                hess[j][k] = hess[k][j];
            }
        }

        let step = solve(hess, grad)?;

        // Backtracking line search.
        let mut t = 1.0;
        let mut candidate: Vec<f64> = theta.iter().zip(&step).map(|(a, b)| a - b).collect();
        let mut value = objective(z, y, s, c, &candidate);
        let mut backtracks = 0;
        while value > current && backtracks < MAX_BACKTRACKS {
            t *= 0.5;
            candidate = theta.iter().zip(&step).map(|(a, b)| a - t * b).collect();
            value = objective(z, y, s, c, &candidate);
            backtracks += 1;
        }
        if value > current {
            break;
        }

        let max_step = step.iter().map(|v| (t * v).abs()).fold(0.0, f64::max);
        theta = candidate;
        current = value;
        if max_step < params.tol {
            break;
        }
    }

    let intercept = theta[d];
    theta.truncate(d);
    Ok((theta, intercept, iterations))
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        let pivot = a[pivot_row][col];
        if pivot.abs() < PIVOT_EPSILON {
            return Err(ModelError::Singular { column: col, pivot });
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
