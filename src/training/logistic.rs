//! Binary logistic regression

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};
use crate::training::models::Estimator;

/// Optimizer tag carried through hyperparameter logging.
///
/// Both variants run the same damped gradient descent here; the tag exists so
/// grid configurations and tracking records stay comparable across
/// reimplementations of this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    Liblinear,
    Lbfgs,
}

impl std::str::FromStr for Solver {
    type Err = HeartError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "liblinear" => Ok(Solver::Liblinear),
            "lbfgs" => Ok(Solver::Lbfgs),
            other => Err(HeartError::InvalidParameter {
                name: "solver".to_string(),
                value: other.to_string(),
                reason: "expected liblinear or lbfgs".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Solver::Liblinear => f.write_str("liblinear"),
            Solver::Lbfgs => f.write_str("lbfgs"),
        }
    }
}

/// L2-regularized binary logistic regression fit by gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse regularization strength (sklearn-style C)
    pub c: f64,
    pub solver: Solver,
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    pub learning_rate: f64,
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            solver: Solver::Lbfgs,
            max_iter: 500,
            tol: 1e-6,
            learning_rate: 0.1,
            is_fitted: false,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartError::Training(format!(
                "x has {} rows but y has {} entries",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(HeartError::Training("empty training set".to_string()));
        }

        // C is the inverse regularization strength; normalize by n so the
        // penalty stays comparable across dataset sizes.
        let alpha = 1.0 / (self.c * n_samples as f64);

        let mut weights: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0;
        let lr = self.learning_rate;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * &dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(HeartError::ModelNotFitted);
        }
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(HeartError::ModelNotFitted)?;
        let intercept = self.intercept.unwrap_or(0.0);

        let linear = x.dot(coefficients) + intercept;
        Ok(Self::sigmoid(&linear))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_separable_data() {
        // Single feature, cleanly separated at 0.
        let x = array![[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new().with_c(10.0).with_max_iter(2000);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p - **t).abs() < 0.5)
            .count();
        assert_eq!(correct, 8);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5 && proba[7] > 0.5);
    }

    #[test]
    fn test_solver_parsing() {
        assert_eq!("liblinear".parse::<Solver>().unwrap(), Solver::Liblinear);
        assert_eq!("lbfgs".parse::<Solver>().unwrap(), Solver::Lbfgs);
        assert!("saga".parse::<Solver>().is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let x = Array2::zeros((3, 2));
        let y = array![0.0, 1.0];
        let mut model = LogisticRegression::new();
        assert!(model.fit(&x, &y).is_err());
    }
}
