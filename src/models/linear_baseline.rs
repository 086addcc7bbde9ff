/// Линейная модель как точка отсчёта для леса

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2};

use crate::models::evaluation::{mean_squared_error, r2_score};
use crate::types::RegressionMetrics;

pub struct LinearBaseline {
    model: Option<FittedLinearRegression<f64>>,
}

impl LinearBaseline {
    pub fn new() -> Self {
        Self { model: None }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), String> {
        if x.nrows() < 2 {
            return Err("Need at least 2 rows for linear regression".to_string());
        }
        let dataset = Dataset::new(x.clone(), y.clone());
        let model = LinearRegression::default()
            .fit(&dataset)
            .map_err(|e: linfa_linear::LinearError<f64>| format!("Linear fit failed: {}", e))?;
        self.model = Some(model);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, String> {
        let model = self.model.as_ref().ok_or("Model not trained")?;
        Ok(model.predict(x))
    }

    pub fn evaluate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<RegressionMetrics, String> {
        let pred = self.predict(x)?;
        Ok(RegressionMetrics {
            mse: mean_squared_error(y, &pred),
            r2: r2_score(y, &pred),
        })
    }
}

impl Default for LinearBaseline {
    fn default() -> Self {
        Self::new()
    }
}
