//! Прогноз потребления по календарным признакам

use ndarray::Axis;

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::models::evaluation::{mean_squared_error, r2_score, train_test_split};
use crate::models::linear_baseline::LinearBaseline;
use crate::models::random_forest::RandomForestRegressor;
use crate::preprocessing::{CleanedDataset, FeatureEngineer};
use crate::types::{FeatureImportance, PredictionReport};

pub struct Predictor {
    config: ModelConfig,
}

impl Predictor {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, dataset: &CleanedDataset) -> Result<PredictionReport> {
        if dataset.n_rows() < 2 {
            return Err(PipelineError::EmptyDataset("need at least 2 cleaned rows to train"));
        }

        let (x, y) =
            FeatureEngineer::feature_matrix(dataset, &self.config.features, self.config.target)?;

        // Разделение на train/test
        let split = train_test_split(x.nrows(), self.config.test_fraction, self.config.split_seed)?;
        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let x_test = x.select(Axis(0), &split.test);
        let y_test = y.select(Axis(0), &split.test);
        tracing::info!("Train rows: {}, test rows: {}", split.train.len(), split.test.len());

        // Обучение леса
        let mut forest = RandomForestRegressor::new(self.config.n_estimators)
            .with_random_state(self.config.random_state)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf);
        forest.fit(&x_train, &y_train)?;

        let y_pred = forest.predict(&x_test)?;
        let model_accuracy = forest.score(&x_test, &y_test)?;
        let mse = mean_squared_error(&y_test, &y_pred);
        let r2 = r2_score(&y_test, &y_pred);

        tracing::info!("Model Accuracy: {}", model_accuracy);
        tracing::info!("Mean Squared Error: {}", mse);
        tracing::info!("R-squared: {}", r2);

        let importances = forest.feature_importances().ok_or(PipelineError::NotFitted)?;
        let feature_importances: Vec<FeatureImportance> = self
            .config
            .features
            .iter()
            .zip(importances.iter())
            .map(|(&feature, &importance)| FeatureImportance { feature, importance })
            .collect();
        for fi in &feature_importances {
            tracing::info!("{}: {}", fi.feature, fi.importance);
        }

        // Линейная модель для сравнения; её ошибка не прерывает прогон
        let linear_reference = if self.config.linear_reference {
            let mut baseline = LinearBaseline::new();
            match baseline
                .fit(&x_train, &y_train)
                .and_then(|_| baseline.evaluate(&x_test, &y_test))
            {
                Ok(metrics) => {
                    tracing::info!(
                        "Linear reference: MSE {}, R-squared {}",
                        metrics.mse,
                        metrics.r2
                    );
                    Some(metrics)
                }
                Err(e) => {
                    tracing::warn!("Linear reference skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(PredictionReport {
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            model_accuracy,
            mse,
            r2,
            feature_importances,
            linear_reference,
        })
    }
}
