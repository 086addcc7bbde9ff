/// ML модели и анализ трендов

pub mod evaluation;
pub mod linear_baseline;
pub mod predictor;
pub mod random_forest;
pub mod trends;

pub use linear_baseline::LinearBaseline;
pub use predictor::Predictor;
pub use random_forest::RandomForestRegressor;
pub use trends::TrendAnalyzer;
