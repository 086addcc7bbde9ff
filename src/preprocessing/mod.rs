/// Модуль предобработки данных

pub mod cleaning;
pub mod feature_engineering;
pub mod loader;
pub mod normalization;
pub mod outliers;

pub use cleaning::Cleaner;
pub use feature_engineering::{CleanedDataset, FeatureEngineer};
pub use loader::{load_raw, RawTable};
pub use normalization::MinMaxScaler;
