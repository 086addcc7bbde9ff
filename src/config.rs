//! Конфигурация пайплайна
//!
//! Все поля имеют значения по умолчанию;
//! JSON-файл может переопределить любую секцию частично.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::types::Column;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub outliers: OutlierConfig,
    #[serde(default)]
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_missing_marker")]
    pub missing_marker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Удалить строки с пропусками, затем заполнить средним
    DropThenFill,
    Drop,
    Fill,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_null_policy")]
    pub null_policy: NullPolicy,
    #[serde(default = "default_required_columns")]
    pub required_columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Порядок важен: каждый шаг фильтрует результат предыдущего.
    /// Sub_metering_3 намеренно не фильтруется.
    #[serde(default = "default_outlier_columns")]
    pub columns: Vec<Column>,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantColumnPolicy {
    Zero,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingConfig {
    #[serde(default = "default_scale_columns")]
    pub columns: Vec<Column>,
    #[serde(default = "default_constant_policy")]
    pub constant_columns: ConstantColumnPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_features")]
    pub features: Vec<Column>,
    #[serde(default = "default_target")]
    pub target: Column,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub split_seed: u64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_seed")]
    pub random_state: u64,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_linear_reference")]
    pub linear_reference: bool,
}

fn default_delimiter() -> char {
    ';'
}

fn default_missing_marker() -> String {
    "?".to_string()
}

fn default_null_policy() -> NullPolicy {
    NullPolicy::DropThenFill
}

fn default_required_columns() -> Vec<Column> {
    Column::REQUIRED.to_vec()
}

fn default_outlier_columns() -> Vec<Column> {
    vec![Column::GlobalActivePower, Column::SubMetering1, Column::SubMetering2]
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

fn default_scale_columns() -> Vec<Column> {
    vec![
        Column::GlobalActivePower,
        Column::Hour,
        Column::SubMetering2,
        Column::SubMetering3,
        Column::Month,
    ]
}

fn default_constant_policy() -> ConstantColumnPolicy {
    ConstantColumnPolicy::Zero
}

fn default_features() -> Vec<Column> {
    vec![Column::SubMetering3, Column::Hour, Column::DayOfWeek, Column::Month]
}

fn default_target() -> Column {
    Column::GlobalActivePower
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_linear_reference() -> bool {
    true
}


impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            missing_marker: default_missing_marker(),
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            null_policy: default_null_policy(),
            required_columns: default_required_columns(),
        }
    }
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            columns: default_outlier_columns(),
            iqr_multiplier: default_iqr_multiplier(),
        }
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            columns: default_scale_columns(),
            constant_columns: default_constant_policy(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            features: default_features(),
            target: default_target(),
            test_fraction: default_test_fraction(),
            split_seed: default_seed(),
            n_estimators: default_n_estimators(),
            random_state: default_seed(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            linear_reference: default_linear_reference(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Ingest {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.loader.delimiter.is_ascii() {
            return Err(PipelineError::Config("delimiter must be an ASCII character".into()));
        }
        if self.cleaning.required_columns.iter().any(|c| c.is_calendar()) {
            return Err(PipelineError::Config(
                "required columns must be input measurement columns".into(),
            ));
        }
        if self.outliers.iqr_multiplier.is_nan() || self.outliers.iqr_multiplier <= 0.0 {
            return Err(PipelineError::Config("iqr_multiplier must be positive".into()));
        }
        if self.model.features.is_empty() {
            return Err(PipelineError::Config("model.features must not be empty".into()));
        }
        if self.model.features.contains(&self.model.target) {
            return Err(PipelineError::Config("model.target must not be a feature".into()));
        }
        if !(self.model.test_fraction > 0.0 && self.model.test_fraction < 1.0) {
            return Err(PipelineError::Config("test_fraction must be in (0, 1)".into()));
        }
        if self.model.n_estimators == 0 {
            return Err(PipelineError::Config("n_estimators must be at least 1".into()));
        }
        if self.model.min_samples_split < 2 || self.model.min_samples_leaf == 0 {
            return Err(PipelineError::Config(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Вывод конфигурации в лог
    pub fn log_config(&self) {
        let names = |cols: &[Column]| {
            cols.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        };
        tracing::info!("Configuration:");
        tracing::info!("  null policy      : {:?}", self.cleaning.null_policy);
        tracing::info!(
            "  outlier columns  : [{}] (k = {})",
            names(&self.outliers.columns),
            self.outliers.iqr_multiplier
        );
        tracing::info!("  scaled columns   : [{}]", names(&self.scaling.columns));
        tracing::info!(
            "  features         : [{}] -> {}",
            names(&self.model.features),
            self.model.target
        );
        tracing::info!(
            "  trees / seed     : {} / {}",
            self.model.n_estimators,
            self.model.random_state
        );
    }
}
