//! Последовательный запуск этапов: загрузка, очистка, признаки, прогноз
//!
//! Каждый этап получает вход по ссылке и возвращает новую таблицу.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{Predictor, TrendAnalyzer};
use crate::preprocessing::cleaning::{correlation_ranking, log_correlations};
use crate::preprocessing::outliers::{box_summaries, remove_outliers_sequential};
use crate::preprocessing::{
    load_raw, CleanedDataset, Cleaner, FeatureEngineer, MinMaxScaler, RawTable,
};
use crate::storage;
use crate::types::{ColumnSummary, PipelineReport};

/// Результат подготовки данных до записи на диск
#[derive(Debug, Clone)]
pub struct Prepared {
    pub dataset: CleanedDataset,
    pub report: PipelineReport,
}

/// Очистка, выбросы, тренды и масштабирование
pub fn prepare(raw: &RawTable, config: &PipelineConfig) -> Result<Prepared> {
    let cleaner = Cleaner::new(config.cleaning.clone(), config.loader.missing_marker.clone());
    let (readings, cleaning) = cleaner.clean(raw)?;

    let k = config.outliers.iqr_multiplier;
    let box_before = box_summaries(&readings, k);
    let (filtered, outlier_steps) =
        remove_outliers_sequential(&readings, &config.outliers.columns, k);
    let box_after = box_summaries(&filtered, k);

    let correlations_after_outliers = correlation_ranking(&filtered);
    log_correlations("Correlation after outlier removal", &correlations_after_outliers);

    let trends = TrendAnalyzer::analyze(&filtered);

    let unscaled = FeatureEngineer::build_dataset(&filtered);
    let mut scaler = MinMaxScaler::new(
        config.scaling.columns.clone(),
        config.scaling.constant_columns,
    );
    let dataset = scaler.fit_transform(&unscaled)?;

    let cleaned_summary = dataset.describe();
    log_summary(&dataset, &cleaned_summary);

    let report = PipelineReport {
        cleaning,
        box_before,
        box_after,
        outlier_steps,
        correlations_after_outliers,
        trends,
        cleaned_rows: dataset.n_rows(),
        cleaned_summary,
        prediction: None,
    };
    Ok(Prepared { dataset, report })
}

/// Полный прогон: входной файл -> очищенный файл -> модель
pub fn run(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    train_model: bool,
) -> Result<PipelineReport> {
    let raw = load_raw(input, &config.loader)?;
    let Prepared { dataset, mut report } = prepare(&raw, config)?;
    storage::write_cleaned(output, &dataset)?;

    if train_model {
        // Модель обучается на перечитанном файле
        let cleaned = storage::read_cleaned(output)?;
        let prediction = Predictor::new(config.model.clone()).run(&cleaned)?;
        report.prediction = Some(prediction);
    }

    Ok(report)
}

fn log_summary(dataset: &CleanedDataset, summary: &[ColumnSummary]) {
    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));

    tracing::info!("Cleaned dataset: {} rows", dataset.n_rows());
    if let (Some(first), Some(last)) = (dataset.timestamps.first(), dataset.timestamps.last()) {
        tracing::info!("  span: {} .. {}", first, last);
    }
    for s in summary {
        tracing::info!(
            "  {:<22} count {:>7} nulls {:>5} mean {} std {} min {} max {}",
            s.column.name(),
            s.count,
            s.nulls,
            show(s.mean),
            show(s.std),
            show(s.min),
            show(s.max)
        );
    }
}

pub fn write_report(path: &Path, report: &PipelineReport) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report).map_err(std::io::Error::from)?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
