//! Feature engineering: календарные признаки и разбиения

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{PipelineError, Result};
use crate::stats;
use crate::types::{Column, ColumnSummary, DayKind, Reading, Season};

/// Очищенная таблица: timestamp + числовые колонки.
/// Пропуски во вспомогательных колонках хранятся как NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDataset {
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: Vec<Column>,
    pub values: Array2<f64>,
}

impl CleanedDataset {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn column_index(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    pub fn column(&self, column: Column) -> Option<ArrayView1<'_, f64>> {
        self.column_index(column)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }

    /// count, mean, std (n - 1), min, max по каждой колонке; NaN считается пропуском
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, &column)| {
                let values: Vec<f64> = self
                    .values
                    .index_axis(Axis(1), idx)
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                let mean = stats::mean(&values);
                let std = mean.filter(|_| values.len() > 1).map(|m| {
                    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
                    (ss / (values.len() - 1) as f64).sqrt()
                });
                ColumnSummary {
                    column,
                    count: values.len(),
                    nulls: self.n_rows() - values.len(),
                    mean,
                    std,
                    min: values.iter().copied().reduce(f64::min),
                    max: values.iter().copied().reduce(f64::max),
                }
            })
            .collect()
    }

    fn require_index(&self, column: Column) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: column.name().to_string(),
            })
    }

    /// Матрица из выбранных колонок в заданном порядке
    pub fn select(&self, columns: &[Column]) -> Result<Array2<f64>> {
        let indices = columns
            .iter()
            .map(|&c| self.require_index(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.values.select(Axis(1), &indices))
    }
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Колонки очищенного файла: измерения, затем hour, day_of_week, month
    pub fn dataset_columns() -> Vec<Column> {
        Column::MEASUREMENTS
            .iter()
            .chain(Column::CALENDAR.iter())
            .copied()
            .collect()
    }

    pub fn build_dataset(readings: &[Reading]) -> CleanedDataset {
        let columns = Self::dataset_columns();
        let mut values = Array2::zeros((readings.len(), columns.len()));

        for (i, reading) in readings.iter().enumerate() {
            for (j, &column) in columns.iter().enumerate() {
                values[[i, j]] = reading.value(column).unwrap_or(f64::NAN);
            }
        }

        CleanedDataset {
            timestamps: readings.iter().map(|r| r.timestamp).collect(),
            columns,
            values,
        }
    }

    /// Признаки и целевая переменная для модели
    pub fn feature_matrix(
        dataset: &CleanedDataset,
        features: &[Column],
        target: Column,
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        let x = dataset.select(features)?;
        let y = dataset
            .column(target)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: target.name().to_string(),
            })?
            .to_owned();

        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(PipelineError::Shape {
                expected: "finite feature and target values".to_string(),
                actual: "missing values in model columns".to_string(),
            });
        }
        Ok((x, y))
    }

    /// Будни (day_of_week < 5) и выходные
    pub fn partition_by_day_kind(readings: &[Reading]) -> (Vec<Reading>, Vec<Reading>) {
        readings
            .iter()
            .cloned()
            .partition(|r| r.calendar().day_kind() == DayKind::Weekday)
    }

    pub fn partition_by_season(readings: &[Reading]) -> BTreeMap<Season, Vec<Reading>> {
        let mut seasons: BTreeMap<Season, Vec<Reading>> =
            Season::ALL.iter().map(|&s| (s, Vec::new())).collect();
        for reading in readings {
            seasons
                .entry(reading.calendar().season())
                .or_default()
                .push(reading.clone());
        }
        seasons
    }
}
