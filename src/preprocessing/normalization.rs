//! Нормализация данных (min-max)

use std::collections::BTreeMap;

use crate::config::ConstantColumnPolicy;
use crate::error::{PipelineError, Result};
use crate::preprocessing::feature_engineering::CleanedDataset;
use crate::types::Column;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    fn is_constant(&self) -> bool {
        self.max <= self.min
    }

    fn scale(&self, value: f64) -> f64 {
        if self.is_constant() {
            0.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

pub struct MinMaxScaler {
    columns: Vec<Column>,
    constant_policy: ConstantColumnPolicy,
    ranges: Option<BTreeMap<Column, ColumnRange>>,
}

impl MinMaxScaler {
    pub fn new(columns: Vec<Column>, constant_policy: ConstantColumnPolicy) -> Self {
        Self {
            columns,
            constant_policy,
            ranges: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.ranges.is_some()
    }

    pub fn range(&self, column: Column) -> Option<ColumnRange> {
        self.ranges.as_ref()?.get(&column).copied()
    }

    /// Минимум и максимум по каждой колонке отдельно, NaN игнорируется
    pub fn fit(&mut self, dataset: &CleanedDataset) -> Result<()> {
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset("cannot fit scaler on zero rows"));
        }

        let mut ranges = BTreeMap::new();
        for &column in &self.columns {
            let values = dataset.column(column).ok_or_else(|| PipelineError::MissingColumn {
                column: column.name().to_string(),
            })?;

            let (min, max) = values
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            if !min.is_finite() {
                return Err(PipelineError::EmptyDataset("scaled column has no values"));
            }

            let range = ColumnRange { min, max };
            if range.is_constant() {
                match self.constant_policy {
                    ConstantColumnPolicy::Error => {
                        return Err(PipelineError::DegenerateColumn(column))
                    }
                    ConstantColumnPolicy::Zero => {
                        tracing::warn!("Column {} is constant ({}), scaled to 0", column, min)
                    }
                }
            }
            ranges.insert(column, range);
        }

        self.ranges = Some(ranges);
        Ok(())
    }

    pub fn transform(&self, dataset: &CleanedDataset) -> Result<CleanedDataset> {
        let ranges = self.ranges.as_ref().ok_or(PipelineError::NotFitted)?;

        let mut scaled = dataset.clone();
        for (&column, range) in ranges {
            let idx = scaled.column_index(column).ok_or_else(|| PipelineError::MissingColumn {
                column: column.name().to_string(),
            })?;
            for val in scaled.values.column_mut(idx).iter_mut() {
                if val.is_finite() {
                    *val = range.scale(*val);
                }
            }
        }

        Ok(scaled)
    }

    pub fn fit_transform(&mut self, dataset: &CleanedDataset) -> Result<CleanedDataset> {
        self.fit(dataset)?;
        self.transform(dataset)
    }
}
