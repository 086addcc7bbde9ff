//! Очистка данных: дубликаты, пропуски, приведение типов

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::config::{CleaningConfig, NullPolicy};
use crate::error::Result;
use crate::preprocessing::loader::{RawRecord, RawTable};
use crate::stats;
use crate::types::{CleaningSummary, Column, CorrelationEntry, NullShare, Reading};

const N_MEASUREMENTS: usize = Column::MEASUREMENTS.len();

/// Строка после приведения типов, до обработки пропусков
#[derive(Debug, Clone, PartialEq)]
struct NumericRow {
    timestamp: NaiveDateTime,
    values: [Option<f64>; N_MEASUREMENTS],
}

pub struct Cleaner {
    config: CleaningConfig,
    missing_marker: String,
}

impl Cleaner {
    pub fn new(config: CleaningConfig, missing_marker: impl Into<String>) -> Self {
        Self {
            config,
            missing_marker: missing_marker.into(),
        }
    }

    pub fn clean(&self, table: &RawTable) -> Result<(Vec<Reading>, CleaningSummary)> {
        let input_rows = table.len();
        tracing::info!("Cleaning {} rows", input_rows);

        // 1. Дубликаты
        let (unique, duplicates_removed) = deduplicate(&table.records);
        let (unique, timestamp_conflicts_removed) = drop_timestamp_conflicts(unique);
        tracing::info!("Number of duplicated rows: {}", duplicates_removed);
        if timestamp_conflicts_removed > 0 {
            tracing::warn!(
                "Dropped {} rows repeating an earlier timestamp with different values",
                timestamp_conflicts_removed
            );
        }

        // 2-3. Маркер пропуска -> None, приведение к числам
        let rows: Vec<NumericRow> = unique
            .iter()
            .map(|record| self.coerce_record(record))
            .collect();

        let null_percentages = null_percentages(&rows);
        for share in &null_percentages {
            tracing::debug!("Missing {}: {:.2}%", share.column, share.percent);
        }

        // 4. Политика пропусков
        let before_drop = rows.len();
        let (rows, values_filled) = match self.config.null_policy {
            NullPolicy::DropThenFill => {
                let rows = self.drop_nulls(rows);
                self.fill_with_mean(rows)
            }
            NullPolicy::Drop => (self.drop_nulls(rows), 0),
            NullPolicy::Fill => self.fill_with_mean(rows),
        };

        let readings: Vec<Reading> = rows.into_iter().filter_map(into_reading).collect();
        let rows_dropped_for_nulls = before_drop - readings.len();
        tracing::info!(
            "Dropped {} rows with missing values, filled {} values",
            rows_dropped_for_nulls,
            values_filled
        );

        let correlations = correlation_ranking(&readings);
        log_correlations("Correlation with Global_active_power", &correlations);

        let summary = CleaningSummary {
            input_rows,
            duplicates_removed,
            timestamp_conflicts_removed,
            null_percentages,
            rows_dropped_for_nulls,
            values_filled,
            output_rows: readings.len(),
            correlations,
        };
        tracing::info!("Clean dataset: {} rows", readings.len());

        Ok((readings, summary))
    }

    fn coerce_record(&self, record: &RawRecord) -> NumericRow {
        let mut values = [None; N_MEASUREMENTS];
        for (slot, raw) in values.iter_mut().zip(&record.fields) {
            *slot = if raw == &self.missing_marker {
                None
            } else {
                coerce_numeric(raw)
            };
        }
        NumericRow {
            timestamp: record.timestamp,
            values,
        }
    }

    fn drop_nulls(&self, rows: Vec<NumericRow>) -> Vec<NumericRow> {
        let required = required_indices(&self.config.required_columns);
        rows.into_iter()
            .filter(|row| required.iter().all(|&i| row.values[i].is_some()))
            .collect()
    }

    /// Заполнение пропусков средним по колонке
    fn fill_with_mean(&self, mut rows: Vec<NumericRow>) -> (Vec<NumericRow>, usize) {
        let mut filled = 0;
        for idx in required_indices(&self.config.required_columns) {
            let present: Vec<f64> = rows.iter().filter_map(|r| r.values[idx]).collect();
            let Some(mean) = stats::mean(&present) else {
                continue;
            };
            for row in rows.iter_mut().filter(|r| r.values[idx].is_none()) {
                row.values[idx] = Some(mean);
                filled += 1;
            }
        }
        (rows, filled)
    }
}

/// Удаление полностью совпадающих строк (включая timestamp), первая остаётся
pub fn deduplicate(records: &[RawRecord]) -> (Vec<RawRecord>, usize) {
    let mut seen: HashSet<&RawRecord> = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record) {
            unique.push(record.clone());
        }
    }
    let removed = records.len() - unique.len();
    (unique, removed)
}

fn drop_timestamp_conflicts(records: Vec<RawRecord>) -> (Vec<RawRecord>, usize) {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let kept: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.timestamp))
        .collect();
    let removed = total - kept.len();
    (kept, removed)
}

/// Нечисловое или нефинитное значение становится пропуском, без ошибки
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn required_indices(columns: &[Column]) -> Vec<usize> {
    columns
        .iter()
        .filter_map(|c| Column::MEASUREMENTS.iter().position(|m| m == c))
        .collect()
}

fn null_percentages(rows: &[NumericRow]) -> Vec<NullShare> {
    Column::MEASUREMENTS
        .iter()
        .enumerate()
        .map(|(idx, &column)| {
            let nulls = rows.iter().filter(|r| r.values[idx].is_none()).count();
            let percent = if rows.is_empty() {
                0.0
            } else {
                (nulls as f64 / rows.len() as f64 * 100.0 * 100.0).round() / 100.0
            };
            NullShare { column, percent }
        })
        .collect()
}

fn into_reading(row: NumericRow) -> Option<Reading> {
    let [gap, grp, voltage, intensity, sm1, sm2, sm3] = row.values;
    Some(Reading {
        timestamp: row.timestamp,
        global_active_power: gap?,
        global_reactive_power: grp,
        voltage,
        global_intensity: intensity,
        sub_metering_1: sm1?,
        sub_metering_2: sm2?,
        sub_metering_3: sm3?,
    })
}

/// Корреляция всех измерений с Global_active_power, по убыванию
pub fn correlation_ranking(readings: &[Reading]) -> Vec<CorrelationEntry> {
    let mut ranking: Vec<CorrelationEntry> = Column::MEASUREMENTS
        .iter()
        .map(|&column| {
            let pairs: Vec<(f64, f64)> = readings
                .iter()
                .filter_map(|r| r.value(column).map(|v| (v, r.global_active_power)))
                .collect();
            CorrelationEntry {
                column,
                correlation: stats::pearson(&pairs),
            }
        })
        .collect();

    ranking.sort_by(|a, b| match (a.correlation, b.correlation) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranking
}

pub fn log_correlations(title: &str, ranking: &[CorrelationEntry]) {
    tracing::info!("{}:", title);
    for entry in ranking {
        match entry.correlation {
            Some(c) => tracing::info!("  {:<24} {:>8.4}", entry.column.name(), c),
            None => tracing::info!("  {:<24} {:>8}", entry.column.name(), "NaN"),
        }
    }
}
