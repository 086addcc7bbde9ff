//! Удаление выбросов по правилу межквартильного размаха

use crate::stats::{quantile_sorted, sorted_finite};
use crate::types::{BoxSummary, Column, OutlierStep, Reading};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// None для пустой выборки
    pub fn compute(values: impl IntoIterator<Item = f64>, multiplier: f64) -> Option<Self> {
        let sorted = sorted_finite(values);
        if sorted.is_empty() {
            return None;
        }
        Some(Self::from_sorted(&sorted, multiplier))
    }

    fn from_sorted(sorted: &[f64], multiplier: f64) -> Self {
        let q1 = quantile_sorted(sorted, 0.25);
        let q3 = quantile_sorted(sorted, 0.75);
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Фильтр по одной колонке; границы считаются по входу этого шага
pub fn remove_outliers(
    readings: &[Reading],
    column: Column,
    multiplier: f64,
) -> (Vec<Reading>, Option<OutlierStep>) {
    let values = readings.iter().filter_map(|r| r.value(column));
    let Some(bounds) = IqrBounds::compute(values, multiplier) else {
        return (Vec::new(), None);
    };

    let kept: Vec<Reading> = readings
        .iter()
        .filter(|r| r.value(column).is_some_and(|v| bounds.contains(v)))
        .cloned()
        .collect();

    let step = OutlierStep {
        column,
        lower: bounds.lower,
        upper: bounds.upper,
        rows_before: readings.len(),
        rows_after: kept.len(),
    };
    (kept, Some(step))
}

/// Последовательное применение фильтров: каждый шаг сужает результат предыдущего
pub fn remove_outliers_sequential(
    readings: &[Reading],
    columns: &[Column],
    multiplier: f64,
) -> (Vec<Reading>, Vec<OutlierStep>) {
    let mut current = readings.to_vec();
    let mut steps = Vec::with_capacity(columns.len());

    for &column in columns {
        let (kept, step) = remove_outliers(&current, column, multiplier);
        if let Some(step) = step {
            tracing::info!(
                "After {} outlier removal: {} rows (bounds [{:.4}, {:.4}])",
                column,
                step.rows_after,
                step.lower,
                step.upper
            );
            steps.push(step);
        }
        current = kept;
    }

    (current, steps)
}

impl BoxSummary {
    pub fn of(column: Column, readings: &[Reading], multiplier: f64) -> Option<Self> {
        let sorted = sorted_finite(readings.iter().filter_map(|r| r.value(column)));
        if sorted.is_empty() {
            return None;
        }
        let bounds = IqrBounds::from_sorted(&sorted, multiplier);

        // Усы доходят до крайних точек внутри границ
        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|v| *v >= bounds.lower)
            .unwrap_or(bounds.q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= bounds.upper)
            .unwrap_or(bounds.q3);

        Some(Self {
            column,
            count: sorted.len(),
            min: sorted[0],
            q1: bounds.q1,
            median: quantile_sorted(&sorted, 0.5),
            q3: bounds.q3,
            max: sorted[sorted.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers: sorted.iter().filter(|v| !bounds.contains(**v)).count(),
        })
    }
}

pub fn box_summaries(readings: &[Reading], multiplier: f64) -> Vec<BoxSummary> {
    Column::REQUIRED
        .iter()
        .filter_map(|&c| BoxSummary::of(c, readings, multiplier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(minute: u32, gap: f64, sm1: f64, sm2: f64) -> Reading {
        Reading {
            timestamp: NaiveDate::from_ymd_opt(2007, 1, 1)
                .unwrap()
                .and_hms_opt(0, minute, 0)
                .unwrap(),
            global_active_power: gap,
            global_reactive_power: None,
            voltage: None,
            global_intensity: None,
            sub_metering_1: sm1,
            sub_metering_2: sm2,
            sub_metering_3: 0.0,
        }
    }

    #[test]
    fn removes_extreme_value() {
        let gaps = [1.0, 1.1, 0.9, 1.2, 0.8, 1.05, 0.95, 50.0];
        let readings: Vec<Reading> = gaps
            .iter()
            .enumerate()
            .map(|(i, &g)| reading(i as u32, g, 0.0, 0.0))
            .collect();

        let (kept, step) = remove_outliers(&readings, Column::GlobalActivePower, 1.5);
        let step = step.unwrap();
        assert_eq!(kept.len(), 7);
        assert!(kept.iter().all(|r| r.global_active_power < 2.0));
        assert!((step.lower - 0.65625).abs() < 1e-9);
        assert!((step.upper - 1.40625).abs() < 1e-9);
        assert_eq!(step.rows_before, 8);
        assert_eq!(step.rows_after, 7);
    }

    #[test]
    fn filtering_is_cumulative() {
        let mut readings: Vec<Reading> = (0..20)
            .map(|i| reading(i, 1.0 + (i % 5) as f64 * 0.1, (i % 4) as f64, 1.0))
            .collect();
        readings.push(reading(40, 30.0, 100.0, 1.0));
        readings.push(reading(41, 1.2, 9.0, 1.0));

        let columns = [Column::GlobalActivePower, Column::SubMetering1];
        let (kept, steps) = remove_outliers_sequential(&readings, &columns, 1.5);
        assert_eq!(steps.len(), 2);

        // Каждая выжившая строка в границах шага, вычисленных по его входу
        let (after_gap, _) = remove_outliers(&readings, Column::GlobalActivePower, 1.5);
        let gap_bounds =
            IqrBounds::compute(readings.iter().map(|r| r.global_active_power), 1.5).unwrap();
        let sm1_bounds =
            IqrBounds::compute(after_gap.iter().map(|r| r.sub_metering_1), 1.5).unwrap();
        for r in &kept {
            assert!(gap_bounds.contains(r.global_active_power));
            assert!(sm1_bounds.contains(r.sub_metering_1));
        }
        assert_eq!(steps[1].rows_before, after_gap.len());
        assert!(kept.iter().all(|r| r.sub_metering_1 < 9.0));
    }

    #[test]
    fn unfiltered_column_is_untouched() {
        let mut readings: Vec<Reading> = (0..10).map(|i| reading(i, 1.0, 0.0, 0.0)).collect();
        readings[3].sub_metering_3 = 500.0;
        let (kept, _) = remove_outliers_sequential(
            &readings,
            &[Column::GlobalActivePower, Column::SubMetering1, Column::SubMetering2],
            1.5,
        );
        assert_eq!(kept.len(), 10);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (kept, step) = remove_outliers(&[], Column::SubMetering2, 1.5);
        assert!(kept.is_empty());
        assert!(step.is_none());
    }

    #[test]
    fn box_summary_counts_outliers() {
        let readings: Vec<Reading> = [1.0, 2.0, 3.0, 4.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, &g)| reading(i as u32, g, 0.0, 0.0))
            .collect();
        let summary = BoxSummary::of(Column::GlobalActivePower, &readings, 1.5).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.outliers, 1);
        assert_eq!(summary.upper_whisker, 4.0);
        assert_eq!(summary.max, 100.0);
    }
}
