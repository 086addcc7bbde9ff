/// Анализ суточных и сезонных трендов потребления

use std::collections::BTreeMap;

use crate::preprocessing::FeatureEngineer;
use crate::types::{PeakHours, Reading, TrendReport};

pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn analyze(readings: &[Reading]) -> TrendReport {
        // 1. Будни и выходные по часам
        let (weekday, weekend) = FeatureEngineer::partition_by_day_kind(readings);
        let weekday_hourly = Self::hourly_means(&weekday);
        let weekend_hourly = Self::hourly_means(&weekend);

        // 2. Сезоны по месяцам
        let seasonal_monthly = FeatureEngineer::partition_by_season(readings)
            .into_iter()
            .map(|(season, rows)| (season, Self::monthly_means(&rows)))
            .collect();

        let weekday_peaks = Self::peaks(&weekday_hourly);
        let weekend_peaks = Self::peaks(&weekend_hourly);
        for (label, peaks) in [("Weekdays", &weekday_peaks), ("Weekends", &weekend_peaks)] {
            if let Some(p) = peaks {
                tracing::info!(
                    "{}: peak at {:02}:00 ({:.3} kW), off-peak at {:02}:00 ({:.3} kW)",
                    label,
                    p.peak_hour,
                    p.peak_power,
                    p.off_peak_hour,
                    p.off_peak_power
                );
            }
        }

        TrendReport {
            weekday_hourly,
            weekend_hourly,
            seasonal_monthly,
            weekday_peaks,
            weekend_peaks,
        }
    }

    pub fn hourly_means(readings: &[Reading]) -> BTreeMap<u32, f64> {
        Self::grouped_mean(readings, |r| r.calendar().hour)
    }

    pub fn monthly_means(readings: &[Reading]) -> BTreeMap<u32, f64> {
        Self::grouped_mean(readings, |r| r.calendar().month)
    }

    /// Среднее Global_active_power по ключу; пустые группы не попадают в результат
    fn grouped_mean(readings: &[Reading], key: impl Fn(&Reading) -> u32) -> BTreeMap<u32, f64> {
        let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for reading in readings {
            let (sum, count) = groups.entry(key(reading)).or_insert((0.0, 0));
            *sum += reading.global_active_power;
            *count += 1;
        }
        groups
            .into_iter()
            .map(|(k, (sum, count))| (k, sum / count as f64))
            .collect()
    }

    fn peaks(series: &BTreeMap<u32, f64>) -> Option<PeakHours> {
        let (&peak_hour, &peak_power) = series.iter().max_by(|a, b| a.1.total_cmp(b.1))?;
        let (&off_peak_hour, &off_peak_power) = series.iter().min_by(|a, b| a.1.total_cmp(b.1))?;
        Some(PeakHours {
            peak_hour,
            peak_power,
            off_peak_hour,
            off_peak_power,
        })
    }
}
