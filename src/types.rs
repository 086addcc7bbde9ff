/// Типы данных пайплайна

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Числовые колонки, известные пайплайну, по точному имени из заголовка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "Global_active_power")]
    GlobalActivePower,
    #[serde(rename = "Global_reactive_power")]
    GlobalReactivePower,
    #[serde(rename = "Voltage")]
    Voltage,
    #[serde(rename = "Global_intensity")]
    GlobalIntensity,
    #[serde(rename = "Sub_metering_1")]
    SubMetering1,
    #[serde(rename = "Sub_metering_2")]
    SubMetering2,
    #[serde(rename = "Sub_metering_3")]
    SubMetering3,
    #[serde(rename = "hour")]
    Hour,
    #[serde(rename = "day_of_week")]
    DayOfWeek,
    #[serde(rename = "month")]
    Month,
}

impl Column {
    /// Колонки измерений в порядке входного файла
    pub const MEASUREMENTS: [Column; 7] = [
        Column::GlobalActivePower,
        Column::GlobalReactivePower,
        Column::Voltage,
        Column::GlobalIntensity,
        Column::SubMetering1,
        Column::SubMetering2,
        Column::SubMetering3,
    ];

    /// Колонки, по которым отбрасываются строки с пропусками
    pub const REQUIRED: [Column; 4] = [
        Column::GlobalActivePower,
        Column::SubMetering1,
        Column::SubMetering2,
        Column::SubMetering3,
    ];

    pub const CALENDAR: [Column; 3] = [Column::Hour, Column::DayOfWeek, Column::Month];

    pub fn name(self) -> &'static str {
        match self {
            Column::GlobalActivePower => "Global_active_power",
            Column::GlobalReactivePower => "Global_reactive_power",
            Column::Voltage => "Voltage",
            Column::GlobalIntensity => "Global_intensity",
            Column::SubMetering1 => "Sub_metering_1",
            Column::SubMetering2 => "Sub_metering_2",
            Column::SubMetering3 => "Sub_metering_3",
            Column::Hour => "hour",
            Column::DayOfWeek => "day_of_week",
            Column::Month => "month",
        }
    }

    pub fn is_calendar(self) -> bool {
        Column::CALENDAR.contains(&self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::MEASUREMENTS
            .iter()
            .chain(Column::CALENDAR.iter())
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown column '{}'", s))
    }
}

/// Одно измерение после очистки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub global_active_power: f64, // кВт
    pub global_reactive_power: Option<f64>,
    pub voltage: Option<f64>,
    pub global_intensity: Option<f64>,
    pub sub_metering_1: f64, // Вт·ч, кухня
    pub sub_metering_2: f64, // Вт·ч, прачечная
    pub sub_metering_3: f64, // Вт·ч, климат
}

impl Reading {
    /// Значение колонки; календарные поля вычисляются из timestamp
    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::GlobalActivePower => Some(self.global_active_power),
            Column::GlobalReactivePower => self.global_reactive_power,
            Column::Voltage => self.voltage,
            Column::GlobalIntensity => self.global_intensity,
            Column::SubMetering1 => Some(self.sub_metering_1),
            Column::SubMetering2 => Some(self.sub_metering_2),
            Column::SubMetering3 => Some(self.sub_metering_3),
            Column::Hour | Column::DayOfWeek | Column::Month => {
                Some(self.calendar().get(column).unwrap_or_default() as f64)
            }
        }
    }

    pub fn calendar(&self) -> CalendarFields {
        CalendarFields::from_timestamp(&self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub hour: u32,        // 0-23
    pub day_of_week: u32, // 0-6, 0 = понедельник
    pub month: u32,       // 1-12
}

impl CalendarFields {
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        Self {
            hour: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            month: timestamp.month(),
        }
    }

    pub fn get(&self, column: Column) -> Option<u32> {
        match column {
            Column::Hour => Some(self.hour),
            Column::DayOfWeek => Some(self.day_of_week),
            Column::Month => Some(self.month),
            _ => None,
        }
    }

    pub fn day_kind(&self) -> DayKind {
        DayKind::from_day_of_week(self.day_of_week)
    }

    pub fn season(&self) -> Season {
        // month из chrono всегда в 1..=12
        Season::from_month(self.month).unwrap_or(Season::Winter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    pub fn from_day_of_week(day_of_week: u32) -> Self {
        if day_of_week < 5 {
            DayKind::Weekday
        } else {
            DayKind::Weekend
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Fall),
            12 | 1 | 2 => Some(Season::Winter),
            _ => None,
        }
    }

    pub fn months(self) -> [u32; 3] {
        match self {
            Season::Spring => [3, 4, 5],
            Season::Summer => [6, 7, 8],
            Season::Fall => [9, 10, 11],
            Season::Winter => [12, 1, 2],
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub column: Column,
    pub correlation: Option<f64>, // None для константной колонки
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullShare {
    pub column: Column,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub timestamp_conflicts_removed: usize,
    pub null_percentages: Vec<NullShare>,
    pub rows_dropped_for_nulls: usize,
    pub values_filled: usize,
    pub output_rows: usize,
    pub correlations: Vec<CorrelationEntry>,
}

/// Данные для box plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxSummary {
    pub column: Column,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierStep {
    pub column: Column,
    pub lower: f64,
    pub upper: f64,
    pub rows_before: usize,
    pub rows_after: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakHours {
    pub peak_hour: u32,
    pub peak_power: f64,
    pub off_peak_hour: u32,
    pub off_peak_power: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendReport {
    pub weekday_hourly: BTreeMap<u32, f64>,
    pub weekend_hourly: BTreeMap<u32, f64>,
    pub seasonal_monthly: BTreeMap<Season, BTreeMap<u32, f64>>,
    pub weekday_peaks: Option<PeakHours>,
    pub weekend_peaks: Option<PeakHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Column,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub model_accuracy: f64,
    pub mse: f64,
    pub r2: f64,
    pub feature_importances: Vec<FeatureImportance>,
    pub linear_reference: Option<RegressionMetrics>,
}

/// Описательная статистика колонки очищенного набора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: Column,
    pub count: usize,
    pub nulls: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub cleaning: CleaningSummary,
    pub box_before: Vec<BoxSummary>,
    pub box_after: Vec<BoxSummary>,
    pub outlier_steps: Vec<OutlierStep>,
    pub correlations_after_outliers: Vec<CorrelationEntry>,
    pub trends: TrendReport,
    pub cleaned_rows: usize,
    pub cleaned_summary: Vec<ColumnSummary>,
    pub prediction: Option<PredictionReport>,
}
