//! End-to-end tests: input file -> cleaned file -> model report

use std::fs;
use std::path::PathBuf;

use power_trends::config::ConstantColumnPolicy;
use power_trends::storage::read_cleaned;
use power_trends::{pipeline, Column, PipelineConfig, PipelineError};

const HEADER: &str = "Date;Time;Global_active_power;Global_reactive_power;Voltage;Global_intensity;Sub_metering_1;Sub_metering_2;Sub_metering_3";

// 10 rows: row 2 duplicates row 1, row 5 has '?' in Sub_metering_1,
// row 9 has Global_active_power = 50
const SCENARIO: &[&str] = &[
    "16/12/2006;17:24:00;1.0;0.418;234.84;4.4;0;1;17",
    "16/12/2006;17:24:00;1.0;0.418;234.84;4.4;0;1;17",
    "05/01/2007;08:00:00;1.1;0.100;240.10;4.8;1;2;0",
    "10/03/2007;12:30:00;0.9;0.210;238.02;3.8;2;1;18",
    "15/04/2007;19:00:00;1.15;0.000;241.00;4.6;?;1;1",
    "20/06/2007;06:15:00;1.2;0.090;239.55;5.0;1;2;17",
    "02/08/2007;21:00:00;0.8;0.120;243.12;3.4;0;1;0",
    "14/09/2007;03:45:00;1.05;0.300;236.40;4.4;1;2;18",
    "25/11/2007;15:00:00;50;0.500;230.00;200.0;2;1;17",
    "30/12/2007;23:00:00;0.95;0.050;242.70;4.0;2;1;1",
];

struct Scratch {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn scratch(lines: &[&str]) -> Scratch {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("household_power_consumption.txt");
    let output = dir.path().join("cleaned_power_consumption.csv");
    let mut text = String::from(HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    fs::write(&input, text).unwrap();
    Scratch { _dir: dir, input, output }
}

#[test]
fn synthetic_scenario_keeps_seven_rows() {
    let files = scratch(SCENARIO);
    let config = PipelineConfig::default();

    let report = pipeline::run(&files.input, &files.output, &config, true).unwrap();

    assert_eq!(report.cleaning.input_rows, 10);
    assert_eq!(report.cleaning.duplicates_removed, 1);
    assert_eq!(report.cleaning.timestamp_conflicts_removed, 0);
    assert_eq!(report.cleaning.rows_dropped_for_nulls, 1);
    assert_eq!(report.cleaning.values_filled, 0);
    assert_eq!(report.cleaning.output_rows, 8);

    assert_eq!(report.outlier_steps.len(), 3);
    assert_eq!(report.outlier_steps[0].column, Column::GlobalActivePower);
    assert_eq!(report.outlier_steps[0].rows_before, 8);
    assert_eq!(report.outlier_steps[0].rows_after, 7);
    assert_eq!(report.outlier_steps[2].rows_after, 7);
    assert_eq!(report.cleaned_rows, 7);

    let gap_box = report
        .box_before
        .iter()
        .find(|b| b.column == Column::GlobalActivePower)
        .unwrap();
    assert_eq!(gap_box.outliers, 1);
    assert_eq!(gap_box.max, 50.0);

    let cleaned = read_cleaned(&files.output).unwrap();
    assert_eq!(cleaned.n_rows(), 7);
    let gap = cleaned.column(Column::GlobalActivePower).unwrap();
    assert!(gap.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(gap.iter().any(|v| *v == 0.0));
    assert!(gap.iter().any(|v| *v == 1.0));

    let gap_summary = report
        .cleaned_summary
        .iter()
        .find(|s| s.column == Column::GlobalActivePower)
        .unwrap();
    assert_eq!(gap_summary.count, 7);
    assert_eq!(gap_summary.nulls, 0);
    assert_eq!((gap_summary.min, gap_summary.max), (Some(0.0), Some(1.0)));
    assert_eq!(report.cleaned_summary.len(), 10);

    // day_of_week и Sub_metering_1 не масштабируются
    let dow = cleaned.column(Column::DayOfWeek).unwrap();
    assert!(dow.iter().any(|v| *v > 1.0));

    let prediction = report.prediction.unwrap();
    assert_eq!(prediction.test_rows, 2);
    assert_eq!(prediction.train_rows, 5);
    assert!(prediction.mse.is_finite());
    assert!(prediction.r2.is_finite());
    let total: f64 = prediction.feature_importances.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(prediction.feature_importances.iter().all(|f| f.importance >= 0.0));
}

#[test]
fn outlier_row_is_absent_from_cleaned_file() {
    let files = scratch(SCENARIO);
    pipeline::run(&files.input, &files.output, &PipelineConfig::default(), false).unwrap();

    let text = fs::read_to_string(&files.output).unwrap();
    assert!(text.starts_with("datetime,Global_active_power,"));
    assert!(!text.contains("2007-11-25 15:00:00"));
    assert!(!text.contains("2007-04-15 19:00:00"));
    assert_eq!(text.matches("2006-12-16 17:24:00").count(), 1);
}

#[test]
fn pipeline_is_repeatable() {
    let files = scratch(SCENARIO);
    let config = PipelineConfig::default();
    let first = pipeline::run(&files.input, &files.output, &config, true).unwrap();
    let second = pipeline::run(&files.input, &files.output, &config, true).unwrap();

    let (a, b) = (first.prediction.unwrap(), second.prediction.unwrap());
    assert_eq!(a.mse, b.mse);
    assert_eq!(a.r2, b.r2);
}

#[test]
fn trends_cover_weekdays_weekends_and_seasons() {
    let files = scratch(SCENARIO);
    let report =
        pipeline::run(&files.input, &files.output, &PipelineConfig::default(), false).unwrap();

    // 16/12/2006 — суббота, 05/01/2007 — пятница
    assert_eq!(report.trends.weekend_hourly.get(&17), Some(&1.0));
    assert_eq!(report.trends.weekday_hourly.get(&8), Some(&1.1));

    let total_months: usize = report.trends.seasonal_monthly.values().map(|m| m.len()).sum();
    assert_eq!(total_months, 6); // месяцы 12, 1, 3, 6, 8, 9
}

#[test]
fn report_is_written_as_json() {
    let files = scratch(SCENARIO);
    let report =
        pipeline::run(&files.input, &files.output, &PipelineConfig::default(), false).unwrap();
    let path = files.output.with_extension("json");
    pipeline::write_report(&path, &report).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["cleaned_rows"], 7);
    assert_eq!(json["outlier_steps"][0]["column"], "Global_active_power");
    assert!(json["trends"]["seasonal_monthly"]["winter"].is_object());
    assert_eq!(json["cleaned_summary"][0]["column"], "Global_active_power");
    assert_eq!(json["cleaned_summary"][0]["count"], 7);
}

#[test]
fn constant_column_can_abort_scaling() {
    let lines: Vec<String> = (0..6)
        .map(|i| format!("0{}/01/2007;1{}:00:00;1.{};0.1;240;4;0;3;{}", i + 1, i, i, i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let files = scratch(&refs);

    let mut config = PipelineConfig::default();
    config.scaling.constant_columns = ConstantColumnPolicy::Error;
    let err = pipeline::run(&files.input, &files.output, &config, false).unwrap_err();
    assert!(matches!(err, PipelineError::DegenerateColumn(Column::SubMetering2)));

    let report =
        pipeline::run(&files.input, &files.output, &PipelineConfig::default(), false).unwrap();
    let cleaned = read_cleaned(&files.output).unwrap();
    assert_eq!(report.cleaned_rows, 6);
    assert!(cleaned.column(Column::SubMetering2).unwrap().iter().all(|v| *v == 0.0));
}

#[test]
fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline::run(
        &dir.path().join("absent.txt"),
        &dir.path().join("out.csv"),
        &PipelineConfig::default(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Ingest { .. }));
}

#[test]
fn unparseable_date_is_fatal() {
    let files = scratch(&["2007-01-05;08:00:00;1.1;0.1;240;4;1;2;0"]);
    let err =
        pipeline::run(&files.input, &files.output, &PipelineConfig::default(), false).unwrap_err();
    assert!(matches!(err, PipelineError::Timestamp { .. }));
}
