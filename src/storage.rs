//! Запись и чтение очищенного набора данных

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::preprocessing::cleaning::coerce_numeric;
use crate::preprocessing::CleanedDataset;
use crate::types::Column;

pub const INDEX_COLUMN: &str = "datetime";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn write_cleaned(path: &Path, dataset: &CleanedDataset) -> Result<()> {
    let file = File::create(path)?;
    write_cleaned_to(file, dataset)?;
    tracing::info!("Saved {} cleaned rows to {}", dataset.n_rows(), path.display());
    Ok(())
}

pub fn write_cleaned_to<W: Write>(writer: W, dataset: &CleanedDataset) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let mut header = vec![INDEX_COLUMN.to_string()];
    header.extend(dataset.columns.iter().map(|c| c.name().to_string()));
    wtr.write_record(&header)?;

    for (timestamp, row) in dataset.timestamps.iter().zip(dataset.values.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(timestamp.format(TIMESTAMP_FORMAT).to_string());
        // NaN (пропуск) пишется пустым полем
        record.extend(row.iter().map(|v| {
            if v.is_finite() {
                v.to_string()
            } else {
                String::new()
            }
        }));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn read_cleaned(path: &Path) -> Result<CleanedDataset> {
    let file = File::open(path).map_err(|source| PipelineError::Ingest {
        path: path.to_path_buf(),
        source,
    })?;
    read_cleaned_from(file)
}

pub fn read_cleaned_from<R: Read>(reader: R) -> Result<CleanedDataset> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    if headers.get(0) != Some(INDEX_COLUMN) {
        return Err(PipelineError::MissingColumn {
            column: INDEX_COLUMN.to_string(),
        });
    }

    // (позиция в файле, колонка); неизвестные колонки пропускаются
    let mut layout = Vec::new();
    for (pos, name) in headers.iter().enumerate().skip(1) {
        match name.parse::<Column>() {
            Ok(column) => layout.push((pos, column)),
            Err(e) => tracing::warn!("Skipping column: {}", e),
        }
    }
    let columns: Vec<Column> = layout.iter().map(|(_, c)| *c).collect();

    let mut timestamps = Vec::new();
    let mut flat = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw_ts = record.get(0).unwrap_or("");
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|_| {
            PipelineError::Timestamp {
                line,
                value: raw_ts.to_string(),
            }
        })?;
        timestamps.push(timestamp);

        for (pos, _) in &layout {
            let value = record.get(*pos).and_then(coerce_numeric).unwrap_or(f64::NAN);
            flat.push(value);
        }
    }

    let values = Array2::from_shape_vec((timestamps.len(), columns.len()), flat).map_err(|e| {
        PipelineError::Shape {
            expected: format!("{} x {}", timestamps.len(), columns.len()),
            actual: e.to_string(),
        }
    })?;

    tracing::info!("Loaded cleaned dataset: {} rows x {} columns", values.nrows(), values.ncols());
    Ok(CleanedDataset {
        timestamps,
        columns,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::FeatureEngineer;
    use crate::types::Reading;
    use chrono::NaiveDate;

    fn sample() -> CleanedDataset {
        let readings = vec![
            Reading {
                timestamp: NaiveDate::from_ymd_opt(2006, 12, 16)
                    .unwrap()
                    .and_hms_opt(17, 24, 0)
                    .unwrap(),
                global_active_power: 4.216,
                global_reactive_power: Some(0.418),
                voltage: None,
                global_intensity: Some(18.4),
                sub_metering_1: 0.0,
                sub_metering_2: 1.0,
                sub_metering_3: 17.0,
            },
            Reading {
                timestamp: NaiveDate::from_ymd_opt(2007, 6, 2)
                    .unwrap()
                    .and_hms_opt(3, 0, 0)
                    .unwrap(),
                global_active_power: 0.25,
                global_reactive_power: Some(0.0),
                voltage: Some(241.5),
                global_intensity: Some(1.0),
                sub_metering_1: 0.0,
                sub_metering_2: 0.0,
                sub_metering_3: 0.0,
            },
        ];
        FeatureEngineer::build_dataset(&readings)
    }

    #[test]
    fn writes_index_first_and_blank_for_missing() {
        let mut buf = Vec::new();
        write_cleaned_to(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "datetime,Global_active_power,Global_reactive_power,Voltage,Global_intensity,Sub_metering_1,Sub_metering_2,Sub_metering_3,hour,day_of_week,month"
        );
        assert_eq!(lines.next().unwrap(), "2006-12-16 17:24:00,4.216,0.418,,18.4,0,1,17,17,5,12");
    }

    #[test]
    fn read_back_matches_written_dataset() {
        let dataset = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned_power_consumption.csv");
        write_cleaned(&path, &dataset).unwrap();

        let loaded = read_cleaned(&path).unwrap();
        assert_eq!(loaded.timestamps, dataset.timestamps);
        assert_eq!(loaded.columns, dataset.columns);
        assert_eq!(loaded.values[[0, 0]], 4.216);
        assert!(loaded.values[[0, 2]].is_nan());
        assert_eq!(loaded.values[[1, 2]], 241.5);
    }

    #[test]
    fn missing_index_column_is_rejected() {
        let text = "Global_active_power,hour\n1.0,3\n";
        let err = read_cleaned_from(text.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }
}
