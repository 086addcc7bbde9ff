//! Загрузка исходной таблицы измерений

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::ReaderBuilder;

use crate::config::LoaderConfig;
use crate::error::{PipelineError, Result};
use crate::types::Column;

const DATE_COLUMN: &str = "Date";
const TIME_COLUMN: &str = "Time";

/// Форматы с днём впереди, в порядке попытки
const TIMESTAMP_FORMATS: [&str; 3] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%d-%m-%Y %H:%M:%S"];

/// Строка исходного файла: Date/Time уже объединены в timestamp,
/// измерения хранятся как есть, в порядке `Column::MEASUREMENTS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub timestamp: NaiveDateTime,
    pub fields: Vec<String>,
}

impl RawRecord {
    pub fn field(&self, column: Column) -> Option<&str> {
        Column::MEASUREMENTS
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| self.fields.get(idx))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load_raw(path: &Path, config: &LoaderConfig) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| PipelineError::Ingest {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_raw(file, config)?;
    tracing::info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

pub fn read_raw<R: Read>(reader: R, config: &LoaderConfig) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find_column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let require = |name: &str| {
        find_column(name).ok_or_else(|| PipelineError::MissingColumn {
            column: name.to_string(),
        })
    };

    let date_idx = require(DATE_COLUMN)?;
    let time_idx = require(TIME_COLUMN)?;
    for column in Column::REQUIRED {
        require(column.name())?;
    }

    // Отсутствующие вспомогательные колонки читаются как пустые
    let measurement_idx: Vec<Option<usize>> = Column::MEASUREMENTS
        .iter()
        .map(|c| find_column(c.name()))
        .collect();
    for (column, idx) in Column::MEASUREMENTS.iter().zip(&measurement_idx) {
        if idx.is_none() {
            tracing::warn!("Column {} not present in input, treated as missing", column);
        }
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let date = record.get(date_idx).unwrap_or("").trim();
        let time = record.get(time_idx).unwrap_or("").trim();
        let timestamp = parse_timestamp(date, time).ok_or_else(|| PipelineError::Timestamp {
            line,
            value: format!("{} {}", date, time),
        })?;

        let fields = measurement_idx
            .iter()
            .map(|idx| {
                idx.and_then(|i| record.get(i))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            })
            .collect();

        records.push(RawRecord { timestamp, fields });
    }

    Ok(RawTable { records })
}

/// Разбор даты и времени с днём впереди (16/12/2006 17:24:00)
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date, time);
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
}
