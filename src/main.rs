/// CLI для анализа потребления электроэнергии

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use power_trends::{pipeline, PipelineConfig};

#[derive(Debug, Parser)]
#[command(name = "power-trends", version, about = "Household power consumption trend analysis")]
struct Args {
    /// Входной файл (household_power_consumption.txt)
    input: PathBuf,

    /// Куда записать очищенный набор данных
    #[arg(short, long, default_value = "cleaned_power_consumption.csv")]
    output: PathBuf,

    /// JSON-отчёт (сводки, тренды, метрики)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// JSON-файл конфигурации
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Не обучать модель
    #[arg(long)]
    skip_model: bool,
}

fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.log_config();

    let report = pipeline::run(&args.input, &args.output, &config, !args.skip_model)
        .with_context(|| format!("processing {}", args.input.display()))?;

    tracing::info!(
        "Done: {} of {} rows kept",
        report.cleaned_rows,
        report.cleaning.input_rows
    );

    if let Some(path) = &args.report {
        pipeline::write_report(path, &report)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}
