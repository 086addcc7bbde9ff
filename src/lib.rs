//! Power Trends - очистка, анализ трендов и прогноз потребления электроэнергии домохозяйства

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;
pub mod storage;
pub mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use models::*;
pub use preprocessing::*;
pub use types::*;
