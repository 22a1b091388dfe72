use crate::config::ConfigError;
use crate::template::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] TemplateError),
    #[error("invalid expansion config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub mod file;

pub use file::{
    load_expansion_config, load_template_from_json, save_schedule_to_csv, save_schedule_to_json,
    save_template_to_json,
};
