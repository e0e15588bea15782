use moltopo::core::io::top::TopError;
use moltopo::core::models::topology::ConsistencyError;
use moltopo::core::settings::SettingsError;
use moltopo::workflows::load::LoadError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Topology(#[from] TopError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    #[error("Failed to set up logging: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
