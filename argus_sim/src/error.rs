use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or reporting a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("scenario file not found: {0}")]
    ScenarioNotFound(PathBuf),

    #[error("failed to load scenario: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error("filter history is empty")]
    EmptyHistory,

    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
}

impl From<figment::Error> for SimError {
    fn from(e: figment::Error) -> Self {
        SimError::Config(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
