use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl PulseError {
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
