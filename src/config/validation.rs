use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("backend.prefix must start with '/': {0:?}")]
    InvalidPrefix(String),

    #[error("executor.concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("executor.max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Validate the entire configuration before the core is constructed.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if !config.backend.prefix.starts_with('/') {
        return Err(ValidationError::InvalidPrefix(
            config.backend.prefix.clone(),
        ));
    }
    if config.executor.concurrency == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }
    if config.executor.max_attempts == 0 {
        return Err(ValidationError::ZeroAttempts);
    }
    Ok(())
}
