//! Error types for the VoxTube server

use std::fmt;

#[derive(Debug)]
pub enum ServiceError {
    Cache(voxtube_cache::CacheError),
    Upstream(String),
    InvalidRequest(String),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Cache(err) => write!(f, "Cache error: {}", err),
            ServiceError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ServiceError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServiceError::Io(err) => write!(f, "IO error: {}", err),
            ServiceError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Cache(err) => Some(err),
            ServiceError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<voxtube_cache::CacheError> for ServiceError {
    fn from(err: voxtube_cache::CacheError) -> Self {
        ServiceError::Cache(err)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(Box::new(err))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServiceError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
