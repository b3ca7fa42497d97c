use thiserror::Error;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Host(#[from] roomdav_host::error::HostError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Generic(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
