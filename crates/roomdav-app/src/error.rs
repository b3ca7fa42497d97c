use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] roomdav_service::error::ServiceError),

    #[error(transparent)]
    HostError(#[from] roomdav_host::error::HostError),

    #[error(transparent)]
    CoreError(#[from] roomdav_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
