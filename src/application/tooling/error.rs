use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("remote service '{service}' is not configured")]
    NotConfigured { service: String },
    #[error("remote service '{service}' transport error: {message}")]
    Transport { service: String, message: String },
    #[error("remote service '{service}' returned an invalid payload: {message}")]
    InvalidPayload { service: String, message: String },
}
