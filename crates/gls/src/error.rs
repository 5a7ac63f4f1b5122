use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlsError {
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    #[error("no feasible route: {0}")]
    Infeasible(String),
}

pub type GlsResult<T> = std::result::Result<T, GlsError>;

impl GlsError {
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModel(message.into())
    }

    pub fn invalid_route(message: impl Into<String>) -> Self {
        Self::InvalidRoute(message.into())
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::Infeasible(message.into())
    }
}
