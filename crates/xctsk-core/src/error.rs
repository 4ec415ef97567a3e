use thiserror::Error as ThisError;

/// Errors surfaced by the optimization engine.
#[derive(Debug, ThisError)]
pub enum TaskError {
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("unsupported earth model: {0}")]
    UnsupportedEarthModel(String),
    #[error("geodesic solve did not converge between ({lat1}, {lon1}) and ({lat2}, {lon2})")]
    GeodesicNonConvergence {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },
}

pub type Result<T> = std::result::Result<T, TaskError>;

impl TaskError {
    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::InvalidTask(message.into())
    }
}
