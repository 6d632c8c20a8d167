/// Errors raised by the minimization engine and the error estimators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Malformed bounds, wrong parameter arity, or invalid engine settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Grid-scan error requested on a curve with no usable samples.
    #[error("Objective curve is empty or contains no finite samples.")]
    EmptyCurve,

    /// An iteration cap was reached before the stopping rule fired.
    #[error("No convergence after {iterations} iterations (last change {last_change:e}).")]
    ConvergenceFailure { iterations: usize, last_change: f64 },

    /// A profile walk pushed the fixed parameter outside of its bound.
    #[error("Parameter {index} left its bound at value {value}.")]
    BoundReached { index: usize, value: f64 },

    /// Failure reported by the numeric minimizer backend.
    #[error("Minimizer failure: {0}")]
    Minimizer(String),
}

impl FitError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::Configuration(_) => 2,
            FitError::EmptyCurve => 3,
            FitError::ConvergenceFailure { .. } | FitError::BoundReached { .. } | FitError::Minimizer(_) => 4,
        }
    }
}

/// Result type for engine operations.
pub type FitResultT<T> = Result<T, FitError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_error_maps_to_exit_code() {
        let app: AppError = FitError::EmptyCurve.into();
        assert_eq!(app.exit_code(), 3);

        let app: AppError = FitError::Configuration("bad bound".into()).into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("bad bound"));
    }
}
