use std::error::Error;

/// Base trait for all application errors
pub trait PulseError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Common result type for the application
pub type PulseResult<T> = Result<T, Box<dyn PulseError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct TestError;

    impl PulseError for TestError {
        fn error_code(&self) -> &'static str {
            "TEST_ERROR"
        }
    }

    #[test]
    fn test_pulse_result() {
        let _result: PulseResult<i32> = Ok(42);
    }

    #[test]
    fn test_error_code_and_default_user_flag() {
        let error = TestError;
        assert_eq!(error.error_code(), "TEST_ERROR");
        assert!(!error.is_user_error());
    }
}
