//! Error handling foundation for the KCLoft crates.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own error enum in its own `error` module; seam
//! traits return those enums directly, and client-level operations wrap
//! them in a `Report` so callers get layered context.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Failure;

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Failure {}

    fn fails() -> Result<(), Failure> {
        let outcome: std::result::Result<(), Failure> = Err(Failure);
        outcome?;
        Ok(())
    }

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn context_converts_into_report() {
        let err = fails().expect_err("should fail");
        assert!(err.to_string().contains("request failed"));
    }
}
