//! Error handling foundation for agentflow.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error
//! enums and reports them through rootcause at its outer boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn fails() -> Result<(), Boom> {
        Err(Boom)?;
        Ok(())
    }

    #[test]
    fn domain_errors_convert_into_reports() {
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn ok_values_pass_through() {
        let ok: Result<i32, Boom> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }
}
