use std::error::Error;

/// Configuration that has not been validated yet.
///
/// Store and engine constructors only accept the checked form, so a training run can never
/// observe a configuration that failed validation. `check_ref` and `check` validate the same
/// conditions, the former without giving up the builder.
pub trait ParamGuard {
    /// The validated configuration
    type Checked;
    /// Error reported by a failed validation
    type Error: Error;

    /// Validates and borrows the checked configuration
    fn check_ref(&self) -> Result<&Self::Checked, Self::Error>;

    /// Validates and converts into the checked configuration
    fn check(self) -> Result<Self::Checked, Self::Error>;

    /// Calls `check()` and panics on failure
    fn check_unwrap(self) -> Self::Checked
    where
        Self: Sized,
    {
        self.check().unwrap()
    }
}
