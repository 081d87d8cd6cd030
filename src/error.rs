//! Error types for the USB-PD sink stack.
//!
//! Errors are organized by domain:
//! - [`PoolError`]: message pool allocation failures
//! - [`MailboxError`]: mailbox capacity violations
//!
//! The unified [`Error`] enum wraps all domain errors.
//!
//! Protocol-level recovery (soft reset, hard reset, Type-C fallback) is not
//! expressed through these types; the state machines handle it in PD terms.
//! Given the stack's sizing invariants, the conditions below indicate a bug
//! in the caller or in the stack itself rather than a runtime condition to
//! retry.

// =============================================================================
// Pool Errors
// =============================================================================

/// Message pool allocation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PoolError {
    /// All message slots are busy.
    Exhausted,
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PoolError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PoolError::Exhausted => "message pool exhausted",
        }
    }
}

// =============================================================================
// Mailbox Errors
// =============================================================================

/// Mailbox errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxError {
    /// The mailbox is full.
    Full,
}

impl core::fmt::Display for MailboxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MailboxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MailboxError::Full => "mailbox full",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Message pool error
    Pool(PoolError),
    /// Mailbox error
    Mailbox(MailboxError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Pool(e) => write!(f, "pool: {}", e.as_str()),
            Error::Mailbox(e) => write!(f, "mailbox: {}", e.as_str()),
        }
    }
}

impl From<PoolError> for Error {
    fn from(e: PoolError) -> Self {
        Error::Pool(e)
    }
}

impl From<MailboxError> for Error {
    fn from(e: MailboxError) -> Self {
        Error::Mailbox(e)
    }
}

/// Result type alias for stack operations
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn pool_error_display() {
        let err = PoolError::Exhausted;
        assert_eq!(format!("{}", err), "message pool exhausted");
    }

    #[test]
    fn mailbox_error_display() {
        let err = MailboxError::Full;
        assert_eq!(format!("{}", err), "mailbox full");
    }

    #[test]
    fn error_from_pool_error() {
        let err: Error = PoolError::Exhausted.into();
        match err {
            Error::Pool(e) => assert_eq!(e, PoolError::Exhausted),
            Error::Mailbox(_) => panic!("Expected Error::Pool"),
        }
    }

    #[test]
    fn error_from_mailbox_error() {
        let err: Error = MailboxError::Full.into();
        match err {
            Error::Mailbox(e) => assert_eq!(e, MailboxError::Full),
            Error::Pool(_) => panic!("Expected Error::Mailbox"),
        }
    }

    #[test]
    fn error_display_includes_domain() {
        let display = format!("{}", Error::Pool(PoolError::Exhausted));
        assert!(display.contains("pool"));

        let display = format!("{}", Error::Mailbox(MailboxError::Full));
        assert!(display.contains("mailbox"));
    }
}
