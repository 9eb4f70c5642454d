//! Common error infrastructure for tactics-core.
//!
//! Domain-specific errors (`ActionError`, `GridError`, `MapError`, ...) live next
//! to the code that raises them. Every one of them implements [`GameError`] so
//! callers can branch on severity without matching individual variants.
//!
//! Gameplay outcomes that are not errors (no path, no legal target) are ordinary
//! return values (`Option`, empty `Vec`) and never flow through these types.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the caller may retry with another choice
/// - **Validation**: invalid input, reject without retry
/// - **Internal**: state inconsistency, indicates a bug in a mutator
/// - **Fatal**: corrupt configuration or content, cannot continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Examples: destination blocked, target out of range.
    Recoverable,

    /// Examples: entity not found, wrong parameter type.
    Validation,

    /// Examples: rollback snapshot in an unexpected shape, occupancy desync.
    Internal,

    /// Examples: unknown map token, unknown weapon reference.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates a bug or corrupt data.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all tactics-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable error code for categorization.
    ///
    /// Format: `MODULE_ERROR_TYPE` (e.g., `ACTION_OUT_OF_RANGE`).
    fn error_code(&self) -> &'static str;
}
