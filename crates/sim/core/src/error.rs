//! Common error infrastructure for sim-core.
//!
//! Domain-specific errors (e.g., [`SceneError`](crate::scene::SceneError),
//! [`LogicError`](crate::logic::LogicError)) are defined next to the code that
//! raises them. This module provides the shared classification trait.
//!
//! # Design Principles
//!
//! - **No exceptions for control flow**: logic evaluation never returns errors;
//!   failures inside actions, conditions and targets are logged and degrade to
//!   `false` or a no-op. Only the public [`Scene`](crate::scene::Scene) API
//!   returns `Result`.
//! - **Severity Classification**: errors are categorized for recovery strategies
//!   and log levels.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: temporary conditions that may succeed later
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected state inconsistencies that require investigation
/// - **Fatal**: unrecoverable errors (missing required services)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - can retry with same or alternative input.
    ///
    /// Examples: scene not running yet, actor already destroyed
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown actor config, unknown flag name
    Validation,

    /// Internal error - unexpected state inconsistency.
    Internal,

    /// Fatal error - a required oracle is missing.
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

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all sim-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait SimError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
