//! Error types for the optimization boundary.
//!
//! The engine has exactly two checked failure modes: a request that fails
//! validation before any generation runs (the caller's fault, recoverable),
//! and a run that could not be completed even by the single-population
//! fallback (fatal for that call). Cancellation is *not* an error: a
//! cancelled run returns the best plan found so far.

use std::fmt;

/// A single defect found while validating an optimization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFault {
    /// Defect category.
    pub kind: RequestFaultKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of request defects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFaultKind {
    /// Start or end date is missing, or the range is inverted.
    InvalidDateRange,
    /// No active staff members to plan for.
    NoStaff,
    /// No active shifts to assign.
    NoActiveShifts,
    /// Planning horizon exceeds the supported maximum.
    HorizonTooLong,
    /// The requested algorithm name is not registered.
    UnknownAlgorithm,
    /// A parameter value is outside its descriptor bounds or has the wrong type.
    InvalidParameter,
}

impl RequestFault {
    /// Creates a fault with a category and message.
    pub fn new(kind: RequestFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Failure of an optimization call.
#[derive(Debug)]
pub enum OptimizeError {
    /// The request failed validation; no generation was executed.
    ///
    /// Carries every defect found, not just the first.
    InvalidRequest(Vec<RequestFault>),

    /// The run failed and the fallback could not recover it.
    ///
    /// `source` holds the original island-model failure when the
    /// single-population fallback also failed.
    RunFailed {
        message: String,
        source: Option<Box<OptimizeError>>,
    },
}

impl OptimizeError {
    /// Creates a run failure without a wrapped source.
    pub fn run_failed(message: impl Into<String>) -> Self {
        Self::RunFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an earlier failure with fallback context.
    pub fn wrapping(message: impl Into<String>, source: OptimizeError) -> Self {
        Self::RunFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this is a validation failure.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(faults) => {
                write!(f, "invalid optimization request ({} fault", faults.len())?;
                if faults.len() != 1 {
                    write!(f, "s")?;
                }
                write!(f, ")")?;
                for fault in faults {
                    write!(f, ": {fault}")?;
                }
                Ok(())
            }
            Self::RunFailed { message, .. } => write!(f, "optimization run failed: {message}"),
        }
    }
}

impl std::error::Error for OptimizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RunFailed {
                source: Some(inner),
                ..
            } => Some(inner.as_ref()),
            _ => None,
        }
    }
}
