//! Error types for the bulletin channel bridge
//!
//! Collaborators (transport channel, connection) fail with [`TransportError`].
//! The bridge itself reports [`BulletinError`], which unifies transport
//! failures with the resolution, lifecycle and colour parsing errors raised
//! by the core.

use crate::types::Handle;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised by a transport channel or connection collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not available: {reason}")]
    Unavailable { reason: String },
    #[error("Transport rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },
    #[error("Transport does not support {operation}")]
    NotSupported { operation: String },
}

impl TransportError {
    /// Create an unavailable error with a reason
    pub fn unavailable<T: Into<String>>(reason: T) -> Self {
        TransportError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a rejected error for an operation
    pub fn rejected<O: Into<String>, R: Into<String>>(operation: O, reason: R) -> Self {
        TransportError::Rejected {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Malformed `"stroke,fill"` colour pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("Colour pair must contain exactly two comma separated colours, got {0:?}")]
    WrongArity(String),
    #[error("Invalid colour {0:?}: expected #RRGGBB")]
    InvalidColor(String),
}

// ----------------------------------------------------------------------------
// Bridge Error
// ----------------------------------------------------------------------------

/// Core error type for the channel bridge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulletinError {
    /// A handle could not be mapped to a connection-level handle
    #[error("Handle resolution failed for {handle}: {reason}")]
    HandleResolution { handle: Handle, reason: String },

    /// The directory has no identity for a connection-level handle
    #[error("No identity known for handle {handle}")]
    UnresolvedHandle { handle: Handle },

    /// An operation was attempted on a closed session
    #[error("Channel is closed: cannot {operation}")]
    ChannelClosed { operation: String },

    /// The transport went away during an explicit close
    #[error("Transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    #[error("Colour parse error: {0}")]
    ColorParse(#[from] ColorParseError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl BulletinError {
    /// Create a handle resolution error
    pub fn handle_resolution<R: Into<String>>(handle: Handle, reason: R) -> Self {
        BulletinError::HandleResolution {
            handle,
            reason: reason.into(),
        }
    }

    /// Create a channel closed error for the attempted operation
    pub fn channel_closed<T: Into<String>>(operation: T) -> Self {
        BulletinError::ChannelClosed {
            operation: operation.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        BulletinError::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether this error means the session can no longer be used
    ///
    /// A transport reporting itself unavailable counts: the channel is gone
    /// even if its closed signal has not been handled yet.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            BulletinError::ChannelClosed { .. }
                | BulletinError::TransportUnavailable { .. }
                | BulletinError::Transport(TransportError::Unavailable { .. })
        )
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, BulletinError>;
pub type BulletinResult<T> = Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BulletinError::channel_closed("send");
        assert_eq!(err.to_string(), "Channel is closed: cannot send");
        assert!(err.is_closed());

        let err = BulletinError::handle_resolution(Handle::new(7), "owner is 0");
        assert_eq!(err.to_string(), "Handle resolution failed for 7: owner is 0");
        assert!(!err.is_closed());
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: BulletinError = TransportError::unavailable("bus gone").into();
        assert!(matches!(err, BulletinError::Transport(TransportError::Unavailable { .. })));
        assert!(err.is_closed());

        let err: BulletinError = TransportError::rejected("send", "too long").into();
        assert!(!err.is_closed());
    }
}
