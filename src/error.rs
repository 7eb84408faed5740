//! Failure taxonomy for a running session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The frame source could not be opened at all.
    #[error("could not open video source {source_desc}: {reason}")]
    SourceUnavailable { source_desc: String, reason: String },

    /// Two compared frames differ in size. The motion model assumes fixed geometry.
    #[error("frame size changed mid-session: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A tick delivered no usable frame.
    #[error("no usable frame this tick")]
    EmptyFrame,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
