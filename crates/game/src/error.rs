use crate::character::StoreError;
use crate::net::{CodecError, FrameError};
use crate::timed::TimedActionError;

/// Why a packet handler dropped its packet. The connection survives all of
/// these.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("malformed packet: {0}")]
    Codec(#[from] CodecError),
    #[error("framing: {0}")]
    Frame(#[from] FrameError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("timed action: {0}")]
    Timed(#[from] TimedActionError),
    #[error("session is not authenticated")]
    NotAuthenticated,
    #[error("no character selected")]
    NoCharacter,
    #[error("session has not entered a level")]
    NotInLevel,
    #[error("unknown {kind} {id}")]
    UnknownTarget { kind: &'static str, id: String },
    #[error("rejected: {0}")]
    Rejected(&'static str),
}

impl HandlerError {
    pub fn unknown(kind: &'static str, id: impl ToString) -> Self {
        Self::UnknownTarget {
            kind,
            id: id.to_string(),
        }
    }

    /// Validation and lookup failures are routine client desyncs, logged
    /// quietly. Everything else points at a bug or a broken peer.
    pub fn is_quiet(&self) -> bool {
        match self {
            Self::Timed(_)
            | Self::NotAuthenticated
            | Self::NoCharacter
            | Self::NotInLevel
            | Self::UnknownTarget { .. }
            | Self::Rejected(_) => true,
            Self::Store(e) => e.is_not_found(),
            Self::Codec(_) | Self::Frame(_) => false,
        }
    }
}
