use std::net::SocketAddr;

use blitz::net::FrameError;

#[derive(Debug)]
pub enum ServerEvent {
    ClientConnected { addr: SocketAddr },
    ClientDisconnected {
        addr: SocketAddr,
        reason: DisconnectReason,
    },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Oversized,
    Dropped,
}

impl DisconnectReason {
    pub fn from_result(result: &Result<(), FrameError>) -> Self {
        match result {
            Ok(()) => DisconnectReason::Graceful,
            Err(FrameError::LimitExceeded { .. }) => DisconnectReason::Oversized,
            Err(_) => DisconnectReason::Dropped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "disconnected",
            DisconnectReason::Oversized => "sent an oversized frame",
            DisconnectReason::Dropped => "dropped the connection",
        }
    }
}
