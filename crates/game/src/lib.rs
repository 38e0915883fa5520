pub mod ai;
pub mod character;
pub mod content;
mod error;
pub mod net;
mod service;
pub mod session;
pub mod timed;
pub mod world;

pub use error::HandlerError;
pub use service::{completion_frame, WorldConfig, WorldService};
