//! Core trait definitions

mod power;
mod transport;

pub use power::PowerStateSource;
pub use transport::{GroupHandler, MessageTransport};
