//! serial-chat: interactive terminal-to-serial gateway
//!
//! Operator lines are translated into the peripheral's control frames
//! (`!activate`, `!deactivate`, `?<query>`) or sent as plain text, while a
//! background frame reader splits the inbound byte stream on CR/LF/ACK/NAK/ENQ
//! and reports each message, surfacing NAK and ENQ as warnings.
//!
//! The protocol pieces (`protocol`) are pure and stream-agnostic; `core` wires
//! them to a serial port, the console and the session lifecycle.

#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod protocol;

pub use crate::core::{Session, SessionReport};
pub use protocol::{translate, ClassificationKind, Command, DecodedMessage};
