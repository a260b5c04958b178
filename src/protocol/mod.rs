pub mod command;
pub mod reader;
pub mod terminator;
pub mod tty;

pub use command::{translate, Command, OutboundFrame};
pub use reader::{run_reader_loop, DecodedMessage, FrameReader, ReadOutcome};
pub use terminator::{classify, ClassificationKind};
