use super::terminator::{CR, SYN};

/// Control frame that switches the peripheral on.
pub const ACTIVATE_FRAME: [u8; 3] = [SYN, b'T', CR];
/// Control frame that switches the peripheral off.
pub const DEACTIVATE_FRAME: [u8; 3] = [SYN, b'U', CR];
/// Header placed in front of a query payload.
pub const QUERY_HEADER: [u8; 3] = [SYN, b'M', CR];

/// Sigil for lifecycle commands, e.g. `!exit`.
pub const LIFECYCLE_SIGIL: char = '!';
/// Sigil for queries, e.g. `?STATUS`.
pub const QUERY_SIGIL: char = '?';

/// Bytes to put on the link for one operator line, before the transport's
/// line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame(Vec<u8>);

impl OutboundFrame {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this frame carries a control sequence rather than plain data.
    pub fn is_control(&self) -> bool {
        self.0.first() == Some(&SYN)
    }

    /// Exact wire bytes: the frame followed by `newline`.
    pub fn encode(&self, newline: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + newline.len());
        out.extend_from_slice(&self.0);
        out.extend_from_slice(newline);
        out
    }
}

/// What the operator loop should do with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Frame(OutboundFrame),
}

/// Translate one operator line.
///
/// Never fails: anything that is not a recognised command is sent verbatim.
pub fn translate(line: &str) -> Command {
    if let Some(keyword) = line.strip_prefix(LIFECYCLE_SIGIL) {
        match keyword {
            "exit" => return Command::Exit,
            "activate" | "a" => return Command::Frame(OutboundFrame::new(ACTIVATE_FRAME)),
            "deactivate" | "da" => return Command::Frame(OutboundFrame::new(DEACTIVATE_FRAME)),
            _ => {
                // Unknown keywords reach the peripheral as text, which answers with NAK/ENQ.
                log::warn!("Unknown command '{keyword}', sending line as data");
            }
        }
    } else if let Some(payload) = line.strip_prefix(QUERY_SIGIL) {
        let mut bytes = QUERY_HEADER.to_vec();
        bytes.extend_from_slice(payload.as_bytes());
        return Command::Frame(OutboundFrame::new(bytes));
    }

    Command::Frame(OutboundFrame::new(line.as_bytes()))
}
