use strum::EnumIter;

/// Carriage return, ends a line silently
pub const CR: u8 = 0x0D;
/// Line feed, ends a line silently
pub const LF: u8 = 0x0A;
/// Positive acknowledge sent by the peripheral after a handled command
pub const ACK: u8 = 0x06;
/// Negative acknowledge: bad command or out of range parameters
pub const NAK: u8 = 0x15;
/// Enquiry, used by the peripheral to reject an unknown command
pub const ENQ: u8 = 0x05;
/// Synchronous idle, prefix of every outbound control frame
pub const SYN: u8 = 0x16;

/// How a decoded message was closed by the peripheral.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationKind {
    LineEnd,
    Acknowledge,
    NegativeAck,
    Inquiry,
}

impl ClassificationKind {
    /// The sentinel bytes that map onto this kind.
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Self::LineEnd => &[CR, LF],
            Self::Acknowledge => &[ACK],
            Self::NegativeAck => &[NAK],
            Self::Inquiry => &[ENQ],
        }
    }

    /// Operator-facing warning for terminators that signal a rejected command.
    pub const fn warning(self) -> Option<&'static str> {
        match self {
            Self::NegativeAck => {
                Some("NAK Received: Bad command, or out of range command parameters")
            }
            Self::Inquiry => Some("ENQ Received: Bad command"),
            Self::LineEnd | Self::Acknowledge => None,
        }
    }

    pub const fn is_warning(self) -> bool {
        self.warning().is_some()
    }
}

impl std::fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationKind::LineEnd => write!(f, "line-end"),
            ClassificationKind::Acknowledge => write!(f, "ack"),
            ClassificationKind::NegativeAck => write!(f, "nak"),
            ClassificationKind::Inquiry => write!(f, "enq"),
        }
    }
}

/// Classify a single inbound byte. `None` means the byte is ordinary content.
pub const fn classify(byte: u8) -> Option<ClassificationKind> {
    match byte {
        CR | LF => Some(ClassificationKind::LineEnd),
        ACK => Some(ClassificationKind::Acknowledge),
        NAK => Some(ClassificationKind::NegativeAck),
        ENQ => Some(ClassificationKind::Inquiry),
        _ => None,
    }
}
