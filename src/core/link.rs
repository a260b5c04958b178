use anyhow::{anyhow, Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    io::{self, Read, Write},
    time::Duration,
};

use crate::protocol::command::OutboundFrame;

pub const DEFAULT_PORT: &str = "/dev/serial0";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Connection parameters. The peripheral always talks 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub flow_control: FlowControl,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Appended after every outbound frame.
    pub newline: Vec<u8>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            newline: b"\n".to_vec(),
        }
    }
}

impl SerialConfig {
    pub fn apply_builder(&self, b: serialport::SerialPortBuilder) -> serialport::SerialPortBuilder {
        let b = b.data_bits(match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        });
        let b = b.stop_bits(match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        });
        b.parity(self.parity)
            .flow_control(self.flow_control)
            .timeout(self.read_timeout)
    }

    /// "<port> at <baud> bps", as shown in the connection banner.
    pub fn describe(&self) -> String {
        format!("{} at {} bps", self.port_name, self.baud_rate)
    }
}

/// One direction of an open serial port.
///
/// The inbound and outbound halves are separate OS handles (`try_clone`), so
/// the reader thread and the operator loop never contend for a lock. Each
/// half is closed when it is dropped.
pub struct PortHandle {
    port: Box<dyn SerialPort>,
    role: &'static str,
}

impl PortHandle {
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "<unnamed>".to_string())
    }
}

impl Read for PortHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for PortHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        log::info!("Released {} handle of {}", self.role, self.port_name());
    }
}

/// Outbound side of the link: writes frames with line semantics.
pub struct LinkWriter<W> {
    inner: W,
    newline: Vec<u8>,
}

impl<W: Write> LinkWriter<W> {
    pub fn new(inner: W, newline: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            newline: newline.into(),
        }
    }

    /// Write `frame` followed by the line terminator, as a single buffer.
    pub fn write_frame(&mut self, frame: &OutboundFrame) -> io::Result<()> {
        let wire = frame.encode(&self.newline);
        self.inner.write_all(&wire)?;
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// An acquired link, ready to be handed to a session.
pub struct Link<R, W> {
    /// Human readable target, e.g. "/dev/serial0 at 9600 bps".
    pub description: String,
    pub reader: R,
    pub writer: LinkWriter<W>,
}

/// Open the configured port and split it into reader and writer halves.
pub fn open(config: &SerialConfig) -> Result<Link<PortHandle, PortHandle>> {
    if config.baud_rate == 0 {
        return Err(anyhow!("Invalid baud rate 0 for {}", config.port_name));
    }

    let builder = config.apply_builder(serialport::new(&config.port_name, config.baud_rate));
    let mut writer = builder
        .open()
        .with_context(|| format!("Failed to open port {}", config.port_name))?;
    // The builder timeout applies to both directions; only writes need the
    // separate value.
    writer
        .set_timeout(config.write_timeout)
        .with_context(|| format!("Failed to set write timeout on {}", config.port_name))?;

    let mut reader = writer
        .try_clone()
        .with_context(|| format!("Failed to clone handle of {}", config.port_name))?;
    reader
        .set_timeout(config.read_timeout)
        .with_context(|| format!("Failed to set read timeout on {}", config.port_name))?;

    log::info!("Opened {}", config.describe());
    Ok(Link {
        description: config.describe(),
        reader: PortHandle {
            port: reader,
            role: "inbound",
        },
        writer: LinkWriter::new(
            PortHandle {
                port: writer,
                role: "outbound",
            },
            config.newline.clone(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{translate, Command};

    #[test]
    fn test_defaults_are_8n1_at_9600() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.port_name, "/dev/serial0");
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.data_bits, 8);
        assert_eq!(cfg.stop_bits, 1);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.flow_control, FlowControl::None);
        assert_eq!(cfg.read_timeout, Duration::from_millis(500));
        assert_eq!(cfg.write_timeout, Duration::from_millis(500));
        assert_eq!(cfg.describe(), "/dev/serial0 at 9600 bps");
    }

    #[test]
    fn test_writer_appends_newline() {
        let mut writer = LinkWriter::new(Vec::new(), b"\n".to_vec());
        for line in ["!activate", "?STATUS", "hello"] {
            let Command::Frame(frame) = translate(line) else {
                panic!("'{line}' should produce a frame");
            };
            writer.write_frame(&frame).unwrap();
        }
        assert_eq!(
            writer.into_inner(),
            b"\x16T\r\n\x16M\rSTATUS\nhello\n".to_vec()
        );
    }

    #[test]
    fn test_open_missing_port_fails() {
        let cfg = SerialConfig {
            port_name: "/dev/this-port-does-not-exist".to_string(),
            ..Default::default()
        };
        let err = open(&cfg).err().expect("open should fail");
        assert!(err.to_string().contains("/dev/this-port-does-not-exist"));
    }

    #[test]
    fn test_open_rejects_zero_baud() {
        let cfg = SerialConfig {
            baud_rate: 0,
            ..Default::default()
        };
        assert!(open(&cfg).is_err());
    }
}
