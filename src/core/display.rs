/// Console output shared by the frame reader and the operator loop
///
/// Producers never touch the terminal. They push `Notification` values into a
/// flume channel, and a single consumer thread renders each one as whole lines,
/// so a peer message can never land in the middle of a prompt redraw.
use anyhow::Result;
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use flume::{Receiver, Sender};
use std::{io::Write, thread::JoinHandle};

use super::task_manager::{join_worker, spawn_worker};
use crate::protocol::{reader::DecodedMessage, terminator::ClassificationKind};

/// Something the console should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Text received from the peripheral.
    Message(DecodedMessage),
    /// The peripheral answered with NAK.
    NegativeAck,
    /// The peripheral answered with ENQ.
    Inquiry,
    /// Plain status line (banner, exit notice).
    Info(String),
    /// Receive/send/connection error shown to the operator.
    Error(String),
    /// Redraw the input prompt.
    Prompt,
}

impl Notification {
    /// The warning to surface for a terminator, if any.
    pub fn warning_for(kind: ClassificationKind) -> Option<Self> {
        match kind {
            ClassificationKind::NegativeAck => Some(Self::NegativeAck),
            ClassificationKind::Inquiry => Some(Self::Inquiry),
            ClassificationKind::LineEnd | ClassificationKind::Acknowledge => None,
        }
    }
}

/// Sending side of the display channel.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    tx: Sender<Notification>,
}

impl DisplayHandle {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Handle plus the raw receiving end, for callers that render themselves.
    pub fn channel() -> (Self, Receiver<Notification>) {
        let (tx, rx) = flume::unbounded();
        (Self::new(tx), rx)
    }

    pub fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            log::debug!("Display closed, dropping {:?}", err.into_inner());
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.notify(Notification::Info(text.into()));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.notify(Notification::Error(text.into()));
    }

    pub fn prompt(&self) {
        self.notify(Notification::Prompt);
    }
}

/// How notifications are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayStyle {
    /// Label printed in front of peer messages.
    pub peer_label: String,
    pub prompt: String,
    pub color: bool,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self {
            peer_label: "Scanner".to_string(),
            prompt: "You: ".to_string(),
            color: true,
        }
    }
}

/// Render one notification. Every variant except `Prompt` ends on a newline.
pub fn render<W: Write>(
    out: &mut W,
    style: &DisplayStyle,
    notification: &Notification,
) -> Result<()> {
    match notification {
        Notification::Message(message) => {
            if message.content.is_empty() {
                return Ok(());
            }
            let line = format!("\n{}: {}\n", style.peer_label, message.content);
            print_colored(out, style, Color::Green, &line)?;
        }
        Notification::NegativeAck => print_warning(out, style, ClassificationKind::NegativeAck)?,
        Notification::Inquiry => print_warning(out, style, ClassificationKind::Inquiry)?,
        Notification::Info(text) => {
            queue!(out, Print(format!("{text}\n")))?;
        }
        Notification::Error(text) => {
            print_colored(out, style, Color::Red, &format!("\n{text}\n"))?;
        }
        Notification::Prompt => {
            queue!(out, Print(&style.prompt))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn print_warning<W: Write>(
    out: &mut W,
    style: &DisplayStyle,
    kind: ClassificationKind,
) -> Result<()> {
    if let Some(warning) = kind.warning() {
        print_colored(out, style, Color::Red, &format!("\n[{warning}]\n"))?;
    }
    Ok(())
}

fn print_colored<W: Write>(
    out: &mut W,
    style: &DisplayStyle,
    color: Color,
    text: &str,
) -> Result<()> {
    if style.color {
        queue!(out, SetForegroundColor(color), Print(text), ResetColor)?;
    } else {
        queue!(out, Print(text))?;
    }
    Ok(())
}

/// Single consumer that owns the console writer.
pub struct DisplaySink {
    handle: DisplayHandle,
    worker: JoinHandle<Result<()>>,
}

impl DisplaySink {
    /// Start the render thread on `out`.
    ///
    /// The thread exits once every `DisplayHandle` has been dropped and the
    /// queue is drained.
    pub fn spawn<W>(mut out: W, style: DisplayStyle) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (handle, rx) = DisplayHandle::channel();
        let worker = spawn_worker("display", move || -> Result<()> {
            for notification in rx.iter() {
                render(&mut out, &style, &notification)?;
            }
            Ok(())
        })?;
        Ok(Self { handle, worker })
    }

    pub fn handle(&self) -> DisplayHandle {
        self.handle.clone()
    }

    /// Drop the sink's own handle and wait for the queue to drain.
    pub fn shutdown(self) -> Result<()> {
        let Self { handle, worker } = self;
        drop(handle);
        join_worker("display", worker)
    }
}
