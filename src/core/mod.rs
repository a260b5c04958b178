/// Runtime pieces of the gateway
///
/// - Display sink that serializes console output
/// - Serial link acquisition and line-oriented writer
/// - Session orchestrator and its state machine
/// - Worker thread and cancellation helpers
pub mod display;
pub mod link;
pub mod session;
pub mod task_manager;

pub use display::{DisplayHandle, DisplaySink, DisplayStyle, Notification};
pub use link::{Link, LinkWriter, SerialConfig};
pub use session::{ExitReason, Session, SessionReport, SessionState};
pub use task_manager::Cancellation;
