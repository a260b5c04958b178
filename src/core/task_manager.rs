use anyhow::{anyhow, Context, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

/// Shared stop flag threaded through every worker loop.
///
/// Cloning yields another handle to the same flag. Raising it is idempotent.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    raised: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` only for the call that actually raised it.
    pub fn cancel(&self) -> bool {
        self.raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Spawn a named OS thread for a blocking worker loop
pub fn spawn_worker<F, R>(name: &str, func: F) -> Result<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(func)
        .with_context(|| format!("Failed to spawn worker thread '{name}'"))
}

/// Join a worker that returns a `Result`, turning a panic into an error
pub fn join_worker<T>(name: &str, handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("Worker thread '{name}' panicked"))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_raised_once() {
        let cancel = Cancellation::new();
        let other = cancel.clone();
        assert!(!other.is_cancelled());

        assert!(cancel.cancel());
        assert!(!other.cancel());
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_worker_result_is_propagated() {
        let handle = spawn_worker("ok", || -> Result<u32> { Ok(7) }).unwrap();
        assert_eq!(join_worker("ok", handle).unwrap(), 7);

        let handle = spawn_worker("fails", || -> Result<u32> { Err(anyhow!("boom")) }).unwrap();
        let err = join_worker("fails", handle).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_worker_panic_becomes_error() {
        let handle = spawn_worker("panics", || -> Result<()> { panic!("worker blew up") }).unwrap();
        let err = join_worker("panics", handle).unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }
}
