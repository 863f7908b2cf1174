use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use signal_hook::consts::SIGINT;

/// Counts SIGINTs received while keywords run
///
/// The first interrupt asks the running keyword to stop. A second one, before the count is
/// cleared, kills the process.
#[derive(Debug, Default)]
pub struct StopSignalMonitor {
    signal_count: AtomicUsize,
}

impl StopSignalMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Route SIGINT to this monitor instead of the default handler
    pub fn install(self: &Arc<Self>) -> std::io::Result<()> {
        let monitor = Arc::clone(self);
        // The handler only touches an atomic and calls _exit, both async-signal-safe
        unsafe {
            signal_hook::low_level::register(SIGINT, move || {
                if monitor.record_signal() > 1 {
                    signal_hook::low_level::exit(130);
                }
            })?;
        }
        Ok(())
    }

    /// Record one interrupt, returning the number pending
    pub fn record_signal(&self) -> usize {
        self.signal_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn stop_requested(&self) -> bool {
        self.signal_count.load(Ordering::SeqCst) > 0
    }

    /// Drop pending interrupts; true if there were any
    pub fn reset(&self) -> bool {
        self.signal_count.swap(0, Ordering::SeqCst) > 0
    }
}
