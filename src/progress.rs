/// Observer for long-running stages. Calls are notifications only; the
/// pipeline never waits on or checks an implementation.
pub trait Progress {
    /// Begin a new task. `max` is the number of steps, or 0 when unknown.
    fn start(&self, label: &str, max: u64);

    fn set_text(&self, label: &str);

    fn close(&self);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _: &str, _: u64) {}
    fn set_text(&self, _: &str) {}
    fn close(&self) {}
}

/// Reports stage labels through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn start(&self, label: &str, _: u64) {
        log::info!("[progress] {label}");
    }

    fn set_text(&self, label: &str) {
        log::info!("[progress] {label}");
    }

    fn close(&self) {}
}
