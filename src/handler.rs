//! Seam between the timing core and the layer that reacts to a timeout.
//!
//! The monitor only reports which task expired; deciding what that means for
//! the owning node is the implementor's business.

#[cfg(test)]
use mockall::automock;

pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[cfg_attr(test, automock)]
pub trait TimeoutHandler: Send + Sync + 'static {
    /// Invoked at most once per registration, off the tick loop unless the
    /// task could not be re-placed on the wheel.
    ///
    /// Runs on tokio's blocking pool, so it may block; while it does, it
    /// occupies one dispatch worker.
    fn on_timeout(
        &self,
        task_id: &str,
    ) -> CallbackResult;
}

impl<F> TimeoutHandler for F
where F: Fn(&str) -> CallbackResult + Send + Sync + 'static
{
    fn on_timeout(
        &self,
        task_id: &str,
    ) -> CallbackResult {
        self(task_id)
    }
}
