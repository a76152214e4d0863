use std::time::Duration;

/// Suspends the run between two status queries.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real delay on the tokio timer.
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays instead of waiting.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSleeper {
    pub naps: std::cell::RefCell<Vec<Duration>>,
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.naps.borrow_mut().push(duration);
    }
}
