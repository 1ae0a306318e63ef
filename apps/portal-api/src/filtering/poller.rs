//! Cancellable fixed-interval task. One instance backs one ticket's poll loop.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running poll loop. Cancelling (or dropping) it stops the loop at its next
/// suspension point, including in the middle of a tick: the tick's future is
/// dropped, which aborts any request it had in flight.
pub struct PollTask {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Starts ticking every `interval`, first tick one interval from now.
    /// The loop ends when `tick` returns `Break`, or when `parent` or this
    /// task's own token is cancelled.
    pub fn start<F, Fut>(id: u64, parent: &CancellationToken, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let cancel = parent.child_token();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let flow = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    flow = tick() => flow,
                };

                if flow.is_break() {
                    break;
                }
            }
        });

        Self { id, cancel, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_task(
        parent: &CancellationToken,
        ticks: Arc<AtomicU32>,
        stop_after: u32,
    ) -> PollTask {
        PollTask::start(1, parent, Duration::from_secs(2), move || {
            let ticks = ticks.clone();
            async move {
                let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= stop_after {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval_until_break() {
        let parent = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let task = counting_task(&parent, ticks.clone(), 3);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!task.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_future_ticks() {
        let parent = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let task = counting_task(&parent, ticks.clone(), u32::MAX);

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!task.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let _task = counting_task(&parent, ticks.clone(), u32::MAX);

        parent.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_tick_abandons_tick() {
        let parent = CancellationToken::new();
        let finished = Arc::new(AtomicU32::new(0));
        let task = {
            let finished = finished.clone();
            PollTask::start(7, &parent, Duration::from_secs(2), move || {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    ControlFlow::Continue(())
                }
            })
        };
        assert_eq!(task.id(), 7);

        tokio::time::sleep(Duration::from_secs(3)).await;
        drop(task);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
