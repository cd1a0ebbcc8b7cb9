use pinhole_core::{Repository, ShortCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;
pub const DEFAULT_INCREMENT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, TypedBuilder)]
pub struct ClickRecorderSettings {
    /// Clicks waiting to be written. Further clicks are dropped while full.
    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Upper bound on concurrent increment calls.
    #[builder(default = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,
    /// Deadline for a single increment call.
    #[builder(default = DEFAULT_INCREMENT_TIMEOUT)]
    pub increment_timeout: Duration,
}

impl Default for ClickRecorderSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Records clicks in the background.
///
/// [`record`](Self::record) never waits: codes are pushed onto a bounded
/// queue and a dispatcher task turns each into an `increment_clicks` call,
/// with at most `max_in_flight` calls running at once. Failures are logged
/// and otherwise ignored; click counts are best-effort.
///
/// Dropping the recorder closes the queue. Queued clicks are still written.
#[derive(Debug)]
pub struct ClickRecorder {
    queue: mpsc::Sender<ShortCode>,
    dispatcher: JoinHandle<()>,
}

impl ClickRecorder {
    /// Starts the dispatcher on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn<R: Repository>(repository: Arc<R>, settings: ClickRecorderSettings) -> Self {
        let (queue, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let dispatcher = tokio::spawn(dispatch(repository, rx, settings));
        Self { queue, dispatcher }
    }

    /// Queues one click for `code`. Returns `false` if the click was dropped.
    pub fn record(&self, code: &ShortCode) -> bool {
        match self.queue.try_send(code.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(code)) => {
                warn!(code = %code, "click queue is full, dropping click");
                false
            }
            Err(TrySendError::Closed(code)) => {
                warn!(code = %code, "click recorder is stopped, dropping click");
                false
            }
        }
    }

    /// Whether the dispatcher task has exited.
    pub fn is_stopped(&self) -> bool {
        self.dispatcher.is_finished()
    }
}

async fn dispatch<R: Repository>(
    repository: Arc<R>,
    mut rx: mpsc::Receiver<ShortCode>,
    settings: ClickRecorderSettings,
) {
    let permits = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));

    while let Some(code) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let repository = Arc::clone(&repository);
        let timeout = settings.increment_timeout;

        tokio::spawn(async move {
            let _permit = permit;
            match tokio::time::timeout(timeout, repository.increment_clicks(&code)).await {
                Ok(Ok(())) => trace!(code = %code, "recorded click"),
                Ok(Err(err)) => warn!(code = %code, error = %err, "failed to record click"),
                Err(_) => warn!(code = %code, ?timeout, "recording click timed out"),
            }
        });
    }

    debug!("click queue closed, dispatcher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pinhole_core::repository::Result;
    use pinhole_core::{StorageError, UrlMapping};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts increments; the first `hanging` calls never complete.
    #[derive(Default)]
    struct CountingRepository {
        hanging: AtomicUsize,
        increments: AtomicUsize,
    }

    impl CountingRepository {
        fn hanging_first(n: usize) -> Self {
            Self {
                hanging: AtomicUsize::new(n),
                ..Default::default()
            }
        }

        fn increments(&self) -> usize {
            self.increments.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Repository for CountingRepository {
        async fn save_mapping(&self, _code: &ShortCode, _long_url: &str) -> Result<()> {
            Err(StorageError::Operation("read only".into()))
        }

        async fn find_by_long_url(&self, _long_url: &str) -> Result<Option<UrlMapping>> {
            Ok(None)
        }

        async fn find_by_short_code(&self, _code: &ShortCode) -> Result<Option<UrlMapping>> {
            Ok(None)
        }

        async fn increment_clicks(&self, _code: &ShortCode) -> Result<()> {
            let hang = self
                .hanging
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if hang {
                std::future::pending::<()>().await;
            }
            self.increments.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    /// Polls `condition` off the runtime thread so the dispatcher keeps running.
    async fn eventually(condition: impl Fn() -> bool + Send + 'static) {
        tokio::task::spawn_blocking(move || {
            awaitility::at_most(Duration::from_secs(10))
                .poll_interval(Duration::from_millis(20))
                .until(condition);
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn queued_clicks_are_written() {
        let repository = Arc::new(CountingRepository::default());
        let recorder = ClickRecorder::spawn(Arc::clone(&repository), ClickRecorderSettings::default());

        for _ in 0..10 {
            assert!(recorder.record(&code("abc123")));
        }

        eventually(move || repository.increments() == 10).await;
    }

    #[tokio::test]
    async fn full_queue_drops_clicks_without_waiting() {
        let repository = Arc::new(CountingRepository::default());
        let settings = ClickRecorderSettings::builder().queue_capacity(1).build();
        let recorder = ClickRecorder::spawn(Arc::clone(&repository), settings);

        // The dispatcher cannot run before this test yields.
        assert!(recorder.record(&code("first")));
        assert!(!recorder.record(&code("second")));

        let written = Arc::clone(&repository);
        eventually(move || written.increments() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repository.increments(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_increments_time_out_and_release_their_slot() {
        let repository = Arc::new(CountingRepository::hanging_first(1));
        let settings = ClickRecorderSettings::builder().max_in_flight(1).build();
        let recorder = ClickRecorder::spawn(Arc::clone(&repository), settings);

        assert!(recorder.record(&code("stuck")));
        assert!(recorder.record(&code("next")));

        // Sleeping on the paused clock advances it past the increment timeout.
        for _ in 0..5 {
            if repository.increments() == 1 {
                return;
            }
            tokio::time::sleep(DEFAULT_INCREMENT_TIMEOUT).await;
        }
        panic!("second click should be written once the first times out");
    }

    #[tokio::test]
    async fn dropping_the_recorder_stops_the_dispatcher() {
        let repository = Arc::new(CountingRepository::default());
        let recorder = ClickRecorder::spawn(Arc::clone(&repository), ClickRecorderSettings::default());
        let dispatcher = recorder.dispatcher.abort_handle();

        recorder.record(&code("last"));
        drop(recorder);

        eventually(move || repository.increments() == 1).await;
        eventually(move || dispatcher.is_finished()).await;
    }
}
