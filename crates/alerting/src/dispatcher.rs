//! Alarm Dispatcher Implementation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::AlarmPlayer;

/// Starts at most one alarm playback per episode.
///
/// Arming happens on trigger and is cleared only by [`disarm`], which the
/// caller invokes when the episode ends. Playback runs detached on the
/// runtime's blocking pool and never reports back.
///
/// [`disarm`]: AlarmDispatcher::disarm
pub struct AlarmDispatcher {
    player: Option<Arc<dyn AlarmPlayer>>,
    runtime: Handle,
    armed: AtomicBool,
    playbacks: AtomicU64,
}

impl AlarmDispatcher {
    /// Create a dispatcher; `None` for the player gives visual-only alerting
    pub fn new(player: Option<Arc<dyn AlarmPlayer>>, runtime: Handle) -> Self {
        if player.is_none() {
            info!("No alarm sound configured, alerting is visual only");
        }
        Self {
            player,
            runtime,
            armed: AtomicBool::new(false),
            playbacks: AtomicU64::new(0),
        }
    }

    /// Handle an alarm trigger.
    ///
    /// Returns `true` if a playback task was started.
    pub fn trigger(&self) -> bool {
        if self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Alarm already armed for this episode");
            return false;
        }

        let Some(player) = self.player.clone() else {
            return false;
        };

        self.playbacks.fetch_add(1, Ordering::Relaxed);
        self.runtime.spawn_blocking(move || {
            if let Err(e) = player.play() {
                warn!("Alarm playback failed: {}", e);
            }
        });

        info!("Alarm playback started");
        true
    }

    /// End the current episode so the next trigger may play again
    pub fn disarm(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            debug!("Alarm disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Playback tasks started so far
    pub fn playbacks_started(&self) -> u64 {
        self.playbacks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Reports each finished playback on a channel
    struct ChannelPlayer {
        done: mpsc::UnboundedSender<()>,
        fail: bool,
    }

    impl AlarmPlayer for ChannelPlayer {
        fn play(&self) -> Result<(), AlertError> {
            let _ = self.done.send(());
            if self.fail {
                Err(AlertError::Decode("bad sound".into()))
            } else {
                Ok(())
            }
        }
    }

    fn dispatcher(fail: bool) -> (AlarmDispatcher, mpsc::UnboundedReceiver<()>) {
        let (done, rx) = mpsc::unbounded_channel();
        let player: Arc<dyn AlarmPlayer> = Arc::new(ChannelPlayer { done, fail });
        (AlarmDispatcher::new(Some(player), Handle::current()), rx)
    }

    #[tokio::test]
    async fn test_one_playback_per_episode() {
        let (dispatcher, mut rx) = dispatcher(false);

        assert!(dispatcher.trigger());
        assert!(!dispatcher.trigger());
        assert!(!dispatcher.trigger());
        assert!(dispatcher.is_armed());

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dispatcher.playbacks_started(), 1);
    }

    #[tokio::test]
    async fn test_disarm_allows_next_episode() {
        let (dispatcher, mut rx) = dispatcher(false);

        assert!(dispatcher.trigger());
        dispatcher.disarm();
        assert!(!dispatcher.is_armed());
        assert!(dispatcher.trigger());

        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(dispatcher.playbacks_started(), 2);
    }

    #[tokio::test]
    async fn test_playback_failure_is_swallowed() {
        let (dispatcher, mut rx) = dispatcher(true);

        assert!(dispatcher.trigger());
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        // Still armed for the episode, and usable afterwards
        assert!(dispatcher.is_armed());
        dispatcher.disarm();
        assert!(dispatcher.trigger());
    }

    #[tokio::test]
    async fn test_visual_only_still_arms() {
        let dispatcher = AlarmDispatcher::new(None, Handle::current());

        assert!(!dispatcher.trigger());
        assert!(dispatcher.is_armed());
        assert_eq!(dispatcher.playbacks_started(), 0);
    }

    #[test]
    fn test_trigger_does_not_wait_for_playback() {
        struct SlowPlayer(Arc<AtomicUsize>);
        impl AlarmPlayer for SlowPlayer {
            fn play(&self) -> Result<(), AlertError> {
                std::thread::sleep(Duration::from_millis(200));
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        let player: Arc<dyn AlarmPlayer> = Arc::new(SlowPlayer(finished.clone()));
        let dispatcher = AlarmDispatcher::new(Some(player), runtime.handle().clone());

        assert!(dispatcher.trigger());
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        runtime.shutdown_timeout(Duration::from_secs(5));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
