use shared::config::RateLimit;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Longest a caller is ever held back before an upstream call.
pub const MAX_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct WindowState {
    count: u32,
    window_start: Option<Instant>,
}

/// Self-imposed pacing of calls to the upstream API.
///
/// One instance lives for the whole process and is shared by every request.
/// When the window budget is spent the caller sleeps for the rest of the
/// window (capped at [`MAX_WAIT`]) and then starts a fresh window.
#[derive(Debug)]
pub struct OutboundThrottle {
    limit: RateLimit,
    state: Mutex<WindowState>,
}

impl OutboundThrottle {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Wait, if needed, before an upstream call. Returns how long the caller waited.
    ///
    /// The lock is not held while sleeping, and a caller dropped during the
    /// sleep leaves the counters untouched.
    pub async fn acquire(&self) -> Duration {
        let window = self.limit.window();

        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            match state.window_start.map(|start| now.duration_since(start)) {
                Some(elapsed) if elapsed < window => {
                    if state.count >= self.limit.max_requests {
                        Some((window - elapsed + Duration::from_secs(1)).min(MAX_WAIT))
                    } else {
                        state.count += 1;
                        None
                    }
                }
                _ => {
                    state.count = 0;
                    state.window_start = Some(now);
                    None
                }
            }
        };

        let Some(wait) = wait else {
            return Duration::ZERO;
        };

        warn!(
            "Upstream budget of {} requests per {}s spent, waiting {:?}",
            self.limit.max_requests, self.limit.window_secs, wait
        );
        tokio::time::sleep(wait).await;

        let mut state = self.state.lock().await;
        state.count = 0;
        state.window_start = Some(Instant::now());
        wait
    }
}
