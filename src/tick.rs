//! Single 1 Hz timer fanning out to second/minute/hour subscriber lists (C1).

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// A tick callback. Must be non-blocking and safe to call concurrently with
/// itself and with callbacks from other periods dispatched at the same tick.
pub type TickHandler = Arc<dyn Fn(SystemTime) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    second: Vec<TickHandler>,
    minute: Vec<TickHandler>,
    hour: Vec<TickHandler>,
}

/// Owns the three append-only subscriber lists and the running ticker task.
///
/// Registration is only safe during bootstrap, before `start` is called; the
/// scheduler does not fire past `stop`.
pub struct TickScheduler {
    subscribers: Arc<Mutex<Subscribers>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            handle: Mutex::new(None),
        }
    }

    pub async fn on_second(&self, handler: TickHandler) {
        self.subscribers.lock().await.second.push(handler);
    }

    pub async fn on_minute(&self, handler: TickHandler) {
        self.subscribers.lock().await.minute.push(handler);
    }

    pub async fn on_hour(&self, handler: TickHandler) {
        self.subscribers.lock().await.hour.push(handler);
    }

    /// Starts the 1 Hz dispatch loop. Each fan-out is scheduled as an
    /// independent, unawaited task — subscribers never block each other or
    /// the ticker itself.
    pub async fn start(&self) {
        let subscribers = self.subscribers.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                let now = SystemTime::now();
                let (sec, min) = wall_clock_components(now);

                let (fire_minute, fire_hour) = gate(sec, min);

                let subs = subscribers.lock().await;
                for handler in subs.second.iter().cloned() {
                    let h = handler;
                    tokio::spawn(async move { h(now) });
                }
                if fire_minute {
                    for handler in subs.minute.iter().cloned() {
                        let h = handler;
                        tokio::spawn(async move { h(now) });
                    }
                }
                if fire_hour {
                    for handler in subs.hour.iter().cloned() {
                        let h = handler;
                        tokio::spawn(async move { h(now) });
                    }
                }
            }
        });
        *self.handle.lock().await = Some(task);
    }

    /// Stops the ticker. No further ticks are dispatched after this returns.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_clock_components(now: SystemTime) -> (u32, u32) {
    let secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let sec = (secs % 60) as u32;
    let min = ((secs / 60) % 60) as u32;
    (sec, min)
}

/// Minute fires when the second hand crosses zero; hour fires only when the
/// minute hand is *also* zero at that same tick (the corrected gate — see
/// design notes on the original's independent-check bug).
fn gate(sec: u32, min: u32) -> (bool, bool) {
    let fire_minute = sec == 0;
    let fire_hour = sec == 0 && min == 0;
    (fire_minute, fire_hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_fires_on_second_zero_only() {
        assert_eq!(gate(0, 5), (true, false));
        assert_eq!(gate(7, 5), (false, false));
    }

    #[test]
    fn hour_requires_both_zero() {
        assert_eq!(gate(0, 0), (true, true));
        // sec==0 but min!=0: minute fires, hour must not (the corrected gate).
        assert_eq!(gate(0, 30), (true, false));
        // min==0 but sec!=0: neither fires, since the sec gate wasn't crossed.
        assert_eq!(gate(30, 0), (false, false));
    }
}
