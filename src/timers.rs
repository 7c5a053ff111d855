//! Cancellable timers owned by a single session.

use std::collections::BTreeMap;
use std::future::{self, Future};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

/// Declaration order breaks ties between timers due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// One-shot loading -> main transition
    Loading,
    Animation,
    Typewriter,
    CursorBlink,
    MapReveal,
    /// One-shot expiry of the link acknowledgement
    Flash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Every(Duration),
    Once(Duration),
}

#[derive(Debug)]
enum Armed {
    Once(Pin<Box<Sleep>>),
    Every(Interval),
}

impl Armed {
    fn new(schedule: Schedule) -> Self {
        match schedule {
            Schedule::Once(delay) => Armed::Once(Box::pin(time::sleep(delay))),
            Schedule::Every(period) => {
                // First tick one period from now, not immediately
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Armed::Every(interval)
            }
        }
    }

    fn poll_fire(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self {
            Armed::Once(sleep) => sleep.as_mut().poll(cx),
            Armed::Every(interval) => interval.poll_tick(cx).map(|_| ()),
        }
    }
}

/// Every timer a session has armed, keyed by kind.
///
/// Nothing fires once a timer is cancelled: [`TimerSet::next`] only looks at
/// timers still in the set, and the set is dropped with the session.
#[derive(Debug, Default)]
pub struct TimerSet {
    armed: BTreeMap<TimerKind, Armed>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind`, replacing any existing timer of the same kind.
    pub fn start(&mut self, kind: TimerKind, schedule: Schedule) {
        tracing::debug!(?kind, ?schedule, "timer armed");
        self.armed.insert(kind, Armed::new(schedule));
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let removed = self.armed.remove(&kind).is_some();
        if removed {
            tracing::debug!(?kind, "timer cancelled");
        }
        removed
    }

    /// Cancels everything, returning how many timers were still armed.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.len();
        self.armed.clear();
        count
    }

    #[cfg(test)]
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Waits for the next timer to fire and returns it. Periodic timers skip
    /// ticks they missed rather than bursting to catch up.
    ///
    /// Cancel safe: a timer is only consumed in the poll that reports it.
    /// With nothing armed this never resolves.
    pub async fn next(&mut self) -> TimerKind {
        let kind = future::poll_fn(|cx| {
            for (kind, armed) in self.armed.iter_mut() {
                if armed.poll_fire(cx).is_ready() {
                    return Poll::Ready(*kind);
                }
            }
            Poll::Pending
        })
        .await;

        if matches!(self.armed.get(&kind), Some(Armed::Once(_))) {
            self.armed.remove(&kind);
        }
        kind
    }
}
