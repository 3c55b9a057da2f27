use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::effect::SideEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerName {
    /// No speech at all after listening started.
    NoInput,
    /// Debounce between a final result and committing it.
    CompleteTimeout,
    /// Delay before re-polling on turns that skip listening.
    PassivityRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub name: TimerName,
    pub generation: u64,
}

/// Bookkeeping for named timers. At most one live instance per name.
///
/// The registry never sleeps; it emits `ArmTimer`/`CancelTimer` effects and the
/// reactor owns the actual tokio tasks. A fired handle is only honoured when it is
/// still the live generation for its name, so a timer that raced its own
/// cancellation is dropped here.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    live: HashMap<TimerName, u64>,
    next_generation: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `name`, cancelling any live instance first (last writer wins).
    pub fn arm(&mut self, name: TimerName, delay: Duration, effects: &mut Vec<SideEffect>) -> TimerHandle {
        self.cancel(name, effects);

        self.next_generation += 1;
        let handle = TimerHandle { name, generation: self.next_generation };
        self.live.insert(name, handle.generation);
        effects.push(SideEffect::ArmTimer { handle, delay });
        handle
    }

    /// Returns true when a live timer was cancelled.
    pub fn cancel(&mut self, name: TimerName, effects: &mut Vec<SideEffect>) -> bool {
        match self.live.remove(&name) {
            Some(generation) => {
                effects.push(SideEffect::CancelTimer { handle: TimerHandle { name, generation } });
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self, effects: &mut Vec<SideEffect>) {
        let mut names: Vec<TimerName> = self.live.keys().copied().collect();
        names.sort_by_key(|name| *name as u8);
        for name in names {
            self.cancel(name, effects);
        }
    }

    /// Consume a fired handle. False means cancelled or superseded: ignore it.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        match self.live.get(&handle.name) {
            Some(&generation) if generation == handle.generation => {
                self.live.remove(&handle.name);
                true
            }
            _ => false,
        }
    }

    pub fn is_live(&self, name: TimerName) -> bool {
        self.live.contains_key(&name)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
