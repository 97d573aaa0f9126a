use std::num::NonZeroUsize;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use super::{calculate_score, ScoreBreakdown, ScoreInput};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScoreKey {
    mission_id: String,
    trace_bits: u64,
    time_used: u64,
    duration: u64,
    completed: usize,
    total: usize,
    alarms: u32,
}

impl ScoreKey {
    fn new(mission_id: &str, input: &ScoreInput) -> Self {
        Self {
            mission_id: mission_id.to_string(),
            trace_bits: input.trace_level.to_bits(),
            time_used: input.time_used,
            duration: input.duration,
            completed: input.completed_objectives,
            total: input.total_objectives,
            alarms: input.alarms_triggered,
        }
    }
}

struct Entry {
    breakdown: ScoreBreakdown,
    stored_at: DateTime<Utc>,
}

/// Bounded, time-limited memo of computed scores.
///
/// Keys carry every scoring input, so a hit is always equal to a fresh
/// computation; entries still expire and are dropped whenever the owning
/// instance is mutated.
pub struct ScoreCache {
    entries: Mutex<LruCache<ScoreKey, Entry>>,
    ttl: Duration,
}

impl ScoreCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Return the cached score for `input` or compute and store it.
    pub fn get_or_compute(
        &self,
        mission_id: &str,
        input: &ScoreInput,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let key = ScoreKey::new(mission_id, input);
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            if now - entry.stored_at < self.ttl {
                return entry.breakdown;
            }
        }
        let breakdown = calculate_score(input);
        entries.put(
            key,
            Entry {
                breakdown,
                stored_at: now,
            },
        );
        breakdown
    }

    /// Drop every entry belonging to an instance.
    pub fn invalidate(&self, mission_id: &str) {
        let mut entries = self.entries.lock();
        let stale: Vec<ScoreKey> = entries
            .iter()
            .filter(|(key, _)| key.mission_id == mission_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
