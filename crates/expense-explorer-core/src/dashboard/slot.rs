//! Generation-stamped cache slots.
//!
//! Each fetch takes a ticket from its slot by bumping the slot's generation.
//! A completion is committed only if its ticket still equals the slot's
//! generation; any later fetch or invalidation makes older tickets stale.

pub type Generation = u64;

/// Coarse slot state, for rendering loading indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Absent,
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ready<K, T> {
    pub key: K,
    pub value: T,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot<K, T> {
    generation: Generation,
    pending: Option<K>,
    ready: Option<Ready<K, T>>,
    error: Option<String>,
}

impl<K, T> Default for Slot<K, T> {
    fn default() -> Self {
        Self {
            generation: 0,
            pending: None,
            ready: None,
            error: None,
        }
    }
}

impl<K: Clone + PartialEq, T> Slot<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch for `key` and return its ticket.
    pub fn begin(&mut self, key: K) -> Generation {
        self.generation += 1;
        self.pending = Some(key);
        self.generation
    }

    /// Supersede any in-flight fetch, keeping the last value.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    /// Supersede any in-flight fetch and drop the value and error.
    pub fn clear(&mut self) {
        self.invalidate();
        self.ready = None;
        self.error = None;
    }

    /// Commit a successful completion. Returns false for a stale ticket.
    pub fn commit(&mut self, generation: Generation, key: K, value: T) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = None;
        self.error = None;
        self.ready = Some(Ready {
            key,
            value,
            generation,
        });
        true
    }

    /// Record a failed completion. The previous value is kept. Returns false
    /// for a stale ticket.
    pub fn fail(&mut self, generation: Generation, error: impl Into<String>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = None;
        self.error = Some(error.into());
        true
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn status(&self) -> SlotStatus {
        if self.pending.is_some() {
            SlotStatus::Loading
        } else if self.ready.is_some() {
            SlotStatus::Ready
        } else {
            SlotStatus::Absent
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Key of the fetch currently in flight.
    pub fn pending_key(&self) -> Option<&K> {
        self.pending.as_ref()
    }

    /// Last committed value, whatever selection produced it.
    pub fn ready(&self) -> Option<&Ready<K, T>> {
        self.ready.as_ref()
    }

    /// Last committed value, only if it was produced for `key`.
    pub fn value_for(&self, key: &K) -> Option<&T> {
        self.ready
            .as_ref()
            .filter(|ready| &ready.key == key)
            .map(|ready| &ready.value)
    }

    /// Error of the most recent completion, cleared by the next commit.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_current_ticket_commits() {
        let mut slot: Slot<u32, &str> = Slot::new();
        let first = slot.begin(1);
        let second = slot.begin(2);

        assert!(!slot.commit(first, 1, "old"));
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert!(slot.commit(second, 2, "new"));
        assert_eq!(slot.value_for(&2), Some(&"new"));
        assert_eq!(slot.value_for(&1), None);
        assert_eq!(slot.status(), SlotStatus::Ready);
    }

    #[test]
    fn test_failure_keeps_previous_value() {
        let mut slot: Slot<u32, &str> = Slot::new();
        let ticket = slot.begin(1);
        assert!(slot.commit(ticket, 1, "value"));

        let ticket = slot.begin(1);
        assert!(slot.fail(ticket, "Network error"));
        assert_eq!(slot.value_for(&1), Some(&"value"));
        assert_eq!(slot.error(), Some("Network error"));
        assert_eq!(slot.status(), SlotStatus::Ready);

        let ticket = slot.begin(1);
        assert!(slot.commit(ticket, 1, "fresh"));
        assert_eq!(slot.error(), None);
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut slot: Slot<u32, &str> = Slot::new();
        let stale = slot.begin(1);
        slot.begin(2);
        assert!(!slot.fail(stale, "boom"));
        assert_eq!(slot.error(), None);
        assert!(slot.is_loading());
    }

    #[test]
    fn test_clear_discards_in_flight_and_value() {
        let mut slot: Slot<u32, &str> = Slot::new();
        let ticket = slot.begin(1);
        assert!(slot.commit(ticket, 1, "value"));
        let in_flight = slot.begin(1);

        slot.clear();
        assert_eq!(slot.status(), SlotStatus::Absent);
        assert!(!slot.commit(in_flight, 1, "late"));
        assert_eq!(slot.ready(), None);
    }

    #[test]
    fn test_invalidate_keeps_value() {
        let mut slot: Slot<u32, &str> = Slot::new();
        let ticket = slot.begin(1);
        assert!(slot.commit(ticket, 1, "value"));
        let in_flight = slot.begin(1);
        slot.invalidate();
        assert!(!slot.commit(in_flight, 1, "late"));
        assert_eq!(slot.value_for(&1), Some(&"value"));
        assert_eq!(slot.status(), SlotStatus::Ready);
    }
}
