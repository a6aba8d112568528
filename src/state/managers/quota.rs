//! Per-user quota reservations.
//!
//! The quota check counts committed channels plus creations still waiting
//! on the platform. A slot is reserved under the manager's lock before the
//! platform call and handed back either when the record is written or when
//! the reservation is dropped, so a failed or cancelled creation never
//! leaks a slot and concurrent creations can never overshoot the limit.

use super::lifecycle::Inner;
use crate::error::LifecycleError;
use crate::state::ids::{GuildId, UserId};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;

pub(super) type QuotaKey = (GuildId, UserId);

impl Inner {
    /// Committed plus in-flight channels for `key`.
    pub(super) fn usage(&self, key: QuotaKey) -> usize {
        self.index.count(key.0, key.1) + self.pending.get(&key).copied().unwrap_or(0)
    }

    fn release(&mut self, key: QuotaKey) {
        if let Entry::Occupied(mut slot) = self.pending.entry(key) {
            *slot.get_mut() -= 1;
            if *slot.get() == 0 {
                slot.remove();
            }
        }
    }
}

/// A held quota slot.
#[must_use = "dropping a reservation releases the slot immediately"]
pub(super) struct Reservation<'a> {
    inner: &'a Mutex<Inner>,
    key: QuotaKey,
    armed: bool,
}

impl<'a> Reservation<'a> {
    /// Reserve one slot for `key`, or fail when `max` is already reached.
    pub(super) fn acquire(
        inner: &'a Mutex<Inner>,
        key: QuotaKey,
        max: usize,
    ) -> Result<Self, LifecycleError> {
        let mut guard = inner.lock();
        if guard.usage(key) >= max {
            return Err(LifecycleError::QuotaExceeded { max });
        }
        *guard.pending.entry(key).or_default() += 1;
        Ok(Self {
            inner,
            key,
            armed: true,
        })
    }

    /// Give the slot back from inside the critical section that commits the
    /// record, so the count never dips between release and insert.
    pub(super) fn release_locked(mut self, inner: &mut Inner) {
        inner.release(self.key);
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock().release(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ids::{ChannelId, ChannelKind};
    use crate::store::State;

    const KEY: QuotaKey = (GuildId(1), UserId(10));

    #[test]
    fn reservations_count_against_the_limit() {
        let inner = Mutex::new(Inner::new(State::default()));
        let first = Reservation::acquire(&inner, KEY, 2).unwrap();
        let _second = Reservation::acquire(&inner, KEY, 2).unwrap();
        assert!(matches!(
            Reservation::acquire(&inner, KEY, 2),
            Err(LifecycleError::QuotaExceeded { max: 2 })
        ));

        drop(first);
        assert!(Reservation::acquire(&inner, KEY, 2).is_ok());
    }

    #[test]
    fn dropping_releases_the_slot() {
        let inner = Mutex::new(Inner::new(State::default()));
        {
            let _held = Reservation::acquire(&inner, KEY, 1).unwrap();
            assert_eq!(inner.lock().usage(KEY), 1);
        }
        assert_eq!(inner.lock().usage(KEY), 0);
        assert!(inner.lock().pending.is_empty());
    }

    #[test]
    fn committed_records_replace_reservations() {
        let inner = Mutex::new(Inner::new(State::default()));
        let reservation = Reservation::acquire(&inner, KEY, 1).unwrap();
        {
            let mut guard = inner.lock();
            reservation.release_locked(&mut guard);
            guard
                .state
                .insert_temp(KEY.0, ChannelId(5), KEY.1, ChannelKind::Voice);
            guard.index.add(KEY.0, KEY.1, ChannelId(5));
        }
        assert_eq!(inner.lock().usage(KEY), 1);
        assert!(Reservation::acquire(&inner, KEY, 1).is_err());
    }
}
