//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The access-state machine shared by a [`crate::BorrowCell`] and its handles.

A single [`AtomicI32`] encodes who may touch the value:

| raw value | meaning |
|-----------|---------|
| `0` | neutral, no live handles |
| `n > 0` | `n` live [`crate::SharedHandle`]s |
| `-1` | one live [`crate::ExclusiveHandle`] |

Every transition is one compare-and-update on that integer. A transition whose
precondition does not hold leaves the counter untouched and hands a
[`Violation`] to the failure policy `P`.

[`BorrowState`] is public so other owning abstractions can reuse the same
discipline without going through [`crate::BorrowCell`].
*/

use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::policy::{DefaultPolicy, FailurePolicy, Violation};

const NEUTRAL: i32 = 0;
const EXCLUSIVE: i32 = -1;

/// Typed view of the raw access counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessState {
    /// No live handles.
    Neutral,
    /// This many live shared handles.
    Shared(u32),
    /// One live exclusive handle.
    Exclusive,
}

impl AccessState {
    /// Decodes a raw counter value, or `None` if no sequence of legal
    /// operations can produce it.
    pub const fn from_raw(raw: i32) -> Option<AccessState> {
        match raw {
            NEUTRAL => Some(AccessState::Neutral),
            EXCLUSIVE => Some(AccessState::Exclusive),
            n if n > 0 => Some(AccessState::Shared(n as u32)),
            _ => None,
        }
    }

    /// The raw counter value for this state.
    pub const fn raw(self) -> i32 {
        match self {
            AccessState::Neutral => NEUTRAL,
            AccessState::Exclusive => EXCLUSIVE,
            AccessState::Shared(n) => n as i32,
        }
    }

    /// Whether no handle is live.
    pub const fn is_neutral(self) -> bool {
        matches!(self, AccessState::Neutral)
    }
}

impl Display for AccessState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessState::Neutral => f.write_str("neutral"),
            AccessState::Shared(n) => write!(f, "{n} shared"),
            AccessState::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// The violation reported when an exclusive claim finds the counter at `observed`.
fn occupied(observed: i32) -> Violation {
    match AccessState::from_raw(observed) {
        Some(AccessState::Exclusive) => Violation::ExclusiveOutstanding,
        Some(AccessState::Shared(count)) => Violation::SharedOutstanding { count },
        //neutral cannot fail a claim; treat it like any other impossible value
        Some(AccessState::Neutral) | None => Violation::Corrupted { observed },
    }
}

/**
An atomic access counter with checked transitions.

`P` picks what happens on a violation; it is fixed by the type and cannot
change at runtime.
*/
pub struct BorrowState<P: FailurePolicy = DefaultPolicy> {
    count: AtomicI32,
    policy: PhantomData<fn() -> P>,
}

impl<P: FailurePolicy> BorrowState<P> {
    /// Creates a neutral counter.
    pub const fn new() -> Self {
        BorrowState {
            count: AtomicI32::new(NEUTRAL),
            policy: PhantomData,
        }
    }

    /// The current raw counter value, without validation.
    #[inline]
    pub fn raw(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    /**
    The current state.

    # Violations
    Reports [`Violation::Corrupted`] if the counter holds a value outside `{-1} ∪ ℤ≥0`.
    */
    pub fn load(&self) -> AccessState {
        let observed = self.raw();
        match AccessState::from_raw(observed) {
            Some(state) => state,
            None => P::violation(Violation::Corrupted { observed }),
        }
    }

    /**
    Registers one more shared borrow.

    # Violations
    * [`Violation::ExclusiveOutstanding`] if an exclusive borrow is live.
    * [`Violation::TooManyShared`] if the count would overflow.
    */
    #[inline]
    pub fn acquire_shared(&self) {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current == EXCLUSIVE {
                P::violation(Violation::ExclusiveOutstanding);
            }
            if current < NEUTRAL {
                P::violation(Violation::Corrupted { observed: current });
            }
            if current == i32::MAX {
                P::violation(Violation::TooManyShared);
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    tracing::trace!(from = current, to = current + 1, "shared borrow acquired");
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /**
    Registers a duplicate of an existing shared borrow.

    Unlike [`Self::acquire_shared`] this requires at least one shared borrow
    to already be live, since the duplicate is made from one.

    # Violations
    * [`Violation::SharedCloneMismatch`] if no shared borrow is live.
    * [`Violation::TooManyShared`] if the count would overflow.
    */
    #[inline]
    pub fn clone_shared(&self) {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current <= NEUTRAL {
                P::violation(Violation::SharedCloneMismatch { observed: current });
            }
            if current == i32::MAX {
                P::violation(Violation::TooManyShared);
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    tracing::trace!(from = current, to = current + 1, "shared borrow duplicated");
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /**
    Gives back one shared borrow.

    # Violations
    [`Violation::SharedReleaseMismatch`] if the count was not strictly positive.
    */
    #[inline]
    pub fn release_shared(&self) {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current <= NEUTRAL {
                P::violation(Violation::SharedReleaseMismatch { observed: current });
            }
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    tracing::trace!(from = current, to = current - 1, "shared borrow released");
                    return;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /**
    Claims exclusive access, moving the counter from `0` to `-1`.

    # Violations
    * [`Violation::ExclusiveOutstanding`] if another exclusive borrow is live.
    * [`Violation::SharedOutstanding`] if shared borrows are live.
    */
    #[inline]
    pub fn acquire_exclusive(&self) {
        match self
            .count
            .compare_exchange(NEUTRAL, EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => tracing::trace!(from = NEUTRAL, to = EXCLUSIVE, "exclusive borrow acquired"),
            Err(observed) => P::violation(occupied(observed)),
        }
    }

    /**
    Gives back exclusive access, moving the counter from `-1` to `0`.

    # Violations
    [`Violation::ExclusiveReleaseMismatch`] if the counter was not `-1`, meaning
    something else changed it while exclusive access was held.
    */
    #[inline]
    pub fn release_exclusive(&self) {
        match self
            .count
            .compare_exchange(EXCLUSIVE, NEUTRAL, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => tracing::trace!(from = EXCLUSIVE, to = NEUTRAL, "exclusive borrow released"),
            Err(observed) => P::violation(Violation::ExclusiveReleaseMismatch { observed }),
        }
    }

    /**
    Turns the live exclusive borrow into a single shared borrow, moving the
    counter from `-1` to `1`.

    # Violations
    [`Violation::DowngradeMismatch`] if the counter was not `-1`.
    */
    #[inline]
    pub fn downgrade(&self) {
        match self
            .count
            .compare_exchange(EXCLUSIVE, 1, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => tracing::trace!(from = EXCLUSIVE, to = 1, "exclusive borrow downgraded"),
            Err(observed) => P::violation(Violation::DowngradeMismatch { observed }),
        }
    }

    /**
    Verifies the counter is neutral through a unique reference.

    `on_violation` builds the violation from the observed raw value.
    */
    pub(crate) fn check_neutral(&mut self, on_violation: fn(i32) -> Violation) {
        let observed = *self.count.get_mut();
        if observed != NEUTRAL {
            P::violation(on_violation(observed));
        }
    }

    /// Verifies no handle is outstanding for an owner that is being accessed directly.
    pub(crate) fn check_unborrowed(&mut self) {
        self.check_neutral(occupied)
    }

    #[cfg(test)]
    pub(crate) fn force_raw(&self, raw: i32) {
        self.count.store(raw, Ordering::Relaxed);
    }

    /// Verifies no handle is outstanding for an owner that is going away.
    pub(crate) fn check_destroy(&mut self) {
        self.check_neutral(|observed| Violation::DestroyedWhileBorrowed { observed })
    }
}

impl<P: FailurePolicy> Default for BorrowState<P> {
    fn default() -> Self {
        BorrowState::new()
    }
}

impl<P: FailurePolicy> Debug for BorrowState<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let raw = self.raw();
        match AccessState::from_raw(raw) {
            Some(state) => f.debug_tuple("BorrowState").field(&state).finish(),
            None => f.debug_struct("BorrowState").field("corrupted", &raw).finish(),
        }
    }
}
