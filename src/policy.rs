//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
What happens when the aliasing discipline is broken.

A violation is a contract breach by the caller, so it is never returned as an
error value. Instead it goes to a [`FailurePolicy`], chosen as a type parameter
on the cell:

| Policy | Behavior |
|--------|----------|
| [`Fatal`] | diagnostic with a backtrace on stderr, then abort |
| [`Panic`] | unwinding panic carrying the violation message |
| `Probe` | null-pointer read for an external analyzer (feature `analysis-probe`) |

[`DefaultPolicy`] is `Fatal`, or `Probe` when the `analysis-probe` feature is enabled.
*/

#[cfg(all(feature = "analysis-probe", not(debug_assertions)))]
compile_error!("the `analysis-probe` feature performs undefined behavior on violation and is only allowed in debug builds");

/// An aliasing-invariant breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Violation {
    /// A borrow or direct access was attempted while an exclusive borrow is live.
    #[error("an exclusive borrow is outstanding")]
    ExclusiveOutstanding,

    /// An exclusive borrow or direct access was attempted while shared borrows are live.
    #[error("{count} shared borrows are outstanding")]
    SharedOutstanding { count: u32 },

    /// The shared count would overflow.
    #[error("too many shared borrows")]
    TooManyShared,

    /// A shared handle was duplicated while the counter showed no shared borrow.
    #[error("shared borrow duplicated while the counter was {observed}")]
    SharedCloneMismatch { observed: i32 },

    /// A shared handle was released while the counter was not strictly positive.
    #[error("shared borrow released while the counter was {observed}")]
    SharedReleaseMismatch { observed: i32 },

    /// An exclusive handle was released while the counter was not `-1`.
    #[error("exclusive borrow released while the counter was {observed}")]
    ExclusiveReleaseMismatch { observed: i32 },

    /// An exclusive handle was downgraded while the counter was not `-1`.
    #[error("exclusive borrow downgraded while the counter was {observed}")]
    DowngradeMismatch { observed: i32 },

    /// A cell was released or dropped with handles still live.
    #[error("cell destroyed while the counter was {observed}")]
    DestroyedWhileBorrowed { observed: i32 },

    /// A borrow was requested from a cell holding no value.
    #[error("cell holds no value")]
    Empty,

    /// The counter holds a value no legal sequence of operations produces.
    #[error("counter holds impossible value {observed}")]
    Corrupted { observed: i32 },
}

/**
Handles a [`Violation`]. Never returns.

Implementations are zero-sized markers; the policy is part of the cell's type
so it is fixed when the program is built.
*/
pub trait FailurePolicy {
    /// Reports `violation` and stops the offending path.
    fn violation(violation: Violation) -> !;
}

/// Reports the violation with a backtrace and aborts the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fatal;

impl FailurePolicy for Fatal {
    #[cold]
    #[inline(never)]
    fn violation(violation: Violation) -> ! {
        crate::sys::abort_with(&violation)
    }
}

/**
Panics with the violation message.

The counter is left exactly as it was before the failed transition, so a host
that catches the unwind still sees a consistent cell.
*/
#[derive(Debug, Clone, Copy, Default)]
pub struct Panic;

impl FailurePolicy for Panic {
    #[cold]
    #[inline(never)]
    #[track_caller]
    fn violation(violation: Violation) -> ! {
        panic!("aliasing violation: {violation}")
    }
}

/**
Turns every violation into a read through a null pointer.

This exists so a static analyzer that reports null dereferences can prove
which violation paths are reachable. Executing it is undefined behavior.
*/
#[cfg(feature = "analysis-probe")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Probe;

#[cfg(feature = "analysis-probe")]
impl FailurePolicy for Probe {
    #[inline(always)]
    fn violation(violation: Violation) -> ! {
        crate::sys::probe(&violation)
    }
}

#[cfg(not(feature = "analysis-probe"))]
pub type DefaultPolicy = Fatal;

#[cfg(feature = "analysis-probe")]
pub type DefaultPolicy = Probe;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn messages_name_the_observed_state() {
        assert_eq!(
            Violation::SharedOutstanding { count: 2 }.to_string(),
            "2 shared borrows are outstanding"
        );
        assert_eq!(
            Violation::DestroyedWhileBorrowed { observed: -1 }.to_string(),
            "cell destroyed while the counter was -1"
        );
    }

    #[test]
    #[should_panic(expected = "aliasing violation: cell holds no value")]
    fn panic_policy_panics() {
        Panic::violation(Violation::Empty);
    }
}
