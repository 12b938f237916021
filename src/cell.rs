//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The owning cell.

A [`BorrowCell`] owns at most one value and hands out access to it through
handles, checking at runtime that an [`ExclusiveHandle`] never coexists with
any other handle.

```rust
use borrow_cells::BorrowCell;

let cell = BorrowCell::new(5);
{
    let mut exclusive = cell.borrow_exclusive();
    *exclusive += 1;
}
let a = cell.borrow_shared();
let b = cell.borrow_shared();
assert_eq!(*a + *b, 12);
```

Handles borrow the cell, so the compiler already rejects most misuse. What it
cannot see (two borrows taken on different paths, handles leaked with
[`std::mem::forget`], access from other threads) is caught by the counter.
*/

use std::cell::UnsafeCell;
use std::fmt::{Debug, Formatter};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use crate::exclusive_handle::ExclusiveHandle;
use crate::policy::{DefaultPolicy, FailurePolicy, Violation};
use crate::shared_handle::SharedHandle;
use crate::state::{AccessState, BorrowState};

/**
A single owned slot with runtime-checked shared or exclusive access.

The failure policy `P` decides what happens when the discipline is broken;
see [`crate::policy`].
*/
pub struct BorrowCell<T, P: FailurePolicy = DefaultPolicy> {
    value: UnsafeCell<Option<T>>,
    pub(crate) state: BorrowState<P>,
}

// SAFETY: the counter serializes access. Shared handles on several threads read
// `T` together (needs Sync); an exclusive handle or `set` may move `T` in and out
// from any thread (needs Send).
unsafe impl<T: Send + Sync, P: FailurePolicy> Sync for BorrowCell<T, P> {}

impl<T> BorrowCell<T> {
    /// Creates an empty cell with the default failure policy.
    pub const fn empty() -> Self {
        BorrowCell::empty_with_policy()
    }

    /// Creates a cell holding `value` with the default failure policy.
    pub const fn new(value: T) -> Self {
        BorrowCell::with_policy(value)
    }
}

impl<T, P: FailurePolicy> BorrowCell<T, P> {
    /// Creates an empty cell with failure policy `P`.
    pub const fn empty_with_policy() -> Self {
        BorrowCell {
            value: UnsafeCell::new(None),
            state: BorrowState::new(),
        }
    }

    /// Creates a cell holding `value` with failure policy `P`.
    pub const fn with_policy(value: T) -> Self {
        BorrowCell {
            value: UnsafeCell::new(Some(value)),
            state: BorrowState::new(),
        }
    }

    /**
    Stores `value`, handing back whatever the cell held before.

    The previous value is returned rather than dropped; the caller decides
    what to do with it.

    # Violations
    Any live handle.
    */
    pub fn set(&self, value: T) -> Option<T> {
        self.state.acquire_exclusive();
        // SAFETY: the counter is -1, so no handle can see the slot.
        let previous = unsafe { (*self.value.get()).replace(value) };
        self.state.release_exclusive();
        previous
    }

    /**
    Moves the value out, leaving the cell empty.

    # Violations
    Any live handle.
    */
    pub fn take(&self) -> Option<T> {
        self.state.acquire_exclusive();
        // SAFETY: as in `set`.
        let previous = unsafe { (*self.value.get()).take() };
        self.state.release_exclusive();
        previous
    }

    /**
    Borrows the value read-only.

    # Violations
    * An exclusive handle is live.
    * The cell is empty.
    */
    pub fn borrow_shared(&self) -> SharedHandle<'_, T, P> {
        self.state.acquire_shared();
        // SAFETY: the counter is positive, so nothing mutates the slot while shared handles live.
        match unsafe { (*self.value.get()).as_ref() } {
            Some(value) => SharedHandle::from_parts(NonNull::from(value), &self.state),
            None => {
                self.state.release_shared();
                P::violation(Violation::Empty)
            }
        }
    }

    /**
    Borrows the value read-write.

    When the handle is released the value is back in the cell, unchanged
    except for what the handle did to it.

    # Violations
    * Any other handle is live.
    * The cell is empty.
    */
    pub fn borrow_exclusive(&self) -> ExclusiveHandle<'_, T, P> {
        self.state.acquire_exclusive();
        // SAFETY: the counter is -1, so this is the only access to the slot.
        match unsafe { (*self.value.get()).as_mut() } {
            Some(value) => ExclusiveHandle::from_parts(NonNull::from(value), &self.state),
            None => {
                self.state.release_exclusive();
                P::violation(Violation::Empty)
            }
        }
    }

    /**
    Accesses the value through a unique reference to the cell.

    A leaked handle still counts, so this checks the counter too.
    */
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.state.check_unborrowed();
        self.value.get_mut().as_mut()
    }

    /// The current access state.
    pub fn state(&self) -> AccessState {
        self.state.load()
    }

    /// Whether no handle is live.
    pub fn is_neutral(&self) -> bool {
        self.state().is_neutral()
    }

    /**
    Destroys the cell, returning its value.

    # Violations
    Any handle is still outstanding.
    */
    pub fn release(self) -> Option<T> {
        //a failed check must not run the same check again from `drop`
        let mut this = ManuallyDrop::new(self);
        this.state.check_destroy();
        this.value.get_mut().take()
    }
}

impl<T, P: FailurePolicy> Drop for BorrowCell<T, P> {
    fn drop(&mut self) {
        self.state.check_destroy();
    }
}

impl<T, P: FailurePolicy> Debug for BorrowCell<T, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        //reading the value would need a borrow, which may itself be a violation
        f.debug_struct("BorrowCell")
            .field("type", &std::any::type_name::<T>())
            .field("state", &self.state)
            .finish()
    }
}

impl<T: Default, P: FailurePolicy> Default for BorrowCell<T, P> {
    fn default() -> Self {
        BorrowCell::with_policy(T::default())
    }
}

impl<T, P: FailurePolicy> From<T> for BorrowCell<T, P> {
    fn from(value: T) -> Self {
        BorrowCell::with_policy(value)
    }
}
