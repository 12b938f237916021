//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Read-only views into a [`crate::BorrowCell`].
*/

use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::policy::{DefaultPolicy, FailurePolicy};
use crate::state::BorrowState;

/**
A read-only view into a [`crate::BorrowCell`]'s value.

Any number may be live at once, and none may be live together with a
[`crate::ExclusiveHandle`]. The shared count is given back when the handle is
dropped or [`released`](Self::release).

Cloning goes through the cell's counter, so a clone is counted like any other
shared borrow.
*/
pub struct SharedHandle<'a, T, P: FailurePolicy = DefaultPolicy> {
    //a pointer rather than `&'a T` because the handle still exists, inside drop,
    //after its count has been given back
    value: NonNull<T>,
    state: &'a BorrowState<P>,
    marker: PhantomData<&'a T>,
}

// SAFETY: a SharedHandle hands out `&T` only, like `&T` itself.
unsafe impl<T: Sync, P: FailurePolicy> Send for SharedHandle<'_, T, P> {}
unsafe impl<T: Sync, P: FailurePolicy> Sync for SharedHandle<'_, T, P> {}

impl<'a, T, P: FailurePolicy> SharedHandle<'a, T, P> {
    /// The caller must already have registered this borrow on `state`.
    #[inline]
    pub(crate) fn from_parts(value: NonNull<T>, state: &'a BorrowState<P>) -> Self {
        SharedHandle {
            value,
            state,
            marker: PhantomData,
        }
    }

    /// Gives back the borrow now instead of at the end of scope.
    #[inline]
    pub fn release(self) {
        drop(self)
    }
}

impl<T, P: FailurePolicy> Deref for SharedHandle<'_, T, P> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the counter is positive while this handle lives, so nothing holds `&mut T`.
        unsafe { self.value.as_ref() }
    }
}

impl<T, P: FailurePolicy> AsRef<T> for SharedHandle<'_, T, P> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, P: FailurePolicy> Clone for SharedHandle<'_, T, P> {
    fn clone(&self) -> Self {
        self.state.clone_shared();
        SharedHandle::from_parts(self.value, self.state)
    }
}

impl<T, P: FailurePolicy> Drop for SharedHandle<'_, T, P> {
    #[inline]
    fn drop(&mut self) {
        self.state.release_shared();
    }
}

impl<T: Debug, P: FailurePolicy> Debug for SharedHandle<'_, T, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedHandle").field(&**self).finish()
    }
}

impl<T: Display, P: FailurePolicy> Display for SharedHandle<'_, T, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (**self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::Panic;
    use crate::state::AccessState;
    use crate::BorrowCell;

    type Cell<T> = BorrowCell<T, Panic>;

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn clones_are_counted() {
        let cell = Cell::with_policy(String::from("shared"));
        let a = cell.borrow_shared();
        let b = a.clone();
        assert_eq!(cell.state(), AccessState::Shared(2));
        assert_eq!(*b, "shared");
        a.release();
        assert_eq!(cell.state(), AccessState::Shared(1));
        drop(b);
        assert_eq!(cell.state(), AccessState::Neutral);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn moving_a_handle_does_not_touch_the_counter() {
        let cell = Cell::with_policy(3);
        let handle = cell.borrow_shared();
        let moved = handle;
        assert_eq!(cell.state(), AccessState::Shared(1));
        assert_eq!(*moved, 3);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn formatting_forwards_to_the_value() {
        let cell = Cell::with_policy(42);
        let handle = cell.borrow_shared();
        assert_eq!(format!("{handle}"), "42");
        assert_eq!(format!("{handle:?}"), "SharedHandle(42)");
    }

    #[test]
    #[should_panic(expected = "shared borrow released while the counter was 0")]
    fn release_after_counter_was_reset() {
        let cell = Cell::with_policy(1);
        let handle = cell.borrow_shared();
        cell.state.force_raw(0);
        handle.release();
    }

    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    #[test]
    fn handle_to_sync_value_is_send_and_sync() {
        let cell = Cell::with_policy(vec![1, 2, 3]);
        let handle = cell.borrow_shared();
        assert_send_sync(&handle);
    }
}
