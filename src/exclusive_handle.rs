//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The read-write view into a [`crate::BorrowCell`].
*/

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::policy::{DefaultPolicy, FailurePolicy};
use crate::shared_handle::SharedHandle;
use crate::state::BorrowState;

/**
The one read-write view into a [`crate::BorrowCell`]'s value.

While it lives the cell's counter is `-1`; every other borrow attempt is a
violation. Dropping or [releasing](Self::release) it returns the counter to
neutral and the value stays in the cell for the next borrow.
*/
pub struct ExclusiveHandle<'a, T, P: FailurePolicy = DefaultPolicy> {
    value: NonNull<T>,
    state: &'a BorrowState<P>,
    marker: PhantomData<&'a mut T>,
}

// SAFETY: same rules as `&mut T`.
unsafe impl<T: Send, P: FailurePolicy> Send for ExclusiveHandle<'_, T, P> {}
unsafe impl<T: Sync, P: FailurePolicy> Sync for ExclusiveHandle<'_, T, P> {}

impl<'a, T, P: FailurePolicy> ExclusiveHandle<'a, T, P> {
    /// The caller must already have claimed exclusive access on `state`.
    #[inline]
    pub(crate) fn from_parts(value: NonNull<T>, state: &'a BorrowState<P>) -> Self {
        ExclusiveHandle {
            value,
            state,
            marker: PhantomData,
        }
    }

    /// Gives back exclusive access now instead of at the end of scope.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /**
    Trades exclusive access for a single shared borrow without passing through
    neutral, so no other exclusive borrow can slip in between.
    */
    pub fn downgrade(self) -> SharedHandle<'a, T, P> {
        let this = ManuallyDrop::new(self);
        this.state.downgrade();
        SharedHandle::from_parts(this.value, this.state)
    }
}

impl<T, P: FailurePolicy> Deref for ExclusiveHandle<'_, T, P> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the counter is -1 while this handle lives.
        unsafe { self.value.as_ref() }
    }
}

impl<T, P: FailurePolicy> DerefMut for ExclusiveHandle<'_, T, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the counter is -1 while this handle lives, and `&mut self` is unique.
        unsafe { self.value.as_mut() }
    }
}

impl<T, P: FailurePolicy> AsRef<T> for ExclusiveHandle<'_, T, P> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, P: FailurePolicy> AsMut<T> for ExclusiveHandle<'_, T, P> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T, P: FailurePolicy> Drop for ExclusiveHandle<'_, T, P> {
    #[inline]
    fn drop(&mut self) {
        self.state.release_exclusive();
    }
}

impl<T: Debug, P: FailurePolicy> Debug for ExclusiveHandle<'_, T, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExclusiveHandle").field(&**self).finish()
    }
}
