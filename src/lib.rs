/*!
Owning cells whose shared and exclusive borrows are checked at runtime.

A [`BorrowCell`] owns one value. Read access goes through any number of
[`SharedHandle`]s; read-write access goes through exactly one
[`ExclusiveHandle`], which may not coexist with any other handle. The state
lives in one atomic counter (see [`state`]), so the check holds across threads.

Breaking the discipline is a programming error, not something to recover
from: it goes to the cell's [`FailurePolicy`], which aborts by default.

```rust
use borrow_cells::{AccessState, BorrowCell};

let cell = BorrowCell::new(vec![1, 2]);
cell.borrow_exclusive().push(3);

let a = cell.borrow_shared();
let b = a.clone();
assert_eq!(cell.state(), AccessState::Shared(2));
assert_eq!(a.len() + b.len(), 6);
```

# Analysis builds

With the `analysis-probe` feature every violation becomes a null-pointer read
instead of an abort, so a static analyzer that tracks null dereferences can
report which call paths reach a violation. Such builds must never ship; the
feature refuses to compile without `debug_assertions`.
*/
pub mod cell;
pub mod exclusive_handle;
pub mod policy;
pub mod shared_handle;
pub mod state;
mod sys;

pub use cell::BorrowCell;
pub use exclusive_handle::ExclusiveHandle;
pub use policy::{DefaultPolicy, Fatal, FailurePolicy, Panic, Violation};
#[cfg(feature = "analysis-probe")]
pub use policy::Probe;
pub use shared_handle::SharedHandle;
pub use state::{AccessState, BorrowState};
