//SPDX-License-Identifier: MIT OR Apache-2.0
#[cfg(target_arch = "wasm32")]
pub use wasm_thread as thread;

#[cfg(not(target_arch = "wasm32"))]
pub use std::thread as thread;

use crate::policy::Violation;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn abort_with(violation: &Violation) -> ! {
    use std::io::Write;

    let backtrace = std::backtrace::Backtrace::force_capture();
    let current = thread::current();
    let name = current.name().unwrap_or("<unnamed>");
    tracing::error!(%violation, thread = name, "aliasing violation, aborting");
    //nothing left to report a failed write to
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "borrow_cells: aliasing violation on thread '{name}': {violation}\nstack backtrace:\n{backtrace}"
    );
    let _ = stderr.flush();
    std::process::abort()
}

/// wasm panics trap, so the panic hook gives us the console diagnostic and the termination.
#[cfg(target_arch = "wasm32")]
pub(crate) fn abort_with(violation: &Violation) -> ! {
    let current = thread::current();
    let name = current.name().unwrap_or("<unnamed>");
    tracing::error!(%violation, thread = name, "aliasing violation, aborting");
    console_error_panic_hook::set_once();
    panic!("borrow_cells: aliasing violation on thread '{name}': {violation}")
}

#[cfg(feature = "analysis-probe")]
#[inline(always)]
pub(crate) fn probe(violation: &Violation) -> ! {
    // SAFETY: none. This read is undefined behavior; it is the marker the analyzer looks for.
    unsafe {
        let _ = std::ptr::read_volatile(std::ptr::null::<i32>());
    }
    abort_with(violation)
}
