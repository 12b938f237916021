//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Sample borrowing programs, legal and illegal.

```text
cargo run --example scenarios -- all
cargo run --example scenarios --features analysis-probe -- double-exclusive
```

Under the default policy an illegal scenario aborts with a backtrace. Built
with `analysis-probe`, this is the program to point a static analyzer at: each
illegal scenario reaches a probe, each legal one does not.
*/

use borrow_cells::BorrowCell;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Two exclusive borrows at once (illegal).
    DoubleExclusive,
    /// Exclusive borrows one after another (legal).
    SequentialExclusive,
    /// An exclusive borrow while two shared borrows are live (illegal).
    ExclusiveOverShared,
    /// Shared borrows released before an exclusive one (legal).
    SequentialShared,
    /// Every legal scenario, then every illegal one.
    All,
}

#[derive(Debug, Parser)]
#[command(about = "Run a borrow_cells sample program")]
struct Args {
    #[arg(value_enum)]
    scenario: Scenario,
}

fn double_exclusive() {
    let owner = BorrowCell::empty();
    owner.set(5);
    let _x = owner.borrow_exclusive();
    let _y = owner.borrow_exclusive();
}

fn sequential_exclusive() {
    let owner = BorrowCell::empty();
    owner.set(5);
    {
        let _x = owner.borrow_exclusive();
    }
    let y = owner.borrow_exclusive();
    y.release();
    {
        let mut z = owner.borrow_exclusive();
        *z += 1;
    }
    println!("sequential-exclusive: {}", *owner.borrow_shared());
}

fn exclusive_over_shared() {
    let owner = BorrowCell::empty();
    owner.set(5);
    let _x = owner.borrow_shared();
    let _y = owner.borrow_shared();
    let _z = owner.borrow_exclusive();
}

fn sequential_shared() {
    let owner = BorrowCell::empty();
    owner.set(5);
    owner.borrow_shared().release();
    owner.borrow_shared().release();
    *owner.borrow_exclusive() += 1;
    println!("sequential-shared: {}", *owner.borrow_shared());
}

fn main() {
    let args = Args::parse();
    match args.scenario {
        Scenario::DoubleExclusive => double_exclusive(),
        Scenario::SequentialExclusive => sequential_exclusive(),
        Scenario::ExclusiveOverShared => exclusive_over_shared(),
        Scenario::SequentialShared => sequential_shared(),
        Scenario::All => {
            sequential_exclusive();
            sequential_shared();
            double_exclusive();
            exclusive_over_shared();
        }
    }
}
