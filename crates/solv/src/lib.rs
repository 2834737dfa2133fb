#![deny(missing_docs)]

//! A package installation driver on top of a SAT-based dependency solver.
//!
//! The driver brings repository metadata into a shared pool (through
//! `solv_repodata`), compiles command-line arguments into solver jobs,
//! drives an interactive problem-resolution loop, and commits the
//! resulting transaction: downloads (with delta reconstruction where a
//! usable delta exists), checksum verification, and the ordered
//! install/erase run against the system package database.

pub mod commit;
pub mod driver;
pub mod problems;
pub mod select;

pub use commit::rpm::{Rpm, RpmExec, RpmTransactionSet, TransactionCallback};
pub use commit::{CommitConfig, CommitError, CommitOutcome};
pub use driver::{Command, Driver, DriverConfig, DriverError};
pub use problems::{LoopOutcome, SolveLoopError};
pub use select::{depglob, limitjobs, limitjobs_arch, mkjobs};
