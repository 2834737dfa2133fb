#![deny(missing_docs)]

//! Contract layer for the native SAT solver library that the `solv` driver
//! sits on.
//!
//! The solver, its pool, and its metadata parsers are external
//! collaborators; this crate pins down the slice of their API surface the
//! driver consumes: interned [`Id`]s, the [`flags`] and [`keys`] constant
//! tables, [`Job`]s, materialized [`Problem`]s and [`Transaction`]s, and the
//! object-safe [`Pool`]/[`Solver`] traits a binding has to implement.
//!
//! The [`mem`] module carries a miniature in-memory implementation of the
//! contract. It exists so the driver crates can be exercised end-to-end
//! without the native library; it is not a dependency solver.

pub mod flags;
pub mod keys;
pub mod mem;

mod job;
mod pool;
mod problem;
mod transaction;

pub use job::Job;
pub use pool::{
    DeltaInfo, LoadCallback, Pool, PoolError, RepomdEntry, SearchMatch, SolvableInfo, Solver,
    SolverFlag, SusetagsEntry,
};
pub use problem::{Problem, RuleInfo, RuleKind, Solution, SolutionElement};
pub use transaction::{RpmStepKind, StepKind, Transaction, TransactionStep};

/// An interned identifier. `0` is the null id.
pub type Id = u32;

/// Identifies a solvable inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolvableId(pub u32);

/// Identifies a repository inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepoId(pub u32);

/// Identifies one repodata area of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepodataId(pub u32);
