//! Flag constants of the solver contract.
//!
//! The numeric values follow the native library's headers so that a binding
//! backed by the real thing can pass them through unchanged.

/// Relation flags accepted by [`crate::Pool::rel2id`].
pub const REL_GT: u32 = 1;
/// Equality relation bit.
pub const REL_EQ: u32 = 2;
/// Less-than relation bit.
pub const REL_LT: u32 = 4;
/// Architecture relation: the "evr" side names an architecture.
pub const REL_ARCH: u32 = 20;

/// Job selector: `what` is a solvable id.
pub const SOLVER_SOLVABLE: u32 = 0x01;
/// Job selector: `what` is a name id.
pub const SOLVER_SOLVABLE_NAME: u32 = 0x02;
/// Job selector: `what` is a dependency id matched against provides.
pub const SOLVER_SOLVABLE_PROVIDES: u32 = 0x03;
/// Job selector: `what` is a whatprovides-set offset, any member satisfies.
pub const SOLVER_SOLVABLE_ONE_OF: u32 = 0x04;
/// Job selector: the job covers every solvable; `what` is unused.
pub const SOLVER_SOLVABLE_ALL: u32 = 0x06;
/// Mask extracting the selector from a job's `how`.
pub const SOLVER_SELECTMASK: u32 = 0xff;

/// Job action: do nothing (used to neutralize a job in place).
pub const SOLVER_NOOP: u32 = 0x0000;
/// Job action: install the selection.
pub const SOLVER_INSTALL: u32 = 0x0100;
/// Job action: erase the selection.
pub const SOLVER_ERASE: u32 = 0x0200;
/// Job action: update the selection.
pub const SOLVER_UPDATE: u32 = 0x0300;
/// Mask extracting the action from a job's `how`.
pub const SOLVER_JOBMASK: u32 = 0xff00;

/// The user fixed the epoch-version part of the selection.
pub const SOLVER_SETEV: u32 = 0x0100_0000;
/// The user fixed the full epoch-version-release of the selection.
pub const SOLVER_SETEVR: u32 = 0x0200_0000;
/// The user fixed the architecture of the selection.
pub const SOLVER_SETARCH: u32 = 0x0400_0000;
/// Suppress automatic inference of SET bits from the selection.
pub const SOLVER_NOAUTOSET: u32 = 0x2000_0000;
/// Mask covering all SET bits.
pub const SOLVER_SETMASK: u32 = 0x3f00_0000;

/// Reuse the repo's last repodata area instead of creating a new one.
pub const REPO_REUSE_REPODATA: u32 = 1 << 0;
/// Do not internalize the repo after adding data.
pub const REPO_NO_INTERNALIZE: u32 = 1 << 1;
/// Keep strings of this data local to the repo instead of the pool.
pub const REPO_LOCALPOOL: u32 = 1 << 2;
/// The data is loaded on behalf of a stub being resolved.
pub const REPO_USE_LOADING: u32 = 1 << 3;
/// The data extends already-existing solvables instead of adding new ones.
pub const REPO_EXTEND_SOLVABLES: u32 = 1 << 4;
/// Do not re-arm stub descriptors found in the loaded body.
pub const SOLV_ADD_NO_STUBS: u32 = 1 << 8;
/// susetags: record shared data between packages.
pub const SUSETAGS_RECORD_SHARES: u32 = 1 << 9;

/// Mask extracting the match mode from search flags.
pub const SEARCH_STRINGMASK: u32 = 0x0f;
/// Exact string match.
pub const SEARCH_STRING: u32 = 1;
/// Case-folded substring match.
pub const SEARCH_SUBSTRING: u32 = 3;
/// Shell glob match.
pub const SEARCH_GLOB: u32 = 4;
/// Case-insensitive matching.
pub const SEARCH_NOCASE: u32 = 1 << 8;
/// Match against file list entries.
pub const SEARCH_FILES: u32 = 1 << 13;
/// Force loading of complete file lists before matching.
pub const SEARCH_COMPLETE_FILELIST: u32 = 1 << 15;
