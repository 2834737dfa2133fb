use crate::flags::{SOLVER_JOBMASK, SOLVER_NOOP, SOLVER_SELECTMASK};
use crate::Id;

/// A declarative request to the solver: a selector plus modifier bits in
/// `how`, and a selector-dependent operand in `what`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Job {
    /// Selector, action, and SET modifier bits.
    pub how: u32,
    /// Solvable id, name id, dependency id, or whatprovides offset.
    pub what: Id,
}

impl Job {
    /// Constructs a job from raw parts.
    pub fn new(how: u32, what: Id) -> Job {
        Job { how, what }
    }

    /// The job that does nothing. Problem resolution rewrites jobs to this
    /// instead of removing them so that job indexes stay stable.
    pub fn noop() -> Job {
        Job {
            how: SOLVER_NOOP,
            what: 0,
        }
    }

    /// The selector part of `how`.
    pub fn select(&self) -> u32 {
        self.how & SOLVER_SELECTMASK
    }

    /// The action part of `how`.
    pub fn action(&self) -> u32 {
        self.how & SOLVER_JOBMASK
    }

    /// Whether this job has been neutralized.
    pub fn is_noop(&self) -> bool {
        self.how & (SOLVER_SELECTMASK | SOLVER_JOBMASK) == SOLVER_NOOP
    }
}
