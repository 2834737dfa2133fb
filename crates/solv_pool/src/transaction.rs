use crate::SolvableId;

/// Classified type of a transaction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// The package is removed.
    Erase,
    /// The package is newly installed.
    Install,
    /// The package is installed next to other versions of itself.
    MultiInstall,
    /// The package is reinstalled at the same version.
    Reinstalled,
    /// The package replaces a newer installed version.
    Downgraded,
    /// The package replaces an installed version with different content.
    Changed,
    /// The package replaces an older installed version.
    Upgraded,
    /// The replacement changes the architecture.
    ArchChange,
    /// The replacement changes the vendor.
    VendorChange,
    /// Bookkeeping step with no user-visible effect.
    Ignore,
}

/// What a step means to the system package database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmStepKind {
    /// Erase by database id.
    Erase,
    /// Install, replacing same-named packages.
    Install,
    /// Install next to existing versions.
    MultiInstall,
    /// Nothing to do at the database level (e.g. the erase half of an
    /// upgrade, which rpm performs implicitly).
    Ignore,
}

/// A single ordered operation of a transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactionStep {
    /// The solvable this step acts on.
    pub solvable: SolvableId,
    /// Classified type for display.
    pub kind: StepKind,
    /// Collapsed type for the commit stage.
    pub rpm_kind: RpmStepKind,
    /// The counterpart solvable for replacement steps (the installed one
    /// when upgrading, the candidate when being obsoleted).
    pub other: Option<SolvableId>,
}

/// Solver output: the ordered, classified list of steps to apply, delivered
/// in commit order.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Steps in the order they must be committed.
    pub steps: Vec<TransactionStep>,
    /// Net change of installed size, in kilobytes.
    pub install_size_change: i64,
}

impl Transaction {
    /// Whether the transaction contains no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
