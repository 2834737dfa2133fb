use crate::SolvableId;

/// The kind of rule at the root of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A distupgrade rule kept a package from migrating.
    DistUpgrade,
    /// A package of an inferior architecture was kept back.
    InfArch,
    /// An update rule on an installed package.
    Update,
    /// A job rule: the request itself is unsatisfiable.
    Job,
    /// Nothing provides a dependency requested by a job.
    NothingProvidesDep,
    /// A low-level rpm rule.
    Rpm,
    /// The package is not installable on this system.
    NotInstallable,
    /// Nothing provides a dependency of a source package.
    NothingProvidesDepSource,
    /// Two packages of the same name cannot be installed together.
    SameName,
    /// An explicit conflict between two packages.
    PackageConflict,
    /// A package obsoletes another candidate.
    PackageObsoletes,
    /// An installed package obsoletes a candidate.
    InstalledObsoletes,
    /// An implicit obsoletes through a same-named installed package.
    ImplicitObsoletes,
    /// A requires chain that cannot be satisfied.
    PackageRequires,
    /// A package conflicts with itself.
    SelfConflict,
    /// The backend reported a rule this contract does not model.
    Unknown,
}

/// The root rule of a problem, pre-resolved into display strings by the
/// backend so that rendering does not need further pool access.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    /// What kind of rule fired.
    pub kind: RuleKind,
    /// The package the rule originates from, if any.
    pub source: Option<String>,
    /// The other package involved, if any.
    pub target: Option<String>,
    /// The dependency involved, if any.
    pub dep: Option<String>,
}

/// One machine-applicable remedy step of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionElement {
    /// Stop asking for the job at this index.
    Job {
        /// Index into the job list handed to `solve`.
        index: usize,
    },
    /// Allow installation of this inferior-architecture package.
    InfArch {
        /// The package to keep despite its architecture.
        solvable: SolvableId,
    },
    /// Allow the distupgrade of this package.
    DistUpgrade {
        /// The package allowed to migrate.
        solvable: SolvableId,
    },
    /// Replace the installed package with another candidate.
    Replace {
        /// The installed package being replaced.
        solvable: SolvableId,
        /// The candidate taking its place.
        replacement: SolvableId,
    },
    /// Allow deinstallation of this package.
    Deinstall {
        /// The package to remove.
        solvable: SolvableId,
    },
}

/// One proposed remedy for a problem.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The elements to apply onto the job list.
    pub elements: Vec<SolutionElement>,
}

/// A conflict reported by the solver, with its proposed solutions.
#[derive(Debug, Clone)]
pub struct Problem {
    /// The rule at the root of the conflict.
    pub rule: RuleInfo,
    /// At least one solution.
    pub solutions: Vec<Solution>,
}
