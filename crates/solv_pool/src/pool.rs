use std::io::{Read, Write};
use std::path::Path;

use solv_digest::Checksum;

use crate::{Id, Job, Problem, RepoId, RepodataId, SolvableId, Transaction};

/// Error reported by a backend operation.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The input stream could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The input stream is not valid for the requested format.
    #[error("invalid {format} data: {reason}")]
    Parse {
        /// The ingestion format that rejected the data.
        format: &'static str,
        /// Backend-reported reason.
        reason: String,
    },
    /// The referenced repo, repodata, or solvable does not exist.
    #[error("stale handle: {0}")]
    StaleHandle(&'static str),
}

/// Summary of a solvable, copied out of the pool.
#[derive(Debug, Clone)]
pub struct SolvableInfo {
    /// The solvable itself.
    pub id: SolvableId,
    /// Interned name.
    pub name_id: Id,
    /// Interned epoch-version-release.
    pub evr_id: Id,
    /// Interned architecture.
    pub arch_id: Id,
    /// Name as a string.
    pub name: String,
    /// Epoch-version-release as a string.
    pub evr: String,
    /// Architecture as a string.
    pub arch: String,
    /// The repository holding this solvable.
    pub repo: RepoId,
    /// Whether the solvable lives in the installed repository.
    pub installed: bool,
    /// Whether the solvable may be installed on this system.
    pub installable: bool,
}

impl SolvableInfo {
    /// The canonical `name-evr.arch` rendering.
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr, self.arch)
    }
}

/// One entry of the repomd.xml index of an rpm-md repository.
#[derive(Debug, Clone)]
pub struct RepomdEntry {
    /// Entry type: `primary`, `updateinfo`, `filelists`, `deltainfo`, ...
    pub kind: String,
    /// Location relative to the repository base.
    pub location: String,
    /// Declared checksum of the referenced file.
    pub checksum: Option<Checksum>,
}

/// One description file named by the `content` index of a susetags
/// repository.
#[derive(Debug, Clone)]
pub struct SusetagsEntry {
    /// File name below the description directory.
    pub filename: String,
    /// Declared checksum of the file.
    pub checksum: Option<Checksum>,
}

/// One delta package advertised by a repository.
#[derive(Debug, Clone)]
pub struct DeltaInfo {
    /// Name of the target package.
    pub name_id: Id,
    /// Epoch-version-release of the target package.
    pub evr_id: Id,
    /// Architecture of the target package.
    pub arch_id: Id,
    /// Epoch-version-release the delta applies on top of.
    pub base_evr_id: Id,
    /// Sequence string handed to the delta tool for probing and applying.
    pub seq: String,
    /// Location of the delta file relative to the repository base.
    pub location: String,
    /// Declared checksum of the delta file.
    pub checksum: Option<Checksum>,
}

/// One hit produced by [`Pool::search`].
#[derive(Debug, Clone)]
pub struct SearchMatch {
    /// The solvable the matched attribute belongs to.
    pub solvable: SolvableId,
    /// The matched attribute value.
    pub value: String,
}

/// Callback resolving a stub repodata on first use of one of its keys.
///
/// Invoked synchronously with the pool and the stub's descriptor; returns
/// `true` once the extension data has been brought in. The pool never
/// re-enters the callback for the same repodata.
pub type LoadCallback = Box<dyn FnMut(&mut dyn Pool, RepodataId) -> bool>;

/// Solver behavior toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverFlag {
    /// Let the solver remove installed packages to satisfy jobs.
    AllowUninstall,
    /// Do not report already-recommended packages as new work.
    IgnoreAlreadyRecommended,
}

/// A single-use solver instance created by [`Pool::create_solver`].
pub trait Solver {
    /// Toggles a behavior flag. Must be called before [`Solver::solve`].
    fn set_flag(&mut self, flag: SolverFlag, enabled: bool);

    /// Attempts to satisfy the jobs. An empty result means a transaction is
    /// available; otherwise every returned problem carries at least one
    /// solution.
    fn solve(&mut self, jobs: &[Job]) -> Vec<Problem>;

    /// The transaction computed by the last clean [`Solver::solve`], with
    /// steps in commit order.
    fn transaction(&mut self) -> Transaction;
}

/// The contract of the native SAT solver library.
///
/// The driver owns exactly one value of this and threads it everywhere; the
/// trait is object safe so the driver can stay monomorphic. Ingestion
/// methods wrap the library's parsers, which are external collaborators:
/// the driver never interprets metadata formats itself. All repodata
/// attribute accessors operate on the repodata's meta section, the only
/// section the driver touches.
pub trait Pool {
    // -- interning ---------------------------------------------------------

    /// Sets the pool architecture; filters which solvables are installable.
    fn set_arch(&mut self, arch: &str);
    /// Interns a string, creating it if needed.
    fn str2id(&mut self, s: &str) -> Id;
    /// Looks up a string without creating it.
    fn find_str_id(&self, s: &str) -> Option<Id>;
    /// Resolves an id back to its string form. Relation ids render as
    /// `name op evr`.
    fn id2str(&self, id: Id) -> String;
    /// Interns the relation `name <flags> evr`.
    fn rel2id(&mut self, name: Id, evr: Id, flags: u32) -> Id;
    /// Whether the id names an architecture the pool knows.
    fn is_known_arch(&self, arch: Id) -> bool;

    // -- repositories ------------------------------------------------------

    /// Creates an empty repository.
    fn add_repo(&mut self, name: &str) -> RepoId;
    /// Discards a repository and everything it holds.
    fn free_repo(&mut self, repo: RepoId, reuse_ids: bool);
    /// The alias the repository was created with.
    fn repo_name(&self, repo: RepoId) -> String;
    /// Sets the solver-side priority of the repository.
    fn set_repo_priority(&mut self, repo: RepoId, priority: i32);
    /// Marks the repository holding the installed packages.
    fn set_installed(&mut self, repo: Option<RepoId>);
    /// The installed repository, if set.
    fn installed(&self) -> Option<RepoId>;
    /// The solvables of one repository.
    fn repo_solvables(&self, repo: RepoId) -> Vec<SolvableId>;
    /// Whether the repository's storage is contiguous and therefore
    /// eligible for the demand-paging swap after a cache write.
    fn repo_is_contiguous(&self, repo: RepoId) -> bool;
    /// Drops the repository's contents but keeps the handle.
    fn repo_empty(&mut self, repo: RepoId, reuse_ids: bool);
    /// Internalizes pending attribute data.
    fn repo_internalize(&mut self, repo: RepoId);

    // -- ingestion (external parsers) --------------------------------------

    /// Loads a solv binary body produced by [`Pool::repo_write`].
    fn repo_add_solv(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Serializes the whole repository as a solv binary body.
    fn repo_write(&self, repo: RepoId, writer: &mut dyn Write) -> Result<(), PoolError>;
    /// Serializes only the first repodata area (the cache-rewrite path).
    fn repo_write_first_repodata(
        &self,
        repo: RepoId,
        writer: &mut dyn Write,
    ) -> Result<(), PoolError>;
    /// Enumerates the system rpm database into the repository.
    fn repo_add_rpmdb(&mut self, repo: RepoId, dbpath: &Path) -> Result<(), PoolError>;
    /// Loads system product descriptors from a directory.
    fn repo_add_products(&mut self, repo: RepoId, dir: &Path, flags: u32) -> Result<(), PoolError>;
    /// Parses a repomd.xml index into the repository's meta section.
    fn repo_add_repomdxml(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Parses rpm-md package metadata (primary or a named extension).
    fn repo_add_rpmmd(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        language: Option<&str>,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Parses updateinfo.xml advisories.
    fn repo_add_updateinfoxml(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Parses deltainfo/prestodelta metadata.
    fn repo_add_deltainfoxml(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Parses the `content` index of a susetags repository.
    fn repo_add_content(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Parses a susetags description file.
    fn repo_add_susetags(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        defvendor: Id,
        language: Option<&str>,
        flags: u32,
    ) -> Result<(), PoolError>;
    /// Reads a single rpm package header from disk.
    fn repo_add_rpm(
        &mut self,
        repo: RepoId,
        path: &Path,
        flags: u32,
    ) -> Result<SolvableId, PoolError>;

    // -- repository meta ---------------------------------------------------

    /// Looks up a string attribute of the repository's meta section.
    fn repo_lookup_meta_str(&self, repo: RepoId, key: &str) -> Option<String>;
    /// Looks up an id attribute of the repository's meta section.
    fn repo_lookup_meta_id(&self, repo: RepoId, key: &str) -> Option<Id>;
    /// The parsed repomd.xml index entries.
    fn repo_repomd_entries(&self, repo: RepoId) -> Vec<RepomdEntry>;
    /// The description files named by the susetags `content` index.
    fn repo_susetags_entries(&self, repo: RepoId) -> Vec<SusetagsEntry>;
    /// The deltas advertised by this repository. Resolves the delta-info
    /// stub on first use.
    fn repo_deltas(&mut self, repo: RepoId) -> Vec<DeltaInfo>;

    // -- repodata descriptors ----------------------------------------------

    /// Appends a fresh repodata area to the repository.
    fn repo_add_repodata(&mut self, repo: RepoId) -> RepodataId;
    /// The repository's first repodata area, if any.
    fn repo_first_repodata(&self, repo: RepoId) -> Option<RepodataId>;
    /// The repository a repodata area belongs to.
    fn repodata_repo(&self, data: RepodataId) -> RepoId;
    /// Sets a string attribute on the repodata's meta section.
    fn repodata_set_str(&mut self, data: RepodataId, key: &str, value: &str);
    /// Sets a checksum attribute on the repodata's meta section.
    fn repodata_set_checksum(&mut self, data: RepodataId, key: &str, value: &Checksum);
    /// Appends to an id-array attribute of the repodata's meta section.
    fn repodata_add_idarray(&mut self, data: RepodataId, key: &str, value: Id);
    /// Replaces an id-array attribute of the repodata's meta section.
    fn repodata_set_idarray(&mut self, data: RepodataId, key: &str, values: &[Id]);
    /// Looks up a string attribute of the repodata's meta section.
    fn repodata_lookup_str(&self, data: RepodataId, key: &str) -> Option<String>;
    /// Looks up a checksum attribute of the repodata's meta section.
    fn repodata_lookup_checksum(&self, data: RepodataId, key: &str) -> Option<Checksum>;
    /// Looks up an id-array attribute of the repodata's meta section.
    fn repodata_lookup_idarray(&self, data: RepodataId, key: &str) -> Vec<Id>;
    /// Declares the repodata external: its contents live elsewhere and are
    /// brought in by the load callback when one of its declared keys is
    /// queried.
    fn repodata_mark_external(&mut self, data: RepodataId);
    /// Arms the stubs of all external repodata registered on the repo.
    fn repo_create_stubs(&mut self, repo: RepoId);
    /// Internalizes pending attribute data of one repodata area.
    fn repodata_internalize(&mut self, data: RepodataId);
    /// Serializes one repodata area (the extension-cache write path).
    fn repodata_write(&self, data: RepodataId, writer: &mut dyn Write) -> Result<(), PoolError>;
    /// Grows the repodata to cover the whole repository, as required before
    /// re-reading an extension cache over it.
    fn repodata_extend_to_repo(&mut self, data: RepodataId);
    /// Loads a solv binary body into this repodata area.
    fn repodata_add_solv(
        &mut self,
        data: RepodataId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError>;

    // -- queries -----------------------------------------------------------

    /// Every live solvable in the pool.
    fn solvables(&self) -> Vec<SolvableId>;
    /// Summary of one solvable.
    fn solvable(&self, id: SolvableId) -> SolvableInfo;
    /// The canonical `name-evr.arch` rendering of one solvable.
    fn solvable_str(&self, id: SolvableId) -> String;
    /// Looks up a string attribute of a solvable. May resolve stubs whose
    /// declared keys are touched (e.g. translated summaries).
    fn lookup_str(&mut self, id: SolvableId, key: &str) -> Option<String>;
    /// Looks up a numeric attribute of a solvable.
    fn lookup_num(&self, id: SolvableId, key: &str) -> Option<u64>;
    /// Looks up a checksum attribute of a solvable.
    fn lookup_checksum(&self, id: SolvableId, key: &str) -> Option<Checksum>;
    /// The download location of a solvable relative to its repository base.
    fn lookup_location(&self, id: SolvableId) -> Option<String>;
    /// The solvables providing a dependency.
    fn providers(&self, dep: Id) -> Vec<SolvableId>;
    /// Every id that occurs as a providing capability, for glob matching.
    fn all_providing_ids(&self) -> Vec<Id>;
    /// Interns a fixed set of solvables for a one-of job.
    fn to_whatprovides(&mut self, ids: &[SolvableId]) -> Id;
    /// The solvables a job selects.
    fn job_solvables(&self, job: &Job) -> Vec<SolvableId>;
    /// Attribute search over one repository or the whole pool. May resolve
    /// stubs whose declared keys are touched.
    fn search(
        &mut self,
        repo: Option<RepoId>,
        key: &str,
        needle: &str,
        flags: u32,
    ) -> Vec<SearchMatch>;

    // -- whatprovides maintenance ------------------------------------------

    /// Injects file-path providers and returns the ids that were added.
    fn add_file_provides(&mut self) -> Vec<Id>;
    /// (Re)builds the whatprovides index.
    fn create_whatprovides(&mut self);

    // -- stubs and solving -------------------------------------------------

    /// Registers (or clears) the stub load callback.
    fn set_load_callback(&mut self, callback: Option<LoadCallback>);
    /// Creates a fresh solver over the current pool contents.
    fn create_solver(&mut self) -> Box<dyn Solver + '_>;
}
