//! Commits a clean transaction: summary and confirmation, download
//! planning with delta reconstruction, and the ordered install/erase run
//! against the system package database.

pub mod rpm;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};

use itertools::Itertools;
use solv_pool::keys::{RPM_RPMDBID, SOLVABLE_CHECKSUM, SUSETAGS_DATADIR};
use solv_pool::{
    Pool, RepoId, RpmStepKind, SolvableId, SolvableInfo, StepKind, Transaction,
};
use solv_repodata::{Fetcher, RepoKind, SharedRepo};

use self::rpm::{Rpm, TransactionCallback};

/// The default package directory of a susetags repository.
const DEFAULT_DATADIR: &str = "suse";

/// Knobs of the commit stage.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    /// Filesystem root the transaction is applied against.
    pub root: PathBuf,
    /// The system rpm database file; its presence gates delta
    /// reconstruction.
    pub rpmdb_path: PathBuf,
    /// The delta reconstruction helper.
    pub deltarpm_program: PathBuf,
}

impl Default for CommitConfig {
    fn default() -> Self {
        CommitConfig {
            root: PathBuf::from("/"),
            rpmdb_path: PathBuf::from("/var/lib/rpm/Packages"),
            deltarpm_program: PathBuf::from("/usr/bin/applydeltarpm"),
        }
    }
}

/// Error aborting the commit; all of these are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// Interaction or spooling trouble.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A package file could not be retrieved.
    #[error("{nevra}: package not available")]
    MissingPackage {
        /// The affected package.
        nevra: String,
    },
    /// An installed package has no database id to erase by.
    #[error("{nevra}: installed package has no rpm database id")]
    MissingDbId {
        /// The affected package.
        nevra: String,
    },
    /// The transaction check reported problems.
    #[error("transaction check failed:\n{}", .0.join("\n"))]
    Check(Vec<String>),
    /// The transaction run reported errors.
    #[error("transaction failed:\n{}", .0.join("\n"))]
    Run(Vec<String>),
}

/// How the commit ended.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The transaction was applied (or there was nothing to do).
    Done,
    /// The user answered the confirmation with no.
    Declined,
}

/// Commits the transaction end to end.
pub fn execute(
    pool: &mut dyn Pool,
    transaction: &Transaction,
    repos: &[SharedRepo],
    fetcher: &Fetcher,
    config: &CommitConfig,
    rpm: &mut dyn Rpm,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<CommitOutcome, CommitError> {
    if transaction.is_empty() {
        writeln!(output, "Nothing to do.")?;
        return Ok(CommitOutcome::Done);
    }

    print_summary(pool, transaction, output)?;
    write!(output, "OK to continue (y/n)? ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if answer.trim() != "y" {
        return Ok(CommitOutcome::Declined);
    }

    let files = plan_downloads(pool, transaction, repos, fetcher, config, output)?;

    let mut ts = rpm.open_transaction(&config.root)?;
    for step in &transaction.steps {
        let label = pool.solvable_str(step.solvable);
        match step.rpm_kind {
            RpmStepKind::Erase => {
                let dbid = pool
                    .lookup_num(step.solvable, RPM_RPMDBID)
                    .ok_or(CommitError::MissingDbId {
                        nevra: label.clone(),
                    })?;
                ts.add_erase(&label, dbid)?;
            }
            RpmStepKind::Install | RpmStepKind::MultiInstall => {
                let file = files
                    .get(&step.solvable)
                    .and_then(|file| file.try_clone().ok())
                    .ok_or(CommitError::MissingPackage {
                        nevra: label.clone(),
                    })?;
                ts.add_install(&label, file, step.rpm_kind == RpmStepKind::MultiInstall)?;
            }
            RpmStepKind::Ignore => {}
        }
    }
    let problems = ts.check();
    if !problems.is_empty() {
        return Err(CommitError::Check(problems));
    }
    ts.order();

    struct Printer<'w> {
        output: &'w mut dyn Write,
    }
    impl TransactionCallback for Printer<'_> {
        fn install_start(&mut self, label: &str) {
            let _ = writeln!(self.output, "install {label}");
        }
        fn erase_start(&mut self, label: &str) {
            let _ = writeln!(self.output, "erase {label}");
        }
    }
    ts.run(&mut Printer { output }).map_err(CommitError::Run)?;
    drop(files);
    Ok(CommitOutcome::Done)
}

fn print_summary(
    pool: &dyn Pool,
    transaction: &Transaction,
    output: &mut dyn Write,
) -> Result<(), CommitError> {
    writeln!(output, "Transaction summary:")?;
    writeln!(output)?;
    let grouped: HashMap<StepKind, Vec<_>> = transaction
        .steps
        .iter()
        .filter(|step| step.kind != StepKind::Ignore)
        .map(|step| (step.kind, step))
        .into_group_map();
    let order = [
        (StepKind::Erase, "erased"),
        (StepKind::Downgraded, "downgraded"),
        (StepKind::Changed, "changed"),
        (StepKind::ArchChange, "changed the architecture of"),
        (StepKind::VendorChange, "changed the vendor of"),
        (StepKind::Reinstalled, "reinstalled"),
        (StepKind::Upgraded, "upgraded"),
        (StepKind::MultiInstall, "multi-installed"),
        (StepKind::Install, "installed"),
    ];
    for (kind, verb) in order {
        let Some(steps) = grouped.get(&kind) else {
            continue;
        };
        writeln!(output, "{} {} packages:", steps.len(), verb)?;
        for step in steps {
            match step.other {
                Some(other) => writeln!(
                    output,
                    "  - {} -> {}",
                    pool.solvable_str(other),
                    pool.solvable_str(step.solvable)
                )?,
                None => writeln!(output, "  - {}", pool.solvable_str(step.solvable))?,
            }
        }
        writeln!(output)?;
    }
    writeln!(
        output,
        "install size change: {} K",
        transaction.install_size_change
    )?;
    writeln!(output)?;
    Ok(())
}

fn find_record(repos: &[SharedRepo], repo: RepoId) -> Option<SharedRepo> {
    repos
        .iter()
        .find(|record| record.borrow().handle == Some(repo))
        .cloned()
}

fn plan_downloads(
    pool: &mut dyn Pool,
    transaction: &Transaction,
    repos: &[SharedRepo],
    fetcher: &Fetcher,
    config: &CommitConfig,
    output: &mut dyn Write,
) -> Result<HashMap<SolvableId, File>, CommitError> {
    let mut files = HashMap::new();
    let delta_capable = config.rpmdb_path.exists() && is_executable(&config.deltarpm_program);
    let mut downloaded_any = false;

    for step in &transaction.steps {
        if !matches!(
            step.rpm_kind,
            RpmStepKind::Install | RpmStepKind::MultiInstall
        ) {
            continue;
        }
        let info = pool.solvable(step.solvable);
        let record = find_record(repos, info.repo);
        let (kind, baseurl) = match &record {
            Some(record) => {
                let r = record.borrow();
                (r.kind, r.baseurl.clone().unwrap_or_default())
            }
            None => (RepoKind::CommandLine, String::new()),
        };

        if kind == RepoKind::CommandLine {
            let path = pool
                .lookup_location(step.solvable)
                .ok_or(CommitError::MissingPackage {
                    nevra: info.nevra(),
                })?;
            let file = File::open(Path::new(&path)).map_err(|_| CommitError::MissingPackage {
                nevra: info.nevra(),
            })?;
            files.insert(step.solvable, file);
            continue;
        }

        let mut progress = '.';
        let mut planned: Option<File> = None;
        if delta_capable {
            if let Some(file) =
                reconstruct_from_delta(pool, &info, &baseurl, fetcher, &config.deltarpm_program)
            {
                planned = Some(file);
                progress = 'd';
            }
        }
        if planned.is_none() {
            let handle = info.repo;
            let mut location =
                pool.lookup_location(step.solvable)
                    .ok_or(CommitError::MissingPackage {
                        nevra: info.nevra(),
                    })?;
            if kind == RepoKind::Yast2 {
                let datadir = pool
                    .repo_lookup_meta_str(handle, SUSETAGS_DATADIR)
                    .unwrap_or_else(|| DEFAULT_DATADIR.to_string());
                location = format!("{datadir}/{location}");
            }
            let checksum = pool.lookup_checksum(step.solvable, SOLVABLE_CHECKSUM);
            let fetched = fetcher
                .fetch(&baseurl, &location, false, checksum.as_ref(), None)
                .ok_or(CommitError::MissingPackage {
                    nevra: info.nevra(),
                })?;
            planned = Some(fetched.into_file()?);
        }
        files.insert(step.solvable, planned.expect("planned just above"));
        write!(output, "{progress}")?;
        output.flush()?;
        downloaded_any = true;
    }
    if downloaded_any {
        writeln!(output)?;
    }
    Ok(files)
}

/// Tries to rebuild the target package from a delta against an installed
/// base. Every failure falls through to the direct download.
fn reconstruct_from_delta(
    pool: &mut dyn Pool,
    target: &SolvableInfo,
    baseurl: &str,
    fetcher: &Fetcher,
    program: &Path,
) -> Option<File> {
    let deltas = pool.repo_deltas(target.repo);
    let installed = pool.installed()?;
    for delta in deltas {
        if delta.name_id != target.name_id
            || delta.evr_id != target.evr_id
            || delta.arch_id != target.arch_id
        {
            continue;
        }
        let base_installed = pool.repo_solvables(installed).into_iter().any(|id| {
            let base = pool.solvable(id);
            base.name_id == target.name_id
                && base.arch_id == target.arch_id
                && base.evr_id == delta.base_evr_id
        });
        if !base_installed {
            continue;
        }
        let probe = Process::new(program)
            .arg("-c")
            .arg("-s")
            .arg(&delta.seq)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !probe.map(|status| status.success()).unwrap_or(false) {
            continue;
        }
        let Some(fetched) =
            fetcher.fetch(baseurl, &delta.location, false, delta.checksum.as_ref(), None)
        else {
            continue;
        };
        let Ok(delta_file) = fetched.into_file() else {
            continue;
        };
        let Ok(reconstructed) = tempfile::NamedTempFile::new() else {
            continue;
        };
        let applied = Process::new(program)
            .arg("-a")
            .arg(&target.arch)
            .arg("/dev/stdin")
            .arg(reconstructed.path())
            .stdin(Stdio::from(delta_file))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !applied.map(|status| status.success()).unwrap_or(false) {
            continue;
        }
        if let Ok(file) = reconstructed.reopen() {
            return Some(file);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
