//! The system package database contract consumed by the commit stage.
//!
//! The native rpm transaction set is an external collaborator; this module
//! pins down the slice of it the driver uses and ships one process-exec
//! implementation driving the `rpm` executable, in the same spirit as the
//! curl and applydeltarpm helpers.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::CommitError;

/// Notifications emitted while the transaction runs.
pub trait TransactionCallback {
    /// A package install is starting.
    fn install_start(&mut self, label: &str);
    /// A package erase is starting.
    fn erase_start(&mut self, label: &str);
}

/// One open transaction against the system package database. Signature
/// verification is disabled; the driver does its own checksum checks
/// against repository metadata.
pub trait RpmTransactionSet {
    /// Queues an install from an open package stream. The stream stays
    /// valid until [`RpmTransactionSet::run`] returns. `multi` installs
    /// next to existing versions instead of replacing them.
    fn add_install(&mut self, label: &str, package: File, multi: bool) -> Result<(), CommitError>;
    /// Queues an erase of the installed package with this database id.
    fn add_erase(&mut self, label: &str, dbid: u64) -> Result<(), CommitError>;
    /// Verifies the queued set; any returned problem is fatal.
    fn check(&mut self) -> Vec<String>;
    /// Orders the queued operations.
    fn order(&mut self);
    /// Applies the transaction, reporting progress through the callback.
    fn run(&mut self, callback: &mut dyn TransactionCallback) -> Result<(), Vec<String>>;
}

/// Opens transactions against a root.
pub trait Rpm {
    /// Opens a transaction set against the given filesystem root.
    fn open_transaction(&mut self, root: &Path) -> Result<Box<dyn RpmTransactionSet>, CommitError>;
}

/// Drives the system `rpm` executable. A binding against the native
/// transaction-set API plugs in behind the same traits.
#[derive(Debug, Clone)]
pub struct RpmExec {
    program: PathBuf,
}

impl Default for RpmExec {
    fn default() -> Self {
        RpmExec {
            program: PathBuf::from("rpm"),
        }
    }
}

impl RpmExec {
    /// Uses the given `rpm` executable.
    pub fn new(program: impl Into<PathBuf>) -> RpmExec {
        RpmExec {
            program: program.into(),
        }
    }
}

impl Rpm for RpmExec {
    fn open_transaction(&mut self, root: &Path) -> Result<Box<dyn RpmTransactionSet>, CommitError> {
        Ok(Box::new(ExecTransaction {
            program: self.program.clone(),
            root: root.to_path_buf(),
            operations: Vec::new(),
        }))
    }
}

enum Operation {
    Install {
        label: String,
        package: tempfile::NamedTempFile,
        multi: bool,
    },
    Erase {
        label: String,
    },
}

struct ExecTransaction {
    program: PathBuf,
    root: PathBuf,
    operations: Vec<Operation>,
}

impl ExecTransaction {
    fn rpm(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--root")
            .arg(&self.root)
            .arg("--nosignature")
            .arg("--nodigest");
        command
    }

    fn capture_failure(output: io::Result<std::process::Output>) -> Option<String> {
        match output {
            Ok(output) if output.status.success() => None,
            Ok(output) => Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            Err(error) => Some(error.to_string()),
        }
    }
}

impl RpmTransactionSet for ExecTransaction {
    fn add_install(&mut self, label: &str, mut package: File, multi: bool) -> Result<(), CommitError> {
        // the CLI wants a path; spool the open stream back onto disk
        let mut spooled = tempfile::NamedTempFile::new()?;
        io::copy(&mut package, spooled.as_file_mut())?;
        self.operations.push(Operation::Install {
            label: label.to_string(),
            package: spooled,
            multi,
        });
        Ok(())
    }

    fn add_erase(&mut self, label: &str, _dbid: u64) -> Result<(), CommitError> {
        self.operations.push(Operation::Erase {
            label: label.to_string(),
        });
        Ok(())
    }

    fn check(&mut self) -> Vec<String> {
        let mut problems = Vec::new();
        for operation in &self.operations {
            if let Operation::Install { package, multi, .. } = operation {
                let mut command = self.rpm();
                command
                    .arg(if *multi { "-i" } else { "-U" })
                    .arg("--test")
                    .arg(package.path());
                if let Some(problem) = Self::capture_failure(command.output()) {
                    problems.push(problem);
                }
            }
        }
        problems
    }

    fn order(&mut self) {
        // erases after the installs that may obsolete them, the order rpm
        // itself would pick for a simple set
        self.operations
            .sort_by_key(|op| matches!(op, Operation::Erase { .. }));
    }

    fn run(&mut self, callback: &mut dyn TransactionCallback) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        for operation in &self.operations {
            match operation {
                Operation::Install {
                    label,
                    package,
                    multi,
                } => {
                    callback.install_start(label);
                    let mut command = self.rpm();
                    command
                        .arg(if *multi { "-i" } else { "-U" })
                        .arg(package.path());
                    if let Some(error) = Self::capture_failure(command.output()) {
                        errors.push(format!("{label}: {error}"));
                    }
                }
                Operation::Erase { label } => {
                    callback.erase_start(label);
                    let mut command = self.rpm();
                    command.arg("-e").arg(label);
                    if let Some(error) = Self::capture_failure(command.output()) {
                        errors.push(format!("{label}: {error}"));
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
