//! The driver: repository setup, request compilation, solving, commit.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

use solv_pool::flags::{
    REPO_NO_INTERNALIZE, REPO_REUSE_REPODATA, SEARCH_NOCASE, SEARCH_SUBSTRING, SOLVER_ERASE,
    SOLVER_INSTALL, SOLVER_SOLVABLE, SOLVER_SOLVABLE_ALL, SOLVER_UPDATE,
};
use solv_pool::keys::{
    SOLVABLE_DESCRIPTION, SOLVABLE_LICENSE, SOLVABLE_NAME, SOLVABLE_SUMMARY, SOLVABLE_URL,
};
use solv_pool::{Job, Pool, SolvableId};
use solv_repodata::{LoadError, Loader, LoaderConfig, RepoRecord, SharedRepo};

use crate::commit::rpm::Rpm;
use crate::commit::{self, CommitConfig, CommitOutcome};
use crate::problems::{self, LoopOutcome};
use crate::select;

/// The request verbs of the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Case-insensitive substring search over package names.
    Search,
    /// One line per selected package.
    List,
    /// Full details of the selected packages.
    Info,
    /// Bring the selection onto the system.
    Install,
    /// Remove the selection from the system.
    Erase,
    /// Update the selection, or everything.
    Update,
}

impl Command {
    /// Whether the verb mutates the system and therefore solves and
    /// commits.
    pub fn is_transactional(self) -> bool {
        matches!(self, Command::Install | Command::Erase | Command::Update)
    }
}

/// Everything a driver run needs to know about its host.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    /// Repository discovery, caching, and fetching.
    pub loader: LoaderConfig,
    /// Commit-stage paths.
    pub commit: CommitConfig,
}

/// Error aborting the driver before the interactive stages.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Repository initialization failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Interaction channel failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The problem loop failed outside a user decision.
    #[error(transparent)]
    Solve(#[from] crate::problems::SolveLoopError),
    /// The commit stage failed.
    #[error(transparent)]
    Commit(#[from] commit::CommitError),
}

/// A fully initialized driver session: pool populated, repositories
/// loaded, ready to take one command.
pub struct Driver {
    pool: Box<dyn Pool>,
    loader: Loader,
    config: DriverConfig,
    repos: Vec<SharedRepo>,
    cmdline: Option<(SharedRepo, HashMap<String, SolvableId>)>,
}

impl Driver {
    /// Initializes the pool from the system database and every enabled
    /// repository.
    pub fn new(mut pool: Box<dyn Pool>, config: DriverConfig) -> Result<Driver, DriverError> {
        let loader = Loader::new(config.loader.clone());
        loader.setup(pool.as_mut());
        let system = loader.load_system(pool.as_mut())?;
        let mut repos = loader.load_repos(pool.as_mut());
        repos.insert(0, system);
        Ok(Driver {
            pool,
            loader,
            config,
            repos,
            cmdline: None,
        })
    }

    /// The loaded repository records, the system repository first.
    pub fn repos(&self) -> &[SharedRepo] {
        &self.repos
    }

    /// Direct access to the pool, mainly for inspection in tests.
    pub fn pool_mut(&mut self) -> &mut dyn Pool {
        self.pool.as_mut()
    }

    /// Runs one command. Returns the process exit code.
    pub fn run(
        &mut self,
        cmd: Command,
        args: &[String],
        rpm: &mut dyn Rpm,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<i32, DriverError> {
        if cmd == Command::Search {
            return self.search(args, output);
        }

        self.setup_cmdline_repo(args);
        let addedprovides = self.pool.add_file_provides();
        self.loader
            .rewrite_repos(self.pool.as_mut(), &self.repos, &addedprovides);
        self.pool.create_whatprovides();

        let mut jobs = Vec::new();
        for arg in args {
            if let Some((_, packages)) = &self.cmdline {
                if let Some(&solvable) = packages.get(arg.as_str()) {
                    jobs.push(Job::new(SOLVER_SOLVABLE, solvable.0));
                    continue;
                }
            }
            jobs.extend(select::mkjobs(self.pool.as_mut(), cmd, arg));
        }

        match cmd {
            Command::List | Command::Info => self.list_or_info(cmd, jobs, output),
            Command::Install | Command::Erase | Command::Update => {
                self.transact(cmd, jobs, rpm, input, output)
            }
            Command::Search => unreachable!("handled above"),
        }
    }

    fn search(&mut self, args: &[String], output: &mut dyn Write) -> Result<i32, DriverError> {
        let needle = args.first().map(String::as_str).unwrap_or("");
        let mut matches: Vec<SolvableId> = self
            .pool
            .search(None, SOLVABLE_NAME, needle, SEARCH_SUBSTRING | SEARCH_NOCASE)
            .into_iter()
            .map(|hit| hit.solvable)
            .collect();
        matches.sort();
        matches.dedup();
        for solvable in matches {
            let summary = self
                .pool
                .lookup_str(solvable, SOLVABLE_SUMMARY)
                .unwrap_or_default();
            writeln!(
                output,
                " - {}: {}",
                self.pool.solvable_str(solvable),
                summary
            )?;
        }
        Ok(0)
    }

    fn setup_cmdline_repo(&mut self, args: &[String]) {
        let packages: Vec<&String> = args
            .iter()
            .filter(|arg| arg.ends_with(".rpm") && Path::new(arg.as_str()).is_file())
            .collect();
        if packages.is_empty() {
            return;
        }
        let record = std::rc::Rc::new(std::cell::RefCell::new(RepoRecord::commandline()));
        let handle = self.pool.add_repo("@commandline");
        record.borrow_mut().handle = Some(handle);
        let mut ingested = HashMap::new();
        for arg in packages {
            match self.pool.repo_add_rpm(
                handle,
                Path::new(arg.as_str()),
                REPO_REUSE_REPODATA | REPO_NO_INTERNALIZE,
            ) {
                Ok(solvable) => {
                    ingested.insert(arg.clone(), solvable);
                }
                Err(error) => tracing::warn!("{arg}: cannot read rpm header: {error}"),
            }
        }
        self.pool.repo_internalize(handle);
        self.repos.push(record.clone());
        self.cmdline = Some((record, ingested));
    }

    fn list_or_info(
        &mut self,
        cmd: Command,
        jobs: Vec<Job>,
        output: &mut dyn Write,
    ) -> Result<i32, DriverError> {
        if jobs.is_empty() {
            writeln!(output, "no package matched.")?;
            return Ok(1);
        }
        for job in jobs {
            for solvable in self.pool.job_solvables(&job) {
                let info = self.pool.solvable(solvable);
                if cmd == Command::Info {
                    writeln!(output, "Name:        {}", info.nevra())?;
                    writeln!(output, "Repo:        {}", self.pool.repo_name(info.repo))?;
                    let summary = self
                        .pool
                        .lookup_str(solvable, SOLVABLE_SUMMARY)
                        .unwrap_or_default();
                    writeln!(output, "Summary:     {summary}")?;
                    if let Some(url) = self.pool.lookup_str(solvable, SOLVABLE_URL) {
                        writeln!(output, "Url:         {url}")?;
                    }
                    if let Some(license) = self.pool.lookup_str(solvable, SOLVABLE_LICENSE) {
                        writeln!(output, "License:     {license}")?;
                    }
                    let description = self
                        .pool
                        .lookup_str(solvable, SOLVABLE_DESCRIPTION)
                        .unwrap_or_default();
                    writeln!(output, "Description:\n{description}")?;
                    writeln!(output)?;
                } else {
                    writeln!(
                        output,
                        "  - {} [{}]",
                        info.nevra(),
                        self.pool.repo_name(info.repo)
                    )?;
                    let summary = self
                        .pool
                        .lookup_str(solvable, SOLVABLE_SUMMARY)
                        .unwrap_or_default();
                    writeln!(output, "    {summary}")?;
                }
            }
        }
        Ok(0)
    }

    fn transact(
        &mut self,
        cmd: Command,
        mut jobs: Vec<Job>,
        rpm: &mut dyn Rpm,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<i32, DriverError> {
        if cmd == Command::Update && jobs.is_empty() {
            // no arguments: update the world
            jobs.push(Job::new(SOLVER_SOLVABLE_ALL, 0));
        }
        if jobs.is_empty() {
            writeln!(output, "no package matched.")?;
            return Ok(1);
        }
        for job in &mut jobs {
            match cmd {
                Command::Install => job.how |= SOLVER_INSTALL,
                Command::Erase => job.how |= SOLVER_ERASE,
                Command::Update => {
                    let update = job.select() == SOLVER_SOLVABLE_ALL
                        || self
                            .pool
                            .job_solvables(job)
                            .into_iter()
                            .any(|id| self.pool.solvable(id).installed);
                    job.how |= if update { SOLVER_UPDATE } else { SOLVER_INSTALL };
                }
                _ => {}
            }
        }

        let outcome = problems::run(
            self.pool.as_mut(),
            &mut jobs,
            cmd == Command::Erase,
            input,
            output,
        )?;
        let transaction = match outcome {
            LoopOutcome::Transaction(transaction) => transaction,
            LoopOutcome::Quit => return Ok(1),
        };
        let outcome = commit::execute(
            self.pool.as_mut(),
            &transaction,
            &self.repos,
            self.loader.fetcher(),
            &self.config.commit,
            rpm,
            input,
            output,
        )?;
        Ok(match outcome {
            CommitOutcome::Done => 0,
            CommitOutcome::Declined => 1,
        })
    }
}
