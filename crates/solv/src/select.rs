//! Compiles a user argument into solver jobs.
//!
//! Matching is tried in a fixed order and the first rule that selects
//! anything wins: file paths against the (complete) file list, relational
//! constraints, then plain names with progressively more aggressive
//! splitting on `.` and `-`.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use solv_pool::flags::{
    REL_ARCH, REL_EQ, REL_GT, REL_LT, SEARCH_COMPLETE_FILELIST, SEARCH_FILES, SEARCH_GLOB,
    SEARCH_STRING, SOLVER_NOAUTOSET, SOLVER_SETARCH, SOLVER_SETEV, SOLVER_SETEVR, SOLVER_SOLVABLE,
    SOLVER_SOLVABLE_NAME, SOLVER_SOLVABLE_ONE_OF, SOLVER_SOLVABLE_PROVIDES,
};
use solv_pool::keys::SOLVABLE_FILELIST;
use solv_pool::{Id, Job, Pool};

use crate::Command;

fn has_glob_chars(s: &str) -> bool {
    s.contains(['[', '*', '?'])
}

fn valid_arch(pool: &dyn Pool, arch: &str) -> bool {
    if arch.is_empty() {
        return false;
    }
    pool.find_str_id(arch)
        .is_some_and(|id| pool.is_known_arch(id))
}

/// Compiles one raw argument into jobs. An empty result means nothing in
/// the pool matches the argument.
pub fn mkjobs(pool: &mut dyn Pool, cmd: Command, arg: &str) -> Vec<Job> {
    if arg.starts_with('/') {
        let jobs = filelist_jobs(pool, cmd, arg);
        if !jobs.is_empty() {
            return jobs;
        }
    }
    static RELATION: OnceLock<Regex> = OnceLock::new();
    let relation = RELATION.get_or_init(|| Regex::new(r"^(.+?)\s*([<=>]+)\s*(.+)$").unwrap());
    if let Some(captures) = relation.captures(arg) {
        let name = &captures[1];
        let op = &captures[2];
        let evr = &captures[3];
        let mut flags = 0;
        if op.contains('<') {
            flags |= REL_LT;
        }
        if op.contains('=') {
            flags |= REL_EQ;
        }
        if op.contains('>') {
            flags |= REL_GT;
        }
        let jobs = depglob(pool, name, true, true);
        if !jobs.is_empty() {
            let evr = pool.str2id(evr);
            return limitjobs(pool, &jobs, flags, evr);
        }
        if let Some((stem, arch)) = name.rsplit_once('.') {
            if valid_arch(pool, arch) {
                let jobs = depglob(pool, stem, true, true);
                if !jobs.is_empty() {
                    let arch = pool.str2id(arch);
                    let jobs = limitjobs(pool, &jobs, REL_ARCH, arch);
                    let evr = pool.str2id(evr);
                    return limitjobs(pool, &jobs, flags, evr);
                }
            }
        }
        return Vec::new();
    }

    let jobs = depglob(pool, arg, true, true);
    if !jobs.is_empty() {
        return jobs;
    }
    if let Some((stem, arch)) = arg.rsplit_once('.') {
        if valid_arch(pool, arch) {
            let jobs = depglob(pool, stem, true, true);
            if !jobs.is_empty() {
                let arch = pool.str2id(arch);
                return limitjobs(pool, &jobs, REL_ARCH, arch);
            }
        }
    }
    if let Some((name, evr)) = arg.rsplit_once('-') {
        let jobs = depglob(pool, name, true, false);
        if !jobs.is_empty() {
            return limitjobs_arch(pool, &jobs, REL_EQ, evr);
        }
        // name-ver-rel: move the split one dash to the left
        if let Some((name, version)) = name.rsplit_once('-') {
            let jobs = depglob(pool, name, true, false);
            if !jobs.is_empty() {
                let evr = format!("{version}-{evr}");
                return limitjobs_arch(pool, &jobs, REL_EQ, &evr);
            }
        }
    }
    Vec::new()
}

fn filelist_jobs(pool: &mut dyn Pool, cmd: Command, arg: &str) -> Vec<Job> {
    let match_mode = if has_glob_chars(arg) {
        SEARCH_GLOB
    } else {
        SEARCH_STRING
    };
    let repo = if cmd == Command::Erase {
        pool.installed()
    } else {
        None
    };
    let flags = match_mode | SEARCH_FILES | SEARCH_COMPLETE_FILELIST;
    let mut matches: Vec<_> = pool
        .search(repo, SOLVABLE_FILELIST, arg, flags)
        .into_iter()
        .map(|hit| hit.solvable)
        .filter(|&id| {
            let info = pool.solvable(id);
            info.installable || info.installed
        })
        .collect();
    matches.sort();
    matches.dedup();
    if matches.is_empty() {
        return Vec::new();
    }
    println!("[using file list match for '{arg}']");
    if matches.len() > 1 {
        let what = pool.to_whatprovides(&matches);
        vec![Job::new(SOLVER_SOLVABLE_ONE_OF, what)]
    } else {
        vec![Job::new(SOLVER_SOLVABLE | SOLVER_NOAUTOSET, matches[0].0)]
    }
}

/// Resolves a (possibly globbed) name to name or provides jobs, sorted by
/// id so the output is deterministic.
pub fn depglob(pool: &mut dyn Pool, name: &str, globname: bool, globdep: bool) -> Vec<Job> {
    if let Some(id) = pool.find_str_id(name) {
        let providers = pool.providers(id);
        if !providers.is_empty() {
            if globname
                && providers
                    .iter()
                    .any(|&s| pool.solvable(s).name_id == id)
            {
                return vec![Job::new(SOLVER_SOLVABLE_NAME, id)];
            }
            if globname && globdep {
                println!("[using capability match for '{name}']");
            }
            return vec![Job::new(SOLVER_SOLVABLE_PROVIDES, id)];
        }
    }
    if !has_glob_chars(name) {
        return Vec::new();
    }
    let Ok(pattern) = glob::Pattern::new(name) else {
        return Vec::new();
    };
    if globname {
        let mut name_ids: BTreeSet<Id> = BTreeSet::new();
        for solvable in pool.solvables() {
            let info = pool.solvable(solvable);
            if info.installable && pattern.matches(&info.name) {
                name_ids.insert(info.name_id);
            }
        }
        if !name_ids.is_empty() {
            return name_ids
                .into_iter()
                .map(|id| Job::new(SOLVER_SOLVABLE_NAME, id))
                .collect();
        }
    }
    if globdep {
        let matching: BTreeSet<Id> = pool
            .all_providing_ids()
            .into_iter()
            .filter(|&id| pattern.matches(&pool.id2str(id)))
            .collect();
        if !matching.is_empty() {
            println!("[using capability match for '{name}']");
            return matching
                .into_iter()
                .map(|id| Job::new(SOLVER_SOLVABLE_PROVIDES, id))
                .collect();
        }
    }
    Vec::new()
}

/// Narrows each job's selection with the relation `<flags> evr`, setting
/// the SET bits that tell the solver which fields the user fixed.
pub fn limitjobs(pool: &mut dyn Pool, jobs: &[Job], flags: u32, evr: Id) -> Vec<Job> {
    jobs.iter()
        .map(|job| {
            let mut how = job.how;
            let what = pool.rel2id(job.what, evr, flags);
            if flags == REL_ARCH {
                how |= SOLVER_SETARCH;
            }
            if flags == REL_EQ && job.select() == SOLVER_SOLVABLE_NAME {
                if pool.id2str(evr).contains('-') {
                    how |= SOLVER_SETEVR;
                } else {
                    how |= SOLVER_SETEV;
                }
            }
            Job::new(how, what)
        })
        .collect()
}

/// Like [`limitjobs`] but first peels a trailing `.arch` off the evr when
/// it names a known architecture.
pub fn limitjobs_arch(pool: &mut dyn Pool, jobs: &[Job], flags: u32, evr: &str) -> Vec<Job> {
    if let Some((stem, arch)) = evr.rsplit_once('.') {
        if valid_arch(pool, arch) {
            let arch = pool.str2id(arch);
            let jobs = limitjobs(pool, jobs, REL_ARCH, arch);
            let stem = pool.str2id(stem);
            return limitjobs(pool, &jobs, flags, stem);
        }
    }
    let evr = pool.str2id(evr);
    limitjobs(pool, jobs, flags, evr)
}

#[cfg(test)]
mod test {
    use super::*;
    use solv_pool::mem::MemPool;

    const REPO: &str = "memsolv 1
s\tfoo\t1.0-1\tx86_64\tacme
f\t/usr/bin/foo
s\tfoo-devel\t1.0-1\tx86_64\tacme
s\tlibbar\t2.0-1\tx86_64\tacme
p\tbar-api = 2.0
";

    fn pool() -> MemPool {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test");
        pool.repo_add_solv(repo, &mut REPO.as_bytes(), 0).unwrap();
        pool
    }

    #[test]
    fn test_plain_name_yields_name_job() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "foo");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].select(), SOLVER_SOLVABLE_NAME);
        assert_eq!(jobs[0].what, pool.find_str_id("foo").unwrap());
    }

    #[test]
    fn test_capability_match_yields_provides_job() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "bar-api");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].select(), SOLVER_SOLVABLE_PROVIDES);
    }

    #[test]
    fn test_name_arch_applies_rel_arch_with_setarch() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "foo.x86_64");
        assert_eq!(jobs.len(), 1);
        let job = jobs[0];
        assert_eq!(job.select(), SOLVER_SOLVABLE_NAME);
        assert_ne!(job.how & SOLVER_SETARCH, 0);
        // the selection narrowed to exactly the one solvable
        assert_eq!(pool.job_solvables(&job).len(), 1);
    }

    #[test]
    fn test_name_evr_split_sets_setevr() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "foo-1.0-1");
        assert_eq!(jobs.len(), 1);
        let job = jobs[0];
        assert_ne!(job.how & SOLVER_SETEVR, 0);
        assert_eq!(pool.job_solvables(&job).len(), 1);

        // a version without release locks only epoch-version
        let jobs = mkjobs(&mut pool, Command::Install, "foo-1.0");
        assert_ne!(jobs[0].how & SOLVER_SETEV, 0);
        assert_eq!(jobs[0].how & SOLVER_SETEVR, 0);
    }

    #[test]
    fn test_greedy_dash_split_prefers_last_dash() {
        let mut pool = pool();
        // "foo-devel" must match the package of that name, not "foo"
        // limited to evr "devel"
        let jobs = mkjobs(&mut pool, Command::Install, "foo-devel");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].select(), SOLVER_SOLVABLE_NAME);
        assert_eq!(jobs[0].what, pool.find_str_id("foo-devel").unwrap());
    }

    #[test]
    fn test_relational_form() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "foo >= 1.0");
        assert_eq!(jobs.len(), 1);
        assert_eq!(pool.job_solvables(&jobs[0]).len(), 1);

        let jobs = mkjobs(&mut pool, Command::Install, "foo > 1.0");
        assert_eq!(jobs.len(), 1);
        assert!(pool.job_solvables(&jobs[0]).is_empty());
    }

    #[test]
    fn test_glob_matches_are_sorted_and_deterministic() {
        let mut pool = pool();
        let first = depglob(&mut pool, "foo*", true, true);
        let second = depglob(&mut pool, "foo*", true, true);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.windows(2).all(|w| w[0].what < w[1].what));
    }

    #[test]
    fn test_limitjobs_is_deterministic_and_set_bits_saturate() {
        let mut pool = pool();
        let name = pool.find_str_id("foo").unwrap();
        let jobs = vec![Job::new(SOLVER_SOLVABLE_NAME, name)];
        let evr = pool.str2id("1.0-1");

        let once = limitjobs(&mut pool, &jobs, REL_EQ, evr);
        let again = limitjobs(&mut pool, &jobs, REL_EQ, evr);
        assert_eq!(once, again);

        let twice = limitjobs(&mut pool, &once, REL_EQ, evr);
        let twice_again = limitjobs(&mut pool, &once, REL_EQ, evr);
        assert_eq!(twice, twice_again);
        assert_eq!(twice[0].how, once[0].how);
    }

    #[test]
    fn test_path_argument_uses_filelist() {
        let mut pool = pool();
        let jobs = mkjobs(&mut pool, Command::Install, "/usr/bin/foo");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].select(), SOLVER_SOLVABLE);
        assert_ne!(jobs[0].how & SOLVER_NOAUTOSET, 0);
    }

    #[test]
    fn test_unmatched_argument_yields_nothing() {
        let mut pool = pool();
        assert!(mkjobs(&mut pool, Command::Install, "no-such-package").is_empty());
    }
}
