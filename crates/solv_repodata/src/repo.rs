//! Repository records and their discovery from `*.repo` configuration
//! files.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use configparser::ini::Ini;
use solv_pool::RepoId;

use crate::cookie::Cookie;

/// The metadata format of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    /// rpm-md metadata below `repodata/`.
    RpmMd,
    /// susetags metadata indexed by a `content` file.
    Yast2,
    /// The system rpm database.
    System,
    /// Packages named directly on the command line.
    CommandLine,
}

/// One configured repository and its runtime state.
#[derive(Debug)]
pub struct RepoRecord {
    /// Unique alias.
    pub alias: String,
    /// Base URL; absent only for the system and command-line repos.
    pub baseurl: Option<String>,
    /// Metadata format.
    pub kind: RepoKind,
    /// Whether the repository participates at all.
    pub enabled: bool,
    /// 0-99, lower is preferred.
    pub priority: u32,
    /// Whether the metadata is refreshed once it expires.
    pub autorefresh: bool,
    /// Age after which a cached copy triggers a refresh.
    pub metadata_expire: Duration,
    /// Pool-side handle, set once the repository is loaded.
    pub handle: Option<RepoId>,
    /// Identity of the primary metadata content.
    pub cookie: Option<Cookie>,
    /// Derived identity shared by all extension caches.
    pub extcookie: Option<Cookie>,
    /// Set when a checksum failed during this refresh; the session keeps
    /// the data but the cache must not record it.
    pub incomplete: bool,
}

/// Repository records are shared between the driver and the load-callback
/// context, single-threaded.
pub type SharedRepo = Rc<RefCell<RepoRecord>>;

/// The refresh window every repository is pinned to.
pub const METADATA_EXPIRE: Duration = Duration::from_secs(900);

impl RepoRecord {
    /// The record backing the `@System` repository.
    pub fn system() -> RepoRecord {
        RepoRecord {
            alias: "@System".to_string(),
            baseurl: None,
            kind: RepoKind::System,
            enabled: true,
            priority: 99,
            autorefresh: false,
            metadata_expire: METADATA_EXPIRE,
            handle: None,
            cookie: None,
            extcookie: None,
            incomplete: false,
        }
    }

    /// The record backing the synthetic `@commandline` repository. It has
    /// no cookie and is never cached.
    pub fn commandline() -> RepoRecord {
        RepoRecord {
            alias: "@commandline".to_string(),
            baseurl: None,
            kind: RepoKind::CommandLine,
            enabled: true,
            priority: 99,
            autorefresh: false,
            metadata_expire: METADATA_EXPIRE,
            handle: None,
            cookie: None,
            extcookie: None,
            incomplete: false,
        }
    }

    /// Whether this record may be cached at all.
    pub fn cacheable(&self) -> bool {
        self.kind != RepoKind::CommandLine
    }

    /// Whether this is the system repository.
    pub fn is_system(&self) -> bool {
        self.kind == RepoKind::System
    }
}

/// Reads every `*.repo` file below `dir` and returns the records of all
/// sections, sorted by file name. Sections without a `baseurl` and sections
/// with an unknown `type` are rejected with a log line.
pub fn discover_repos(dir: &Path) -> Vec<SharedRepo> {
    let mut repos = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return repos;
    };
    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "repo"))
        .collect();
    files.sort();
    for file in files {
        let mut ini = Ini::new_cs();
        let sections = match ini.load(&file) {
            Ok(sections) => sections,
            Err(error) => {
                tracing::warn!("{}: unreadable repo file: {error}", file.display());
                continue;
            }
        };
        let mut aliases: Vec<&String> = sections.keys().collect();
        aliases.sort();
        for alias in aliases {
            let section = &sections[alias];
            let get = |key: &str| section.get(key).and_then(|v| v.clone());
            let Some(baseurl) = get("baseurl") else {
                tracing::warn!("repo '{alias}': no baseurl, skipped");
                continue;
            };
            let kind = match get("type").as_deref() {
                None | Some("rpm-md") => RepoKind::RpmMd,
                Some("yast2") => RepoKind::Yast2,
                Some(other) => {
                    tracing::warn!("repo '{alias}': unknown type '{other}', skipped");
                    continue;
                }
            };
            let priority = get("priority")
                .and_then(|v| v.parse::<u32>().ok())
                .map(|p| p.min(99))
                .unwrap_or(99);
            repos.push(Rc::new(RefCell::new(RepoRecord {
                alias: alias.clone(),
                baseurl: Some(baseurl),
                kind,
                enabled: get("enabled").as_deref() != Some("0"),
                priority,
                autorefresh: get("autorefresh").as_deref() != Some("0"),
                metadata_expire: METADATA_EXPIRE,
                handle: None,
                cookie: None,
                extcookie: None,
                incomplete: false,
            })));
        }
    }
    repos
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_discover_parses_sections_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("oss.repo"),
            "[oss]\nbaseurl=http://example.com/oss\nenabled=1\n\n\
             [debug]\nbaseurl=http://example.com/debug\nenabled=0\npriority=20\ntype=yast2\n",
        )
        .unwrap();
        let repos = discover_repos(dir.path());
        assert_eq!(repos.len(), 2);

        let debug = repos
            .iter()
            .find(|r| r.borrow().alias == "debug")
            .unwrap()
            .borrow();
        assert!(!debug.enabled);
        assert_eq!(debug.priority, 20);
        assert_eq!(debug.kind, RepoKind::Yast2);

        let oss = repos
            .iter()
            .find(|r| r.borrow().alias == "oss")
            .unwrap()
            .borrow();
        assert!(oss.enabled);
        assert!(oss.autorefresh);
        assert_eq!(oss.priority, 99);
        assert_eq!(oss.metadata_expire, METADATA_EXPIRE);
    }

    #[test]
    fn test_discover_rejects_sections_without_baseurl() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.repo"), "[broken]\nenabled=1\n").unwrap();
        assert!(discover_repos(dir.path()).is_empty());
    }
}
