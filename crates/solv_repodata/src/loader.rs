//! Brings repositories into the pool: the system database, every enabled
//! configured repository (rpm-md or susetags), the on-demand extension
//! stubs, and the cache rewrite after file provides are injected.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use solv_pool::flags::{
    REPO_EXTEND_SOLVABLES, REPO_NO_INTERNALIZE, REPO_REUSE_REPODATA, REPO_USE_LOADING,
    SUSETAGS_RECORD_SHARES,
};
use solv_pool::keys::{
    langkey, REPOKEY_TYPE_DIRSTRARRAY, REPOKEY_TYPE_FLEXARRAY, REPOKEY_TYPE_ID, REPOKEY_TYPE_STR,
    REPOSITORY_ADDEDFILEPROVIDES, REPOSITORY_DELTAINFO, REPOSITORY_KEYS,
    REPOSITORY_REPOMD_CHECKSUM, REPOSITORY_REPOMD_LOCATION, REPOSITORY_REPOMD_TYPE,
    SOLVABLE_CATEGORY, SOLVABLE_DESCRIPTION, SOLVABLE_EULA, SOLVABLE_FILELIST,
    SOLVABLE_MESSAGEDEL, SOLVABLE_MESSAGEINS, SOLVABLE_SUMMARY,
    SUSETAGS_DEFAULTVENDOR, SUSETAGS_DESCRDIR, SUSETAGS_FILE_CHECKSUM, SUSETAGS_FILE_NAME,
};
use solv_pool::{Id, Pool, PoolError, RepoId, RepodataId, RepomdEntry, SusetagsEntry};

use crate::cache::CacheStore;
use crate::cookie;
use crate::fetch::Fetcher;
use crate::repo::{discover_repos, RepoKind, RepoRecord, SharedRepo};

/// The default description directory of a susetags repository.
pub const DEFAULT_DESCRDIR: &str = "suse/setup/descr";

/// Paths and knobs of one driver run.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Where cache files live.
    pub cache_dir: PathBuf,
    /// Where `*.repo` files are discovered.
    pub repos_dir: PathBuf,
    /// The system rpm database file, stat'd for the system cookie.
    pub rpmdb_path: PathBuf,
    /// System product descriptors.
    pub products_dir: PathBuf,
    /// Pool architecture override; defaults to the machine architecture.
    pub arch: Option<String>,
    /// The external HTTP client.
    pub fetch_program: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            cache_dir: PathBuf::from("/var/cache/solv"),
            repos_dir: PathBuf::from("/etc/zypp/repos.d"),
            rpmdb_path: PathBuf::from("/var/lib/rpm/Packages"),
            products_dir: PathBuf::from("/etc/products.d"),
            arch: None,
            fetch_program: PathBuf::from("curl"),
        }
    }
}

/// Error aborting driver initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Filesystem trouble outside the cache.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The backend rejected an ingestion request.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The system rpm database cannot be fingerprinted.
    #[error("cannot stat rpm database {}: {source}", .path.display())]
    SystemDatabase {
        /// The configured database path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

type Registry = Rc<RefCell<HashMap<u32, SharedRepo>>>;

/// Orchestrates repository refresh against one pool.
pub struct Loader {
    config: LoaderConfig,
    cache: CacheStore,
    fetcher: Fetcher,
    registry: Registry,
}

impl Loader {
    /// A loader for the given configuration.
    pub fn new(config: LoaderConfig) -> Loader {
        let cache = CacheStore::new(&config.cache_dir);
        let fetcher = Fetcher::new(&config.fetch_program);
        Loader {
            config,
            cache,
            fetcher,
            registry: Rc::default(),
        }
    }

    /// The cache store this loader reads and writes.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// The fetcher this loader downloads through.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Sets the pool architecture and registers the extension load
    /// callback. Must run before any repository is loaded.
    pub fn setup(&self, pool: &mut dyn Pool) {
        let arch = self
            .config
            .arch
            .clone()
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());
        pool.set_arch(&arch);

        let registry = self.registry.clone();
        let cache = self.cache.clone();
        let fetcher = self.fetcher.clone();
        pool.set_load_callback(Some(Box::new(move |pool, data| {
            let repo = pool.repodata_repo(data);
            let record = registry.borrow().get(&repo.0).cloned();
            match record {
                Some(record) => load_extension(pool, data, &record, &cache, &fetcher),
                None => false,
            }
        })));
    }

    /// Makes a record addressable by the load callback.
    pub fn register(&self, handle: RepoId, record: &SharedRepo) {
        self.registry.borrow_mut().insert(handle.0, record.clone());
    }

    /// Brings the `@System` repository into the pool, from cache when the
    /// rpm database is unchanged.
    pub fn load_system(&self, pool: &mut dyn Pool) -> Result<SharedRepo, LoadError> {
        let record = Rc::new(RefCell::new(RepoRecord::system()));
        let handle = pool.add_repo("@System");
        record.borrow_mut().handle = Some(handle);
        pool.set_installed(Some(handle));
        self.register(handle, &record);

        let meta =
            fs::metadata(&self.config.rpmdb_path).map_err(|source| LoadError::SystemDatabase {
                path: self.config.rpmdb_path.clone(),
                source,
            })?;
        let cookie = cookie::stat_cookie(&meta);
        record.borrow_mut().cookie = Some(cookie);

        if self
            .cache
            .load(pool, &mut record.borrow_mut(), None, Some(&cookie), false)
        {
            tracing::info!("rpm database: cached");
        } else {
            tracing::info!("rpm database: reading");
            pool.repo_add_products(handle, &self.config.products_dir, REPO_NO_INTERNALIZE)?;
            pool.repo_add_rpmdb(handle, &self.config.rpmdb_path)?;
            if let Err(error) = self.cache.write(pool, &mut record.borrow_mut(), None, None) {
                tracing::debug!("@System: cache not written: {error}");
            }
        }
        Ok(record)
    }

    /// Discovers configured repositories and loads every enabled one,
    /// refreshing those whose cache has expired. Records that failed to
    /// load end up without a handle.
    pub fn load_repos(&self, pool: &mut dyn Pool) -> Vec<SharedRepo> {
        let repos = discover_repos(&self.config.repos_dir);
        for repo in &repos {
            if !repo.borrow().enabled {
                continue;
            }
            let (alias, kind) = {
                let r = repo.borrow();
                (r.alias.clone(), r.kind)
            };
            let handle = pool.add_repo(&alias);
            repo.borrow_mut().handle = Some(handle);
            pool.set_repo_priority(handle, 99 - repo.borrow().priority as i32);
            self.register(handle, repo);

            let mut dorefresh = repo.borrow().autorefresh;
            if dorefresh {
                if let Ok(meta) = fs::metadata(self.cache.path_for(&alias, None)) {
                    let fresh = meta
                        .modified()
                        .ok()
                        .and_then(|m| m.elapsed().ok())
                        .is_some_and(|age| age < repo.borrow().metadata_expire);
                    if fresh {
                        dorefresh = false;
                    }
                }
            }
            if !dorefresh
                && self
                    .cache
                    .load(pool, &mut repo.borrow_mut(), None, None, false)
            {
                tracing::info!("repo '{alias}': cached");
                continue;
            }

            let kept = match kind {
                RepoKind::RpmMd => self.refresh_rpmmd(pool, repo, &alias),
                RepoKind::Yast2 => self.refresh_susetags(pool, repo, &alias),
                RepoKind::System | RepoKind::CommandLine => true,
            };
            if !kept {
                pool.free_repo(handle, true);
                self.registry.borrow_mut().remove(&handle.0);
                repo.borrow_mut().handle = None;
            }
        }
        repos
    }

    fn refresh_rpmmd(&self, pool: &mut dyn Pool, repo: &SharedRepo, alias: &str) -> bool {
        let baseurl = repo.borrow().baseurl.clone().unwrap_or_default();
        let Some(mut index) = self
            .fetcher
            .fetch(&baseurl, "repodata/repomd.xml", false, None, None)
        else {
            tracing::info!("repo '{alias}': no repomd.xml file, skipped");
            return false;
        };
        let Ok(cookie) = index.content_cookie() else {
            return false;
        };
        repo.borrow_mut().cookie = Some(cookie);
        if self
            .cache
            .load(pool, &mut repo.borrow_mut(), None, Some(&cookie), true)
        {
            tracing::info!("repo '{alias}': cached");
            return true;
        }

        let handle = repo.borrow().handle.expect("handle set by caller");
        let added = index
            .reader()
            .map_err(PoolError::from)
            .and_then(|mut reader| pool.repo_add_repomdxml(handle, &mut reader, 0));
        if let Err(error) = added {
            tracing::warn!("repo '{alias}': broken repomd.xml, skipped: {error}");
            return false;
        }
        tracing::info!("repo '{alias}': fetching");

        let entries = pool.repo_repomd_entries(handle);
        let mut bad_checksum = false;
        if let Some(primary) = repomd_find(&entries, "primary") {
            if let Some(mut fetched) = self.fetcher.fetch(
                &baseurl,
                &primary.location,
                true,
                primary.checksum.as_ref(),
                Some(&mut bad_checksum),
            ) {
                let added = fetched
                    .reader()
                    .map_err(PoolError::from)
                    .and_then(|mut reader| pool.repo_add_rpmmd(handle, &mut reader, None, 0));
                if let Err(error) = added {
                    tracing::warn!("repo '{alias}': broken primary metadata, skipped: {error}");
                    return false;
                }
            }
            if bad_checksum {
                // hopeless without a good primary; keep what was ingested
                // for this session but never cache it
                repo.borrow_mut().incomplete = true;
                return true;
            }
        }
        if let Some(updateinfo) = repomd_find(&entries, "updateinfo") {
            if let Some(mut fetched) = self.fetcher.fetch(
                &baseurl,
                &updateinfo.location,
                true,
                updateinfo.checksum.as_ref(),
                Some(&mut bad_checksum),
            ) {
                let added = fetched
                    .reader()
                    .map_err(PoolError::from)
                    .and_then(|mut reader| pool.repo_add_updateinfoxml(handle, &mut reader, 0));
                if let Err(error) = added {
                    tracing::warn!("repo '{alias}': broken updateinfo, ignored: {error}");
                }
            }
        }

        if !register_rpmmd_ext(pool, handle, &entries, "deltainfo", "DL") {
            register_rpmmd_ext(pool, handle, &entries, "prestodelta", "DL");
        }
        register_rpmmd_ext(pool, handle, &entries, "filelists", "FL");

        if bad_checksum {
            repo.borrow_mut().incomplete = true;
        } else if let Err(error) = self.cache.write(pool, &mut repo.borrow_mut(), None, None) {
            tracing::debug!("repo '{alias}': cache not written: {error}");
        }
        pool.repo_create_stubs(handle);
        true
    }

    fn refresh_susetags(&self, pool: &mut dyn Pool, repo: &SharedRepo, alias: &str) -> bool {
        let baseurl = repo.borrow().baseurl.clone().unwrap_or_default();
        let Some(mut index) = self.fetcher.fetch(&baseurl, "content", false, None, None) else {
            tracing::info!("repo '{alias}': no content file, skipped");
            return false;
        };
        let Ok(cookie) = index.content_cookie() else {
            return false;
        };
        repo.borrow_mut().cookie = Some(cookie);
        if self
            .cache
            .load(pool, &mut repo.borrow_mut(), None, Some(&cookie), true)
        {
            tracing::info!("repo '{alias}': cached");
            return true;
        }

        let handle = repo.borrow().handle.expect("handle set by caller");
        let added = index
            .reader()
            .map_err(PoolError::from)
            .and_then(|mut reader| pool.repo_add_content(handle, &mut reader, 0));
        if let Err(error) = added {
            tracing::warn!("repo '{alias}': broken content file, skipped: {error}");
            return false;
        }
        tracing::info!("repo '{alias}': fetching");

        let descrdir = pool
            .repo_lookup_meta_str(handle, SUSETAGS_DESCRDIR)
            .unwrap_or_else(|| DEFAULT_DESCRDIR.to_string());
        let defvendor = pool
            .repo_lookup_meta_id(handle, SUSETAGS_DEFAULTVENDOR)
            .unwrap_or(0);
        let entries = pool.repo_susetags_entries(handle);
        let mut bad_checksum = false;

        let primary = susetags_find(&entries, "packages.gz")
            .or_else(|| susetags_find(&entries, "packages"));
        if let Some(primary) = primary {
            if let Some(mut fetched) = self.fetcher.fetch(
                &baseurl,
                &format!("{descrdir}/{}", primary.filename),
                true,
                primary.checksum.as_ref(),
                Some(&mut bad_checksum),
            ) {
                let added = fetched.reader().map_err(PoolError::from).and_then(|mut r| {
                    pool.repo_add_susetags(
                        handle,
                        &mut r,
                        defvendor,
                        None,
                        REPO_NO_INTERNALIZE | SUSETAGS_RECORD_SHARES,
                    )
                });
                if let Err(error) = added {
                    tracing::warn!("repo '{alias}': broken packages file, skipped: {error}");
                    return false;
                }
            }
            if bad_checksum {
                repo.borrow_mut().incomplete = true;
                return true;
            }
        }
        let english = susetags_find(&entries, "packages.en.gz")
            .or_else(|| susetags_find(&entries, "packages.en"));
        if let Some(english) = english {
            if let Some(mut fetched) = self.fetcher.fetch(
                &baseurl,
                &format!("{descrdir}/{}", english.filename),
                true,
                english.checksum.as_ref(),
                Some(&mut bad_checksum),
            ) {
                let added = fetched.reader().map_err(PoolError::from).and_then(|mut r| {
                    pool.repo_add_susetags(
                        handle,
                        &mut r,
                        defvendor,
                        Some("en"),
                        REPO_NO_INTERNALIZE | REPO_REUSE_REPODATA | REPO_EXTEND_SOLVABLES,
                    )
                });
                if let Err(error) = added {
                    tracing::warn!("repo '{alias}': broken packages.en file, ignored: {error}");
                }
            }
        }
        pool.repo_internalize(handle);

        for entry in &entries {
            let Some(ext) = susetags_ext_tag(&entry.filename) else {
                continue;
            };
            register_susetags_ext(pool, handle, entry, ext);
        }

        if bad_checksum {
            repo.borrow_mut().incomplete = true;
        } else if let Err(error) = self.cache.write(pool, &mut repo.borrow_mut(), None, None) {
            tracing::debug!("repo '{alias}': cache not written: {error}");
        }
        pool.repo_create_stubs(handle);
        true
    }

    /// Rewrites every primary cache whose stored added-fileprovides
    /// id-array does not cover the freshly injected set. Repositories
    /// without a cookie (the command-line repo) and incomplete ones are
    /// left alone.
    pub fn rewrite_repos(&self, pool: &mut dyn Pool, repos: &[SharedRepo], addedprovides: &[Id]) {
        if addedprovides.is_empty() {
            return;
        }
        let wanted: BTreeSet<Id> = addedprovides.iter().copied().collect();
        for repo in repos {
            let (handle, has_cookie, incomplete, alias) = {
                let r = repo.borrow();
                (r.handle, r.cookie.is_some(), r.incomplete, r.alias.clone())
            };
            let Some(handle) = handle else { continue };
            if !has_cookie || incomplete || pool.repo_solvables(handle).is_empty() {
                continue;
            }
            let Some(data) = pool.repo_first_repodata(handle) else {
                continue;
            };
            let stored: BTreeSet<Id> = pool
                .repodata_lookup_idarray(data, REPOSITORY_ADDEDFILEPROVIDES)
                .into_iter()
                .collect();
            if wanted.is_subset(&stored) {
                continue;
            }
            pool.repodata_set_idarray(data, REPOSITORY_ADDEDFILEPROVIDES, addedprovides);
            pool.repodata_internalize(data);
            if let Err(error) = self.cache.write(pool, &mut repo.borrow_mut(), None, Some(data)) {
                tracing::debug!("repo '{alias}': cache not rewritten: {error}");
            }
        }
    }
}

/// Finds a repomd index entry by type, requiring a checksum the way the
/// driver does everywhere.
pub fn repomd_find<'e>(entries: &'e [RepomdEntry], what: &str) -> Option<&'e RepomdEntry> {
    let entry = entries.iter().find(|e| e.kind == what)?;
    if entry.checksum.is_none() {
        tracing::warn!("no {} file checksum!", entry.location);
        return None;
    }
    Some(entry)
}

fn susetags_find<'e>(entries: &'e [SusetagsEntry], filename: &str) -> Option<&'e SusetagsEntry> {
    let entry = entries.iter().find(|e| e.filename == filename)?;
    if entry.checksum.is_none() {
        tracing::warn!("no {} file checksum!", entry.filename);
        return None;
    }
    Some(entry)
}

/// The two-letter extension tag of a susetags description file name, for
/// names of the form `packages.XX` or `packages.XX.*` other than the
/// compressed base file and the English base.
fn susetags_ext_tag(filename: &str) -> Option<&str> {
    let rest = filename.strip_prefix("packages.")?;
    if rest.len() < 2 {
        return None;
    }
    let (tag, trailing) = rest.split_at(2);
    if !trailing.is_empty() && !trailing.starts_with('.') {
        return None;
    }
    if tag == "gz" || tag == "en" {
        return None;
    }
    Some(tag)
}

fn register_rpmmd_ext(
    pool: &mut dyn Pool,
    handle: RepoId,
    entries: &[RepomdEntry],
    what: &str,
    ext: &str,
) -> bool {
    let Some(entry) = repomd_find(entries, what) else {
        return false;
    };
    let data = pool.repo_add_repodata(handle);
    pool.repodata_set_str(data, REPOSITORY_REPOMD_TYPE, what);
    pool.repodata_set_str(data, REPOSITORY_REPOMD_LOCATION, &entry.location);
    if let Some(checksum) = &entry.checksum {
        pool.repodata_set_checksum(data, REPOSITORY_REPOMD_CHECKSUM, checksum);
    }
    let keys: &[(&str, &str)] = match ext {
        "DL" => &[(REPOSITORY_DELTAINFO, REPOKEY_TYPE_FLEXARRAY)],
        _ => &[(SOLVABLE_FILELIST, REPOKEY_TYPE_DIRSTRARRAY)],
    };
    add_stub_keys(pool, data, keys);
    pool.repodata_mark_external(data);
    pool.repodata_internalize(data);
    true
}

fn register_susetags_ext(pool: &mut dyn Pool, handle: RepoId, entry: &SusetagsEntry, ext: &str) {
    let data = pool.repo_add_repodata(handle);
    pool.repodata_set_str(data, SUSETAGS_FILE_NAME, &entry.filename);
    if let Some(checksum) = &entry.checksum {
        pool.repodata_set_checksum(data, SUSETAGS_FILE_CHECKSUM, checksum);
    }
    let lang_keys = [
        (SOLVABLE_SUMMARY, REPOKEY_TYPE_STR),
        (SOLVABLE_DESCRIPTION, REPOKEY_TYPE_STR),
        (SOLVABLE_EULA, REPOKEY_TYPE_STR),
        (SOLVABLE_MESSAGEINS, REPOKEY_TYPE_STR),
        (SOLVABLE_MESSAGEDEL, REPOKEY_TYPE_STR),
        (SOLVABLE_CATEGORY, REPOKEY_TYPE_ID),
    ];
    for (key, key_type) in lang_keys {
        let lang_id = {
            let name = langkey(key, ext);
            pool.str2id(&name)
        };
        pool.repodata_add_idarray(data, REPOSITORY_KEYS, lang_id);
        let type_id = pool.str2id(key_type);
        pool.repodata_add_idarray(data, REPOSITORY_KEYS, type_id);
    }
    pool.repodata_mark_external(data);
    pool.repodata_internalize(data);
}

fn add_stub_keys(pool: &mut dyn Pool, data: RepodataId, keys: &[(&str, &str)]) {
    for (key, key_type) in keys {
        let key_id = pool.str2id(key);
        pool.repodata_add_idarray(data, REPOSITORY_KEYS, key_id);
        let type_id = pool.str2id(key_type);
        pool.repodata_add_idarray(data, REPOSITORY_KEYS, type_id);
    }
}

/// The load-callback body: resolves one stub repodata, preferring the
/// extension cache and falling back to a verified fetch. Idempotent; the
/// pool never re-enters it for the same repodata.
fn load_extension(
    pool: &mut dyn Pool,
    data: RepodataId,
    record: &SharedRepo,
    cache: &CacheStore,
    fetcher: &Fetcher,
) -> bool {
    let handle = match record.borrow().handle {
        Some(handle) => handle,
        None => return false,
    };
    let baseurl = record.borrow().baseurl.clone().unwrap_or_default();
    let extcookie = record.borrow().extcookie;

    if let Some(what) = pool.repodata_lookup_str(data, REPOSITORY_REPOMD_TYPE) {
        let ext = match what.as_str() {
            "filelists" => "FL",
            "deltainfo" | "prestodelta" => "DL",
            _ => return false,
        };
        if let Some(extcookie) = extcookie.as_ref() {
            if cache.load(pool, &mut record.borrow_mut(), Some(ext), Some(extcookie), false) {
                return true;
            }
        }
        let Some(location) = pool.repodata_lookup_str(data, REPOSITORY_REPOMD_LOCATION) else {
            return false;
        };
        let checksum = pool.repodata_lookup_checksum(data, REPOSITORY_REPOMD_CHECKSUM);
        tracing::info!(
            "fetching {what} extension for '{}'",
            record.borrow().alias
        );
        let Some(mut fetched) = fetcher.fetch(&baseurl, &location, true, checksum.as_ref(), None)
        else {
            return false;
        };
        let added = fetched.reader().map_err(PoolError::from).and_then(|mut r| {
            if ext == "FL" {
                pool.repo_add_rpmmd(
                    handle,
                    &mut r,
                    Some("FL"),
                    REPO_USE_LOADING | REPO_EXTEND_SOLVABLES,
                )
            } else {
                pool.repo_add_deltainfoxml(handle, &mut r, REPO_USE_LOADING)
            }
        });
        if added.is_err() {
            return false;
        }
        if let Err(error) = cache.write(pool, &mut record.borrow_mut(), Some(ext), Some(data)) {
            tracing::debug!("extension cache not written: {error}");
        }
        return true;
    }

    if let Some(filename) = pool.repodata_lookup_str(data, SUSETAGS_FILE_NAME) {
        let Some(ext) = susetags_ext_tag(&filename).map(str::to_string) else {
            return false;
        };
        if let Some(extcookie) = extcookie.as_ref() {
            if cache.load(
                pool,
                &mut record.borrow_mut(),
                Some(&ext),
                Some(extcookie),
                false,
            ) {
                return true;
            }
        }
        let descrdir = pool
            .repo_lookup_meta_str(handle, SUSETAGS_DESCRDIR)
            .unwrap_or_else(|| DEFAULT_DESCRDIR.to_string());
        let defvendor = pool
            .repo_lookup_meta_id(handle, SUSETAGS_DEFAULTVENDOR)
            .unwrap_or(0);
        let checksum = pool.repodata_lookup_checksum(data, SUSETAGS_FILE_CHECKSUM);
        tracing::info!(
            "fetching {filename} for '{}'",
            record.borrow().alias
        );
        let Some(mut fetched) = fetcher.fetch(
            &baseurl,
            &format!("{descrdir}/{filename}"),
            true,
            checksum.as_ref(),
            None,
        ) else {
            return false;
        };
        let added = fetched.reader().map_err(PoolError::from).and_then(|mut r| {
            pool.repo_add_susetags(
                handle,
                &mut r,
                defvendor,
                Some(&ext),
                REPO_USE_LOADING | REPO_EXTEND_SOLVABLES,
            )
        });
        if added.is_err() {
            return false;
        }
        if let Err(error) = cache.write(pool, &mut record.borrow_mut(), Some(&ext), Some(data)) {
            tracing::debug!("extension cache not written: {error}");
        }
        return true;
    }

    false
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_susetags_ext_tag() {
        assert_eq!(susetags_ext_tag("packages.de"), Some("de"));
        assert_eq!(susetags_ext_tag("packages.de.gz"), Some("de"));
        assert_eq!(susetags_ext_tag("packages.gz"), None);
        assert_eq!(susetags_ext_tag("packages.en"), None);
        assert_eq!(susetags_ext_tag("packages.english"), None);
        assert_eq!(susetags_ext_tag("patterns"), None);
    }
}
