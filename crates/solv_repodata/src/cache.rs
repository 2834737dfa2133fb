//! The on-disk cache of loaded repositories.
//!
//! A cache file is a solv binary body with cookies appended: extension
//! files carry their repository's extension cookie as the final 32 bytes,
//! primary files of ordinary repositories carry the extension cookie
//! followed by the primary cookie, and the system repository's file carries
//! the primary cookie alone. Every failure here is an expected outcome: a
//! missing or rejected cache simply forces a refresh.

use std::fs::{self, File, Permissions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use solv_pool::flags::{
    REPO_EXTEND_SOLVABLES, REPO_LOCALPOOL, REPO_USE_LOADING, SOLV_ADD_NO_STUBS,
};
use solv_pool::{Pool, PoolError, RepodataId};

use crate::cookie::{self, Cookie, COOKIE_LEN};
use crate::repo::RepoRecord;

/// Error raised while writing a cache file. Callers treat it as a log-only
/// event; the session continues with in-memory data.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem trouble.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The backend rejected the serialization request.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The record is not in a cacheable state.
    #[error("repo '{0}' has no cookie to bind the cache to")]
    NoCookie(String),
}

/// Read/write access to one cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// A store rooted at the given directory, `/var/cache/solv` in
    /// production.
    pub fn new(dir: impl Into<PathBuf>) -> CacheStore {
        CacheStore { dir: dir.into() }
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The cache path of a repository, `<sanitized_alias>.solv` for the
    /// primary body and `<sanitized_alias>_<ext>.solvx` for an extension.
    pub fn path_for(&self, alias: &str, ext: Option<&str>) -> PathBuf {
        let mut name: String = alias.strip_prefix('.').map_or_else(
            || alias.to_string(),
            |stripped| format!("_{stripped}"),
        );
        match ext {
            Some(ext) => name.push_str(&format!("_{ext}.solvx")),
            None => name.push_str(".solv"),
        }
        self.dir.join(name.replace('/', "_"))
    }

    /// Attempts to load a cached body into the repository's handle.
    ///
    /// `cookie` is the expected trailer: the content cookie for a primary
    /// read, the extension cookie for an extension read, or `None` to
    /// accept whatever is present. On a successful primary read of an
    /// ordinary repository the file's cookies are adopted onto the record.
    /// `mark` refreshes the file's mtime so the refresh window restarts.
    pub fn load(
        &self,
        pool: &mut dyn Pool,
        record: &mut RepoRecord,
        ext: Option<&str>,
        cookie: Option<&Cookie>,
        mark: bool,
    ) -> bool {
        let Some(handle) = record.handle else {
            return false;
        };
        let path = self.path_for(&record.alias, ext);
        let outcome = (|| -> std::io::Result<bool> {
            let mut file = File::open(&path)?;
            let len = file.metadata()?.len();
            let two_trailers = !record.is_system() && ext.is_none();
            let trailer_len = if two_trailers {
                2 * COOKIE_LEN as u64
            } else {
                COOKIE_LEN as u64
            };
            if len < trailer_len {
                return Ok(false);
            }

            let mut fcookie: Cookie = [0; COOKIE_LEN];
            file.seek(SeekFrom::End(-(COOKIE_LEN as i64)))?;
            file.read_exact(&mut fcookie)?;
            if let Some(expected) = cookie {
                if &fcookie != expected {
                    return Ok(false);
                }
            }
            let mut fextcookie: Cookie = [0; COOKIE_LEN];
            if two_trailers {
                file.seek(SeekFrom::End(-(2 * COOKIE_LEN as i64)))?;
                file.read_exact(&mut fextcookie)?;
            }

            file.seek(SeekFrom::Start(0))?;
            let mut flags = 0;
            if ext.is_some() {
                flags = REPO_USE_LOADING | REPO_EXTEND_SOLVABLES;
                if ext != Some("DL") {
                    flags |= REPO_LOCALPOOL;
                }
            }
            let mut body = file.take(len - trailer_len);
            if pool.repo_add_solv(handle, &mut body, flags).is_err() {
                return Ok(false);
            }
            if two_trailers {
                record.cookie = Some(fcookie);
                record.extcookie = Some(fextcookie);
            }
            Ok(true)
        })();
        let used = outcome.unwrap_or(false);
        if used && mark {
            touch(&path);
        }
        used
    }

    /// Serializes the repository (or one extension repodata) into a fresh
    /// cache file and atomically swaps it into place.
    ///
    /// `info` selects the body: `None` writes the whole repository,
    /// `Some(data)` with an extension writes that descriptor, and
    /// `Some(data)` without an extension takes the rewrite path that
    /// serializes only the first repodata. After a contiguous write the
    /// in-memory repository is re-pointed at the new file to enable demand
    /// paging; pool contents are unchanged by that swap.
    pub fn write(
        &self,
        pool: &mut dyn Pool,
        record: &mut RepoRecord,
        ext: Option<&str>,
        info: Option<RepodataId>,
    ) -> Result<(), CacheError> {
        let Some(handle) = record.handle else {
            return Err(CacheError::NoCookie(record.alias.clone()));
        };
        let cookie = record
            .cookie
            .ok_or_else(|| CacheError::NoCookie(record.alias.clone()))?;

        let mut dir_builder = fs::DirBuilder::new();
        dir_builder.recursive(true).mode(0o755);
        dir_builder.create(&self.dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".newsolv-")
            .tempfile_in(&self.dir)?;
        temp.as_file()
            .set_permissions(Permissions::from_mode(0o444))?;

        match (info, ext) {
            (None, _) => pool.repo_write(handle, temp.as_file_mut())?,
            (Some(data), Some(_)) => pool.repodata_write(data, temp.as_file_mut())?,
            (Some(_), None) => pool.repo_write_first_repodata(handle, temp.as_file_mut())?,
        }
        let body_len = temp.as_file_mut().stream_position()?;

        if !record.is_system() && ext.is_none() {
            if record.extcookie.is_none() {
                let meta = temp.as_file().metadata()?;
                record.extcookie = Some(cookie::ext_cookie(&meta, &cookie));
            }
            temp.as_file_mut()
                .write_all(record.extcookie.as_ref().expect("extcookie just derived"))?;
        }
        match ext {
            Some(_) => {
                let extcookie = record
                    .extcookie
                    .ok_or_else(|| CacheError::NoCookie(record.alias.clone()))?;
                temp.as_file_mut().write_all(&extcookie)?;
            }
            None => temp.as_file_mut().write_all(&cookie)?,
        }
        temp.as_file_mut().flush()?;

        // switch to the just-written body to activate demand paging
        if pool.repo_is_contiguous(handle) {
            let mut body = File::open(temp.path())?.take(body_len);
            match (info, ext) {
                (None, None) => {
                    pool.repo_empty(handle, true);
                    pool.repo_add_solv(handle, &mut body, SOLV_ADD_NO_STUBS)?;
                }
                (Some(data), Some(_)) => {
                    pool.repodata_extend_to_repo(data);
                    pool.repodata_add_solv(data, &mut body, REPO_EXTEND_SOLVABLES)?;
                }
                _ => {}
            }
        }

        temp.persist(self.path_for(&record.alias, ext))
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

/// Best-effort mtime refresh.
fn touch(path: &Path) {
    if let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_encoded_bytes()) {
        unsafe {
            libc::utime(c_path.as_ptr(), std::ptr::null());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use solv_pool::mem::MemPool;

    fn record_with_handle(pool: &mut MemPool, alias: &str) -> RepoRecord {
        let mut record = RepoRecord {
            alias: alias.to_string(),
            ..RepoRecord::system()
        };
        record.kind = crate::repo::RepoKind::RpmMd;
        record.handle = Some(pool.add_repo(alias));
        record
    }

    fn ingest(pool: &mut MemPool, record: &RepoRecord, body: &str) {
        pool.repo_add_solv(record.handle.unwrap(), &mut body.as_bytes(), 0)
            .unwrap();
    }

    const BODY: &str = "memsolv 1\ns\tfoo\t1.0-1\tx86_64\tacme\ns\tbar\t2.0-1\tnoarch\tacme\n";

    #[test]
    fn test_path_sanitization() {
        let store = CacheStore::new("/var/cache/solv");
        assert_eq!(
            store.path_for(".hidden/alias", None),
            PathBuf::from("/var/cache/solv/_hidden_alias.solv")
        );
        assert_eq!(
            store.path_for("oss", Some("FL")),
            PathBuf::from("/var/cache/solv/oss_FL.solvx")
        );
    }

    #[test]
    fn test_primary_write_appends_both_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let mut record = record_with_handle(&mut pool, "oss");
        ingest(&mut pool, &record, BODY);
        record.cookie = Some([7; COOKIE_LEN]);

        store.write(&mut pool, &mut record, None, None).unwrap();

        let raw = std::fs::read(store.path_for("oss", None)).unwrap();
        assert!(raw.len() > 2 * COOKIE_LEN);
        assert_eq!(&raw[raw.len() - COOKIE_LEN..], &[7; COOKIE_LEN]);
        let extcookie = record.extcookie.unwrap();
        assert_eq!(
            &raw[raw.len() - 2 * COOKIE_LEN..raw.len() - COOKIE_LEN],
            &extcookie
        );
        assert_ne!(extcookie[0], 0);
    }

    #[test]
    fn test_load_rejects_cookie_mismatch_and_adopts_on_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let mut record = record_with_handle(&mut pool, "oss");
        ingest(&mut pool, &record, BODY);
        record.cookie = Some([7; COOKIE_LEN]);
        store.write(&mut pool, &mut record, None, None).unwrap();
        let written_extcookie = record.extcookie.unwrap();

        let mut fresh_pool = MemPool::new();
        fresh_pool.set_arch("x86_64");
        let mut fresh = record_with_handle(&mut fresh_pool, "oss");
        fresh.kind = crate::repo::RepoKind::RpmMd;
        assert!(!store.load(&mut fresh_pool, &mut fresh, None, Some(&[8; COOKIE_LEN]), false));
        assert!(store.load(&mut fresh_pool, &mut fresh, None, Some(&[7; COOKIE_LEN]), false));
        assert_eq!(fresh.cookie, Some([7; COOKIE_LEN]));
        assert_eq!(fresh.extcookie, Some(written_extcookie));
        assert_eq!(
            fresh_pool.repo_solvables(fresh.handle.unwrap()).len(),
            2
        );
    }

    #[test]
    fn test_round_trip_preserves_solvable_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let mut record = record_with_handle(&mut pool, "oss");
        ingest(&mut pool, &record, BODY);
        record.cookie = Some([9; COOKIE_LEN]);
        store.write(&mut pool, &mut record, None, None).unwrap();

        let mut triples: Vec<String> = pool
            .repo_solvables(record.handle.unwrap())
            .into_iter()
            .map(|id| pool.solvable_str(id))
            .collect();
        triples.sort();

        let mut reloaded_pool = MemPool::new();
        reloaded_pool.set_arch("x86_64");
        let mut reloaded = record_with_handle(&mut reloaded_pool, "oss");
        assert!(store.load(&mut reloaded_pool, &mut reloaded, None, None, false));
        let mut reloaded_triples: Vec<String> = reloaded_pool
            .repo_solvables(reloaded.handle.unwrap())
            .into_iter()
            .map(|id| reloaded_pool.solvable_str(id))
            .collect();
        reloaded_triples.sort();
        assert_eq!(triples, reloaded_triples);
    }

    #[test]
    fn test_two_writes_produce_distinct_extcookies() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        let mut first_pool = MemPool::new();
        first_pool.set_arch("x86_64");
        let mut first = record_with_handle(&mut first_pool, "oss");
        ingest(&mut first_pool, &first, BODY);
        first.cookie = Some([7; COOKIE_LEN]);
        store.write(&mut first_pool, &mut first, None, None).unwrap();

        // an independent second write of the same repo derives its
        // extension cookie from a different temp file identity
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let mut second_pool = MemPool::new();
        second_pool.set_arch("x86_64");
        let mut second = record_with_handle(&mut second_pool, "oss");
        ingest(&mut second_pool, &second, BODY);
        second.cookie = Some([7; COOKIE_LEN]);
        store
            .write(&mut second_pool, &mut second, None, None)
            .unwrap();

        assert_ne!(first.extcookie.unwrap(), second.extcookie.unwrap());
    }

    #[test]
    fn test_system_write_has_single_cookie_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let mut record = RepoRecord::system();
        record.handle = Some(pool.add_repo("@System"));
        ingest(&mut pool, &record, BODY);
        record.cookie = Some([3; COOKIE_LEN]);

        store.write(&mut pool, &mut record, None, None).unwrap();
        let raw = std::fs::read(store.path_for("@System", None)).unwrap();
        assert_eq!(&raw[raw.len() - COOKIE_LEN..], &[3; COOKIE_LEN]);
        assert!(record.extcookie.is_none());

        let mut fresh_pool = MemPool::new();
        fresh_pool.set_arch("x86_64");
        let mut fresh = RepoRecord::system();
        fresh.handle = Some(fresh_pool.add_repo("@System"));
        assert!(store.load(&mut fresh_pool, &mut fresh, None, Some(&[3; COOKIE_LEN]), false));
    }
}
