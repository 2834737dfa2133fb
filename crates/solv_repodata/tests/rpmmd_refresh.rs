//! End-to-end refresh tests against a directory-backed "server" and a
//! stand-in HTTP client.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use solv_digest::{compute_bytes_digest, Sha256};
use solv_pool::flags::{SEARCH_COMPLETE_FILELIST, SEARCH_FILES, SEARCH_STRING};
use solv_pool::keys::SOLVABLE_FILELIST;
use solv_pool::mem::MemPool;
use solv_pool::Pool;
use solv_repodata::{Loader, LoaderConfig};

struct Harness {
    _root: tempfile::TempDir,
    server: PathBuf,
    config: LoaderConfig,
    curl_log: PathBuf,
}

impl Harness {
    fn new() -> Harness {
        let root = tempfile::tempdir().unwrap();
        let server = root.path().join("server");
        let cache_dir = root.path().join("cache");
        let repos_dir = root.path().join("repos.d");
        let rpmdb = root.path().join("rpm-packages");
        let products = root.path().join("products.d");
        std::fs::create_dir_all(server.join("repodata")).unwrap();
        std::fs::create_dir_all(&repos_dir).unwrap();
        std::fs::create_dir_all(&products).unwrap();
        std::fs::write(&rpmdb, "memsolv 1\n").unwrap();

        // counts invocations so the cache-hit test can assert that no
        // network traffic happened
        let curl_log = root.path().join("curl.log");
        let curl = root.path().join("fake-curl");
        std::fs::write(
            &curl,
            format!(
                "#!/bin/sh\necho \"$4\" >> {}\nexec cat \"$4\" 2>/dev/null\n",
                curl_log.display()
            ),
        )
        .unwrap();
        let mut perms = std::fs::metadata(&curl).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&curl, perms).unwrap();

        std::fs::write(
            repos_dir.join("test.repo"),
            format!(
                "[test]\nbaseurl={}\nenabled=1\nautorefresh=1\n",
                server.display()
            ),
        )
        .unwrap();

        Harness {
            config: LoaderConfig {
                cache_dir,
                repos_dir,
                rpmdb_path: rpmdb,
                products_dir: products,
                arch: Some("x86_64".to_string()),
                fetch_program: curl,
            },
            _root: root,
            server,
            curl_log,
        }
    }

    fn publish_repo(&self, primary: &str, filelists: Option<&str>, break_primary_checksum: bool) {
        let primary_path = self.server.join("repodata/primary.xml");
        std::fs::write(&primary_path, primary).unwrap();
        let mut primary_digest = hex::encode(compute_bytes_digest::<Sha256>(primary));
        if break_primary_checksum {
            primary_digest = format!("{:0<64}", "deadbeef");
        }
        let mut repomd = format!(
            "memsolv 1\nr\tprimary\trepodata/primary.xml\tsha256:{primary_digest}\n"
        );
        if let Some(filelists) = filelists {
            let path = self.server.join("repodata/filelists.xml");
            std::fs::write(&path, filelists).unwrap();
            let digest = hex::encode(compute_bytes_digest::<Sha256>(filelists));
            repomd.push_str(&format!(
                "r\tfilelists\trepodata/filelists.xml\tsha256:{digest}\n"
            ));
        }
        std::fs::write(self.server.join("repodata/repomd.xml"), &repomd).unwrap();
    }

    fn repomd_bytes(&self) -> Vec<u8> {
        std::fs::read(self.server.join("repodata/repomd.xml")).unwrap()
    }

    fn curl_calls(&self) -> usize {
        std::fs::read_to_string(&self.curl_log)
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    fn run_session(&self) -> (MemPool, Vec<solv_repodata::SharedRepo>) {
        let mut pool = MemPool::new();
        let loader = Loader::new(self.config.clone());
        loader.setup(&mut pool);
        loader.load_system(&mut pool).unwrap();
        let repos = loader.load_repos(&mut pool);
        (pool, repos)
    }
}

const PRIMARY: &str = "memsolv 1
s\tfoo\t1.0-1\tx86_64\tacme\tloc=foo-1.0-1.x86_64.rpm
f\t/usr/bin/foo
s\tbar\t2.0-1\tx86_64\tacme\tloc=bar-2.0-1.x86_64.rpm
";

const FILELISTS: &str = "memsolvx 1
x\tfoo\tf\t/usr/share/doc/foo/README
x\tbar\tf\t/usr/bin/bar
";

fn trailer(path: &Path) -> Vec<u8> {
    let raw = std::fs::read(path).unwrap();
    raw[raw.len() - 32..].to_vec()
}

#[test]
fn test_fresh_load_populates_pool_and_writes_bound_cache() {
    let harness = Harness::new();
    harness.publish_repo(PRIMARY, None, false);

    let (pool, repos) = harness.run_session();
    let record = repos[0].borrow();
    let handle = record.handle.expect("repo loaded");
    assert_eq!(pool.repo_solvables(handle).len(), 2);

    let cache_path = harness.config.cache_dir.join("test.solv");
    assert!(cache_path.exists());
    let expected = compute_bytes_digest::<Sha256>(harness.repomd_bytes());
    assert_eq!(trailer(&cache_path), expected.as_slice());
    assert_eq!(record.cookie.unwrap().as_slice(), expected.as_slice());
}

#[test]
fn test_second_session_within_expiry_uses_cache_without_network() {
    let harness = Harness::new();
    harness.publish_repo(PRIMARY, None, false);

    let (first_pool, first_repos) = harness.run_session();
    let first_names: Vec<String> = first_pool
        .repo_solvables(first_repos[0].borrow().handle.unwrap())
        .into_iter()
        .map(|id| first_pool.solvable_str(id))
        .collect();
    let calls_after_first = harness.curl_calls();
    assert!(calls_after_first > 0);

    let (second_pool, second_repos) = harness.run_session();
    let second_names: Vec<String> = second_pool
        .repo_solvables(second_repos[0].borrow().handle.unwrap())
        .into_iter()
        .map(|id| second_pool.solvable_str(id))
        .collect();

    assert_eq!(first_names, second_names);
    assert_eq!(harness.curl_calls(), calls_after_first);
}

#[test]
fn test_primary_checksum_mismatch_keeps_session_data_but_never_caches() {
    let harness = Harness::new();
    harness.publish_repo(PRIMARY, None, true);

    let (pool, repos) = harness.run_session();
    let record = repos[0].borrow();
    assert!(record.incomplete);
    // only whatever was ingested before the bad file is available; the
    // primary itself was rejected
    assert!(pool
        .repo_solvables(record.handle.expect("repo kept for the session"))
        .is_empty());
    assert!(!harness.config.cache_dir.join("test.solv").exists());
}

#[test]
fn test_filelist_stub_loads_on_demand_and_caches() {
    let harness = Harness::new();
    harness.publish_repo(PRIMARY, Some(FILELISTS), false);

    let (mut pool, _repos) = harness.run_session();
    let flags = SEARCH_STRING | SEARCH_FILES | SEARCH_COMPLETE_FILELIST;
    let hits = pool.search(None, SOLVABLE_FILELIST, "/usr/bin/bar", flags);
    assert_eq!(hits.len(), 1);
    assert!(harness.config.cache_dir.join("test_FL.solvx").exists());

    // next session: primary comes from cache, the extension stub resolves
    // from the solvx file, and nothing touches the network
    let calls_before = harness.curl_calls();
    let (mut pool, _repos) = harness.run_session();
    let hits = pool.search(None, SOLVABLE_FILELIST, "/usr/bin/bar", flags);
    assert_eq!(hits.len(), 1);
    assert_eq!(harness.curl_calls(), calls_before);
}
