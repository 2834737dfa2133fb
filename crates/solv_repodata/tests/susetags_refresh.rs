//! Refresh of a yast2 (susetags) repository: content index, two-phase
//! packages load, and an on-demand translation extension.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use solv_digest::{compute_bytes_digest, Sha256};
use solv_pool::keys::{langkey, SOLVABLE_SUMMARY};
use solv_pool::mem::MemPool;
use solv_pool::Pool;
use solv_repodata::{Loader, LoaderConfig};

const PACKAGES: &str = "memsolv 1
s\tfoo\t1.0-1\tx86_64\topenSUSE\tloc=foo-1.0-1.x86_64.rpm
s\tbar\t2.0-1\tnoarch\topenSUSE\tloc=bar-2.0-1.noarch.rpm
";

const PACKAGES_EN: &str = "memsolvx 1
x\tfoo\ta\tsolvable:summary:en\tthe foo tool
x\tbar\ta\tsolvable:summary:en\tthe bar files
";

const PACKAGES_DE: &str = "memsolvx 1
x\tfoo\ta\tsolvable:summary:de\tdas foo Werkzeug
x\tbar\ta\tsolvable:summary:de\tdie bar Dateien
";

fn gz(data: &str) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

struct Harness {
    _root: tempfile::TempDir,
    config: LoaderConfig,
    curl_log: PathBuf,
}

impl Harness {
    fn new() -> Harness {
        let root = tempfile::tempdir().unwrap();
        let server = root.path().join("server");
        let descr = server.join("suse/setup/descr");
        std::fs::create_dir_all(&descr).unwrap();
        let repos_dir = root.path().join("repos.d");
        std::fs::create_dir_all(&repos_dir).unwrap();
        let products = root.path().join("products.d");
        std::fs::create_dir_all(&products).unwrap();
        let rpmdb = root.path().join("rpm-packages");
        std::fs::write(&rpmdb, "memsolv 1\n").unwrap();

        let packages_gz = gz(PACKAGES);
        let packages_en_gz = gz(PACKAGES_EN);
        std::fs::write(descr.join("packages.gz"), &packages_gz).unwrap();
        std::fs::write(descr.join("packages.en.gz"), &packages_en_gz).unwrap();
        std::fs::write(descr.join("packages.de"), PACKAGES_DE).unwrap();

        let content = format!(
            "memsolv 1\n\
             c\tsusetags:descrdir\tsuse/setup/descr\n\
             c\tsusetags:datadir\tsuse\n\
             t\tpackages.gz\tsha256:{}\n\
             t\tpackages.en.gz\tsha256:{}\n\
             t\tpackages.de\tsha256:{}\n",
            hex::encode(compute_bytes_digest::<Sha256>(&packages_gz)),
            hex::encode(compute_bytes_digest::<Sha256>(&packages_en_gz)),
            hex::encode(compute_bytes_digest::<Sha256>(PACKAGES_DE)),
        );
        std::fs::write(server.join("content"), content).unwrap();

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
            repos_dir.join("suse.repo"),
            format!(
                "[suse]\nbaseurl={}\nenabled=1\nautorefresh=1\ntype=yast2\n",
                server.display()
            ),
        )
        .unwrap();

        Harness {
            config: LoaderConfig {
                cache_dir: root.path().join("cache"),
                repos_dir,
                rpmdb_path: rpmdb,
                products_dir: products,
                arch: Some("x86_64".to_string()),
                fetch_program: curl,
            },
            _root: root,
            curl_log,
        }
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

#[test]
fn test_two_phase_primary_load_with_english_descriptions() {
    let harness = Harness::new();
    let (mut pool, repos) = harness.run_session();
    let record = repos[0].borrow();
    let handle = record.handle.expect("repo loaded");

    let solvables = pool.repo_solvables(handle);
    assert_eq!(solvables.len(), 2);
    let foo = solvables
        .iter()
        .copied()
        .find(|&id| pool.solvable(id).name == "foo")
        .unwrap();
    assert_eq!(
        pool.lookup_str(foo, &langkey(SOLVABLE_SUMMARY, "en")),
        Some("the foo tool".to_string())
    );
    assert!(harness.config.cache_dir.join("suse.solv").exists());
}

#[test]
fn test_translation_extension_loads_on_demand_and_caches() {
    let harness = Harness::new();
    let (mut pool, repos) = harness.run_session();
    let handle = repos[0].borrow().handle.expect("repo loaded");
    let foo = pool
        .repo_solvables(handle)
        .into_iter()
        .find(|&id| pool.solvable(id).name == "foo")
        .unwrap();

    // first touch of a German key resolves the stub over the network
    assert_eq!(
        pool.lookup_str(foo, &langkey(SOLVABLE_SUMMARY, "de")),
        Some("das foo Werkzeug".to_string())
    );
    assert!(harness.config.cache_dir.join("suse_de.solvx").exists());

    // a fresh session serves both primary and extension from the cache
    let calls_before = harness.curl_calls();
    let (mut pool, repos) = harness.run_session();
    let handle = repos[0].borrow().handle.expect("repo loaded");
    let foo = pool
        .repo_solvables(handle)
        .into_iter()
        .find(|&id| pool.solvable(id).name == "foo")
        .unwrap();
    assert_eq!(
        pool.lookup_str(foo, &langkey(SOLVABLE_SUMMARY, "de")),
        Some("das foo Werkzeug".to_string())
    );
    assert_eq!(harness.curl_calls(), calls_before);
}
