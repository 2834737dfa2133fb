//! Retrieval of repository files through an external HTTP client.
//!
//! The client is spawned per file (`curl -f -s -L <url>`) with its stdout
//! redirected into an anonymous temp file; the temp file is then verified
//! against the declared checksum and handed to the caller as a rewindable
//! stream, optionally wrapped in a decompressor chosen by file extension.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use solv_digest::Checksum;

use crate::cookie::{self, Cookie};

/// A fetched file backed by an unlinked temp file.
#[derive(Debug)]
pub struct FetchedFile {
    file: File,
    name: String,
    uncompress: bool,
}

impl FetchedFile {
    /// The raw bytes, rewound to the start.
    pub fn raw(&mut self) -> io::Result<&mut File> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(&mut self.file)
    }

    /// A reader over the contents, rewound to the start and transparently
    /// decompressed when the fetch asked for that.
    pub fn reader(&mut self) -> io::Result<Box<dyn Read + '_>> {
        self.file.seek(SeekFrom::Start(0))?;
        if !self.uncompress {
            return Ok(Box::new(&mut self.file));
        }
        Ok(if self.name.ends_with(".gz") {
            Box::new(flate2::read::GzDecoder::new(&mut self.file))
        } else if self.name.ends_with(".bz2") {
            Box::new(bzip2::read::BzDecoder::new(&mut self.file))
        } else if self.name.ends_with(".zst") {
            Box::new(zstd::stream::read::Decoder::new(&mut self.file)?)
        } else {
            Box::new(&mut self.file)
        })
    }

    /// The content cookie over the raw bytes.
    pub fn content_cookie(&mut self) -> io::Result<Cookie> {
        cookie::content_cookie(self.raw()?)
    }

    /// Consumes the handle, keeping the underlying descriptor alive for
    /// callers that pass it on (the rpm commit callback).
    pub fn into_file(mut self) -> io::Result<File> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(self.file)
    }
}

/// Spawns the external HTTP client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    program: PathBuf,
}

impl Default for Fetcher {
    fn default() -> Self {
        Fetcher {
            program: PathBuf::from("curl"),
        }
    }
}

impl Fetcher {
    /// A fetcher shelling out to the given client. The client must follow
    /// redirects, stay silent, and fail on HTTP errors, the way
    /// `curl -f -s -L` does.
    pub fn new(program: impl Into<PathBuf>) -> Fetcher {
        Fetcher {
            program: program.into(),
        }
    }

    /// Retrieves `relative` below `baseurl`.
    ///
    /// Returns `None` both when the file is absent (an expected outcome the
    /// caller treats as optional) and when the transfer or checksum failed;
    /// the latter additionally sets `bad_checksum`, which sticks for the
    /// repository refresh and forbids caching.
    pub fn fetch(
        &self,
        baseurl: &str,
        relative: &str,
        uncompress: bool,
        expected: Option<&Checksum>,
        bad_checksum: Option<&mut bool>,
    ) -> Option<FetchedFile> {
        let url = format!("{}/{}", baseurl.trim_end_matches('/'), relative);
        let mut mark_bad = {
            let mut slot = bad_checksum;
            move || {
                if let Some(flag) = slot.as_deref_mut() {
                    *flag = true;
                }
            }
        };

        let mut file = match tempfile::tempfile() {
            Ok(file) => file,
            Err(error) => {
                tracing::warn!("{relative}: cannot create temp file: {error}");
                mark_bad();
                return None;
            }
        };
        let stdout = match file.try_clone() {
            Ok(clone) => Stdio::from(clone),
            Err(error) => {
                tracing::warn!("{relative}: cannot share temp file: {error}");
                mark_bad();
                return None;
            }
        };
        let status = Command::new(&self.program)
            .arg("-f")
            .arg("-s")
            .arg("-L")
            .arg(&url)
            .stdout(stdout)
            .stderr(Stdio::null())
            .status();
        let status = match status {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!("{relative}: cannot run {}: {error}", self.program.display());
                mark_bad();
                return None;
            }
        };

        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        if size == 0 && (status.success() || expected.is_none()) {
            // the file is simply not there
            return None;
        }
        if !status.success() {
            tracing::warn!("{relative}: download error {}", status.code().unwrap_or(-1));
            mark_bad();
            return None;
        }
        if let Some(expected) = expected {
            if file.seek(SeekFrom::Start(0)).is_err() {
                mark_bad();
                return None;
            }
            match Checksum::compute(expected.kind(), &mut file) {
                Ok(actual) if actual.matches(expected) => {}
                Ok(_) => {
                    tracing::warn!("{relative}: checksum mismatch");
                    mark_bad();
                    return None;
                }
                Err(error) => {
                    tracing::warn!("{relative}: checksum error: {error}");
                    mark_bad();
                    return None;
                }
            }
        }
        Some(FetchedFile {
            file,
            name: relative.to_string(),
            uncompress,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use solv_digest::ChecksumKind;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    // stands in for curl: copies the "url" (a local path) to stdout,
    // failing silently like curl -f when it does not exist
    fn fake_curl(dir: &Path) -> PathBuf {
        let path = dir.join("fake-curl");
        std::fs::write(&path, "#!/bin/sh\nexec cat \"$4\" 2>/dev/null\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_fetch_reads_remote_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("repo")).unwrap();
        std::fs::write(dir.path().join("repo/index"), b"hello repo").unwrap();
        let fetcher = Fetcher::new(fake_curl(dir.path()));

        let baseurl = format!("{}/repo/", dir.path().display());
        let mut fetched = fetcher.fetch(&baseurl, "index", false, None, None).unwrap();
        let mut out = String::new();
        fetched.reader().unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello repo");
    }

    #[test]
    fn test_fetch_missing_optional_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("repo")).unwrap();
        let fetcher = Fetcher::new(fake_curl(dir.path()));
        let baseurl = format!("{}/repo", dir.path().display());
        assert!(fetcher.fetch(&baseurl, "gone", false, None, None).is_none());
    }

    #[test]
    fn test_fetch_checksum_mismatch_sets_sticky_flag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("repo")).unwrap();
        std::fs::write(dir.path().join("repo/data"), b"payload").unwrap();
        let fetcher = Fetcher::new(fake_curl(dir.path()));
        let baseurl = format!("{}/repo", dir.path().display());

        let wrong = Checksum::from_hex(
            ChecksumKind::Sha256,
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        let mut bad = false;
        assert!(fetcher
            .fetch(&baseurl, "data", false, Some(&wrong), Some(&mut bad))
            .is_none());
        assert!(bad);

        let mut right_bytes = &b"payload"[..];
        let right = Checksum::compute(ChecksumKind::Sha256, &mut right_bytes).unwrap();
        let mut bad = false;
        assert!(fetcher
            .fetch(&baseurl, "data", false, Some(&right), Some(&mut bad))
            .is_some());
        assert!(!bad);
    }

    #[test]
    fn test_fetch_uncompresses_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("repo")).unwrap();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"packed bytes").unwrap();
        std::fs::write(dir.path().join("repo/primary.gz"), encoder.finish().unwrap()).unwrap();
        let fetcher = Fetcher::new(fake_curl(dir.path()));
        let baseurl = format!("{}/repo", dir.path().display());

        let mut fetched = fetcher
            .fetch(&baseurl, "primary.gz", true, None, None)
            .unwrap();
        let mut out = String::new();
        fetched.reader().unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "packed bytes");
    }
}
