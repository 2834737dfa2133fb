//! Cache cookies: 32-byte fingerprints that bind cache files to the
//! metadata they were produced from.
//!
//! Cookies are raw byte buffers, never strings. Three constructors exist:
//! a stat cookie over a file's identity, a content cookie over an index
//! stream, and the derived extension cookie tying a repository's primary
//! cache to its extension caches.

use std::fs::Metadata;
use std::io::{self, Read};
use std::os::unix::fs::MetadataExt;

use solv_digest::digest::Digest;
use solv_digest::Sha256;

/// The size of every cookie.
pub const COOKIE_LEN: usize = 32;

/// A 32-byte cache fingerprint.
pub type Cookie = [u8; COOKIE_LEN];

/// Fingerprints a file's identity: SHA-256 over the literal `"1.1"`
/// followed by the decimal forms of device, inode, size, and mtime.
pub fn stat_cookie(meta: &Metadata) -> Cookie {
    let mut hasher = Sha256::new();
    hasher.update(b"1.1");
    hasher.update(meta.dev().to_string().as_bytes());
    hasher.update(meta.ino().to_string().as_bytes());
    hasher.update(meta.size().to_string().as_bytes());
    hasher.update(meta.mtime().to_string().as_bytes());
    hasher.finalize().into()
}

/// Fingerprints an entire index stream.
pub fn content_cookie(reader: &mut impl Read) -> io::Result<Cookie> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

/// Derives the extension cookie from the freshly written cache file and the
/// primary cookie. The first byte is forced to `0x01` when the XOR would
/// leave it zero, so a valid extension cookie is never all-zero prefixed.
pub fn ext_cookie(cache_file: &Metadata, primary: &Cookie) -> Cookie {
    let stat = stat_cookie(cache_file);
    let mut out = [0u8; COOKIE_LEN];
    for (slot, (a, b)) in out.iter_mut().zip(stat.iter().zip(primary.iter())) {
        *slot = a ^ b;
    }
    if out[0] == 0 {
        out[0] = 1;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stat_cookie_tracks_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        std::fs::write(&path, b"one").unwrap();
        let first = stat_cookie(&std::fs::metadata(&path).unwrap());
        assert_eq!(first, stat_cookie(&std::fs::metadata(&path).unwrap()));

        std::fs::write(&path, b"grown content").unwrap();
        let second = stat_cookie(&std::fs::metadata(&path).unwrap());
        assert_ne!(first, second);
    }

    #[test]
    fn test_content_cookie_is_content_only() {
        let a = content_cookie(&mut &b"repomd"[..]).unwrap();
        let b = content_cookie(&mut &b"repomd"[..]).unwrap();
        let c = content_cookie(&mut &b"other"[..]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ext_cookie_first_byte_never_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache");
        std::fs::write(&path, b"cache body").unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        // force the XOR of byte 0 to zero by feeding the stat cookie back
        let primary = stat_cookie(&meta);
        let derived = ext_cookie(&meta, &primary);
        assert_eq!(derived[0], 1);
        assert!(derived[1..].iter().all(|&b| b == 0));
    }
}
