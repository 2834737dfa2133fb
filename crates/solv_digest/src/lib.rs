#![deny(missing_docs)]

//! Checksum helpers built on the [RustCrypto/hashes](https://github.com/RustCrypto/hashes)
//! crates.
//!
//! Repository indexes declare the checksum algorithm of every file they
//! reference as a string (`"sha256"`, `"sha512"`, `"md5"`), so next to the
//! statically typed [`compute_file_digest`]/[`compute_bytes_digest`] helpers
//! this crate carries [`Checksum`], a runtime-typed (algorithm, bytes) pair
//! that can be computed over a stream and compared bytewise.

pub use digest;
pub use md5::Md5;
pub use sha2::{Sha256, Sha512};

use digest::{Digest, Output};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// A type alias for the output of a SHA256 hash.
pub type Sha256Hash = sha2::digest::Output<Sha256>;

/// Compute a hash of the file at the specified location.
pub fn compute_file_digest<D: Digest + Default + Write>(
    path: impl AsRef<Path>,
) -> Result<Output<D>, io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = D::default();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Compute a hash of the specified bytes.
pub fn compute_bytes_digest<D: Digest + Default + Write>(bytes: impl AsRef<[u8]>) -> Output<D> {
    let mut hasher = D::default();
    hasher.update(bytes);
    hasher.finalize()
}

/// Compute a hash over everything the reader yields.
pub fn compute_reader_digest<D: Digest + Default + Write>(
    reader: &mut impl Read,
) -> Result<Output<D>, io::Error> {
    let mut hasher = D::default();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Parses a hash hex string to a digest.
pub fn parse_digest_from_hex<D: Digest>(str: &str) -> Option<Output<D>> {
    let mut hash = <Output<D>>::default();
    match hex::decode_to_slice(str, &mut hash) {
        Ok(()) => Some(hash),
        Err(_) => None,
    }
}

/// The checksum algorithms understood by the repository metadata formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    /// MD5, still used by older yast2 repositories.
    Md5,
    /// SHA-256, the default for rpm-md metadata.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl ChecksumKind {
    /// Parses the algorithm name used in repository indexes. Returns `None`
    /// for algorithms this crate does not carry.
    pub fn from_type_str(name: &str) -> Option<ChecksumKind> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(ChecksumKind::Md5),
            "sha256" | "sha-256" => Some(ChecksumKind::Sha256),
            "sha512" | "sha-512" => Some(ChecksumKind::Sha512),
            _ => None,
        }
    }

    /// The length in bytes of a digest of this kind.
    pub fn digest_len(self) -> usize {
        match self {
            ChecksumKind::Md5 => 16,
            ChecksumKind::Sha256 => 32,
            ChecksumKind::Sha512 => 64,
        }
    }

    /// The canonical name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumKind::Md5 => "md5",
            ChecksumKind::Sha256 => "sha256",
            ChecksumKind::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runtime-typed checksum: the algorithm together with the raw digest
/// bytes. Comparison is bytewise; the digest is never interpreted as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    kind: ChecksumKind,
    bytes: Vec<u8>,
}

impl Checksum {
    /// Wraps raw digest bytes. Returns `None` when the length does not match
    /// the algorithm.
    pub fn from_bytes(kind: ChecksumKind, bytes: Vec<u8>) -> Option<Checksum> {
        (bytes.len() == kind.digest_len()).then_some(Checksum { kind, bytes })
    }

    /// Parses a hex digest string.
    pub fn from_hex(kind: ChecksumKind, hex_str: &str) -> Option<Checksum> {
        let bytes = hex::decode(hex_str).ok()?;
        Checksum::from_bytes(kind, bytes)
    }

    /// Computes the checksum of everything the reader yields.
    pub fn compute(kind: ChecksumKind, reader: &mut impl Read) -> Result<Checksum, io::Error> {
        let bytes = match kind {
            ChecksumKind::Md5 => compute_reader_digest::<Md5>(reader)?.to_vec(),
            ChecksumKind::Sha256 => compute_reader_digest::<Sha256>(reader)?.to_vec(),
            ChecksumKind::Sha512 => compute_reader_digest::<Sha512>(reader)?.to_vec(),
        };
        Ok(Checksum { kind, bytes })
    }

    /// Computes the checksum of a file on disk.
    pub fn compute_file(kind: ChecksumKind, path: impl AsRef<Path>) -> Result<Checksum, io::Error> {
        let mut file = File::open(path)?;
        Checksum::compute(kind, &mut file)
    }

    /// The algorithm of this checksum.
    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytewise comparison against another checksum of the same kind.
    pub fn matches(&self, other: &Checksum) -> bool {
        self.kind == other.kind && self.bytes == other.bytes
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, hex::encode(&self.bytes))
    }
}

/// Wraps a reader and hashes every byte that passes through it. Call
/// [`HashingReader::finalize`] to retrieve the inner reader and the digest.
pub struct HashingReader<R, D: Digest> {
    reader: R,
    hasher: D,
}

impl<R, D: Digest + Default> HashingReader<R, D> {
    /// Constructs a new instance from a reader and a fresh hasher.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            hasher: Default::default(),
        }
    }

    /// Consume this instance and return the original reader and the digest of
    /// the bytes read through it.
    pub fn finalize(self) -> (R, Output<D>) {
        (self.reader, self.hasher.finalize())
    }
}

impl<R: Read, D: Digest> Read for HashingReader<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes_read = self.reader.read(buf)?;
        self.hasher.update(&buf[..bytes_read]);
        Ok(bytes_read)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_bytes_digest() {
        let digest = compute_bytes_digest::<Sha256>("Hello, world!");
        assert_eq!(
            digest[..],
            hex!("315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3")[..]
        );
    }

    #[test]
    fn test_file_digest_matches_bytes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"some bytes").unwrap();
        assert_eq!(
            compute_file_digest::<Sha256>(&path).unwrap(),
            compute_bytes_digest::<Sha256>(b"some bytes")
        );
    }

    #[test]
    fn test_checksum_kind_parsing() {
        assert_eq!(
            ChecksumKind::from_type_str("SHA256"),
            Some(ChecksumKind::Sha256)
        );
        assert_eq!(ChecksumKind::from_type_str("md5"), Some(ChecksumKind::Md5));
        assert_eq!(ChecksumKind::from_type_str("crc32"), None);
    }

    #[test]
    fn test_checksum_compute_and_match() {
        let mut data = &b"abc"[..];
        let computed = Checksum::compute(ChecksumKind::Sha256, &mut data).unwrap();
        let expected = Checksum::from_hex(
            ChecksumKind::Sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        )
        .unwrap();
        assert!(computed.matches(&expected));

        let other = Checksum::compute(ChecksumKind::Md5, &mut &b"abc"[..]).unwrap();
        assert!(!computed.matches(&other));
    }

    #[test]
    fn test_checksum_rejects_wrong_length() {
        assert!(Checksum::from_hex(ChecksumKind::Sha256, "deadbeef").is_none());
    }

    #[test]
    fn test_hashing_reader() {
        let mut reader = HashingReader::<_, Sha256>::new(&b"Hello, world!"[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        let (_, digest) = reader.finalize();
        assert_eq!(out, b"Hello, world!");
        assert_eq!(digest, compute_bytes_digest::<Sha256>("Hello, world!"));
    }
}
