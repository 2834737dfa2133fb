#![deny(missing_docs)]

//! Repository metadata acquisition and caching for the `solv` driver.
//!
//! This crate owns the metadata lifecycle in front of the solver contract:
//! discovering configured repositories, fetching their indexes through an
//! external HTTP client, validating content against declared checksums,
//! keeping crash-safe on-disk caches bound by cookies, and resolving
//! extension metadata on demand through the pool's load callback.

pub mod cache;
pub mod cookie;
pub mod fetch;
pub mod loader;
pub mod repo;

pub use cache::{CacheError, CacheStore};
pub use cookie::{Cookie, COOKIE_LEN};
pub use fetch::{FetchedFile, Fetcher};
pub use loader::{repomd_find, LoadError, Loader, LoaderConfig, DEFAULT_DESCRDIR};
pub use repo::{discover_repos, RepoKind, RepoRecord, SharedRepo, METADATA_EXPIRE};
