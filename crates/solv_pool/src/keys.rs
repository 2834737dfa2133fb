//! Known attribute keys, interned through the pool on use.
//!
//! The constants follow the knownid table of the native library; only the
//! keys the driver actually touches are carried.

/// Package name.
pub const SOLVABLE_NAME: &str = "solvable:name";
/// Epoch-version-release.
pub const SOLVABLE_EVR: &str = "solvable:evr";
/// Architecture.
pub const SOLVABLE_ARCH: &str = "solvable:arch";
/// Vendor string.
pub const SOLVABLE_VENDOR: &str = "solvable:vendor";
/// One-line summary.
pub const SOLVABLE_SUMMARY: &str = "solvable:summary";
/// Long description.
pub const SOLVABLE_DESCRIPTION: &str = "solvable:description";
/// Upstream URL.
pub const SOLVABLE_URL: &str = "solvable:url";
/// License string.
pub const SOLVABLE_LICENSE: &str = "solvable:license";
/// File list of the package.
pub const SOLVABLE_FILELIST: &str = "solvable:filelist";
/// Package payload checksum.
pub const SOLVABLE_CHECKSUM: &str = "solvable:checksum";
/// Download size in bytes.
pub const SOLVABLE_DOWNLOADSIZE: &str = "solvable:downloadsize";
/// End user license agreement.
pub const SOLVABLE_EULA: &str = "solvable:eula";
/// Message shown on install.
pub const SOLVABLE_MESSAGEINS: &str = "solvable:messageins";
/// Message shown on removal.
pub const SOLVABLE_MESSAGEDEL: &str = "solvable:messagedel";
/// Package category.
pub const SOLVABLE_CATEGORY: &str = "solvable:category";

/// Database id of an installed package in the system rpm database.
pub const RPM_RPMDBID: &str = "rpm:dbid";

/// Type of a repomd.xml index entry (`primary`, `filelists`, ...).
pub const REPOSITORY_REPOMD_TYPE: &str = "repository:repomd:type";
/// Location of a repomd.xml index entry.
pub const REPOSITORY_REPOMD_LOCATION: &str = "repository:repomd:location";
/// Checksum of a repomd.xml index entry.
pub const REPOSITORY_REPOMD_CHECKSUM: &str = "repository:repomd:checksum";
/// The keys an external (stub) repodata contributes.
pub const REPOSITORY_KEYS: &str = "repository:keys";
/// Flex-array of external repodata descriptors.
pub const REPOSITORY_EXTERNAL: &str = "repository:external";
/// Id array of file provides merged into this repository's cache.
pub const REPOSITORY_ADDEDFILEPROVIDES: &str = "repository:addedfileprovides";
/// Delta package information of a repository.
pub const REPOSITORY_DELTAINFO: &str = "repository:deltainfo";

/// susetags: name of a description file.
pub const SUSETAGS_FILE_NAME: &str = "susetags:file:name";
/// susetags: checksum of a description file.
pub const SUSETAGS_FILE_CHECKSUM: &str = "susetags:file:checksum";
/// susetags: package data directory.
pub const SUSETAGS_DATADIR: &str = "susetags:datadir";
/// susetags: description directory.
pub const SUSETAGS_DESCRDIR: &str = "susetags:descrdir";
/// susetags: default vendor.
pub const SUSETAGS_DEFAULTVENDOR: &str = "susetags:defaultvendor";

/// Attribute type: string.
pub const REPOKEY_TYPE_STR: &str = "repokey:type:str";
/// Attribute type: interned id.
pub const REPOKEY_TYPE_ID: &str = "repokey:type:id";
/// Attribute type: directory + string array (file lists).
pub const REPOKEY_TYPE_DIRSTRARRAY: &str = "repokey:type:dirstrarray";
/// Attribute type: flex array (delta info).
pub const REPOKEY_TYPE_FLEXARRAY: &str = "repokey:type:flexarray";

/// Builds the language-variant form of a key, e.g. `solvable:summary:de`.
pub fn langkey(key: &str, lang: &str) -> String {
    format!("{key}:{lang}")
}
