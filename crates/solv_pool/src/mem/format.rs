//! The line-oriented stand-in for the solv binary format used by the
//! in-memory backend.
//!
//! Tokens are tab separated; the first token of every line is a tag. A repo
//! body starts with `memsolv 1`, an extension body with `memsolvx 1` (the
//! header is optional on read so fixtures can be written by hand).
//!
//! ```text
//! s  name  evr  arch  vendor  [loc=..] [chk=kind:hex] [dbid=n] [size=n]
//! p  dep                      provides entry of the preceding solvable
//! f  path                     file list entry of the preceding solvable
//! a  key  value               string attribute of the preceding solvable
//! m  str|id  key  value       repo meta entry
//! i  path                     added-fileprovides entry of the first repodata
//! r  kind  location  [chk]    repomd index entry
//! t  filename  [chk]          susetags index entry
//! c  key  value               content-file meta entry (add_content input)
//! d  name evr arch base seq location [chk]   delta entry
//! e  begin|str|chk|ids|end    external stub descriptor block
//! x  name  f|a  ...           extension data keyed by solvable name
//! ```

use std::io::{BufRead, BufReader, Read, Write};

use solv_digest::{Checksum, ChecksumKind};

use crate::pool::{PoolError, RepomdEntry, SusetagsEntry};

pub(super) const HEADER: &str = "memsolv 1";
pub(super) const EXT_HEADER: &str = "memsolvx 1";

#[derive(Debug, Default, Clone)]
pub(super) struct SolvableRecord {
    pub name: String,
    pub evr: String,
    pub arch: String,
    pub vendor: String,
    pub location: Option<String>,
    pub checksum: Option<Checksum>,
    pub dbid: Option<u64>,
    pub size: Option<u64>,
    pub provides: Vec<String>,
    pub filelist: Vec<String>,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct DeltaRecord {
    pub name: String,
    pub evr: String,
    pub arch: String,
    pub base_evr: String,
    pub seq: String,
    pub location: String,
    pub checksum: Option<Checksum>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct ExternalRecord {
    pub str_attrs: Vec<(String, String)>,
    pub chk_attrs: Vec<(String, Checksum)>,
    pub idarrays: Vec<(String, Vec<String>)>,
}

/// Everything a repo body can carry. Readers accept any subset of line
/// kinds, which lets the same parser serve cache bodies, repomd indexes,
/// content files, and primary metadata.
#[derive(Debug, Default)]
pub(super) struct RepoBody {
    pub meta_str: Vec<(String, String)>,
    pub meta_id: Vec<(String, String)>,
    pub added_fileprovides: Vec<String>,
    pub repomd: Vec<RepomdEntry>,
    pub susetags: Vec<SusetagsEntry>,
    pub deltas: Vec<DeltaRecord>,
    pub solvables: Vec<SolvableRecord>,
    pub externals: Vec<ExternalRecord>,
}

/// Per-solvable extension payload, keyed by package name.
#[derive(Debug)]
pub(super) enum ExtLine {
    File(String),
    Attr(String, String),
}

#[derive(Debug, Default)]
pub(super) struct ExtensionBody {
    pub entries: Vec<(String, ExtLine)>,
    pub deltas: Vec<DeltaRecord>,
}

fn parse_error(reason: impl Into<String>) -> PoolError {
    PoolError::Parse {
        format: "memsolv",
        reason: reason.into(),
    }
}

fn format_checksum(c: &Checksum) -> String {
    format!("{}:{}", c.kind(), hex::encode(c.as_bytes()))
}

fn parse_checksum(token: &str) -> Result<Checksum, PoolError> {
    let (kind, hex_part) = token
        .split_once(':')
        .ok_or_else(|| parse_error(format!("malformed checksum token `{token}`")))?;
    let kind = ChecksumKind::from_type_str(kind)
        .ok_or_else(|| parse_error(format!("unknown checksum type `{kind}`")))?;
    Checksum::from_hex(kind, hex_part)
        .ok_or_else(|| parse_error(format!("malformed checksum token `{token}`")))
}

pub(super) fn write_repo_body(w: &mut dyn Write, body: &RepoBody) -> Result<(), PoolError> {
    writeln!(w, "{HEADER}")?;
    for (key, value) in &body.meta_str {
        writeln!(w, "m\tstr\t{key}\t{value}")?;
    }
    for (key, value) in &body.meta_id {
        writeln!(w, "m\tid\t{key}\t{value}")?;
    }
    for path in &body.added_fileprovides {
        writeln!(w, "i\t{path}")?;
    }
    for entry in &body.repomd {
        match &entry.checksum {
            Some(c) => writeln!(
                w,
                "r\t{}\t{}\t{}",
                entry.kind,
                entry.location,
                format_checksum(c)
            )?,
            None => writeln!(w, "r\t{}\t{}", entry.kind, entry.location)?,
        }
    }
    for entry in &body.susetags {
        match &entry.checksum {
            Some(c) => writeln!(w, "t\t{}\t{}", entry.filename, format_checksum(c))?,
            None => writeln!(w, "t\t{}", entry.filename)?,
        }
    }
    for delta in &body.deltas {
        write_delta(w, delta)?;
    }
    for external in &body.externals {
        writeln!(w, "e\tbegin")?;
        for (key, value) in &external.str_attrs {
            writeln!(w, "e\tstr\t{key}\t{value}")?;
        }
        for (key, value) in &external.chk_attrs {
            writeln!(w, "e\tchk\t{key}\t{}", format_checksum(value))?;
        }
        for (key, values) in &external.idarrays {
            writeln!(w, "e\tids\t{key}\t{}", values.join(","))?;
        }
        writeln!(w, "e\tend")?;
    }
    for record in &body.solvables {
        write_solvable(w, record)?;
    }
    Ok(())
}

fn write_delta(w: &mut dyn Write, delta: &DeltaRecord) -> Result<(), PoolError> {
    let mut line = format!(
        "d\t{}\t{}\t{}\t{}\t{}\t{}",
        delta.name, delta.evr, delta.arch, delta.base_evr, delta.seq, delta.location
    );
    if let Some(c) = &delta.checksum {
        line.push('\t');
        line.push_str(&format_checksum(c));
    }
    writeln!(w, "{line}")?;
    Ok(())
}

fn write_solvable(w: &mut dyn Write, record: &SolvableRecord) -> Result<(), PoolError> {
    let mut line = format!(
        "s\t{}\t{}\t{}\t{}",
        record.name, record.evr, record.arch, record.vendor
    );
    if let Some(location) = &record.location {
        line.push_str(&format!("\tloc={location}"));
    }
    if let Some(c) = &record.checksum {
        line.push_str(&format!("\tchk={}", format_checksum(c)));
    }
    if let Some(dbid) = record.dbid {
        line.push_str(&format!("\tdbid={dbid}"));
    }
    if let Some(size) = record.size {
        line.push_str(&format!("\tsize={size}"));
    }
    writeln!(w, "{line}")?;
    for dep in &record.provides {
        writeln!(w, "p\t{dep}")?;
    }
    for path in &record.filelist {
        writeln!(w, "f\t{path}")?;
    }
    for (key, value) in &record.attrs {
        writeln!(w, "a\t{key}\t{value}")?;
    }
    Ok(())
}

pub(super) fn read_repo_body(r: &mut dyn Read) -> Result<RepoBody, PoolError> {
    let reader = BufReader::new(r);
    let mut body = RepoBody::default();
    let mut current_external: Option<ExternalRecord> = None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line == HEADER {
            continue;
        }
        let mut tokens = line.split('\t');
        let tag = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();
        match tag {
            "s" => {
                if rest.len() < 4 {
                    return Err(parse_error(format!("short solvable line `{line}`")));
                }
                let mut record = SolvableRecord {
                    name: rest[0].to_string(),
                    evr: rest[1].to_string(),
                    arch: rest[2].to_string(),
                    vendor: rest[3].to_string(),
                    ..Default::default()
                };
                for extra in &rest[4..] {
                    if let Some(v) = extra.strip_prefix("loc=") {
                        record.location = Some(v.to_string());
                    } else if let Some(v) = extra.strip_prefix("chk=") {
                        record.checksum = Some(parse_checksum(v)?);
                    } else if let Some(v) = extra.strip_prefix("dbid=") {
                        record.dbid = v.parse().ok();
                    } else if let Some(v) = extra.strip_prefix("size=") {
                        record.size = v.parse().ok();
                    }
                }
                body.solvables.push(record);
            }
            "p" | "f" | "a" => {
                let record = body
                    .solvables
                    .last_mut()
                    .ok_or_else(|| parse_error(format!("`{tag}` line before any solvable")))?;
                match tag {
                    "p" => record.provides.push(rest.join("\t")),
                    "f" => record.filelist.push(rest.join("\t")),
                    _ => {
                        if rest.len() < 2 {
                            return Err(parse_error(format!("short attribute line `{line}`")));
                        }
                        record
                            .attrs
                            .push((rest[0].to_string(), rest[1..].join("\t")));
                    }
                }
            }
            "m" => {
                if rest.len() < 3 {
                    return Err(parse_error(format!("short meta line `{line}`")));
                }
                let pair = (rest[1].to_string(), rest[2..].join("\t"));
                match rest[0] {
                    "str" => body.meta_str.push(pair),
                    "id" => body.meta_id.push(pair),
                    other => return Err(parse_error(format!("unknown meta class `{other}`"))),
                }
            }
            "i" => body.added_fileprovides.push(rest.join("\t")),
            "r" => {
                if rest.len() < 2 {
                    return Err(parse_error(format!("short repomd line `{line}`")));
                }
                body.repomd.push(RepomdEntry {
                    kind: rest[0].to_string(),
                    location: rest[1].to_string(),
                    checksum: rest.get(2).map(|t| parse_checksum(t)).transpose()?,
                });
            }
            "t" => {
                if rest.is_empty() {
                    return Err(parse_error(format!("short susetags line `{line}`")));
                }
                body.susetags.push(SusetagsEntry {
                    filename: rest[0].to_string(),
                    checksum: rest.get(1).map(|t| parse_checksum(t)).transpose()?,
                });
            }
            "c" => {
                if rest.len() < 2 {
                    return Err(parse_error(format!("short content line `{line}`")));
                }
                body.meta_str
                    .push((rest[0].to_string(), rest[1..].join("\t")));
            }
            "d" => body.deltas.push(parse_delta(&rest, line)?),
            "e" => match rest.first().copied() {
                Some("begin") => current_external = Some(ExternalRecord::default()),
                Some("end") => {
                    let external = current_external
                        .take()
                        .ok_or_else(|| parse_error("`e end` without `e begin`"))?;
                    body.externals.push(external);
                }
                Some(class) => {
                    let external = current_external
                        .as_mut()
                        .ok_or_else(|| parse_error("`e` entry without `e begin`"))?;
                    if rest.len() < 3 {
                        return Err(parse_error(format!("short external line `{line}`")));
                    }
                    let key = rest[1].to_string();
                    match class {
                        "str" => external.str_attrs.push((key, rest[2..].join("\t"))),
                        "chk" => external.chk_attrs.push((key, parse_checksum(rest[2])?)),
                        "ids" => external.idarrays.push((
                            key,
                            rest[2].split(',').map(str::to_string).collect(),
                        )),
                        other => {
                            return Err(parse_error(format!("unknown external class `{other}`")))
                        }
                    }
                }
                None => return Err(parse_error("bare `e` line")),
            },
            other => return Err(parse_error(format!("unknown line tag `{other}`"))),
        }
    }
    if current_external.is_some() {
        return Err(parse_error("unterminated external block"));
    }
    Ok(body)
}

fn parse_delta(rest: &[&str], line: &str) -> Result<DeltaRecord, PoolError> {
    if rest.len() < 6 {
        return Err(parse_error(format!("short delta line `{line}`")));
    }
    Ok(DeltaRecord {
        name: rest[0].to_string(),
        evr: rest[1].to_string(),
        arch: rest[2].to_string(),
        base_evr: rest[3].to_string(),
        seq: rest[4].to_string(),
        location: rest[5].to_string(),
        checksum: rest.get(6).map(|t| parse_checksum(t)).transpose()?,
    })
}

pub(super) fn write_extension_body(
    w: &mut dyn Write,
    body: &ExtensionBody,
) -> Result<(), PoolError> {
    writeln!(w, "{EXT_HEADER}")?;
    for delta in &body.deltas {
        write_delta(w, delta)?;
    }
    for (name, entry) in &body.entries {
        match entry {
            ExtLine::File(path) => writeln!(w, "x\t{name}\tf\t{path}")?,
            ExtLine::Attr(key, value) => writeln!(w, "x\t{name}\ta\t{key}\t{value}")?,
        }
    }
    Ok(())
}

pub(super) fn read_extension_body(r: &mut dyn Read) -> Result<ExtensionBody, PoolError> {
    let reader = BufReader::new(r);
    let mut body = ExtensionBody::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line == EXT_HEADER {
            continue;
        }
        let mut tokens = line.split('\t');
        let tag = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();
        match tag {
            "d" => body.deltas.push(parse_delta(&rest, line)?),
            "x" => {
                if rest.len() < 2 {
                    return Err(parse_error(format!("short extension line `{line}`")));
                }
                let name = rest[0].to_string();
                match rest[1] {
                    "f" => {
                        if rest.len() < 3 {
                            return Err(parse_error(format!("short extension line `{line}`")));
                        }
                        body.entries.push((name, ExtLine::File(rest[2..].join("\t"))));
                    }
                    "a" => {
                        if rest.len() < 4 {
                            return Err(parse_error(format!("short extension line `{line}`")));
                        }
                        body.entries
                            .push((name, ExtLine::Attr(rest[2].to_string(), rest[3..].join("\t"))));
                    }
                    other => {
                        return Err(parse_error(format!("unknown extension class `{other}`")))
                    }
                }
            }
            other => return Err(parse_error(format!("unknown line tag `{other}`"))),
        }
    }
    Ok(body)
}
