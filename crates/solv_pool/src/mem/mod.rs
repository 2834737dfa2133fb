//! A miniature in-memory implementation of the [`Pool`] contract.
//!
//! This backend exists so the driver crates can be exercised end-to-end
//! without the native library. Ingestion reads the line-oriented format
//! described in [`format`] instead of the real metadata formats, and the
//! solver performs direct job satisfaction plus same-name conflict
//! detection instead of dependency solving. Interfaces and observable
//! sequencing (stub arming, load callbacks, cache round-trips) follow the
//! contract exactly.

mod evr;
mod format;
mod solver;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use solv_digest::Checksum;

use crate::flags::{
    REL_ARCH, REL_EQ, REL_GT, REL_LT, REPO_EXTEND_SOLVABLES, SEARCH_COMPLETE_FILELIST,
    SEARCH_GLOB, SEARCH_NOCASE, SEARCH_STRING, SEARCH_STRINGMASK, SEARCH_SUBSTRING,
    SOLVER_SOLVABLE, SOLVER_SOLVABLE_ALL, SOLVER_SOLVABLE_NAME, SOLVER_SOLVABLE_ONE_OF,
    SOLVER_SOLVABLE_PROVIDES, SOLV_ADD_NO_STUBS,
};
use crate::keys::{
    REPOSITORY_ADDEDFILEPROVIDES, REPOSITORY_DELTAINFO, REPOSITORY_KEYS, SOLVABLE_FILELIST,
    SOLVABLE_NAME,
};
use crate::pool::{
    DeltaInfo, LoadCallback, Pool, PoolError, RepomdEntry, SearchMatch, SolvableInfo, Solver,
    SusetagsEntry,
};
use crate::{Id, Job, RepoId, RepodataId, SolvableId};

use self::format::{DeltaRecord, ExtLine, ExtensionBody, ExternalRecord, RepoBody, SolvableRecord};

const REL_BASE: Id = 0x4000_0000;
const SET_BASE: Id = 0x6000_0000;

#[derive(Debug, Clone)]
struct MemSolvable {
    name: Id,
    evr: Id,
    arch: Id,
    vendor: Id,
    repo: RepoId,
    provides: Vec<Id>,
    filelist: Vec<String>,
    attrs: HashMap<String, String>,
    location: Option<String>,
    checksum: Option<Checksum>,
    dbid: Option<u64>,
    size: Option<u64>,
}

#[derive(Debug, Default)]
struct MemRepo {
    name: String,
    priority: i32,
    solvables: Vec<SolvableId>,
    repodatas: Vec<RepodataId>,
    meta_str: HashMap<String, String>,
    meta_id: HashMap<String, Id>,
    repomd: Vec<RepomdEntry>,
    susetags: Vec<SusetagsEntry>,
    deltas: Vec<DeltaInfo>,
}

#[derive(Debug)]
struct MemRepodata {
    repo: RepoId,
    str_attrs: HashMap<String, String>,
    chk_attrs: HashMap<String, Checksum>,
    idarrays: HashMap<String, Vec<Id>>,
    external: bool,
    armed: bool,
    loaded: bool,
}

/// The in-memory pool.
pub struct MemPool {
    strings: Vec<String>,
    string_ids: HashMap<String, Id>,
    rels: Vec<(Id, Id, u32)>,
    sets: Vec<Vec<SolvableId>>,
    known_archs: HashSet<String>,
    repos: Vec<Option<MemRepo>>,
    repodatas: Vec<Option<MemRepodata>>,
    solvables: Vec<Option<MemSolvable>>,
    installed: Option<RepoId>,
    callback: Option<LoadCallback>,
    file_provides: BTreeSet<Id>,
}

impl Default for MemPool {
    fn default() -> Self {
        MemPool {
            strings: vec![String::new()],
            string_ids: HashMap::from([(String::new(), 0)]),
            rels: Vec::new(),
            sets: Vec::new(),
            known_archs: HashSet::from(["noarch".to_string()]),
            repos: Vec::new(),
            repodatas: Vec::new(),
            solvables: Vec::new(),
            installed: None,
            callback: None,
            file_provides: BTreeSet::new(),
        }
    }
}

impl MemPool {
    /// Creates an empty pool.
    pub fn new() -> MemPool {
        MemPool::default()
    }

    fn str_of(&self, id: Id) -> &str {
        self.strings
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    fn rel_parts(&self, id: Id) -> Option<(Id, Id, u32)> {
        if id >= REL_BASE && id < SET_BASE {
            self.rels.get((id - REL_BASE) as usize).copied()
        } else {
            None
        }
    }

    fn repo(&self, repo: RepoId) -> &MemRepo {
        self.repos[repo.0 as usize]
            .as_ref()
            .expect("stale repo handle")
    }

    fn repo_mut(&mut self, repo: RepoId) -> &mut MemRepo {
        self.repos[repo.0 as usize]
            .as_mut()
            .expect("stale repo handle")
    }

    fn data(&self, data: RepodataId) -> &MemRepodata {
        self.repodatas[data.0 as usize]
            .as_ref()
            .expect("stale repodata handle")
    }

    fn data_mut(&mut self, data: RepodataId) -> &mut MemRepodata {
        self.repodatas[data.0 as usize]
            .as_mut()
            .expect("stale repodata handle")
    }

    fn live(&self, id: SolvableId) -> Option<&MemSolvable> {
        self.solvables.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn new_repodata(&mut self, repo: RepoId) -> RepodataId {
        let id = RepodataId(self.repodatas.len() as u32);
        self.repodatas.push(Some(MemRepodata {
            repo,
            str_attrs: HashMap::new(),
            chk_attrs: HashMap::new(),
            idarrays: HashMap::new(),
            external: false,
            armed: false,
            loaded: false,
        }));
        self.repo_mut(repo).repodatas.push(id);
        id
    }

    fn parse_dep(&mut self, dep: &str) -> Id {
        let tokens: Vec<&str> = dep.split_whitespace().collect();
        if tokens.len() == 3 {
            let flags = match tokens[1] {
                "<" => REL_LT,
                "<=" => REL_LT | REL_EQ,
                "=" => REL_EQ,
                ">=" => REL_GT | REL_EQ,
                ">" => REL_GT,
                "<>" => REL_LT | REL_GT,
                _ => 0,
            };
            if flags != 0 {
                let name = self.str2id(tokens[0]);
                let evr = self.str2id(tokens[2]);
                return self.rel2id(name, evr, flags);
            }
        }
        self.str2id(dep)
    }

    fn dep_to_string(&self, dep: Id) -> String {
        self.id2str(dep)
    }

    fn add_solvable_record(&mut self, repo: RepoId, record: SolvableRecord) -> SolvableId {
        let name = self.str2id(&record.name);
        let evr = self.str2id(&record.evr);
        let arch = self.str2id(&record.arch);
        let vendor = self.str2id(&record.vendor);
        let provides = record
            .provides
            .iter()
            .map(|dep| self.parse_dep(dep))
            .collect();
        let id = SolvableId(self.solvables.len() as u32);
        self.solvables.push(Some(MemSolvable {
            name,
            evr,
            arch,
            vendor,
            repo,
            provides,
            filelist: record.filelist,
            attrs: record.attrs.into_iter().collect(),
            location: record.location,
            checksum: record.checksum,
            dbid: record.dbid,
            size: record.size,
        }));
        self.repo_mut(repo).solvables.push(id);
        id
    }

    fn apply_repo_body(&mut self, repo: RepoId, body: RepoBody, flags: u32) {
        for (key, value) in body.meta_str {
            self.repo_mut(repo).meta_str.insert(key, value);
        }
        for (key, value) in body.meta_id {
            let id = self.str2id(&value);
            self.repo_mut(repo).meta_id.insert(key, id);
        }
        if !body.added_fileprovides.is_empty() {
            let ids: Vec<Id> = body
                .added_fileprovides
                .iter()
                .map(|path| self.str2id(path))
                .collect();
            if let Some(main) = self.repo_first_repodata(repo) {
                self.data_mut(main)
                    .idarrays
                    .insert(REPOSITORY_ADDEDFILEPROVIDES.to_string(), ids);
            }
        }
        {
            let repo_ref = self.repo_mut(repo);
            repo_ref.repomd.extend(body.repomd);
            repo_ref.susetags.extend(body.susetags);
        }
        for delta in body.deltas {
            let delta = self.intern_delta(delta);
            self.repo_mut(repo).deltas.push(delta);
        }
        for record in body.solvables {
            self.add_solvable_record(repo, record);
        }
        for external in body.externals {
            let armed = flags & SOLV_ADD_NO_STUBS == 0;
            self.add_external_record(repo, external, armed);
        }
    }

    fn add_external_record(&mut self, repo: RepoId, record: ExternalRecord, armed: bool) {
        let data = self.new_repodata(repo);
        for (key, values) in record.idarrays {
            let ids: Vec<Id> = values.iter().map(|v| self.str2id(v)).collect();
            self.data_mut(data).idarrays.insert(key, ids);
        }
        let slot = self.data_mut(data);
        slot.str_attrs.extend(record.str_attrs);
        slot.chk_attrs.extend(record.chk_attrs);
        slot.external = true;
        slot.armed = armed;
    }

    fn intern_delta(&mut self, record: DeltaRecord) -> DeltaInfo {
        DeltaInfo {
            name_id: self.str2id(&record.name),
            evr_id: self.str2id(&record.evr),
            arch_id: self.str2id(&record.arch),
            base_evr_id: self.str2id(&record.base_evr),
            seq: record.seq,
            location: record.location,
            checksum: record.checksum,
        }
    }

    fn delta_record(&self, delta: &DeltaInfo) -> DeltaRecord {
        DeltaRecord {
            name: self.str_of(delta.name_id).to_string(),
            evr: self.str_of(delta.evr_id).to_string(),
            arch: self.str_of(delta.arch_id).to_string(),
            base_evr: self.str_of(delta.base_evr_id).to_string(),
            seq: delta.seq.clone(),
            location: delta.location.clone(),
            checksum: delta.checksum.clone(),
        }
    }

    fn apply_extension_body(&mut self, repo: RepoId, body: ExtensionBody) {
        for delta in body.deltas {
            let delta = self.intern_delta(delta);
            self.repo_mut(repo).deltas.push(delta);
        }
        for (name, entry) in body.entries {
            let name_id = match self.find_str_id(&name) {
                Some(id) => id,
                None => continue,
            };
            let target = self
                .repo(repo)
                .solvables
                .iter()
                .copied()
                .find(|&s| self.live(s).map(|s| s.name) == Some(name_id));
            let Some(target) = target else { continue };
            let solvable = self.solvables[target.0 as usize]
                .as_mut()
                .expect("live solvable");
            match entry {
                ExtLine::File(path) => {
                    if !solvable.filelist.contains(&path) {
                        solvable.filelist.push(path);
                    }
                }
                ExtLine::Attr(key, value) => {
                    solvable.attrs.insert(key, value);
                }
            }
        }
    }

    fn repo_body(&self, repo: RepoId) -> RepoBody {
        let repo_ref = self.repo(repo);
        let mut body = RepoBody {
            meta_str: repo_ref
                .meta_str
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            meta_id: repo_ref
                .meta_id
                .iter()
                .map(|(k, &v)| (k.clone(), self.str_of(v).to_string()))
                .collect(),
            added_fileprovides: Vec::new(),
            repomd: repo_ref.repomd.clone(),
            susetags: repo_ref.susetags.clone(),
            deltas: repo_ref.deltas.iter().map(|d| self.delta_record(d)).collect(),
            solvables: Vec::new(),
            externals: Vec::new(),
        };
        body.meta_str.sort();
        body.meta_id.sort();
        if let Some(main) = repo_ref.repodatas.first() {
            if let Some(ids) = self.data(*main).idarrays.get(REPOSITORY_ADDEDFILEPROVIDES) {
                body.added_fileprovides =
                    ids.iter().map(|&id| self.str_of(id).to_string()).collect();
            }
        }
        for &sid in &repo_ref.solvables {
            let Some(s) = self.live(sid) else { continue };
            let mut attrs: Vec<(String, String)> = s
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            attrs.sort();
            body.solvables.push(SolvableRecord {
                name: self.str_of(s.name).to_string(),
                evr: self.str_of(s.evr).to_string(),
                arch: self.str_of(s.arch).to_string(),
                vendor: self.str_of(s.vendor).to_string(),
                location: s.location.clone(),
                checksum: s.checksum.clone(),
                dbid: s.dbid,
                size: s.size,
                provides: s.provides.iter().map(|&p| self.dep_to_string(p)).collect(),
                filelist: s.filelist.clone(),
                attrs,
            });
        }
        for &did in &repo_ref.repodatas {
            let data = self.data(did);
            if !data.external {
                continue;
            }
            let mut str_attrs: Vec<(String, String)> = data
                .str_attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            str_attrs.sort();
            let mut chk_attrs: Vec<(String, Checksum)> = data
                .chk_attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            chk_attrs.sort_by(|a, b| a.0.cmp(&b.0));
            let mut idarrays: Vec<(String, Vec<String>)> = data
                .idarrays
                .iter()
                .map(|(k, ids)| {
                    (
                        k.clone(),
                        ids.iter().map(|&id| self.str_of(id).to_string()).collect(),
                    )
                })
                .collect();
            idarrays.sort_by(|a, b| a.0.cmp(&b.0));
            body.externals.push(ExternalRecord {
                str_attrs,
                chk_attrs,
                idarrays,
            });
        }
        body
    }

    fn dep_matches_solvable(&self, s: &MemSolvable, dep: Id) -> bool {
        if let Some((name, evr, flags)) = self.rel_parts(dep) {
            if flags == REL_ARCH {
                return self.name_part_matches(s, name) && s.arch == evr;
            }
            let wanted = self.str_of(evr);
            if self.name_part_matches(s, name)
                && evr::satisfies(self.str_of(s.evr), wanted, flags)
            {
                return true;
            }
            for &p in &s.provides {
                if let Some((pn, pe, pf)) = self.rel_parts(p) {
                    if pn == name
                        && pf & REL_EQ != 0
                        && evr::satisfies(self.str_of(pe), wanted, flags)
                    {
                        return true;
                    }
                }
            }
            false
        } else {
            s.name == dep
                || s.provides.iter().any(|&p| {
                    p == dep || self.rel_parts(p).is_some_and(|(pn, _, _)| pn == dep)
                })
        }
    }

    // Matches the name side of a relation, which may itself be an arch
    // relation after limitjobs stacking.
    fn name_part_matches(&self, s: &MemSolvable, name: Id) -> bool {
        if let Some((inner, evr, flags)) = self.rel_parts(name) {
            if flags == REL_ARCH {
                return self.name_part_matches(s, inner) && s.arch == evr;
            }
            return self.name_part_matches(s, inner)
                && evr::satisfies(self.str_of(s.evr), self.str_of(evr), flags);
        }
        s.name == name
    }

    fn live_ids(&self) -> Vec<SolvableId> {
        (0..self.solvables.len() as u32)
            .map(SolvableId)
            .filter(|&id| self.live(id).is_some())
            .collect()
    }

    fn trigger_stubs(&mut self, repo: Option<RepoId>, key: &str) {
        let mut pending = Vec::new();
        for (index, slot) in self.repodatas.iter().enumerate() {
            let Some(data) = slot else { continue };
            if !data.external || !data.armed || data.loaded {
                continue;
            }
            if repo.is_some_and(|r| r != data.repo) {
                continue;
            }
            let declared = data
                .idarrays
                .get(REPOSITORY_KEYS)
                .is_some_and(|ids| ids.iter().any(|&id| self.str_of(id) == key));
            if declared {
                pending.push(RepodataId(index as u32));
            }
        }
        for data in pending {
            // mark before invoking so the callback is never re-entered for
            // the same repodata
            self.data_mut(data).loaded = true;
            if let Some(mut cb) = self.callback.take() {
                let _ = cb(self, data);
                if self.callback.is_none() {
                    self.callback = Some(cb);
                }
            }
        }
    }

    fn pick_newest(&self, candidates: &[SolvableId]) -> Option<SolvableId> {
        candidates
            .iter()
            .copied()
            .filter(|&id| self.live(id).is_some())
            .max_by(|&a, &b| {
                let sa = self.live(a).expect("live solvable");
                let sb = self.live(b).expect("live solvable");
                evr::compare(self.str_of(sa.evr), self.str_of(sb.evr))
                    .then_with(|| b.0.cmp(&a.0))
            })
    }
}

impl Pool for MemPool {
    fn set_arch(&mut self, arch: &str) {
        self.known_archs.insert(arch.to_string());
        self.known_archs.insert("noarch".to_string());
        // compatible lesser architectures, the way the native pool arranges
        // an arch policy chain
        if arch == "x86_64" {
            for compat in ["i686", "i586", "i486", "i386"] {
                self.known_archs.insert(compat.to_string());
            }
        }
    }

    fn str2id(&mut self, s: &str) -> Id {
        if let Some(&id) = self.string_ids.get(s) {
            return id;
        }
        let id = self.strings.len() as Id;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), id);
        id
    }

    fn find_str_id(&self, s: &str) -> Option<Id> {
        self.string_ids.get(s).copied().filter(|&id| id != 0)
    }

    fn id2str(&self, id: Id) -> String {
        if let Some((name, evr, flags)) = self.rel_parts(id) {
            if flags == REL_ARCH {
                return format!("{}.{}", self.id2str(name), self.str_of(evr));
            }
            let op = match (flags & REL_LT != 0, flags & REL_EQ != 0, flags & REL_GT != 0) {
                (true, true, false) => "<=",
                (true, false, false) => "<",
                (false, true, false) => "=",
                (false, true, true) => ">=",
                (false, false, true) => ">",
                (true, false, true) => "<>",
                _ => "?",
            };
            return format!("{} {} {}", self.id2str(name), op, self.str_of(evr));
        }
        if id >= SET_BASE {
            return format!("<set {}>", id - SET_BASE);
        }
        self.str_of(id).to_string()
    }

    fn rel2id(&mut self, name: Id, evr: Id, flags: u32) -> Id {
        if let Some(pos) = self
            .rels
            .iter()
            .position(|&(n, e, f)| n == name && e == evr && f == flags)
        {
            return REL_BASE + pos as Id;
        }
        self.rels.push((name, evr, flags));
        REL_BASE + (self.rels.len() - 1) as Id
    }

    fn is_known_arch(&self, arch: Id) -> bool {
        self.known_archs.contains(self.str_of(arch))
    }

    fn add_repo(&mut self, name: &str) -> RepoId {
        let id = RepoId(self.repos.len() as u32);
        self.repos.push(Some(MemRepo {
            name: name.to_string(),
            ..Default::default()
        }));
        self.new_repodata(id);
        id
    }

    fn free_repo(&mut self, repo: RepoId, _reuse_ids: bool) {
        let taken = self.repos[repo.0 as usize].take().expect("stale repo");
        for sid in taken.solvables {
            self.solvables[sid.0 as usize] = None;
        }
        for did in taken.repodatas {
            self.repodatas[did.0 as usize] = None;
        }
        if self.installed == Some(repo) {
            self.installed = None;
        }
    }

    fn repo_name(&self, repo: RepoId) -> String {
        self.repo(repo).name.clone()
    }

    fn set_repo_priority(&mut self, repo: RepoId, priority: i32) {
        self.repo_mut(repo).priority = priority;
    }

    fn set_installed(&mut self, repo: Option<RepoId>) {
        self.installed = repo;
    }

    fn installed(&self) -> Option<RepoId> {
        self.installed
    }

    fn repo_solvables(&self, repo: RepoId) -> Vec<SolvableId> {
        self.repo(repo)
            .solvables
            .iter()
            .copied()
            .filter(|&id| self.live(id).is_some())
            .collect()
    }

    fn repo_is_contiguous(&self, _repo: RepoId) -> bool {
        true
    }

    fn repo_empty(&mut self, repo: RepoId, _reuse_ids: bool) {
        let solvables = std::mem::take(&mut self.repo_mut(repo).solvables);
        for sid in solvables {
            self.solvables[sid.0 as usize] = None;
        }
        let repodatas = std::mem::take(&mut self.repo_mut(repo).repodatas);
        for did in repodatas {
            self.repodatas[did.0 as usize] = None;
        }
        let repo_ref = self.repo_mut(repo);
        repo_ref.meta_str.clear();
        repo_ref.meta_id.clear();
        repo_ref.repomd.clear();
        repo_ref.susetags.clear();
        repo_ref.deltas.clear();
        self.new_repodata(repo);
    }

    fn repo_internalize(&mut self, _repo: RepoId) {}

    fn repo_add_solv(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError> {
        if flags & REPO_EXTEND_SOLVABLES != 0 {
            let body = format::read_extension_body(reader)?;
            self.apply_extension_body(repo, body);
        } else {
            let body = format::read_repo_body(reader)?;
            self.apply_repo_body(repo, body, flags);
        }
        Ok(())
    }

    fn repo_write(&self, repo: RepoId, writer: &mut dyn Write) -> Result<(), PoolError> {
        format::write_repo_body(writer, &self.repo_body(repo))
    }

    fn repo_write_first_repodata(
        &self,
        repo: RepoId,
        writer: &mut dyn Write,
    ) -> Result<(), PoolError> {
        // the in-memory layout keeps everything in one area, so the
        // first-repodata write serializes the same body
        self.repo_write(repo, writer)
    }

    fn repo_add_rpmdb(&mut self, repo: RepoId, dbpath: &Path) -> Result<(), PoolError> {
        let mut file = std::fs::File::open(dbpath)?;
        let body = format::read_repo_body(&mut file)?;
        self.apply_repo_body(repo, body, 0);
        Ok(())
    }

    fn repo_add_products(&mut self, repo: RepoId, dir: &Path, flags: u32) -> Result<(), PoolError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();
        for path in paths {
            let mut file = std::fs::File::open(&path)?;
            if let Ok(body) = format::read_repo_body(&mut file) {
                self.apply_repo_body(repo, body, flags);
            }
        }
        Ok(())
    }

    fn repo_add_repomdxml(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError> {
        let body = format::read_repo_body(reader)?;
        self.apply_repo_body(repo, body, flags);
        Ok(())
    }

    fn repo_add_rpmmd(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        _language: Option<&str>,
        flags: u32,
    ) -> Result<(), PoolError> {
        if flags & REPO_EXTEND_SOLVABLES != 0 {
            let body = format::read_extension_body(reader)?;
            self.apply_extension_body(repo, body);
        } else {
            let body = format::read_repo_body(reader)?;
            self.apply_repo_body(repo, body, flags);
        }
        Ok(())
    }

    fn repo_add_updateinfoxml(
        &mut self,
        _repo: RepoId,
        reader: &mut dyn Read,
        _flags: u32,
    ) -> Result<(), PoolError> {
        // advisories are not modeled; drain the stream to honor the contract
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink)?;
        Ok(())
    }

    fn repo_add_deltainfoxml(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        _flags: u32,
    ) -> Result<(), PoolError> {
        let body = format::read_extension_body(reader)?;
        self.apply_extension_body(repo, body);
        Ok(())
    }

    fn repo_add_content(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        flags: u32,
    ) -> Result<(), PoolError> {
        let body = format::read_repo_body(reader)?;
        self.apply_repo_body(repo, body, flags);
        Ok(())
    }

    fn repo_add_susetags(
        &mut self,
        repo: RepoId,
        reader: &mut dyn Read,
        _defvendor: Id,
        _language: Option<&str>,
        flags: u32,
    ) -> Result<(), PoolError> {
        if flags & REPO_EXTEND_SOLVABLES != 0 {
            let body = format::read_extension_body(reader)?;
            self.apply_extension_body(repo, body);
        } else {
            let body = format::read_repo_body(reader)?;
            self.apply_repo_body(repo, body, flags);
        }
        Ok(())
    }

    fn repo_add_rpm(
        &mut self,
        repo: RepoId,
        path: &Path,
        _flags: u32,
    ) -> Result<SolvableId, PoolError> {
        let mut file = std::fs::File::open(path)?;
        let body = format::read_repo_body(&mut file)?;
        let mut record = body.solvables.into_iter().next().ok_or(PoolError::Parse {
            format: "rpm",
            reason: "no package header found".to_string(),
        })?;
        if record.location.is_none() {
            record.location = Some(path.display().to_string());
        }
        Ok(self.add_solvable_record(repo, record))
    }

    fn repo_lookup_meta_str(&self, repo: RepoId, key: &str) -> Option<String> {
        self.repo(repo).meta_str.get(key).cloned()
    }

    fn repo_lookup_meta_id(&self, repo: RepoId, key: &str) -> Option<Id> {
        let repo_ref = self.repo(repo);
        repo_ref.meta_id.get(key).copied().or_else(|| {
            repo_ref
                .meta_str
                .get(key)
                .and_then(|value| self.find_str_id(value))
        })
    }

    fn repo_repomd_entries(&self, repo: RepoId) -> Vec<RepomdEntry> {
        self.repo(repo).repomd.clone()
    }

    fn repo_susetags_entries(&self, repo: RepoId) -> Vec<SusetagsEntry> {
        self.repo(repo).susetags.clone()
    }

    fn repo_deltas(&mut self, repo: RepoId) -> Vec<DeltaInfo> {
        self.trigger_stubs(Some(repo), REPOSITORY_DELTAINFO);
        self.repo(repo).deltas.clone()
    }

    fn repo_add_repodata(&mut self, repo: RepoId) -> RepodataId {
        self.new_repodata(repo)
    }

    fn repo_first_repodata(&self, repo: RepoId) -> Option<RepodataId> {
        self.repo(repo).repodatas.first().copied()
    }

    fn repodata_repo(&self, data: RepodataId) -> RepoId {
        self.data(data).repo
    }

    fn repodata_set_str(&mut self, data: RepodataId, key: &str, value: &str) {
        self.data_mut(data)
            .str_attrs
            .insert(key.to_string(), value.to_string());
    }

    fn repodata_set_checksum(&mut self, data: RepodataId, key: &str, value: &Checksum) {
        self.data_mut(data)
            .chk_attrs
            .insert(key.to_string(), value.clone());
    }

    fn repodata_add_idarray(&mut self, data: RepodataId, key: &str, value: Id) {
        self.data_mut(data)
            .idarrays
            .entry(key.to_string())
            .or_default()
            .push(value);
    }

    fn repodata_set_idarray(&mut self, data: RepodataId, key: &str, values: &[Id]) {
        self.data_mut(data)
            .idarrays
            .insert(key.to_string(), values.to_vec());
    }

    fn repodata_lookup_str(&self, data: RepodataId, key: &str) -> Option<String> {
        self.data(data).str_attrs.get(key).cloned()
    }

    fn repodata_lookup_checksum(&self, data: RepodataId, key: &str) -> Option<Checksum> {
        self.data(data).chk_attrs.get(key).cloned()
    }

    fn repodata_lookup_idarray(&self, data: RepodataId, key: &str) -> Vec<Id> {
        self.data(data).idarrays.get(key).cloned().unwrap_or_default()
    }

    fn repodata_mark_external(&mut self, data: RepodataId) {
        self.data_mut(data).external = true;
    }

    fn repo_create_stubs(&mut self, repo: RepoId) {
        let datas = self.repo(repo).repodatas.clone();
        for did in datas {
            let data = self.data_mut(did);
            if data.external && !data.loaded {
                data.armed = true;
            }
        }
    }

    fn repodata_internalize(&mut self, _data: RepodataId) {}

    fn repodata_write(&self, data: RepodataId, writer: &mut dyn Write) -> Result<(), PoolError> {
        let slot = self.data(data);
        let repo = slot.repo;
        let keys: Vec<String> = slot
            .idarrays
            .get(REPOSITORY_KEYS)
            .map(|ids| ids.iter().map(|&id| self.str_of(id).to_string()).collect())
            .unwrap_or_default();
        let mut body = ExtensionBody::default();
        for key in &keys {
            if key.starts_with("repokey:type:") {
                continue;
            }
            if key == REPOSITORY_DELTAINFO {
                body.deltas = self
                    .repo(repo)
                    .deltas
                    .iter()
                    .map(|d| self.delta_record(d))
                    .collect();
            } else if key == SOLVABLE_FILELIST {
                for &sid in &self.repo(repo).solvables {
                    let Some(s) = self.live(sid) else { continue };
                    let name = self.str_of(s.name).to_string();
                    for path in &s.filelist {
                        body.entries
                            .push((name.clone(), ExtLine::File(path.clone())));
                    }
                }
            } else {
                for &sid in &self.repo(repo).solvables {
                    let Some(s) = self.live(sid) else { continue };
                    if let Some(value) = s.attrs.get(key) {
                        body.entries.push((
                            self.str_of(s.name).to_string(),
                            ExtLine::Attr(key.clone(), value.clone()),
                        ));
                    }
                }
            }
        }
        format::write_extension_body(writer, &body)
    }

    fn repodata_extend_to_repo(&mut self, _data: RepodataId) {}

    fn repodata_add_solv(
        &mut self,
        data: RepodataId,
        reader: &mut dyn Read,
        _flags: u32,
    ) -> Result<(), PoolError> {
        let repo = self.data(data).repo;
        let body = format::read_extension_body(reader)?;
        self.apply_extension_body(repo, body);
        self.data_mut(data).loaded = true;
        Ok(())
    }

    fn solvables(&self) -> Vec<SolvableId> {
        self.live_ids()
    }

    fn solvable(&self, id: SolvableId) -> SolvableInfo {
        let s = self.live(id).expect("stale solvable handle");
        let arch = self.str_of(s.arch).to_string();
        let installed = self.installed == Some(s.repo);
        let installable = arch != "src" && arch != "nosrc" && self.known_archs.contains(&arch);
        SolvableInfo {
            id,
            name_id: s.name,
            evr_id: s.evr,
            arch_id: s.arch,
            name: self.str_of(s.name).to_string(),
            evr: self.str_of(s.evr).to_string(),
            arch,
            repo: s.repo,
            installed,
            installable: installable || installed,
        }
    }

    fn solvable_str(&self, id: SolvableId) -> String {
        self.solvable(id).nevra()
    }

    fn lookup_str(&mut self, id: SolvableId, key: &str) -> Option<String> {
        let repo = self.live(id)?.repo;
        self.trigger_stubs(Some(repo), key);
        self.live(id)?.attrs.get(key).cloned()
    }

    fn lookup_num(&self, id: SolvableId, key: &str) -> Option<u64> {
        let s = self.live(id)?;
        match key {
            crate::keys::RPM_RPMDBID => s.dbid,
            crate::keys::SOLVABLE_DOWNLOADSIZE => s.size,
            _ => s.attrs.get(key).and_then(|v| v.parse().ok()),
        }
    }

    fn lookup_checksum(&self, id: SolvableId, _key: &str) -> Option<Checksum> {
        self.live(id)?.checksum.clone()
    }

    fn lookup_location(&self, id: SolvableId) -> Option<String> {
        self.live(id)?.location.clone()
    }

    fn providers(&self, dep: Id) -> Vec<SolvableId> {
        self.live_ids()
            .into_iter()
            .filter(|&id| {
                let s = self.live(id).expect("live solvable");
                self.dep_matches_solvable(s, dep)
            })
            .collect()
    }

    fn all_providing_ids(&self) -> Vec<Id> {
        let mut ids = BTreeSet::new();
        for id in self.live_ids() {
            let s = self.live(id).expect("live solvable");
            ids.insert(s.name);
            for &p in &s.provides {
                match self.rel_parts(p) {
                    Some((name, _, _)) => ids.insert(name),
                    None => ids.insert(p),
                };
            }
        }
        ids.into_iter().collect()
    }

    fn to_whatprovides(&mut self, ids: &[SolvableId]) -> Id {
        let mut set: Vec<SolvableId> = ids.to_vec();
        set.sort();
        set.dedup();
        if let Some(pos) = self.sets.iter().position(|existing| *existing == set) {
            return SET_BASE + pos as Id;
        }
        self.sets.push(set);
        SET_BASE + (self.sets.len() - 1) as Id
    }

    fn job_solvables(&self, job: &Job) -> Vec<SolvableId> {
        match job.select() {
            SOLVER_SOLVABLE => self
                .live(SolvableId(job.what))
                .map(|_| vec![SolvableId(job.what)])
                .unwrap_or_default(),
            SOLVER_SOLVABLE_NAME => self
                .live_ids()
                .into_iter()
                .filter(|&id| {
                    let s = self.live(id).expect("live solvable");
                    self.name_part_matches(s, job.what)
                })
                .collect(),
            SOLVER_SOLVABLE_PROVIDES => self.providers(job.what),
            SOLVER_SOLVABLE_ONE_OF => self
                .sets
                .get((job.what - SET_BASE) as usize)
                .map(|set| {
                    set.iter()
                        .copied()
                        .filter(|&id| self.live(id).is_some())
                        .collect()
                })
                .unwrap_or_default(),
            SOLVER_SOLVABLE_ALL => self.live_ids(),
            _ => Vec::new(),
        }
    }

    fn search(
        &mut self,
        repo: Option<RepoId>,
        key: &str,
        needle: &str,
        flags: u32,
    ) -> Vec<SearchMatch> {
        if key == SOLVABLE_FILELIST {
            if flags & SEARCH_COMPLETE_FILELIST != 0 {
                self.trigger_stubs(repo, key);
            }
        } else if key != SOLVABLE_NAME {
            self.trigger_stubs(repo, key);
        }
        let nocase = flags & SEARCH_NOCASE != 0;
        let mode = flags & SEARCH_STRINGMASK;
        let pattern = (mode == SEARCH_GLOB)
            .then(|| glob::Pattern::new(needle).ok())
            .flatten();
        let glob_options = glob::MatchOptions {
            case_sensitive: !nocase,
            ..Default::default()
        };
        let matches_value = |value: &str| -> bool {
            match mode {
                SEARCH_STRING => {
                    if nocase {
                        value.eq_ignore_ascii_case(needle)
                    } else {
                        value == needle
                    }
                }
                SEARCH_SUBSTRING => {
                    if nocase {
                        value.to_lowercase().contains(&needle.to_lowercase())
                    } else {
                        value.contains(needle)
                    }
                }
                SEARCH_GLOB => pattern
                    .as_ref()
                    .is_some_and(|p| p.matches_with(value, glob_options)),
                _ => false,
            }
        };
        let candidates = match repo {
            Some(repo) => self.repo_solvables(repo),
            None => self.live_ids(),
        };
        let mut out = Vec::new();
        for id in candidates {
            let s = self.live(id).expect("live solvable");
            if key == SOLVABLE_NAME {
                let name = self.str_of(s.name);
                if matches_value(name) {
                    out.push(SearchMatch {
                        solvable: id,
                        value: name.to_string(),
                    });
                }
            } else if key == SOLVABLE_FILELIST {
                // one hit per solvable is enough for the callers
                if let Some(path) = s.filelist.iter().find(|p| matches_value(p)) {
                    out.push(SearchMatch {
                        solvable: id,
                        value: path.clone(),
                    });
                }
            } else if let Some(value) = s.attrs.get(key) {
                if matches_value(value) {
                    out.push(SearchMatch {
                        solvable: id,
                        value: value.clone(),
                    });
                }
            }
        }
        out
    }

    fn add_file_provides(&mut self) -> Vec<Id> {
        for index in 0..self.solvables.len() {
            let Some(filelist) = self.solvables[index].as_ref().map(|s| s.filelist.clone())
            else {
                continue;
            };
            for path in filelist {
                let id = self.str2id(&path);
                let s = self.solvables[index].as_mut().expect("live solvable");
                if !s.provides.contains(&id) {
                    s.provides.push(id);
                }
                self.file_provides.insert(id);
            }
        }
        self.file_provides.iter().copied().collect()
    }

    fn create_whatprovides(&mut self) {
        // provider lookup is computed on demand; nothing to rebuild
    }

    fn set_load_callback(&mut self, callback: Option<LoadCallback>) {
        self.callback = callback;
    }

    fn create_solver(&mut self) -> Box<dyn Solver + '_> {
        Box::new(solver::MemSolver::new(self))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flags::{
        REL_EQ, SEARCH_FILES, SOLVER_INSTALL, SOLVER_SOLVABLE_NAME, SOLVER_UPDATE,
    };
    use crate::StepKind;

    const PRIMARY: &str = "memsolv 1
s\tfoo\t1.0-1\tx86_64\tacme
p\twebserver = 1.0
f\t/usr/bin/foo
a\tsolvable:summary\tthe foo tool
s\tbar\t2.0-1\tx86_64\tacme
";

    fn pool_with_repo(body: &str) -> (MemPool, RepoId) {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("test");
        pool.repo_add_solv(repo, &mut body.as_bytes(), 0).unwrap();
        (pool, repo)
    }

    #[test]
    fn test_round_trip_preserves_triples() {
        let (pool, repo) = pool_with_repo(PRIMARY);
        let mut buffer = Vec::new();
        pool.repo_write(repo, &mut buffer).unwrap();

        let mut reloaded = MemPool::new();
        reloaded.set_arch("x86_64");
        let other = reloaded.add_repo("test");
        reloaded
            .repo_add_solv(other, &mut buffer.as_slice(), 0)
            .unwrap();

        let triples = |pool: &MemPool, repo: RepoId| -> Vec<String> {
            let mut out: Vec<String> = pool
                .repo_solvables(repo)
                .into_iter()
                .map(|id| pool.solvable_str(id))
                .collect();
            out.sort();
            out
        };
        assert_eq!(triples(&pool, repo), triples(&reloaded, other));
    }

    #[test]
    fn test_providers_by_name_and_capability() {
        let (mut pool, _) = pool_with_repo(PRIMARY);
        let foo = pool.str2id("foo");
        assert_eq!(pool.providers(foo).len(), 1);

        let webserver = pool.str2id("webserver");
        assert_eq!(pool.providers(webserver).len(), 1);

        let evr = pool.str2id("2.0");
        let rel = pool.rel2id(webserver, evr, REL_EQ);
        assert!(pool.providers(rel).is_empty());
    }

    #[test]
    fn test_job_solvables_name_selector() {
        let (mut pool, _) = pool_with_repo(PRIMARY);
        let bar = pool.str2id("bar");
        let job = Job::new(SOLVER_SOLVABLE_NAME, bar);
        let selected = pool.job_solvables(&job);
        assert_eq!(selected.len(), 1);
        assert_eq!(pool.solvable_str(selected[0]), "bar-2.0-1.x86_64");
    }

    #[test]
    fn test_filelist_search_triggers_stub_load() {
        let (mut pool, repo) = pool_with_repo(PRIMARY);
        let data = pool.repo_add_repodata(repo);
        let filelist_key = pool.str2id(SOLVABLE_FILELIST);
        pool.repodata_add_idarray(data, REPOSITORY_KEYS, filelist_key);
        pool.repodata_mark_external(data);
        pool.repo_create_stubs(repo);

        let loads = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let counter = loads.clone();
        pool.set_load_callback(Some(Box::new(move |pool, data| {
            counter.set(counter.get() + 1);
            let body = "memsolvx 1\nx\tbar\tf\t/usr/bin/bar\n";
            pool.repodata_add_solv(data, &mut body.as_bytes(), 0).unwrap();
            true
        })));

        let flags = SEARCH_STRING | SEARCH_FILES | SEARCH_COMPLETE_FILELIST;
        let matches = pool.search(None, SOLVABLE_FILELIST, "/usr/bin/bar", flags);
        assert_eq!(matches.len(), 1);
        assert_eq!(loads.get(), 1);

        // a second query must not re-enter the callback
        let matches = pool.search(None, SOLVABLE_FILELIST, "/usr/bin/bar", flags);
        assert_eq!(matches.len(), 1);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_install_and_update_transactions() {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let system = pool.add_repo("@System");
        let body = "memsolv 1\ns\tfoo\t1.0-1\tx86_64\tacme\tdbid=7\n";
        pool.repo_add_solv(system, &mut body.as_bytes(), 0).unwrap();
        pool.set_installed(Some(system));

        let repo = pool.add_repo("download");
        let body = "memsolv 1\ns\tfoo\t2.0-1\tx86_64\tacme\ns\tbaz\t1.0-1\tx86_64\tacme\n";
        pool.repo_add_solv(repo, &mut body.as_bytes(), 0).unwrap();

        let baz = pool.str2id("baz");
        let jobs = vec![Job::new(SOLVER_SOLVABLE_NAME | SOLVER_INSTALL, baz)];
        let mut solver = pool.create_solver();
        assert!(solver.solve(&jobs).is_empty());
        let transaction = solver.transaction();
        drop(solver);
        assert_eq!(transaction.steps.len(), 1);
        assert_eq!(transaction.steps[0].kind, StepKind::Install);

        let jobs = vec![Job::new(SOLVER_SOLVABLE_ALL | SOLVER_UPDATE, 0)];
        let mut solver = pool.create_solver();
        assert!(solver.solve(&jobs).is_empty());
        let transaction = solver.transaction();
        drop(solver);
        assert_eq!(transaction.steps.len(), 1);
        assert_eq!(transaction.steps[0].kind, StepKind::Upgraded);
        assert!(transaction.steps[0].other.is_some());
    }

    #[test]
    fn test_conflicting_installs_report_same_name_problem() {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("download");
        let body = "memsolv 1\ns\tfoo\t1.0-1\tx86_64\tacme\ns\tfoo\t2.0-1\tx86_64\tacme\n";
        pool.repo_add_solv(repo, &mut body.as_bytes(), 0).unwrap();

        let solvables = pool.repo_solvables(repo);
        let jobs = vec![
            Job::new(crate::flags::SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[0].0),
            Job::new(crate::flags::SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[1].0),
        ];
        let mut solver = pool.create_solver();
        let problems = solver.solve(&jobs);
        drop(solver);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].rule.kind, crate::RuleKind::SameName);
        assert_eq!(problems[0].solutions.len(), 2);
    }
}
