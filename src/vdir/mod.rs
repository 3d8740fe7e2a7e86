//! Virtual directory: an in-memory model of a filesystem subtree plus the
//! framed package (pack/unpack) and patch (diff/apply) operations built on
//! top of the codec, differ, and patcher.
//!
//! Grounded in `original_source/src/DirectoryTools.cpp`'s free functions
//! (`CompressDirectory`/`DecompressDirectory`/`DiffDirectory`/`PatchDirectory`),
//! reorganized as methods on a [`VDir`] struct per spec.md's object model.
//! Enumeration order is normative: a [`VDir`]'s files are always kept sorted
//! lexicographically by `relative_path` (spec.md §9 Open Question 1), which
//! makes `hash`-sensitive comparisons and the package wire format stable
//! regardless of filesystem iteration order.

mod entry;
mod fsops;

pub use entry::{PatchFileEntry, PatchOp};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;

use crate::codec;
use crate::differ;
use crate::error::{Error, Result};
use crate::membuf::{Buffer, MemoryRange};
use crate::observer::Observer;
use crate::patcher;
use crate::util::{count_cores, create_file_list};
use crate::workerpool::WorkerPool;

const PACKAGE_MAGIC: &[u8; 16] = b"yatta package\0\0\0";
const PATCH_MAGIC: &[u8; 16] = b"yatta patch\0\0\0\0\0";
const PATCH_HEADER_LEN: usize = 24; // 16-byte magic + 8-byte entry count

/// One file inside a [`VDir`]: a slash-separated path relative to the
/// directory's root, its contents, and (if known) its filesystem mtime.
#[derive(Debug, Clone)]
pub struct VirtualFile {
    /// Forward-slash-separated path relative to the VDir's root. Never
    /// starts with a separator.
    pub relative_path: String,
    /// The file's full contents.
    pub payload: Buffer,
    /// Modification time captured by [`VDir::load_folder`], if any.
    /// `None` for files that only ever existed in-memory (e.g. produced by
    /// [`VDir::unpackage`]).
    pub mtime: Option<SystemTime>,
}

/// An in-memory directory tree: an ordered, path-deduplicated list of
/// [`VirtualFile`]s plus the framed operations spec.md §4.8 defines over it.
///
/// Invariant: `files` is always sorted by `relative_path` and contains no
/// duplicate paths.
#[derive(Debug, Clone, Default)]
pub struct VDir {
    files: Vec<VirtualFile>,
}

/// Outcome of [`VDir::apply_delta`]: how many entries were applied before
/// either exhausting the delta or hitting a failure, and what that failure
/// was (spec.md §7: "reported via the returned aggregate (entries_applied,
/// first failing entry)").
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub entries_applied: usize,
    pub first_failure: Option<(String, Error)>,
}

impl ApplyReport {
    /// `true` if every entry in the delta applied without error.
    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }
}

impl VDir {
    /// An empty virtual directory.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Build a `VDir` directly from an already-sorted, already-deduplicated
    /// file list. Used by tests and by [`unpackage`](VDir::unpackage).
    fn from_sorted_unique(mut files: Vec<VirtualFile>) -> Self {
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Self { files }
    }

    /// The files in this directory, in lexicographic `relative_path` order.
    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a file by its relative path.
    pub fn find(&self, relative_path: &str) -> Option<&VirtualFile> {
        self.files
            .binary_search_by(|f| f.relative_path.as_str().cmp(relative_path))
            .ok()
            .map(|i| &self.files[i])
    }

    fn find_index(&self, relative_path: &str) -> std::result::Result<usize, usize> {
        self.files
            .binary_search_by(|f| f.relative_path.as_str().cmp(relative_path))
    }

    /// Insert or overwrite a file, keeping `files` sorted.
    fn upsert(&mut self, file: VirtualFile) {
        match self.find_index(&file.relative_path) {
            Ok(i) => self.files[i] = file,
            Err(i) => self.files.insert(i, file),
        }
    }

    fn remove(&mut self, relative_path: &str) -> Option<VirtualFile> {
        match self.find_index(relative_path) {
            Ok(i) => Some(self.files.remove(i)),
            Err(_) => None,
        }
    }

    /// Walk the filesystem rooted at `root_path` and load every regular file
    /// not matched by `exclusions` into memory.
    ///
    /// Exclusion match rule (spec.md §4.8): case-sensitive exact equality of
    /// the relative path, OR extension equality when an exclusion starts
    /// with `.`.
    pub fn load_folder(
        root_path: &Path,
        exclusions: &[&str],
        observer: Option<&dyn Observer>,
    ) -> Result<Self> {
        let absolute_paths = create_file_list(&[root_path]).map_err(|source| Error::Io {
            path: root_path.to_path_buf(),
            source,
        })?;

        let mut files = Vec::with_capacity(absolute_paths.len());
        let total = absolute_paths.len() as u64;
        for (i, path) in absolute_paths.into_iter().enumerate() {
            let relative_path = relative_slash_path(root_path, &path);
            if is_excluded(&relative_path, exclusions) {
                continue;
            }

            let data = fsops::read_file(&path)?;
            let mtime = std::fs::metadata(&path).ok().and_then(|m| m.modified().ok());
            if let Some(obs) = observer {
                obs.log(&format!("loading file \"{relative_path}\""));
                obs.on_progress(i as u64 + 1, total);
            }
            files.push(VirtualFile {
                relative_path,
                payload: Buffer::from_vec(data),
                mtime,
            });
        }

        Ok(Self::from_sorted_unique(files))
    }

    /// Write every file in this `VDir` to disk under `root_path`, creating
    /// parent directories as needed and restoring each file's captured
    /// mtime (if any).
    pub fn store_folder(&self, root_path: &Path) -> Result<()> {
        for file in &self.files {
            let path = root_path.join(&file.relative_path);
            fsops::ensure_parent(&path)?;
            fsops::write_file(&path, file.payload.as_slice())?;
            if let Some(mtime) = file.mtime {
                let _ = filetime::set_file_mtime(&path, FileTime::from_system_time(mtime));
            }
        }
        Ok(())
    }

    /// Pack every file into a single framed `"yatta package"` artifact.
    ///
    /// `folder_name` is recorded verbatim in the header; an empty string is
    /// accepted as-is (spec.md leaves the fallback to "last path component
    /// of the source directory" to the caller — `load_folder` doesn't know
    /// what name the caller intends to package under).
    pub fn package(&self, folder_name: &str) -> Result<Buffer> {
        let archive_size: usize = self
            .files
            .iter()
            .map(|f| 8 + f.relative_path.len() + 8 + f.payload.size())
            .sum();

        let mut flat = Vec::with_capacity(archive_size);
        for file in &self.files {
            let path_bytes = file.relative_path.as_bytes();
            flat.extend_from_slice(&(path_bytes.len() as u64).to_ne_bytes());
            flat.extend_from_slice(path_bytes);
            flat.extend_from_slice(&(file.payload.size() as u64).to_ne_bytes());
            flat.extend_from_slice(file.payload.as_slice());
        }

        let compressed = codec::compress(MemoryRange::new(&flat))?;

        let name_bytes = folder_name.as_bytes();
        let mut out = Buffer::with_size(16 + 8 + name_bytes.len() + compressed.size());
        out.write_raw(PACKAGE_MAGIC, 0)?;
        out.write_as::<u64>(name_bytes.len() as u64, 16)?;
        out.write_raw(name_bytes, 24)?;
        out.write_raw(compressed.as_slice(), 24 + name_bytes.len())?;
        out.shrink();
        Ok(out)
    }

    /// Unpack a framed `"yatta package"` artifact produced by [`package`](VDir::package).
    pub fn unpackage(buffer: MemoryRange<'_>) -> Result<Self> {
        if buffer.size() < 24 {
            return Err(Error::Truncated);
        }
        let mut found = [0u8; 16];
        buffer.read_raw(&mut found, 16, 0)?;
        if &found != PACKAGE_MAGIC {
            return Err(Error::BadMagic {
                expected: "yatta package",
                found,
            });
        }

        let name_len: u64 = buffer.read_as(16)?;
        let name_len = name_len as usize;
        if !buffer.is_within(24, name_len) {
            return Err(Error::Truncated);
        }
        // The folder name is recorded in the header but this crate has no
        // caller that round-trips it back out of a `VDir` yet; decoding it
        // here only to validate the header's own length field.
        let _folder_name_bytes = {
            let mut b = vec![0u8; name_len];
            buffer.read_raw(&mut b, name_len, 24)?;
            b
        };

        let payload = buffer.sub_range(24 + name_len, buffer.size() - 24 - name_len)?;
        let flat = codec::decompress(payload)?;

        let range = flat.as_range();
        let mut offset = 0usize;
        let mut files = Vec::new();
        while offset < range.size() {
            let path_len: u64 = range.read_as(offset)?;
            offset += 8;
            let path_len = path_len as usize;
            if !range.is_within(offset, path_len) {
                return Err(Error::Truncated);
            }
            let mut path_bytes = vec![0u8; path_len];
            range.read_raw(&mut path_bytes, path_len, offset)?;
            offset += path_len;
            let relative_path = String::from_utf8(path_bytes).map_err(|_| Error::Truncated)?;

            let payload_len: u64 = range.read_as(offset)?;
            offset += 8;
            let payload_len = payload_len as usize;
            if !range.is_within(offset, payload_len) {
                return Err(Error::Truncated);
            }
            let mut payload_bytes = vec![0u8; payload_len];
            range.read_raw(&mut payload_bytes, payload_len, offset)?;
            offset += payload_len;

            files.push(VirtualFile {
                relative_path,
                payload: Buffer::from_vec(payload_bytes),
                mtime: None,
            });
        }

        Ok(Self::from_sorted_unique(files))
    }

    /// Compute a framed `"yatta patch"` artifact that [`apply_delta`](VDir::apply_delta)
    /// can replay against this `VDir` to reproduce `new`.
    ///
    /// Per-file diffs are dispatched through a [`WorkerPool`] (spec.md §5:
    /// "internally VDir may dispatch per-file diff jobs through the
    /// WorkerPool"); each job only touches its own pair of payload buffers,
    /// so no cross-job synchronization beyond the shared results collection
    /// is needed. Each [`differ::diff`] call itself runs single-threaded
    /// (`max_threads = 1`) to keep the total thread count bounded by one
    /// [`WorkerPool`] worth of parallelism rather than one-pool-per-file.
    pub fn make_delta(&self, new: &VDir, observer: Option<&dyn Observer>) -> Result<Buffer> {
        enum Work<'a> {
            Common(&'a VirtualFile, &'a VirtualFile),
            Added(&'a VirtualFile),
            Removed(&'a VirtualFile),
        }

        let mut work = Vec::new();
        let mut new_iter = new.files.iter().peekable();
        let mut old_iter = self.files.iter().peekable();
        loop {
            match (old_iter.peek(), new_iter.peek()) {
                (Some(o), Some(n)) => match o.relative_path.cmp(&n.relative_path) {
                    std::cmp::Ordering::Equal => {
                        work.push(Work::Common(old_iter.next().unwrap(), new_iter.next().unwrap()));
                    }
                    std::cmp::Ordering::Less => work.push(Work::Removed(old_iter.next().unwrap())),
                    std::cmp::Ordering::Greater => work.push(Work::Added(new_iter.next().unwrap())),
                },
                (Some(_), None) => work.push(Work::Removed(old_iter.next().unwrap())),
                (None, Some(_)) => work.push(Work::Added(new_iter.next().unwrap())),
                (None, None) => break,
            }
        }

        let entries: std::sync::Arc<std::sync::Mutex<Vec<PatchFileEntry>>> =
            std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let total = work.len() as u64;

        {
            let pool = WorkerPool::new(count_cores());
            for (i, item) in work.into_iter().enumerate() {
                let entries = std::sync::Arc::clone(&entries);
                match item {
                    Work::Common(old_file, new_file) => {
                        let old_hash = old_file.payload.hash();
                        let new_hash = new_file.payload.hash();
                        if old_hash == new_hash {
                            continue;
                        }
                        let relative_path = new_file.relative_path.clone();
                        let old_payload = old_file.payload.as_slice().to_vec();
                        let new_payload = new_file.payload.as_slice().to_vec();
                        if let Some(obs) = observer {
                            obs.log(&format!("diffing file \"{relative_path}\""));
                            obs.on_progress(i as u64 + 1, total);
                        }
                        pool.submit(move || {
                            if let Ok(diff_buf) = differ::diff(
                                MemoryRange::new(&old_payload),
                                MemoryRange::new(&new_payload),
                                1,
                            ) {
                                entries.lock().unwrap().push(PatchFileEntry {
                                    relative_path,
                                    op: PatchOp::Updated,
                                    source_hash: old_hash,
                                    target_hash: new_hash,
                                    instruction_bytes: diff_buf.into_vec(),
                                });
                            }
                        });
                    }
                    Work::Added(new_file) => {
                        let relative_path = new_file.relative_path.clone();
                        let new_hash = new_file.payload.hash();
                        let new_payload = new_file.payload.as_slice().to_vec();
                        if let Some(obs) = observer {
                            obs.log(&format!("adding file \"{relative_path}\""));
                            obs.on_progress(i as u64 + 1, total);
                        }
                        pool.submit(move || {
                            // `differ::diff` rejects an empty source paired with an
                            // empty target; a newly added zero-byte file is exactly
                            // that case, so its artifact is synthesized directly
                            // instead of going through `diff`.
                            let diff_result = if new_payload.is_empty() {
                                differ::empty_diff()
                            } else {
                                differ::diff(MemoryRange::new(&[]), MemoryRange::new(&new_payload), 1)
                            };
                            if let Ok(diff_buf) = diff_result {
                                entries.lock().unwrap().push(PatchFileEntry {
                                    relative_path,
                                    op: PatchOp::New,
                                    source_hash: 0,
                                    target_hash: new_hash,
                                    instruction_bytes: diff_buf.into_vec(),
                                });
                            }
                        });
                    }
                    Work::Removed(old_file) => {
                        let relative_path = old_file.relative_path.clone();
                        let old_hash = old_file.payload.hash();
                        if let Some(obs) = observer {
                            obs.log(&format!("removing file \"{relative_path}\""));
                            obs.on_progress(i as u64 + 1, total);
                        }
                        entries.lock().unwrap().push(PatchFileEntry {
                            relative_path,
                            op: PatchOp::Deleted,
                            source_hash: old_hash,
                            target_hash: 0,
                            instruction_bytes: Vec::new(),
                        });
                    }
                }
            }
            pool.prepare_for_shutdown();
            pool.wait_idle();
        }

        let mut entries = std::sync::Arc::try_unwrap(entries)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_else(|arc| arc.lock().unwrap().clone());
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let mut raw = Vec::new();
        for entry in &entries {
            entry.encode(&mut raw);
        }
        // `codec::compress` rejects empty input; a delta with no changed
        // files still needs a placeholder byte. Decoding relies on the
        // header's entry count, not this byte, so it's simply ignored.
        if raw.is_empty() {
            raw.push(0);
        }

        let compressed = codec::compress(MemoryRange::new(&raw))?;

        let mut out = Buffer::with_size(PATCH_HEADER_LEN + compressed.size());
        out.write_raw(PATCH_MAGIC, 0)?;
        out.write_as::<u64>(entries.len() as u64, 16)?;
        out.write_raw(compressed.as_slice(), PATCH_HEADER_LEN)?;
        out.shrink();
        Ok(out)
    }

    /// Apply a framed `"yatta patch"` artifact produced by [`make_delta`](VDir::make_delta),
    /// mutating this `VDir` and the files under `root_path` on disk.
    ///
    /// Entries are applied in three passes — all `U` entries, then all `N`,
    /// then all `D` — per spec.md §4.8. Processing stops at the first
    /// failing entry (spec.md §7: "do not partially mutate the VDir beyond
    /// the entries already successfully applied before the failure"); later
    /// entries in the same or later passes are left unapplied.
    pub fn apply_delta(
        &mut self,
        root_path: &Path,
        buffer: MemoryRange<'_>,
        observer: Option<&dyn Observer>,
    ) -> Result<ApplyReport> {
        if buffer.size() < PATCH_HEADER_LEN {
            return Err(Error::Truncated);
        }
        let mut found = [0u8; 16];
        buffer.read_raw(&mut found, 16, 0)?;
        if &found != PATCH_MAGIC {
            return Err(Error::BadMagic {
                expected: "yatta patch",
                found,
            });
        }

        let entry_count: u64 = buffer.read_as(16)?;

        let payload = buffer.sub_range(PATCH_HEADER_LEN, buffer.size() - PATCH_HEADER_LEN)?;
        let decompressed = codec::decompress(payload)?;
        let range = decompressed.as_range();

        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut offset = 0usize;
        for _ in 0..entry_count {
            let (entry, next) = PatchFileEntry::decode(range, offset)?;
            offset = next;
            entries.push(entry);
        }

        let mut report = ApplyReport::default();

        let updates: Vec<&PatchFileEntry> =
            entries.iter().filter(|e| e.op == PatchOp::Updated).collect();
        let adds: Vec<&PatchFileEntry> = entries.iter().filter(|e| e.op == PatchOp::New).collect();
        let deletes: Vec<&PatchFileEntry> =
            entries.iter().filter(|e| e.op == PatchOp::Deleted).collect();

        for entry in updates.into_iter().chain(adds).chain(deletes) {
            match self.apply_one(root_path, entry, observer) {
                Ok(()) => report.entries_applied += 1,
                Err(e) => {
                    report.first_failure = Some((entry.relative_path.clone(), e));
                    return Ok(report);
                }
            }
        }

        Ok(report)
    }

    fn apply_one(
        &mut self,
        root_path: &Path,
        entry: &PatchFileEntry,
        observer: Option<&dyn Observer>,
    ) -> Result<()> {
        match entry.op {
            PatchOp::Updated => {
                let current_hash = match self.find(&entry.relative_path) {
                    Some(f) => f.payload.hash(),
                    None => return Err(Error::FileMissing(PathBuf::from(&entry.relative_path))),
                };
                if current_hash == entry.target_hash {
                    if let Some(obs) = observer {
                        obs.log(&format!("file \"{}\" already up to date", entry.relative_path));
                    }
                    return Ok(());
                }
                if current_hash != entry.source_hash {
                    return Err(Error::VersionMismatch { found: current_hash });
                }

                let old_payload = self.find(&entry.relative_path).unwrap().payload.as_range();
                let new_payload = patcher::patch(old_payload, MemoryRange::new(&entry.instruction_bytes))?;
                if new_payload.hash() != entry.target_hash {
                    return Err(Error::HashMismatch);
                }

                let path = root_path.join(&entry.relative_path);
                fsops::ensure_parent(&path)?;
                fsops::write_file(&path, new_payload.as_slice())?;
                if let Some(obs) = observer {
                    obs.log(&format!("updated file \"{}\"", entry.relative_path));
                }
                self.upsert(VirtualFile {
                    relative_path: entry.relative_path.clone(),
                    payload: new_payload,
                    mtime: None,
                });
                Ok(())
            }
            PatchOp::New => {
                if let Some(existing) = self.find(&entry.relative_path) {
                    if existing.payload.hash() == entry.target_hash {
                        if let Some(obs) = observer {
                            obs.log(&format!("file \"{}\" already up to date", entry.relative_path));
                        }
                        return Ok(());
                    }
                }

                let new_payload = patcher::patch(
                    MemoryRange::new(&[]),
                    MemoryRange::new(&entry.instruction_bytes),
                )?;
                if new_payload.hash() != entry.target_hash {
                    return Err(Error::HashMismatch);
                }

                let path = root_path.join(&entry.relative_path);
                fsops::ensure_parent(&path)?;
                fsops::write_file(&path, new_payload.as_slice())?;
                if let Some(obs) = observer {
                    obs.log(&format!("adding file \"{}\"", entry.relative_path));
                }
                self.upsert(VirtualFile {
                    relative_path: entry.relative_path.clone(),
                    payload: new_payload,
                    mtime: None,
                });
                Ok(())
            }
            PatchOp::Deleted => {
                let Some(existing) = self.find(&entry.relative_path) else {
                    return Ok(());
                };
                if existing.payload.hash() != entry.source_hash {
                    return Err(Error::VersionMismatch {
                        found: existing.payload.hash(),
                    });
                }
                let path = root_path.join(&entry.relative_path);
                fsops::remove_file(&path)?;
                if let Some(obs) = observer {
                    obs.log(&format!("removing file \"{}\"", entry.relative_path));
                }
                self.remove(&entry.relative_path);
                Ok(())
            }
        }
    }
}

/// Turn an absolute filesystem path into a forward-slash relative path
/// rooted at `root`.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Exclusion match rule (spec.md §4.8): case-sensitive exact path equality,
/// or extension equality when the exclusion pattern starts with `.`.
fn is_excluded(relative_path: &str, exclusions: &[&str]) -> bool {
    exclusions.iter().any(|pattern| {
        if let Some(ext) = pattern.strip_prefix('.') {
            relative_path.ends_with(&format!(".{ext}"))
        } else {
            relative_path == *pattern
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfile(path: &str, data: &[u8]) -> VirtualFile {
        VirtualFile {
            relative_path: path.to_string(),
            payload: Buffer::from_vec(data.to_vec()),
            mtime: None,
        }
    }

    #[test]
    fn files_are_kept_in_lexicographic_order() {
        let vdir = VDir::from_sorted_unique(vec![
            vfile("z.txt", b"z"),
            vfile("a.txt", b"a"),
            vfile("m/b.txt", b"b"),
        ]);
        let paths: Vec<&str> = vdir.files().iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "m/b.txt", "z.txt"]);
    }

    #[test]
    fn is_excluded_matches_exact_path_and_extension() {
        assert!(is_excluded("build/output.log", &["build/output.log"]));
        assert!(is_excluded("notes.tmp", &[".tmp"]));
        assert!(!is_excluded("notes.txt", &[".tmp"]));
        assert!(!is_excluded("other.log", &["build/output.log"]));
    }

    #[test]
    fn package_unpackage_round_trips() {
        let vdir = VDir::from_sorted_unique(vec![
            vfile("a.txt", b"hello world"),
            vfile("b/c.txt", b"some nested content"),
        ]);
        let packed = vdir.package("mydir").unwrap();
        let unpacked = VDir::unpackage(packed.as_range()).unwrap();
        assert_eq!(unpacked.len(), vdir.len());
        for file in vdir.files() {
            let round_tripped = unpacked.find(&file.relative_path).unwrap();
            assert_eq!(round_tripped.payload.as_slice(), file.payload.as_slice());
        }
    }

    #[test]
    fn bad_package_magic_is_rejected() {
        let buf = Buffer::with_size(32);
        let err = VDir::unpackage(buf.as_range()).unwrap_err();
        assert!(matches!(err, Error::BadMagic { .. }));
    }

    #[test]
    fn s5_delta_classifies_updated_added_and_removed() {
        let old = VDir::from_sorted_unique(vec![vfile("a.txt", b"v1"), vfile("b/c.txt", b"hello")]);
        let new = VDir::from_sorted_unique(vec![
            vfile("a.txt", b"v2"),
            vfile("b/c.txt", b"hello"),
            vfile("d.txt", b"new"),
        ]);

        let delta = old.make_delta(&new, None).unwrap();
        let payload = codec::decompress(
            delta
                .as_range()
                .sub_range(PATCH_HEADER_LEN, delta.size() - PATCH_HEADER_LEN)
                .unwrap(),
        )
        .unwrap();
        let mut offset = 0;
        let mut entries = Vec::new();
        let range = payload.as_range();
        while offset < range.size() {
            let (entry, next) = PatchFileEntry::decode(range, offset).unwrap();
            entries.push(entry);
            offset = next;
        }

        assert_eq!(entries.iter().filter(|e| e.op == PatchOp::Updated).count(), 1);
        assert_eq!(entries.iter().filter(|e| e.op == PatchOp::New).count(), 1);
        assert_eq!(entries.iter().filter(|e| e.op == PatchOp::Deleted).count(), 0);
    }

    #[test]
    fn directory_delta_round_trips_and_is_idempotent() {
        let old = VDir::from_sorted_unique(vec![vfile("a.txt", b"v1"), vfile("b/c.txt", b"hello")]);
        let new = VDir::from_sorted_unique(vec![
            vfile("a.txt", b"v2"),
            vfile("b/c.txt", b"hello"),
            vfile("d.txt", b"new"),
        ]);

        let delta = old.make_delta(&new, None).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        old.store_folder(dir.path()).unwrap();

        let mut applied = old.clone();
        let report = applied
            .apply_delta(dir.path(), delta.as_range(), None)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(applied.len(), new.len());
        for file in new.files() {
            let got = applied.find(&file.relative_path).unwrap();
            assert_eq!(got.payload.hash(), file.payload.hash());
        }

        // Reapplying is a no-op: every entry hits its idempotent branch.
        let report2 = applied
            .apply_delta(dir.path(), delta.as_range(), None)
            .unwrap();
        assert!(report2.is_success());
        assert_eq!(applied.len(), new.len());
    }

    #[test]
    fn apply_delta_rejects_version_mismatch() {
        let old = VDir::from_sorted_unique(vec![vfile("a.txt", b"v1")]);
        let new = VDir::from_sorted_unique(vec![vfile("a.txt", b"v2")]);
        let delta = old.make_delta(&new, None).unwrap();

        let mut wrong_base = VDir::from_sorted_unique(vec![vfile("a.txt", b"totally different")]);
        let dir = tempfile::TempDir::new().unwrap();
        wrong_base.store_folder(dir.path()).unwrap();

        let report = wrong_base
            .apply_delta(dir.path(), delta.as_range(), None)
            .unwrap();
        assert!(!report.is_success());
        assert!(matches!(
            report.first_failure,
            Some((_, Error::VersionMismatch { .. }))
        ));
    }

    #[test]
    fn adding_an_empty_file_survives_the_delta_round_trip() {
        let old = VDir::from_sorted_unique(vec![vfile("a.txt", b"v1")]);
        let new = VDir::from_sorted_unique(vec![vfile("a.txt", b"v1"), vfile("d.txt", b"")]);

        let delta = old.make_delta(&new, None).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        old.store_folder(dir.path()).unwrap();

        let mut applied = old.clone();
        let report = applied
            .apply_delta(dir.path(), delta.as_range(), None)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(applied.len(), new.len());
        let added = applied.find("d.txt").unwrap();
        assert!(added.payload.as_slice().is_empty());
        assert!(dir.path().join("d.txt").exists());
    }

    #[test]
    fn load_and_store_folder_round_trip() {
        let src = tempfile::TempDir::new().unwrap();
        std::fs::write(src.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.bin"), b"\x00\x01\x02").unwrap();
        std::fs::write(src.path().join("skip.tmp"), b"ignored").unwrap();

        let vdir = VDir::load_folder(src.path(), &[".tmp"], None).unwrap();
        assert_eq!(vdir.len(), 2);
        assert!(vdir.find("skip.tmp").is_none());

        let dst = tempfile::TempDir::new().unwrap();
        vdir.store_folder(dst.path()).unwrap();
        assert_eq!(std::fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
        assert_eq!(
            std::fs::read(dst.path().join("sub/b.bin")).unwrap(),
            &[0, 1, 2]
        );
    }
}
