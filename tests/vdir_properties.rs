//! End-to-end properties over [`yatta::VDir`] that need a real filesystem
//! (`tempfile::TempDir`) to exercise, mirroring the teacher's `e2e/` style of
//! integration test but scoped to this crate's directory-sync surface
//! instead of the LZ4 CLI.

use std::fs;

use tempfile::TempDir;
use yatta::{Error, VDir};

fn write_tree(root: &std::path::Path, files: &[(&str, &[u8])]) {
    for (path, data) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, data).unwrap();
    }
}

/// Property 5: package round-trips the full `(relative_path, payload)` set.
#[test]
fn package_round_trip_preserves_file_set() {
    let src = TempDir::new().unwrap();
    write_tree(
        src.path(),
        &[("a.txt", b"hello"), ("b/c.txt", b"nested content")],
    );

    let vdir = VDir::load_folder(src.path(), &[], None).unwrap();
    let packed = vdir.package("mydir").unwrap();
    let unpacked = VDir::unpackage(packed.as_range()).unwrap();

    assert_eq!(unpacked.len(), vdir.len());
    for file in vdir.files() {
        let restored = unpacked.find(&file.relative_path).unwrap();
        assert_eq!(restored.payload.as_slice(), file.payload.as_slice());
    }
}

/// Property 6 + scenario S5: a directory delta applied to the old side
/// reproduces the new side's entry set and content hashes, with the
/// expected U/N/D classification.
#[test]
fn directory_delta_reproduces_target_and_classifies_changes() {
    let old = TempDir::new().unwrap();
    write_tree(old.path(), &[("a.txt", b"v1"), ("b/c.txt", b"hello")]);
    let new = TempDir::new().unwrap();
    write_tree(
        new.path(),
        &[("a.txt", b"v2"), ("b/c.txt", b"hello"), ("d.txt", b"new")],
    );

    let old_vdir = VDir::load_folder(old.path(), &[], None).unwrap();
    let new_vdir = VDir::load_folder(new.path(), &[], None).unwrap();

    let delta = old_vdir.make_delta(&new_vdir, None).unwrap();

    let mut applied = old_vdir.clone();
    let report = applied.apply_delta(old.path(), delta.as_range(), None).unwrap();
    assert!(report.is_success());
    assert_eq!(report.entries_applied, 2); // one Updated (a.txt), one New (d.txt)

    assert_eq!(applied.len(), new_vdir.len());
    for file in new_vdir.files() {
        let got = applied.find(&file.relative_path).unwrap();
        assert_eq!(got.payload.hash(), file.payload.hash());
        assert_eq!(
            fs::read(old.path().join(&file.relative_path)).unwrap(),
            file.payload.as_slice()
        );
    }
}

/// Property 7: reapplying the same delta is a no-op.
#[test]
fn reapplying_delta_is_idempotent() {
    let old_dir = TempDir::new().unwrap();
    write_tree(old_dir.path(), &[("a.txt", b"v1")]);
    let new_dir = TempDir::new().unwrap();
    write_tree(new_dir.path(), &[("a.txt", b"v2"), ("b.txt", b"new file")]);

    let old_vdir = VDir::load_folder(old_dir.path(), &[], None).unwrap();
    let new_vdir = VDir::load_folder(new_dir.path(), &[], None).unwrap();
    let delta = old_vdir.make_delta(&new_vdir, None).unwrap();

    let mut applied = old_vdir.clone();
    let first = applied
        .apply_delta(old_dir.path(), delta.as_range(), None)
        .unwrap();
    assert!(first.is_success());
    assert!(first.entries_applied > 0);

    let before = applied.clone();
    let second = applied
        .apply_delta(old_dir.path(), delta.as_range(), None)
        .unwrap();
    assert!(second.is_success());
    for file in before.files() {
        assert_eq!(
            applied.find(&file.relative_path).unwrap().payload.hash(),
            file.payload.hash()
        );
    }
}

/// Property 8: applying a delta to a VDir whose file content doesn't match
/// the delta's expected source hash fails with `VersionMismatch` and leaves
/// that file untouched on disk.
#[test]
fn version_mismatch_is_rejected_without_mutating_the_file() {
    let old_dir = TempDir::new().unwrap();
    write_tree(old_dir.path(), &[("a.txt", b"v1")]);
    let new_dir = TempDir::new().unwrap();
    write_tree(new_dir.path(), &[("a.txt", b"v2")]);

    let old_vdir = VDir::load_folder(old_dir.path(), &[], None).unwrap();
    let new_vdir = VDir::load_folder(new_dir.path(), &[], None).unwrap();
    let delta = old_vdir.make_delta(&new_vdir, None).unwrap();

    let drifted_dir = TempDir::new().unwrap();
    write_tree(drifted_dir.path(), &[("a.txt", b"some other content entirely")]);
    let mut drifted_vdir = VDir::load_folder(drifted_dir.path(), &[], None).unwrap();

    let report = drifted_vdir
        .apply_delta(drifted_dir.path(), delta.as_range(), None)
        .unwrap();
    assert!(!report.is_success());
    assert!(matches!(
        report.first_failure,
        Some((ref path, Error::VersionMismatch { .. })) if path == "a.txt"
    ));
    assert_eq!(
        fs::read(drifted_dir.path().join("a.txt")).unwrap(),
        b"some other content entirely"
    );
}

/// Scenario S6: a compressed artifact whose header claims more output bytes
/// than the payload actually decodes to must fail cleanly, never panic.
#[test]
fn truncated_compressed_payload_fails_cleanly() {
    let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
    let compressed = yatta::compress(yatta::MemoryRange::new(&data)).unwrap();

    let mut mutated = compressed.clone();
    // Inflate the declared uncompressed size beyond what the payload holds.
    let bogus_size = (data.len() as u64) * 100;
    mutated.write_as::<u64>(bogus_size, 16).unwrap();

    let result = yatta::decompress(mutated.as_range());
    assert!(matches!(
        result,
        Err(Error::Truncated) | Err(Error::DecompressionFailed)
    ));
}

/// Property 10 (bounds safety), exercised against every framed artifact kind
/// this crate produces: truncating or corrupting the magic must fail with a
/// defined error, not a panic, for a range of truncation points.
#[test]
fn truncated_and_corrupted_artifacts_never_panic() {
    let data = b"some reasonably long input used to build every artifact kind".repeat(4);
    let compressed = yatta::compress(yatta::MemoryRange::new(&data)).unwrap();
    let diffed = yatta::diff(
        yatta::MemoryRange::new(&data),
        yatta::MemoryRange::new(&data[..data.len() - 10]),
        2,
    )
    .unwrap();

    for artifact in [compressed.as_slice(), diffed.as_slice()] {
        for cut in 0..artifact.len().min(40) {
            let truncated = &artifact[..cut];
            let as_compress = yatta::decompress(yatta::MemoryRange::new(truncated));
            let as_diff = yatta::patch(
                yatta::MemoryRange::new(&data),
                yatta::MemoryRange::new(truncated),
            );
            // Neither call may panic; both must return an error this short.
            assert!(as_compress.is_err());
            assert!(as_diff.is_err());
        }
    }
}

/// Exclusion filtering: `load_folder` must skip files matched by an
/// extension-style exclusion pattern.
#[test]
fn load_folder_honors_extension_exclusions() {
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        &[("keep.txt", b"keep me"), ("drop.tmp", b"drop me")],
    );

    let vdir = VDir::load_folder(dir.path(), &[".tmp"], None).unwrap();
    assert!(vdir.find("keep.txt").is_some());
    assert!(vdir.find("drop.tmp").is_none());
}
