// File-level helpers for diffing and patching.
//
// `diff_file()` and `patch_file()` read their inputs fully into memory (the
// diff needs random access to both sides), write through a `BufWriter`, and
// report sizes and operation counts. With the `file-io` feature they also
// compute SHA-256 digests of the target, so a patch can be checked against
// the diff that produced it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::diff::{self, DiffScript, Operation, ScriptError};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `diff_file()`.
#[derive(Debug, Clone, Default)]
pub struct DiffStats {
    /// Base file size in bytes.
    pub base_size: u64,
    /// New file size in bytes.
    pub target_size: u64,
    /// Packed script size in bytes.
    pub script_size: u64,
    /// Number of insert operations.
    pub inserts: u64,
    /// Number of copy operations.
    pub copies: u64,
    /// Literal bytes carried by inserts.
    pub inserted_bytes: u64,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `patch_file()`.
#[derive(Debug, Clone, Default)]
pub struct PatchStats {
    /// Base file size in bytes.
    pub base_size: u64,
    /// Script file size in bytes.
    pub script_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of operations applied.
    pub operations: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file helpers.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The script could not be decoded or applied.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

/// Diff `new_path` against `base_path` and write the packed script to
/// `script_path`.
pub fn diff_file(
    base_path: &Path,
    new_path: &Path,
    script_path: &Path,
) -> Result<DiffStats, IoError> {
    let base = std::fs::read(base_path)?;
    let new = std::fs::read(new_path)?;

    let script = diff::diff(&base, &new);
    let packed = script.pack_to_vec();
    write_file(script_path, &packed)?;

    let mut stats = DiffStats {
        base_size: base.len() as u64,
        target_size: new.len() as u64,
        script_size: packed.len() as u64,
        target_sha256: sha256(&new),
        ..DiffStats::default()
    };
    for op in &script {
        match op {
            Operation::Insert(data) => {
                stats.inserts += 1;
                stats.inserted_bytes += data.len() as u64;
            }
            Operation::Copy { .. } => stats.copies += 1,
        }
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Apply the script in `script_path` to `base_path`, writing the result to
/// `output_path`. Nothing is written if the script is invalid.
pub fn patch_file(
    base_path: &Path,
    script_path: &Path,
    output_path: &Path,
) -> Result<PatchStats, IoError> {
    let base = std::fs::read(base_path)?;
    let packed = std::fs::read(script_path)?;

    let script = DiffScript::unpack(&packed)?;
    let output = diff::apply(&base, &script)?;
    write_file(output_path, &output)?;

    Ok(PatchStats {
        base_size: base.len() as u64,
        script_size: packed.len() as u64,
        output_size: output.len() as u64,
        operations: script.len() as u64,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn diff_patch_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let base_data = b"The quick brown fox jumps over the lazy dog. 1234567890";
        let new_data = b"A quick brown fox jumps over the lazy dog. 1234567890!!!";

        let base_path = write_temp_file(dir.path(), "base.bin", base_data);
        let new_path = write_temp_file(dir.path(), "new.bin", new_data);
        let script_path = dir.path().join("script.bin");
        let output_path = dir.path().join("output.bin");

        let diff_stats = diff_file(&base_path, &new_path, &script_path).unwrap();
        assert_eq!(diff_stats.base_size, base_data.len() as u64);
        assert_eq!(diff_stats.target_size, new_data.len() as u64);
        assert!(diff_stats.copies >= 1);
        assert!(diff_stats.script_size < new_data.len() as u64);

        let patch_stats = patch_file(&base_path, &script_path, &output_path).unwrap();
        assert_eq!(patch_stats.output_size, new_data.len() as u64);
        assert_eq!(patch_stats.operations, diff_stats.inserts + diff_stats.copies);
        assert_eq!(std::fs::read(&output_path).unwrap(), new_data);
    }

    #[test]
    fn patch_rejects_out_of_bounds_copy() {
        let dir = tempfile::tempdir().unwrap();
        let mut script = DiffScript::new();
        script.copy(0, 99);

        let base_path = write_temp_file(dir.path(), "base.bin", b"tiny");
        let script_path = write_temp_file(dir.path(), "script.bin", &script.pack_to_vec());
        let output_path = dir.path().join("output.bin");

        let err = patch_file(&base_path, &script_path, &output_path).unwrap_err();
        assert!(matches!(err, IoError::Script(ScriptError::CopyOutOfBounds { .. })));
        assert!(!output_path.exists());
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_checksums_computed() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = write_temp_file(dir.path(), "base.bin", b"base for checksum test");
        let new_path = write_temp_file(dir.path(), "new.bin", b"target for checksum test");
        let script_path = dir.path().join("script.bin");
        let output_path = dir.path().join("output.bin");

        let diff_stats = diff_file(&base_path, &new_path, &script_path).unwrap();
        let patch_stats = patch_file(&base_path, &script_path, &output_path).unwrap();

        assert!(diff_stats.target_sha256.is_some());
        assert_eq!(patch_stats.output_sha256, diff_stats.target_sha256);
    }
}
