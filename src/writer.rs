use std::fs::File;
use std::io::Write;
use std::path::Path;

use rand::Rng;

use crate::cancel::CancelToken;
use crate::error::{DiskTestError, Result};
use crate::hash::Digest;

/// Largest single write performed per block; one buffer this size is
/// reused (refilled in place) across the whole file rather than
/// reallocated per block.
pub const BLOCK_SIZE: u64 = 20 * 1_000_000;

/// Write `target_size` bytes of pseudo-random data to `path`, returning
/// the hex digest of the bytes written. `target_size` must be greater
/// than zero. Cancellation is checked between blocks: a cancelled write
/// leaves a truncated file behind and returns `Err(Cancelled)`.
pub fn write(target_size: u64, path: &Path, cancel: &CancelToken) -> Result<String> {
    if target_size == 0 {
        return Err(DiskTestError::InvalidArgument(
            "target_size must be greater than 0".to_string(),
        ));
    }

    let display = path.display().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DiskTestError::create(display.clone(), &e))?;
    }
    let mut file = File::create(path).map_err(|e| DiskTestError::create(display.clone(), &e))?;

    let block_len = target_size.min(BLOCK_SIZE) as usize;
    let mut buf = vec![0u8; block_len];
    let mut digest = Digest::new();
    let mut rng = rand::rng();

    let mut written: u64 = 0;
    while written < target_size {
        cancel.check()?;

        let remaining = target_size - written;
        let this_block = remaining.min(block_len as u64) as usize;
        rng.fill(&mut buf[..]);
        let chunk = &buf[..this_block];

        file.write_all(chunk)
            .map_err(|e| DiskTestError::write(display.clone(), &e))?;
        digest.update(chunk);
        written += this_block as u64;
    }

    Ok(digest.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.tmp");
        let cancel = CancelToken::new();
        match write(0, &path, &cancel) {
            Err(DiskTestError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn writes_exactly_target_size_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.tmp");
        let cancel = CancelToken::new();
        let size = 12_345u64;
        write(size, &path, &cancel).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), size);
    }

    #[test]
    fn writes_larger_than_one_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.tmp");
        let cancel = CancelToken::new();
        let size = BLOCK_SIZE + 777;
        write(size, &path, &cancel).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), size);
    }

    #[test]
    fn returned_hash_matches_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.tmp");
        let cancel = CancelToken::new();
        let hash = write(4096, &path, &cancel).unwrap();

        let mut contents = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut contents).unwrap();
        let mut digest = Digest::new();
        digest.update(&contents);
        assert_eq!(hash, digest.finalize_hex());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("f.tmp");
        let cancel = CancelToken::new();
        write(10, &path, &cancel).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn cancelled_before_start_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.tmp");
        let cancel = CancelToken::new();
        cancel.cancel();
        match write(1_000, &path, &cancel) {
            Err(DiskTestError::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }
}
