use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use blake3::Hasher;

use crate::buffer_pool::BufferPool;
use crate::error::{DiskTestError, Result};

/// Digest length in bytes. Any fixed-length digest would satisfy the
/// uniqueness-within-a-recorder requirement; BLAKE3's XOF output is
/// truncated to 128 bits here since the crate already depends on it.
pub const DIGEST_LEN: usize = 16;

/// A BLAKE3 hasher truncated to `DIGEST_LEN` bytes and hex-encoded on
/// finalize. Shared by the writer (hashing bytes as they're generated)
/// and the verifier (rehashing bytes as they're read back).
#[derive(Default)]
pub struct Digest {
    inner: Hasher,
}

impl Digest {
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize_hex(&self) -> String {
        let mut reader = self.inner.finalize_xof();
        let mut out = [0u8; DIGEST_LEN];
        reader.fill(&mut out);
        hex::encode(out)
    }
}

/// Stream the contents of `path` through a fresh `Digest`, reusing a
/// buffer checked out of `pool` rather than allocating per call.
pub fn hash_path_with_pool(path: &Path, pool: &Arc<BufferPool>) -> Result<String> {
    let mut file = File::open(path).map_err(|e| DiskTestError::read(path.display().to_string(), &e))?;
    let mut pooled = pool.get();
    let mut digest = Digest::new();
    loop {
        let buf = pooled.as_mut_slice();
        let read = file
            .read(buf)
            .map_err(|e| DiskTestError::read(path.display().to_string(), &e))?;
        if read == 0 {
            break;
        }
        digest.update(&buf[..read]);
    }
    Ok(digest.finalize_hex())
}
