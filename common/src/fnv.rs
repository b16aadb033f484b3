//! Deterministic FNV-1a hasher.
//!
//! `DefaultHasher` uses random seeds, producing different hashes across process
//! invocations. FNV-1a is deterministic and fast for short keys (13-byte
//! descriptor codes, offset pairs).

use std::hash::{BuildHasherDefault, Hasher};

/// FNV-1a 64-bit hasher with fixed seed.
#[derive(Debug)]
pub struct FnvHasher(u64);

/// `BuildHasher` plugging [`FnvHasher`] into `HashMap`.
pub type FnvBuildHasher = BuildHasherDefault<FnvHasher>;

impl FnvHasher {
    pub fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let hash = |bytes: &[u8]| {
            let mut h = FnvHasher::new();
            h.write(bytes);
            h.finish()
        };
        assert_eq!(hash(b"abc"), hash(b"abc"));
        assert_ne!(hash(b"abc"), hash(b"abd"));
    }

    #[test]
    fn test_known_vector() {
        // FNV-1a 64 of empty input is the offset basis.
        let h = FnvHasher::new();
        assert_eq!(h.finish(), 0xcbf29ce484222325);
    }
}
