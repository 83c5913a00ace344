//! Fixed-size working memory handed to an engine once at construction.

/// Default per-engine arena size: 50 KiB.
pub const DEFAULT_ARENA_BYTES: usize = 50 * 1024;

/// Alignment of the usable region, in bytes.
pub const ARENA_ALIGN: usize = 16;

/// A zeroed, 16-byte-aligned byte block. Allocated once; never resized.
///
/// Ownership moves into the engine that receives it, so the same arena can
/// never back two engines.
pub struct MemoryArena {
    backing: Box<[u8]>,
    offset: usize,
    len: usize,
}

impl MemoryArena {
    /// Allocate an arena with exactly `len` usable bytes.
    pub fn new(len: usize) -> Self {
        let backing = vec![0u8; len + ARENA_ALIGN - 1].into_boxed_slice();
        let offset = backing.as_ptr().align_offset(ARENA_ALIGN);
        Self {
            backing,
            offset,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.backing[self.offset..self.offset + self.len]
    }
}

impl Default for MemoryArena {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_BYTES)
    }
}

impl std::fmt::Debug for MemoryArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryArena").field("len", &self.len).finish()
    }
}
