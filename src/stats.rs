//! Non-mutating diagnostics: `stats()`.

use std::fmt;

use crate::arena::{Arena, Offset};
use crate::error::{abort_on_corruption, CorruptionError};
use crate::free_list::Traverse;

/// A snapshot of arena occupancy and free-list shape, taken without
/// mutating any allocator state.
///
/// `free_list_head` and `free_block_offsets` expose the free list's actual
/// shape, not just aggregate counts — they exist so callers (and this
/// crate's own test suite) can confirm the list is still threaded in
/// ascending address order with the head at its minimum, not merely that
/// the byte totals still add up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorStats {
    pub memory_size: u32,
    pub free_count: u32,
    pub free_bytes: u32,
    pub largest_free_block: u32,
    pub allocated_bytes: u32,
    pub free_list_head: Offset,
    /// Offsets of every free block, in the order the free list threads them
    /// starting from `free_list_head`.
    pub free_block_offsets: Vec<Offset>,
}

impl AllocatorStats {
    pub(crate) fn collect(arena: &Arena, free_head: Offset) -> Self {
        let mut free_count = 0u32;
        let mut free_bytes = 0u32;
        let mut largest_free_block = 0u32;
        let mut free_block_offsets = Vec::new();

        for item in Traverse::new(arena, free_head) {
            let (offset, header) = match item {
                Ok(pair) => pair,
                Err(e) => abort_on_corruption(e),
            };
            free_count += 1;
            free_bytes += header.size;
            largest_free_block = largest_free_block.max(header.size);
            free_block_offsets.push(offset);
        }

        Self {
            memory_size: arena.len(),
            free_count,
            free_bytes,
            largest_free_block,
            allocated_bytes: arena.len() - free_bytes,
            free_list_head: free_head,
            free_block_offsets,
        }
    }
}

impl fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "suballocator stats:")?;
        writeln!(f, "  memory_size:       {}", self.memory_size)?;
        writeln!(f, "  free blocks:       {}", self.free_count)?;
        writeln!(f, "  free bytes:        {}", self.free_bytes)?;
        writeln!(f, "  largest free:      {}", self.largest_free_block)?;
        writeln!(f, "  allocated bytes:   {}", self.allocated_bytes)?;
        writeln!(f, "  free list head:    {}", self.free_list_head)?;
        writeln!(f, "  free list offsets: {:?}", self.free_block_offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn fresh_arena_reports_one_free_block() {
        let arena = Arena::create(1024);
        let stats = AllocatorStats::collect(&arena, 0);
        assert_eq!(stats.memory_size, 1024);
        assert_eq!(stats.free_count, 1);
        assert_eq!(stats.free_bytes, 1024);
        assert_eq!(stats.largest_free_block, 1024);
        assert_eq!(stats.allocated_bytes, 0);
        assert_eq!(stats.free_list_head, 0);
        assert_eq!(stats.free_block_offsets, vec![0]);
    }

    #[test]
    fn display_includes_memory_size() {
        let arena = Arena::create(256);
        let stats = AllocatorStats::collect(&arena, 0);
        let rendered = stats.to_string();
        assert!(rendered.contains("256"));
    }
}
