//! The buddy engine: the public [`Suballocator`] type, best-fit allocation
//! with recursive splitting, and address-ordered free with parity-rule
//! buddy coalescing.

use std::marker::PhantomData;

use crate::arena::{Arena, Offset};
use crate::error::{abort_on_corruption, CorruptionError};
use crate::free_list::{self, Traverse};
use crate::header::{Header, HEADER_SIZE, MAGIC_ALLOC, MIN_REGION_SIZE};
use crate::stats::AllocatorStats;

struct State {
    arena: Arena,
    free_head: Offset,
}

/// A single-threaded, non-reentrant binary-buddy suballocator.
///
/// Owns exactly one arena as an ordinary field rather than module-level
/// globals, so multiple independent allocators can coexist in the same
/// process. The type carries a `PhantomData<*const ()>` purely to opt it out
/// of `Send`/`Sync` — every field it actually stores (`Arena`, `Offset`) is
/// trivially both, so without that marker the compiler would hand out a
/// false promise of thread safety this allocator does not provide: callers
/// must serialise their own access.
pub struct Suballocator {
    state: Option<State>,
    _not_thread_safe: PhantomData<*const ()>,
}

impl Default for Suballocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Suballocator {
    /// An uninitialised handle. No host allocation happens until [`Self::init`].
    pub fn new() -> Self {
        Self { state: None, _not_thread_safe: PhantomData }
    }

    /// Create the arena. A no-op if already initialised: re-initialising a
    /// live allocator would discard every outstanding allocation's backing
    /// storage out from under the caller, so the existing arena wins.
    pub fn init(&mut self, size: u32) {
        if self.state.is_none() {
            tracing::info!(requested = size, "suballocator: init");
            let arena = Arena::create(size);
            tracing::debug!(memory_size = arena.len(), "suballocator: arena created");
            self.state = Some(State { arena, free_head: 0 });
        }
    }

    /// Release the arena back to the host and reset to the uninitialised state.
    pub fn teardown(&mut self) {
        if self.state.take().is_some() {
            tracing::info!("suballocator: teardown");
        }
    }

    fn state(&self) -> &State {
        self.state.as_ref().unwrap_or_else(|| abort_on_corruption(CorruptionError::Uninitialised))
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.as_mut().unwrap_or_else(|| abort_on_corruption(CorruptionError::Uninitialised))
    }

    /// Best-fit allocate `n` bytes, recursively halving the smallest
    /// sufficiently large free block.
    ///
    /// Returns `None` (never aborts) when: no free block is large enough,
    /// serving the request would leave the free list empty, or `n` is at or
    /// below [`MIN_REGION_SIZE`] — requests that small aren't worth the
    /// header overhead, and rejecting them with `None` keeps the failure in
    /// the caller's ordinary control flow instead of aborting the process
    /// over an undersized request.
    pub fn alloc(&mut self, n: u32) -> Option<Offset> {
        if n <= MIN_REGION_SIZE {
            return None;
        }
        let need = n + HEADER_SIZE;

        let State { arena, free_head } = self.state_mut();
        let head = *free_head;

        let mut best: Option<(Offset, u32)> = None;
        for item in Traverse::new(arena, head) {
            let (offset, header) = match item {
                Ok(pair) => pair,
                Err(e) => abort_on_corruption(e),
            };
            if header.size >= need {
                match best {
                    Some((_, best_size)) if header.size >= best_size => {}
                    _ => best = Some((offset, header.size)),
                }
            }
        }

        let (target, _) = best?;

        // Split loop: halve `target` until one more halving would undershoot.
        loop {
            let target_header = arena.header_at(target);
            if target_header.size < 2 * need {
                break;
            }
            let half = target_header.size / 2;
            let split_offset = target + half;
            let old_next = target_header.next;

            arena.write_header(split_offset, Header::free(half, old_next, target));

            let mut next_header = arena.header_at(old_next);
            next_header.prev = split_offset;
            arena.write_header(old_next, next_header);

            // Re-read target: when `old_next == target` (sole free block
            // pre-split) the write above already updated target's `prev`.
            let mut target_header = arena.header_at(target);
            target_header.size = half;
            target_header.next = split_offset;
            arena.write_header(target, target_header);
        }

        let target_header = arena.header_at(target);
        if target_header.next == target || target_header.prev == target {
            // Handing this out would empty the free list entirely: the
            // allocator never hands out the arena's last block, since that
            // would leave no anchor for the free list to thread through.
            tracing::debug!(n, "suballocator: alloc refused, would empty free list");
            return None;
        }

        free_list::unlink(arena, free_head, target);
        arena.write_header(target, Header { magic: MAGIC_ALLOC, size: target_header.size, next: 0, prev: 0 });

        tracing::trace!(n, offset = target, size = target_header.size, "suballocator: alloc");
        Some(Arena::payload_offset(target))
    }

    /// Return a payload offset previously produced by [`Self::alloc`],
    /// inserting it back into the free list in address order and
    /// coalescing with its buddy as far as possible.
    ///
    /// Fatal abort if `p` does not point at an `ALLOC`-tagged header.
    pub fn free(&mut self, p: Offset) {
        let State { arena, free_head } = self.state_mut();

        let header_offset = Arena::header_offset(p);
        let header = arena.header_at(header_offset);
        if !header.is_alloc() {
            abort_on_corruption(CorruptionError::InvalidFree { offset: header_offset, found: header.magic });
        }

        arena.write_header(header_offset, Header { magic: crate::header::MAGIC_FREE, ..header });
        free_list::insert(arena, free_head, header_offset);
        tracing::trace!(offset = header_offset, size = header.size, "suballocator: free");

        coalesce(arena, free_head, header_offset);
    }

    /// A non-mutating snapshot of arena occupancy and free-list shape.
    pub fn stats(&self) -> AllocatorStats {
        let state = self.state();
        AllocatorStats::collect(&state.arena, state.free_head)
    }
}

impl Drop for Suballocator {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Iteratively merge `b` with its buddy as long as the buddy is free and
/// memory-adjacent, following the O(1) parity rule: a block's buddy sits
/// after it if its offset divided by its size is even, before it otherwise.
fn coalesce(arena: &mut Arena, head: &mut Offset, mut b: Offset) {
    loop {
        let b_header = arena.header_at(b);
        if b_header.next == b {
            break; // sole free block left; nothing to merge with.
        }

        let buddy_after = (b / b_header.size) % 2 == 0;
        let candidate = if buddy_after { b_header.next } else { b_header.prev };
        let candidate_header = arena.header_at(candidate);

        let same_size = candidate_header.size == b_header.size;
        let adjacent = if buddy_after {
            b + b_header.size == candidate
        } else {
            candidate + candidate_header.size == b
        };
        if !(same_size && adjacent) {
            break;
        }

        let (lower, higher) = if buddy_after { (b, candidate) } else { (candidate, b) };

        free_list::unlink(arena, head, higher);
        let mut lower_header = arena.header_at(lower);
        lower_header.size *= 2;
        arena.write_header(lower, lower_header);

        // Only fires when the head itself was the higher of the merged pair
        // and got absorbed into a larger left buddy; otherwise `lower` is
        // already >= the current head.
        if lower < *head {
            *head = lower;
        }

        b = lower;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_init_then_single_free_block() {
        let mut a = Suballocator::new();
        a.init(1024);
        let s = a.stats();
        assert_eq!(s.memory_size, 1024);
        assert_eq!(s.free_count, 1);
        assert_eq!(s.free_bytes, 1024);
    }

    #[test]
    fn scenario_first_alloc_splits_down_to_128() {
        let mut a = Suballocator::new();
        a.init(1024);
        let p = a.alloc(100).unwrap();
        assert_eq!(p, 16);
        let s = a.stats();
        // Remaining free blocks: 128, 256, 512.
        assert_eq!(s.free_count, 3);
        assert_eq!(s.free_bytes, 128 + 256 + 512);
    }

    #[test]
    fn scenario_second_alloc_takes_offset_128() {
        let mut a = Suballocator::new();
        a.init(1024);
        a.alloc(100).unwrap();
        let p = a.alloc(50).unwrap();
        assert_eq!(p, 144);
        let s = a.stats();
        assert_eq!(s.free_count, 2);
        assert_eq!(s.free_bytes, 256 + 512);
    }

    #[test]
    fn scenario_free_without_buddy_present_does_not_merge() {
        let mut a = Suballocator::new();
        a.init(1024);
        a.alloc(100).unwrap();
        a.alloc(50).unwrap();
        a.free(16);
        let s = a.stats();
        assert_eq!(s.free_count, 3);
        assert_eq!(s.free_bytes, 128 + 256 + 512);
    }

    #[test]
    fn scenario_second_free_cascades_to_single_block() {
        let mut a = Suballocator::new();
        a.init(1024);
        a.alloc(100).unwrap();
        a.alloc(50).unwrap();
        a.free(16);
        a.free(144);
        let s = a.stats();
        assert_eq!(s.free_count, 1);
        assert_eq!(s.free_bytes, 1024);
    }

    #[test]
    fn scenario_three_small_allocs_on_64_byte_arena() {
        let mut a = Suballocator::new();
        a.init(64);
        let p1 = a.alloc(5).unwrap();
        assert_eq!(p1, 16);
        let p2 = a.alloc(5);
        assert!(p2.is_none());
    }

    #[test]
    fn reject_tiny_requests_with_none() {
        let mut a = Suballocator::new();
        a.init(1024);
        assert_eq!(a.alloc(0), None);
        assert_eq!(a.alloc(MIN_REGION_SIZE), None);
    }

    #[test]
    fn init_twice_is_a_no_op() {
        let mut a = Suballocator::new();
        a.init(1024);
        a.alloc(100);
        a.init(99999);
        assert_eq!(a.stats().memory_size, 1024);
    }

    #[test]
    fn full_cycle_alloc_then_free_everything_restores_single_block() {
        let mut a = Suballocator::new();
        a.init(4096);
        let mut live = Vec::new();
        loop {
            match a.alloc(40) {
                Some(p) => live.push(p),
                None => break,
            }
        }
        for p in live {
            a.free(p);
        }
        let s = a.stats();
        assert_eq!(s.free_count, 1);
        assert_eq!(s.free_bytes, 4096);
    }

    #[test]
    #[should_panic]
    fn uninitialised_alloc_aborts() {
        let mut a = Suballocator::new();
        a.alloc(100);
    }
}
