//! The cyclic doubly-linked free list threaded through block headers.
//!
//! Every function here takes the arena and the current `free_list_head`
//! explicitly rather than hiding them behind module-level statics, so the
//! allocator that owns them can be an ordinary struct field. All of these
//! are plain mutation of headers already resident in the arena — there is
//! no separate free-list data structure.

use crate::arena::{Arena, Offset};
use crate::error::CorruptionError;
use crate::header::Header;

/// An iterator over free-list offsets starting at `head`, following `next`
/// until the cycle closes back on `head`. Every visited header's `magic`
/// must be `MAGIC_FREE`; any other value means the list has been corrupted.
pub struct Traverse<'a> {
    arena: &'a Arena,
    head: Offset,
    next: Option<Offset>,
}

impl<'a> Traverse<'a> {
    pub fn new(arena: &'a Arena, head: Offset) -> Self {
        Self { arena, head, next: Some(head) }
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Result<(Offset, Header), CorruptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next?;
        let header = self.arena.header_at(offset);
        if !header.is_free() {
            self.next = None;
            return Some(Err(CorruptionError::BadMagicOnTraversal { offset, found: header.magic }));
        }
        self.next = if header.next == self.head { None } else { Some(header.next) };
        Some(Ok((offset, header)))
    }
}

/// Splice a single already-free block at `b` out of the free list.
///
/// O(1): only `b`'s neighbours and (if `b` was the head) `head` are touched.
pub fn unlink(arena: &mut Arena, head: &mut Offset, b: Offset) {
    let block = arena.header_at(b);
    debug_assert!(block.is_free());

    if block.next == b {
        // b was the only free block; nothing remains to re-link.
        return;
    }

    let mut next = arena.header_at(block.next);
    next.prev = block.prev;
    arena.write_header(block.next, next);

    let mut prev = arena.header_at(block.prev);
    prev.next = block.next;
    arena.write_header(block.prev, prev);

    if *head == b {
        *head = block.next;
    }
}

/// Make `b` its own `next`/`prev`, the self-cyclic form required whenever
/// the free list holds exactly one block. `unlink` happens to produce this
/// form on its own when a two-block list collapses to one (see its tests),
/// but any caller that builds a single-block free list from scratch —
/// rather than shrinking down to one via `unlink` — needs this directly.
pub fn link_single(arena: &mut Arena, head: &mut Offset, b: Offset) {
    let mut block = arena.header_at(b);
    block.next = b;
    block.prev = b;
    arena.write_header(b, block);
    *head = b;
}

/// Insert a newly-freed block at offset `o` into the free list in address
/// order, updating `head` if `o` becomes the new minimum offset.
///
/// O(n): walks forward from `head` to find the first free offset greater
/// than `o` (cyclically — if none is greater, wraps back to `head`).
pub fn insert(arena: &mut Arena, head: &mut Offset, o: Offset) {
    let start = *head;

    // Find `after`: the smallest free offset greater than `o`, scanning the
    // list in its (ascending) address order starting at head. If the scan
    // wraps back to head without finding one, `o` is the new maximum and is
    // inserted at the end, i.e. immediately before head.
    let mut cur = start;
    let after = loop {
        if cur > o {
            break cur;
        }
        let h = arena.header_at(cur);
        if h.next == start {
            break start;
        }
        cur = h.next;
    };
    let before = arena.header_at(after).prev;

    // Re-read `before`/`after` headers after each write: when the list has
    // a single block, `before == after == o`'s sole neighbour, and the
    // second header must see the first write's update rather than clobber it.
    let mut before_header = arena.header_at(before);
    before_header.next = o;
    arena.write_header(before, before_header);

    let mut after_header = arena.header_at(after);
    after_header.prev = o;
    arena.write_header(after, after_header);

    let mut o_header = arena.header_at(o);
    o_header.next = after;
    o_header.prev = before;
    arena.write_header(o, o_header);

    if o < *head {
        *head = o;
    }
}
