//! Walks through a simple end-to-end scenario: init a 1024-byte arena, make
//! two allocations, free them out of order, and watch coalescing restore a
//! single 1024-byte free block.

use suballoc::{init_tracing, LoggingConfig, Suballocator};

fn main() {
    init_tracing(&LoggingConfig::default()).ok();

    let mut alloc = Suballocator::new();
    alloc.init(1024);
    println!("{}", alloc.stats());

    let a = alloc.alloc(100).expect("100 bytes should fit in a fresh 1024-byte arena");
    let b = alloc.alloc(50).expect("50 bytes should fit after the first split");
    println!("allocated a={a} b={b}");
    println!("{}", alloc.stats());

    alloc.free(a);
    println!("freed a, buddy still allocated, no coalesce yet");
    println!("{}", alloc.stats());

    alloc.free(b);
    println!("freed b, cascading coalesce should restore one 1024-byte block");
    println!("{}", alloc.stats());

    alloc.teardown();
}
