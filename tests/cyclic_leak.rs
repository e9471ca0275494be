//! Regression test documenting the intentional cyclic-ownership leak: two
//! handles referencing each other through their payloads keep each other's
//! refcount above zero forever. No cycle collector is provided; this test
//! exists so a future change does not "fix" that by accident.

use std::cell::RefCell;

use poolguard::{Callsite, PoolAllocator, PoolConfig, SmartPointer};

fn cs() -> Callsite {
    poolguard::callsite!()
}

struct Node {
    other: RefCell<Option<SmartPointer<Node>>>,
}

#[test]
fn cyclic_smart_pointers_leak_rather_than_collect() {
    let pool: &'static PoolAllocator<Node> = Box::leak(Box::new(PoolAllocator::new(PoolConfig::new())));

    let a = SmartPointer::new(pool, Node { other: RefCell::new(None) }, cs());
    let b = SmartPointer::new(pool, Node { other: RefCell::new(None) }, cs());

    *a.other.borrow_mut() = Some(b.clone());
    *b.other.borrow_mut() = Some(a.clone());

    let a_handle = a.handle();
    let b_handle = b.handle();

    drop(a);
    drop(b);

    // Each handle still holds an incoming reference from the other's
    // `other` field, so neither refcount reached zero: both remain
    // "allocated" from the pool's point of view. This is the documented,
    // intentional leak — there is no cycle collector.
    assert!(a_handle.storage().is_some());
    assert!(b_handle.storage().is_some());
}
