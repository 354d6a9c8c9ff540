// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::State;
use crate::value::{Object, Value, WeakTable};

#[test]
fn unrooted_objects_are_collected() {
    let mut st = State::open();
    st.gc_run();
    let free_before = st.heap.free_cells();

    let ai = st.gc_arena_preserve();
    for _ in 0..200 {
        st.make_str(b"transient");
    }
    st.gc_arena_restore(ai);

    st.gc_run();
    assert!(st.heap.free_cells() >= free_before.saturating_sub(8));
}

#[test]
fn arena_pins_survive_collection() {
    let mut st = State::open();
    let v = st.make_str(b"pinned");
    let Value::Obj(r) = v else { unreachable!() };
    st.gc_run();
    // still a valid string
    assert_eq!(st.string_bytes(r), b"pinned");
}

#[test]
fn preserve_restore_releases_pins() {
    let mut st = State::open();
    let ai = st.gc_arena_preserve();
    st.make_str(b"short lived");
    st.make_str(b"short lived");
    st.gc_arena_restore(ai);
    assert_eq!(st.gc_arena_preserve(), ai);
}

#[test]
fn marks_are_clear_between_cycles() {
    let mut st = State::open();
    st.gc_run();
    assert!(!st.heap.is_marked(st.globals));
    assert!(!st.heap.is_marked(st.macros));
}

#[test]
fn weak_entries_die_with_their_keys() {
    let mut st = State::open();
    let w = st.alloc(Object::Weak(WeakTable::default()));
    let Value::Obj(wr) = w else { unreachable!() };

    let ai = st.gc_arena_preserve();
    let key = st.make_uninterned("weak-key");
    let val = st.make_str(b"payload");
    if let Object::Weak(t) = st.heap.get_mut(wr) {
        t.map.insert(key, val);
    }

    // key still pinned: the entry survives and its value is marked
    st.gc_run();
    match st.heap.get(wr) {
        Object::Weak(t) => assert_eq!(t.map.len(), 1),
        _ => unreachable!(),
    }

    // drop the pin: the key becomes unreachable and the entry goes
    st.gc_arena_restore(ai);
    st.gc_run();
    match st.heap.get(wr) {
        Object::Weak(t) => assert!(t.map.is_empty()),
        _ => unreachable!(),
    }
}

#[test]
fn weak_value_keeps_weak_key_of_another_registry() {
    // fixpoint: key2 is reachable only through registry 1's value
    let mut st = State::open();
    let w1 = st.alloc(Object::Weak(WeakTable::default()));
    let w2 = st.alloc(Object::Weak(WeakTable::default()));
    let (Value::Obj(r1), Value::Obj(r2)) = (w1, w2) else {
        unreachable!()
    };

    let key1 = st.make_uninterned("key1");
    let ai = st.gc_arena_preserve();
    let key2 = st.make_uninterned("key2");
    let val2 = st.make_str(b"deep");
    if let Object::Weak(t) = st.heap.get_mut(r1) {
        t.map.insert(key1, Value::Obj(key2));
    }
    if let Object::Weak(t) = st.heap.get_mut(r2) {
        t.map.insert(key2, val2);
    }
    st.gc_arena_restore(ai);

    // key1 is pinned, so registry 1 keeps key2 alive, which keeps
    // registry 2's entry alive
    st.gc_run();
    match st.heap.get(r2) {
        Object::Weak(t) => assert_eq!(t.map.len(), 1),
        _ => unreachable!(),
    }
}

#[test]
fn unreferenced_interned_symbols_are_pruned() {
    let mut st = State::open();
    let ai = st.gc_arena_preserve();
    st.intern("gc-test-unique-symbol");
    assert!(st.syms.contains_key("gc-test-unique-symbol"));
    st.gc_arena_restore(ai);
    st.gc_run();
    assert!(!st.syms.contains_key("gc-test-unique-symbol"));
}

#[test]
fn interning_is_idempotent_while_reachable() {
    let mut st = State::open();
    let a = st.intern("stable");
    st.gc_run();
    let b = st.intern("stable");
    assert_eq!(a, b);
}
