// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in procedures.
//!
//! Natives unpack their arguments through the bridge and funnel every
//! failure through the exception machinery, so interpreted handlers
//! observe the same error shape no matter where a failure originated.
//!
//! The canonical inline primitives (`cons`, `car`, arithmetic, ...) are
//! registered together with their global slots; the VM consults the
//! slot at run time to decide whether an inline opcode may take its
//! fast path.


pub(crate) mod arithmetic;
mod exception;
mod misc;
mod pair;
mod string;

pub(crate) use misc::native_var_call;

use crate::state::{PrimEntry, PrimKind, State, PRIM_COUNT};
use crate::value::{NativeFn, Object, Proc, Value};

/// Register the whole built-in procedure set on a fresh state.
pub(crate) fn init(st: &mut State) {
    st.prims = vec![
        PrimEntry {
            proc: Value::Undef,
            slot: Value::Undef,
        };
        PRIM_COUNT
    ];

    pair::init(st);
    arithmetic::init(st);
    string::init(st);
    exception::init(st);
    misc::init(st);

    debug_assert!(st.prims.iter().all(|e| !matches!(e.proc, Value::Undef)));
}

/// Define a canonical primitive and remember its procedure and global
/// slot for the VM's inline fast path.
pub(crate) fn defun_prim(st: &mut State, kind: PrimKind, name: &str, func: NativeFn) {
    let proc = st.alloc(Object::Proc(Proc::Native {
        func,
        locals: Vec::new(),
    }));
    st.define(name, proc);

    let sym = st.intern(name);
    let env = st.libs[st.cur_lib].env;
    let uid = st
        .find_variable(env, sym)
        .expect("logic flaw: primitive not bound");
    let slot = st.gref_slot(uid);
    st.prims[kind as usize] = PrimEntry { proc, slot };
}
