// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stop-the-world mark-sweep collection.
//!
//! Collection runs only at allocation points; all mutators are
//! quiescent. Marking starts from the explicit root set, descends with
//! a worklist (bounded native stack regardless of structure depth), and
//! then iterates weak registries to a fixpoint: a registry entry's
//! value is live exactly when its key is, and a key may become live
//! through another registry. Sweeping prunes dead weak entries and
//! unreferenced interned symbols, finalizes unmarked cells, and
//! requests a fresh page when less than a quarter of all cells remain
//! free.

#[cfg(test)]
mod gc_test;

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::bytecode::Irep;
use crate::state::State;
use crate::value::{ContextRegs, Object, ObjRef, Proc, Value};

struct GcCtx {
    work: Vec<ObjRef>,
    /// Weak registries reached during marking; their entries go through
    /// the fixpoint instead of the normal closure.
    regs: Vec<ObjRef>,
    /// Code templates visited this cycle (they are shared `Rc`s, not
    /// heap cells, so they carry no mark bit).
    irep_seen: FxHashSet<usize>,
}

/// Run one full collection cycle.
pub(crate) fn run(st: &mut State) {
    if !st.gc_enabled {
        return;
    }
    let mut ctx = GcCtx {
        work: Vec::with_capacity(64),
        regs: Vec::new(),
        irep_seen: FxHashSet::default(),
    };
    mark_phase(st, &mut ctx);
    sweep_phase(st, &ctx.regs);
}

fn mark_value(st: &mut State, ctx: &mut GcCtx, v: Value) {
    if let Value::Obj(r) = v {
        mark_obj(st, ctx, r);
    }
}

fn mark_obj(st: &mut State, ctx: &mut GcCtx, r: ObjRef) {
    if st.heap.mark(r) {
        ctx.work.push(r);
        drain(st, ctx);
    }
}

fn drain(st: &mut State, ctx: &mut GcCtx) {
    while let Some(r) = ctx.work.pop() {
        trace(st, ctx, r);
    }
}

/// Mark the owned edges of one object.
fn trace(st: &mut State, ctx: &mut GcCtx, r: ObjRef) {
    let mut vals: Vec<Value> = Vec::new();
    let mut objs: Vec<ObjRef> = Vec::new();
    let mut ireps: Vec<Rc<Irep>> = Vec::new();

    match st.heap.get(r) {
        Object::Pair(p) => {
            vals.push(p.car);
            vals.push(p.cdr);
        }
        Object::Str(_) | Object::Blob(_) | Object::Symbol(_) | Object::Port(_) => {}
        Object::Vector(v) => vals.extend_from_slice(v),
        Object::Dict(d) => {
            for (&k, &v) in d {
                objs.push(k);
                vals.push(v);
            }
        }
        Object::Weak(_) => {
            // register for the fixpoint; entries are not marked here
            ctx.regs.push(r);
        }
        Object::Ident(id) => {
            vals.push(id.name);
            objs.push(id.env);
        }
        Object::Env(e) => {
            for (&k, &v) in &e.map {
                objs.push(k);
                objs.push(v);
            }
            if let Some(up) = e.up {
                objs.push(up);
            }
            if let Some(lib) = e.lib {
                objs.push(lib);
            }
        }
        Object::Proc(Proc::Native { locals, .. }) => vals.extend_from_slice(locals),
        Object::Proc(Proc::Closure { irep, cxt }) => {
            ireps.push(Rc::clone(irep));
            if let Some(c) = cxt {
                objs.push(*c);
            }
        }
        Object::Context(c) => {
            // frame-resident registers are covered by the stack roots
            if let ContextRegs::Heap(regs) = &c.regs {
                vals.extend_from_slice(regs);
            }
            if let Some(up) = c.up {
                objs.push(up);
            }
        }
        Object::Error(e) => {
            objs.push(e.etype);
            objs.push(e.msg);
            vals.push(e.irritants);
            objs.push(e.stack);
        }
        Object::Record(rec) => {
            vals.push(rec.rtype);
            vals.push(rec.datum);
        }
        Object::Checkpoint(cp) => {
            for o in [cp.wind_in, cp.wind_out, cp.prev].into_iter().flatten() {
                objs.push(o);
            }
        }
    }

    for v in vals {
        if let Value::Obj(o) = v {
            if st.heap.mark(o) {
                ctx.work.push(o);
            }
        }
    }
    for o in objs {
        if st.heap.mark(o) {
            ctx.work.push(o);
        }
    }
    for ir in ireps {
        mark_irep(st, ctx, &ir);
    }
}

/// Mark a code template's pooled objects and nested templates.
fn mark_irep(st: &mut State, ctx: &mut GcCtx, ir: &Rc<Irep>) {
    if !ctx.irep_seen.insert(Rc::as_ptr(ir) as usize) {
        return;
    }
    for &v in &ir.pool {
        if let Value::Obj(o) = v {
            if st.heap.mark(o) {
                ctx.work.push(o);
            }
        }
    }
    drain(st, ctx);
    for child in &ir.irep {
        mark_irep(st, ctx, child);
    }
}

/// Enumerate every root exactly once and close over reachability.
fn mark_phase(st: &mut State, ctx: &mut GcCtx) {
    // dynamic-wind checkpoint chain
    if let Some(cp) = st.checkpoint {
        mark_obj(st, ctx, cp);
    }

    // operand stack
    for i in 0..st.stack.len() {
        let v = st.stack[i];
        mark_value(st, ctx, v);
    }

    // call-info frames: contexts, parent contexts and executing code
    for i in 0..st.ci.len() {
        let (cxt, up, irep, ret_code) = {
            let ci = &st.ci[i];
            (ci.cxt, ci.up, ci.irep.clone(), ci.ret_code.clone())
        };
        if let Some(c) = cxt {
            mark_obj(st, ctx, c);
        }
        if let Some(c) = up {
            mark_obj(st, ctx, c);
        }
        if let Some(ir) = irep {
            mark_irep(st, ctx, &ir);
        }
        mark_irep(st, ctx, &ret_code);
    }

    // exception handlers
    for i in 0..st.handlers.len() {
        let h = st.handlers[i].proc;
        mark_obj(st, ctx, h);
    }

    // arena pins
    for i in 0..st.arena.len() {
        let r = st.arena[i];
        mark_obj(st, ctx, r);
    }

    // reserved syntax-keyword symbols
    let res = st.reserved;
    for r in [
        res.quote,
        res.quasiquote,
        res.unquote,
        res.unquote_splicing,
        res.syntax_quote,
        res.syntax_quasiquote,
        res.syntax_unquote,
        res.syntax_unquote_splicing,
    ] {
        mark_obj(st, ctx, r);
    }

    // canonical primitive procedures and their slots
    for i in 0..st.prims.len() {
        let e = st.prims[i];
        mark_value(st, ctx, e.proc);
        mark_value(st, ctx, e.slot);
    }

    // global tables
    let globals = st.globals;
    mark_obj(st, ctx, globals);
    let macros = st.macros;
    mark_obj(st, ctx, macros);
    let features = st.features;
    mark_value(st, ctx, features);
    let ptable = st.ptable;
    mark_value(st, ctx, ptable);

    // libraries
    for i in 0..st.libs.len() {
        let (env, exports) = (st.libs[i].env, st.libs[i].exports);
        mark_obj(st, ctx, env);
        mark_obj(st, ctx, exports);
    }

    // current error value
    let err = st.err;
    mark_value(st, ctx, err);

    // weak registries: mark values whose keys are live, to a fixpoint;
    // marking may reach further registries, which join the iteration
    loop {
        let mut added = 0usize;
        let mut i = 0;
        while i < ctx.regs.len() {
            let reg = ctx.regs[i];
            i += 1;
            let mut pending: Vec<Value> = Vec::new();
            if let Object::Weak(w) = st.heap.get(reg) {
                for (&k, &v) in &w.map {
                    if st.heap.is_marked(k) {
                        if let Value::Obj(o) = v {
                            if !st.heap.is_marked(o) {
                                pending.push(v);
                            }
                        }
                    }
                }
            }
            for v in pending {
                added += 1;
                mark_value(st, ctx, v);
            }
        }
        if added == 0 {
            break;
        }
    }
}

/// Prune weak registries and the symbol table, then sweep the pages.
fn sweep_phase(st: &mut State, regs: &[ObjRef]) {
    for &reg in regs {
        let dead: Vec<ObjRef> = match st.heap.get(reg) {
            Object::Weak(w) => w
                .map
                .keys()
                .copied()
                .filter(|&k| !st.heap.is_marked(k))
                .collect(),
            _ => Vec::new(),
        };
        if let Object::Weak(w) = st.heap.get_mut(reg) {
            for k in dead {
                w.map.remove(&k);
            }
        }
    }

    // interned symbols nothing names anymore are reclaimed
    let heap = &st.heap;
    st.syms.retain(|_, r| heap.is_marked(*r));

    let stats = st.heap.sweep();
    tracing::debug!(
        swept = stats.swept,
        alive = stats.alive,
        total = stats.total,
        pages = st.heap.page_count(),
        "gc cycle"
    );

    // keep at least a quarter of the cells free
    if stats.alive * 4 > stats.total * 3 {
        st.heap.grow();
    }
}
