// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The bytecode virtual machine.
//!
//! `apply` pushes the procedure and its arguments on the operand stack,
//! installs a two-instruction bootstrap (`CALL argc; STOP`) and enters
//! the dispatch loop. Interpreted calls push an activation record on
//! the call-info stack; native calls run through the bridge and return
//! as if the next opcode were `RET`. Tail calls shift the argument
//! window down over the current frame and reuse it, so loops run in
//! constant stack.
//!
//! A frame's registers live in its stack window until a closure
//! captures them; `tear_off` migrates them into the heap-owned context
//! before every non-local exit (return, tail call, unwind).

#[cfg(test)]
mod vm_test;

use std::rc::Rc;

use crate::bytecode::{Insn, Irep};
use crate::error::Unwind;
use crate::intrinsics::arithmetic;
use crate::state::{PrimKind, State};
use crate::value::{ContextRegs, Object, ObjRef, Proc, Value};

/// Operand stack limit in slots.
const STACK_LIMIT: usize = 1 << 16;
/// Call-info stack limit.
const CI_LIMIT: usize = 1 << 13;

/// An activation record.
#[derive(Debug)]
pub(crate) struct CallInfo {
    /// Stack slots taken by the call (callee plus arguments).
    pub argc: i32,
    /// Values produced by the return.
    pub retc: i32,
    /// Caller resume point.
    pub ret_pc: usize,
    pub ret_code: Rc<Irep>,
    /// Frame pointer: stack index of the callee slot.
    pub fp: usize,
    /// Template of the running procedure (interpreted frames).
    pub irep: Option<Rc<Irep>>,
    /// Context allocated for this frame, if a lambda captured it.
    pub cxt: Option<ObjRef>,
    /// Parent context of the running procedure.
    pub up: Option<ObjRef>,
    /// Number of capture registers.
    pub regc: usize,
    /// Absolute stack index of the capture region.
    pub regs: usize,
}

/// Apply a procedure to arguments and run to completion.
pub fn apply(st: &mut State, proc: Value, args: &[Value]) -> Result<Value, Unwind> {
    let ai = st.gc_arena_preserve();
    let sp_base = st.stack.len();
    let ci_base = st.ci.len();

    st.stack.push(proc);
    for &a in args {
        st.stack.push(a);
    }

    let boot = Rc::new(Irep::boot(args.len() as i32 + 1));
    match run(st, boot, ai) {
        Ok(v) => {
            st.gc_arena_restore(ai);
            Ok(st.gc_protect(v))
        }
        Err(u) => {
            // frames between here and the raise were torn off already
            st.stack.truncate(sp_base);
            st.ci.truncate(ci_base);
            st.gc_arena_restore(ai);
            Err(u)
        }
    }
}

/// Read a global slot, raising on the uninitialized sentinel.
pub(crate) fn gref(st: &mut State, slot: Value) -> Result<Value, Unwind> {
    let (car, cdr) = match slot {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Pair(p) => (p.car, p.cdr),
            _ => panic!("logic flaw: global slot is not a pair"),
        },
        _ => panic!("logic flaw: global slot is not a pair"),
    };
    if matches!(cdr, Value::Invalid) {
        return Err(st.errorf("uninitialized global variable: ~a", &[car]));
    }
    Ok(cdr)
}

/// Migrate one frame's registers into its context.
fn tear_off_frame(st: &mut State, idx: usize) {
    let Some(cr) = st.ci[idx].cxt else {
        return;
    };
    let (base, regc, torn) = match st.heap.get(cr) {
        Object::Context(c) => match c.regs {
            ContextRegs::Frame(b) => (b, c.regc, false),
            ContextRegs::Heap(_) => (0, 0, true),
        },
        _ => panic!("logic flaw: frame context is not a context"),
    };
    if torn {
        return;
    }
    let vals = st.stack[base..base + regc].to_vec();
    if let Object::Context(c) = st.heap.get_mut(cr) {
        c.regs = ContextRegs::Heap(vals);
    }
}

/// Tear off every live frame. Called before any non-local exit.
pub(crate) fn tear_off_all(st: &mut State) {
    for idx in 0..st.ci.len() {
        tear_off_frame(st, idx);
    }
}

fn jump(pc: usize, off: i32) -> usize {
    (pc as i64 + i64::from(off)) as usize
}

/// Is the inline fast path for `kind` still valid at this call site?
fn prim_ok(st: &State, kind: PrimKind, insn_argc: i32) -> bool {
    if insn_argc != kind.arity() + 1 {
        return false;
    }
    let e = st.prims[kind as usize];
    let Value::Obj(r) = e.slot else {
        return false;
    };
    match st.heap.get(r) {
        Object::Pair(p) => p.cdr == e.proc,
        _ => false,
    }
}

/// Perform a call of `argc` stack slots. For interpreted callees this
/// switches `code`/`pc` into the callee; for native callees it runs the
/// function and performs the return inline. `tail` reuses the current
/// frame.
fn op_call(
    st: &mut State,
    code: &mut Rc<Irep>,
    pc: &mut usize,
    n: i32,
    ai: usize,
    tail: bool,
) -> Result<(), Unwind> {
    let mut argc = n;
    let mut ret_pc = *pc;
    let mut ret_code = Rc::clone(code);

    if tail {
        if st.ci.last().is_some_and(|ci| ci.cxt.is_some()) {
            let idx = st.ci.len() - 1;
            tear_off_frame(st, idx);
        }
        if argc == -1 {
            argc = st.last_retc + 1;
        }
        let ci = st.ci.pop().expect("logic flaw: tail call without frame");
        st.last_retc = ci.retc;
        let a = argc as usize;
        let sp = st.stack.len();
        for i in 0..a {
            st.stack[ci.fp + i] = st.stack[sp - a + i];
        }
        st.stack.truncate(ci.fp + a);
        ret_pc = ci.ret_pc;
        ret_code = ci.ret_code;
    } else if argc == -1 {
        argc = st.last_retc + 1;
    }

    let a = argc as usize;
    let sp = st.stack.len();
    let x = st.stack[sp - a];
    let proc = match x {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Proc(p) => Some(p.clone()),
            _ => None,
        },
        _ => None,
    };
    let Some(proc) = proc else {
        return Err(st.errorf("invalid application: ~s", &[x]));
    };

    assert!(st.stack.len() < STACK_LIMIT, "VM stack overflow");
    assert!(st.ci.len() < CI_LIMIT, "VM stack overflow");

    st.ci.push(CallInfo {
        argc,
        retc: 1,
        ret_pc,
        ret_code,
        fp: sp - a,
        irep: None,
        cxt: None,
        up: None,
        regc: 0,
        regs: 0,
    });

    match proc {
        Proc::Native { func, .. } => {
            let v = func(st)?;
            let ci = st.ci.pop().expect("logic flaw: native frame vanished");
            st.last_retc = ci.retc;
            st.stack.truncate(ci.fp);
            st.stack.push(v);
            *pc = ci.ret_pc;
            *code = ci.ret_code;
            st.gc_arena_restore(ai);
        }
        Proc::Closure { irep, cxt } => {
            if argc != irep.argc && !(irep.varg && argc >= irep.argc) {
                let at_least = if irep.varg { "at least " } else { "" };
                st.ci.pop();
                return Err(st.errorf(
                    &format!(
                        "wrong number of arguments ({} for {}{})",
                        argc - 1,
                        at_least,
                        irep.argc - 1
                    ),
                    &[],
                ));
            }

            // collect surplus arguments into the rest list
            if irep.varg {
                let mut rest = Value::Nil;
                for _ in 0..(argc - irep.argc) {
                    let v = st.stack.pop().expect("logic flaw: missing argument");
                    st.gc_protect(v);
                    rest = st.cons(v, rest);
                }
                st.stack.push(rest);
            }

            // local variable area
            let localc = irep.localc - i32::from(irep.varg);
            for _ in 0..localc {
                st.stack.push(Value::Undef);
            }

            let ci = st.ci.last_mut().expect("logic flaw: frame vanished");
            ci.up = cxt;
            ci.regc = irep.capturec as usize;
            ci.regs = ci.fp + (irep.argc + irep.localc) as usize;
            ci.irep = Some(Rc::clone(&irep));

            *code = irep;
            *pc = 0;
            st.gc_arena_restore(ai);
        }
    }
    Ok(())
}

/// Return the single value on top of the stack to the caller.
fn op_ret(st: &mut State, code: &mut Rc<Irep>, pc: &mut usize) {
    let idx = st.ci.len() - 1;
    tear_off_frame(st, idx);
    let ci = st.ci.pop().expect("logic flaw: return without frame");
    st.last_retc = ci.retc;
    let v = st.stack.pop().expect("logic flaw: return without value");
    st.stack.truncate(ci.fp);
    st.stack.push(v);
    *pc = ci.ret_pc;
    *code = ci.ret_code;
}

/// Capture the current frame's context and close over a child template.
fn op_lambda(st: &mut State, code: &Rc<Irep>, i: u32, ai: usize) -> Result<(), Unwind> {
    let idx = st.ci.len() - 1;
    if st.ci[idx].cxt.is_none() {
        let (up, regc, regs) = {
            let ci = &st.ci[idx];
            (ci.up, ci.regc, ci.regs)
        };
        let cxt = st.make_context(up, regc, regs);
        st.ci[idx].cxt = Some(cxt);
    }
    let cxt = st.ci[idx].cxt;
    let irep = Rc::clone(&code.irep[i as usize]);
    let proc = st.alloc(Object::Proc(Proc::Closure { irep, cxt }));
    st.stack.push(proc);
    st.gc_arena_restore(ai);
    Ok(())
}

fn context_up(st: &State, cxt: ObjRef) -> Option<ObjRef> {
    match st.heap.get(cxt) {
        Object::Context(c) => c.up,
        _ => panic!("logic flaw: not a context"),
    }
}

fn context_read(st: &State, cxt: ObjRef, idx: usize) -> Value {
    match st.heap.get(cxt) {
        Object::Context(c) => match &c.regs {
            ContextRegs::Frame(base) => st.stack[base + idx],
            ContextRegs::Heap(regs) => regs[idx],
        },
        _ => panic!("logic flaw: not a context"),
    }
}

fn context_write(st: &mut State, cxt: ObjRef, idx: usize, v: Value) {
    let base = match st.heap.get(cxt) {
        Object::Context(c) => match &c.regs {
            ContextRegs::Frame(base) => Some(*base),
            ContextRegs::Heap(_) => None,
        },
        _ => panic!("logic flaw: not a context"),
    };
    match base {
        Some(base) => st.stack[base + idx] = v,
        None => {
            if let Object::Context(c) = st.heap.get_mut(cxt) {
                if let ContextRegs::Heap(regs) = &mut c.regs {
                    regs[idx] = v;
                }
            }
        }
    }
}

/// Resolve the context `depth` levels above the current frame.
fn walk_up(st: &State, depth: u16) -> ObjRef {
    let mut cxt = st
        .ci
        .last()
        .and_then(|ci| ci.up)
        .expect("logic flaw: capture reference without context");
    for _ in 1..depth {
        cxt = context_up(st, cxt).expect("logic flaw: context chain too short");
    }
    cxt
}

/// Frame register access: reads through the torn-off context when the
/// register lives in the capture region of a migrated frame.
fn lref(st: &State, code: &Irep, i: usize) -> Value {
    let (fp, cxt) = {
        let ci = st.ci.last().expect("logic flaw: no frame");
        (ci.fp, ci.cxt)
    };
    if let Some(cr) = cxt {
        if let Object::Context(c) = st.heap.get(cr) {
            if let ContextRegs::Heap(regs) = &c.regs {
                let base = (code.argc + code.localc) as usize;
                if i >= base {
                    return regs[i - base];
                }
            }
        }
    }
    st.stack[fp + i]
}

fn lset(st: &mut State, code: &Irep, i: usize, v: Value) {
    let (fp, cxt) = {
        let ci = st.ci.last().expect("logic flaw: no frame");
        (ci.fp, ci.cxt)
    };
    if let Some(cr) = cxt {
        let torn = matches!(
            st.heap.get(cr),
            Object::Context(c) if c.is_torn_off()
        );
        if torn {
            let base = (code.argc + code.localc) as usize;
            if i >= base {
                if let Object::Context(c) = st.heap.get_mut(cr) {
                    if let ContextRegs::Heap(regs) = &mut c.regs {
                        regs[i - base] = v;
                        return;
                    }
                }
            }
        }
    }
    st.stack[fp + i] = v;
}

/// The dispatch loop.
fn run(st: &mut State, boot: Rc<Irep>, ai: usize) -> Result<Value, Unwind> {
    let mut code = boot;
    let mut pc: usize = 0;

    macro_rules! push {
        ($v:expr) => {
            st.stack.push($v)
        };
    }
    macro_rules! pop {
        () => {
            st.stack.pop().expect("logic flaw: operand stack underflow")
        };
    }

    loop {
        let insn = code.code[pc];
        pc += 1;

        match insn {
            Insn::Nop => {}
            Insn::Pop => {
                pop!();
            }
            Insn::PushUndef => push!(Value::Undef),
            Insn::PushNil => push!(Value::Nil),
            Insn::PushTrue => push!(Value::Bool(true)),
            Insn::PushFalse => push!(Value::Bool(false)),
            Insn::PushEof => push!(Value::Eof),
            Insn::PushInt(i) => push!(Value::Int(code.ints[i as usize])),
            Insn::PushFloat(i) => push!(Value::Float(code.doubles[i as usize])),
            Insn::PushChar(i) => push!(Value::Char(code.ints[i as usize] as u8)),
            Insn::PushConst(i) => push!(code.pool[i as usize]),
            Insn::Gref(i) => {
                let slot = code.pool[i as usize];
                let v = gref(st, slot)?;
                push!(v);
            }
            Insn::Gset(i) => {
                let slot = code.pool[i as usize];
                let v = pop!();
                st.slot_set(slot, v);
                push!(Value::Undef);
            }
            Insn::Lref(i) => {
                let v = lref(st, &code, i as usize);
                push!(v);
            }
            Insn::Lset(i) => {
                let v = pop!();
                lset(st, &code, i as usize, v);
                push!(Value::Undef);
            }
            Insn::Cref(depth, idx) => {
                let cxt = walk_up(st, depth);
                let v = context_read(st, cxt, idx as usize);
                push!(v);
            }
            Insn::Cset(depth, idx) => {
                let v = pop!();
                let cxt = walk_up(st, depth);
                context_write(st, cxt, idx as usize, v);
                push!(Value::Undef);
            }
            Insn::Jmp(off) => {
                pc = jump(pc, off);
            }
            Insn::Jmpif(off) => {
                let v = pop!();
                if v.is_truthy() {
                    pc = jump(pc, off);
                }
            }
            Insn::Call(n) => op_call(st, &mut code, &mut pc, n, ai, false)?,
            Insn::Tailcall(n) => op_call(st, &mut code, &mut pc, n, ai, true)?,
            Insn::Ret => op_ret(st, &mut code, &mut pc),
            Insn::Lambda(i) => op_lambda(st, &code, i, ai)?,

            Insn::Not(n) => {
                if prim_ok(st, PrimKind::Not, n) {
                    let v = pop!();
                    pop!();
                    push!(Value::Bool(v.is_false()));
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Cons(n) => {
                if prim_ok(st, PrimKind::Cons, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    st.gc_protect(a);
                    st.gc_protect(b);
                    let v = st.cons(a, b);
                    push!(v);
                    st.gc_arena_restore(ai);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Car(n) => {
                if prim_ok(st, PrimKind::Car, n) {
                    let p = pop!();
                    pop!();
                    let v = st.car(p)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Cdr(n) => {
                if prim_ok(st, PrimKind::Cdr, n) {
                    let p = pop!();
                    pop!();
                    let v = st.cdr(p)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Nilp(n) => {
                if prim_ok(st, PrimKind::Nilp, n) {
                    let v = pop!();
                    pop!();
                    push!(Value::Bool(v.is_nil()));
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Symbolp(n) => {
                if prim_ok(st, PrimKind::Symbolp, n) {
                    let v = pop!();
                    pop!();
                    let is =
                        matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Symbol(_)));
                    push!(Value::Bool(is));
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Pairp(n) => {
                if prim_ok(st, PrimKind::Pairp, n) {
                    let v = pop!();
                    pop!();
                    let is =
                        matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Pair(_)));
                    push!(Value::Bool(is));
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Add(n) => {
                if prim_ok(st, PrimKind::Add, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::add(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Sub(n) => {
                if prim_ok(st, PrimKind::Sub, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::sub(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Mul(n) => {
                if prim_ok(st, PrimKind::Mul, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::mul(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Div(n) => {
                if prim_ok(st, PrimKind::Div, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::div(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Eq(n) => {
                if prim_ok(st, PrimKind::Eq, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::num_eq(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Lt(n) => {
                if prim_ok(st, PrimKind::Lt, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::num_lt(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Le(n) => {
                if prim_ok(st, PrimKind::Le, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::num_le(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Gt(n) => {
                if prim_ok(st, PrimKind::Gt, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::num_gt(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }
            Insn::Ge(n) => {
                if prim_ok(st, PrimKind::Ge, n) {
                    let b = pop!();
                    let a = pop!();
                    pop!();
                    let v = arithmetic::num_ge(st, a, b)?;
                    push!(v);
                } else {
                    op_call(st, &mut code, &mut pc, n, ai, false)?;
                }
            }

            Insn::Stop => {
                let v = pop!();
                return Ok(v);
            }
        }
    }
}
