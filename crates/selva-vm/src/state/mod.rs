// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The interpreter state and embedding API.
//!
//! All mutable runtime state lives in one [`State`]: the heap, the
//! operand and call-info stacks, the handler stack, the arena, the
//! symbol table, the global registries and the library table. There are
//! no process-wide singletons; every entry point takes the state
//! explicitly. Initialization builds the heap first, then the stacks,
//! then the tables; teardown reverses (the stacks and tables drop
//! before the heap their contents point into).

#[cfg(test)]
mod state_test;

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::Irep;
use crate::compiler;
use crate::error::{self, Handler, Unwind};
use crate::heap::Heap;
use crate::reader;
use crate::value::{Context, Object, ObjRef, Pair, Proc, Type, Value};
use crate::vm::{self, CallInfo};
use crate::Error;

/// A registered library: a name, a top-level environment and an export
/// table. The object model has no library tag, so libraries are state
/// entries enumerated as GC roots.
#[derive(Debug)]
pub(crate) struct Library {
    pub name: String,
    pub env: ObjRef,
    pub exports: ObjRef,
}

/// The canonical primitives the VM can inline.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum PrimKind {
    Cons,
    Car,
    Cdr,
    Nilp,
    Symbolp,
    Pairp,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

pub(crate) const PRIM_COUNT: usize = 16;

impl PrimKind {
    /// Number of arguments the primitive takes.
    pub(crate) const fn arity(self) -> i32 {
        match self {
            Self::Car | Self::Cdr | Self::Nilp | Self::Symbolp | Self::Pairp | Self::Not => 1,
            _ => 2,
        }
    }
}

/// Canonical primitive procedure and the global slot it was defined in.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PrimEntry {
    pub proc: Value,
    pub slot: Value,
}

/// Interned syntax-keyword symbols, marked as GC roots.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Reserved {
    pub quote: ObjRef,
    pub quasiquote: ObjRef,
    pub unquote: ObjRef,
    pub unquote_splicing: ObjRef,
    pub syntax_quote: ObjRef,
    pub syntax_quasiquote: ObjRef,
    pub syntax_unquote: ObjRef,
    pub syntax_unquote_splicing: ObjRef,
}

const NO_REF: ObjRef = ObjRef(u32::MAX);

/// One interpreter instance. Single-threaded; never share across
/// threads.
///
/// Field order is teardown order: the tables and stacks drop before
/// the heap that their contents point into.
#[derive(Debug)]
pub struct State {
    pub(crate) stack: Vec<Value>,
    pub(crate) ci: Vec<CallInfo>,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) arena: Vec<ObjRef>,

    pub(crate) syms: FxHashMap<String, ObjRef>,
    pub(crate) globals: ObjRef,
    pub(crate) macros: ObjRef,
    pub(crate) features: Value,
    pub(crate) libs: Vec<Library>,
    pub(crate) cur_lib: usize,
    pub(crate) prev_lib: Option<usize>,
    pub(crate) ptable: Value,

    pub(crate) checkpoint: Option<ObjRef>,
    pub(crate) err: Value,

    pub(crate) fold_case: bool,
    pub(crate) ucnt: u32,
    pub(crate) catch_seq: u64,
    pub(crate) last_retc: i32,

    pub(crate) reserved: Reserved,
    pub(crate) prims: Vec<PrimEntry>,

    pub(crate) gc_enabled: bool,

    pub(crate) heap: Heap,
}

/// The default library every state opens into.
pub const BASE_LIBRARY: &str = "selva.base";

impl State {
    /// Initialize a fresh interpreter: heap, stacks, tables, reader
    /// state, the base library and the built-in procedures.
    #[must_use]
    pub fn open() -> Box<Self> {
        let mut st = Box::new(Self {
            stack: Vec::with_capacity(256),
            ci: Vec::with_capacity(64),
            handlers: Vec::new(),
            arena: Vec::with_capacity(64),
            syms: FxHashMap::default(),
            globals: NO_REF,
            macros: NO_REF,
            features: Value::Nil,
            libs: Vec::new(),
            cur_lib: 0,
            prev_lib: None,
            ptable: Value::Nil,
            checkpoint: None,
            err: Value::Undef,
            fold_case: false,
            ucnt: 0,
            catch_seq: 0,
            last_retc: 1,
            reserved: Reserved {
                quote: NO_REF,
                quasiquote: NO_REF,
                unquote: NO_REF,
                unquote_splicing: NO_REF,
                syntax_quote: NO_REF,
                syntax_quasiquote: NO_REF,
                syntax_unquote: NO_REF,
                syntax_unquote_splicing: NO_REF,
            },
            prims: Vec::new(),
            gc_enabled: false,
            heap: Heap::new(),
        });

        st.reserved = Reserved {
            quote: st.intern("quote"),
            quasiquote: st.intern("quasiquote"),
            unquote: st.intern("unquote"),
            unquote_splicing: st.intern("unquote-splicing"),
            syntax_quote: st.intern("syntax-quote"),
            syntax_quasiquote: st.intern("syntax-quasiquote"),
            syntax_unquote: st.intern("syntax-unquote"),
            syntax_unquote_splicing: st.intern("syntax-unquote-splicing"),
        };

        st.globals = st.alloc_ref(Object::Weak(crate::value::WeakTable::default()));
        st.macros = st.alloc_ref(Object::Weak(crate::value::WeakTable::default()));

        st.make_library(BASE_LIBRARY);
        st.in_library(BASE_LIBRARY);

        crate::intrinsics::init(&mut st);
        st.add_feature("selva");

        st.arena.clear();
        st.gc_enabled = true;
        tracing::debug!("state opened");
        st
    }

    /// Tear the interpreter down, dropping every page of the heap.
    pub fn close(self: Box<Self>) {
        tracing::debug!("state closed");
        drop(self);
    }

    /// Register a feature symbol on the features list.
    pub fn add_feature(&mut self, name: &str) {
        let sym = self.intern(name);
        let tail = self.features;
        self.features = self.cons(Value::Obj(sym), tail);
    }

    // ---- allocation and GC interface ----------------------------------

    /// Allocate a boxed object, pin it on the arena and return it.
    pub fn alloc(&mut self, obj: Object) -> Value {
        Value::Obj(self.alloc_ref(obj))
    }

    pub(crate) fn alloc_ref(&mut self, obj: Object) -> ObjRef {
        let r = self.alloc_ref_unsafe(obj);
        self.arena.push(r);
        r
    }

    /// Allocation without arena protection, for callers that install
    /// the object into a rooted location before the next allocation.
    pub(crate) fn alloc_ref_unsafe(&mut self, obj: Object) -> ObjRef {
        match self.heap.alloc(obj) {
            Ok(r) => r,
            Err(obj) => {
                crate::gc::run(self);
                match self.heap.alloc(obj) {
                    Ok(r) => r,
                    Err(obj) => {
                        self.heap.grow();
                        match self.heap.alloc(obj) {
                            Ok(r) => r,
                            Err(_) => panic!("GC memory exhausted"),
                        }
                    }
                }
            }
        }
    }

    /// Pin a heap value on the arena so it survives the next
    /// allocation. Immediates pass through.
    pub fn gc_protect(&mut self, v: Value) -> Value {
        if let Value::Obj(r) = v {
            self.arena.push(r);
        }
        v
    }

    /// Save the arena height for a scoped allocation region.
    #[must_use]
    pub fn gc_arena_preserve(&self) -> usize {
        self.arena.len()
    }

    /// Drop every arena pin pushed since `mark`.
    pub fn gc_arena_restore(&mut self, mark: usize) {
        self.arena.truncate(mark);
    }

    /// Run a full collection cycle.
    pub fn gc_run(&mut self) {
        crate::gc::run(self);
    }

    // ---- symbols ------------------------------------------------------

    /// Intern a symbol. Idempotent: equal names return the same object
    /// for as long as it stays reachable.
    pub fn intern(&mut self, name: &str) -> ObjRef {
        if let Some(&r) = self.syms.get(name) {
            return r;
        }
        let r = self.alloc_ref(Object::Symbol(name.into()));
        self.syms.insert(name.to_owned(), r);
        r
    }

    /// Create a fresh symbol that is not in the symbol table. Used for
    /// unique global identifiers.
    pub(crate) fn make_uninterned(&mut self, name: &str) -> ObjRef {
        self.alloc_ref(Object::Symbol(name.into()))
    }

    /// The name of a symbol.
    #[must_use]
    pub fn symbol_name(&self, sym: ObjRef) -> &str {
        match self.heap.get(sym) {
            Object::Symbol(name) => name,
            _ => panic!("logic flaw: not a symbol"),
        }
    }

    // ---- basic constructors and accessors -----------------------------

    /// Allocate a pair.
    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        self.alloc(Object::Pair(Pair { car, cdr }))
    }

    /// Allocate a string over a copy of `bytes`.
    pub fn make_str(&mut self, bytes: &[u8]) -> Value {
        self.alloc(Object::Str(crate::rope::Rope::from_bytes(bytes)))
    }

    /// Build a proper list of `vals`.
    pub fn list(&mut self, vals: &[Value]) -> Value {
        let mut l = Value::Nil;
        for &v in vals.iter().rev() {
            l = self.cons(v, l);
        }
        l
    }

    /// The car of a pair; raises a type error otherwise.
    pub fn car(&mut self, v: Value) -> Result<Value, Unwind> {
        if let Value::Obj(r) = v {
            if let Object::Pair(p) = self.heap.get(r) {
                return Ok(p.car);
            }
        }
        Err(self.errorf("expected pair, but got ~s", &[v]))
    }

    /// The cdr of a pair; raises a type error otherwise.
    pub fn cdr(&mut self, v: Value) -> Result<Value, Unwind> {
        if let Value::Obj(r) = v {
            if let Object::Pair(p) = self.heap.get(r) {
                return Ok(p.cdr);
            }
        }
        Err(self.errorf("expected pair, but got ~s", &[v]))
    }

    /// Mutate the car of a pair.
    pub fn set_car(&mut self, v: Value, car: Value) -> Result<(), Unwind> {
        if let Value::Obj(r) = v {
            if let Object::Pair(p) = self.heap.get_mut(r) {
                p.car = car;
                return Ok(());
            }
        }
        Err(self.errorf("expected pair, but got ~s", &[v]))
    }

    /// Mutate the cdr of a pair.
    pub fn set_cdr(&mut self, v: Value, cdr: Value) -> Result<(), Unwind> {
        if let Value::Obj(r) = v {
            if let Object::Pair(p) = self.heap.get_mut(r) {
                p.cdr = cdr;
                return Ok(());
            }
        }
        Err(self.errorf("expected pair, but got ~s", &[v]))
    }

    /// Collect a proper list into a vector; raises on improper lists.
    pub fn list_vec(&mut self, list: Value) -> Result<Vec<Value>, Unwind> {
        let mut out = Vec::new();
        let mut v = list;
        loop {
            match v {
                Value::Nil => return Ok(out),
                Value::Obj(r) => match self.heap.get(r) {
                    Object::Pair(p) => {
                        out.push(p.car);
                        v = p.cdr;
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Err(self.errorf("expected proper list, but got ~s", &[list]))
    }

    /// The byte contents of a string object.
    ///
    /// Composite ropes are flattened into a single fresh chunk and the
    /// string retargeted to it, so repeated reads are O(1).
    pub fn string_bytes(&mut self, r: ObjRef) -> Vec<u8> {
        let rope = match self.heap.get(r) {
            Object::Str(rope) => rope.clone(),
            _ => panic!("logic flaw: not a string"),
        };
        if let Some(chunk) = rope.full_chunk() {
            return chunk.bytes().to_vec();
        }
        let flat = rope.flatten();
        let bytes = flat
            .full_chunk()
            .expect("logic flaw: flatten did not produce a leaf")
            .bytes()
            .to_vec();
        if let Object::Str(slot) = self.heap.get_mut(r) {
            *slot = flat;
        }
        bytes
    }

    /// Replace the rope behind a string object (string mutation is
    /// rebuilding: slice, concat, retarget).
    pub(crate) fn str_update(&mut self, dst: ObjRef, rope: crate::rope::Rope) {
        match self.heap.get_mut(dst) {
            Object::Str(slot) => *slot = rope,
            _ => panic!("logic flaw: not a string"),
        }
    }

    /// Runtime type of a value.
    ///
    /// # Panics
    ///
    /// Panics on the internal invalid sentinel, which must never reach
    /// user code.
    #[must_use]
    pub fn type_of(&self, v: Value) -> Type {
        match v {
            Value::Nil => Type::Nil,
            Value::Undef => Type::Undef,
            Value::Eof => Type::Eof,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::Char(_) => Type::Char,
            Value::Obj(r) => self.heap.get(r).type_tag(),
            Value::Invalid => panic!("logic flaw: invalid value escaped"),
        }
    }

    /// Structural equality (`equal?`). Terminates on cyclic structure.
    #[must_use]
    pub fn equal(&self, a: Value, b: Value) -> bool {
        let mut seen = FxHashSet::default();
        self.equal_inner(a, b, &mut seen)
    }

    fn equal_inner(&self, a: Value, b: Value, seen: &mut FxHashSet<(ObjRef, ObjRef)>) -> bool {
        if a == b {
            return true;
        }
        let (Value::Obj(x), Value::Obj(y)) = (a, b) else {
            return false;
        };
        match (self.heap.get(x), self.heap.get(y)) {
            (Object::Pair(p), Object::Pair(q)) => {
                if !seen.insert((x, y)) {
                    return true;
                }
                let (pcar, pcdr, qcar, qcdr) = (p.car, p.cdr, q.car, q.cdr);
                self.equal_inner(pcar, qcar, seen) && self.equal_inner(pcdr, qcdr, seen)
            }
            (Object::Str(r1), Object::Str(r2)) => {
                r1.weight() == r2.weight() && r1.to_bytes() == r2.to_bytes()
            }
            (Object::Blob(b1), Object::Blob(b2)) => b1 == b2,
            (Object::Vector(v1), Object::Vector(v2)) => {
                if v1.len() != v2.len() {
                    return false;
                }
                if !seen.insert((x, y)) {
                    return true;
                }
                let pairs: Vec<(Value, Value)> =
                    v1.iter().copied().zip(v2.iter().copied()).collect();
                pairs.iter().all(|&(e1, e2)| self.equal_inner(e1, e2, seen))
            }
            _ => false,
        }
    }

    // ---- globals ------------------------------------------------------

    /// The global slot for `uid`, created on first use. A slot is a
    /// `(uid . value)` pair registered in the weak globals registry;
    /// the value starts as the invalid sentinel until defined.
    pub(crate) fn gref_slot(&mut self, uid: ObjRef) -> Value {
        if let Object::Weak(w) = self.heap.get(self.globals) {
            if let Some(&slot) = w.map.get(&uid) {
                return slot;
            }
        }
        let slot = self.cons(Value::Obj(uid), Value::Invalid);
        let Value::Obj(slot_ref) = slot else {
            unreachable!()
        };
        if let Object::Weak(w) = self.heap.get_mut(self.globals) {
            w.map.insert(uid, Value::Obj(slot_ref));
        }
        slot
    }

    pub(crate) fn slot_set(&mut self, slot: Value, v: Value) {
        if let Value::Obj(r) = slot {
            if let Object::Pair(p) = self.heap.get_mut(r) {
                p.cdr = v;
                return;
            }
        }
        panic!("logic flaw: global slot is not a pair");
    }

    // ---- environments -------------------------------------------------

    /// Look up `id` through the environment chain.
    pub(crate) fn find_variable(&self, env: ObjRef, id: ObjRef) -> Option<ObjRef> {
        let mut env = Some(env);
        while let Some(e) = env {
            let Object::Env(frame) = self.heap.get(e) else {
                panic!("logic flaw: not an environment");
            };
            if let Some(&uid) = frame.map.get(&id) {
                return Some(uid);
            }
            env = frame.up;
        }
        None
    }

    /// Bind `id` to a fresh unique symbol in `env` and return it.
    pub(crate) fn add_variable(&mut self, env: ObjRef, id: ObjRef) -> ObjRef {
        let base = match self.heap.get(id) {
            Object::Symbol(name) => name.to_string(),
            Object::Ident(_) => "identifier".to_owned(),
            _ => panic!("logic flaw: not an identifier"),
        };
        self.ucnt += 1;
        let uid = self.make_uninterned(&base);
        self.put_variable(env, id, uid);
        uid
    }

    /// Bind `id` to `uid` in `env`.
    pub(crate) fn put_variable(&mut self, env: ObjRef, id: ObjRef, uid: ObjRef) {
        match self.heap.get_mut(env) {
            Object::Env(frame) => {
                frame.map.insert(id, uid);
            }
            _ => panic!("logic flaw: not an environment"),
        }
    }

    // ---- libraries ----------------------------------------------------

    /// Register a library. Returns false when the name is taken.
    pub fn make_library(&mut self, name: &str) -> bool {
        if self.find_library(name).is_some() {
            return false;
        }
        let name_str = self.make_str(name.as_bytes());
        let name_ref = match name_str {
            Value::Obj(r) => r,
            _ => unreachable!(),
        };
        let env = self.alloc_ref(Object::Env(crate::value::Env {
            map: FxHashMap::default(),
            up: None,
            lib: Some(name_ref),
        }));
        let exports = self.alloc_ref(Object::Dict(FxHashMap::default()));
        self.libs.push(Library {
            name: name.to_owned(),
            env,
            exports,
        });
        true
    }

    /// Find a library by name.
    #[must_use]
    pub fn find_library(&self, name: &str) -> Option<usize> {
        self.libs.iter().position(|l| l.name == name)
    }

    /// Switch the current library.
    pub fn in_library(&mut self, name: &str) {
        let idx = self
            .find_library(name)
            .unwrap_or_else(|| panic!("library not found: {name}"));
        self.prev_lib = Some(self.cur_lib);
        self.cur_lib = idx;
    }

    /// Export `name` from the current library.
    pub fn export(&mut self, name: &str) {
        let sym = self.intern(name);
        let exports = self.libs[self.cur_lib].exports;
        if let Object::Dict(d) = self.heap.get_mut(exports) {
            d.insert(sym, Value::Obj(sym));
        }
    }

    /// Import every export of `name` into the current library.
    pub fn import(&mut self, name: &str) -> Result<(), Error> {
        let Some(idx) = self.find_library(name) else {
            return Err(Error::Uncaught {
                message: format!("library not found: {name}"),
            });
        };
        let src_env = self.libs[idx].env;
        let exports = self.libs[idx].exports;
        let entries: Vec<(ObjRef, Value)> = match self.heap.get(exports) {
            Object::Dict(d) => d.iter().map(|(&k, &v)| (k, v)).collect(),
            _ => Vec::new(),
        };
        let dst_env = self.libs[self.cur_lib].env;
        for (alias, realname) in entries {
            let Value::Obj(real) = realname else { continue };
            let Some(uid) = self.find_variable(src_env, real) else {
                continue;
            };
            self.put_variable(dst_env, alias, uid);
        }
        Ok(())
    }

    /// Define `name` in the current library and export it.
    pub fn define(&mut self, name: &str, v: Value) {
        let sym = self.intern(name);
        let env = self.libs[self.cur_lib].env;
        let uid = match self.find_variable(env, sym) {
            Some(uid) => uid,
            None => self.add_variable(env, sym),
        };
        let slot = self.gref_slot(uid);
        self.slot_set(slot, v);
        self.export(name);
    }

    /// Define a native procedure in the current library.
    pub fn defun(&mut self, name: &str, func: crate::value::NativeFn) {
        let proc = self.alloc(Object::Proc(Proc::Native {
            func,
            locals: Vec::new(),
        }));
        self.define(name, proc);
    }

    /// Define a parameter-like variable with an optional converter.
    pub fn defvar(&mut self, name: &str, init: Value, conv: Value) {
        let cell = self.cons(init, Value::Nil);
        let proc = self.alloc(Object::Proc(Proc::Native {
            func: crate::intrinsics::native_var_call,
            locals: vec![cell, conv],
        }));
        let tail = self.ptable;
        self.ptable = self.cons(proc, tail);
        self.define(name, proc);
    }

    /// Read the value of `name` in library `lib`.
    pub fn lib_ref(&mut self, lib: &str, name: &str) -> Result<Value, Error> {
        match self.lib_slot(lib, name) {
            Ok(slot) => match vm::gref(self, slot) {
                Ok(v) => Ok(v),
                Err(u) => Err(error::boundary_error(self, u)),
            },
            Err(e) => Err(e),
        }
    }

    /// Set the value of `name` in library `lib`.
    pub fn lib_set(&mut self, lib: &str, name: &str, v: Value) -> Result<(), Error> {
        let slot = self.lib_slot(lib, name)?;
        self.slot_set(slot, v);
        Ok(())
    }

    fn lib_slot(&mut self, lib: &str, name: &str) -> Result<Value, Error> {
        let Some(idx) = self.find_library(lib) else {
            return Err(Error::Uncaught {
                message: format!("library not found: {lib}"),
            });
        };
        let sym = self.intern(name);
        let env = self.libs[idx].env;
        let Some(uid) = self.find_variable(env, sym) else {
            return Err(Error::Uncaught {
                message: format!("symbol \"{name}\" not defined in library {lib}"),
            });
        };
        Ok(self.gref_slot(uid))
    }

    /// Call `name` in library `lib` with `args`.
    pub fn funcall(&mut self, lib: &str, name: &str, args: &[Value]) -> Result<Value, Error> {
        let proc = self.lib_ref(lib, name)?;
        self.apply(proc, args)
    }

    // ---- running code -------------------------------------------------

    /// Apply a procedure to arguments.
    pub fn apply(&mut self, proc: Value, args: &[Value]) -> Result<Value, Error> {
        match vm::apply(self, proc, args) {
            Ok(v) => Ok(v),
            Err(u) => Err(error::boundary_error(self, u)),
        }
    }

    /// Read one datum from an input port. Returns the EOF marker at end
    /// of input.
    pub fn read(&mut self, port: ObjRef) -> Result<Value, Error> {
        match reader::read(self, port) {
            Ok(v) => Ok(v),
            Err(u) => Err(error::boundary_error(self, u)),
        }
    }

    /// Read one datum from a string.
    pub fn read_cstr(&mut self, src: &str) -> Result<Value, Error> {
        let port = self.make_input_port(src.as_bytes());
        let Value::Obj(port) = port else {
            unreachable!()
        };
        self.read(port)
    }

    /// Read, compile and run every datum in `src`; the last result is
    /// returned.
    pub fn eval_str(&mut self, src: &str) -> Result<Value, Error> {
        let ai = self.gc_arena_preserve();
        let port = self.make_input_port(src.as_bytes());
        let Value::Obj(port) = port else {
            unreachable!()
        };
        let mut result = Value::Undef;
        loop {
            match self.eval_step(port) {
                Ok(Some(v)) => result = v,
                Ok(None) => break,
                Err(u) => {
                    let e = error::boundary_error(self, u);
                    self.gc_arena_restore(ai);
                    return Err(e);
                }
            }
        }
        self.gc_arena_restore(ai);
        Ok(self.gc_protect(result))
    }

    fn eval_step(&mut self, port: ObjRef) -> Result<Option<Value>, Unwind> {
        let datum = reader::read(self, port)?;
        if matches!(datum, Value::Eof) {
            return Ok(None);
        }
        let irep = compiler::compile(self, datum)?;
        let v = self.run_irep(irep)?;
        Ok(Some(v))
    }

    pub(crate) fn run_irep(&mut self, irep: Rc<Irep>) -> Result<Value, Unwind> {
        let proc = self.alloc(Object::Proc(Proc::Closure { irep, cxt: None }));
        vm::apply(self, proc, &[])
    }

    /// Create an identifier: a name (string or identifier) closed over
    /// an environment. The macro expander builds these.
    pub fn make_identifier(&mut self, name: Value, env: ObjRef) -> Value {
        self.alloc(Object::Ident(crate::value::Ident { name, env }))
    }

    /// The top-level environment of the current library.
    #[must_use]
    pub fn current_env(&self) -> ObjRef {
        self.libs[self.cur_lib].env
    }

    /// Allocate a closure context by hand. Used by the VM when a lambda
    /// captures a frame.
    pub(crate) fn make_context(
        &mut self,
        up: Option<ObjRef>,
        regc: usize,
        regs_base: usize,
    ) -> ObjRef {
        self.alloc_ref(Object::Context(Context {
            up,
            regc,
            regs: crate::value::ContextRegs::Frame(regs_base),
        }))
    }
}
