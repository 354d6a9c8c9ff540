// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The writer: `write` (round-trippable) and `display` (human
//! readable).
//!
//! Shared and cyclic pairs and vectors are detected by a pre-pass that
//! counts references; multiply-referenced nodes are emitted with
//! `#n=` / `#n#` labels. Quote family forms print with their reader
//! abbreviations.

#[cfg(test)]
mod writer_test;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::state::State;
use crate::value::{Object, ObjRef, Proc, Value};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    Display,
}

struct Writer {
    mode: Mode,
    /// Multiply-referenced pairs/vectors; -1 until a number is handed
    /// out at first emission.
    labels: FxHashMap<ObjRef, i32>,
    emitted: FxHashSet<ObjRef>,
    counter: i32,
    out: Vec<u8>,
}

/// Render `v` in `write` notation.
pub fn write_string(st: &mut State, v: Value) -> String {
    render(st, v, Mode::Write)
}

/// Render `v` in `display` notation.
pub fn display_string(st: &mut State, v: Value) -> String {
    render(st, v, Mode::Display)
}

fn render(st: &mut State, v: Value, mode: Mode) -> String {
    let mut w = Writer {
        mode,
        labels: scan(st, v),
        emitted: FxHashSet::default(),
        counter: 0,
        out: Vec::new(),
    };
    emit(st, &mut w, v);
    String::from_utf8_lossy(&w.out).into_owned()
}

/// Pre-pass: find pairs and vectors reachable more than once.
fn scan(st: &State, root: Value) -> FxHashMap<ObjRef, i32> {
    let mut counts: FxHashMap<ObjRef, u32> = FxHashMap::default();
    let mut work = vec![root];
    while let Some(v) = work.pop() {
        let Value::Obj(r) = v else { continue };
        match st.heap.get(r) {
            Object::Pair(p) => {
                let n = counts.entry(r).or_insert(0);
                *n += 1;
                if *n == 1 {
                    work.push(p.car);
                    work.push(p.cdr);
                }
            }
            Object::Vector(elems) => {
                let n = counts.entry(r).or_insert(0);
                *n += 1;
                if *n == 1 {
                    work.extend_from_slice(elems);
                }
            }
            _ => {}
        }
    }
    counts
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(r, _)| (r, -1))
        .collect()
}

fn push_str(w: &mut Writer, s: &str) {
    w.out.extend_from_slice(s.as_bytes());
}

fn emit_float(w: &mut Writer, f: f64) {
    if f.is_nan() {
        push_str(w, "+nan.0");
    } else if f == f64::INFINITY {
        push_str(w, "+inf.0");
    } else if f == f64::NEG_INFINITY {
        push_str(w, "-inf.0");
    } else if f == f.trunc() {
        // keep a decimal point so it reads back as a float
        push_str(w, &format!("{f:.1}"));
    } else {
        push_str(w, &format!("{f}"));
    }
}

fn emit_char(w: &mut Writer, c: u8) {
    if w.mode == Mode::Display {
        w.out.push(c);
        return;
    }
    match c {
        0x07 => push_str(w, "#\\alarm"),
        0x08 => push_str(w, "#\\backspace"),
        0x7f => push_str(w, "#\\delete"),
        0x1b => push_str(w, "#\\escape"),
        b'\n' => push_str(w, "#\\newline"),
        0 => push_str(w, "#\\null"),
        b'\r' => push_str(w, "#\\return"),
        b' ' => push_str(w, "#\\space"),
        b'\t' => push_str(w, "#\\tab"),
        _ => {
            push_str(w, "#\\");
            w.out.push(c);
        }
    }
}

fn emit_str(st: &mut State, w: &mut Writer, r: ObjRef) {
    let bytes = st.string_bytes(r);
    if w.mode == Mode::Display {
        w.out.extend_from_slice(&bytes);
        return;
    }
    w.out.push(b'"');
    for b in bytes {
        if b == b'"' || b == b'\\' {
            w.out.push(b'\\');
        }
        w.out.push(b);
    }
    w.out.push(b'"');
}

/// The reader abbreviation for `(tag x)`, if the pair is one.
fn abbreviation(st: &State, car: Value, cdr: Value) -> Option<&'static str> {
    let sym = match car {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Symbol(_) => r,
            _ => return None,
        },
        _ => return None,
    };
    // exactly one argument
    match cdr {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Pair(p) if p.cdr.is_nil() => {}
            _ => return None,
        },
        _ => return None,
    }
    let res = st.reserved;
    if sym == res.quote {
        Some("'")
    } else if sym == res.quasiquote {
        Some("`")
    } else if sym == res.unquote {
        Some(",")
    } else if sym == res.unquote_splicing {
        Some(",@")
    } else if sym == res.syntax_quote {
        Some("#'")
    } else if sym == res.syntax_quasiquote {
        Some("#`")
    } else if sym == res.syntax_unquote {
        Some("#,")
    } else if sym == res.syntax_unquote_splicing {
        Some("#,@")
    } else {
        None
    }
}

/// Emit a labeled node's prefix. True when only a back-reference was
/// written and the body must be skipped.
fn emit_label(w: &mut Writer, r: ObjRef) -> bool {
    if let Some(&n) = w.labels.get(&r) {
        if w.emitted.contains(&r) {
            let n = if n >= 0 { n } else { 0 };
            push_str(w, &format!("#{n}#"));
            return true;
        }
        let n = if n >= 0 {
            n
        } else {
            w.counter += 1;
            let fresh = w.counter;
            w.labels.insert(r, fresh);
            fresh
        };
        w.emitted.insert(r);
        push_str(w, &format!("#{n}="));
    }
    false
}

fn emit(st: &mut State, w: &mut Writer, v: Value) {
    match v {
        Value::Nil => push_str(w, "()"),
        Value::Undef => push_str(w, "#undefined"),
        Value::Invalid => push_str(w, "#<invalid>"),
        Value::Eof => push_str(w, "#<eof-object>"),
        Value::Bool(true) => push_str(w, "#t"),
        Value::Bool(false) => push_str(w, "#f"),
        Value::Int(n) => push_str(w, &format!("{n}")),
        Value::Float(f) => emit_float(w, f),
        Value::Char(c) => emit_char(w, c),
        Value::Obj(r) => emit_obj(st, w, r),
    }
}

fn emit_obj(st: &mut State, w: &mut Writer, r: ObjRef) {
    enum Shape {
        Pair(Value, Value),
        Vector(Vec<Value>),
        Str,
        Symbol(String),
        Blob(Vec<u8>),
        Dict(Vec<(ObjRef, Value)>),
        ErrorObj(ObjRef, ObjRef),
        Opaque(&'static str),
    }

    let shape = match st.heap.get(r) {
        Object::Pair(p) => Shape::Pair(p.car, p.cdr),
        Object::Vector(elems) => Shape::Vector(elems.clone()),
        Object::Str(_) => Shape::Str,
        Object::Symbol(name) => Shape::Symbol(name.to_string()),
        Object::Blob(data) => Shape::Blob(data.clone()),
        Object::Dict(map) => Shape::Dict(map.iter().map(|(&k, &v)| (k, v)).collect()),
        Object::Error(e) => Shape::ErrorObj(e.etype, e.msg),
        Object::Proc(Proc::Native { .. }) => Shape::Opaque("#<native procedure>"),
        Object::Proc(Proc::Closure { .. }) => Shape::Opaque("#<closure>"),
        Object::Weak(_) => Shape::Opaque("#<weak-registry>"),
        Object::Ident(_) => Shape::Opaque("#<identifier>"),
        Object::Env(_) => Shape::Opaque("#<environment>"),
        Object::Context(_) => Shape::Opaque("#<context>"),
        Object::Port(_) => Shape::Opaque("#<port>"),
        Object::Record(_) => Shape::Opaque("#<record>"),
        Object::Checkpoint(_) => Shape::Opaque("#<checkpoint>"),
    };

    match shape {
        Shape::Pair(car, cdr) => {
            if emit_label(w, r) {
                return;
            }
            if !w.labels.contains_key(&r) {
                if let Some(abbrev) = abbreviation(st, car, cdr) {
                    push_str(w, abbrev);
                    let arg = match cdr {
                        Value::Obj(inner) => match st.heap.get(inner) {
                            Object::Pair(p) => p.car,
                            _ => Value::Undef,
                        },
                        _ => Value::Undef,
                    };
                    emit(st, w, arg);
                    return;
                }
            }
            w.out.push(b'(');
            emit(st, w, car);
            let mut tail = cdr;
            loop {
                match tail {
                    Value::Nil => break,
                    Value::Obj(t) => {
                        let is_plain_pair = matches!(st.heap.get(t), Object::Pair(_))
                            && !w.labels.contains_key(&t);
                        if is_plain_pair {
                            let (car, cdr) = match st.heap.get(t) {
                                Object::Pair(p) => (p.car, p.cdr),
                                _ => unreachable!(),
                            };
                            w.out.push(b' ');
                            emit(st, w, car);
                            tail = cdr;
                        } else {
                            push_str(w, " . ");
                            emit(st, w, tail);
                            break;
                        }
                    }
                    other => {
                        push_str(w, " . ");
                        emit(st, w, other);
                        break;
                    }
                }
            }
            w.out.push(b')');
        }
        Shape::Vector(elems) => {
            if emit_label(w, r) {
                return;
            }
            push_str(w, "#(");
            for (i, e) in elems.iter().enumerate() {
                if i > 0 {
                    w.out.push(b' ');
                }
                emit(st, w, *e);
            }
            w.out.push(b')');
        }
        Shape::Str => emit_str(st, w, r),
        Shape::Symbol(name) => push_str(w, &name),
        Shape::Blob(data) => {
            push_str(w, "#u8(");
            for (i, b) in data.iter().enumerate() {
                if i > 0 {
                    w.out.push(b' ');
                }
                push_str(w, &format!("{b}"));
            }
            w.out.push(b')');
        }
        Shape::Dict(entries) => {
            push_str(w, "#.(dictionary");
            for (k, v) in entries {
                let name = st.symbol_name(k).to_owned();
                push_str(w, &format!(" '{name} "));
                emit(st, w, v);
            }
            w.out.push(b')');
        }
        Shape::ErrorObj(etype, msg) => {
            let tname = st.symbol_name(etype).to_owned();
            let text = String::from_utf8_lossy(&st.string_bytes(msg)).into_owned();
            if tname.is_empty() {
                push_str(w, &format!("#<error: {text}>"));
            } else {
                push_str(w, &format!("#<{tname}-error: {text}>"));
            }
        }
        Shape::Opaque(tag) => push_str(w, tag),
    }
}
