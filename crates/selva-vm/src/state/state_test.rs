// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;
use crate::value::Type;

fn my_seven(st: &mut State) -> Result<Value, Unwind> {
    st.args("")?;
    Ok(Value::Int(7))
}

fn my_double(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("i")?;
    let n = args.int(st)?;
    Ok(Value::Int(n * 2))
}

#[test]
fn interning_is_idempotent() {
    let mut st = State::open();
    let a = st.intern("foo");
    let b = st.intern("foo");
    let c = st.intern("bar");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(st.symbol_name(a), "foo");
}

#[test]
fn type_of_covers_the_closed_set() {
    let mut st = State::open();
    assert_eq!(st.type_of(Value::Nil), Type::Nil);
    assert_eq!(st.type_of(Value::Int(1)), Type::Int);
    assert_eq!(st.type_of(Value::Float(1.0)), Type::Float);
    assert_eq!(st.type_of(Value::Char(b'c')), Type::Char);
    assert_eq!(st.type_of(Value::Eof), Type::Eof);
    let s = st.make_str(b"s");
    assert_eq!(st.type_of(s), Type::String);
    let p = st.cons(Value::Nil, Value::Nil);
    assert_eq!(st.type_of(p), Type::Pair);
    let sym = st.intern("t");
    assert_eq!(st.type_of(Value::Obj(sym)), Type::Symbol);
}

#[test]
fn cons_car_cdr() {
    let mut st = State::open();
    let p = st.cons(Value::Int(1), Value::Int(2));
    assert_eq!(st.car(p).unwrap(), Value::Int(1));
    assert_eq!(st.cdr(p).unwrap(), Value::Int(2));
    st.set_car(p, Value::Int(9)).unwrap();
    assert_eq!(st.car(p).unwrap(), Value::Int(9));
}

#[test]
fn list_construction_and_walking() {
    let mut st = State::open();
    let l = st.list(&[Value::Int(1), Value::Int(2), Value::Int(3)]);
    let items = st.list_vec(l).unwrap();
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(st.list(&[]), Value::Nil);
}

#[test]
fn defun_exposes_native_procedures_to_code() {
    let mut st = State::open();
    st.defun("seven", my_seven);
    assert_eq!(st.eval_str("(seven)").unwrap(), Value::Int(7));

    st.defun("double", my_double);
    assert_eq!(st.eval_str("(double 21)").unwrap(), Value::Int(42));
}

#[test]
fn funcall_reaches_into_a_library() {
    let mut st = State::open();
    st.defun("seven", my_seven);
    let v = st.funcall(BASE_LIBRARY, "seven", &[]).unwrap();
    assert_eq!(v, Value::Int(7));

    let v = st
        .funcall(BASE_LIBRARY, "+", &[Value::Int(2), Value::Int(3)])
        .unwrap();
    assert_eq!(v, Value::Int(5));
}

#[test]
fn define_ref_set_round_trip() {
    let mut st = State::open();
    st.define("answer", Value::Int(42));
    assert_eq!(st.lib_ref(BASE_LIBRARY, "answer").unwrap(), Value::Int(42));
    st.lib_set(BASE_LIBRARY, "answer", Value::Int(43)).unwrap();
    assert_eq!(st.lib_ref(BASE_LIBRARY, "answer").unwrap(), Value::Int(43));
    assert_eq!(st.eval_str("answer").unwrap(), Value::Int(43));
}

#[test]
fn libraries_isolate_and_share_through_exports() {
    let mut st = State::open();
    assert!(st.make_library("test.extra"));
    assert!(!st.make_library("test.extra"));

    st.in_library("test.extra");
    st.define("treasure", Value::Int(99));

    st.in_library(BASE_LIBRARY);
    st.import("test.extra").unwrap();
    assert_eq!(st.eval_str("treasure").unwrap(), Value::Int(99));

    assert!(st.find_library("missing.lib").is_none());
    assert!(st.import("missing.lib").is_err());
}

#[test]
fn defvar_parameters_read_and_write() {
    let mut st = State::open();
    st.defvar("width", Value::Int(80), Value::Undef);
    assert_eq!(st.eval_str("(width)").unwrap(), Value::Int(80));
    assert_eq!(st.eval_str("(width 120) (width)").unwrap(), Value::Int(120));
}

#[test]
fn eval_returns_the_last_datum() {
    let mut st = State::open();
    assert_eq!(st.eval_str("1 2 3").unwrap(), Value::Int(3));
    assert_eq!(st.eval_str("").unwrap(), Value::Undef);
}

#[test]
fn equal_handles_cycles() {
    let mut st = State::open();
    let v = st.read_cstr("#1=(a . #1#)").unwrap();
    assert!(st.equal(v, v));
}

#[test]
fn arena_discipline_brackets_allocation() {
    let mut st = State::open();
    let mark = st.gc_arena_preserve();
    let tmp = st.make_str(b"temporary");
    assert!(st.gc_arena_preserve() > mark);
    let kept = st.gc_protect(tmp);
    assert_eq!(kept, tmp);
    st.gc_arena_restore(mark);
    assert_eq!(st.gc_arena_preserve(), mark);
}

#[test]
fn state_closes_cleanly() {
    let st = State::open();
    st.close();
}
