// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;
use crate::state::State;
use crate::value::Value;

fn written(st: &mut State, src: &str) -> String {
    let v = st.read_cstr(src).expect("read failure");
    write_string(st, v)
}

#[test]
fn immediates() {
    let mut st = State::open();
    assert_eq!(write_string(&mut st, Value::Nil), "()");
    assert_eq!(write_string(&mut st, Value::Bool(true)), "#t");
    assert_eq!(write_string(&mut st, Value::Bool(false)), "#f");
    assert_eq!(write_string(&mut st, Value::Int(-42)), "-42");
    assert_eq!(write_string(&mut st, Value::Undef), "#undefined");
}

#[test]
fn float_spellings_read_back_as_floats() {
    let mut st = State::open();
    assert_eq!(write_string(&mut st, Value::Float(3.5)), "3.5");
    assert_eq!(write_string(&mut st, Value::Float(1.0)), "1.0");
    assert_eq!(write_string(&mut st, Value::Float(f64::INFINITY)), "+inf.0");
    assert_eq!(
        write_string(&mut st, Value::Float(f64::NEG_INFINITY)),
        "-inf.0"
    );
    assert_eq!(write_string(&mut st, Value::Float(f64::NAN)), "+nan.0");
}

#[test]
fn chars_in_write_mode_use_names() {
    let mut st = State::open();
    assert_eq!(write_string(&mut st, Value::Char(b'a')), "#\\a");
    assert_eq!(write_string(&mut st, Value::Char(b' ')), "#\\space");
    assert_eq!(write_string(&mut st, Value::Char(b'\n')), "#\\newline");
    assert_eq!(display_string(&mut st, Value::Char(b'a')), "a");
}

#[test]
fn strings_are_quoted_in_write_mode() {
    let mut st = State::open();
    let v = st.read_cstr("\"a\\\\b\\\"c\"").expect("read");
    assert_eq!(write_string(&mut st, v), "\"a\\\\b\\\"c\"");
    assert_eq!(display_string(&mut st, v), "a\\b\"c");
}

#[test]
fn lists_and_dotted_pairs() {
    let mut st = State::open();
    assert_eq!(written(&mut st, "(1 2 3)"), "(1 2 3)");
    assert_eq!(written(&mut st, "(1 . 2)"), "(1 . 2)");
    assert_eq!(written(&mut st, "(1 (2 3) . 4)"), "(1 (2 3) . 4)");
    assert_eq!(written(&mut st, "#(1 #t)"), "#(1 #t)");
    assert_eq!(written(&mut st, "#u8(1 2 3)"), "#u8(1 2 3)");
}

#[test]
fn quote_family_prints_abbreviated() {
    let mut st = State::open();
    assert_eq!(written(&mut st, "'x"), "'x");
    assert_eq!(written(&mut st, "`x"), "`x");
    assert_eq!(written(&mut st, ",x"), ",x");
    assert_eq!(written(&mut st, ",@x"), ",@x");
    assert_eq!(written(&mut st, "#'x"), "#'x");
}

#[test]
fn cyclic_pair_uses_labels() {
    let mut st = State::open();
    assert_eq!(written(&mut st, "#1=(a . #1#)"), "#1=(a . #1#)");
}

#[test]
fn shared_structure_round_trips() {
    let mut st = State::open();
    let v = st.read_cstr("#1=(a b . #1#)").expect("read");
    let out = write_string(&mut st, v);
    let v2 = st.read_cstr(&out).expect("reread");
    // both are cyclic lists with the same prefix
    let (car1, car2) = (st.car(v).unwrap(), st.car(v2).unwrap());
    assert_eq!(car1, car2);
}

#[test]
fn acyclic_values_round_trip_structurally() {
    let mut st = State::open();
    for src in [
        "(1 2 3)",
        "(1 . 2)",
        "(a (b c) #(1 2) \"str\")",
        "#u8(0 255)",
        "#\\x",
        "12",
        "2.5",
        "#t",
        "()",
    ] {
        let v = st.read_cstr(src).expect("read");
        let out = write_string(&mut st, v);
        let v2 = st.read_cstr(&out).expect("reread");
        assert!(st.equal(v, v2), "{src} -> {out}");
    }
}
