// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::State;
use crate::value::Value;

fn eval(st: &mut State, src: &str) -> Value {
    st.eval_str(src).expect("eval failure")
}

fn eval_err(st: &mut State, src: &str) -> String {
    match st.eval_str(src) {
        Ok(v) => panic!("expected error, got {v:?}"),
        Err(e) => e.to_string(),
    }
}

#[test]
fn required_arity_is_enforced() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(car)");
    assert!(msg.contains("wrong number of arguments (0 for 1)"), "{msg}");

    let msg = eval_err(&mut st, "(cons 1)");
    assert!(msg.contains("wrong number of arguments (1 for 2)"), "{msg}");

    let msg = eval_err(&mut st, "(car '(1) '(2))");
    assert!(msg.contains("wrong number of arguments (2 for 1)"), "{msg}");
}

#[test]
fn rest_formats_accept_any_surplus() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(+ 1 2 3 4)"), Value::Int(10));
    assert_eq!(eval(&mut st, "(+)"), Value::Int(0));
}

#[test]
fn optional_parameters_default() {
    let mut st = State::open();
    // make-string's fill character is optional
    assert_eq!(eval(&mut st, "(string-length (make-string 3))"), Value::Int(3));
    let v = eval(&mut st, "(string-ref (make-string 3) 0)");
    assert_eq!(v, Value::Char(b' '));
    let v = eval(&mut st, "(string-ref (make-string 3 #\\z) 1)");
    assert_eq!(v, Value::Char(b'z'));
}

#[test]
fn type_mismatches_name_the_expected_kind() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(car 5)");
    assert!(msg.contains("expected pair"), "{msg}");

    let msg = eval_err(&mut st, "(string-length 5)");
    assert!(msg.contains("expected string"), "{msg}");

    let msg = eval_err(&mut st, "(vector-ref '(1) 0)");
    assert!(msg.contains("expected vector"), "{msg}");

    let msg = eval_err(&mut st, "(+ 1 'x)");
    assert!(msg.contains("expected number"), "{msg}");
}

#[test]
fn int_code_accepts_floats_by_truncation() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(string-length (make-string 3.7))"), Value::Int(3));
}

#[test]
fn char_code_rejects_non_characters() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(make-string 3 7)");
    assert!(msg.contains("expected char"), "{msg}");
}
