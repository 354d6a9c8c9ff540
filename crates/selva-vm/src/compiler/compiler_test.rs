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
fn self_evaluating_literals() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "42"), Value::Int(42));
    assert_eq!(eval(&mut st, "2.5"), Value::Float(2.5));
    assert_eq!(eval(&mut st, "#t"), Value::Bool(true));
    assert_eq!(eval(&mut st, "#\\q"), Value::Char(b'q'));
}

#[test]
fn quote_returns_the_datum() {
    let mut st = State::open();
    let v = eval(&mut st, "'sym");
    assert_eq!(v, Value::Obj(st.intern("sym")));
    assert_eq!(eval(&mut st, "'()"), Value::Nil);
}

#[test]
fn if_selects_a_branch() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(if #t 1 2)"), Value::Int(1));
    assert_eq!(eval(&mut st, "(if #f 1 2)"), Value::Int(2));
    // everything but #f is truthy
    assert_eq!(eval(&mut st, "(if 0 1 2)"), Value::Int(1));
    assert_eq!(eval(&mut st, "(if '() 1 2)"), Value::Int(1));
    assert_eq!(eval(&mut st, "(if #f 1)"), Value::Undef);
}

#[test]
fn begin_sequences_and_returns_the_last_value() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(begin 1 2 3)"), Value::Int(3));
}

#[test]
fn define_then_reference() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(define x 10) (+ x 5)"), Value::Int(15));
    assert_eq!(eval(&mut st, "(set! x 20) x"), Value::Int(20));
}

#[test]
fn let_binds_in_parallel() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(let ((a 1) (b 2)) (+ a b))"), Value::Int(3));
    // inits are evaluated outside the new scope
    assert_eq!(
        eval(&mut st, "(define a 10) (let ((a 1) (b a)) b)"),
        Value::Int(10)
    );
}

#[test]
fn named_let_loops() {
    let mut st = State::open();
    assert_eq!(
        eval(
            &mut st,
            "(let sum ((n 10) (acc 0)) (if (= n 0) acc (sum (- n 1) (+ acc n))))"
        ),
        Value::Int(55)
    );
}

#[test]
fn and_or_short_circuit() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(and)"), Value::Bool(true));
    assert_eq!(eval(&mut st, "(and 1 2)"), Value::Int(2));
    assert_eq!(eval(&mut st, "(and #f 2)"), Value::Bool(false));
    assert_eq!(eval(&mut st, "(or)"), Value::Bool(false));
    assert_eq!(eval(&mut st, "(or #f 3)"), Value::Int(3));
    assert_eq!(eval(&mut st, "(or 1 2)"), Value::Int(1));
    // the right-hand side is not evaluated when short-circuited
    assert_eq!(
        eval(&mut st, "(define hits 0) (or 5 (set! hits 1)) hits"),
        Value::Int(0)
    );
}

#[test]
fn when_and_unless() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(when #t 1 2)"), Value::Int(2));
    assert_eq!(eval(&mut st, "(when #f 1 2)"), Value::Undef);
    assert_eq!(eval(&mut st, "(unless #f 7)"), Value::Int(7));
}

#[test]
fn internal_defines_are_local_to_the_procedure() {
    let mut st = State::open();
    assert_eq!(
        eval(&mut st, "(define (f) (define a 1) (define b 2) (+ a b)) (f)"),
        Value::Int(3)
    );
    // `a` never became a global
    let msg = eval_err(&mut st, "a");
    assert!(msg.contains("uninitialized global"), "{msg}");
}

#[test]
fn lambda_with_only_a_rest_parameter() {
    let mut st = State::open();
    let v = eval(&mut st, "((lambda args args) 1 2 3)");
    let items = st.list_vec(v).expect("list");
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn malformed_forms_raise_compile_errors() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(if)");
    assert!(msg.contains("malformed if"), "{msg}");
    let msg = eval_err(&mut st, "(set! 3 4)");
    assert!(msg.contains("malformed set!"), "{msg}");
    let msg = eval_err(&mut st, "(quote a b)");
    assert!(msg.contains("malformed quote"), "{msg}");
}

#[test]
fn deep_lexical_nesting_resolves_through_the_context_chain() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(define (f a) (lambda (b) (lambda (c) (+ a (+ b c))))) \
         (((f 1) 2) 3)",
    );
    assert_eq!(v, Value::Int(6));
}
