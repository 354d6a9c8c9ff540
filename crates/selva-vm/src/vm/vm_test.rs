// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::State;
use crate::value::Value;
use crate::writer;

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
fn adds_two_numbers() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(+ 1 2)"), Value::Int(3));
}

#[test]
fn arithmetic_expressions_nest() {
    let mut st = State::open();
    assert_eq!(eval(&mut st, "(* (+ 1 2) (- 10 6))"), Value::Int(12));
    assert_eq!(eval(&mut st, "(/ 10 4)"), Value::Float(2.5));
}

#[test]
fn tail_call_loop_runs_in_constant_stack() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(let loop ((n 100000)) (if (= n 0) 'done (loop (- n 1))))",
    );
    let done = st.intern("done");
    assert_eq!(v, Value::Obj(done));
    // every activation has been retired
    assert!(st.ci.is_empty());
    assert!(st.stack.is_empty());
}

#[test]
fn with_exception_handler_returns_the_handler_value() {
    let mut st = State::open();
    let depth = st.handlers.len();
    let v = eval(
        &mut st,
        "(with-exception-handler \
           (lambda (e) (error-object-message e)) \
           (lambda () (error \"oops\" 1 2)))",
    );
    let Value::Obj(r) = v else { panic!("not a string") };
    assert_eq!(st.string_bytes(r), b"oops");
    // handler-stack depth is identical before and after
    assert_eq!(st.handlers.len(), depth);
}

#[test]
fn raise_continuable_resumes_at_the_raise_point() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(with-exception-handler \
           (lambda (e) 42) \
           (lambda () (+ (raise-continuable 'x) 1)))",
    );
    assert_eq!(v, Value::Int(43));
}

#[test]
fn error_object_carries_type_and_irritants() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(with-exception-handler \
           (lambda (e) (error-object-irritants e)) \
           (lambda () (error \"boom\" 1 2)))",
    );
    let items = st.list_vec(v).expect("irritants list");
    assert_eq!(items, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn calling_a_non_procedure_raises() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(1 2)");
    assert!(msg.contains("invalid application"), "{msg}");
}

#[test]
fn closure_arity_is_checked() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "(define (f x) x) (f 1 2)");
    assert!(msg.contains("wrong number of arguments (2 for 1)"), "{msg}");
}

#[test]
fn variadic_closure_accepts_surplus_arguments() {
    let mut st = State::open();
    let v = eval(&mut st, "(define (f a . r) r) (f 1 2 3)");
    assert_eq!(writer::write_string(&mut st, v), "(2 3)");

    let msg = eval_err(&mut st, "(define (g a . r) r) (g)");
    assert!(msg.contains("at least 1"), "{msg}");
}

#[test]
fn closures_capture_their_environment() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(define (make-adder n) (lambda (x) (+ x n))) ((make-adder 3) 4)",
    );
    assert_eq!(v, Value::Int(7));
}

#[test]
fn captured_state_survives_the_creating_frame() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(define (counter) \
           (let ((n 0)) \
             (lambda () (set! n (+ n 1)) n))) \
         (define c (counter)) \
         (c) \
         (c)",
    );
    assert_eq!(v, Value::Int(2));
}

#[test]
fn sibling_closures_share_one_context() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(define (cell) \
           (let ((n 0)) \
             (cons (lambda () n) \
                   (lambda (v) (set! n v))))) \
         (define p (cell)) \
         ((cdr p) 9) \
         ((car p))",
    );
    assert_eq!(v, Value::Int(9));
}

#[test]
fn rebinding_a_primitive_disables_its_fast_path() {
    let mut st = State::open();
    // f is compiled while + is still the canonical primitive
    let v = eval(
        &mut st,
        "(define (f) (+ 1 2)) \
         (define + (lambda (a b) 99)) \
         (f)",
    );
    assert_eq!(v, Value::Int(99));
}

#[test]
fn uninitialized_global_reference_raises() {
    let mut st = State::open();
    let msg = eval_err(&mut st, "completely-unbound-variable");
    assert!(msg.contains("uninitialized global"), "{msg}");
}

#[test]
fn heap_stays_bounded_when_garbage_is_dropped() {
    let mut st = State::open();
    let v = eval(
        &mut st,
        "(let loop ((n 20000)) \
           (if (= n 0) 'done (begin (cons 1 2) (loop (- n 1)))))",
    );
    let done = st.intern("done");
    assert_eq!(v, Value::Obj(done));
    st.gc_run();
    // twenty thousand dead pairs never forced the heap past a few pages
    assert!(st.heap.page_count() <= 2, "pages: {}", st.heap.page_count());
}
