// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::{State, BASE_LIBRARY};
use crate::value::Value;

#[test]
fn push_pop_handler_restores_the_stack() {
    let mut st = State::open();
    let proc = st.lib_ref(BASE_LIBRARY, "car").expect("car");
    let Value::Obj(r) = proc else { panic!("not a proc") };

    let depth = st.handlers.len();
    st.push_handler(r);
    st.push_handler(r);
    assert_eq!(st.handlers.len(), depth + 2);
    assert_eq!(st.pop_handler(), r);
    assert_eq!(st.pop_handler(), r);
    assert_eq!(st.handlers.len(), depth);
}

#[test]
#[should_panic(expected = "empty exception handler stack")]
fn pop_from_empty_handler_stack_is_fatal() {
    let mut st = State::open();
    st.pop_handler();
}

#[test]
fn uncaught_errors_reach_the_embedding_boundary() {
    let mut st = State::open();
    let e = st.eval_str("(error \"boom\" 'a)").expect_err("must fail");
    let msg = e.to_string();
    assert!(msg.contains("boom"), "{msg}");
    assert!(msg.contains("a"), "{msg}");
}

#[test]
fn error_objects_carry_a_backtrace_string() {
    let mut st = State::open();
    let v = eval_handler_result(
        &mut st,
        "(with-exception-handler (lambda (e) e) (lambda () (error \"traced\")))",
    );
    let Value::Obj(r) = v else { panic!("not an error") };
    let stack = match st.heap.get(r) {
        crate::value::Object::Error(err) => err.stack,
        _ => panic!("not an error object"),
    };
    let text = String::from_utf8_lossy(&st.string_bytes(stack)).into_owned();
    assert!(text.contains("#<"), "{text}");
}

fn eval_handler_result(st: &mut State, src: &str) -> Value {
    st.eval_str(src).expect("eval failure")
}

#[test]
fn format_message_substitutes_directives() {
    let mut st = State::open();
    let s = st.make_str(b"txt");
    let msg = st.format_message("plain ~a and ~s~%", &[s, s]);
    assert_eq!(msg, "plain txt and \"txt\"\n");
}

#[test]
fn errorf_carries_consumed_values_as_irritants() {
    let mut st = State::open();
    let v = eval_handler_result(
        &mut st,
        "(with-exception-handler \
           (lambda (e) (error-object-irritants e)) \
           (lambda () (car 5)))",
    );
    let items = st.list_vec(v).expect("irritants");
    assert_eq!(items, vec![Value::Int(5)]);
}

#[test]
fn reader_failures_have_type_read() {
    let mut st = State::open();
    let v = eval_handler_result(
        &mut st,
        "(with-exception-handler \
           (lambda (e) (error-object-type e)) \
           (lambda () (read (open-input-string \")\"))))",
    );
    assert_eq!(v, Value::Obj(st.intern("read")));
}

#[test]
fn nested_handlers_see_inner_raises_first() {
    let mut st = State::open();
    let v = eval_handler_result(
        &mut st,
        "(with-exception-handler \
           (lambda (e) 'outer) \
           (lambda () \
             (with-exception-handler \
               (lambda (e) 'inner) \
               (lambda () (error \"x\")))))",
    );
    assert_eq!(v, Value::Obj(st.intern("inner")));
}
