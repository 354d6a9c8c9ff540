// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::State;
use crate::value::{ObjRef, Value};

fn port_ref(v: Value) -> ObjRef {
    match v {
        Value::Obj(r) => r,
        _ => panic!("not a port"),
    }
}

#[test]
fn input_port_reads_bytes_in_order() {
    let mut st = State::open();
    let p = port_ref(st.make_input_port(b"ab"));
    assert_eq!(st.port_getc(p), Some(b'a'));
    assert_eq!(st.port_getc(p), Some(b'b'));
    assert_eq!(st.port_getc(p), None);
    // end of input is sticky
    assert_eq!(st.port_getc(p), None);
}

#[test]
fn peek_does_not_consume() {
    let mut st = State::open();
    let p = port_ref(st.make_input_port(b"xy"));
    assert_eq!(st.port_peek(p), Some(b'x'));
    assert_eq!(st.port_peek(p), Some(b'x'));
    assert_eq!(st.port_getc(p), Some(b'x'));
    assert_eq!(st.port_peek(p), Some(b'y'));
    assert_eq!(st.port_getc(p), Some(b'y'));
    assert_eq!(st.port_peek(p), None);
}

#[test]
fn empty_input_port_is_immediately_at_eof() {
    let mut st = State::open();
    let p = port_ref(st.make_input_port(b""));
    assert_eq!(st.port_peek(p), None);
    assert_eq!(st.port_getc(p), None);
}

#[test]
fn output_port_accumulates_writes() {
    let mut st = State::open();
    let p = port_ref(st.make_output_port());
    assert_eq!(st.port_contents(p), b"");
    st.port_write(p, b"hello");
    st.port_write(p, b" world");
    assert_eq!(st.port_contents(p), b"hello world");
}

#[test]
fn stdout_port_accepts_writes_without_buffering() {
    let mut st = State::open();
    let p = port_ref(st.make_stdout_port());
    st.port_write(p, b"");
    // nothing is retained on the port itself
    assert_eq!(st.port_contents(p), b"");
}

#[test]
fn reads_and_writes_on_the_wrong_port_kind_are_inert() {
    let mut st = State::open();

    let out = port_ref(st.make_output_port());
    assert_eq!(st.port_getc(out), None);
    assert_eq!(st.port_peek(out), None);

    let input = port_ref(st.make_input_port(b"z"));
    st.port_write(input, b"ignored");
    assert_eq!(st.port_contents(input), b"");
    assert_eq!(st.port_getc(input), Some(b'z'));
}
