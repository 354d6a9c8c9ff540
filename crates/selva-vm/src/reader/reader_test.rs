// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::state::State;
use crate::value::{Object, Value};

fn read1(st: &mut State, src: &str) -> Value {
    st.read_cstr(src).expect("read failure")
}

fn read_err(st: &mut State, src: &str) -> String {
    match st.read_cstr(src) {
        Ok(v) => panic!("expected read error, got {v:?}"),
        Err(e) => e.to_string(),
    }
}

#[test]
fn integers() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "0"), Value::Int(0));
    assert_eq!(read1(&mut st, "42"), Value::Int(42));
    assert_eq!(read1(&mut st, "-7"), Value::Int(-7));
    assert_eq!(read1(&mut st, "+13"), Value::Int(13));
    assert_eq!(read1(&mut st, "2147483647"), Value::Int(i32::MAX));
}

#[test]
fn int_min_reads_as_float() {
    // the magnitude exceeds the positive fixnum range before negation
    let mut st = State::open();
    let v = read1(&mut st, "-2147483648");
    assert_eq!(v, Value::Float(-2_147_483_648.0));
}

#[test]
fn floats() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "3.25"), Value::Float(3.25));
    assert_eq!(read1(&mut st, "1e3"), Value::Float(1000.0));
    assert_eq!(read1(&mut st, "2.5e-1"), Value::Float(0.25));
    assert_eq!(read1(&mut st, "-0.5"), Value::Float(-0.5));
    assert_eq!(read1(&mut st, "+inf.0"), Value::Float(f64::INFINITY));
    assert_eq!(read1(&mut st, "-inf.0"), Value::Float(f64::NEG_INFINITY));
    assert!(matches!(read1(&mut st, "+nan.0"), Value::Float(f) if f.is_nan()));
}

#[test]
fn booleans_long_and_short() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "#t"), Value::Bool(true));
    assert_eq!(read1(&mut st, "#true"), Value::Bool(true));
    assert_eq!(read1(&mut st, "#f"), Value::Bool(false));
    assert_eq!(read1(&mut st, "#false"), Value::Bool(false));
}

#[test]
fn characters_plain_and_named() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "#\\a"), Value::Char(b'a'));
    assert_eq!(read1(&mut st, "#\\space"), Value::Char(b' '));
    assert_eq!(read1(&mut st, "#\\newline"), Value::Char(b'\n'));
    assert_eq!(read1(&mut st, "#\\null"), Value::Char(0));
    assert_eq!(read1(&mut st, "#\\tab"), Value::Char(b'\t'));
    assert_eq!(read1(&mut st, "#\\delete"), Value::Char(0x7f));
    assert_eq!(read1(&mut st, "#\\escape"), Value::Char(0x1b));
    assert_eq!(read1(&mut st, "#\\alarm"), Value::Char(0x07));
    assert_eq!(read1(&mut st, "#\\backspace"), Value::Char(0x08));
    assert_eq!(read1(&mut st, "#\\)"), Value::Char(b')'));
}

#[test]
fn strings_with_escapes() {
    let mut st = State::open();
    let v = read1(&mut st, "\"a\\tb\\\"c\\\\d\"");
    let Value::Obj(r) = v else { panic!("not a string") };
    assert_eq!(st.string_bytes(r), b"a\tb\"c\\d");
}

#[test]
fn symbols_and_interning() {
    let mut st = State::open();
    let a = read1(&mut st, "hello");
    let b = read1(&mut st, "hello");
    assert_eq!(a, b);
    let c = read1(&mut st, "other");
    assert_ne!(a, c);
}

#[test]
fn pipe_symbols_take_any_characters() {
    let mut st = State::open();
    let v = read1(&mut st, "|hello world|");
    let Value::Obj(r) = v else { panic!("not a symbol") };
    assert_eq!(st.symbol_name(r), "hello world");

    let v = read1(&mut st, "|a\\x41;b|");
    let Value::Obj(r) = v else { panic!("not a symbol") };
    assert_eq!(st.symbol_name(r), "aAb");
}

#[test]
fn fold_case_directive() {
    let mut st = State::open();
    let v = read1(&mut st, "#!fold-case FOO");
    let Value::Obj(r) = v else { panic!("not a symbol") };
    assert_eq!(st.symbol_name(r), "foo");

    let v = read1(&mut st, "#!no-fold-case BAR");
    let Value::Obj(r) = v else { panic!("not a symbol") };
    assert_eq!(st.symbol_name(r), "BAR");
}

#[test]
fn proper_and_improper_lists() {
    let mut st = State::open();
    let v = read1(&mut st, "(1 2 3)");
    let items = st.list_vec(v).expect("proper list");
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let v = read1(&mut st, "(1 . 2)");
    let Value::Obj(r) = v else { panic!("not a pair") };
    match st.heap.get(r) {
        Object::Pair(p) => {
            assert_eq!(p.car, Value::Int(1));
            assert_eq!(p.cdr, Value::Int(2));
        }
        _ => panic!("not a pair"),
    }

    assert_eq!(read1(&mut st, "()"), Value::Nil);
}

#[test]
fn quote_family_wraps_the_next_datum() {
    let mut st = State::open();
    let v = read1(&mut st, "'x");
    let items = st.list_vec(v).expect("list");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Value::Obj(st.reserved.quote));

    let v = read1(&mut st, ",@x");
    let items = st.list_vec(v).expect("list");
    assert_eq!(items[0], Value::Obj(st.reserved.unquote_splicing));

    let v = read1(&mut st, "#'x");
    let items = st.list_vec(v).expect("list");
    assert_eq!(items[0], Value::Obj(st.reserved.syntax_quote));
}

#[test]
fn vectors() {
    let mut st = State::open();
    let v = read1(&mut st, "#(1 #t x)");
    let Value::Obj(r) = v else { panic!("not a vector") };
    match st.heap.get(r) {
        Object::Vector(elems) => {
            assert_eq!(elems.len(), 3);
            assert_eq!(elems[0], Value::Int(1));
            assert_eq!(elems[1], Value::Bool(true));
        }
        _ => panic!("not a vector"),
    }
}

#[test]
fn bytevectors() {
    let mut st = State::open();
    let v = read1(&mut st, "#u8(0 1 2 255)");
    let Value::Obj(r) = v else { panic!("not a blob") };
    match st.heap.get(r) {
        Object::Blob(data) => assert_eq!(data, &vec![0, 1, 2, 255]),
        _ => panic!("not a blob"),
    }
}

#[test]
fn bytevector_element_out_of_range() {
    let mut st = State::open();
    let msg = read_err(&mut st, "#u8(256)");
    assert!(msg.contains("invalid element"), "{msg}");
}

#[test]
fn comments_are_skipped() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "; note\n 5"), Value::Int(5));
    assert_eq!(read1(&mut st, "#| outer #| inner |# still |# 6"), Value::Int(6));
    assert_eq!(read1(&mut st, "#;(1 2 3) 7"), Value::Int(7));
}

#[test]
fn comment_inside_list_drops_one_datum() {
    let mut st = State::open();
    let v = read1(&mut st, "(1 #;2 3)");
    let items = st.list_vec(v).expect("list");
    assert_eq!(items, vec![Value::Int(1), Value::Int(3)]);
}

#[test]
fn empty_input_reads_as_eof() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, ""), Value::Eof);
    assert_eq!(read1(&mut st, "   ; just a comment"), Value::Eof);
}

#[test]
fn unmatched_close_paren_is_a_read_error() {
    let mut st = State::open();
    let msg = read_err(&mut st, ")");
    assert!(msg.contains("unmatched"), "{msg}");
}

#[test]
fn number_requires_a_delimiter() {
    let mut st = State::open();
    let msg = read_err(&mut st, "12abc");
    assert!(msg.contains("non-delimiter"), "{msg}");
}

#[test]
fn undefined_literal() {
    let mut st = State::open();
    assert_eq!(read1(&mut st, "#undefined"), Value::Undef);
}

#[test]
fn datum_label_builds_cyclic_pair() {
    let mut st = State::open();
    let v = read1(&mut st, "#1=(a . #1#)");
    let Value::Obj(r) = v else { panic!("not a pair") };
    let (car, cdr) = match st.heap.get(r) {
        Object::Pair(p) => (p.car, p.cdr),
        _ => panic!("not a pair"),
    };
    let a = st.intern("a");
    assert_eq!(car, Value::Obj(a));
    assert_eq!(cdr, v);
}

#[test]
fn datum_label_shares_inside_vectors() {
    let mut st = State::open();
    let v = read1(&mut st, "#1=#(1 #1#)");
    let Value::Obj(r) = v else { panic!("not a vector") };
    match st.heap.get(r) {
        Object::Vector(elems) => {
            assert_eq!(elems.len(), 2);
            assert_eq!(elems[0], Value::Int(1));
            assert_eq!(elems[1], v);
        }
        _ => panic!("not a vector"),
    }
}

#[test]
fn undefined_label_is_a_read_error() {
    let mut st = State::open();
    let msg = read_err(&mut st, "#9#");
    assert!(msg.contains("label"), "{msg}");
}
