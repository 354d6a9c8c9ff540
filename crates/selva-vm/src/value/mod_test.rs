// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;

#[test]
fn immediates_compare_by_representation() {
    assert!(Value::Int(3).is_eq(&Value::Int(3)));
    assert!(!Value::Int(3).is_eq(&Value::Int(4)));
    assert!(Value::Bool(true).is_eq(&Value::Bool(true)));
    assert!(Value::Nil.is_eq(&Value::Nil));
    assert!(!Value::Nil.is_eq(&Value::Bool(false)));
    assert!(Value::Char(b'x').is_eq(&Value::Char(b'x')));
}

#[test]
fn heap_values_compare_by_reference() {
    let a = Value::Obj(ObjRef(1));
    let b = Value::Obj(ObjRef(2));
    assert!(a.is_eq(&a));
    assert!(!a.is_eq(&b));
}

#[test]
fn eqv_matches_eq_for_numbers() {
    assert!(Value::Float(1.5).is_eqv(&Value::Float(1.5)));
    assert!(!Value::Float(1.5).is_eqv(&Value::Int(1)));
}

#[test]
fn only_false_is_falsy() {
    assert!(!Value::Bool(false).is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(Value::Nil.is_truthy());
    assert!(Value::Int(0).is_truthy());
    assert!(Value::Undef.is_truthy());
}

#[test]
fn type_names_are_stable() {
    assert_eq!(Type::Pair.name(), "pair");
    assert_eq!(Type::String.name(), "string");
    assert_eq!(Type::Proc.name(), "procedure");
    assert_eq!(Type::Weak.name(), "weak-registry");
}

#[test]
fn context_knows_when_it_is_torn_off() {
    let frame = Context {
        up: None,
        regc: 1,
        regs: ContextRegs::Frame(10),
    };
    assert!(!frame.is_torn_off());

    let heap = Context {
        up: None,
        regc: 1,
        regs: ContextRegs::Heap(vec![Value::Nil]),
    };
    assert!(heap.is_torn_off());
}
