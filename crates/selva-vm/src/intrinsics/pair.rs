// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Pair and list procedures.

use crate::error::Unwind;
use crate::state::{PrimKind, State};
use crate::value::{Object, Value};

fn native_cons(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let a = args.value(st)?;
    let b = args.value(st)?;
    Ok(st.cons(a, b))
}

fn native_car(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let p = args.value(st)?;
    st.car(p)
}

fn native_cdr(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let p = args.value(st)?;
    st.cdr(p)
}

fn native_nilp(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(v.is_nil()))
}

fn native_pairp(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Pair(_)));
    Ok(Value::Bool(is))
}

fn native_symbolp(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Symbol(_)));
    Ok(Value::Bool(is))
}

fn native_not(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(v.is_false()))
}

fn native_set_car(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let p = args.value(st)?;
    let v = args.value(st)?;
    st.set_car(p, v)?;
    Ok(Value::Undef)
}

fn native_set_cdr(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let p = args.value(st)?;
    let v = args.value(st)?;
    st.set_cdr(p, v)?;
    Ok(Value::Undef)
}

fn native_list(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    Ok(st.list(&args.rest()))
}

fn native_length(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let l = args.value(st)?;
    let items = st.list_vec(l)?;
    Ok(Value::Int(items.len() as i32))
}

fn native_reverse(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let l = args.value(st)?;
    let items = st.list_vec(l)?;
    let mut out = Value::Nil;
    for &v in &items {
        out = st.cons(v, out);
    }
    Ok(out)
}

fn native_append(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    let lists = args.rest();
    let mut items = Vec::new();
    for &l in &lists {
        items.extend(st.list_vec(l)?);
    }
    Ok(st.list(&items))
}

pub(crate) fn init(st: &mut State) {
    super::defun_prim(st, PrimKind::Cons, "cons", native_cons);
    super::defun_prim(st, PrimKind::Car, "car", native_car);
    super::defun_prim(st, PrimKind::Cdr, "cdr", native_cdr);
    super::defun_prim(st, PrimKind::Nilp, "null?", native_nilp);
    super::defun_prim(st, PrimKind::Symbolp, "symbol?", native_symbolp);
    super::defun_prim(st, PrimKind::Pairp, "pair?", native_pairp);
    super::defun_prim(st, PrimKind::Not, "not", native_not);

    st.defun("set-car!", native_set_car);
    st.defun("set-cdr!", native_set_cdr);
    st.defun("list", native_list);
    st.defun("length", native_length);
    st.defun("reverse", native_reverse);
    st.defun("append", native_append);
}
