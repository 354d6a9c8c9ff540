// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arithmetic over the `i32`/`f64` value model.
//!
//! Integer results that overflow promote to floats, and negating
//! `i32::MIN` promotes as well. Mixed operands compute in doubles.

use crate::error::Unwind;
use crate::state::{PrimKind, State};
use crate::value::Value;

fn bad_number(st: &mut State, v: Value) -> Unwind {
    st.errorf("expected number, but got ~s", &[v])
}

fn num2(st: &mut State, a: Value, b: Value) -> Result<(f64, f64), Unwind> {
    let x = match a {
        Value::Int(n) => f64::from(n),
        Value::Float(f) => f,
        _ => return Err(bad_number(st, a)),
    };
    let y = match b {
        Value::Int(n) => f64::from(n),
        Value::Float(f) => f,
        _ => return Err(bad_number(st, b)),
    };
    Ok((x, y))
}

pub(crate) fn add(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(match x.checked_add(y) {
            Some(n) => Value::Int(n),
            None => Value::Float(f64::from(x) + f64::from(y)),
        }),
        _ => {
            let (x, y) = num2(st, a, b)?;
            Ok(Value::Float(x + y))
        }
    }
}

pub(crate) fn sub(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(match x.checked_sub(y) {
            Some(n) => Value::Int(n),
            None => Value::Float(f64::from(x) - f64::from(y)),
        }),
        _ => {
            let (x, y) = num2(st, a, b)?;
            Ok(Value::Float(x - y))
        }
    }
}

pub(crate) fn mul(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(match x.checked_mul(y) {
            Some(n) => Value::Int(n),
            None => Value::Float(f64::from(x) * f64::from(y)),
        }),
        _ => {
            let (x, y) = num2(st, a, b)?;
            Ok(Value::Float(x * y))
        }
    }
}

pub(crate) fn div(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) if y != 0 && x % y == 0 => Ok(Value::Int(x / y)),
        _ => {
            let (x, y) = num2(st, a, b)?;
            Ok(Value::Float(x / y))
        }
    }
}

/// Negation; `i32::MIN` promotes to float.
pub(crate) fn neg(st: &mut State, a: Value) -> Result<Value, Unwind> {
    match a {
        Value::Int(n) if n != i32::MIN => Ok(Value::Int(-n)),
        Value::Int(n) => Ok(Value::Float(-f64::from(n))),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(bad_number(st, a)),
    }
}

pub(crate) fn num_eq(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    let (x, y) = num2(st, a, b)?;
    Ok(Value::Bool(x == y))
}

pub(crate) fn num_lt(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    let (x, y) = num2(st, a, b)?;
    Ok(Value::Bool(x < y))
}

pub(crate) fn num_le(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    let (x, y) = num2(st, a, b)?;
    Ok(Value::Bool(x <= y))
}

pub(crate) fn num_gt(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    let (x, y) = num2(st, a, b)?;
    Ok(Value::Bool(x > y))
}

pub(crate) fn num_ge(st: &mut State, a: Value, b: Value) -> Result<Value, Unwind> {
    let (x, y) = num2(st, a, b)?;
    Ok(Value::Bool(x >= y))
}

fn fold2(
    st: &mut State,
    init: Value,
    args: &[Value],
    f: fn(&mut State, Value, Value) -> Result<Value, Unwind>,
) -> Result<Value, Unwind> {
    let mut acc = init;
    for &v in args {
        acc = f(st, acc, v)?;
    }
    Ok(acc)
}

fn native_add(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    fold2(st, Value::Int(0), &args.rest(), add)
}

fn native_sub(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o*")?;
    let first = args.value(st)?;
    let rest = args.rest();
    if rest.is_empty() {
        return neg(st, first);
    }
    fold2(st, first, &rest, sub)
}

fn native_mul(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    fold2(st, Value::Int(1), &args.rest(), mul)
}

fn native_div(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o*")?;
    let first = args.value(st)?;
    let rest = args.rest();
    if rest.is_empty() {
        return div(st, Value::Int(1), first);
    }
    fold2(st, first, &rest, div)
}

fn chain(
    st: &mut State,
    args: &[Value],
    f: fn(&mut State, Value, Value) -> Result<Value, Unwind>,
) -> Result<Value, Unwind> {
    for w in args.windows(2) {
        if matches!(f(st, w[0], w[1])?, Value::Bool(false)) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn native_num_eq(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    chain(st, &args.rest(), num_eq)
}

fn native_num_lt(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    chain(st, &args.rest(), num_lt)
}

fn native_num_le(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    chain(st, &args.rest(), num_le)
}

fn native_num_gt(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    chain(st, &args.rest(), num_gt)
}

fn native_num_ge(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    chain(st, &args.rest(), num_ge)
}

pub(crate) fn init(st: &mut State) {
    super::defun_prim(st, PrimKind::Add, "+", native_add);
    super::defun_prim(st, PrimKind::Sub, "-", native_sub);
    super::defun_prim(st, PrimKind::Mul, "*", native_mul);
    super::defun_prim(st, PrimKind::Div, "/", native_div);
    super::defun_prim(st, PrimKind::Eq, "=", native_num_eq);
    super::defun_prim(st, PrimKind::Lt, "<", native_num_lt);
    super::defun_prim(st, PrimKind::Le, "<=", native_num_le);
    super::defun_prim(st, PrimKind::Gt, ">", native_num_gt);
    super::defun_prim(st, PrimKind::Ge, ">=", native_num_ge);
}
