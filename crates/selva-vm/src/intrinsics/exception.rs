// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Exception-handling procedures and dynamic-wind.

use crate::error::{self, Handler, Unwind};
use crate::state::State;
use crate::value::{Checkpoint, Object, Value};
use crate::vm;

fn native_with_exception_handler(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("ll")?;
    let handler = args.proc(st)?;
    let thunk = args.proc(st)?;

    st.catch_seq += 1;
    let token = st.catch_seq;
    let depth = st.handler_depth();
    st.handlers.push(Handler {
        proc: handler,
        catch: Some(token),
    });

    let r = vm::apply(st, Value::Obj(thunk), &[]);
    st.handlers.truncate(depth);

    match r {
        Ok(v) => Ok(v),
        Err(Unwind::Escape { token: t, value }) if t == token => Ok(value),
        Err(u) => Err(u),
    }
}

fn native_raise(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Err(error::raise(st, v))
}

fn native_raise_continuable(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    error::raise_continuable(st, v)
}

fn native_error(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("z*")?;
    let msg = args.bytes(st)?;
    let irritants = {
        let rest = args.rest();
        st.list(&rest)
    };
    let msg = String::from_utf8_lossy(&msg).into_owned();
    let err = st.make_error("", &msg, irritants);
    Err(error::raise(st, err))
}

fn native_make_error_object(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("mz*")?;
    let etype = args.sym(st)?;
    let msg = args.bytes(st)?;
    let irritants = {
        let rest = args.rest();
        st.list(&rest)
    };
    let etype = st.symbol_name(etype).to_owned();
    let msg = String::from_utf8_lossy(&msg).into_owned();
    Ok(st.make_error(&etype, &msg, irritants))
}

fn native_error_object_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Error(_)));
    Ok(Value::Bool(is))
}

fn native_error_object_message(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("e")?;
    let e = args.error_obj(st)?;
    let msg = match st.heap.get(e) {
        Object::Error(err) => err.msg,
        _ => unreachable!(),
    };
    Ok(Value::Obj(msg))
}

fn native_error_object_irritants(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("e")?;
    let e = args.error_obj(st)?;
    match st.heap.get(e) {
        Object::Error(err) => Ok(err.irritants),
        _ => unreachable!(),
    }
}

fn native_error_object_type(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("e")?;
    let e = args.error_obj(st)?;
    let etype = match st.heap.get(e) {
        Object::Error(err) => err.etype,
        _ => unreachable!(),
    };
    Ok(Value::Obj(etype))
}

fn native_dynamic_wind(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("lll")?;
    let wind_in = args.proc(st)?;
    let thunk = args.proc(st)?;
    let wind_out = args.proc(st)?;

    vm::apply(st, Value::Obj(wind_in), &[])?;

    let prev = st.checkpoint;
    let depth = prev
        .map(|cp| match st.heap.get(cp) {
            Object::Checkpoint(c) => c.depth + 1,
            _ => 0,
        })
        .unwrap_or(0);
    let cp = st.alloc(Object::Checkpoint(Checkpoint {
        wind_in: Some(wind_in),
        wind_out: Some(wind_out),
        depth,
        prev,
    }));
    let Value::Obj(cp) = cp else { unreachable!() };
    st.checkpoint = Some(cp);

    let r = vm::apply(st, Value::Obj(thunk), &[]);
    st.checkpoint = prev;

    // the out-thunk runs on both the normal and the unwinding path
    let out = vm::apply(st, Value::Obj(wind_out), &[]);
    match (r, out) {
        (Err(u), _) => Err(u),
        (Ok(_), Err(u)) => Err(u),
        (Ok(v), Ok(_)) => Ok(v),
    }
}

pub(crate) fn init(st: &mut State) {
    st.defun("with-exception-handler", native_with_exception_handler);
    st.defun("raise", native_raise);
    st.defun("raise-continuable", native_raise_continuable);
    st.defun("error", native_error);
    st.defun("make-error-object", native_make_error_object);
    st.defun("error-object?", native_error_object_p);
    st.defun("error-object-message", native_error_object_message);
    st.defun("error-object-irritants", native_error_object_irritants);
    st.defun("error-object-type", native_error_object_type);
    st.defun("dynamic-wind", native_dynamic_wind);
}
