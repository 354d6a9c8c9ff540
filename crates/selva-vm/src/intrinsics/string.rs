// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! String procedures over the rope representation.
//!
//! Mutation is rebuilding: `string-set!` and friends slice around the
//! touched range, concatenate, and retarget the string object, so every
//! other string sharing the old chunks is unaffected.

use crate::error::Unwind;
use crate::state::State;
use crate::value::{Object, ObjRef, Value};

fn str_rope(st: &State, r: ObjRef) -> crate::rope::Rope {
    match st.heap.get(r) {
        Object::Str(rope) => rope.clone(),
        _ => panic!("logic flaw: not a string"),
    }
}

fn check_index(st: &mut State, len: usize, k: i32) -> Result<usize, Unwind> {
    if k < 0 || k as usize >= len {
        return Err(st.errorf("index out of range: ~s", &[Value::Int(k)]));
    }
    Ok(k as usize)
}

fn check_range(st: &mut State, len: usize, start: i32, end: i32) -> Result<(usize, usize), Unwind> {
    if start < 0 || end < start || end as usize > len {
        return Err(st.errorf(
            "invalid range: ~s ~s",
            &[Value::Int(start), Value::Int(end)],
        ));
    }
    Ok((start as usize, end as usize))
}

fn native_string_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Str(_)));
    Ok(Value::Bool(is))
}

fn native_make_string(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("i|c")?;
    let len = args.int(st)?;
    let fill = args.opt_char(st)?.unwrap_or(b' ');
    if len < 0 {
        return Err(st.errorf("make-string: negative length given ~s", &[Value::Int(len)]));
    }
    let buf = vec![fill; len as usize];
    Ok(st.make_str(&buf))
}

fn native_string_length(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("s")?;
    let s = args.str(st)?;
    let len = str_rope(st, s).weight();
    Ok(Value::Int(len as i32))
}

fn native_string_ref(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("si")?;
    let s = args.str(st)?;
    let k = args.int(st)?;
    let rope = str_rope(st, s);
    let k = check_index(st, rope.weight(), k)?;
    Ok(Value::Char(rope.at(k)))
}

fn native_string_set(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("sic")?;
    let s = args.str(st)?;
    let k = args.int(st)?;
    let c = args.char(st)?;

    let rope = str_rope(st, s);
    let len = rope.weight();
    let k = check_index(st, len, k)?;

    let x = rope.slice(0, k);
    let y = crate::rope::Rope::from_bytes(&[c]);
    let z = rope.slice(k + 1, len);
    st.str_update(s, x.concat(&y).concat(&z));
    Ok(Value::Undef)
}

fn native_string_copy(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("s|ii")?;
    let s = args.str(st)?;
    let rope = str_rope(st, s);
    let len = rope.weight();
    let start = args.opt_int(st)?.unwrap_or(0);
    let end = args.opt_int(st)?.unwrap_or(len as i32);
    let (start, end) = check_range(st, len, start, end)?;
    let sub = rope.slice(start, end);
    Ok(st.alloc(Object::Str(sub)))
}

fn native_string_fill(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("sc|ii")?;
    let s = args.str(st)?;
    let c = args.char(st)?;
    let rope = str_rope(st, s);
    let len = rope.weight();
    let start = args.opt_int(st)?.unwrap_or(0);
    let end = args.opt_int(st)?.unwrap_or(len as i32);
    let (start, end) = check_range(st, len, start, end)?;

    let x = rope.slice(0, start);
    let y = crate::rope::Rope::from_bytes(&vec![c; end - start]);
    let z = rope.slice(end, len);
    st.str_update(s, x.concat(&y).concat(&z));
    Ok(Value::Undef)
}

fn native_string_append(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    let mut acc = crate::rope::Rope::from_bytes(b"");
    for v in args.rest() {
        let rope = match v {
            Value::Obj(r) => match st.heap.get(r) {
                Object::Str(rope) => Some(rope.clone()),
                _ => None,
            },
            _ => None,
        };
        let Some(rope) = rope else {
            return Err(st.errorf("expected string, but got ~s", &[v]));
        };
        acc = acc.concat(&rope);
    }
    Ok(st.alloc(Object::Str(acc)))
}

fn native_string_to_list(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("s|ii")?;
    let s = args.str(st)?;
    let rope = str_rope(st, s);
    let len = rope.weight();
    let start = args.opt_int(st)?.unwrap_or(0);
    let end = args.opt_int(st)?.unwrap_or(len as i32);
    let (start, end) = check_range(st, len, start, end)?;

    let chars: Vec<Value> = (start..end).map(|i| Value::Char(rope.at(i))).collect();
    Ok(st.list(&chars))
}

fn native_list_to_string(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let l = args.value(st)?;
    let items = st.list_vec(l)?;
    let mut buf = Vec::with_capacity(items.len());
    for v in items {
        match v {
            Value::Char(c) => buf.push(c),
            _ => return Err(st.errorf("expected char, but got ~s", &[v])),
        }
    }
    Ok(st.make_str(&buf))
}

fn string_cmp(st: &mut State, args: &[Value]) -> Result<Vec<Vec<u8>>, Unwind> {
    let mut out = Vec::with_capacity(args.len());
    for &v in args {
        let Value::Obj(r) = v else {
            return Err(st.errorf("expected string, but got ~s", &[v]));
        };
        if !matches!(st.heap.get(r), Object::Str(_)) {
            return Err(st.errorf("expected string, but got ~s", &[v]));
        }
        out.push(st.string_bytes(r));
    }
    Ok(out)
}

fn native_string_eq(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    let strs = string_cmp(st, &args.rest())?;
    Ok(Value::Bool(strs.windows(2).all(|w| w[0] == w[1])))
}

fn native_string_lt(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    let strs = string_cmp(st, &args.rest())?;
    Ok(Value::Bool(strs.windows(2).all(|w| w[0] < w[1])))
}

fn native_string_gt(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    let strs = string_cmp(st, &args.rest())?;
    Ok(Value::Bool(strs.windows(2).all(|w| w[0] > w[1])))
}

fn native_substring(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("sii")?;
    let s = args.str(st)?;
    let start = args.int(st)?;
    let end = args.int(st)?;
    let rope = str_rope(st, s);
    let (start, end) = check_range(st, rope.weight(), start, end)?;
    let sub = rope.slice(start, end);
    Ok(st.alloc(Object::Str(sub)))
}

pub(crate) fn init(st: &mut State) {
    st.defun("string?", native_string_p);
    st.defun("make-string", native_make_string);
    st.defun("string-length", native_string_length);
    st.defun("string-ref", native_string_ref);
    st.defun("string-set!", native_string_set);
    st.defun("string-copy", native_string_copy);
    st.defun("string-fill!", native_string_fill);
    st.defun("string-append", native_string_append);
    st.defun("string->list", native_string_to_list);
    st.defun("list->string", native_list_to_string);
    st.defun("substring", native_substring);
    st.defun("string=?", native_string_eq);
    st.defun("string<?", native_string_lt);
    st.defun("string>?", native_string_gt);
}
