// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Predicates, characters, vectors, dictionaries, records, parameters
//! and the I/O entry points.

use crate::error::Unwind;
use crate::reader;
use crate::state::State;
use crate::value::{Object, Proc, Record, Value};
use crate::vm;
use crate::writer;

fn native_eq(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let a = args.value(st)?;
    let b = args.value(st)?;
    Ok(Value::Bool(a.is_eq(&b)))
}

fn native_eqv(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let a = args.value(st)?;
    let b = args.value(st)?;
    Ok(Value::Bool(a.is_eqv(&b)))
}

fn native_equal(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let a = args.value(st)?;
    let b = args.value(st)?;
    Ok(Value::Bool(st.equal(a, b)))
}

fn native_boolean_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(matches!(v, Value::Bool(_))))
}

fn native_procedure_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Proc(_)));
    Ok(Value::Bool(is))
}

fn native_number_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(matches!(
        v,
        Value::Int(_) | Value::Float(_)
    )))
}

fn native_integer_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(matches!(v, Value::Int(_))))
}

fn native_char_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(matches!(v, Value::Char(_))))
}

fn native_eof_object_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    Ok(Value::Bool(matches!(v, Value::Eof)))
}

fn native_eof_object(st: &mut State) -> Result<Value, Unwind> {
    st.args("")?;
    Ok(Value::Eof)
}

fn native_char_to_integer(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("c")?;
    let c = args.char(st)?;
    Ok(Value::Int(i32::from(c)))
}

fn native_integer_to_char(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("i")?;
    let n = args.int(st)?;
    if !(0..=255).contains(&n) {
        return Err(st.errorf("char out of range: ~s", &[Value::Int(n)]));
    }
    Ok(Value::Char(n as u8))
}

fn native_symbol_to_string(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("m")?;
    let sym = args.sym(st)?;
    let name = st.symbol_name(sym).to_owned();
    Ok(st.make_str(name.as_bytes()))
}

fn native_string_to_symbol(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("z")?;
    let name = args.bytes(st)?;
    let name = String::from_utf8_lossy(&name).into_owned();
    let sym = st.intern(&name);
    Ok(Value::Obj(sym))
}

fn native_vector_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Vector(_)));
    Ok(Value::Bool(is))
}

fn native_make_vector(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("i|o")?;
    let len = args.int(st)?;
    let fill = args.opt_value(st)?.unwrap_or(Value::Undef);
    if len < 0 {
        return Err(st.errorf("make-vector: negative length given ~s", &[Value::Int(len)]));
    }
    Ok(st.alloc(Object::Vector(vec![fill; len as usize])))
}

fn native_vector(st: &mut State) -> Result<Value, Unwind> {
    let args = st.args("*")?;
    Ok(st.alloc(Object::Vector(args.rest())))
}

fn native_vector_length(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("v")?;
    let v = args.vec(st)?;
    let len = match st.heap.get(v) {
        Object::Vector(elems) => elems.len(),
        _ => unreachable!(),
    };
    Ok(Value::Int(len as i32))
}

fn native_vector_ref(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("vi")?;
    let v = args.vec(st)?;
    let k = args.int(st)?;
    let elem = match st.heap.get(v) {
        Object::Vector(elems) => elems.get(k as usize).copied(),
        _ => unreachable!(),
    };
    match elem {
        Some(e) if k >= 0 => Ok(e),
        _ => Err(st.errorf("index out of range: ~s", &[Value::Int(k)])),
    }
}

fn native_vector_set(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("vio")?;
    let v = args.vec(st)?;
    let k = args.int(st)?;
    let e = args.value(st)?;
    let len = match st.heap.get(v) {
        Object::Vector(elems) => elems.len(),
        _ => unreachable!(),
    };
    if k < 0 || k as usize >= len {
        return Err(st.errorf("index out of range: ~s", &[Value::Int(k)]));
    }
    if let Object::Vector(elems) = st.heap.get_mut(v) {
        elems[k as usize] = e;
    }
    Ok(Value::Undef)
}

fn native_vector_to_list(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("v")?;
    let v = args.vec(st)?;
    let elems = match st.heap.get(v) {
        Object::Vector(elems) => elems.clone(),
        _ => unreachable!(),
    };
    Ok(st.list(&elems))
}

fn native_list_to_vector(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let l = args.value(st)?;
    let items = st.list_vec(l)?;
    Ok(st.alloc(Object::Vector(items)))
}

fn native_make_dictionary(st: &mut State) -> Result<Value, Unwind> {
    st.args("")?;
    Ok(st.alloc(Object::Dict(rustc_hash::FxHashMap::default())))
}

fn native_dictionary_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Dict(_)));
    Ok(Value::Bool(is))
}

fn native_dictionary_ref(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("dm")?;
    let d = args.dict(st)?;
    let k = args.sym(st)?;
    let hit = match st.heap.get(d) {
        Object::Dict(map) => map.get(&k).copied(),
        _ => unreachable!(),
    };
    match hit {
        Some(v) => Ok(v),
        None => Err(st.errorf("key not found: ~s", &[Value::Obj(k)])),
    }
}

fn native_dictionary_set(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("dmo")?;
    let d = args.dict(st)?;
    let k = args.sym(st)?;
    let v = args.value(st)?;
    if let Object::Dict(map) = st.heap.get_mut(d) {
        map.insert(k, v);
    }
    Ok(Value::Undef)
}

fn native_make_record(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("oo")?;
    let rtype = args.value(st)?;
    let datum = args.value(st)?;
    Ok(st.alloc(Object::Record(Record { rtype, datum })))
}

fn native_record_p(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o")?;
    let v = args.value(st)?;
    let is = matches!(v, Value::Obj(r) if matches!(st.heap.get(r), Object::Record(_)));
    Ok(Value::Bool(is))
}

fn native_record_type(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("r")?;
    let r = args.record(st)?;
    match st.heap.get(r) {
        Object::Record(rec) => Ok(rec.rtype),
        _ => unreachable!(),
    }
}

fn native_record_datum(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("r")?;
    let r = args.record(st)?;
    match st.heap.get(r) {
        Object::Record(rec) => Ok(rec.datum),
        _ => unreachable!(),
    }
}

fn native_apply(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("l*")?;
    let proc = args.proc(st)?;
    let rest = args.rest();
    let mut all = Vec::new();
    match rest.split_last() {
        None => {}
        Some((last, init)) => {
            all.extend_from_slice(init);
            all.extend(st.list_vec(*last)?);
        }
    }
    vm::apply(st, Value::Obj(proc), &all)
}

fn native_read(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("p")?;
    let port = args.port(st)?;
    reader::read(st, port)
}

fn native_write(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o|p")?;
    let v = args.value(st)?;
    let port = args.opt_port(st)?;
    let text = writer::write_string(st, v);
    match port {
        Some(p) => st.port_write(p, text.as_bytes()),
        None => print_stdout(&text),
    }
    Ok(Value::Undef)
}

fn native_display(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("o|p")?;
    let v = args.value(st)?;
    let port = args.opt_port(st)?;
    let text = writer::display_string(st, v);
    match port {
        Some(p) => st.port_write(p, text.as_bytes()),
        None => print_stdout(&text),
    }
    Ok(Value::Undef)
}

fn native_newline(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("|p")?;
    let port = args.opt_port(st)?;
    match port {
        Some(p) => st.port_write(p, b"\n"),
        None => print_stdout("\n"),
    }
    Ok(Value::Undef)
}

fn print_stdout(text: &str) {
    use std::io::Write;
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

fn native_features(st: &mut State) -> Result<Value, Unwind> {
    st.args("")?;
    Ok(st.features)
}

fn native_open_input_string(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("z")?;
    let bytes = args.bytes(st)?;
    Ok(st.make_input_port(&bytes))
}

fn native_open_output_string(st: &mut State) -> Result<Value, Unwind> {
    st.args("")?;
    Ok(st.make_output_port())
}

fn native_get_output_string(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("p")?;
    let port = args.port(st)?;
    let contents = st.port_contents(port);
    Ok(st.make_str(&contents))
}

/// Entry point of parameter objects made by `defvar`: no argument reads
/// the cell, one argument writes it (through the converter if one was
/// given).
pub(crate) fn native_var_call(st: &mut State) -> Result<Value, Unwind> {
    let mut args = st.args("&|o")?;
    let me = args
        .self_proc()
        .expect("logic flaw: parameter without self");
    let locals = match me {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Proc(Proc::Native { locals, .. }) => locals.clone(),
            _ => panic!("logic flaw: parameter is not native"),
        },
        _ => panic!("logic flaw: parameter is not native"),
    };
    let cell = locals[0];
    let conv = locals[1];

    match args.opt_value(st)? {
        None => st.car(cell),
        Some(v) => {
            let v = if matches!(conv, Value::Obj(r) if matches!(st.heap.get(r), Object::Proc(_)))
            {
                vm::apply(st, conv, &[v])?
            } else {
                v
            };
            st.set_car(cell, v)?;
            Ok(Value::Undef)
        }
    }
}

pub(crate) fn init(st: &mut State) {
    st.defun("eq?", native_eq);
    st.defun("eqv?", native_eqv);
    st.defun("equal?", native_equal);
    st.defun("boolean?", native_boolean_p);
    st.defun("procedure?", native_procedure_p);
    st.defun("number?", native_number_p);
    st.defun("integer?", native_integer_p);
    st.defun("char?", native_char_p);
    st.defun("eof-object?", native_eof_object_p);
    st.defun("eof-object", native_eof_object);
    st.defun("char->integer", native_char_to_integer);
    st.defun("integer->char", native_integer_to_char);
    st.defun("symbol->string", native_symbol_to_string);
    st.defun("string->symbol", native_string_to_symbol);
    st.defun("vector?", native_vector_p);
    st.defun("make-vector", native_make_vector);
    st.defun("vector", native_vector);
    st.defun("vector-length", native_vector_length);
    st.defun("vector-ref", native_vector_ref);
    st.defun("vector-set!", native_vector_set);
    st.defun("vector->list", native_vector_to_list);
    st.defun("list->vector", native_list_to_vector);
    st.defun("make-dictionary", native_make_dictionary);
    st.defun("dictionary?", native_dictionary_p);
    st.defun("dictionary-ref", native_dictionary_ref);
    st.defun("dictionary-set!", native_dictionary_set);
    st.defun("make-record", native_make_record);
    st.defun("record?", native_record_p);
    st.defun("record-type", native_record_type);
    st.defun("record-datum", native_record_datum);
    st.defun("apply", native_apply);
    st.defun("read", native_read);
    st.defun("write", native_write);
    st.defun("display", native_display);
    st.defun("newline", native_newline);
    st.defun("features", native_features);
    st.defun("open-input-string", native_open_input_string);
    st.defun("open-output-string", native_open_output_string);
    st.defun("get-output-string", native_get_output_string);
}
