// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Argument bridge between the VM stack and native procedures.
//!
//! A native procedure declares its signature as a format string built
//! from a closed set of codes and receives a typed cursor over the
//! current frame's operands:
//!
//! | code | meaning |
//! |------|---------|
//! | `o`  | any value |
//! | `i` / `I` | int (`I` also reports exactness) |
//! | `f` / `F` | float (`F` also reports exactness) |
//! | `c`  | character |
//! | `z`  | byte contents of a string |
//! | `m v s b l p d e r` | symbol / vector / string / bytevector / procedure / port / dictionary / error / record object |
//! | `\|` | start of optional parameters |
//! | `*`  | trailing variadic rest |
//! | `&`  | leading self-procedure |
//!
//! Parsing the format yields the required and optional counts and the
//! rest flag; the arity is checked against the frame before any value
//! is extracted. Type mismatches raise `expected <kind>, but got
//! <value>` errors through the normal exception path.

#[cfg(test)]
mod bridge_test;

use crate::error::Unwind;
use crate::state::State;
use crate::value::{Object, ObjRef, Type, Value};

/// Typed cursor over the current frame's arguments.
#[derive(Debug)]
pub struct Args {
    vals: Vec<Value>,
    pos: usize,
    self_proc: Option<Value>,
}

impl State {
    /// Parse `format`, check the current frame's arity against it and
    /// return the argument cursor.
    pub fn args(&mut self, format: &str) -> Result<Args, Unwind> {
        let mut codes = format.as_bytes();
        let mut self_proc = None;

        let ci = self.ci.last().expect("logic flaw: native call without frame");
        let fp = ci.fp;
        let argc = (ci.argc - 1) as usize;

        if codes.first() == Some(&b'&') {
            self_proc = Some(self.stack[fp]);
            codes = &codes[1..];
        }

        let mut paramc = 0usize;
        let mut optc = 0usize;
        let mut rest = false;
        let mut opt = false;
        for &c in codes {
            match c {
                b'|' => opt = true,
                b'*' => rest = true,
                _ => {
                    if opt {
                        optc += 1;
                    } else {
                        paramc += 1;
                    }
                }
            }
        }

        if argc < paramc || (argc > paramc + optc && !rest) {
            let at_least = if rest { "at least " } else { "" };
            return Err(self.errorf(
                &format!("wrong number of arguments ({argc} for {at_least}{paramc})"),
                &[],
            ));
        }

        let vals = self.stack[fp + 1..fp + 1 + argc].to_vec();
        Ok(Args {
            vals,
            pos: 0,
            self_proc,
        })
    }
}

impl Args {
    /// Number of arguments the caller passed.
    #[must_use]
    pub fn argc(&self) -> usize {
        self.vals.len()
    }

    /// Whether another argument is available (drives the optional
    /// region).
    #[must_use]
    pub fn have_next(&self) -> bool {
        self.pos < self.vals.len()
    }

    /// The caller procedure, when the format started with `&`.
    #[must_use]
    pub fn self_proc(&self) -> Option<Value> {
        self.self_proc
    }

    fn next(&mut self) -> Value {
        let v = self.vals[self.pos];
        self.pos += 1;
        v
    }

    /// `o`: any value.
    pub fn value(&mut self, _st: &mut State) -> Result<Value, Unwind> {
        Ok(self.next())
    }

    /// `i`: an integer, accepting floats by truncation.
    pub fn int(&mut self, st: &mut State) -> Result<i32, Unwind> {
        Ok(self.int_exact(st)?.0)
    }

    /// `I`: an integer plus an exactness flag (false if the source was
    /// a float).
    pub fn int_exact(&mut self, st: &mut State) -> Result<(i32, bool), Unwind> {
        let v = self.next();
        match v {
            Value::Int(n) => Ok((n, true)),
            Value::Float(f) => Ok((f as i32, false)),
            _ => Err(st.errorf("expected integer, but got ~s", &[v])),
        }
    }

    /// `f`: a float, accepting integers.
    pub fn float(&mut self, st: &mut State) -> Result<f64, Unwind> {
        Ok(self.float_exact(st)?.0)
    }

    /// `F`: a float plus an exactness flag.
    pub fn float_exact(&mut self, st: &mut State) -> Result<(f64, bool), Unwind> {
        let v = self.next();
        match v {
            Value::Float(f) => Ok((f, false)),
            Value::Int(n) => Ok((f64::from(n), true)),
            _ => Err(st.errorf("expected float, but got ~s", &[v])),
        }
    }

    /// `c`: a character.
    pub fn char(&mut self, st: &mut State) -> Result<u8, Unwind> {
        let v = self.next();
        match v {
            Value::Char(c) => Ok(c),
            _ => Err(st.errorf("expected char, but got ~s", &[v])),
        }
    }

    fn typed(&mut self, st: &mut State, ty: Type) -> Result<ObjRef, Unwind> {
        let v = self.next();
        if let Value::Obj(r) = v {
            if st.heap.get(r).type_tag() == ty {
                return Ok(r);
            }
        }
        Err(st.errorf(&format!("expected {}, but got ~s", ty.name()), &[v]))
    }

    /// `s`: a string object.
    pub fn str(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::String)
    }

    /// `z`: the byte contents of a string.
    pub fn bytes(&mut self, st: &mut State) -> Result<Vec<u8>, Unwind> {
        let r = self.typed(st, Type::String)?;
        Ok(st.string_bytes(r))
    }

    /// `m`: a symbol object.
    pub fn sym(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Symbol)
    }

    /// `v`: a vector object.
    pub fn vec(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Vector)
    }

    /// `b`: a bytevector object.
    pub fn blob(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Blob)
    }

    /// `l`: a procedure object.
    pub fn proc(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Proc)
    }

    /// `p`: a port object.
    pub fn port(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Port)
    }

    /// `d`: a dictionary object.
    pub fn dict(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Dict)
    }

    /// `e`: an error object.
    pub fn error_obj(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Error)
    }

    /// `r`: a record object.
    pub fn record(&mut self, st: &mut State) -> Result<ObjRef, Unwind> {
        self.typed(st, Type::Record)
    }

    /// Optional `o`.
    pub fn opt_value(&mut self, st: &mut State) -> Result<Option<Value>, Unwind> {
        if self.have_next() {
            Ok(Some(self.value(st)?))
        } else {
            Ok(None)
        }
    }

    /// Optional `i`.
    pub fn opt_int(&mut self, st: &mut State) -> Result<Option<i32>, Unwind> {
        if self.have_next() {
            Ok(Some(self.int(st)?))
        } else {
            Ok(None)
        }
    }

    /// Optional `c`.
    pub fn opt_char(&mut self, st: &mut State) -> Result<Option<u8>, Unwind> {
        if self.have_next() {
            Ok(Some(self.char(st)?))
        } else {
            Ok(None)
        }
    }

    /// Optional `p`.
    pub fn opt_port(&mut self, st: &mut State) -> Result<Option<ObjRef>, Unwind> {
        if self.have_next() {
            Ok(Some(self.port(st)?))
        } else {
            Ok(None)
        }
    }

    /// `*`: the remaining arguments.
    #[must_use]
    pub fn rest(&self) -> Vec<Value> {
        self.vals[self.pos..].to_vec()
    }
}
