// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Exception machinery: handler stack, raising, and error objects.
//!
//! Raising is a first-class unwind: fallible operations return
//! `Result<_, Unwind>` and `?` carries the raise outward. Before any
//! unwind leaves the VM, every live frame's captured registers are torn
//! off so closures survive the frames they were created in.
//!
//! The handler stack holds native or interpreted handler procedures.
//! `raise-continuable` pops the current handler, calls it, pushes it
//! back and returns its value to the raise point. A non-continuable
//! `raise` pops the handler for good; entries installed by
//! `with-exception-handler` carry a catch token and transfer control
//! back to their installed frame with the handler's value, while a
//! handler installed through the bare `push_handler` API that returns
//! normally is itself an error reported to the surrounding handler.

#[cfg(test)]
mod error_test;

use crate::value::{ErrObj, Object, ObjRef, Proc, Value};
use crate::state::State;
use crate::vm;
use crate::writer;

/// A non-local transfer in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Unwind {
    /// An error value looking for a handler.
    Raise(Value),
    /// Control returning to the `with-exception-handler` frame
    /// identified by `token`, carrying the handler's value.
    Escape { token: u64, value: Value },
}

/// Embedding-boundary error: an exception left the interpreter with no
/// handler installed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No handler caught the raised value.
    #[error("{message}")]
    Uncaught {
        /// Rendered error message, irritants included.
        message: String,
    },
}

/// An entry on the exception handler stack.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Handler {
    pub proc: ObjRef,
    /// Catch token of the `with-exception-handler` frame that installed
    /// this entry, if any.
    pub catch: Option<u64>,
}

impl State {
    /// Install an exception handler. The stack grows as needed.
    pub fn push_handler(&mut self, handler: ObjRef) {
        self.handlers.push(Handler {
            proc: handler,
            catch: None,
        });
    }

    /// Remove the innermost exception handler.
    ///
    /// # Panics
    ///
    /// Panics when the handler stack is empty; an unmatched pop is an
    /// unrecoverable protocol violation.
    pub fn pop_handler(&mut self) -> ObjRef {
        match self.handlers.pop() {
            Some(h) => h.proc,
            None => panic!("pop from empty exception handler stack"),
        }
    }

    pub(crate) fn handler_depth(&self) -> usize {
        self.handlers.len()
    }

    /// Build an error object: type symbol, message, irritants, and a
    /// stack snapshot formatted from the live call-info chain.
    pub fn make_error(&mut self, etype: &str, msg: &str, irritants: Value) -> Value {
        let stack = self.backtrace();
        let etype = self.intern(etype);
        let msg = match self.make_str(msg.as_bytes()) {
            Value::Obj(r) => r,
            _ => unreachable!(),
        };
        let stack = match self.make_str(stack.as_bytes()) {
            Value::Obj(r) => r,
            _ => unreachable!(),
        };
        self.alloc(Object::Error(ErrObj {
            etype,
            msg,
            irritants,
            stack,
        }))
    }

    /// Format the live call-info chain into a backtrace string.
    #[must_use]
    pub fn backtrace(&self) -> String {
        let mut out = String::new();
        for (depth, ci) in self.ci.iter().enumerate().rev() {
            let callee = self.stack.get(ci.fp).copied().unwrap_or(Value::Undef);
            let what = match callee {
                Value::Obj(r) => match self.heap.get(r) {
                    Object::Proc(Proc::Native { .. }) => "#<native procedure>",
                    Object::Proc(Proc::Closure { .. }) => "#<closure>",
                    _ => "#<value>",
                },
                _ => "#<value>",
            };
            out.push_str(&format!("  [{depth}] {what}\n"));
        }
        out
    }

    /// Format a message, substituting `~a` (display), `~s` (write) and
    /// `~%` (newline). Each `~a`/`~s` consumes one value; the consumed
    /// values become the irritants of the raised error.
    pub fn format_message(&mut self, fmt: &str, vals: &[Value]) -> String {
        let mut out = String::new();
        let mut vals = vals.iter();
        let mut chars = fmt.chars();
        while let Some(c) = chars.next() {
            if c != '~' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('a') => {
                    let v = vals.next().copied().unwrap_or(Value::Undef);
                    out.push_str(&writer::display_string(self, v));
                }
                Some('s') => {
                    let v = vals.next().copied().unwrap_or(Value::Undef);
                    out.push_str(&writer::write_string(self, v));
                }
                Some('%') => out.push('\n'),
                Some(other) => {
                    out.push('~');
                    out.push(other);
                }
                None => out.push('~'),
            }
        }
        out
    }

    /// Format and raise a default-typed error. The values consumed by
    /// `~a`/`~s` directives are carried as irritants.
    pub fn errorf(&mut self, fmt: &str, vals: &[Value]) -> Unwind {
        let msg = self.format_message(fmt, vals);
        let irritants = self.list(vals);
        let err = self.make_error("", &msg, irritants);
        raise(self, err)
    }
}

/// Raise a non-continuable exception.
///
/// Tears off every live frame's registers, then walks the handler
/// stack: the innermost handler is popped (so it is not its own
/// handler) and called with the error. A handler installed by
/// `with-exception-handler` transfers control to its installed frame
/// with the handler's value; a bare handler that returns normally is
/// reported as "handler returned on non-continuable raise" to the
/// surrounding handler. With no handlers left the raise propagates out
/// of the embedding API.
pub fn raise(st: &mut State, err: Value) -> Unwind {
    vm::tear_off_all(st);

    let mut err = err;
    loop {
        let Some(handler) = st.handlers.pop() else {
            st.err = err;
            return Unwind::Raise(err);
        };
        match vm::apply(st, Value::Obj(handler.proc), &[err]) {
            Err(u) => return u,
            Ok(v) => match handler.catch {
                Some(token) => return Unwind::Escape { token, value: v },
                None => {
                    let msg = st.format_message(
                        "error handler returned with ~s on non-continuable raise of ~s",
                        &[v, err],
                    );
                    let irritants = st.list(&[v, err]);
                    err = st.make_error("", &msg, irritants);
                }
            },
        }
    }
}

/// Raise a continuable exception: the innermost handler runs without
/// itself installed, and its value is returned to the raise point.
pub fn raise_continuable(st: &mut State, err: Value) -> Result<Value, Unwind> {
    let Some(handler) = st.handlers.pop() else {
        st.err = err;
        return Err(Unwind::Raise(err));
    };
    let r = vm::apply(st, Value::Obj(handler.proc), &[err]);
    st.handlers.push(handler);
    r
}

/// Render an unwind that reached the embedding boundary.
pub(crate) fn boundary_error(st: &mut State, u: Unwind) -> Error {
    let v = match u {
        Unwind::Raise(v) | Unwind::Escape { value: v, .. } => v,
    };
    let message = match v {
        Value::Obj(r) => match self_err(st, r) {
            Some((msg, irritants)) => {
                let irr = writer::write_string(st, irritants);
                if irritants.is_nil() {
                    msg
                } else {
                    format!("{msg} {irr}")
                }
            }
            None => writer::write_string(st, v),
        },
        other => writer::write_string(st, other),
    };
    Error::Uncaught { message }
}

fn self_err(st: &mut State, r: ObjRef) -> Option<(String, Value)> {
    let Object::Error(e) = st.heap.get(r) else {
        return None;
    };
    let e = *e;
    let msg = String::from_utf8_lossy(&st.string_bytes(e.msg)).into_owned();
    Some((msg, e.irritants))
}
