// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Minimal in-memory ports.
//!
//! The reader consumes input ports, the writer fills output ports or
//! the process stdout. File-backed ports live outside the core.

#[cfg(test)]
mod port_test;

use std::io::Write;

use crate::state::State;
use crate::value::{Object, ObjRef, Value};

/// An I/O port.
#[derive(Debug)]
pub enum Port {
    /// Byte input with a read cursor.
    Input { bytes: Vec<u8>, pos: usize },
    /// Byte output accumulating into a buffer.
    Output { buf: Vec<u8> },
    /// The process standard output.
    Stdout,
}

impl State {
    /// Open an input port over a copy of `bytes`.
    pub fn make_input_port(&mut self, bytes: &[u8]) -> Value {
        self.alloc(Object::Port(Port::Input {
            bytes: bytes.to_vec(),
            pos: 0,
        }))
    }

    /// Open an output string port.
    pub fn make_output_port(&mut self) -> Value {
        self.alloc(Object::Port(Port::Output { buf: Vec::new() }))
    }

    /// Open a port writing to the process standard output.
    pub fn make_stdout_port(&mut self) -> Value {
        self.alloc(Object::Port(Port::Stdout))
    }

    /// Read one byte, advancing the cursor. `None` at end of input.
    pub(crate) fn port_getc(&mut self, port: ObjRef) -> Option<u8> {
        match self.heap.get_mut(port) {
            Object::Port(Port::Input { bytes, pos }) => {
                let c = bytes.get(*pos).copied();
                if c.is_some() {
                    *pos += 1;
                }
                c
            }
            _ => None,
        }
    }

    /// Peek at the next byte without consuming it.
    pub(crate) fn port_peek(&self, port: ObjRef) -> Option<u8> {
        match self.heap.get(port) {
            Object::Port(Port::Input { bytes, pos }) => bytes.get(*pos).copied(),
            _ => None,
        }
    }

    /// Append bytes to an output port (or stdout).
    pub(crate) fn port_write(&mut self, port: ObjRef, data: &[u8]) {
        match self.heap.get_mut(port) {
            Object::Port(Port::Output { buf }) => buf.extend_from_slice(data),
            Object::Port(Port::Stdout) => {
                let mut out = std::io::stdout();
                let _ = out.write_all(data);
                let _ = out.flush();
            }
            _ => {}
        }
    }

    /// The accumulated contents of an output port.
    #[must_use]
    pub fn port_contents(&self, port: ObjRef) -> Vec<u8> {
        match self.heap.get(port) {
            Object::Port(Port::Output { buf }) => buf.clone(),
            _ => Vec::new(),
        }
    }
}
