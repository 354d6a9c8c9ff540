// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Selva VM
//!
//! An embeddable interpreter for a small, lexically scoped,
//! dynamically typed Lisp dialect in the Scheme family.
//!
//! This crate provides:
//! - Tagged immediate values and a mark-sweep garbage-collected heap
//! - Rope-backed immutable strings with copy-on-write sharing
//! - An S-expression reader (dispatch tables, datum labels) and writer
//! - A stack-based bytecode VM with closures and proper tail calls
//! - An exception-handler stack with continuable and terminating raises
//! - A format-string bridge from the VM stack into native procedures
//! - The [`State`] embedding API: one explicit state, no globals
//!
//! The interpreter is strictly single-threaded: a [`State`] must not be
//! shared across threads.

pub mod bridge;
pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod gc;
pub mod heap;
pub mod intrinsics;
pub mod port;
pub mod reader;
pub mod rope;
pub mod state;
pub mod value;
pub mod vm;
pub mod writer;

// Re-export commonly used types at crate root
pub use error::{Error, Unwind};
pub use state::{State, BASE_LIBRARY};
pub use value::{NativeFn, ObjRef, Object, Type, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
