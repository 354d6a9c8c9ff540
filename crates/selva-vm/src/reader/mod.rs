// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! S-expression reader.
//!
//! Character-driven: a 256-entry dispatch table keyed on the first
//! character of a token, plus a secondary table for characters
//! following `#`. Handlers that consume without producing (line,
//! block and datum comments, directives) yield `None` and the caller
//! retries.
//!
//! Datum labels (`#n=` / `#n#`) pre-insert a placeholder pair or
//! vector into the labels map before reading the body, then patch the
//! placeholder's contents, so references inside the body resolve to
//! the same object and cyclic data reads correctly.
//!
//! Every reader failure raises an error of type `read` carrying the
//! offending character or index as irritants.

#[cfg(test)]
mod reader_test;

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::error::{self, Unwind};
use crate::state::State;
use crate::value::{Object, ObjRef, Value};

type ReadFn = for<'a, 'b> fn(&'a mut ReadCtx<'b>, u8) -> Result<Option<Value>, Unwind>;

const DELIMS: &[u8] = b"();,|\" \t\n\r";

fn is_delim(c: Option<u8>) -> bool {
    match c {
        None => true,
        Some(c) => DELIMS.contains(&c),
    }
}

pub(crate) struct ReadCtx<'a> {
    st: &'a mut State,
    port: ObjRef,
    labels: FxHashMap<i32, Value>,
}

/// Read one datum from `port`; the EOF marker at end of input.
pub(crate) fn read(st: &mut State, port: ObjRef) -> Result<Value, Unwind> {
    let ai = st.gc_arena_preserve();
    let mut ctx = ReadCtx {
        st,
        port,
        labels: FxHashMap::default(),
    };
    loop {
        let c = ctx.next();
        let Some(c) = ctx.skip_ws(c) else {
            ctx.st.gc_arena_restore(ai);
            return Ok(Value::Eof);
        };
        match ctx.read_nullable(c)? {
            Some(v) => {
                ctx.st.gc_arena_restore(ai);
                return Ok(ctx.st.gc_protect(v));
            }
            None => ctx.st.gc_arena_restore(ai),
        }
    }
}

impl ReadCtx<'_> {
    fn next(&mut self) -> Option<u8> {
        self.st.port_getc(self.port)
    }

    fn peek(&self) -> Option<u8> {
        self.st.port_peek(self.port)
    }

    fn skip_ws(&mut self, mut c: Option<u8>) -> Option<u8> {
        while matches!(c, Some(c) if c.is_ascii_whitespace()) {
            c = self.next();
        }
        c
    }

    /// Read the next non-whitespace character.
    fn next_nonws(&mut self) -> Option<u8> {
        let c = self.next();
        self.skip_ws(c)
    }

    /// Consume `s` if it is next on the port.
    fn expect(&mut self, s: &str) -> bool {
        for &e in s.as_bytes() {
            if self.peek() != Some(e) {
                return false;
            }
            self.next();
        }
        true
    }

    fn fold(&self, c: u8) -> u8 {
        if self.st.fold_case {
            c.to_ascii_lowercase()
        } else {
            c
        }
    }

    fn read_error(&mut self, msg: &str, irritants: &[Value]) -> Unwind {
        let irr = self.st.list(irritants);
        let err = self.st.make_error("read", msg, irr);
        error::raise(self.st, err)
    }

    /// Dispatch on the first character; `None` when the handler only
    /// consumed (comments, directives).
    fn read_nullable(&mut self, c: u8) -> Result<Option<Value>, Unwind> {
        match base_table()[c as usize] {
            Some(f) => f(self, c),
            None => Err(self.read_error(
                "invalid character at the seeker head",
                &[Value::Char(c)],
            )),
        }
    }

    /// Read one full datum starting at `c`, skipping comments; EOF in
    /// the middle of a datum is an error.
    fn read_datum(&mut self, c: Option<u8>) -> Result<Value, Unwind> {
        let mut c = c;
        loop {
            let Some(cc) = self.skip_ws(c) else {
                return Err(self.read_error("unexpected EOF", &[]));
            };
            match self.read_nullable(cc)? {
                Some(v) => return Ok(v),
                None => c = self.next(),
            }
        }
    }
}

// ---- handlers ---------------------------------------------------------

fn read_unmatch(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    Err(ctx.read_error("unmatched parenthesis", &[]))
}

fn read_comment(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    loop {
        match ctx.next() {
            None | Some(b'\n') => return Ok(None),
            Some(_) => {}
        }
    }
}

fn read_block_comment(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    // nestable: #| ... |#
    let mut depth = 1;
    let mut x;
    let mut y = ctx.next();
    while let Some(cur) = y {
        if depth == 0 {
            break;
        }
        x = cur;
        y = ctx.next();
        if x == b'|' && y == Some(b'#') {
            depth -= 1;
            if depth == 0 {
                break;
            }
            y = ctx.next();
        } else if x == b'#' && y == Some(b'|') {
            depth += 1;
            y = ctx.next();
        }
    }
    Ok(None)
}

fn read_datum_comment(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let c = ctx.next();
    ctx.read_datum(c)?;
    Ok(None)
}

fn read_directive(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    match ctx.peek() {
        Some(b'n') => {
            if ctx.expect("no-fold-case") {
                ctx.st.fold_case = false;
                return Ok(None);
            }
        }
        Some(b'f') => {
            if ctx.expect("fold-case") {
                ctx.st.fold_case = true;
                return Ok(None);
            }
        }
        _ => {}
    }
    read_comment(ctx, c)
}

fn wrap(ctx: &mut ReadCtx<'_>, sym: ObjRef) -> Result<Option<Value>, Unwind> {
    let c = ctx.next();
    let v = ctx.read_datum(c)?;
    let inner = ctx.st.cons(v, Value::Nil);
    Ok(Some(ctx.st.cons(Value::Obj(sym), inner)))
}

fn read_quote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = ctx.st.reserved.quote;
    wrap(ctx, sym)
}

fn read_quasiquote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = ctx.st.reserved.quasiquote;
    wrap(ctx, sym)
}

fn read_unquote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = if ctx.peek() == Some(b'@') {
        ctx.next();
        ctx.st.reserved.unquote_splicing
    } else {
        ctx.st.reserved.unquote
    };
    wrap(ctx, sym)
}

fn read_syntax_quote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = ctx.st.reserved.syntax_quote;
    wrap(ctx, sym)
}

fn read_syntax_quasiquote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = ctx.st.reserved.syntax_quasiquote;
    wrap(ctx, sym)
}

fn read_syntax_unquote(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let sym = if ctx.peek() == Some(b'@') {
        ctx.next();
        ctx.st.reserved.syntax_unquote_splicing
    } else {
        ctx.st.reserved.syntax_unquote
    };
    wrap(ctx, sym)
}

fn read_symbol(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    let mut name = vec![ctx.fold(c)];
    while !is_delim(ctx.peek()) {
        let c = ctx.next().expect("logic flaw: peeked char vanished");
        name.push(ctx.fold(c));
    }
    let name = String::from_utf8_lossy(&name).into_owned();
    let sym = ctx.st.intern(&name);
    Ok(Some(Value::Obj(sym)))
}

fn valid_int(f: f64) -> bool {
    f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX)
}

fn read_unsigned(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Value, Unwind> {
    if !c.is_ascii_digit() {
        return Err(ctx.read_error("expected one or more digits", &[Value::Char(c)]));
    }
    let mut buf = String::new();
    buf.push(c as char);
    let mut dpe = 0;

    while matches!(ctx.peek(), Some(c) if c.is_ascii_digit()) {
        buf.push(ctx.next().unwrap_or(b'0') as char);
    }
    if ctx.peek() == Some(b'.') {
        dpe += 1;
        buf.push(ctx.next().unwrap_or(b'.') as char);
        while matches!(ctx.peek(), Some(c) if c.is_ascii_digit()) {
            buf.push(ctx.next().unwrap_or(b'0') as char);
        }
    }
    if matches!(ctx.peek(), Some(b'e' | b'E')) {
        dpe += 1;
        buf.push(ctx.next().unwrap_or(b'e') as char);
        if matches!(ctx.peek(), Some(b'+' | b'-')) {
            buf.push(ctx.next().unwrap_or(b'+') as char);
        }
        if !matches!(ctx.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(ctx.read_error("expected one or more digits", &[]));
        }
        while matches!(ctx.peek(), Some(c) if c.is_ascii_digit()) {
            buf.push(ctx.next().unwrap_or(b'0') as char);
        }
    }

    if !is_delim(ctx.peek()) {
        let c = ctx.peek().unwrap_or(0);
        return Err(ctx.read_error(
            "non-delimiter character given after number",
            &[Value::Char(c)],
        ));
    }

    let flt: f64 = match buf.parse() {
        Ok(f) => f,
        Err(_) => return Err(ctx.read_error("invalid number", &[])),
    };
    if dpe == 0 && valid_int(flt) {
        Ok(Value::Int(flt as i32))
    } else {
        Ok(Value::Float(flt))
    }
}

fn read_number(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    Ok(Some(read_unsigned(ctx, c)?))
}

fn negate(v: Value) -> Value {
    match v {
        Value::Int(n) if n != i32::MIN => Value::Int(-n),
        Value::Int(n) => Value::Float(-f64::from(n)),
        Value::Float(f) => Value::Float(-f),
        other => other,
    }
}

fn signed_symbol(ctx: &mut ReadCtx<'_>, c: u8) -> Result<(Value, String), Unwind> {
    let sym = read_symbol(ctx, c)?.expect("logic flaw: symbol handler returned none");
    let name = match sym {
        Value::Obj(r) => ctx.st.symbol_name(r).to_owned(),
        _ => String::new(),
    };
    Ok((sym, name))
}

fn read_minus(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    if matches!(ctx.peek(), Some(d) if d.is_ascii_digit()) {
        let d = ctx.next().expect("logic flaw: peeked char vanished");
        return Ok(Some(negate(read_unsigned(ctx, d)?)));
    }
    let (sym, name) = signed_symbol(ctx, c)?;
    if name.eq_ignore_ascii_case("-inf.0") {
        return Ok(Some(Value::Float(f64::NEG_INFINITY)));
    }
    if name.eq_ignore_ascii_case("-nan.0") {
        return Ok(Some(Value::Float(-f64::NAN)));
    }
    Ok(Some(sym))
}

fn read_plus(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    if matches!(ctx.peek(), Some(d) if d.is_ascii_digit()) {
        let d = ctx.next().expect("logic flaw: peeked char vanished");
        return Ok(Some(read_unsigned(ctx, d)?));
    }
    let (sym, name) = signed_symbol(ctx, c)?;
    if name.eq_ignore_ascii_case("+inf.0") {
        return Ok(Some(Value::Float(f64::INFINITY)));
    }
    if name.eq_ignore_ascii_case("+nan.0") {
        return Ok(Some(Value::Float(f64::NAN)));
    }
    Ok(Some(sym))
}

fn read_true(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    if ctx.peek() == Some(b'r') {
        if !ctx.expect("rue") {
            return Err(ctx.read_error("unexpected character while reading #true", &[]));
        }
    } else if !is_delim(ctx.peek()) {
        let c = ctx.peek().unwrap_or(0);
        return Err(ctx.read_error(
            "non-delimiter character given after #t",
            &[Value::Char(c)],
        ));
    }
    Ok(Some(Value::Bool(true)))
}

fn read_false(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    if ctx.peek() == Some(b'a') {
        if !ctx.expect("alse") {
            return Err(ctx.read_error("unexpected character while reading #false", &[]));
        }
    } else if !is_delim(ctx.peek()) {
        let c = ctx.peek().unwrap_or(0);
        return Err(ctx.read_error(
            "non-delimiter character given after #f",
            &[Value::Char(c)],
        ));
    }
    Ok(Some(Value::Bool(false)))
}

fn read_char(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let Some(mut c) = ctx.next() else {
        return Err(ctx.read_error("unexpected EOF", &[]));
    };
    if !is_delim(ctx.peek()) {
        let named = |ctx: &mut ReadCtx<'_>, tail: &str, v: u8| -> Result<u8, Unwind> {
            if ctx.expect(tail) {
                Ok(v)
            } else {
                Err(ctx.read_error(
                    "unexpected character while reading character literal",
                    &[Value::Char(v)],
                ))
            }
        };
        c = match c {
            b'a' => named(ctx, "larm", 0x07)?,
            b'b' => named(ctx, "ackspace", 0x08)?,
            b'd' => named(ctx, "elete", 0x7f)?,
            b'e' => named(ctx, "scape", 0x1b)?,
            b'n' => {
                if ctx.peek() == Some(b'e') {
                    named(ctx, "ewline", b'\n')?
                } else {
                    named(ctx, "ull", 0)?
                }
            }
            b'r' => named(ctx, "eturn", b'\r')?,
            b's' => named(ctx, "pace", b' ')?,
            b't' => named(ctx, "ab", b'\t')?,
            other => {
                return Err(ctx.read_error(
                    "unexpected character after char literal",
                    &[Value::Char(other)],
                ))
            }
        };
    }
    Ok(Some(Value::Char(c)))
}

fn read_string(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let mut buf = Vec::new();
    loop {
        let Some(c) = ctx.next() else {
            return Err(ctx.read_error("unterminated string", &[]));
        };
        if c == b'"' {
            break;
        }
        if c == b'\\' {
            let Some(e) = ctx.next() else {
                return Err(ctx.read_error("unterminated string", &[]));
            };
            buf.push(match e {
                b'a' => 0x07,
                b'b' => 0x08,
                b't' => b'\t',
                b'n' => b'\n',
                b'r' => b'\r',
                other => other,
            });
        } else {
            buf.push(c);
        }
    }
    Ok(Some(ctx.st.make_str(&buf)))
}

fn read_pipe(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let mut buf = Vec::new();
    loop {
        let Some(c) = ctx.next() else {
            return Err(ctx.read_error("unterminated symbol", &[]));
        };
        if c == b'|' {
            break;
        }
        if c == b'\\' {
            let Some(e) = ctx.next() else {
                return Err(ctx.read_error("unterminated symbol", &[]));
            };
            match e {
                b'a' => buf.push(0x07),
                b'b' => buf.push(0x08),
                b't' => buf.push(b'\t'),
                b'n' => buf.push(b'\n'),
                b'r' => buf.push(b'\r'),
                b'x' => {
                    let mut hex = String::new();
                    loop {
                        let Some(h) = ctx.next() else {
                            return Err(ctx.read_error("expected ';'", &[]));
                        };
                        if h == b';' {
                            break;
                        }
                        if hex.len() >= 2 {
                            return Err(ctx.read_error("expected ';'", &[Value::Char(h)]));
                        }
                        hex.push(h as char);
                    }
                    match u8::from_str_radix(&hex, 16) {
                        Ok(b) => buf.push(b),
                        Err(_) => return Err(ctx.read_error("invalid hex escape", &[])),
                    }
                }
                other => buf.push(other),
            }
        } else {
            buf.push(c);
        }
    }
    let name = String::from_utf8_lossy(&buf).into_owned();
    let sym = ctx.st.intern(&name);
    Ok(Some(Value::Obj(sym)))
}

fn read_uinteger(ctx: &mut ReadCtx<'_>, c: u8) -> Result<u32, Unwind> {
    if !c.is_ascii_digit() {
        return Err(ctx.read_error("expected one or more digits", &[Value::Char(c)]));
    }
    let mut u = u32::from(c - b'0');
    while matches!(ctx.peek(), Some(d) if d.is_ascii_digit()) {
        let d = ctx.next().unwrap_or(b'0');
        u = u * 10 + u32::from(d - b'0');
    }
    Ok(u)
}

fn read_blob(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let mut nbits = 0u32;
    let mut c = ctx.next();
    while let Some(d) = c {
        if !d.is_ascii_digit() {
            break;
        }
        nbits = nbits * 10 + u32::from(d - b'0');
        c = ctx.next();
    }
    if nbits != 8 {
        return Err(ctx.read_error(
            "unsupported bytevector bit width",
            &[Value::Int(nbits as i32)],
        ));
    }
    if c != Some(b'(') {
        let irr = c.map(Value::Char).unwrap_or(Value::Eof);
        return Err(ctx.read_error("expected '(' character", &[irr]));
    }

    let mut data = Vec::new();
    let mut c = ctx.next();
    loop {
        let Some(cc) = ctx.skip_ws(c) else {
            return Err(ctx.read_error("unexpected EOF", &[]));
        };
        if cc == b')' {
            break;
        }
        let n = read_uinteger(ctx, cc)?;
        if n > 255 {
            return Err(ctx.read_error(
                "invalid element in bytevector literal",
                &[Value::Int(n as i32)],
            ));
        }
        data.push(n as u8);
        c = ctx.next();
    }
    Ok(Some(ctx.st.alloc(Object::Blob(data))))
}

fn read_undef_or_blob(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    if ctx.peek() == Some(b'n') {
        if !ctx.expect("ndefined") {
            return Err(ctx.read_error("unexpected character while reading #undefined", &[]));
        }
        return Ok(Some(Value::Undef));
    }
    if !matches!(ctx.peek(), Some(d) if d.is_ascii_digit()) {
        let irr = ctx.peek().map(Value::Char).unwrap_or(Value::Eof);
        return Err(ctx.read_error(
            "expect #undefined or #u8(...), but illegal character given",
            &[irr],
        ));
    }
    read_blob(ctx, c)
}

fn read_pair(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    loop {
        let Some(c) = ctx.next_nonws() else {
            return Err(ctx.read_error("unexpected EOF", &[]));
        };

        if c == b')' {
            return Ok(Some(Value::Nil));
        }

        if c == b'.' && is_delim(ctx.peek()) {
            let nc = ctx.next();
            let cdr = ctx.read_datum(nc)?;
            // only comments may appear before the closing paren
            loop {
                let Some(c) = ctx.next_nonws() else {
                    return Err(ctx.read_error("unexpected EOF", &[]));
                };
                if c == b')' {
                    return Ok(Some(cdr));
                }
                if ctx.read_nullable(c)?.is_some() {
                    return Err(ctx.read_error("unmatched parenthesis", &[]));
                }
            }
        }

        match ctx.read_nullable(c)? {
            None => {}
            Some(car) => {
                let cdr = read_pair(ctx, b'(')?.expect("logic flaw: pair reader returned none");
                return Ok(Some(ctx.st.cons(car, cdr)));
            }
        }
    }
}

fn read_vector(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    let list = read_pair(ctx, c)?.expect("logic flaw: pair reader returned none");
    let items = ctx.st.list_vec(list)?;
    Ok(Some(ctx.st.alloc(Object::Vector(items))))
}

fn read_label_set(ctx: &mut ReadCtx<'_>, i: i32) -> Result<Option<Value>, Unwind> {
    let Some(c) = ctx.next_nonws() else {
        return Err(ctx.read_error("unexpected EOF", &[]));
    };
    match c {
        b'(' => {
            // patch a placeholder pair so inner references share it
            let placeholder = ctx.st.cons(Value::Undef, Value::Undef);
            ctx.labels.insert(i, placeholder);
            let tmp = ctx.read_datum(Some(c))?;
            if let (Value::Obj(dst), Value::Obj(src)) = (placeholder, tmp) {
                let parts = match ctx.st.heap.get(src) {
                    Object::Pair(p) => Some((p.car, p.cdr)),
                    _ => None,
                };
                if let Some((car, cdr)) = parts {
                    if let Object::Pair(p) = ctx.st.heap.get_mut(dst) {
                        p.car = car;
                        p.cdr = cdr;
                    }
                    return Ok(Some(placeholder));
                }
            }
            // the body was the empty list; no sharing is possible
            ctx.labels.insert(i, tmp);
            Ok(Some(tmp))
        }
        b'#' if ctx.peek() == Some(b'(') => {
            let placeholder = ctx.st.alloc(Object::Vector(Vec::new()));
            ctx.labels.insert(i, placeholder);
            let tmp = ctx.read_datum(Some(c))?;
            if let (Value::Obj(dst), Value::Obj(src)) = (placeholder, tmp) {
                let elems = match ctx.st.heap.get(src) {
                    Object::Vector(v) => v.clone(),
                    _ => Vec::new(),
                };
                if let Object::Vector(v) = ctx.st.heap.get_mut(dst) {
                    *v = elems;
                }
            }
            Ok(Some(placeholder))
        }
        other => {
            let v = ctx.read_datum(Some(other))?;
            ctx.labels.insert(i, v);
            Ok(Some(v))
        }
    }
}

fn read_label_ref(ctx: &mut ReadCtx<'_>, i: i32) -> Result<Option<Value>, Unwind> {
    match ctx.labels.get(&i) {
        Some(&v) => Ok(Some(v)),
        None => Err(ctx.read_error("label of given index not defined", &[Value::Int(i)])),
    }
}

fn read_label(ctx: &mut ReadCtx<'_>, c: u8) -> Result<Option<Value>, Unwind> {
    let mut i = i32::from(c - b'0');
    let mut c = ctx.next();
    while let Some(d) = c {
        if !d.is_ascii_digit() {
            break;
        }
        i = i * 10 + i32::from(d - b'0');
        c = ctx.next();
    }
    match c {
        Some(b'=') => read_label_set(ctx, i),
        Some(b'#') => read_label_ref(ctx, i),
        _ => Err(ctx.read_error("broken label expression", &[])),
    }
}

fn read_dispatch(ctx: &mut ReadCtx<'_>, _c: u8) -> Result<Option<Value>, Unwind> {
    let Some(c) = ctx.next() else {
        return Err(ctx.read_error("unexpected EOF", &[]));
    };
    match dispatch_table()[c as usize] {
        Some(f) => f(ctx, c),
        None => Err(ctx.read_error(
            "invalid character at the seeker head",
            &[Value::Char(c)],
        )),
    }
}

// ---- dispatch tables --------------------------------------------------

fn base_table() -> &'static [Option<ReadFn>; 256] {
    static TABLE: OnceLock<[Option<ReadFn>; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t: [Option<ReadFn>; 256] = [None; 256];
        for c in 1..256 {
            t[c] = Some(read_symbol as ReadFn);
        }
        t[b')' as usize] = Some(read_unmatch);
        t[b';' as usize] = Some(read_comment);
        t[b'\'' as usize] = Some(read_quote);
        t[b'`' as usize] = Some(read_quasiquote);
        t[b',' as usize] = Some(read_unquote);
        t[b'"' as usize] = Some(read_string);
        t[b'|' as usize] = Some(read_pipe);
        t[b'+' as usize] = Some(read_plus);
        t[b'-' as usize] = Some(read_minus);
        t[b'(' as usize] = Some(read_pair);
        t[b'#' as usize] = Some(read_dispatch);
        for c in b'0'..=b'9' {
            t[c as usize] = Some(read_number);
        }
        t
    })
}

fn dispatch_table() -> &'static [Option<ReadFn>; 256] {
    static TABLE: OnceLock<[Option<ReadFn>; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t: [Option<ReadFn>; 256] = [None; 256];
        t[b'!' as usize] = Some(read_directive as ReadFn);
        t[b'|' as usize] = Some(read_block_comment);
        t[b';' as usize] = Some(read_datum_comment);
        t[b't' as usize] = Some(read_true);
        t[b'f' as usize] = Some(read_false);
        t[b'\'' as usize] = Some(read_syntax_quote);
        t[b'`' as usize] = Some(read_syntax_quasiquote);
        t[b',' as usize] = Some(read_syntax_unquote);
        t[b'\\' as usize] = Some(read_char);
        t[b'(' as usize] = Some(read_vector);
        t[b'u' as usize] = Some(read_undef_or_blob);
        for c in b'0'..=b'9' {
            t[c as usize] = Some(read_label);
        }
        t
    })
}
