// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode compiler for the core special forms.
//!
//! Compilation is three small passes: lowering the datum into an
//! expression tree (resolving `let`, named `let`, `and`/`or`,
//! `when`/`unless` into core forms), a capture analysis that decides
//! which variables must live in a frame's capture region, and code
//! generation against the VM's frame layout
//! `[callee, args.., rest?, locals.., captures..]`.
//!
//! Captured variables are addressed through the capture region only:
//! the generated prologue copies captured parameters into their capture
//! slot, inner lambdas reach them with `CREF`/`CSET` through the
//! context chain, and the frame's own references use the same slots so
//! tear-off keeps every view consistent.
//!
//! Calls in tail position emit `TAILCALL`. A call whose callee is a
//! global currently bound to a canonical primitive of matching arity
//! emits the primitive's inline opcode; the VM re-checks the binding at
//! run time and falls back to a generic call.

#[cfg(test)]
mod compiler_test;

use std::rc::Rc;

use crate::bytecode::{Insn, Irep};
use crate::error::Unwind;
use crate::state::{PrimKind, State};
use crate::value::{Object, ObjRef, Value};

enum Expr {
    Const(Value),
    Ref(ObjRef),
    Set(ObjRef, Box<Expr>),
    /// Top-level `define`: assign the global slot of the symbol.
    Global(ObjRef, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Begin(Vec<Expr>),
    Lambda(Box<LambdaExpr>),
    Call(Box<Expr>, Vec<Expr>),
}

struct LambdaExpr {
    params: Vec<ObjRef>,
    rest: Option<ObjRef>,
    locals: Vec<ObjRef>,
    body: Vec<Expr>,
    /// Variables of this scope referenced from inner lambdas; assigned
    /// by the capture analysis.
    captured: Vec<ObjRef>,
}

/// Compile one top-level datum into a zero-parameter template.
pub fn compile(st: &mut State, datum: Value) -> Result<Rc<Irep>, Unwind> {
    let body = lower_toplevel(st, datum)?;
    let mut lam = LambdaExpr {
        params: Vec::new(),
        rest: None,
        locals: Vec::new(),
        body,
        captured: Vec::new(),
    };

    let mut frames: Vec<AFrame> = Vec::new();
    analyze_lambda(&mut lam, &mut frames);

    let mut scopes: Vec<GenScope> = Vec::new();
    gen_lambda(st, &lam, &mut scopes)
}

// ---- datum helpers ----------------------------------------------------

fn pair_parts(st: &State, v: Value) -> Option<(Value, Value)> {
    match v {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Pair(p) => Some((p.car, p.cdr)),
            _ => None,
        },
        _ => None,
    }
}

fn sym_of(st: &State, v: Value) -> Option<ObjRef> {
    match v {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Symbol(_) => Some(r),
            _ => None,
        },
        _ => None,
    }
}

fn sym_is(st: &State, v: Value, name: &str) -> bool {
    match sym_of(st, v) {
        Some(r) => st.symbol_name(r) == name,
        None => false,
    }
}

/// Collect a proper list; `None` when improper.
fn list_items(st: &State, v: Value) -> Option<Vec<Value>> {
    let mut out = Vec::new();
    let mut cur = v;
    loop {
        match cur {
            Value::Nil => return Some(out),
            _ => match pair_parts(st, cur) {
                Some((car, cdr)) => {
                    out.push(car);
                    cur = cdr;
                }
                None => return None,
            },
        }
    }
}

fn syntax_error(st: &mut State, what: &str, form: Value) -> Unwind {
    st.errorf(&format!("malformed {what}: ~s"), &[form])
}

// ---- lowering ---------------------------------------------------------

/// Top-level forms: `begin` splices, `define` targets the globals.
fn lower_toplevel(st: &mut State, datum: Value) -> Result<Vec<Expr>, Unwind> {
    if let Some((car, cdr)) = pair_parts(st, datum) {
        if sym_is(st, car, "begin") {
            let forms = list_items(st, cdr).ok_or_else(|| syntax_error(st, "begin", datum))?;
            let mut out = Vec::new();
            for f in forms {
                out.extend(lower_toplevel(st, f)?);
            }
            return Ok(out);
        }
        if sym_is(st, car, "define") {
            let (name, expr) = parse_define(st, datum)?;
            return Ok(vec![Expr::Global(name, Box::new(expr))]);
        }
    }
    Ok(vec![lower(st, datum)?])
}

/// `(define name e)` or `(define (name . formals) body...)`.
fn parse_define(st: &mut State, form: Value) -> Result<(ObjRef, Expr), Unwind> {
    let (_, rest) = pair_parts(st, form).ok_or_else(|| syntax_error(st, "define", form))?;
    let (target, body) = pair_parts(st, rest).ok_or_else(|| syntax_error(st, "define", form))?;

    if let Some(name) = sym_of(st, target) {
        let items = list_items(st, body).ok_or_else(|| syntax_error(st, "define", form))?;
        if items.len() != 1 {
            return Err(syntax_error(st, "define", form));
        }
        return Ok((name, lower(st, items[0])?));
    }

    // procedure shorthand
    let (name_v, formals) =
        pair_parts(st, target).ok_or_else(|| syntax_error(st, "define", form))?;
    let name = sym_of(st, name_v).ok_or_else(|| syntax_error(st, "define", form))?;
    let lam = lower_lambda(st, formals, body, form)?;
    Ok((name, lam))
}

fn lower_lambda(
    st: &mut State,
    formals: Value,
    body: Value,
    form: Value,
) -> Result<Expr, Unwind> {
    let mut params = Vec::new();
    let mut rest_param = None;
    let mut cur = formals;
    loop {
        match cur {
            Value::Nil => break,
            _ => {
                if let Some(sym) = sym_of(st, cur) {
                    rest_param = Some(sym);
                    break;
                }
                let (car, cdr) =
                    pair_parts(st, cur).ok_or_else(|| syntax_error(st, "lambda", form))?;
                let p = sym_of(st, car).ok_or_else(|| syntax_error(st, "lambda", form))?;
                params.push(p);
                cur = cdr;
            }
        }
    }

    let forms = list_items(st, body).ok_or_else(|| syntax_error(st, "lambda", form))?;
    let (locals, body) = lower_body(st, &forms)?;
    Ok(Expr::Lambda(Box::new(LambdaExpr {
        params,
        rest: rest_param,
        locals,
        body,
        captured: Vec::new(),
    })))
}

/// A lambda body: leading and interleaved `define`s become locals
/// assigned in place.
fn lower_body(st: &mut State, forms: &[Value]) -> Result<(Vec<ObjRef>, Vec<Expr>), Unwind> {
    let mut locals = Vec::new();
    let mut body = Vec::new();
    for &f in forms {
        let is_define = pair_parts(st, f).is_some_and(|(car, _)| sym_is(st, car, "define"));
        if is_define {
            let (name, expr) = parse_define(st, f)?;
            locals.push(name);
            body.push(Expr::Set(name, Box::new(expr)));
        } else {
            body.push(lower(st, f)?);
        }
    }
    Ok((locals, body))
}

fn lower(st: &mut State, datum: Value) -> Result<Expr, Unwind> {
    if let Some(sym) = sym_of(st, datum) {
        return Ok(Expr::Ref(sym));
    }
    let Some((car, cdr)) = pair_parts(st, datum) else {
        // self-evaluating
        return Ok(Expr::Const(datum));
    };

    if let Some(head) = sym_of(st, car) {
        let name = st.symbol_name(head).to_owned();
        match name.as_str() {
            "quote" => {
                let items =
                    list_items(st, cdr).ok_or_else(|| syntax_error(st, "quote", datum))?;
                if items.len() != 1 {
                    return Err(syntax_error(st, "quote", datum));
                }
                return Ok(Expr::Const(items[0]));
            }
            "if" => {
                let items = list_items(st, cdr).ok_or_else(|| syntax_error(st, "if", datum))?;
                if items.len() != 2 && items.len() != 3 {
                    return Err(syntax_error(st, "if", datum));
                }
                let test = lower(st, items[0])?;
                let then = lower(st, items[1])?;
                let els = if items.len() == 3 {
                    lower(st, items[2])?
                } else {
                    Expr::Const(Value::Undef)
                };
                return Ok(Expr::If(Box::new(test), Box::new(then), Box::new(els)));
            }
            "begin" => {
                let items =
                    list_items(st, cdr).ok_or_else(|| syntax_error(st, "begin", datum))?;
                let mut out = Vec::new();
                for f in items {
                    out.push(lower(st, f)?);
                }
                return Ok(Expr::Begin(out));
            }
            "lambda" => {
                let (formals, body) =
                    pair_parts(st, cdr).ok_or_else(|| syntax_error(st, "lambda", datum))?;
                return lower_lambda(st, formals, body, datum);
            }
            "set!" => {
                let items =
                    list_items(st, cdr).ok_or_else(|| syntax_error(st, "set!", datum))?;
                if items.len() != 2 {
                    return Err(syntax_error(st, "set!", datum));
                }
                let sym = sym_of(st, items[0]).ok_or_else(|| syntax_error(st, "set!", datum))?;
                let e = lower(st, items[1])?;
                return Ok(Expr::Set(sym, Box::new(e)));
            }
            "define" => {
                return Err(syntax_error(st, "define (misplaced)", datum));
            }
            "let" => return lower_let(st, cdr, datum),
            "and" => {
                let items = list_items(st, cdr).ok_or_else(|| syntax_error(st, "and", datum))?;
                return lower_and(st, &items);
            }
            "or" => {
                let items = list_items(st, cdr).ok_or_else(|| syntax_error(st, "or", datum))?;
                return lower_or(st, &items);
            }
            "when" => {
                let items =
                    list_items(st, cdr).ok_or_else(|| syntax_error(st, "when", datum))?;
                if items.is_empty() {
                    return Err(syntax_error(st, "when", datum));
                }
                let test = lower(st, items[0])?;
                let mut body = Vec::new();
                for &f in &items[1..] {
                    body.push(lower(st, f)?);
                }
                return Ok(Expr::If(
                    Box::new(test),
                    Box::new(Expr::Begin(body)),
                    Box::new(Expr::Const(Value::Undef)),
                ));
            }
            "unless" => {
                let items =
                    list_items(st, cdr).ok_or_else(|| syntax_error(st, "unless", datum))?;
                if items.is_empty() {
                    return Err(syntax_error(st, "unless", datum));
                }
                let test = lower(st, items[0])?;
                let mut body = Vec::new();
                for &f in &items[1..] {
                    body.push(lower(st, f)?);
                }
                return Ok(Expr::If(
                    Box::new(test),
                    Box::new(Expr::Const(Value::Undef)),
                    Box::new(Expr::Begin(body)),
                ));
            }
            _ => {}
        }
    }

    // application
    let items = list_items(st, datum).ok_or_else(|| syntax_error(st, "application", datum))?;
    let func = lower(st, items[0])?;
    let mut args = Vec::new();
    for &a in &items[1..] {
        args.push(lower(st, a)?);
    }
    Ok(Expr::Call(Box::new(func), args))
}

/// `(let ((v e) ...) body)` and named `(let loop ((v e) ...) body)`.
fn lower_let(st: &mut State, cdr: Value, datum: Value) -> Result<Expr, Unwind> {
    let (first, rest) = pair_parts(st, cdr).ok_or_else(|| syntax_error(st, "let", datum))?;

    if let Some(name) = sym_of(st, first) {
        // named let: bind the loop procedure in a wrapper scope
        let (bindings_v, body_v) =
            pair_parts(st, rest).ok_or_else(|| syntax_error(st, "let", datum))?;
        let (vars, inits) = parse_bindings(st, bindings_v, datum)?;
        let body_forms = list_items(st, body_v).ok_or_else(|| syntax_error(st, "let", datum))?;
        let (locals, body) = lower_body(st, &body_forms)?;

        let loop_lambda = Expr::Lambda(Box::new(LambdaExpr {
            params: vars,
            rest: None,
            locals,
            body,
            captured: Vec::new(),
        }));

        let mut init_exprs = Vec::new();
        for &i in &inits {
            init_exprs.push(lower(st, i)?);
        }

        let wrapper = LambdaExpr {
            params: Vec::new(),
            rest: None,
            locals: vec![name],
            body: vec![
                Expr::Set(name, Box::new(loop_lambda)),
                Expr::Call(Box::new(Expr::Ref(name)), init_exprs),
            ],
            captured: Vec::new(),
        };
        return Ok(Expr::Call(Box::new(Expr::Lambda(Box::new(wrapper))), Vec::new()));
    }

    let (vars, inits) = parse_bindings(st, first, datum)?;
    let body_forms = list_items(st, rest).ok_or_else(|| syntax_error(st, "let", datum))?;
    let (locals, body) = lower_body(st, &body_forms)?;

    let lam = LambdaExpr {
        params: vars,
        rest: None,
        locals,
        body,
        captured: Vec::new(),
    };
    let mut init_exprs = Vec::new();
    for &i in &inits {
        init_exprs.push(lower(st, i)?);
    }
    Ok(Expr::Call(Box::new(Expr::Lambda(Box::new(lam))), init_exprs))
}

fn parse_bindings(
    st: &mut State,
    bindings: Value,
    datum: Value,
) -> Result<(Vec<ObjRef>, Vec<Value>), Unwind> {
    let items = list_items(st, bindings).ok_or_else(|| syntax_error(st, "let", datum))?;
    let mut vars = Vec::new();
    let mut inits = Vec::new();
    for b in items {
        let parts = list_items(st, b).ok_or_else(|| syntax_error(st, "let", datum))?;
        if parts.len() != 2 {
            return Err(syntax_error(st, "let", datum));
        }
        let v = sym_of(st, parts[0]).ok_or_else(|| syntax_error(st, "let", datum))?;
        vars.push(v);
        inits.push(parts[1]);
    }
    Ok((vars, inits))
}

fn lower_and(st: &mut State, items: &[Value]) -> Result<Expr, Unwind> {
    match items {
        [] => Ok(Expr::Const(Value::Bool(true))),
        [x] => lower(st, *x),
        [x, rest @ ..] => {
            let test = lower(st, *x)?;
            let then = lower_and(st, rest)?;
            Ok(Expr::If(
                Box::new(test),
                Box::new(then),
                Box::new(Expr::Const(Value::Bool(false))),
            ))
        }
    }
}

fn lower_or(st: &mut State, items: &[Value]) -> Result<Expr, Unwind> {
    match items {
        [] => Ok(Expr::Const(Value::Bool(false))),
        [x] => lower(st, *x),
        [x, rest @ ..] => {
            // the head value is needed twice, so bind it in a wrapper
            let tmp = st.make_uninterned("or");
            let head = lower(st, *x)?;
            let tail = lower_or(st, rest)?;
            let lam = LambdaExpr {
                params: vec![tmp],
                rest: None,
                locals: Vec::new(),
                body: vec![Expr::If(
                    Box::new(Expr::Ref(tmp)),
                    Box::new(Expr::Ref(tmp)),
                    Box::new(tail),
                )],
                captured: Vec::new(),
            };
            Ok(Expr::Call(Box::new(Expr::Lambda(Box::new(lam))), vec![head]))
        }
    }
}

// ---- capture analysis -------------------------------------------------

struct AFrame {
    vars: Vec<ObjRef>,
    captured: Vec<ObjRef>,
}

fn analyze_lambda(lam: &mut LambdaExpr, frames: &mut Vec<AFrame>) {
    let mut vars = lam.params.clone();
    if let Some(r) = lam.rest {
        vars.push(r);
    }
    vars.extend(lam.locals.iter().copied());
    frames.push(AFrame {
        vars,
        captured: Vec::new(),
    });
    for e in &mut lam.body {
        analyze_expr(e, frames);
    }
    let frame = frames.pop().expect("logic flaw: scope stack underflow");
    lam.captured = frame.captured;
}

fn analyze_ref(sym: ObjRef, frames: &mut [AFrame]) {
    let top = frames.len();
    for d in 0..top {
        let idx = top - 1 - d;
        if frames[idx].vars.contains(&sym) {
            if d > 0 && !frames[idx].captured.contains(&sym) {
                frames[idx].captured.push(sym);
            }
            return;
        }
    }
}

fn analyze_expr(e: &mut Expr, frames: &mut Vec<AFrame>) {
    match e {
        Expr::Const(_) => {}
        Expr::Ref(sym) => analyze_ref(*sym, frames),
        Expr::Set(sym, inner) => {
            analyze_ref(*sym, frames);
            analyze_expr(inner, frames);
        }
        Expr::Global(_, inner) => analyze_expr(inner, frames),
        Expr::If(c, t, f) => {
            analyze_expr(c, frames);
            analyze_expr(t, frames);
            analyze_expr(f, frames);
        }
        Expr::Begin(es) => {
            for e in es {
                analyze_expr(e, frames);
            }
        }
        Expr::Lambda(lam) => analyze_lambda(lam, frames),
        Expr::Call(f, args) => {
            analyze_expr(f, frames);
            for a in args {
                analyze_expr(a, frames);
            }
        }
    }
}

// ---- code generation --------------------------------------------------

struct GenScope {
    params: Vec<ObjRef>,
    rest: Option<ObjRef>,
    locals: Vec<ObjRef>,
    captured: Vec<ObjRef>,
    argc: i32,
    localc: i32,
}

#[derive(Default)]
struct Gen {
    code: Vec<Insn>,
    ints: Vec<i32>,
    doubles: Vec<f64>,
    pool: Vec<Value>,
    children: Vec<Rc<Irep>>,
}

enum VarLoc {
    /// Frame register, addressed from the frame pointer.
    Frame(u32),
    /// Capture register of a context `depth` levels up.
    Up(u16, u16),
    Global,
}

fn resolve(scopes: &[GenScope], sym: ObjRef) -> VarLoc {
    let top = scopes.len();
    for d in 0..top {
        let scope = &scopes[top - 1 - d];
        if d == 0 {
            // the frame's own captured variables live in the capture
            // region; the original slots are not used after the prologue
            if let Some(j) = scope.captured.iter().position(|&s| s == sym) {
                return VarLoc::Frame((scope.argc + scope.localc) as u32 + j as u32);
            }
            if let Some(p) = scope.params.iter().position(|&s| s == sym) {
                return VarLoc::Frame(1 + p as u32);
            }
            if scope.rest == Some(sym) {
                return VarLoc::Frame(scope.argc as u32);
            }
            if let Some(l) = scope.locals.iter().position(|&s| s == sym) {
                let base = scope.argc + i32::from(scope.rest.is_some());
                return VarLoc::Frame(base as u32 + l as u32);
            }
        } else if let Some(j) = scope.captured.iter().position(|&s| s == sym) {
            return VarLoc::Up(d as u16, j as u16);
        } else if scope.params.contains(&sym)
            || scope.rest == Some(sym)
            || scope.locals.contains(&sym)
        {
            panic!("logic flaw: variable crossed a lambda without being captured");
        }
    }
    VarLoc::Global
}

fn gen_lambda(
    st: &mut State,
    lam: &LambdaExpr,
    scopes: &mut Vec<GenScope>,
) -> Result<Rc<Irep>, Unwind> {
    let argc = lam.params.len() as i32 + 1;
    let varg = lam.rest.is_some();
    let localc = lam.locals.len() as i32 + i32::from(varg);

    scopes.push(GenScope {
        params: lam.params.clone(),
        rest: lam.rest,
        locals: lam.locals.clone(),
        captured: lam.captured.clone(),
        argc,
        localc,
    });

    let mut g = Gen::default();

    // prologue: populate the capture region
    for &sym in &lam.captured {
        if let Some(p) = lam.params.iter().position(|&s| s == sym) {
            g.code.push(Insn::Lref(1 + p as u32));
        } else if lam.rest == Some(sym) {
            g.code.push(Insn::Lref(argc as u32));
        } else {
            g.code.push(Insn::PushUndef);
        }
    }

    if lam.body.is_empty() {
        g.code.push(Insn::PushUndef);
    }
    let last = lam.body.len().saturating_sub(1);
    for (i, e) in lam.body.iter().enumerate() {
        gen_expr(st, &mut g, scopes, e, i == last)?;
        if i != last {
            g.code.push(Insn::Pop);
        }
    }
    g.code.push(Insn::Ret);

    scopes.pop();

    Ok(Rc::new(Irep {
        code: g.code,
        ints: g.ints,
        doubles: g.doubles,
        pool: g.pool,
        irep: g.children,
        argc,
        localc,
        capturec: lam.captured.len() as i32,
        varg,
    }))
}

fn gen_const(g: &mut Gen, v: Value) {
    match v {
        Value::Nil => g.code.push(Insn::PushNil),
        Value::Undef => g.code.push(Insn::PushUndef),
        Value::Eof => g.code.push(Insn::PushEof),
        Value::Bool(true) => g.code.push(Insn::PushTrue),
        Value::Bool(false) => g.code.push(Insn::PushFalse),
        Value::Int(n) => {
            let idx = g.ints.len() as u32;
            g.ints.push(n);
            g.code.push(Insn::PushInt(idx));
        }
        Value::Float(f) => {
            let idx = g.doubles.len() as u32;
            g.doubles.push(f);
            g.code.push(Insn::PushFloat(idx));
        }
        Value::Char(c) => {
            let idx = g.ints.len() as u32;
            g.ints.push(i32::from(c));
            g.code.push(Insn::PushChar(idx));
        }
        Value::Obj(_) => {
            let idx = g.pool.len() as u32;
            g.pool.push(v);
            g.code.push(Insn::PushConst(idx));
        }
        Value::Invalid => panic!("logic flaw: invalid value in constant position"),
    }
}

/// Pool index of the global slot for `sym` in the current library,
/// creating the binding on first reference.
fn global_slot_idx(st: &mut State, g: &mut Gen, sym: ObjRef) -> u32 {
    let env = st.libs[st.cur_lib].env;
    let uid = match st.find_variable(env, sym) {
        Some(uid) => uid,
        None => st.add_variable(env, sym),
    };
    let slot = st.gref_slot(uid);
    let idx = g.pool.len() as u32;
    g.pool.push(slot);
    idx
}

const PRIM_KINDS: [PrimKind; crate::state::PRIM_COUNT] = [
    PrimKind::Cons,
    PrimKind::Car,
    PrimKind::Cdr,
    PrimKind::Nilp,
    PrimKind::Symbolp,
    PrimKind::Pairp,
    PrimKind::Not,
    PrimKind::Add,
    PrimKind::Sub,
    PrimKind::Mul,
    PrimKind::Div,
    PrimKind::Eq,
    PrimKind::Lt,
    PrimKind::Le,
    PrimKind::Gt,
    PrimKind::Ge,
];

/// The canonical primitive a global symbol is currently bound to.
fn prim_lookup(st: &mut State, sym: ObjRef) -> Option<PrimKind> {
    let env = st.libs[st.cur_lib].env;
    let uid = st.find_variable(env, sym)?;
    let slot = st.gref_slot(uid);
    let cur = match slot {
        Value::Obj(r) => match st.heap.get(r) {
            Object::Pair(p) => p.cdr,
            _ => return None,
        },
        _ => return None,
    };
    st.prims
        .iter()
        .position(|e| e.proc == cur)
        .map(|i| PRIM_KINDS[i])
}

fn prim_insn(kind: PrimKind, n: i32) -> Insn {
    match kind {
        PrimKind::Cons => Insn::Cons(n),
        PrimKind::Car => Insn::Car(n),
        PrimKind::Cdr => Insn::Cdr(n),
        PrimKind::Nilp => Insn::Nilp(n),
        PrimKind::Symbolp => Insn::Symbolp(n),
        PrimKind::Pairp => Insn::Pairp(n),
        PrimKind::Not => Insn::Not(n),
        PrimKind::Add => Insn::Add(n),
        PrimKind::Sub => Insn::Sub(n),
        PrimKind::Mul => Insn::Mul(n),
        PrimKind::Div => Insn::Div(n),
        PrimKind::Eq => Insn::Eq(n),
        PrimKind::Lt => Insn::Lt(n),
        PrimKind::Le => Insn::Le(n),
        PrimKind::Gt => Insn::Gt(n),
        PrimKind::Ge => Insn::Ge(n),
    }
}

fn gen_expr(
    st: &mut State,
    g: &mut Gen,
    scopes: &mut Vec<GenScope>,
    e: &Expr,
    tail: bool,
) -> Result<(), Unwind> {
    match e {
        Expr::Const(v) => gen_const(g, *v),

        Expr::Ref(sym) => match resolve(scopes, *sym) {
            VarLoc::Frame(i) => g.code.push(Insn::Lref(i)),
            VarLoc::Up(d, j) => g.code.push(Insn::Cref(d, j)),
            VarLoc::Global => {
                let idx = global_slot_idx(st, g, *sym);
                g.code.push(Insn::Gref(idx));
            }
        },

        Expr::Set(sym, inner) => {
            gen_expr(st, g, scopes, inner, false)?;
            match resolve(scopes, *sym) {
                VarLoc::Frame(i) => g.code.push(Insn::Lset(i)),
                VarLoc::Up(d, j) => g.code.push(Insn::Cset(d, j)),
                VarLoc::Global => {
                    let idx = global_slot_idx(st, g, *sym);
                    g.code.push(Insn::Gset(idx));
                }
            }
        }

        Expr::Global(sym, inner) => {
            gen_expr(st, g, scopes, inner, false)?;
            let idx = global_slot_idx(st, g, *sym);
            g.code.push(Insn::Gset(idx));
        }

        Expr::If(c, t, f) => {
            gen_expr(st, g, scopes, c, false)?;
            let jif = g.code.len();
            g.code.push(Insn::Jmpif(0));
            gen_expr(st, g, scopes, f, tail)?;
            let jend = g.code.len();
            g.code.push(Insn::Jmp(0));
            let then_at = g.code.len();
            g.code[jif] = Insn::Jmpif((then_at - (jif + 1)) as i32);
            gen_expr(st, g, scopes, t, tail)?;
            let end_at = g.code.len();
            g.code[jend] = Insn::Jmp((end_at - (jend + 1)) as i32);
        }

        Expr::Begin(es) => {
            if es.is_empty() {
                g.code.push(Insn::PushUndef);
            } else {
                let last = es.len() - 1;
                for (i, e) in es.iter().enumerate() {
                    gen_expr(st, g, scopes, e, tail && i == last)?;
                    if i != last {
                        g.code.push(Insn::Pop);
                    }
                }
            }
        }

        Expr::Lambda(lam) => {
            let child = gen_lambda(st, lam, scopes)?;
            let idx = g.children.len() as u32;
            g.children.push(child);
            g.code.push(Insn::Lambda(idx));
        }

        Expr::Call(f, args) => {
            gen_expr(st, g, scopes, f, false)?;
            for a in args {
                gen_expr(st, g, scopes, a, false)?;
            }
            let n = args.len() as i32 + 1;
            if tail {
                g.code.push(Insn::Tailcall(n));
            } else {
                let inlined = match &**f {
                    Expr::Ref(sym) if matches!(resolve(scopes, *sym), VarLoc::Global) => {
                        prim_lookup(st, *sym).filter(|k| k.arity() + 1 == n)
                    }
                    _ => None,
                };
                match inlined {
                    Some(kind) => g.code.push(prim_insn(kind, n)),
                    None => g.code.push(Insn::Call(n)),
                }
            }
        }
    }
    Ok(())
}
