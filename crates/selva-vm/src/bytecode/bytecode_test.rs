// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;

#[test]
fn boot_template_calls_then_stops() {
    let boot = Irep::boot(3);
    assert_eq!(boot.code, vec![Insn::Call(3), Insn::Stop]);
    assert_eq!(boot.argc, 1);
    assert!(!boot.varg);
}

#[test]
fn empty_template_has_no_code() {
    let ir = Irep::empty();
    assert!(ir.code.is_empty());
    assert!(ir.pool.is_empty());
    assert!(ir.irep.is_empty());
    assert_eq!(ir.capturec, 0);
}

#[test]
fn instructions_carry_their_operands() {
    assert_eq!(Insn::Cref(1, 2), Insn::Cref(1, 2));
    assert_ne!(Insn::Cref(1, 2), Insn::Cref(2, 1));
    assert_ne!(Insn::Call(2), Insn::Tailcall(2));
    assert_eq!(Insn::Jmp(-3), Insn::Jmp(-3));
}
