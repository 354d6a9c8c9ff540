// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use proptest::prelude::*;

use super::*;

#[test]
fn from_bytes_roundtrips() {
    let r = Rope::from_bytes(b"hello");
    assert_eq!(r.weight(), 5);
    assert_eq!(r.to_bytes(), b"hello");
}

#[test]
fn at_walks_the_tree() {
    let a = Rope::from_bytes(b"foo");
    let b = Rope::from_bytes(b"bar");
    let r = a.concat(&b);
    assert_eq!(r.weight(), 6);
    for (i, &c) in b"foobar".iter().enumerate() {
        assert_eq!(r.at(i), c);
    }
}

#[test]
fn concat_is_sharing() {
    let a = Rope::from_bytes(b"abc");
    let r = a.concat(&a);
    assert_eq!(r.to_bytes(), b"abcabc");
    // the source is untouched
    assert_eq!(a.to_bytes(), b"abc");
}

#[test]
fn concat_with_empty_returns_the_other_side() {
    let a = Rope::from_bytes(b"abc");
    let e = Rope::from_bytes(b"");
    assert_eq!(a.concat(&e).to_bytes(), b"abc");
    assert_eq!(e.concat(&a).to_bytes(), b"abc");
}

#[test]
fn slice_of_leaf_shares_the_chunk() {
    let a = Rope::from_bytes(b"hello world");
    let s = a.slice(6, 11);
    assert_eq!(s.to_bytes(), b"world");
    // a full-range slice is the rope itself
    let full = a.slice(0, a.weight());
    assert_eq!(full.to_bytes(), a.to_bytes());
}

#[test]
fn slice_straddling_a_node_concatenates_both_halves() {
    let r = Rope::from_bytes(b"abc").concat(&Rope::from_bytes(b"def"));
    assert_eq!(r.slice(2, 4).to_bytes(), b"cd");
}

#[test]
fn flatten_produces_a_full_leaf() {
    let r = Rope::from_bytes(b"abc").concat(&Rope::from_bytes(b"def"));
    assert!(r.full_chunk().is_none());
    let flat = r.flatten();
    assert!(flat.full_chunk().is_some());
    assert_eq!(flat.to_bytes(), b"abcdef");
}

proptest! {
    #[test]
    fn slice_matches_the_byte_model(
        data in proptest::collection::vec(any::<u8>(), 0..64),
        x in 0usize..64,
        y in 0usize..64,
    ) {
        let x = x.min(data.len());
        let y = y.min(data.len());
        let (i, j) = (x.min(y), x.max(y));
        let r = Rope::from_bytes(&data);
        prop_assert_eq!(r.slice(i, j).to_bytes(), data[i..j].to_vec());
    }

    #[test]
    fn concat_matches_the_byte_model(
        a in proptest::collection::vec(any::<u8>(), 0..32),
        b in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let r = Rope::from_bytes(&a).concat(&Rope::from_bytes(&b));
        let mut model = a.clone();
        model.extend_from_slice(&b);
        prop_assert_eq!(r.weight(), model.len());
        prop_assert_eq!(r.to_bytes(), model.clone());
        for (i, &c) in model.iter().enumerate() {
            prop_assert_eq!(r.at(i), c);
        }
    }

    #[test]
    fn split_and_rejoin_is_identity(
        data in proptest::collection::vec(any::<u8>(), 1..48),
        cut in 0usize..48,
    ) {
        let cut = cut.min(data.len());
        let r = Rope::from_bytes(&data);
        let rejoined = r.slice(0, cut).concat(&r.slice(cut, data.len()));
        prop_assert_eq!(rejoined.to_bytes(), data);
    }
}
