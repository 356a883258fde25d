// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Stream framing: multiple roots, the batch type table, depth limits and
//! malformed input.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use weft::{impl_object, same_ref, shared, ErrorCategory, Reader, Ref, Value, Weft, Writer};

#[derive(Default, Debug, PartialEq, Clone)]
struct LineItem {
    sku: String,
    qty: u32,
}

impl_object!(value LineItem("shop.LineItem") { sku: String, qty: u32 });

#[derive(Default, Debug, PartialEq)]
struct Order {
    id: u64,
    customer: String,
    lines: Vec<LineItem>,
    placed: Option<NaiveDate>,
    total: Decimal,
}

impl_object!(class Order("shop.Order") {
    id: u64,
    customer: String,
    lines: Vec<LineItem>,
    placed: Option<NaiveDate>,
    total: Decimal,
});

fn order() -> Order {
    Order {
        id: 7,
        customer: "ada".to_string(),
        lines: vec![
            LineItem {
                sku: "tea".to_string(),
                qty: 2,
            },
            LineItem {
                sku: "cup".to_string(),
                qty: 1,
            },
        ],
        placed: NaiveDate::from_ymd_opt(2024, 3, 1),
        total: Decimal::new(1250, 2),
    }
}

#[test]
fn test_roots_read_back_in_order() {
    let weft = Weft::default();
    let mut writer = Writer::default();
    weft.serialize_into(&mut writer, &"hello".to_string()).unwrap();
    weft.serialize_into(&mut writer, &42i32).unwrap();
    weft.serialize_into(&mut writer, &shared(order())).unwrap();
    weft.serialize_into(&mut writer, &3.14f64).unwrap();
    let bytes = writer.dump();

    let mut reader = Reader::new(&bytes);
    let first: String = weft.deserialize_from(&mut reader, None).unwrap();
    let second: i32 = weft.deserialize_from(&mut reader, None).unwrap();
    let third: Ref<Order> = weft.deserialize_from(&mut reader, None).unwrap();
    let fourth: f64 = weft.deserialize_from(&mut reader, None).unwrap();

    assert_eq!(first, "hello");
    assert_eq!(second, 42);
    assert_eq!(*third.borrow(), order());
    assert_eq!(fourth, 3.14);
    assert!(reader.is_at_end());
}

#[test]
fn test_failed_read_keeps_the_cursor() {
    let weft = Weft::default();
    let mut writer = Writer::default();
    weft.serialize_into(&mut writer, &"text".to_string()).unwrap();
    weft.serialize_into(&mut writer, &1u8).unwrap();
    let bytes = writer.dump();

    let mut reader = Reader::new(&bytes);
    assert!(weft.deserialize_from::<u8>(&mut reader, None).is_err());
    assert_eq!(reader.cursor(), 0);
    let text: String = weft.deserialize_from(&mut reader, None).unwrap();
    assert_eq!(text, "text");
    assert_eq!(weft.deserialize_from::<u8>(&mut reader, None).unwrap(), 1);
}

#[test]
fn test_batch_and_incremental_agree() {
    let batch = Weft::default();
    batch.register_batch::<(Order, LineItem)>().unwrap();
    let incremental = Weft::default();
    incremental.register::<Order>().unwrap();

    let value = vec![shared(order()), shared(order())];
    let batch_bytes = batch.serialize(&value).unwrap();
    let incremental_bytes = incremental.serialize(&value).unwrap();
    assert_ne!(batch_bytes[0] & 0b01, 0);
    assert_eq!(incremental_bytes[0] & 0b01, 0);

    // either engine reads either stream
    for bytes in [&batch_bytes, &incremental_bytes] {
        for reader in [&batch, &incremental] {
            let back: Vec<Ref<Order>> = reader.deserialize(bytes).unwrap();
            assert_eq!(back.len(), 2);
            assert_eq!(*back[1].borrow(), order());
        }
    }
}

#[derive(Default)]
struct Link {
    next: Option<Ref<Link>>,
}

impl_object!(class Link("test.Link") { next: Option<Ref<Link>> });

fn chain(len: usize) -> Ref<Link> {
    let head = shared(Link { next: None });
    let mut tail = head.clone();
    for _ in 1..len {
        let link = shared(Link { next: None });
        tail.borrow_mut().next = Some(link.clone());
        tail = link;
    }
    head
}

#[test]
fn test_depth_limit_on_both_sides() {
    let shallow = Weft::default().max_depth(10);
    let err = shallow.serialize(&chain(50)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Other);
    assert!(shallow.serialize(&chain(5)).is_ok());

    let bytes = Weft::default().serialize(&chain(50)).unwrap();
    assert!(shallow.deserialize::<Ref<Link>>(&bytes).is_err());
    assert!(Weft::default().deserialize::<Ref<Link>>(&bytes).is_ok());
}

#[test]
fn test_every_truncation_is_a_format_error() {
    let weft = Weft::default();
    let bytes = weft.serialize(&shared(order())).unwrap();
    for cut in 0..bytes.len() {
        let err = weft.deserialize::<Ref<Order>>(&bytes[..cut]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Format, "cut at {}: {}", cut, err);
    }
}

#[test]
fn test_corrupt_input() {
    let weft = Weft::default();
    let bytes = weft.serialize(&"ok".to_string()).unwrap();

    let mut bad_tag = bytes.clone();
    bad_tag[1] = 0xEE;
    let err = weft.deserialize::<String>(&bad_tag).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);

    let mut bad_version = bytes.clone();
    bad_version[0] = 0x72;
    let err = weft.deserialize::<String>(&bad_version).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);

    // a list whose only element refers back to an instance that never existed
    let dangling = [0x12, 23, 1, 1, 5];
    let err = weft.deserialize::<Vec<Ref<String>>>(&dangling).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);

    let err = weft.deserialize::<i32>(&bytes).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[derive(Default)]
struct Step {
    seq: u32,
    next: Option<Ref<Step>>,
}

impl_object!(class Step("test.Step") { seq: u32, next: Option<Ref<Step>> });

fn steps(len: u32) -> Ref<Step> {
    let head = shared(Step { seq: 0, next: None });
    let mut tail = head.clone();
    for seq in 1..len {
        let step = shared(Step { seq, next: None });
        tail.borrow_mut().next = Some(step.clone());
        tail = step;
    }
    head
}

/// Sequence numbers along the chain, stopping at its end or back at `head`.
fn walk(head: &Ref<Step>) -> (Vec<u32>, bool) {
    let mut seqs = vec![head.borrow().seq];
    let mut current = head.borrow().next.clone();
    while let Some(step) = current {
        if same_ref(&step, head) {
            return (seqs, true);
        }
        seqs.push(step.borrow().seq);
        current = step.borrow().next.clone();
    }
    (seqs, false)
}

#[test]
fn test_long_chains_at_default_config() {
    let weft = Weft::default();
    let head = steps(1_000);
    let bytes = weft.serialize(&head).unwrap();
    let back: Ref<Step> = Weft::default().deserialize(&bytes).unwrap();
    assert_eq!(walk(&back), ((0..1_000).collect::<Vec<_>>(), false));

    // closing the ring makes the last deferred instance refer to the root
    let ring = steps(600);
    let mut last = ring.clone();
    loop {
        let next = last.borrow().next.clone();
        match next {
            Some(step) => last = step,
            None => break,
        }
    }
    last.borrow_mut().next = Some(ring.clone());
    let back: Ref<Step> = weft.deserialize(&weft.serialize(&ring).unwrap()).unwrap();
    assert_eq!(walk(&back), ((0..600).collect::<Vec<_>>(), true));
    last.borrow_mut().next = None;
}

#[test]
fn test_deferral_keeps_nesting_below_the_limit() {
    let shallow = Weft::default().max_depth(10).defer_depth(4);
    let bytes = shallow.serialize(&chain(50)).unwrap();
    assert!(shallow.deserialize::<Ref<Link>>(&bytes).is_ok());

    let mut writer = Writer::default();
    shallow.serialize_into(&mut writer, &steps(40)).unwrap();
    shallow.serialize_into(&mut writer, &7u8).unwrap();
    let bytes = writer.dump();
    let mut reader = Reader::new(&bytes);
    let first: Ref<Step> = shallow.deserialize_from(&mut reader, None).unwrap();
    assert_eq!(walk(&first).0.len(), 40);
    assert_eq!(shallow.deserialize_from::<u8>(&mut reader, None).unwrap(), 7);
    assert!(reader.is_at_end());
}

#[test]
fn test_long_chain_relayed_as_values() {
    let bytes = Weft::default().serialize(&steps(300)).unwrap();
    let relay = Weft::default();
    let value: Value = relay.deserialize(&bytes).unwrap();
    let rebytes = relay.serialize(&value).unwrap();
    let back: Ref<Step> = Weft::default().deserialize(&rebytes).unwrap();
    assert_eq!(walk(&back), ((0..300).collect::<Vec<_>>(), false));
}
