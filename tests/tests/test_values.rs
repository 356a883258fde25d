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

//! Primitive boundaries, temporal and decimal values, enums and value types.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use weft::{impl_enum, impl_object, ErrorCategory, ObjectHooks, Serializer, Weft};

fn round_trip<T: Serializer>(weft: &Weft, value: &T) -> T {
    let bytes = weft.serialize(value).unwrap();
    weft.deserialize(&bytes).unwrap()
}

#[test]
fn test_integer_boundaries() {
    let weft = Weft::default();
    assert_eq!(round_trip(&weft, &vec![i8::MIN, 0, i8::MAX]), [i8::MIN, 0, i8::MAX]);
    assert_eq!(round_trip(&weft, &vec![i16::MIN, -1, i16::MAX]), [i16::MIN, -1, i16::MAX]);
    assert_eq!(round_trip(&weft, &vec![i32::MIN, -1, i32::MAX]), [i32::MIN, -1, i32::MAX]);
    assert_eq!(round_trip(&weft, &vec![i64::MIN, -1, i64::MAX]), [i64::MIN, -1, i64::MAX]);
    assert_eq!(round_trip(&weft, &vec![u8::MIN, u8::MAX]), [u8::MIN, u8::MAX]);
    assert_eq!(round_trip(&weft, &vec![u16::MIN, u16::MAX]), [u16::MIN, u16::MAX]);
    assert_eq!(round_trip(&weft, &vec![u32::MIN, u32::MAX]), [u32::MIN, u32::MAX]);
    assert_eq!(round_trip(&weft, &vec![u64::MIN, u64::MAX]), [u64::MIN, u64::MAX]);
    assert_eq!(round_trip(&weft, &usize::MAX), usize::MAX);
    assert_eq!(round_trip(&weft, &isize::MIN), isize::MIN);
}

#[test]
fn test_floats_chars_and_text() {
    let weft = Weft::default();
    assert_eq!(round_trip(&weft, &f64::MIN_POSITIVE), f64::MIN_POSITIVE);
    assert_eq!(round_trip(&weft, &f32::MAX), f32::MAX);
    assert!(round_trip(&weft, &f64::NAN).is_nan());
    assert_eq!(round_trip(&weft, &'\u{10FFFF}'), '\u{10FFFF}');
    let text = "weft ✓ 織物 🧵".to_string();
    assert_eq!(round_trip(&weft, &text), text);
    assert_eq!(round_trip(&weft, &String::new()), "");
}

#[test]
fn test_decimal_and_time_values() {
    let weft = Weft::default();
    let amounts = vec![
        Decimal::MAX,
        Decimal::MIN,
        Decimal::from_str("-0.0000000000000000000000000001").unwrap(),
        Decimal::from_str("1234.5600").unwrap(),
    ];
    let back = round_trip(&weft, &amounts);
    assert_eq!(back, amounts);
    // scale is kept, not only the numeric value
    assert_eq!(back[3].scale(), 4);

    let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
    assert_eq!(round_trip(&weft, &date), date);
    let moment: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .unwrap();
    assert_eq!(round_trip(&weft, &moment), moment);
    let before_epoch = NaiveDate::from_ymd_opt(1901, 12, 13)
        .unwrap()
        .and_hms_milli_opt(20, 45, 52, 1)
        .unwrap();
    assert_eq!(round_trip(&weft, &before_epoch), before_epoch);
    for span in [
        TimeDelta::zero(),
        TimeDelta::nanoseconds(-1),
        TimeDelta::days(-36_500) + TimeDelta::milliseconds(250),
    ] {
        assert_eq!(round_trip(&weft, &span), span);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
enum Priority {
    Low = -1,
    Normal = 0,
    Urgent = 300,
}

impl_enum!(Priority("test.Priority"): i16);

#[derive(Default, Debug, PartialEq)]
struct Ticket {
    id: u64,
    priority: Option<Priority>,
    labels: BTreeMap<String, i32>,
}

impl_object!(value Ticket("test.Ticket") {
    id: u64,
    priority: Option<Priority>,
    labels: BTreeMap<String, i32>,
});

#[test]
fn test_enums_and_optional_fields() {
    let weft = Weft::default();
    let tickets = vec![
        Ticket {
            id: 1,
            priority: Some(Priority::Urgent),
            labels: BTreeMap::from([("db".to_string(), 2), ("ui".to_string(), -1)]),
        },
        Ticket {
            id: 2,
            priority: None,
            labels: BTreeMap::new(),
        },
        Ticket {
            id: 3,
            priority: Some(Priority::Low),
            labels: BTreeMap::new(),
        },
    ];
    assert_eq!(round_trip(&weft, &tickets), tickets);
    assert_eq!(round_trip(&weft, &Priority::Normal), Priority::Normal);
}

#[test]
fn test_unknown_enum_value_is_a_format_error() {
    #[derive(Clone, Copy, Debug, PartialEq, IntoPrimitive, TryFromPrimitive)]
    #[repr(i16)]
    enum Narrow {
        Low = -1,
    }
    impl_enum!(Narrow("test.Priority"): i16);

    let weft = Weft::default();
    let bytes = weft.serialize(&Priority::Urgent).unwrap();
    let err = Weft::default().deserialize::<Narrow>(&bytes).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);
    assert_eq!(Narrow::Low as i16, -1);
}

/// Width and height are fixed at construction; `area` is derived and never
/// written.
#[derive(Debug, PartialEq)]
struct Extent {
    width: u32,
    height: u32,
    area: u64,
}

impl Extent {
    fn new(width: u32, height: u32) -> Self {
        Extent {
            width,
            height,
            area: width as u64 * height as u64,
        }
    }

    fn width(&self) -> u32 {
        self.width
    }
}

impl ObjectHooks for Extent {
    fn weft_construct() -> Option<Self> {
        Some(Extent::new(0, 0))
    }

    fn weft_after_read(&mut self) -> Result<(), weft::Error> {
        self.area = self.width as u64 * self.height as u64;
        Ok(())
    }
}

impl_object!(value Extent("geo.Extent") with hooks { width: u32, height: u32 } transient { area: u64 });

#[test]
fn test_read_only_value_type() {
    let weft = Weft::default();
    let extents = vec![Extent::new(3, 4), Extent::new(u32::MAX, 2)];
    let back = round_trip(&weft, &extents);
    assert_eq!(back, extents);
    assert_eq!(back[1].area, u32::MAX as u64 * 2);
    assert_eq!(back[0].width(), 3);
}

#[test]
fn test_plain_maps() {
    let weft = Weft::default();
    let scores: HashMap<String, Vec<f64>> = HashMap::from([
        ("ada".to_string(), vec![9.5, 10.0]),
        ("bob".to_string(), vec![]),
    ]);
    assert_eq!(round_trip(&weft, &scores), scores);

    let by_day: BTreeMap<NaiveDate, u32> = (1..=3)
        .map(|d| (NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), d * 10))
        .collect();
    assert_eq!(round_trip(&weft, &by_day), by_day);
}
