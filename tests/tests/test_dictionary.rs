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

//! Dictionaries carry their comparer and deduplicate through it on read.

use std::collections::BTreeMap;
use weft::{
    impl_object, shared, CaseInsensitive, Dictionary, DynamicMap, DynamicObject, DynamicPayload,
    KeyComparer, Object, Ref, TypeKind, Value, Weft,
};

/// Keys are equal when they leave the same remainder.
#[derive(Default, Debug, Clone, PartialEq)]
struct Modulo {
    modulus: u32,
}

impl_object!(value Modulo("test.Modulo") { modulus: u32 });

impl Modulo {
    fn reduce(&self, key: u32) -> u32 {
        match self.modulus {
            0 => key,
            m => key % m,
        }
    }
}

impl KeyComparer<u32> for Modulo {
    fn hash_key(&self, key: &u32) -> u64 {
        self.reduce(*key) as u64
    }

    fn eq_keys(&self, a: &u32, b: &u32) -> bool {
        self.reduce(*a) == self.reduce(*b)
    }
}

#[test]
fn test_plain_map_collapses_under_case_insensitive_comparer() {
    let weft = Weft::default();
    let map = BTreeMap::from([("A".to_string(), 1), ("a".to_string(), 2)]);
    let bytes = weft.serialize(&map).unwrap();

    let dict: Dictionary<String, i32, CaseInsensitive> = weft.deserialize(&bytes).unwrap();
    assert_eq!(dict.len(), 1);
    // the first key is kept, the last value wins
    let (key, value) = dict.iter().next().unwrap();
    assert_eq!((key.as_str(), *value), ("A", 2));
    assert_eq!(dict.get(&"a".to_string()), Some(&2));
}

#[test]
fn test_comparer_state_travels() {
    let weft = Weft::default();
    let mut dict = Dictionary::with_comparer(Modulo { modulus: 10 });
    dict.insert(3u32, "three".to_string());
    dict.insert(14u32, "fourteen".to_string());
    dict.insert(23u32, "twenty-three".to_string());
    assert_eq!(dict.len(), 2);

    let back: Dictionary<u32, String, Modulo> =
        weft.deserialize(&weft.serialize(&dict).unwrap()).unwrap();
    assert_eq!(back.comparer(), &Modulo { modulus: 10 });
    assert_eq!(back.get(&93).map(String::as_str), Some("twenty-three"));
    assert!(back.contains_key(&4));
    assert_eq!(back, dict);
}

#[test]
fn test_colliding_entries_deduplicate_on_read() {
    // a stream written by a peer whose map held 3 and 13 as distinct keys
    let comparer = DynamicObject::new(
        "test.Modulo",
        TypeKind::Value,
        DynamicPayload::Fields(vec![("modulus".to_string(), Value::U32(10))]),
    );
    let stream = Value::Map(DynamicMap::new(
        Value::Struct(comparer),
        vec![
            (Value::U32(3), Value::from("first")),
            (Value::U32(13), Value::from("second")),
            (Value::U32(4), Value::from("other")),
        ],
    ));
    let weft = Weft::default();
    let bytes = weft.serialize(&stream).unwrap();

    let dict: Dictionary<u32, String, Modulo> = weft.deserialize(&bytes).unwrap();
    assert_eq!(dict.len(), 2);
    assert_eq!(dict.get(&3).map(String::as_str), Some("second"));
    assert_eq!(dict.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [3, 4]);
}

#[test]
fn test_dictionary_that_contains_itself() {
    let weft = Weft::default();
    let dict: Ref<Dictionary<String, Ref<dyn Object>, CaseInsensitive>> =
        shared(Dictionary::new());
    let as_object: Ref<dyn Object> = dict.clone();
    dict.borrow_mut().insert("Self".to_string(), as_object);
    dict.borrow_mut().insert("n".to_string(), shared(5i32));

    let back: Ref<Dictionary<String, Ref<dyn Object>, CaseInsensitive>> =
        weft.deserialize(&weft.serialize(&dict).unwrap()).unwrap();
    let inner = back.borrow().get(&"SELF".to_string()).cloned().unwrap();
    assert!(weft::same_ref(&inner, &back));
    let n = back.borrow().get(&"N".to_string()).cloned().unwrap();
    assert_eq!(n.borrow().downcast_ref::<i32>(), Some(&5));
}
