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

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use weft::{impl_object, shared, Ref, Weft};

#[test]
fn test_simple_multi_thread() {
    let weft = Arc::new(Weft::default());
    let src: HashSet<_> = [41, 42, 43, 45, 46, 47].into_iter().collect();
    // serialize
    let mut handles = vec![];
    for item in &src {
        let weft_clone = Arc::clone(&weft);
        let item: i32 = *item;
        let handle = thread::spawn(move || weft_clone.serialize(&item).unwrap());
        handles.push(handle);
    }
    let mut serialized_data = vec![];
    for handle in handles {
        serialized_data.push(handle.join().unwrap());
    }
    // deserialize
    let mut dest = HashSet::new();
    let mut handles = vec![];
    for bytes in serialized_data {
        let weft_clone = Arc::clone(&weft);
        let handle = thread::spawn(move || weft_clone.deserialize::<i32>(&bytes).unwrap());
        handles.push(handle);
    }
    for handle in handles {
        dest.insert(handle.join().unwrap());
    }
    // verify
    assert_eq!(dest, src);
}

#[derive(Default)]
struct Item {
    id: u32,
    owner: Option<Ref<Item>>,
}

impl_object!(class Item("test.Item") { id: u32, owner: Option<Ref<Item>> });

#[derive(Default, Debug, PartialEq, Clone)]
struct Tag {
    label: String,
}

impl_object!(value Tag("test.Tag") { label: String });

/// Each thread builds its own graph; only the registry is shared.
#[test]
fn test_graphs_on_many_threads() {
    let weft = Arc::new(Weft::default());
    let handles: Vec<_> = (0..8u32)
        .map(|t| {
            let weft = Arc::clone(&weft);
            thread::spawn(move || {
                for round in 0..20u32 {
                    let owner = shared(Item {
                        id: t * 1000 + round,
                        owner: None,
                    });
                    owner.borrow_mut().owner = Some(owner.clone());
                    let items = vec![
                        owner.clone(),
                        shared(Item {
                            id: round,
                            owner: Some(owner),
                        }),
                    ];
                    let bytes = weft.serialize(&items).unwrap();
                    let back: Vec<Ref<Item>> = weft.deserialize(&bytes).unwrap();
                    assert_eq!(back[0].borrow().id, t * 1000 + round);
                    let self_owner = back[0].borrow().owner.clone().unwrap();
                    assert!(Rc::ptr_eq(&self_owner, &back[0]));
                    let other_owner = back[1].borrow().owner.clone().unwrap();
                    assert!(Rc::ptr_eq(&other_owner, &back[0]));

                    let tags = vec![Tag {
                        label: format!("{}-{}", t, round),
                    }];
                    let tag_bytes = weft.serialize(&tags).unwrap();
                    assert_eq!(weft.deserialize::<Vec<Tag>>(&tag_bytes).unwrap(), tags);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(
        weft.resolver().get_by_name("test.Item").map(|i| i.name().to_string()),
        Some("test.Item".to_string())
    );
}
