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

//! Reading streams without the Rust types that wrote them.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::rc::Rc;
use weft::{impl_enum, impl_object, shared, DynamicObject, Ref, Value, Weft};

#[derive(Clone, Copy, Debug, Default, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum Shade {
    #[default]
    Light = 1,
    Dark = 2,
}

impl_enum!(Shade("fs.Shade"): u8);

#[derive(Default)]
struct Folder {
    name: String,
    shade: Shade,
    parent: Option<Ref<Folder>>,
    children: Vec<Ref<Folder>>,
}

impl_object!(class Folder("fs.Folder") {
    name: String,
    shade: Shade,
    parent: Option<Ref<Folder>>,
    children: Vec<Ref<Folder>>,
});

fn folders() -> Ref<Folder> {
    let root = shared(Folder {
        name: "/".to_string(),
        ..Default::default()
    });
    let etc = shared(Folder {
        name: "etc".to_string(),
        shade: Shade::Dark,
        parent: Some(root.clone()),
        children: vec![],
    });
    root.borrow_mut().children.push(etc);
    root
}

#[test]
fn test_unknown_graph_reads_as_values() {
    let bytes = Weft::default().serialize(&folders()).unwrap();
    let value: Value = Weft::default().deserialize(&bytes).unwrap();

    let root = value.as_shared().unwrap();
    let root_ref = root.borrow();
    let folder = root_ref.downcast_ref::<DynamicObject>().unwrap();
    assert_eq!(folder.type_name(), "fs.Folder");
    assert_eq!(folder.field("name"), Some(&Value::from("/")));
    assert_eq!(folder.field("parent"), Some(&Value::Null));
    assert_eq!(
        folder.field("shade"),
        Some(&Value::Enum {
            type_name: "fs.Shade".to_string(),
            value: 1
        })
    );

    let children = folder.field("children").and_then(Value::as_list).unwrap();
    let child = children[0].as_shared().unwrap().borrow();
    let parent = child
        .downcast_ref::<DynamicObject>()
        .and_then(|c| c.field("parent"))
        .and_then(Value::as_shared)
        .unwrap();
    assert!(Rc::ptr_eq(parent, root));
}

#[test]
fn test_values_relay_a_graph_unchanged() {
    let origin = Weft::default();
    let bytes = origin.serialize(&folders()).unwrap();

    let relay = Weft::default();
    let value: Value = relay.deserialize(&bytes).unwrap();
    let relayed = relay.serialize(&value).unwrap();

    let root: Ref<Folder> = origin.deserialize(&relayed).unwrap();
    let etc = root.borrow().children[0].clone();
    assert_eq!(etc.borrow().name, "etc");
    assert_eq!(etc.borrow().shade, Shade::Dark);
    let parent = etc.borrow().parent.clone().unwrap();
    assert!(Rc::ptr_eq(&parent, &root));
}

#[test]
fn test_scalars_and_lists_as_values() {
    let weft = Weft::default();
    let bytes = weft.serialize(&vec![vec![1i64, 2], vec![]]).unwrap();
    let value: Value = weft.deserialize(&bytes).unwrap();
    assert_eq!(
        value,
        Value::List(vec![
            Value::List(vec![Value::I64(1), Value::I64(2)]),
            Value::List(vec![]),
        ])
    );
    assert_eq!(weft.deserialize::<Value>(&weft.serialize(&7u16).unwrap()).unwrap().as_i64(), Some(7));
}
