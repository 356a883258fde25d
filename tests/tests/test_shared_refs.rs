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

//! Identity, aliasing and cycles of reference-tracked instances.

use std::rc::Rc;
use weft::{impl_object, same_ref, shared, ErrorCategory, Object, Ref, Weft};

#[derive(Default)]
struct TreeNode {
    name: String,
    parent: Option<Ref<TreeNode>>,
    children: Vec<Ref<TreeNode>>,
}

impl_object!(class TreeNode("test.TreeNode") {
    name: String,
    parent: Option<Ref<TreeNode>>,
    children: Vec<Ref<TreeNode>>,
});

fn tree() -> Ref<TreeNode> {
    let root = shared(TreeNode {
        name: "root".to_string(),
        ..Default::default()
    });
    for name in ["left", "right"] {
        let child = shared(TreeNode {
            name: name.to_string(),
            parent: Some(root.clone()),
            children: vec![],
        });
        root.borrow_mut().children.push(child);
    }
    root
}

#[derive(Default, Debug, PartialEq)]
struct Leaf {
    weight: u32,
}

impl_object!(class Leaf("test.Leaf") { weight: u32 });

#[derive(Default)]
struct Diamond {
    left: Option<Ref<Leaf>>,
    right: Option<Ref<Leaf>>,
}

impl_object!(class Diamond("test.Diamond") {
    left: Option<Ref<Leaf>>,
    right: Option<Ref<Leaf>>,
});

#[test]
fn test_parent_links_close_the_cycle() {
    let weft = Weft::default();
    let bytes = weft.serialize(&tree()).unwrap();
    let root: Ref<TreeNode> = weft.deserialize(&bytes).unwrap();

    let children = root.borrow().children.clone();
    assert_eq!(children.len(), 2);
    for child in &children {
        let parent = child.borrow().parent.clone().unwrap();
        assert!(Rc::ptr_eq(&parent, &root));
    }
    assert_eq!(children[0].borrow().name, "left");
    assert_eq!(children[1].borrow().name, "right");
    assert!(root.borrow().parent.is_none());
}

#[test]
fn test_aliases_stay_aliases() {
    let weft = Weft::default();
    let a = shared("same".to_string());
    let b = shared("same".to_string());
    let bytes = weft.serialize(&vec![a.clone(), b, a]).unwrap();
    let back: Vec<Ref<String>> = weft.deserialize(&bytes).unwrap();

    assert!(Rc::ptr_eq(&back[0], &back[2]));
    // equal contents are not merged
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
    back[0].borrow_mut().push('!');
    assert_eq!(*back[2].borrow(), "same!");
    assert_eq!(*back[1].borrow(), "same");
}

#[test]
fn test_diamond_shares_its_leaf() {
    let weft = Weft::default();
    let leaf = shared(Leaf { weight: 3 });
    let diamond = shared(Diamond {
        left: Some(leaf.clone()),
        right: Some(leaf),
    });
    let back: Ref<Diamond> = weft.deserialize(&weft.serialize(&diamond).unwrap()).unwrap();
    let back = back.borrow();
    let (left, right) = (back.left.clone().unwrap(), back.right.clone().unwrap());
    assert!(Rc::ptr_eq(&left, &right));
    assert_eq!(left.borrow().weight, 3);
}

#[test]
fn test_untracked_diamond_is_duplicated() {
    let weft = Weft::default().track_ref(false);
    let leaf = shared(Leaf { weight: 5 });
    let diamond = shared(Diamond {
        left: Some(leaf.clone()),
        right: Some(leaf),
    });
    let back: Ref<Diamond> = weft.deserialize(&weft.serialize(&diamond).unwrap()).unwrap();
    let back = back.borrow();
    let (left, right) = (back.left.clone().unwrap(), back.right.clone().unwrap());
    assert!(!Rc::ptr_eq(&left, &right));
    assert_eq!(*left.borrow(), *right.borrow());
}

#[test]
fn test_untracked_cycle_is_reported() {
    let weft = Weft::default().track_ref(false);
    let err = weft.serialize(&tree()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ReferenceCycle);
    let message = err.to_string();
    assert!(message.contains("test.TreeNode"), "{}", message);
    assert!(message.contains(" -> "), "{}", message);
}

#[test]
fn test_boxed_primitives_behind_object() {
    let weft = Weft::default();
    let n: Ref<dyn Object> = shared(7i64);
    let s: Ref<dyn Object> = shared("seven".to_string());
    let bytes = weft.serialize(&vec![n.clone(), s, n]).unwrap();
    let back: Vec<Ref<dyn Object>> = weft.deserialize(&bytes).unwrap();

    assert!(same_ref(&back[0], &back[2]));
    assert_eq!(back[0].borrow().downcast_ref::<i64>(), Some(&7));
    assert_eq!(
        back[1].borrow().downcast_ref::<String>().map(String::as_str),
        Some("seven")
    );
}

#[test]
fn test_jagged_rows_are_tracked_independently() {
    let weft = Weft::default();
    let shared_row = shared(vec![1i32, 2, 3]);
    let jagged = vec![shared_row.clone(), shared(vec![]), shared_row, shared(vec![9])];
    let back: Vec<Ref<Vec<i32>>> = weft.deserialize(&weft.serialize(&jagged).unwrap()).unwrap();

    let lens: Vec<usize> = back.iter().map(|row| row.borrow().len()).collect();
    assert_eq!(lens, [3, 0, 3, 1]);
    assert!(Rc::ptr_eq(&back[0], &back[2]));
    assert!(!Rc::ptr_eq(&back[1], &back[3]));
}
