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

//! Trait-object fields and arrays keep the exact runtime type.

use std::rc::Rc;
use weft::{
    impl_object, register_polymorphic, same_ref, shared, ErrorCategory, MdArray, Object, Ref,
    Weft,
};

trait Shape: Object {
    fn area(&self) -> f64;
}

impl std::fmt::Debug for dyn Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shape({})", self.weft_type_name())
    }
}

#[derive(Default, Debug, PartialEq)]
struct Circle {
    radius: f64,
}

#[derive(Default, Debug, PartialEq)]
struct Rect {
    width: f64,
    height: f64,
}

impl_object!(class Circle("geo.Circle") { radius: f64 });
impl_object!(class Rect("geo.Rect") { width: f64, height: f64 });

impl Shape for Circle {
    fn area(&self) -> f64 {
        3.0 * self.radius * self.radius
    }
}

impl Shape for Rect {
    fn area(&self) -> f64 {
        self.width * self.height
    }
}

register_polymorphic!(dyn Shape as "geo.Shape": Circle, Rect);

#[derive(Default)]
struct Drawing {
    title: String,
    shapes: Vec<Ref<dyn Shape>>,
    highlight: Option<Ref<dyn Shape>>,
}

impl_object!(class Drawing("geo.Drawing") {
    title: String,
    shapes: Vec<Ref<dyn Shape>>,
    highlight: Option<Ref<dyn Shape>>,
});

fn drawing() -> Ref<Drawing> {
    let rect: Ref<dyn Shape> = shared(Rect {
        width: 2.0,
        height: 5.0,
    });
    shared(Drawing {
        title: "sketch".to_string(),
        shapes: vec![shared(Circle { radius: 1.0 }), rect.clone()],
        highlight: Some(rect),
    })
}

#[derive(Default)]
struct Unlisted {
    id: u8,
}

impl_object!(class Unlisted("test.Unlisted") { id: u8 });

#[test]
fn test_interface_fields_keep_concrete_types() {
    let weft = Weft::default();
    let bytes = weft.serialize(&drawing()).unwrap();

    // a fresh engine learns the shapes through the drawing's declared fields
    let reader = Weft::default();
    let back: Ref<Drawing> = reader.deserialize(&bytes).unwrap();
    let back = back.borrow();
    assert_eq!(back.title, "sketch");

    let areas: Vec<f64> = back.shapes.iter().map(|s| s.borrow().area()).collect();
    assert_eq!(areas, [3.0, 10.0]);
    assert!(back.shapes[0].borrow().as_any().is::<Circle>());
    assert_eq!(
        back.shapes[1].borrow().as_any().downcast_ref::<Rect>(),
        Some(&Rect {
            width: 2.0,
            height: 5.0
        })
    );
    let highlight = back.highlight.clone().unwrap();
    assert!(Rc::ptr_eq(&highlight, &back.shapes[1]));
}

#[test]
fn test_rank_two_array_of_shapes() {
    let weft = Weft::default();
    let grid = MdArray::from_fn(vec![2, 3], |ix| -> Ref<dyn Shape> {
        if (ix[0] + ix[1]) % 2 == 0 {
            shared(Circle {
                radius: ix[1] as f64,
            })
        } else {
            shared(Rect {
                width: ix[0] as f64,
                height: 1.0,
            })
        }
    })
    .unwrap();

    let back: MdArray<Ref<dyn Shape>> = weft.deserialize(&weft.serialize(&grid).unwrap()).unwrap();
    assert_eq!(back.dims(), &[2, 3]);
    assert!(back.get(&[0, 0]).unwrap().borrow().as_any().is::<Circle>());
    assert!(back.get(&[0, 1]).unwrap().borrow().as_any().is::<Rect>());
    assert!(back.get(&[1, 1]).unwrap().borrow().as_any().is::<Circle>());
    assert_eq!(back.get(&[1, 2]).unwrap().borrow().area(), 1.0);
    assert_eq!(back.get(&[0, 2]).unwrap().borrow().area(), 12.0);
}

#[test]
fn test_object_root_round_trips() {
    let weft = Weft::default();
    let root: Ref<dyn Object> = shared(Circle { radius: 4.0 });
    let bytes = weft.serialize(&root).unwrap();
    let back: Ref<dyn Object> = weft.deserialize(&bytes).unwrap();
    assert_eq!(
        back.borrow().downcast_ref::<Circle>(),
        Some(&Circle { radius: 4.0 })
    );
    assert_eq!(format!("{:?}", &*back.borrow()), "Object(geo.Circle)");
}

#[test]
fn test_same_instance_through_two_views() {
    let weft = Weft::default();
    let circle = shared(Circle { radius: 2.0 });
    let sketch = shared(Drawing {
        title: "views".to_string(),
        shapes: vec![circle.clone()],
        highlight: None,
    });
    let roots: Vec<Ref<dyn Object>> = vec![sketch, circle];
    let back: Vec<Ref<dyn Object>> = weft.deserialize(&weft.serialize(&roots).unwrap()).unwrap();

    let first = back[0].borrow();
    let sketch = first.downcast_ref::<Drawing>().unwrap();
    assert!(same_ref(&sketch.shapes[0], &back[1]));
}

#[test]
fn test_unregistered_object_type_is_a_resolution_error() {
    let writer = Weft::default();
    let root: Ref<dyn Object> = shared(Unlisted { id: 1 });
    let bytes = writer.serialize(&root).unwrap();

    let err = Weft::default()
        .deserialize::<Ref<dyn Object>>(&bytes)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeResolution);
    assert!(err.to_string().contains("test.Unlisted"));
}

#[test]
fn test_unlisted_implementor_is_rejected() {
    let weft = Weft::default();
    weft.register::<Unlisted>().unwrap();
    let root: Ref<dyn Object> = shared(Unlisted { id: 1 });
    let bytes = weft.serialize(&root).unwrap();
    let err = weft.deserialize::<Ref<dyn Shape>>(&bytes).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[test]
fn test_fresh_engine_reads_interface_collections() {
    let writer = Weft::default();
    let shapes: Vec<Ref<dyn Shape>> = vec![
        shared(Rect {
            width: 3.0,
            height: 2.0,
        }),
        shared(Circle { radius: 1.0 }),
    ];
    let bytes = writer.serialize(&shapes).unwrap();

    let back: Vec<Ref<dyn Shape>> = Weft::default().deserialize(&bytes).unwrap();
    assert!(back[0].borrow().as_any().is::<Rect>());
    assert!(back[1].borrow().as_any().is::<Circle>());
    let areas: Vec<f64> = back.iter().map(|s| s.borrow().area()).collect();
    assert_eq!(areas, [6.0, 3.0]);

    let grid = MdArray::from_fn(vec![1, 2], |ix| -> Ref<dyn Shape> {
        shared(Circle {
            radius: ix[1] as f64 + 1.0,
        })
    })
    .unwrap();
    let bytes = writer.serialize(&grid).unwrap();
    let back: MdArray<Ref<dyn Shape>> = Weft::default().deserialize(&bytes).unwrap();
    assert_eq!(back.get(&[0, 1]).unwrap().borrow().area(), 12.0);

    let single: Ref<dyn Shape> = shared(Rect {
        width: 1.0,
        height: 4.0,
    });
    let bytes = writer.serialize(&single).unwrap();
    let back: Ref<dyn Shape> = Weft::default().deserialize(&bytes).unwrap();
    assert_eq!(back.borrow().area(), 4.0);
}
