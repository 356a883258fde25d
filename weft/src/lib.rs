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

//! # Weft
//!
//! Weft is a binary serializer for object graphs. It writes trees, DAGs and
//! cyclic graphs of Rust values into a compact self-describing stream and
//! reads them back with every shared instance shared again, every cycle
//! closed again and every trait-object field holding its exact concrete
//! type.
//!
//! ## Key Features
//!
//! - **Reference tracking**: an instance reachable along several paths is
//!   written once and comes back as one instance
//! - **Cycles**: instances are published before their fields are read, so a
//!   child pointing at its parent resolves to the parent being built
//! - **Polymorphism**: `Ref<dyn Object>` and `Ref<dyn Trait>` fields keep
//!   their runtime type
//! - **Version transforms**: data written by an older type shape can be read
//!   into the current one, with renamed, derived and leftover fields
//! - **No reflection**: field lists are declared once with `impl_object!`
//!   and cached per type in a shared registry
//!
//! ## Object graphs
//!
//! ```rust
//! use weft::{impl_object, shared, Error, Ref, Weft};
//!
//! #[derive(Default)]
//! struct Folder {
//!     name: String,
//!     parent: Option<Ref<Folder>>,
//!     children: Vec<Ref<Folder>>,
//! }
//! impl_object!(class Folder("fs.Folder") {
//!     name: String,
//!     parent: Option<Ref<Folder>>,
//!     children: Vec<Ref<Folder>>,
//! });
//!
//! # fn main() -> Result<(), Error> {
//! let root = shared(Folder { name: "/".into(), ..Default::default() });
//! let home = shared(Folder { name: "home".into(), parent: Some(root.clone()), children: vec![] });
//! root.borrow_mut().children.push(home);
//!
//! let weft = Weft::default();
//! let bytes = weft.serialize(&root)?;
//! let back: Ref<Folder> = weft.deserialize(&bytes)?;
//!
//! let child = back.borrow().children[0].clone();
//! let parent = child.borrow().parent.clone().unwrap();
//! assert!(std::rc::Rc::ptr_eq(&parent, &back));
//! # Ok(())
//! # }
//! ```
//!
//! ## Polymorphic fields
//!
//! ```rust
//! use weft::{impl_object, register_polymorphic, shared, Object, Ref, Weft};
//!
//! trait Animal: Object {
//!     fn sound(&self) -> &'static str;
//! }
//!
//! #[derive(Default)]
//! struct Dog { name: String }
//! #[derive(Default)]
//! struct Cat { lives: u8 }
//! impl_object!(class Dog("zoo.Dog") { name: String });
//! impl_object!(class Cat("zoo.Cat") { lives: u8 });
//! impl Animal for Dog {
//!     fn sound(&self) -> &'static str { "woof" }
//! }
//! impl Animal for Cat {
//!     fn sound(&self) -> &'static str { "meow" }
//! }
//! register_polymorphic!(dyn Animal as "zoo.Animal": Dog, Cat);
//!
//! let weft = Weft::default();
//! let zoo: Vec<Ref<dyn Animal>> = vec![
//!     shared(Dog { name: "rex".into() }),
//!     shared(Cat { lives: 9 }),
//! ];
//! let bytes = weft.serialize(&zoo).unwrap();
//! let back: Vec<Ref<dyn Animal>> = weft.deserialize(&bytes).unwrap();
//! let sounds: Vec<_> = back.iter().map(|a| a.borrow().sound()).collect();
//! assert_eq!(sounds, ["woof", "meow"]);
//! ```
//!
//! ## Version transforms
//!
//! ```rust
//! use weft::{impl_object, TransformStrategy, Value, Weft};
//!
//! #[derive(Default)]
//! struct ItemV1 { title: String, cents: i64 }
//! impl_object!(value ItemV1("shop.ItemV1") { title: String, cents: i64 });
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Item { name: String, price: f64 }
//! impl_object!(value Item("shop.Item") { name: String, price: f64 });
//!
//! let weft = Weft::default();
//! let bytes = weft.serialize(&ItemV1 { title: "tea".into(), cents: 250 }).unwrap();
//!
//! let strategy = TransformStrategy::new()
//!     .map_type("shop.ItemV1", "shop.Item")
//!     .rename_field("shop.ItemV1", "title", "name")
//!     .unmapped_field("shop.ItemV1", "cents")
//!     .on_finalize::<Item, _, _>("shop.ItemV1", |item, extras| {
//!         let cents = extras.get("cents").and_then(Value::as_i64).unwrap_or(0);
//!         item.price = cents as f64 / 100.0;
//!         Ok(())
//!     });
//! let item: Item = weft.deserialize_with(&bytes, &strategy).unwrap();
//! assert_eq!(item, Item { name: "tea".into(), price: 2.5 });
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns `Result<_, Error>`. [`Error::category`] tells a
//! missing type ([`ErrorCategory::TypeResolution`]) from bad input
//! ([`ErrorCategory::Format`]), an unsupported cycle
//! ([`ErrorCategory::ReferenceCycle`]) and a failed upgrade
//! ([`ErrorCategory::VersionTransform`]).

pub use weft_core::{
    bail, ensure, impl_custom, impl_enum, impl_object, not_allowed, register_polymorphic,
};
pub use weft_core::{
    same_ref, shared, CaseInsensitive, Config, CustomSerialize, DefaultComparer, Dictionary,
    DynamicMap, DynamicObject, DynamicPayload, Error, ErrorCategory, ExtraData, FieldMapping,
    IdentityStrategy, KeyComparer, MdArray, Object, ObjectHooks, Reader, Ref, Serializer,
    TransformStrategy, TypeKind, Value, VersionStrategy, Weft, WeftType, Writer,
};

/// Lower-level building blocks for custom `Serializer` implementations.
pub mod core {
    pub use weft_core::{
        buffer, error, meta, resolver, serializer, types, FieldType, ReadContext, Referent, Tag,
        TypeDescriptor, TypeInfo, WriteContext,
    };
}
