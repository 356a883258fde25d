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

//! # Weft Core
//!
//! The engine behind the `weft` object-graph serializer. It writes arbitrary
//! graphs of Rust values to a compact, self-describing byte stream and reads
//! them back with shared references, cycles and trait-object fields intact.
//!
//! ## Architecture
//!
//! - **`weft`**: the [`Weft`] engine: configuration, registration and the
//!   serialize/deserialize entry points
//! - **`buffer`**: [`Writer`] and [`Reader`] with varint and fixed-width
//!   primitives
//! - **`meta`**: type descriptors and the on-wire type definitions
//! - **`resolver`**: the type registry, reference tables, per-call contexts
//!   and version strategies
//! - **`serializer`**: one module per value family, plus the dynamic
//!   [`Value`] model
//! - **`types`**: value tags, type kinds and format constants
//! - **`error`**: the [`Error`] type and its categories
//!
//! ## Key Concepts
//!
//! ### Value types and reference types
//!
//! A struct declared with `impl_object!(value ..)` is always written inline.
//! A class declared with `impl_object!(class ..)` and held through
//! [`Ref<T>`](Ref) is reference tracked: every instance gets an id the first
//! time it is written, and later occurrences are written as back-references.
//! On read an instance is published under its id before its fields are read,
//! so fields pointing back at an ancestor resolve to the same instance.
//!
//! ### Polymorphism
//!
//! `Ref<dyn Object>` holds any reference type, and `register_polymorphic!`
//! makes `Ref<dyn Trait>` serializable for a closed set of implementors. The
//! runtime type's definition travels with the value.
//!
//! ### Version transforms
//!
//! A [`VersionStrategy`] passed to [`Weft::deserialize_with`] maps older type
//! names and fields onto current types, computes derived fields and hands
//! unknown fields to the target's extras bag.
//!
//! ## Usage
//!
//! ```rust
//! use weft_core::{impl_object, Weft};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     tags: Vec<String>,
//! }
//! impl_object!(value Person("demo.Person") { name: String, age: i32, tags: Vec<String> });
//!
//! let weft = Weft::default();
//! let person = Person { name: "Ada".into(), age: 36, tags: vec!["math".into()] };
//! let bytes = weft.serialize(&person).unwrap();
//! assert_eq!(weft.deserialize::<Person>(&bytes).unwrap(), person);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod meta;
pub mod resolver;
pub mod serializer;
pub mod types;
pub mod weft;

pub use buffer::{Reader, Writer};
pub use config::Config;
pub use error::{Error, ErrorCategory};
pub use meta::{FieldDescriptor, FieldType, TypeDef, TypeDescriptor};
pub use resolver::context::{ReadContext, WriteContext};
pub use resolver::type_resolver::{TypeInfo, TypeResolver, TypeSet, WeftType};
pub use resolver::version::{FieldMapping, IdentityStrategy, TransformStrategy, VersionStrategy};
pub use serializer::array::MdArray;
pub use serializer::custom::CustomSerialize;
pub use serializer::dictionary::{CaseInsensitive, DefaultComparer, Dictionary, KeyComparer};
pub use serializer::object::ObjectHooks;
pub use serializer::reference::{same_ref, shared, Object, Ref, Referent};
pub use serializer::value::{DynamicMap, DynamicObject, DynamicPayload, ExtraData, Value};
pub use serializer::Serializer;
pub use types::{Tag, TypeKind};
pub use weft::Weft;
