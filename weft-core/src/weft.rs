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

use crate::buffer::{Reader, Writer};
use crate::config::Config;
use crate::error::Error;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::{TypeInfo, TypeResolver, TypeSet, WeftType};
use crate::resolver::version::VersionStrategy;
use crate::serializer::Serializer;
use std::sync::Arc;

/// The serialization engine.
///
/// A `Weft` owns the configuration and the type registry. It holds no
/// per-call state, so one engine can be shared by many threads behind an
/// `Arc`; every serialize and deserialize call builds its own context with a
/// fresh reference table.
///
/// ```rust
/// use weft_core::{impl_object, shared, Ref, Weft};
///
/// #[derive(Default)]
/// struct Node {
///     label: String,
///     next: Option<Ref<Node>>,
/// }
/// impl_object!(class Node("demo.Node") { label: String, next: Option<Ref<Node>> });
///
/// let weft = Weft::default();
/// let a = shared(Node { label: "a".into(), next: None });
/// a.borrow_mut().next = Some(a.clone());
///
/// let bytes = weft.serialize(&a).unwrap();
/// let back: Ref<Node> = weft.deserialize(&bytes).unwrap();
/// let next = back.borrow().next.clone().unwrap();
/// assert!(std::rc::Rc::ptr_eq(&back, &next));
/// ```
pub struct Weft {
    config: Config,
    resolver: TypeResolver,
}

impl Default for Weft {
    fn default() -> Self {
        Weft {
            config: Config::default(),
            resolver: TypeResolver::default(),
        }
    }
}

impl Weft {
    /// Enables or disables reference tracking.
    ///
    /// With tracking off, an instance reachable along several paths is
    /// written once per path and comes back as separate copies, and an
    /// instance that contains itself fails with a reference cycle error.
    ///
    /// The default is `true`.
    pub fn track_ref(mut self, track_ref: bool) -> Self {
        self.config.track_ref = track_ref;
        self
    }

    /// Sets the maximum nesting depth of composite values. The default is 256.
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Sets the depth from which new shared class instances are deferred.
    ///
    /// With reference tracking on, a class instance first met at this depth
    /// or deeper is written as its type header only, and its fields follow
    /// once the rest of the root value is written. Long chains of shared
    /// instances therefore never nest deeper than this. The default is 64.
    pub fn defer_depth(mut self, defer_depth: u32) -> Self {
        self.config.defer_depth = defer_depth;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Registers `T` and the types its fields declare.
    ///
    /// Registration is optional for types that are written or read statically,
    /// which are discovered on first use. It is required for types that only
    /// ever appear behind `Ref<dyn Object>` on the read side.
    pub fn register<T: WeftType>(&self) -> Result<Arc<TypeInfo>, Error> {
        self.resolver.resolve::<T>()
    }

    /// Registers a tuple of types and writes their definitions up front in
    /// every stream, so repeated values never spell their names inline.
    ///
    /// ```rust
    /// use weft_core::{impl_object, Weft};
    ///
    /// #[derive(Default)]
    /// struct A { x: i32 }
    /// #[derive(Default)]
    /// struct B { y: String }
    /// impl_object!(value A("demo.A") { x: i32 });
    /// impl_object!(value B("demo.B") { y: String });
    ///
    /// let weft = Weft::default();
    /// weft.register_batch::<(A, B)>().unwrap();
    /// assert_eq!(weft.resolver().batch().len(), 2);
    /// ```
    pub fn register_batch<S: TypeSet>(&self) -> Result<(), Error> {
        for info in S::resolve_all(&self.resolver)? {
            self.resolver.add_to_batch(info);
        }
        Ok(())
    }

    /// Descriptor of `T`, discovering it if needed.
    pub fn resolve<T: WeftType>(&self) -> Result<Arc<TypeInfo>, Error> {
        self.resolver.resolve::<T>()
    }

    pub fn serialize<T: Serializer>(&self, record: &T) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::default();
        self.serialize_into(&mut writer, record)?;
        Ok(writer.into_bytes())
    }

    /// Appends one root to `writer`. Several roots written this way can be
    /// read back in order with [`Weft::deserialize_from`].
    ///
    /// On failure the writer is truncated back to its length at the start of
    /// the call.
    pub fn serialize_into<T: Serializer>(&self, writer: &mut Writer, record: &T) -> Result<(), Error> {
        let start = writer.len();
        let result = {
            let mut context = WriteContext::new(self, writer);
            context.write_head();
            record
                .weft_write(&mut context)
                .and_then(|_| context.write_deferred())
        };
        if result.is_err() {
            writer.truncate(start);
        }
        result
    }

    /// Reads one root spanning all of `bf`.
    pub fn deserialize<T: Serializer>(&self, bf: &[u8]) -> Result<T, Error> {
        self.deserialize_exact(bf, None)
    }

    /// Reads one root spanning all of `bf`, reconciling older type shapes
    /// through `strategy`.
    pub fn deserialize_with<T: Serializer>(
        &self,
        bf: &[u8],
        strategy: &dyn VersionStrategy,
    ) -> Result<T, Error> {
        self.deserialize_exact(bf, Some(strategy))
    }

    fn deserialize_exact<T: Serializer>(
        &self,
        bf: &[u8],
        strategy: Option<&dyn VersionStrategy>,
    ) -> Result<T, Error> {
        let mut reader = Reader::new(bf);
        let value = self.deserialize_from(&mut reader, strategy)?;
        if !reader.is_at_end() {
            return Err(Error::invalid_data(format!(
                "{} trailing bytes after the root value",
                reader.remaining()
            )));
        }
        Ok(value)
    }

    /// Reads the next root from `reader` and leaves its cursor right after
    /// it. On failure the cursor does not move.
    pub fn deserialize_from<T: Serializer>(
        &self,
        reader: &mut Reader<'_>,
        strategy: Option<&dyn VersionStrategy>,
    ) -> Result<T, Error> {
        let mut context = ReadContext::new(self, reader.clone(), strategy);
        let result = context
            .read_head()
            .and_then(|_| T::weft_read(&mut context))
            .and_then(|value| context.read_deferred().map(|_| value))
            .map_err(Error::enhance_type_error::<T>)?;
        reader.set_cursor(context.reader.cursor());
        Ok(result)
    }
}
