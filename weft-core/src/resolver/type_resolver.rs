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

use super::context::ReadContext;
use super::ref_resolver::RefSlot;
use crate::buffer::Writer;
use crate::error::Error;
use crate::meta::TypeDescriptor;
use crate::serializer::array::MdArray;
use crate::serializer::reference::{Object, Ref};
use crate::serializer::Serializer;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Allocates a shared instance of a registered type from the stream, fills its
/// reference slot and populates it, or queues the population when the last
/// argument is set. The others are the stream-local type index and the
/// reserved reference id (absent for untracked instances).
pub type ReadSlotFn =
    fn(&mut ReadContext<'_>, usize, Option<u32>, bool) -> Result<RefSlot, Error>;

#[derive(Clone, Copy)]
pub struct Harness {
    read_slot_fn: ReadSlotFn,
}

impl Harness {
    pub fn new(read_slot_fn: ReadSlotFn) -> Harness {
        Harness { read_slot_fn }
    }

    #[inline(always)]
    pub fn get_read_slot_fn(&self) -> ReadSlotFn {
        self.read_slot_fn
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Harness")
    }
}

/// Registry entry: a descriptor plus everything the pipelines need to use it.
#[derive(Debug)]
pub struct TypeInfo {
    id: u32,
    rust_type: TypeId,
    rust_name: &'static str,
    descriptor: TypeDescriptor,
    def_bytes: Vec<u8>,
    harness: Option<Harness>,
}

impl TypeInfo {
    pub fn new<T: 'static>(descriptor: TypeDescriptor) -> TypeInfo {
        let def_bytes = descriptor.to_def().to_bytes();
        TypeInfo {
            id: 0,
            rust_type: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            descriptor,
            def_bytes,
            harness: None,
        }
    }

    /// Makes the type constructible as a shared instance when only its name is
    /// known, as when it is read through `Ref<dyn Object>` or a polymorphic
    /// trait.
    pub fn with_harness(mut self, read_slot_fn: ReadSlotFn) -> TypeInfo {
        self.harness = Some(Harness::new(read_slot_fn));
        self
    }

    /// Registry id, stable for the lifetime of the registry.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn rust_type(&self) -> TypeId {
        self.rust_type
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Pre-encoded on-wire definition.
    pub fn def_bytes(&self) -> &[u8] {
        &self.def_bytes
    }

    pub fn harness(&self) -> Option<Harness> {
        self.harness
    }
}

/// Types that own a type header on the wire and can live in the registry.
pub trait WeftType: Serializer {
    fn weft_type_info() -> TypeInfo;
}

/// Discovery hook stored in [`FieldType`](crate::meta::FieldType)s.
pub fn discover<T: WeftType>(resolver: &TypeResolver) -> Result<(), Error> {
    resolver.resolve::<T>().map(|_| ())
}

/// The batch type table as written after the head byte, encoded once per
/// change of the batch.
#[derive(Debug)]
pub struct BatchTable {
    rust_types: Vec<TypeId>,
    bytes: Vec<u8>,
}

impl BatchTable {
    fn build(batch: &[Arc<TypeInfo>]) -> BatchTable {
        let mut writer = Writer::default();
        writer.write_varuint32(batch.len() as u32);
        for info in batch {
            writer.write_bytes(info.def_bytes());
        }
        BatchTable {
            rust_types: batch.iter().map(|info| info.rust_type()).collect(),
            bytes: writer.into_bytes(),
        }
    }

    /// Rust types in stream index order.
    pub fn rust_types(&self) -> &[TypeId] {
        &self.rust_types
    }

    /// Definition count followed by the definitions.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Default)]
struct Registry {
    by_rust: HashMap<TypeId, Arc<TypeInfo>>,
    by_name: HashMap<String, Arc<TypeInfo>>,
    ordered: Vec<Arc<TypeInfo>>,
    batch: Vec<Arc<TypeInfo>>,
    batch_table: Option<Arc<BatchTable>>,
}

impl Registry {
    /// Returns the stored entry and whether it was inserted by this call.
    fn insert(&mut self, mut info: TypeInfo) -> Result<(Arc<TypeInfo>, bool), Error> {
        if let Some(existing) = self.by_rust.get(&info.rust_type) {
            return Ok((existing.clone(), false));
        }
        if let Some(existing) = self.by_name.get(info.name()) {
            return Err(Error::type_resolution(format!(
                "type name `{}` is already bound to `{}`, cannot bind it to `{}`",
                info.name(),
                existing.rust_name,
                info.rust_name
            )));
        }
        info.id = self.ordered.len() as u32;
        let info = Arc::new(info);
        self.by_rust.insert(info.rust_type, info.clone());
        self.by_name.insert(info.name().to_owned(), info.clone());
        self.ordered.push(info.clone());
        Ok((info, true))
    }
}

/// Process-wide cache of type descriptors, keyed by Rust type and by name.
///
/// Reads take a shared lock; a miss builds the descriptor outside the lock and
/// inserts it under the write lock, so concurrent calls that discover the same
/// type agree on one entry. Newly inserted types have their declared field
/// types discovered as well, which makes nested types readable by name.
pub struct TypeResolver {
    inner: RwLock<Registry>,
}

impl Default for TypeResolver {
    fn default() -> Self {
        let resolver = TypeResolver::empty();
        resolver.seed_builtin();
        resolver
    }
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver without the built-in primitives and containers.
    pub fn empty() -> Self {
        TypeResolver {
            inner: RwLock::new(Registry::default()),
        }
    }

    fn seed<T: WeftType>(&self) {
        let mut registry = self.inner.write();
        if let Err(err) = registry.insert(T::weft_type_info()) {
            log::warn!("skipping built-in type: {}", err);
        }
    }

    fn seed_builtin(&self) {
        self.seed::<bool>();
        self.seed::<i8>();
        self.seed::<i16>();
        self.seed::<i32>();
        self.seed::<i64>();
        self.seed::<u8>();
        self.seed::<u16>();
        self.seed::<u32>();
        self.seed::<u64>();
        self.seed::<f32>();
        self.seed::<f64>();
        self.seed::<char>();
        self.seed::<String>();
        self.seed::<Decimal>();
        self.seed::<NaiveDateTime>();
        self.seed::<NaiveDate>();
        self.seed::<TimeDelta>();
        self.seed::<Vec<Ref<dyn Object>>>();
        self.seed::<Vec<Option<Ref<dyn Object>>>>();
        self.seed::<MdArray<Ref<dyn Object>>>();
        self.seed::<HashMap<String, Ref<dyn Object>>>();
        self.seed::<Vec<String>>();
        self.seed::<Vec<i32>>();
        self.seed::<Vec<i64>>();
        self.seed::<Vec<f64>>();
        self.seed::<HashMap<String, String>>();
    }

    /// Returns the descriptor of `T`, discovering it on first use.
    pub fn resolve<T: WeftType>(&self) -> Result<Arc<TypeInfo>, Error> {
        if let Some(info) = self.inner.read().by_rust.get(&TypeId::of::<T>()) {
            return Ok(info.clone());
        }
        let built = T::weft_type_info();
        let (info, inserted) = self.inner.write().insert(built)?;
        if inserted {
            log::debug!(
                "discovered type `{}` as id {} ({})",
                info.name(),
                info.id(),
                info.rust_name()
            );
            info.descriptor().discover_nested(self)?;
        }
        Ok(info)
    }

    pub fn get<T: 'static>(&self) -> Option<Arc<TypeInfo>> {
        self.inner.read().by_rust.get(&TypeId::of::<T>()).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.inner.read().by_name.get(name).cloned()
    }

    pub fn get_by_id(&self, id: u32) -> Option<Arc<TypeInfo>> {
        self.inner.read().ordered.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Types whose definitions are written up front in every stream.
    pub fn batch(&self) -> Vec<Arc<TypeInfo>> {
        self.inner.read().batch.clone()
    }

    /// Encoded batch table, or `None` when nothing was batch registered.
    pub fn batch_table(&self) -> Option<Arc<BatchTable>> {
        self.inner.read().batch_table.clone()
    }

    pub(crate) fn add_to_batch(&self, info: Arc<TypeInfo>) {
        let mut registry = self.inner.write();
        if !registry
            .batch
            .iter()
            .any(|b| b.rust_type() == info.rust_type())
        {
            log::debug!("type `{}` joins the batch type table", info.name());
            registry.batch.push(info);
            let table = BatchTable::build(&registry.batch);
            registry.batch_table = Some(Arc::new(table));
        }
    }
}

/// A closed set of types registered together, written as a tuple.
pub trait TypeSet {
    fn resolve_all(resolver: &TypeResolver) -> Result<Vec<Arc<TypeInfo>>, Error>;
}

macro_rules! impl_type_set {
    ($($name:ident),+) => {
        impl<$($name: WeftType),+> TypeSet for ($($name,)+) {
            fn resolve_all(resolver: &TypeResolver) -> Result<Vec<Arc<TypeInfo>>, Error> {
                Ok(vec![$(resolver.resolve::<$name>()?),+])
            }
        }
    };
}

impl_type_set!(A);
impl_type_set!(A, B);
impl_type_set!(A, B, C);
impl_type_set!(A, B, C, D);
impl_type_set!(A, B, C, D, E);
impl_type_set!(A, B, C, D, E, F);
impl_type_set!(A, B, C, D, E, F, G);
impl_type_set!(A, B, C, D, E, F, G, H);
impl_type_set!(A, B, C, D, E, F, G, H, I);
impl_type_set!(A, B, C, D, E, F, G, H, I, J);
impl_type_set!(A, B, C, D, E, F, G, H, I, J, K);
impl_type_set!(A, B, C, D, E, F, G, H, I, J, K, L);
