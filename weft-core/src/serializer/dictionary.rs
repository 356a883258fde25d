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

//! Dictionaries whose key equality is a serializable value.
//!
//! A [`Dictionary`] looks keys up through its [`KeyComparer`] and carries the
//! comparer on the wire ahead of the entries. The reader rebuilds the comparer
//! first and re-inserts every entry through it, so two keys that are equal
//! under the comparer collapse into one entry even if the writer held them
//! apart.

use crate::error::Error;
use crate::meta::{FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefSlot;
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::serializer::map::write_entries;
use crate::serializer::reference::{borrow_target, read_slot, shared, Ref, Referent};
use crate::serializer::{expect_tag, Serializer};
use crate::types::{Tag, TypeKind};
use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Key equality of a [`Dictionary`]. `hash_key` must agree with `eq_keys`.
pub trait KeyComparer<K>: Serializer + Default {
    fn hash_key(&self, key: &K) -> u64;

    fn eq_keys(&self, a: &K, b: &K) -> bool;
}

/// Equality through the key's own `Eq` and `Hash`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultComparer;

crate::impl_object!(value DefaultComparer("weft.DefaultComparer") {});

impl<K: Hash + Eq> KeyComparer<K> for DefaultComparer {
    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_keys(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// String keys compared without regard to case.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaseInsensitive;

crate::impl_object!(value CaseInsensitive("weft.CaseInsensitive") {});

impl KeyComparer<String> for CaseInsensitive {
    fn hash_key(&self, key: &String) -> u64 {
        let mut hasher = DefaultHasher::new();
        for c in key.chars().flat_map(char::to_lowercase) {
            c.hash(&mut hasher);
        }
        hasher.finish()
    }

    fn eq_keys(&self, a: &String, b: &String) -> bool {
        a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
    }
}

/// Insertion-ordered map with a pluggable key comparer.
#[derive(Clone)]
pub struct Dictionary<K, V, C = DefaultComparer> {
    comparer: C,
    entries: Vec<(K, V)>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl<K, V, C: KeyComparer<K>> Default for Dictionary<K, V, C> {
    fn default() -> Self {
        Self::with_comparer(C::default())
    }
}

impl<K, V, C: KeyComparer<K>> Dictionary<K, V, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparer(comparer: C) -> Self {
        Dictionary {
            comparer,
            entries: vec![],
            buckets: HashMap::new(),
        }
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    fn find(&self, key: &K) -> Option<usize> {
        let bucket = self.buckets.get(&self.comparer.hash_key(key))?;
        bucket
            .iter()
            .copied()
            .find(|&i| self.comparer.eq_keys(&self.entries[i].0, key))
    }

    /// Inserts or replaces. A replaced entry keeps its original key and
    /// position; the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(index) = self.find(&key) {
            return Some(std::mem::replace(&mut self.entries[index].1, value));
        }
        let hash = self.comparer.hash_key(&key);
        self.buckets.entry(hash).or_default().push(self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(move |i| &mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes an entry. The last entry takes its position.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let hash = self.comparer.hash_key(key);
        let bucket = self.buckets.get_mut(&hash)?;
        let pos = bucket
            .iter()
            .position(|&i| self.comparer.eq_keys(&self.entries[i].0, key))?;
        let index = bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        let (_, value) = self.entries.swap_remove(index);
        let moved_from = self.entries.len();
        if index < moved_from {
            let moved_hash = self.comparer.hash_key(&self.entries[index].0);
            if let Some(slot) = self
                .buckets
                .get_mut(&moved_hash)
                .and_then(|b| b.iter_mut().find(|i| **i == moved_from))
            {
                *slot = index;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K, V, C> std::fmt::Debug for Dictionary<K, V, C>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
    C: KeyComparer<K> + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("comparer", &self.comparer)
            .field("entries", &self.entries)
            .finish()
    }
}

impl<K, V: PartialEq, C: KeyComparer<K>> PartialEq for Dictionary<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K, V, C: KeyComparer<K>> FromIterator<(K, V)> for Dictionary<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dictionary = Self::new();
        for (k, v) in iter {
            dictionary.insert(k, v);
        }
        dictionary
    }
}

/// A missing comparer on the stream, as written by plain maps, reads as the
/// default comparer.
fn read_comparer<K, C: KeyComparer<K>>(context: &mut ReadContext<'_>) -> Result<C, Error> {
    let tag = context.read_tag()?;
    if tag == Tag::Null {
        return Ok(C::default());
    }
    C::weft_read_tagged(tag, context)
}

impl<K, V, C> Serializer for Dictionary<K, V, C>
where
    K: Serializer,
    V: Serializer,
    C: KeyComparer<K>,
{
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::Map);
        context.write_in_place(|context| self.comparer.weft_write(context))?;
        write_entries(self.len(), self.iter(), context)
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Map)?;
        let comparer = read_comparer::<K, C>(context)?;
        let len = context.read_length()?;
        let mut dictionary = Dictionary::with_comparer(comparer);
        for _ in 0..len {
            let key = K::weft_read(context)?;
            let value = V::weft_read(context)?;
            dictionary.insert(key, value);
        }
        Ok(dictionary)
    }

    fn weft_field_type() -> FieldType {
        let (key, value, comparer) = (K::weft_field_type(), V::weft_field_type(), C::weft_field_type());
        FieldType::new(
            format!(
                "dictionary<{},{},{}>",
                key.canonical_name(),
                value.canonical_name(),
                comparer.canonical_name()
            ),
            TypeKind::Map,
        )
        .with_generics(vec![key, value, comparer])
        .with_discovery(discover::<Self>)
    }
}

impl<K, V, C> WeftType for Dictionary<K, V, C>
where
    K: Serializer,
    V: Serializer,
    C: KeyComparer<K>,
{
    fn weft_type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeDescriptor::builtin(
            &Self::weft_field_type(),
            TypeKind::Map,
        ))
        .with_harness(read_slot::<Self>)
    }
}

impl<K, V, C> Referent for Dictionary<K, V, C>
where
    K: Serializer,
    V: Serializer,
    C: KeyComparer<K>,
{
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_type_header::<Self>()?;
        context.write_in_place(|context| self.comparer.weft_write(context))?;
        write_entries(self.len(), self.iter(), context)
    }

    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        context.expect_type::<Self>(wire)?;
        let comparer = read_comparer::<K, C>(context)?;
        let len = context.read_length()?;
        let rc = shared(Dictionary::with_comparer(comparer));
        context.fill_ref(ref_id, &rc)?;
        for _ in 0..len {
            let key = K::weft_read(context)?;
            let value = V::weft_read(context)?;
            borrow_target(&rc)?.insert(key, value);
        }
        Ok(rc)
    }

    fn from_slot(slot: &RefSlot) -> Result<Ref<Self>, Error> {
        slot.downcast_or_err::<Self>(Self::weft_field_type().name())
    }

    fn referent_field_type() -> FieldType {
        Self::weft_field_type()
    }

    fn referent_type_name(&self) -> Cow<'static, str> {
        Cow::Owned(Self::weft_field_type().name().to_owned())
    }
}
