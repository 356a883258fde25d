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

use crate::error::Error;
use crate::meta::{FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefSlot;
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::serializer::reference::{borrow_target, read_slot, shared, Ref, Referent};
use crate::serializer::value::Value;
use crate::serializer::{expect_tag, Serializer};
use crate::types::{Tag, TypeKind};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// Every map payload starts with its key comparer; plain maps write NULL.
pub(crate) fn write_entries<'a, K, V, I>(
    len: usize,
    entries: I,
    context: &mut WriteContext<'_>,
) -> Result<(), Error>
where
    K: Serializer,
    V: Serializer,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    context.writer.write_varuint32(len as u32);
    for (key, value) in entries {
        context.write_in_place(|context| key.weft_write(context))?;
        value.weft_write(context)?;
    }
    Ok(())
}

/// Reads the comparer slot of a map payload. Plain maps have no use for a
/// comparer, so one written by a dictionary is decoded and dropped.
fn skip_comparer(context: &mut ReadContext<'_>, map_name: &str) -> Result<(), Error> {
    let tag = context.read_tag()?;
    if tag != Tag::Null {
        let comparer = Value::weft_read_tagged(tag, context)?;
        log::debug!("`{}` ignores the key comparer {:?} on the stream", map_name, comparer);
    }
    Ok(())
}

macro_rules! impl_map {
    ($map:ident, $prefix:literal, $($bound:tt)+) => {
        impl<K: Serializer + $($bound)+, V: Serializer> Serializer for $map<K, V> {
            fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
                context.write_tag(Tag::Map);
                context.write_tag(Tag::Null);
                write_entries(self.len(), self.iter(), context)
            }

            fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
                expect_tag(tag, Tag::Map)?;
                skip_comparer(context, $prefix)?;
                let len = context.read_length()?;
                let mut map = $map::new();
                for _ in 0..len {
                    let key = K::weft_read(context)?;
                    let value = V::weft_read(context)?;
                    map.insert(key, value);
                }
                Ok(map)
            }

            fn weft_field_type() -> FieldType {
                FieldType::map($prefix, K::weft_field_type(), V::weft_field_type())
                    .with_discovery(discover::<$map<K, V>>)
            }
        }

        impl<K: Serializer + $($bound)+, V: Serializer> WeftType for $map<K, V> {
            fn weft_type_info() -> TypeInfo {
                TypeInfo::new::<Self>(TypeDescriptor::builtin(
                    &Self::weft_field_type(),
                    TypeKind::Map,
                ))
                .with_harness(read_slot::<Self>)
            }
        }

        impl<K: Serializer + $($bound)+, V: Serializer> Referent for $map<K, V> {
            fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
                context.write_type_header::<Self>()?;
                context.write_tag(Tag::Null);
                write_entries(self.len(), self.iter(), context)
            }

            fn read_referent(
                context: &mut ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<Ref<Self>, Error> {
                context.expect_type::<Self>(wire)?;
                skip_comparer(context, $prefix)?;
                let len = context.read_length()?;
                let rc = shared($map::new());
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
    };
}

impl_map!(HashMap, "map", Eq + Hash);
impl_map!(BTreeMap, "sortedmap", Ord);
