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

//! Self-describing values.
//!
//! [`Value`] can hold anything the wire format carries without a Rust type to
//! read it into. The read pipeline uses it for on-wire fields with no local
//! counterpart, and a stream of unregistered types read as `Value` keeps
//! enough of each type definition to be written back unchanged.

use crate::error::Error;
use crate::meta::{FieldType, TypeDef};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefSlot;
use crate::serializer::array::{self, MdArray};
use crate::serializer::reference::{borrow_target, same_ref, shared, Object, Ref, Referent};
use crate::serializer::Serializer;
use crate::types::{def_flags, Tag, TypeKind};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Duration(TimeDelta),
    /// Inline struct or custom payload.
    Struct(DynamicObject),
    Enum {
        type_name: String,
        value: i64,
    },
    List(Vec<Value>),
    Array(MdArray<Value>),
    Map(DynamicMap),
    /// Shared instance, typed if its type was registered with the reader.
    Shared(Ref<dyn Object>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&DynamicObject> {
        match self {
            Value::Struct(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_shared(&self) -> Option<&Ref<dyn Object>> {
        match self {
            Value::Shared(rc) => Some(rc),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (F32(a), F32(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Duration(a), Duration(b)) => a == b,
            (Struct(a), Struct(b)) => a == b,
            (
                Enum {
                    type_name: ta,
                    value: va,
                },
                Enum {
                    type_name: tb,
                    value: vb,
                },
            ) => ta == tb && va == vb,
            (List(a), List(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            // identity, so cyclic graphs compare without recursing
            (Shared(a), Shared(b)) => same_ref(a, b),
            _ => false,
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )+
    };
}

impl_from_primitive!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    Decimal => Decimal,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    TimeDelta => Duration,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl Serializer for Value {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        match self {
            Value::Null => {
                context.write_tag(Tag::Null);
                Ok(())
            }
            Value::Bool(v) => v.weft_write(context),
            Value::I8(v) => v.weft_write(context),
            Value::I16(v) => v.weft_write(context),
            Value::I32(v) => v.weft_write(context),
            Value::I64(v) => v.weft_write(context),
            Value::U8(v) => v.weft_write(context),
            Value::U16(v) => v.weft_write(context),
            Value::U32(v) => v.weft_write(context),
            Value::U64(v) => v.weft_write(context),
            Value::F32(v) => v.weft_write(context),
            Value::F64(v) => v.weft_write(context),
            Value::Char(v) => v.weft_write(context),
            Value::String(v) => v.weft_write(context),
            Value::Decimal(v) => v.weft_write(context),
            Value::DateTime(v) => v.weft_write(context),
            Value::Date(v) => v.weft_write(context),
            Value::Duration(v) => v.weft_write(context),
            Value::Struct(object) => {
                context.write_tag(Tag::Struct);
                context.write_dynamic_type_header(&object.def());
                context.enter()?;
                object.write_payload(context)?;
                context.leave();
                Ok(())
            }
            Value::Enum { type_name, value } => {
                context.write_tag(Tag::Enum);
                context.write_dynamic_type_header(&TypeDef {
                    name: type_name.clone(),
                    kind: TypeKind::Enum,
                    flags: 0,
                    fields: vec![],
                });
                context.writer.write_varint64(*value);
                Ok(())
            }
            Value::List(items) => items.weft_write(context),
            Value::Array(items) => items.weft_write(context),
            Value::Map(map) => {
                context.write_tag(Tag::Map);
                map.write_payload(context)
            }
            Value::Shared(rc) => context.write_shared(rc),
        }
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        match tag {
            Tag::Null => Ok(Value::Null),
            Tag::Bool => bool::weft_read_tagged(tag, context).map(Value::Bool),
            Tag::I8 => i8::weft_read_tagged(tag, context).map(Value::I8),
            Tag::I16 => i16::weft_read_tagged(tag, context).map(Value::I16),
            Tag::I32 => i32::weft_read_tagged(tag, context).map(Value::I32),
            Tag::I64 => i64::weft_read_tagged(tag, context).map(Value::I64),
            Tag::U8 => u8::weft_read_tagged(tag, context).map(Value::U8),
            Tag::U16 => u16::weft_read_tagged(tag, context).map(Value::U16),
            Tag::U32 => u32::weft_read_tagged(tag, context).map(Value::U32),
            Tag::U64 => u64::weft_read_tagged(tag, context).map(Value::U64),
            Tag::F32 => f32::weft_read_tagged(tag, context).map(Value::F32),
            Tag::F64 => f64::weft_read_tagged(tag, context).map(Value::F64),
            Tag::Char => char::weft_read_tagged(tag, context).map(Value::Char),
            Tag::String => String::weft_read_tagged(tag, context).map(Value::String),
            Tag::Decimal => Decimal::weft_read_tagged(tag, context).map(Value::Decimal),
            Tag::DateTime => NaiveDateTime::weft_read_tagged(tag, context).map(Value::DateTime),
            Tag::Date => NaiveDate::weft_read_tagged(tag, context).map(Value::Date),
            Tag::Duration => TimeDelta::weft_read_tagged(tag, context).map(Value::Duration),
            Tag::Struct => {
                let wire = context.read_type_header()?;
                let def = context.wire_def(wire)?;
                if !def.kind.has_fields() {
                    return Err(Error::type_mismatch(format!(
                        "stream type `{}` is {:?}, expected a struct",
                        def.name, def.kind
                    )));
                }
                context.enter()?;
                let payload = read_payload(context, &def)?;
                context.leave();
                Ok(Value::Struct(DynamicObject::from_def(&def, payload)))
            }
            Tag::Enum => {
                let wire = context.read_type_header()?;
                let def = context.expect_kind(wire, TypeKind::Enum)?;
                let value = context.reader.read_varint64()?;
                Ok(Value::Enum {
                    type_name: def.name.clone(),
                    value,
                })
            }
            Tag::List | Tag::Array | Tag::Map => {
                // nesting is unbounded without a static type, so count it here
                context.enter()?;
                let value = match tag {
                    Tag::List => Vec::<Value>::weft_read_tagged(tag, context).map(Value::List),
                    Tag::Array => {
                        MdArray::<Value>::weft_read_tagged(tag, context).map(Value::Array)
                    }
                    _ => DynamicMap::read_payload(context).map(Value::Map),
                }?;
                context.leave();
                Ok(value)
            }
            Tag::Ref | Tag::RefValue | Tag::NotNullValue | Tag::RefDeferred => {
                read_shared(tag, context).map(Value::Shared)
            }
        }
    }

    fn weft_field_type() -> FieldType {
        FieldType::new("any", TypeKind::Polymorphic)
    }
}

/// Reads a shared instance as its registered type when the reader knows it,
/// and as a [`DynamicObject`] otherwise.
fn read_shared(tag: Tag, context: &mut ReadContext<'_>) -> Result<Ref<dyn Object>, Error> {
    if tag == Tag::Ref {
        let ref_id = context.reader.read_varuint32()?;
        return Ok(context.resolve_ref(ref_id)?.object());
    }
    let ref_id = if tag == Tag::NotNullValue {
        None
    } else {
        Some(context.reserve_ref())
    };
    let deferred = tag == Tag::RefDeferred;
    let wire = context.read_type_header()?;
    let target = context.target_name(wire)?;
    let readable = context
        .get_weft()
        .resolver()
        .get_by_name(&target)
        .is_some_and(|info| info.harness().is_some());
    context.enter()?;
    let object = if readable {
        context.read_dynamic_referent(wire, ref_id, deferred)?.object()
    } else {
        log::debug!("type `{}` is not registered, reading it dynamically", target);
        let rc: Ref<dyn Object> = if deferred {
            DynamicObject::read_referent_deferred(context, wire, ref_id)?
        } else {
            DynamicObject::read_referent(context, wire, ref_id)?
        };
        rc
    };
    context.leave();
    Ok(object)
}

/// Instance of a type the reader has no Rust type for.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicObject {
    type_name: String,
    kind: TypeKind,
    flags: u8,
    payload: DynamicPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DynamicPayload {
    /// Field values in on-wire order.
    Fields(Vec<(String, Value)>),
    /// Bytes written by a custom hook.
    Custom(Vec<u8>),
    List(Vec<Value>),
    Array(MdArray<Value>),
    Map(DynamicMap),
    Boxed(Box<Value>),
}

impl DynamicObject {
    pub fn new<S: Into<String>>(type_name: S, kind: TypeKind, payload: DynamicPayload) -> Self {
        DynamicObject {
            type_name: type_name.into(),
            kind,
            flags: 0,
            payload,
        }
    }

    fn from_def(def: &TypeDef, payload: DynamicPayload) -> Self {
        DynamicObject {
            type_name: def.name.clone(),
            kind: def.kind,
            flags: def.flags & !def_flags::CUSTOM_HOOK,
            payload,
        }
    }

    /// A class instance with the given fields.
    pub fn with_fields<S: Into<String>>(type_name: S, fields: Vec<(String, Value)>) -> Self {
        Self::new(type_name, TypeKind::Class, DynamicPayload::Fields(fields))
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn payload(&self) -> &DynamicPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut DynamicPayload {
        &mut self.payload
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.payload {
            DynamicPayload::Fields(fields) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// The type definition this instance is written with.
    pub fn def(&self) -> TypeDef {
        let (flags, fields) = match &self.payload {
            DynamicPayload::Fields(fields) => (0, fields.iter().map(|(n, _)| n.clone()).collect()),
            DynamicPayload::Custom(_) => (def_flags::CUSTOM_HOOK, vec![]),
            _ => (0, vec![]),
        };
        TypeDef {
            name: self.type_name.clone(),
            kind: self.kind,
            flags: self.flags | flags,
            fields,
        }
    }

    fn write_payload(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        match &self.payload {
            DynamicPayload::Fields(fields) => {
                for (_, value) in fields {
                    value.weft_write(context)?;
                }
                Ok(())
            }
            DynamicPayload::Custom(bytes) => {
                context.writer.write_varuint32(bytes.len() as u32);
                context.writer.write_bytes(bytes);
                Ok(())
            }
            DynamicPayload::List(items) => {
                context.writer.write_varuint32(items.len() as u32);
                for item in items {
                    item.weft_write(context)?;
                }
                Ok(())
            }
            DynamicPayload::Array(items) => array::write_payload(items, context),
            DynamicPayload::Map(map) => map.write_payload(context),
            DynamicPayload::Boxed(value) => value.weft_write(context),
        }
    }
}

fn read_payload(context: &mut ReadContext<'_>, def: &TypeDef) -> Result<DynamicPayload, Error> {
    if def.has_custom_hook() {
        let len = context.read_length()?;
        return Ok(DynamicPayload::Custom(context.reader.read_bytes(len)?.to_vec()));
    }
    match def.kind {
        TypeKind::Value | TypeKind::Class => {
            let mut fields = Vec::with_capacity(def.fields.len());
            for name in &def.fields {
                fields.push((name.clone(), Value::weft_read(context)?));
            }
            Ok(DynamicPayload::Fields(fields))
        }
        TypeKind::List => {
            let len = context.read_length()?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(Value::weft_read(context)?);
            }
            Ok(DynamicPayload::List(items))
        }
        TypeKind::Array => array::read_payload(context).map(DynamicPayload::Array),
        TypeKind::Map => DynamicMap::read_payload(context).map(DynamicPayload::Map),
        TypeKind::Boxed => Ok(DynamicPayload::Boxed(Box::new(Value::weft_read(context)?))),
        kind => Err(Error::invalid_data(format!(
            "stream type `{}` of kind {:?} has no payload of its own",
            def.name, kind
        ))),
    }
}

impl Referent for DynamicObject {
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_dynamic_type_header(&self.def());
        self.write_payload(context)
    }

    /// Publishes a placeholder first, so back-references inside the payload
    /// resolve to the instance being read.
    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        let def = context.wire_def(wire)?;
        let rc = shared(DynamicObject::from_def(&def, DynamicPayload::Fields(vec![])));
        context.fill_ref(ref_id, &rc)?;
        let payload = read_payload(context, &def)?;
        borrow_target(&rc)?.payload = payload;
        Ok(rc)
    }

    fn read_referent_deferred(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        let def = context.wire_def(wire)?;
        if def.kind != TypeKind::Class || def.has_custom_hook() {
            return Err(Error::invalid_data(format!(
                "stream type `{}` cannot be read as a deferred instance",
                def.name
            )));
        }
        let rc = shared(DynamicObject::from_def(&def, DynamicPayload::Fields(vec![])));
        context.fill_ref(ref_id, &rc)?;
        let target = rc.clone();
        context.defer(Box::new(move |context: &mut ReadContext<'_>| {
            let payload = read_payload(context, &def)?;
            borrow_target(&target)?.payload = payload;
            Ok(())
        }));
        Ok(rc)
    }

    fn from_slot(slot: &RefSlot) -> Result<Ref<Self>, Error> {
        slot.downcast_or_err::<Self>("dynamic object")
    }

    fn referent_field_type() -> FieldType {
        FieldType::new("dynamic", TypeKind::Polymorphic)
    }

    fn referent_type_name(&self) -> Cow<'static, str> {
        Cow::Owned(self.type_name.clone())
    }

    fn splits_referent(&self) -> bool {
        self.kind == TypeKind::Class && matches!(self.payload, DynamicPayload::Fields(_))
    }

    fn write_referent_head(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_dynamic_type_header(&self.def());
        Ok(())
    }

    fn write_referent_body(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.write_payload(context)
    }
}

/// Map read without Rust types, comparer included.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMap {
    comparer: Box<Value>,
    entries: Vec<(Value, Value)>,
}

impl Default for DynamicMap {
    fn default() -> Self {
        DynamicMap {
            comparer: Box::new(Value::Null),
            entries: vec![],
        }
    }
}

impl DynamicMap {
    pub fn new(comparer: Value, entries: Vec<(Value, Value)>) -> Self {
        DynamicMap {
            comparer: Box::new(comparer),
            entries,
        }
    }

    /// `Value::Null` for plain maps.
    pub fn comparer(&self) -> &Value {
        &self.comparer
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// First entry whose key equals `key`, compared as values.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_payload(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.comparer.weft_write(context)?;
        context.writer.write_varuint32(self.entries.len() as u32);
        for (key, value) in &self.entries {
            key.weft_write(context)?;
            value.weft_write(context)?;
        }
        Ok(())
    }

    fn read_payload(context: &mut ReadContext<'_>) -> Result<Self, Error> {
        let comparer = Value::weft_read(context)?;
        let len = context.read_length()?;
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let key = Value::weft_read(context)?;
            let value = Value::weft_read(context)?;
            entries.push((key, value));
        }
        Ok(DynamicMap::new(comparer, entries))
    }
}

/// On-wire fields that had no local counterpart, in the order they were read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraData {
    entries: Vec<(String, Value)>,
}

impl ExtraData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, returning the value it replaced.
    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) -> Option<Value> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `other` in, later values replacing earlier ones of the same name.
    pub fn extend(&mut self, other: ExtraData) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }
}
