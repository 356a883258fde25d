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

//! Types that serialize themselves.
//!
//! A custom type writes its own bytes through
//! [`CustomSerialize::weft_write_self`]. The engine frames them with a length
//! and flags the type definition, so a reader that cannot run the hook can
//! still step over the payload. Hooks receive the engine and may serialize
//! nested values with it; every such call is an independent stream with its
//! own reference table.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::meta::{FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::serializer::reference::{shared, Ref, Referent};
use crate::serializer::expect_tag;
use crate::types::{SerializeStrategy, Tag, TypeKind};
use crate::weft::Weft;

pub trait CustomSerialize: Sized + 'static {
    fn weft_write_self(&self, weft: &Weft, sink: &mut Writer) -> Result<(), Error>;

    fn weft_read_self(weft: &Weft, source: &mut Reader<'_>) -> Result<Self, Error>;
}

/// Name and kind of a custom type, generated by [`impl_custom!`](crate::impl_custom).
pub trait CustomType: CustomSerialize + WeftType {
    const WEFT_NAME: &'static str;
    const WEFT_KIND: TypeKind;
}

pub fn type_info<T: CustomType>() -> TypeInfo {
    TypeInfo::new::<T>(TypeDescriptor::new(
        T::WEFT_NAME,
        T::WEFT_KIND,
        SerializeStrategy::Custom,
    ))
}

pub fn field_type<T: CustomType>() -> FieldType {
    FieldType::new(T::WEFT_NAME, T::WEFT_KIND).with_discovery(discover::<T>)
}

fn write_payload<T: CustomType>(value: &T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    let mut sink = Writer::default();
    value.weft_write_self(context.get_weft(), &mut sink)?;
    context.writer.write_varuint32(sink.len() as u32);
    context.writer.write_bytes(sink.as_slice());
    Ok(())
}

fn read_payload<T: CustomType>(context: &mut ReadContext<'_>, wire: usize) -> Result<T, Error> {
    context.expect_type::<T>(wire)?;
    let len = context.read_length()?;
    let bytes = context.reader.read_bytes(len)?;
    let mut source = Reader::new(bytes);
    let value = T::weft_read_self(context.get_weft(), &mut source)?;
    if !source.is_at_end() {
        return Err(Error::invalid_data(format!(
            "custom payload of `{}` has {} unread byte(s)",
            T::WEFT_NAME,
            source.remaining()
        )));
    }
    Ok(value)
}

pub fn write_inline<T: CustomType>(value: &T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_tag(Tag::Struct);
    context.write_type_header::<T>()?;
    write_payload(value, context)
}

pub fn read_inline<T: CustomType>(tag: Tag, context: &mut ReadContext<'_>) -> Result<T, Error> {
    expect_tag(tag, Tag::Struct)?;
    let wire = context.read_type_header()?;
    read_payload(context, wire)
}

pub fn write_referent<T: CustomType>(value: &T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_type_header::<T>()?;
    write_payload(value, context)
}

/// The payload is opaque to the engine, so it is read in full before the
/// instance exists.
pub fn read_referent<T: CustomType + Referent>(
    context: &mut ReadContext<'_>,
    wire: usize,
    ref_id: Option<u32>,
) -> Result<Ref<T>, Error> {
    let rc = shared(read_payload::<T>(context, wire)?);
    context.fill_ref(ref_id, &rc)?;
    Ok(rc)
}

/// Wires a [`CustomSerialize`] implementation into the pipelines.
///
/// ```rust
/// use weft_core::buffer::{Reader, Writer};
/// use weft_core::error::Error;
/// use weft_core::serializer::custom::CustomSerialize;
/// use weft_core::{impl_custom, Weft};
///
/// #[derive(Debug, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// impl CustomSerialize for Rgb {
///     fn weft_write_self(&self, _: &Weft, sink: &mut Writer) -> Result<(), Error> {
///         sink.write_bytes(&[self.0, self.1, self.2]);
///         Ok(())
///     }
///
///     fn weft_read_self(_: &Weft, source: &mut Reader<'_>) -> Result<Self, Error> {
///         Ok(Rgb(source.read_u8()?, source.read_u8()?, source.read_u8()?))
///     }
/// }
/// impl_custom!(value Rgb("demo.Rgb"));
///
/// let weft = Weft::default();
/// let bytes = weft.serialize(&Rgb(1, 2, 3)).unwrap();
/// assert_eq!(weft.deserialize::<Rgb>(&bytes).unwrap(), Rgb(1, 2, 3));
/// ```
#[macro_export]
macro_rules! impl_custom {
    (@common $ty:ident, $name:literal, $kind:ident) => {
        impl $crate::serializer::custom::CustomType for $ty {
            const WEFT_NAME: &'static str = $name;
            const WEFT_KIND: $crate::types::TypeKind = $crate::types::TypeKind::$kind;
        }

        impl $crate::serializer::Serializer for $ty {
            fn weft_write(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::custom::write_inline(self, context)
            }

            fn weft_read_tagged(
                tag: $crate::types::Tag,
                context: &mut $crate::resolver::context::ReadContext<'_>,
            ) -> Result<Self, $crate::error::Error> {
                $crate::serializer::custom::read_inline::<$ty>(tag, context)
            }

            fn weft_field_type() -> $crate::meta::FieldType {
                $crate::serializer::custom::field_type::<$ty>()
            }
        }
    };
    (value $ty:ident ($name:literal)) => {
        $crate::impl_custom!(@common $ty, $name, Value);

        impl $crate::resolver::type_resolver::WeftType for $ty {
            fn weft_type_info() -> $crate::resolver::type_resolver::TypeInfo {
                $crate::serializer::custom::type_info::<$ty>()
            }
        }
    };
    (class $ty:ident ($name:literal)) => {
        $crate::impl_custom!(@common $ty, $name, Class);

        impl $crate::resolver::type_resolver::WeftType for $ty {
            fn weft_type_info() -> $crate::resolver::type_resolver::TypeInfo {
                $crate::serializer::custom::type_info::<$ty>()
                    .with_harness($crate::serializer::reference::read_slot::<$ty>)
            }
        }

        impl $crate::serializer::reference::Referent for $ty {
            fn write_referent(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::custom::write_referent(self, context)
            }

            fn read_referent(
                context: &mut $crate::resolver::context::ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                $crate::serializer::custom::read_referent::<$ty>(context, wire, ref_id)
            }

            fn from_slot(
                slot: &$crate::resolver::ref_resolver::RefSlot,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                slot.downcast_or_err::<$ty>($name)
            }

            fn referent_field_type() -> $crate::meta::FieldType {
                $crate::serializer::custom::field_type::<$ty>()
            }

            fn referent_type_name(&self) -> std::borrow::Cow<'static, str> {
                std::borrow::Cow::Borrowed($name)
            }
        }
    };
}
