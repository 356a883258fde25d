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
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::serializer::expect_tag;
use crate::types::{SerializeStrategy, Tag, TypeKind};

/// Enum types serialized by discriminant, see [`impl_enum!`](crate::impl_enum).
pub trait EnumType: WeftType + Copy {
    const WEFT_NAME: &'static str;

    fn weft_to_i64(self) -> i64;

    fn weft_from_i64(raw: i64) -> Result<Self, Error>;
}

pub fn type_info<T: EnumType>() -> TypeInfo {
    TypeInfo::new::<T>(TypeDescriptor::new(
        T::WEFT_NAME,
        TypeKind::Enum,
        SerializeStrategy::Builtin,
    ))
}

pub fn field_type<T: EnumType>() -> FieldType {
    FieldType::new(T::WEFT_NAME, TypeKind::Enum).with_discovery(discover::<T>)
}

#[inline]
pub fn write<T: EnumType>(value: T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_tag(Tag::Enum);
    context.write_type_header::<T>()?;
    context.writer.write_varint64(value.weft_to_i64());
    Ok(())
}

#[inline]
pub fn read<T: EnumType>(tag: Tag, context: &mut ReadContext<'_>) -> Result<T, Error> {
    expect_tag(tag, Tag::Enum)?;
    let wire = context.read_type_header()?;
    context.expect_type::<T>(wire)?;
    T::weft_from_i64(context.reader.read_varint64()?)
}

/// Decodes a discriminant through the enum's primitive representation.
pub fn decode<E, R>(raw: i64, name: &str) -> Result<E, Error>
where
    R: TryFrom<i64>,
    E: TryFrom<R>,
{
    R::try_from(raw)
        .ok()
        .and_then(|repr| E::try_from(repr).ok())
        .ok_or_else(|| Error::unknown_enum(format!("{} is not a variant of `{}`", raw, name)))
}

/// Serializes a fieldless enum by its discriminant.
///
/// The enum converts to and from its representation, usually through
/// `num_enum`'s `IntoPrimitive` and `TryFromPrimitive` derives.
///
/// ```rust
/// use num_enum::{IntoPrimitive, TryFromPrimitive};
/// use weft_core::{impl_enum, Weft};
///
/// #[derive(Clone, Copy, Debug, PartialEq, IntoPrimitive, TryFromPrimitive)]
/// #[repr(i32)]
/// enum Level {
///     Low = 1,
///     High = 9,
/// }
/// impl_enum!(Level("demo.Level"): i32);
///
/// let weft = Weft::default();
/// let bytes = weft.serialize(&Level::High).unwrap();
/// assert_eq!(weft.deserialize::<Level>(&bytes).unwrap(), Level::High);
/// ```
#[macro_export]
macro_rules! impl_enum {
    ($ty:ident ($name:literal) : $repr:ty) => {
        impl $crate::serializer::enum_::EnumType for $ty {
            const WEFT_NAME: &'static str = $name;

            fn weft_to_i64(self) -> i64 {
                let repr: $repr = self.into();
                repr as i64
            }

            fn weft_from_i64(raw: i64) -> Result<Self, $crate::error::Error> {
                $crate::serializer::enum_::decode::<$ty, $repr>(raw, $name)
            }
        }

        impl $crate::resolver::type_resolver::WeftType for $ty {
            fn weft_type_info() -> $crate::resolver::type_resolver::TypeInfo {
                $crate::serializer::enum_::type_info::<$ty>()
            }
        }

        impl $crate::serializer::Serializer for $ty {
            fn weft_write(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::enum_::write(*self, context)
            }

            fn weft_read_tagged(
                tag: $crate::types::Tag,
                context: &mut $crate::resolver::context::ReadContext<'_>,
            ) -> Result<Self, $crate::error::Error> {
                $crate::serializer::enum_::read::<$ty>(tag, context)
            }

            fn weft_field_type() -> $crate::meta::FieldType {
                $crate::serializer::enum_::field_type::<$ty>()
            }
        }
    };
}
