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
use crate::error::Error;
use crate::meta::FieldType;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{expect_tag, Serializer};
use crate::types::Tag;

#[inline(always)]
fn narrow<S, T>(value: S, name: &'static str) -> Result<T, Error>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value)
        .map_err(|_| Error::invalid_data(format!("{} does not fit in {}", value, name)))
}

macro_rules! impl_num_serializer {
    ($ty:ty, $tag:ident, $name:literal, $writer:expr, $reader:expr) => {
        impl Serializer for $ty {
            #[inline(always)]
            fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
                context.write_tag(Tag::$tag);
                $writer(&mut *context.writer, *self);
                Ok(())
            }

            #[inline(always)]
            fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
                expect_tag(tag, Tag::$tag)?;
                $reader(&mut context.reader)
            }

            fn weft_field_type() -> FieldType {
                FieldType::primitive($name)
            }
        }
    };
}

impl_num_serializer!(bool, Bool, "bool", Writer::write_bool, Reader::read_bool);
impl_num_serializer!(i8, I8, "i8", Writer::write_i8, Reader::read_i8);
impl_num_serializer!(u8, U8, "u8", Writer::write_u8, Reader::read_u8);
impl_num_serializer!(
    i16,
    I16,
    "i16",
    |w: &mut Writer, v: i16| w.write_varint32(v as i32),
    |r: &mut Reader| -> Result<i16, Error> { narrow(r.read_varint32()?, "i16") }
);
impl_num_serializer!(
    u16,
    U16,
    "u16",
    |w: &mut Writer, v: u16| w.write_varuint32(v as u32),
    |r: &mut Reader| -> Result<u16, Error> { narrow(r.read_varuint32()?, "u16") }
);
impl_num_serializer!(i32, I32, "i32", Writer::write_varint32, Reader::read_varint32);
impl_num_serializer!(u32, U32, "u32", Writer::write_varuint32, Reader::read_varuint32);
impl_num_serializer!(i64, I64, "i64", Writer::write_varint64, Reader::read_varint64);
impl_num_serializer!(u64, U64, "u64", Writer::write_varuint64, Reader::read_varuint64);
impl_num_serializer!(
    isize,
    I64,
    "i64",
    |w: &mut Writer, v: isize| w.write_varint64(v as i64),
    |r: &mut Reader| -> Result<isize, Error> { narrow(r.read_varint64()?, "isize") }
);
impl_num_serializer!(
    usize,
    U64,
    "u64",
    |w: &mut Writer, v: usize| w.write_varuint64(v as u64),
    |r: &mut Reader| -> Result<usize, Error> { narrow(r.read_varuint64()?, "usize") }
);
impl_num_serializer!(f32, F32, "f32", Writer::write_f32, Reader::read_f32);
impl_num_serializer!(f64, F64, "f64", Writer::write_f64, Reader::read_f64);

impl Serializer for char {
    #[inline(always)]
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::Char);
        context.writer.write_varuint32(*self as u32);
        Ok(())
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Char)?;
        let code = context.reader.read_varuint32()?;
        char::from_u32(code)
            .ok_or_else(|| Error::invalid_data(format!("{:#x} is not a unicode scalar value", code)))
    }

    fn weft_field_type() -> FieldType {
        FieldType::primitive("char")
    }
}
