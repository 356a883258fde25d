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
use crate::meta::FieldType;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::types::Tag;

pub mod array;
pub mod custom;
mod datetime;
mod decimal;
pub mod dictionary;
pub mod enum_;
mod list;
mod map;
mod number;
pub mod object;
mod option;
pub mod reference;
mod string;
pub mod value;

/// A value that can travel through the write and read pipelines.
///
/// Every value on the wire starts with a one-byte [`Tag`]. Primitives follow
/// it with their payload directly; named types follow it with a type header.
/// Reference types held through [`Ref`](reference::Ref) go through
/// [`WriteContext::write_shared`] instead and are never written inline.
pub trait Serializer: Sized + 'static {
    /// Writes the tag and payload of this value.
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;

    /// Entry point of the read pipeline: reads the tag, then the payload.
    fn weft_read(context: &mut ReadContext<'_>) -> Result<Self, Error> {
        let tag = context.read_tag()?;
        Self::weft_read_tagged(tag, context)
    }

    /// Reads the payload after `tag` was consumed.
    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error>;

    /// Declared type of a field or element of this type.
    fn weft_field_type() -> FieldType;
}

#[inline(always)]
pub fn expect_tag(actual: Tag, expected: Tag) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::type_mismatch(format!(
            "expected {:?}, found {:?}",
            expected, actual
        )));
    }
    Ok(())
}
