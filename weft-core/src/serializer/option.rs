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
use crate::serializer::Serializer;
use crate::types::Tag;

impl<T: Serializer> Serializer for Option<T> {
    #[inline]
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        match self {
            Some(v) => v.weft_write(context),
            None => {
                context.write_tag(Tag::Null);
                Ok(())
            }
        }
    }

    #[inline]
    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        if tag == Tag::Null {
            return Ok(None);
        }
        T::weft_read_tagged(tag, context).map(Some)
    }

    fn weft_field_type() -> FieldType {
        T::weft_field_type().into_nullable()
    }
}

// Boxes are transparent on the wire.
impl<T: Serializer> Serializer for Box<T> {
    #[inline]
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        T::weft_write(self, context)
    }

    #[inline]
    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        T::weft_read_tagged(tag, context).map(Box::new)
    }

    fn weft_field_type() -> FieldType {
        T::weft_field_type()
    }
}
