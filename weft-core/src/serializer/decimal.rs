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
use crate::serializer::{expect_tag, Serializer};
use crate::types::Tag;
use rust_decimal::Decimal;

const DECIMAL_BYTES: usize = 16;

impl Serializer for Decimal {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::Decimal);
        context.writer.write_bytes(&self.serialize());
        Ok(())
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Decimal)?;
        let bytes = context.reader.read_bytes(DECIMAL_BYTES)?;
        let mut raw = [0u8; DECIMAL_BYTES];
        raw.copy_from_slice(bytes);
        // scale lives in bits 16..24 of the flags word
        if raw[2] > 28 {
            return Err(Error::invalid_data(format!("decimal scale {} exceeds 28", raw[2])));
        }
        Ok(Decimal::deserialize(raw))
    }

    fn weft_field_type() -> FieldType {
        FieldType::primitive("decimal")
    }
}
