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
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

// Seconds since the unix epoch as varint64, then sub-second nanoseconds.
impl Serializer for NaiveDateTime {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        let dt = self.and_utc();
        context.write_tag(Tag::DateTime);
        context.writer.write_varint64(dt.timestamp());
        context.writer.write_varuint32(dt.timestamp_subsec_nanos());
        Ok(())
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::DateTime)?;
        let secs = context.reader.read_varint64()?;
        let nanos = context.reader.read_varuint32()?;
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| {
                Error::invalid_data(format!("timestamp {}s {}ns out of range", secs, nanos))
            })
    }

    fn weft_field_type() -> FieldType {
        FieldType::primitive("datetime")
    }
}

// Days from 0001-01-01 (day 1) as varint32.
impl Serializer for NaiveDate {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::Date);
        context.writer.write_varint32(chrono::Datelike::num_days_from_ce(self));
        Ok(())
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Date)?;
        let days = context.reader.read_varint32()?;
        NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or_else(|| Error::invalid_data(format!("day {} out of range", days)))
    }

    fn weft_field_type() -> FieldType {
        FieldType::primitive("date")
    }
}

impl Serializer for TimeDelta {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::Duration);
        context.writer.write_varint64(self.num_seconds());
        context.writer.write_varint32(self.subsec_nanos());
        Ok(())
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Duration)?;
        let secs = context.reader.read_varint64()?;
        let nanos = context.reader.read_varint32()?;
        if nanos.unsigned_abs() >= 1_000_000_000 {
            return Err(Error::invalid_data(format!(
                "duration nanoseconds {} out of range",
                nanos
            )));
        }
        TimeDelta::try_seconds(secs)
            .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos as i64)))
            .ok_or_else(|| Error::invalid_data(format!("duration {}s {}ns out of range", secs, nanos)))
    }

    fn weft_field_type() -> FieldType {
        FieldType::primitive("duration")
    }
}
