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
use crate::serializer::{expect_tag, Serializer};
use crate::types::{Tag, TypeKind};
use std::borrow::Cow;

fn write_elements<T: Serializer>(items: &[T], context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.writer.write_varuint32(items.len() as u32);
    for item in items {
        item.weft_write(context)?;
    }
    Ok(())
}

impl<T: Serializer> Serializer for Vec<T> {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_tag(Tag::List);
        write_elements(self, context)
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::List)?;
        let len = context.read_length()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::weft_read(context)?);
        }
        Ok(items)
    }

    fn weft_field_type() -> FieldType {
        FieldType::list(T::weft_field_type()).with_discovery(discover::<Vec<T>>)
    }
}

impl<T: Serializer> WeftType for Vec<T> {
    fn weft_type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeDescriptor::builtin(
            &Self::weft_field_type(),
            TypeKind::List,
        ))
        .with_harness(read_slot::<Self>)
    }
}

impl<T: Serializer> Referent for Vec<T> {
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_type_header::<Self>()?;
        write_elements(self, context)
    }

    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        context.expect_type::<Self>(wire)?;
        let len = context.read_length()?;
        let rc = shared(Vec::with_capacity(len));
        context.fill_ref(ref_id, &rc)?;
        for _ in 0..len {
            let item = T::weft_read(context)?;
            borrow_target(&rc)?.push(item);
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
