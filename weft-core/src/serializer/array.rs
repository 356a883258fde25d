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

//! Rank-N rectangular arrays.
//!
//! An [`MdArray`] stores its elements in row-major order next to its
//! dimensions. On the wire the payload is the rank, every dimension, then the
//! elements, so a reader learns the full shape before allocating anything.

use crate::error::Error;
use crate::meta::{FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefSlot;
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::serializer::reference::{borrow_target, read_slot, shared, Ref, Referent};
use crate::serializer::{expect_tag, Serializer};
use crate::types::{Tag, TypeKind};
use std::borrow::Cow;

pub const MAX_RANK: usize = 32;

fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MdArray<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

impl<T> MdArray<T> {
    /// Wraps row-major `data` with the given dimensions.
    pub fn new(dims: Vec<usize>, data: Vec<T>) -> Result<Self, Error> {
        check_rank(dims.len())?;
        match element_count(&dims) {
            Some(count) if count == data.len() => Ok(MdArray { dims, data }),
            _ => Err(Error::invalid_data(format!(
                "dimensions {:?} do not describe {} elements",
                dims,
                data.len()
            ))),
        }
    }

    /// Builds an array by calling `f` with the index of every element, in
    /// row-major order.
    pub fn from_fn<F: FnMut(&[usize]) -> T>(dims: Vec<usize>, mut f: F) -> Result<Self, Error> {
        check_rank(dims.len())?;
        let count = element_count(&dims)
            .ok_or_else(|| Error::invalid_data(format!("dimensions {:?} overflow", dims)))?;
        let mut data = Vec::with_capacity(count);
        let mut index = vec![0usize; dims.len()];
        for _ in 0..count {
            data.push(f(&index));
            for axis in (0..dims.len()).rev() {
                index[axis] += 1;
                if index[axis] < dims[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(MdArray { dims, data })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &d) in index.iter().zip(&self.dims) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset(index).map(|o| &self.data[o])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        self.offset(index).map(move |o| &mut self.data[o])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

fn check_rank(rank: usize) -> Result<(), Error> {
    if rank == 0 || rank > MAX_RANK {
        return Err(Error::invalid_data(format!(
            "array rank {} outside 1..={}",
            rank, MAX_RANK
        )));
    }
    Ok(())
}

pub(crate) fn write_payload<T: Serializer>(array: &MdArray<T>, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.writer.write_varuint32(array.dims.len() as u32);
    for &d in &array.dims {
        context.writer.write_varuint64(d as u64);
    }
    for item in &array.data {
        item.weft_write(context)?;
    }
    Ok(())
}

/// Reads rank and dimensions and returns them with the element count,
/// checked against the remaining input.
fn read_shape(context: &mut ReadContext<'_>) -> Result<(Vec<usize>, usize), Error> {
    let rank = context.reader.read_varuint32()? as usize;
    check_rank(rank)?;
    let mut dims = Vec::with_capacity(rank);
    for _ in 0..rank {
        let d = context.reader.read_varuint64()?;
        dims.push(usize::try_from(d).map_err(|_| {
            Error::invalid_data(format!("array dimension {} too large", d))
        })?);
    }
    let count = element_count(&dims)
        .filter(|&c| c <= context.reader.remaining())
        .ok_or_else(|| {
            Error::invalid_data(format!(
                "array of dimensions {:?} does not fit the remaining {} bytes",
                dims,
                context.reader.remaining()
            ))
        })?;
    Ok((dims, count))
}

pub(crate) fn read_payload<T: Serializer>(context: &mut ReadContext<'_>) -> Result<MdArray<T>, Error> {
    let (dims, count) = read_shape(context)?;
    let mut data = Vec::with_capacity(count);
    for _ in 0..count {
        data.push(T::weft_read(context)?);
    }
    Ok(MdArray { dims, data })
}

pub(crate) fn write_array<T: Serializer>(array: &MdArray<T>, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_tag(Tag::Array);
    write_payload(array, context)
}

impl<T: Serializer> Serializer for MdArray<T> {
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        write_array(self, context)
    }

    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        expect_tag(tag, Tag::Array)?;
        read_payload(context)
    }

    fn weft_field_type() -> FieldType {
        FieldType::array(T::weft_field_type()).with_discovery(discover::<MdArray<T>>)
    }
}

impl<T: Serializer> WeftType for MdArray<T> {
    fn weft_type_info() -> TypeInfo {
        TypeInfo::new::<Self>(TypeDescriptor::builtin(
            &Self::weft_field_type(),
            TypeKind::Array,
        ))
        .with_harness(read_slot::<Self>)
    }
}

impl<T: Serializer> Referent for MdArray<T> {
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_type_header::<Self>()?;
        write_payload(self, context)
    }

    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        context.expect_type::<Self>(wire)?;
        let (dims, count) = read_shape(context)?;
        let rc = shared(MdArray {
            dims,
            data: Vec::with_capacity(count),
        });
        context.fill_ref(ref_id, &rc)?;
        for _ in 0..count {
            let item = T::weft_read(context)?;
            borrow_target(&rc)?.data.push(item);
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
