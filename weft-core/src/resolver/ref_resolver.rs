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
use crate::serializer::reference::{Object, Ref};
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

/// Write-side reference table.
///
/// Maps the address of every shared instance written so far to the id it was
/// given. Ids start at 1 and follow the order in which instances are first
/// written, which is the order the reader reserves them in.
///
/// ```rust
/// use weft_core::resolver::ref_resolver::RefWriter;
///
/// let mut refs = RefWriter::new();
/// assert_eq!(refs.id_for(0x1000), (1, true));
/// assert_eq!(refs.id_for(0x2000), (2, true));
/// assert_eq!(refs.id_for(0x1000), (1, false));
/// ```
#[derive(Default)]
pub struct RefWriter {
    refs: HashMap<usize, u32>,
    next_ref_id: u32,
}

impl RefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the instance at `addr` and whether this is its first
    /// occurrence.
    pub fn id_for(&mut self, addr: usize) -> (u32, bool) {
        if let Some(&ref_id) = self.refs.get(&addr) {
            return (ref_id, false);
        }
        self.next_ref_id += 1;
        self.refs.insert(addr, self.next_ref_id);
        (self.next_ref_id, true)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn clear(&mut self) {
        self.refs.clear();
        self.next_ref_id = 0;
    }
}

/// One materialized shared instance, viewable both as its concrete type and
/// as `dyn Object`.
#[derive(Clone)]
pub struct RefSlot {
    instance: Rc<dyn Any>,
    object: Ref<dyn Object>,
    type_name: Cow<'static, str>,
}

impl RefSlot {
    pub fn new<T: Object>(rc: Ref<T>) -> RefSlot {
        let type_name = rc
            .try_borrow()
            .map(|v| v.weft_type_name())
            .unwrap_or(Cow::Borrowed(std::any::type_name::<T>()));
        let instance: Rc<dyn Any> = rc.clone();
        RefSlot {
            instance,
            object: rc,
            type_name,
        }
    }

    /// The instance as `Ref<T>`, if that is its concrete type.
    pub fn downcast<T: Object>(&self) -> Option<Ref<T>> {
        self.instance.clone().downcast::<std::cell::RefCell<T>>().ok()
    }

    pub fn downcast_or_err<T: Object>(&self, expected: &str) -> Result<Ref<T>, Error> {
        self.downcast::<T>().ok_or_else(|| {
            Error::type_error(format!(
                "shared instance of `{}` cannot be used as `{}`",
                self.type_name, expected
            ))
        })
    }

    pub fn object(&self) -> Ref<dyn Object> {
        self.object.clone()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Read-side reference table: an arena of slots indexed by reference id.
///
/// A slot is reserved when its `REF_VALUE` tag is read and filled as soon as
/// the instance is allocated, before any of its fields, so back-references
/// from inside the instance resolve to it.
#[derive(Default)]
pub struct RefReader {
    slots: Vec<Option<RefSlot>>,
}

impl RefReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next reference id.
    pub fn reserve(&mut self) -> u32 {
        self.slots.push(None);
        self.slots.len() as u32
    }

    pub fn fill(&mut self, ref_id: u32, slot: RefSlot) -> Result<(), Error> {
        match self.slots.get_mut((ref_id as usize).wrapping_sub(1)) {
            Some(entry) => {
                *entry = Some(slot);
                Ok(())
            }
            None => Err(Error::invalid_ref(format!(
                "reference id {} was never reserved",
                ref_id
            ))),
        }
    }

    pub fn resolve(&self, ref_id: u32) -> Result<&RefSlot, Error> {
        match self.slots.get((ref_id as usize).wrapping_sub(1)) {
            Some(Some(slot)) => Ok(slot),
            Some(None) => Err(Error::invalid_ref(format!(
                "reference id {} is not materialized yet",
                ref_id
            ))),
            None => Err(Error::invalid_ref(format!(
                "reference id {} out of range, {} instances read",
                ref_id,
                self.slots.len()
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
