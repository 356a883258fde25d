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

use super::ref_resolver::{RefReader, RefSlot, RefWriter};
use super::type_resolver::{TypeInfo, WeftType};
use super::version::{FieldPlan, VersionStrategy};
use crate::buffer::{Reader, Writer};
use crate::config::Config;
use crate::error::Error;
use crate::meta::TypeDef;
use crate::serializer::object::ObjectType;
use crate::serializer::reference::{Object, Ref, Referent};
use crate::types::{head_flags, Tag, TypeKind, FORMAT_VERSION};
use crate::weft::Weft;
use std::any::TypeId;
use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Hash, PartialEq, Eq)]
enum TypeKey {
    Rust(TypeId),
    Dynamic(String),
}

type WriteJob = Box<dyn FnOnce(&mut WriteContext<'_>) -> Result<(), Error>>;

/// Population of a deferred instance, run once the root value is read.
pub type ReadJob = Box<dyn FnOnce(&mut ReadContext<'_>) -> Result<(), Error>>;

fn dynamic_key(def: &TypeDef) -> String {
    format!(
        "{}\u{0}{}\u{0}{}\u{0}{}",
        def.name,
        u8::from(def.kind),
        def.flags,
        def.fields.join("\u{0}")
    )
}

/// State of one serialize call.
///
/// Holds the write-side reference table, the stream-local type indices and
/// the nesting depth. Created fresh for every root value and dropped with it.
pub struct WriteContext<'a> {
    pub writer: &'a mut Writer,
    weft: &'a Weft,
    ref_writer: RefWriter,
    type_indices: HashMap<TypeKey, u32>,
    // shared instances on the current path when tracking is off
    active: Vec<(usize, Cow<'static, str>)>,
    deferred: VecDeque<WriteJob>,
    // > 0 while writing values the reader needs complete before the root ends
    pinned: u32,
    depth: u32,
}

impl<'a> WriteContext<'a> {
    pub fn new(weft: &'a Weft, writer: &'a mut Writer) -> WriteContext<'a> {
        WriteContext {
            writer,
            weft,
            ref_writer: RefWriter::new(),
            type_indices: HashMap::new(),
            active: vec![],
            deferred: VecDeque::new(),
            pinned: 0,
            depth: 0,
        }
    }

    pub fn get_weft(&self) -> &'a Weft {
        self.weft
    }

    /// Runs `write` with deferral off, for values such as dictionary keys
    /// that the reader uses as soon as they are read.
    pub fn write_in_place<F>(&mut self, write: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        self.pinned += 1;
        let result = write(self);
        self.pinned -= 1;
        result
    }

    pub fn config(&self) -> &'a Config {
        self.weft.config()
    }

    /// Writes the head byte and, when types were batch registered, the type
    /// table that pre-assigns their stream indices.
    pub(crate) fn write_head(&mut self) {
        let table = self.weft.resolver().batch_table();
        let mut flags = 0;
        if table.is_some() {
            flags |= head_flags::HAS_TYPE_TABLE;
        }
        if self.config().is_track_ref() {
            flags |= head_flags::TRACK_REF;
        }
        self.writer.write_u8((FORMAT_VERSION << 4) | flags);
        if let Some(table) = table {
            for (index, rust_type) in table.rust_types().iter().enumerate() {
                self.type_indices
                    .insert(TypeKey::Rust(*rust_type), index as u32);
            }
            self.writer.write_bytes(table.bytes());
        }
    }

    #[inline(always)]
    pub fn write_tag(&mut self, tag: Tag) {
        self.writer.write_u8(tag.into());
    }

    /// Writes the header of `T`: its stream index, followed by its definition
    /// the first time `T` appears in this stream.
    pub fn write_type_header<T: WeftType>(&mut self) -> Result<(), Error> {
        let key = TypeKey::Rust(TypeId::of::<T>());
        if let Some(&index) = self.type_indices.get(&key) {
            self.writer.write_varuint32(index << 1);
            return Ok(());
        }
        let info = self.weft.resolver().resolve::<T>()?;
        let index = self.type_indices.len() as u32;
        self.type_indices.insert(key, index);
        self.writer.write_varuint32((index << 1) | 1);
        self.writer.write_bytes(info.def_bytes());
        Ok(())
    }

    /// Header for a type known only by its definition, as carried by
    /// dynamic values.
    pub fn write_dynamic_type_header(&mut self, def: &TypeDef) {
        let key = TypeKey::Dynamic(dynamic_key(def));
        if let Some(&index) = self.type_indices.get(&key) {
            self.writer.write_varuint32(index << 1);
            return;
        }
        let index = self.type_indices.len() as u32;
        self.type_indices.insert(key, index);
        self.writer.write_varuint32((index << 1) | 1);
        def.write(self.writer);
    }

    /// Writes a shared instance: a back-reference if it was written before,
    /// otherwise a reference tag, its type header and its payload. A new
    /// class instance at `defer_depth` or deeper gets only its header here,
    /// and its fields are written once the root value is done.
    pub fn write_shared<T: ?Sized + Referent>(&mut self, value: &Ref<T>) -> Result<(), Error> {
        let addr = Rc::as_ptr(value) as *const () as usize;
        if self.config().is_track_ref() {
            let (ref_id, is_new) = self.ref_writer.id_for(addr);
            if !is_new {
                self.write_tag(Tag::Ref);
                self.writer.write_varuint32(ref_id);
                return Ok(());
            }
            let guard = borrow_for_write(value)?;
            if self.pinned == 0
                && self.depth >= self.config().defer_depth()
                && guard.splits_referent()
            {
                self.write_tag(Tag::RefDeferred);
                guard.write_referent_head(self)?;
                let value = value.clone();
                self.deferred.push_back(Box::new(move |context: &mut WriteContext<'_>| {
                    let guard = borrow_for_write(&value)?;
                    guard.write_referent_body(context)
                }));
                return Ok(());
            }
            self.write_tag(Tag::RefValue);
            self.enter()?;
            guard.write_referent(self)?;
            self.leave();
            return Ok(());
        }

        let guard = borrow_for_write(value)?;
        let type_name = guard.referent_type_name();
        if let Some(pos) = self.active.iter().position(|(a, _)| *a == addr) {
            let mut chain: Vec<&str> = self.active[pos..].iter().map(|(_, n)| n.as_ref()).collect();
            chain.push(&type_name);
            return Err(Error::reference_cycle(format!(
                "instance of `{}` contains itself while reference tracking is off: {}",
                type_name,
                chain.join(" -> ")
            )));
        }
        self.write_tag(Tag::NotNullValue);
        self.active.push((addr, type_name));
        self.enter()?;
        guard.write_referent(self)?;
        self.leave();
        self.active.pop();
        Ok(())
    }

    /// Writes the bodies of deferred instances in the order their headers
    /// were written, including those deferred along the way.
    pub(crate) fn write_deferred(&mut self) -> Result<(), Error> {
        while let Some(job) = self.deferred.pop_front() {
            job(&mut *self)?;
        }
        Ok(())
    }

    /// Counts one level of nesting, failing past `max_depth`.
    pub fn enter(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.config().max_depth() {
            return Err(Error::depth_exceed(format!(
                "nesting depth exceeds the maximum of {} while writing",
                self.config().max_depth()
            )));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

fn borrow_for_write<T: ?Sized>(value: &Ref<T>) -> Result<std::cell::Ref<'_, T>, Error> {
    value.try_borrow().map_err(|_| {
        Error::not_allowed("cannot serialize a shared instance while it is mutably borrowed")
    })
}

/// State of one deserialize call.
///
/// Holds the read-side reference arena, the type definitions seen so far in
/// the stream, their resolved local names and field plans, and the optional
/// version strategy supplied by the caller.
pub struct ReadContext<'a> {
    pub reader: Reader<'a>,
    weft: &'a Weft,
    strategy: Option<&'a dyn VersionStrategy>,
    ref_reader: RefReader,
    wire_types: Vec<Rc<TypeDef>>,
    targets: Vec<Option<Rc<str>>>,
    plans: HashMap<(usize, TypeId), Rc<FieldPlan>>,
    deferred: VecDeque<ReadJob>,
    depth: u32,
}

impl<'a> ReadContext<'a> {
    pub fn new(
        weft: &'a Weft,
        reader: Reader<'a>,
        strategy: Option<&'a dyn VersionStrategy>,
    ) -> ReadContext<'a> {
        ReadContext {
            reader,
            weft,
            strategy,
            ref_reader: RefReader::new(),
            wire_types: vec![],
            targets: vec![],
            plans: HashMap::new(),
            deferred: VecDeque::new(),
            depth: 0,
        }
    }

    pub fn get_weft(&self) -> &'a Weft {
        self.weft
    }

    pub fn strategy(&self) -> Option<&'a dyn VersionStrategy> {
        self.strategy
    }

    pub(crate) fn read_head(&mut self) -> Result<(), Error> {
        let head = self.reader.read_u8()?;
        if head >> 4 != FORMAT_VERSION {
            return Err(Error::invalid_data(format!(
                "unsupported format version {} in head byte {:#04x}",
                head >> 4,
                head
            )));
        }
        if head & head_flags::HAS_TYPE_TABLE != 0 {
            let count = self.reader.read_varuint32()? as usize;
            if count > self.reader.remaining() {
                return Err(Error::invalid_data(format!(
                    "type table declares {} types",
                    count
                )));
            }
            for _ in 0..count {
                let def = TypeDef::read(&mut self.reader)?;
                self.push_def(def);
            }
        }
        Ok(())
    }

    fn push_def(&mut self, def: TypeDef) {
        self.wire_types.push(Rc::new(def));
        self.targets.push(None);
    }

    pub fn read_tag(&mut self) -> Result<Tag, Error> {
        let b = self.reader.read_u8()?;
        Tag::try_from(b).map_err(|_| {
            Error::invalid_data(format!(
                "unknown value tag {} at offset {}",
                b,
                self.reader.cursor() - 1
            ))
        })
    }

    /// Reads a type header and returns the stream-local index of its type.
    pub fn read_type_header(&mut self) -> Result<usize, Error> {
        let header = self.reader.read_varuint32()?;
        let index = (header >> 1) as usize;
        if header & 1 == 1 {
            if index != self.wire_types.len() {
                return Err(Error::invalid_data(format!(
                    "type definition #{} out of order, expected #{}",
                    index,
                    self.wire_types.len()
                )));
            }
            let def = TypeDef::read(&mut self.reader)?;
            log::trace!("stream type #{} is `{}`", index, def.name);
            self.push_def(def);
        } else if index >= self.wire_types.len() {
            return Err(Error::invalid_data(format!(
                "reference to undefined stream type #{}",
                index
            )));
        }
        Ok(index)
    }

    pub fn wire_def(&self, wire: usize) -> Result<Rc<TypeDef>, Error> {
        self.wire_types
            .get(wire)
            .cloned()
            .ok_or_else(|| Error::invalid_data(format!("undefined stream type #{}", wire)))
    }

    /// Local type name of a stream type after the strategy's Resolve step.
    pub fn target_name(&mut self, wire: usize) -> Result<Rc<str>, Error> {
        if let Some(Some(name)) = self.targets.get(wire) {
            return Ok(name.clone());
        }
        let def = self.wire_def(wire)?;
        let target: Rc<str> = match self.strategy.and_then(|s| s.resolve_type(&def.name)) {
            Some(local) => {
                log::trace!("stream type `{}` resolved to `{}`", def.name, local);
                Rc::from(local)
            }
            None => Rc::from(def.name.as_str()),
        };
        self.targets[wire] = Some(target.clone());
        Ok(target)
    }

    pub fn expect_kind(&self, wire: usize, expected: TypeKind) -> Result<Rc<TypeDef>, Error> {
        let def = self.wire_def(wire)?;
        if def.kind != expected {
            return Err(Error::type_mismatch(format!(
                "stream type `{}` is {:?}, expected {:?}",
                def.name, def.kind, expected
            )));
        }
        Ok(def)
    }

    /// Checks that a stream type may be read as the local type `T`.
    pub fn expect_type<T: WeftType>(&mut self, wire: usize) -> Result<Arc<TypeInfo>, Error> {
        let info = self.weft.resolver().resolve::<T>()?;
        let def = self.wire_def(wire)?;
        let target = self.target_name(wire)?;
        if &*target != info.name() {
            return Err(Error::type_resolution(format!(
                "stream type `{}` cannot be read as `{}`",
                def.name,
                info.name()
            )));
        }
        let local = info.descriptor();
        if def.kind != local.kind() || def.has_custom_hook() != local.has_custom_hook() {
            return Err(Error::type_mismatch(format!(
                "stream type `{}` is {:?} (custom: {}), local `{}` is {:?} (custom: {})",
                def.name,
                def.kind,
                def.has_custom_hook(),
                local.name(),
                local.kind(),
                local.has_custom_hook()
            )));
        }
        Ok(info)
    }

    /// Field plan for reading stream type `wire` into `T`, built on first use.
    pub fn field_plan<T: ObjectType>(&mut self, wire: usize) -> Result<Rc<FieldPlan>, Error> {
        let key = (wire, TypeId::of::<T>());
        if let Some(plan) = self.plans.get(&key) {
            return Ok(plan.clone());
        }
        let info = self.expect_type::<T>(wire)?;
        let def = self.wire_def(wire)?;
        let plan = Rc::new(FieldPlan::build(&def, info.descriptor(), self.strategy)?);
        self.plans.insert(key, plan.clone());
        Ok(plan)
    }

    /// Reads a shared instance after its tag.
    pub fn read_shared<T: ?Sized + Referent>(&mut self, tag: Tag) -> Result<Ref<T>, Error> {
        match tag {
            Tag::Ref => {
                let ref_id = self.reader.read_varuint32()?;
                let slot = self.resolve_ref(ref_id)?;
                T::from_slot(&slot)
            }
            Tag::RefValue | Tag::NotNullValue => {
                let ref_id = if tag == Tag::RefValue {
                    Some(self.ref_reader.reserve())
                } else {
                    None
                };
                let wire = self.read_type_header()?;
                self.enter()?;
                let value = T::read_referent(self, wire, ref_id)?;
                self.leave();
                Ok(value)
            }
            Tag::RefDeferred => {
                let ref_id = self.ref_reader.reserve();
                let wire = self.read_type_header()?;
                T::read_referent_deferred(self, wire, Some(ref_id))
            }
            other => Err(Error::type_mismatch(format!(
                "expected a shared instance, found {:?}",
                other
            ))),
        }
    }

    /// Allocates a shared instance of whatever registered type the stream
    /// names, for reads through `dyn Object` or a polymorphic trait.
    pub fn read_dynamic_referent(
        &mut self,
        wire: usize,
        ref_id: Option<u32>,
        deferred: bool,
    ) -> Result<RefSlot, Error> {
        let target = self.target_name(wire)?;
        let info = self.weft.resolver().get_by_name(&target).ok_or_else(|| {
            Error::type_resolution(format!("type `{}` is not registered", target))
        })?;
        let harness = info.harness().ok_or_else(|| {
            Error::type_resolution(format!(
                "type `{}` cannot be read as a shared instance",
                target
            ))
        })?;
        (harness.get_read_slot_fn())(self, wire, ref_id, deferred)
    }

    /// Queues the population of a deferred instance.
    pub fn defer(&mut self, job: ReadJob) {
        self.deferred.push_back(job);
    }

    /// Populates deferred instances in stream order.
    pub(crate) fn read_deferred(&mut self) -> Result<(), Error> {
        while let Some(job) = self.deferred.pop_front() {
            job(&mut *self)?;
        }
        Ok(())
    }

    pub(crate) fn reserve_ref(&mut self) -> u32 {
        self.ref_reader.reserve()
    }

    /// Publishes a freshly allocated instance under its reserved id.
    pub fn fill_ref<T: Object>(&mut self, ref_id: Option<u32>, rc: &Ref<T>) -> Result<(), Error> {
        match ref_id {
            Some(ref_id) => self.ref_reader.fill(ref_id, RefSlot::new(rc.clone())),
            None => Ok(()),
        }
    }

    pub fn resolve_ref(&self, ref_id: u32) -> Result<RefSlot, Error> {
        self.ref_reader.resolve(ref_id).cloned()
    }

    /// Reads an element count and checks it against the remaining input,
    /// since every element takes at least one byte.
    pub fn read_length(&mut self) -> Result<usize, Error> {
        let len = self.reader.read_varuint32()? as usize;
        if len > self.reader.remaining() {
            return Err(Error::buffer_out_of_bound(
                self.reader.cursor(),
                len,
                self.reader.cursor() + self.reader.remaining(),
            ));
        }
        Ok(len)
    }

    pub fn enter(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.weft.config().max_depth() {
            return Err(Error::depth_exceed(format!(
                "nesting depth exceeds the maximum of {} while reading",
                self.weft.config().max_depth()
            )));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
