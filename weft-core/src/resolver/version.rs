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

//! Read-side schema evolution.
//!
//! A [`VersionStrategy`] walks each on-wire type through the same steps:
//!
//! 1. **Inspect**: the definition of a type is read from the stream.
//! 2. **Resolve**: [`VersionStrategy::resolve_type`] maps the on-wire name to
//!    a local type name.
//! 3. **FieldMap**: [`VersionStrategy::map_field`] maps every on-wire field to
//!    a local field, the extras bag, or nothing.
//! 4. **Populate**: the read pipeline assigns mapped fields and decodes the
//!    rest into [`Value`](crate::serializer::value::Value)s.
//! 5. **Finalize**: [`VersionStrategy::finalize`] runs on the populated
//!    instance with the unmapped values at hand.
//!
//! Steps 2 and 3 run once per on-wire type per call; the result is the
//! [`FieldPlan`] cached in the read context.

use crate::error::Error;
use crate::meta::{TypeDef, TypeDescriptor};
use crate::serializer::value::ExtraData;
use std::any::Any;
use std::collections::HashMap;

/// What happens to one on-wire field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    /// Assign to the local field of the same name, or to the extras bag if
    /// there is none.
    Same,
    /// Assign to the named local field.
    Rename(String),
    /// Hand the value to finalize and the extras bag.
    Unmapped,
    /// Decode and discard.
    Drop,
    /// Fail the call with a version transform error.
    Reject,
}

/// Pluggable read-side policy mapping old on-wire shapes to current types.
///
/// Every method defaults to the identity mapping, which already tolerates
/// added, removed and reordered fields.
pub trait VersionStrategy {
    /// Local type name for an on-wire type name, or `None` to keep it.
    fn resolve_type(&self, _wire_name: &str) -> Option<String> {
        None
    }

    fn map_field(&self, _wire_type: &str, _wire_field: &str) -> FieldMapping {
        FieldMapping::Same
    }

    /// Runs after an instance of `wire_type` is populated and its own
    /// after-read hook ran. `target` is the local instance.
    fn finalize(
        &self,
        _wire_type: &str,
        _target: &mut dyn Any,
        _extras: &ExtraData,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Strategy that keeps every type and field as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityStrategy;

impl VersionStrategy for IdentityStrategy {}

type Finalizer = dyn Fn(&mut dyn Any, &ExtraData) -> Result<(), Error>;

/// Table driven strategy for the common upgrade cases.
///
/// ```rust
/// use weft_core::resolver::version::{FieldMapping, TransformStrategy, VersionStrategy};
///
/// let strategy = TransformStrategy::new()
///     .map_type("crm.CustomerV1", "crm.Customer")
///     .rename_field("crm.CustomerV1", "FullName", "name")
///     .drop_field("crm.CustomerV1", "LegacyCode");
///
/// assert_eq!(strategy.resolve_type("crm.CustomerV1").as_deref(), Some("crm.Customer"));
/// assert_eq!(
///     strategy.map_field("crm.CustomerV1", "FullName"),
///     FieldMapping::Rename("name".to_string())
/// );
/// ```
#[derive(Default)]
pub struct TransformStrategy {
    types: HashMap<String, String>,
    fields: HashMap<(String, String), FieldMapping>,
    finalizers: HashMap<String, Box<Finalizer>>,
}

impl TransformStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_type<S: Into<String>, L: Into<String>>(mut self, wire_type: S, local_type: L) -> Self {
        self.types.insert(wire_type.into(), local_type.into());
        self
    }

    pub fn with_field_mapping<S: Into<String>, F: Into<String>>(
        mut self,
        wire_type: S,
        wire_field: F,
        mapping: FieldMapping,
    ) -> Self {
        self.fields
            .insert((wire_type.into(), wire_field.into()), mapping);
        self
    }

    pub fn rename_field<S: Into<String>, F: Into<String>, L: Into<String>>(
        self,
        wire_type: S,
        wire_field: F,
        local_field: L,
    ) -> Self {
        self.with_field_mapping(wire_type, wire_field, FieldMapping::Rename(local_field.into()))
    }

    pub fn unmapped_field<S: Into<String>, F: Into<String>>(self, wire_type: S, wire_field: F) -> Self {
        self.with_field_mapping(wire_type, wire_field, FieldMapping::Unmapped)
    }

    pub fn drop_field<S: Into<String>, F: Into<String>>(self, wire_type: S, wire_field: F) -> Self {
        self.with_field_mapping(wire_type, wire_field, FieldMapping::Drop)
    }

    pub fn reject_field<S: Into<String>, F: Into<String>>(self, wire_type: S, wire_field: F) -> Self {
        self.with_field_mapping(wire_type, wire_field, FieldMapping::Reject)
    }

    /// Registers the finalize step for instances written as `wire_type`.
    /// The local instance must be a `T`.
    pub fn on_finalize<T, S, F>(mut self, wire_type: S, finalize: F) -> Self
    where
        T: 'static,
        S: Into<String>,
        F: Fn(&mut T, &ExtraData) -> Result<(), Error> + 'static,
    {
        let wire_type = wire_type.into();
        let expected = wire_type.clone();
        let finalizer: Box<Finalizer> = Box::new(move |target: &mut dyn Any, extras: &ExtraData| {
            match target.downcast_mut::<T>() {
                Some(target) => finalize(target, extras),
                None => Err(Error::version_transform(format!(
                    "finalizer for `{}` expects `{}`",
                    expected,
                    std::any::type_name::<T>()
                ))),
            }
        });
        self.finalizers.insert(wire_type, finalizer);
        self
    }
}

impl VersionStrategy for TransformStrategy {
    fn resolve_type(&self, wire_name: &str) -> Option<String> {
        self.types.get(wire_name).cloned()
    }

    fn map_field(&self, wire_type: &str, wire_field: &str) -> FieldMapping {
        self.fields
            .get(&(wire_type.to_owned(), wire_field.to_owned()))
            .cloned()
            .unwrap_or(FieldMapping::Same)
    }

    fn finalize(&self, wire_type: &str, target: &mut dyn Any, extras: &ExtraData) -> Result<(), Error> {
        match self.finalizers.get(wire_type) {
            Some(finalize) => finalize(target, extras),
            None => Ok(()),
        }
    }
}

/// Per-field action of a [`FieldPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAction {
    /// Read into the local serialized field at this index.
    Assign(usize),
    /// Decode into the extras under this name.
    Extra(String),
    Skip,
}

/// How the fields of one on-wire type populate one local type.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    wire_name: String,
    actions: Vec<FieldAction>,
}

impl FieldPlan {
    pub fn build(
        def: &TypeDef,
        local: &TypeDescriptor,
        strategy: Option<&dyn VersionStrategy>,
    ) -> Result<FieldPlan, Error> {
        let local_fields: Vec<&str> = local.serialized_fields().map(|f| f.name()).collect();
        let find = |name: &str| local_fields.iter().position(|f| *f == name);
        let mut actions = Vec::with_capacity(def.fields.len());
        for wire_field in &def.fields {
            let mapping = strategy
                .map(|s| s.map_field(&def.name, wire_field))
                .unwrap_or(FieldMapping::Same);
            let action = match mapping {
                FieldMapping::Same => match find(wire_field) {
                    Some(index) => FieldAction::Assign(index),
                    None => FieldAction::Extra(wire_field.clone()),
                },
                FieldMapping::Rename(local_field) => match find(&local_field) {
                    Some(index) => FieldAction::Assign(index),
                    None => {
                        return Err(Error::version_transform(format!(
                            "field `{}` of `{}` is mapped to `{}`, which `{}` does not have",
                            wire_field,
                            def.name,
                            local_field,
                            local.name()
                        )))
                    }
                },
                FieldMapping::Unmapped => FieldAction::Extra(wire_field.clone()),
                FieldMapping::Drop => FieldAction::Skip,
                FieldMapping::Reject => {
                    return Err(Error::version_transform(format!(
                        "field `{}` of `{}` cannot be mapped onto `{}`",
                        wire_field,
                        def.name,
                        local.name()
                    )))
                }
            };
            actions.push(action);
        }
        Ok(FieldPlan {
            wire_name: def.name.clone(),
            actions,
        })
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn actions(&self) -> &[FieldAction] {
        &self.actions
    }
}
