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
use crate::resolver::type_resolver::TypeResolver;
use crate::types::{def_flags, SerializeStrategy, TypeKind};

/// Registers the Rust type behind a [`FieldType`] with a resolver.
pub type DiscoverFn = fn(&TypeResolver) -> Result<(), Error>;

const MAX_DEF_FIELDS: usize = 4096;

/// Declared type of a field or of a container element.
///
/// The name is canonical (`i32`, `string`, `list<demo.Person>`, ...). Names of
/// nullable types carry a trailing `?` in [`FieldType::canonical_name`].
#[derive(Clone)]
pub struct FieldType {
    name: String,
    kind: TypeKind,
    nullable: bool,
    generics: Vec<FieldType>,
    discover: Option<DiscoverFn>,
}

impl FieldType {
    pub fn new<S: Into<String>>(name: S, kind: TypeKind) -> Self {
        FieldType {
            name: name.into(),
            kind,
            nullable: false,
            generics: vec![],
            discover: None,
        }
    }

    pub fn primitive(name: &'static str) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    /// Type of a transient field that never reaches the wire.
    pub fn opaque(rust_name: &'static str) -> Self {
        Self::new(rust_name, TypeKind::Scalar)
    }

    pub fn list(element: FieldType) -> Self {
        Self::new(format!("list<{}>", element.canonical_name()), TypeKind::List)
            .with_generics(vec![element])
    }

    pub fn array(element: FieldType) -> Self {
        Self::new(format!("array<{}>", element.canonical_name()), TypeKind::Array)
            .with_generics(vec![element])
    }

    pub fn map(prefix: &str, key: FieldType, value: FieldType) -> Self {
        Self::new(
            format!(
                "{}<{},{}>",
                prefix,
                key.canonical_name(),
                value.canonical_name()
            ),
            TypeKind::Map,
        )
        .with_generics(vec![key, value])
    }

    pub fn with_generics(mut self, generics: Vec<FieldType>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_discovery(mut self, discover: DiscoverFn) -> Self {
        self.discover = Some(discover);
        self
    }

    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn generics(&self) -> &[FieldType] {
        &self.generics
    }

    pub fn canonical_name(&self) -> String {
        if self.nullable {
            format!("{}?", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Registers every named type reachable from this declaration.
    pub fn discover(&self, resolver: &TypeResolver) -> Result<(), Error> {
        if let Some(discover) = self.discover {
            discover(resolver)?;
        }
        for generic in &self.generics {
            generic.discover(resolver)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("generics", &self.generics)
            .finish()
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.nullable == other.nullable
            && self.generics == other.generics
    }
}

impl Eq for FieldType {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    declared: FieldType,
    transient: bool,
}

impl FieldDescriptor {
    pub fn new<S: Into<String>>(name: S, declared: FieldType, transient: bool) -> Self {
        FieldDescriptor {
            name: name.into(),
            declared,
            transient,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared(&self) -> &FieldType {
        &self.declared
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

/// Immutable metadata about one Rust type, created once per registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    strategy: SerializeStrategy,
    fields: Vec<FieldDescriptor>,
    elements: Vec<FieldType>,
    skip_ctor_on_read: bool,
}

impl TypeDescriptor {
    pub fn new<S: Into<String>>(name: S, kind: TypeKind, strategy: SerializeStrategy) -> Self {
        TypeDescriptor {
            name: name.into(),
            kind,
            strategy,
            fields: vec![],
            elements: vec![],
            skip_ctor_on_read: false,
        }
    }

    /// Descriptor of a built-in container or boxed primitive, named after its
    /// declared type.
    pub fn builtin(declared: &FieldType, kind: TypeKind) -> Self {
        let mut descriptor = Self::new(declared.name(), kind, SerializeStrategy::Builtin);
        descriptor.elements = declared.generics().to_vec();
        descriptor
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_elements(mut self, elements: Vec<FieldType>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_skip_ctor(mut self, skip: bool) -> Self {
        self.skip_ctor_on_read = skip;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn strategy(&self) -> SerializeStrategy {
        self.strategy
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields that reach the wire, in descriptor order.
    pub fn serialized_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.transient)
    }

    pub fn elements(&self) -> &[FieldType] {
        &self.elements
    }

    pub fn has_custom_hook(&self) -> bool {
        self.strategy == SerializeStrategy::Custom
    }

    pub fn skip_ctor_on_read(&self) -> bool {
        self.skip_ctor_on_read
    }

    /// Everything this descriptor declares that the resolver should also know.
    pub(crate) fn discover_nested(&self, resolver: &TypeResolver) -> Result<(), Error> {
        for field in &self.fields {
            if !field.transient {
                field.declared.discover(resolver)?;
            }
        }
        for element in &self.elements {
            element.discover(resolver)?;
        }
        Ok(())
    }

    /// The on-wire definition of this descriptor.
    pub fn to_def(&self) -> TypeDef {
        let mut flags = 0;
        if self.has_custom_hook() {
            flags |= def_flags::CUSTOM_HOOK;
        }
        if self.skip_ctor_on_read {
            flags |= def_flags::SKIP_INIT;
        }
        let fields = match self.strategy {
            SerializeStrategy::Fields => self
                .serialized_fields()
                .map(|f| f.name.clone())
                .collect(),
            _ => vec![],
        };
        TypeDef {
            name: self.name.clone(),
            kind: self.kind,
            flags,
            fields,
        }
    }
}

/// Type definition as it travels on the wire.
///
/// Written inline the first time a type appears in a stream, or up front in
/// the batch type table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub flags: u8,
    pub fields: Vec<String>,
}

impl TypeDef {
    pub fn has_custom_hook(&self) -> bool {
        self.flags & def_flags::CUSTOM_HOOK != 0
    }

    pub fn skip_init(&self) -> bool {
        self.flags & def_flags::SKIP_INIT != 0
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.name);
        writer.write_u8(self.kind.into());
        writer.write_u8(self.flags);
        writer.write_varuint32(self.fields.len() as u32);
        for field in &self.fields {
            writer.write_string(field);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::default();
        self.write(&mut writer);
        writer.into_bytes()
    }

    pub fn read(reader: &mut Reader) -> Result<TypeDef, Error> {
        let name = reader.read_string()?;
        let kind_byte = reader.read_u8()?;
        let kind = TypeKind::try_from(kind_byte).map_err(|_| {
            Error::invalid_data(format!("unknown type kind {} for `{}`", kind_byte, name))
        })?;
        let flags = reader.read_u8()?;
        let count = reader.read_varuint32()? as usize;
        if count > MAX_DEF_FIELDS || count > reader.remaining() {
            return Err(Error::invalid_data(format!(
                "type `{}` declares {} fields",
                name, count
            )));
        }
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            fields.push(reader.read_string()?);
        }
        Ok(TypeDef {
            name,
            kind,
            flags,
            fields,
        })
    }
}
