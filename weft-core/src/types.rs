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

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Version written in the high nibble of the head byte of every call.
pub const FORMAT_VERSION: u8 = 1;

pub mod head_flags {
    /// A batch type table follows the head byte.
    pub const HAS_TYPE_TABLE: u8 = 0b0001;
    /// Shared instances were reference tracked by the writer.
    pub const TRACK_REF: u8 = 0b0010;
}

pub mod def_flags {
    pub const CUSTOM_HOOK: u8 = 0b0001;
    pub const SKIP_INIT: u8 = 0b0010;
}

/// One-byte tag that starts every value on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Tag {
    Null = 0,
    /// Back-reference to an already materialized instance.
    Ref = 1,
    /// First occurrence of a reference tracked instance.
    RefValue = 2,
    /// Reference type instance written without tracking.
    NotNullValue = 3,
    Bool = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    U8 = 9,
    U16 = 10,
    U32 = 11,
    U64 = 12,
    F32 = 13,
    F64 = 14,
    Char = 15,
    String = 16,
    Decimal = 17,
    DateTime = 18,
    Date = 19,
    Duration = 20,
    Struct = 21,
    Enum = 22,
    List = 23,
    Array = 24,
    Map = 25,
    /// First occurrence of a reference tracked instance whose fields are
    /// written after the root value.
    RefDeferred = 26,
}

impl Tag {
    #[inline(always)]
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Tag::Ref | Tag::RefValue | Tag::NotNullValue | Tag::RefDeferred
        )
    }
}

/// Shape of a type as recorded in its descriptor and on-wire definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TypeKind {
    /// Number, text, date or other value with a built-in encoding.
    Scalar = 0,
    /// Struct inlined by value, never reference tracked.
    Value = 1,
    /// Reference type, tracked when held through `Ref<T>`.
    Class = 2,
    Enum = 3,
    List = 4,
    Array = 5,
    Map = 6,
    /// Primitive held through `Ref<T>`.
    Boxed = 7,
    /// Declared trait object type, `dyn Object` or a polymorphic trait.
    Polymorphic = 8,
}

impl TypeKind {
    /// Kinds whose instances can sit behind a reference tag.
    pub fn is_referent(self) -> bool {
        matches!(
            self,
            TypeKind::Class | TypeKind::List | TypeKind::Array | TypeKind::Map | TypeKind::Boxed
        )
    }

    pub fn has_fields(self) -> bool {
        matches!(self, TypeKind::Value | TypeKind::Class)
    }
}

/// How the payload of a type is produced, resolved once per descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeStrategy {
    /// Primitives and containers with a fixed built-in layout.
    Builtin,
    /// Field by field in descriptor order.
    Fields,
    /// Length-framed bytes produced by the type's own hook.
    Custom,
}
