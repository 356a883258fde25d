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

//! Shared instances and polymorphism.
//!
//! A [`Ref<T>`] is an `Rc<RefCell<T>>`. Every occurrence of the same `Ref`
//! in one serialize call shares a reference id, so aliasing and cycles survive
//! a round trip. `T` may be a concrete type implementing [`Referent`] or a
//! trait object: `dyn Object` accepts any registered reference type, and
//! [`register_polymorphic!`](crate::register_polymorphic) opens a user trait
//! to a closed list of implementors.

use crate::error::Error;
use crate::meta::{FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::ref_resolver::RefSlot;
use crate::resolver::type_resolver::{TypeInfo, WeftType};
use crate::serializer::Serializer;
use crate::types::{Tag, TypeKind};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use std::any::Any;
use std::borrow::Cow;
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

pub type Ref<T> = Rc<RefCell<T>>;

/// Wraps a value as a new shared instance.
pub fn shared<T>(value: T) -> Ref<T> {
    Rc::new(RefCell::new(value))
}

/// Whether two shared handles point at the same instance, whatever their
/// static types.
pub fn same_ref<T: ?Sized, U: ?Sized>(a: &Ref<T>, b: &Ref<U>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Borrows a freshly allocated instance for population.
pub(crate) fn borrow_target<T: ?Sized>(rc: &Ref<T>) -> Result<RefMut<'_, T>, Error> {
    rc.try_borrow_mut().map_err(|_| {
        Error::not_allowed("a shared instance was borrowed while it was being read")
    })
}

/// Object-safe view of a reference type.
///
/// Implemented for every [`Referent`]; `Ref<dyn Object>` fields hold any of
/// them.
pub trait Object: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Writes the type header and payload.
    fn weft_write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;

    fn weft_type_name(&self) -> Cow<'static, str>;

    fn weft_splits(&self) -> bool;

    fn weft_write_head(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;

    fn weft_write_body(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;
}

impl dyn Object {
    pub fn is<T: Object>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.weft_type_name())
    }
}

/// A type that can sit behind a reference tag.
///
/// `read_referent` runs after the tag and type header were read. It must
/// publish the new instance with [`ReadContext::fill_ref`] before reading
/// anything that could refer back to it.
pub trait Referent: 'static {
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;

    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error>;

    /// Reads an instance whose fields follow the root value. Allocates and
    /// publishes it, then queues the population with
    /// [`ReadContext::defer`].
    fn read_referent_deferred(
        context: &mut ReadContext<'_>,
        wire: usize,
        _ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        let def = context.wire_def(wire)?;
        Err(Error::invalid_data(format!(
            "stream type `{}` cannot be read as a deferred instance",
            def.name
        )))
    }

    /// Views an already materialized instance as `Ref<Self>`.
    fn from_slot(slot: &RefSlot) -> Result<Ref<Self>, Error>;

    fn referent_field_type() -> FieldType;

    fn referent_type_name(&self) -> Cow<'static, str>;

    /// Whether the type header and the body can be written apart, with the
    /// body after the rest of the root value.
    fn splits_referent(&self) -> bool {
        false
    }

    fn write_referent_head(&self, _context: &mut WriteContext<'_>) -> Result<(), Error> {
        Err(Error::not_allowed("instance cannot be written deferred"))
    }

    fn write_referent_body(&self, _context: &mut WriteContext<'_>) -> Result<(), Error> {
        Err(Error::not_allowed("instance cannot be written deferred"))
    }
}

impl<T: Referent> Object for T {
    #[inline(always)]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline(always)]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn weft_write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.write_referent(context)
    }

    fn weft_type_name(&self) -> Cow<'static, str> {
        self.referent_type_name()
    }

    fn weft_splits(&self) -> bool {
        self.splits_referent()
    }

    fn weft_write_head(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.write_referent_head(context)
    }

    fn weft_write_body(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.write_referent_body(context)
    }
}

impl<T: ?Sized + Referent> Serializer for Rc<RefCell<T>> {
    #[inline]
    fn weft_write(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        context.write_shared(self)
    }

    #[inline]
    fn weft_read_tagged(tag: Tag, context: &mut ReadContext<'_>) -> Result<Self, Error> {
        context.read_shared::<T>(tag)
    }

    fn weft_field_type() -> FieldType {
        T::referent_field_type()
    }
}

impl Referent for dyn Object {
    fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.weft_write_referent(context)
    }

    fn read_referent(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        Ok(context.read_dynamic_referent(wire, ref_id, false)?.object())
    }

    fn read_referent_deferred(
        context: &mut ReadContext<'_>,
        wire: usize,
        ref_id: Option<u32>,
    ) -> Result<Ref<Self>, Error> {
        Ok(context.read_dynamic_referent(wire, ref_id, true)?.object())
    }

    fn from_slot(slot: &RefSlot) -> Result<Ref<Self>, Error> {
        Ok(slot.object())
    }

    fn referent_field_type() -> FieldType {
        FieldType::new("object", TypeKind::Polymorphic)
    }

    fn referent_type_name(&self) -> Cow<'static, str> {
        self.weft_type_name()
    }

    fn splits_referent(&self) -> bool {
        self.weft_splits()
    }

    fn write_referent_head(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.weft_write_head(context)
    }

    fn write_referent_body(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
        self.weft_write_body(context)
    }
}

/// Registry harness of a reference type: reads one instance of `T`, deferred
/// or in place, and returns it as a slot.
pub fn read_slot<T: Referent>(
    context: &mut ReadContext<'_>,
    wire: usize,
    ref_id: Option<u32>,
    deferred: bool,
) -> Result<RefSlot, Error> {
    if deferred {
        T::read_referent_deferred(context, wire, ref_id).map(RefSlot::new)
    } else {
        T::read_referent(context, wire, ref_id).map(RefSlot::new)
    }
}

/// Makes `Ref<dyn Trait>` serializable for a trait whose implementors are
/// registered reference types.
///
/// The trait must have [`Object`] as a supertrait. Reading accepts exactly the
/// listed implementors; any other type on the stream is a type error.
///
/// ```rust
/// use weft_core::serializer::reference::{shared, Object, Ref};
/// use weft_core::{impl_object, register_polymorphic, Weft};
///
/// trait Shape: Object {
///     fn area(&self) -> f64;
/// }
///
/// #[derive(Default)]
/// struct Circle {
///     r: f64,
/// }
/// impl_object!(class Circle("geo.Circle") { r: f64 });
/// impl Shape for Circle {
///     fn area(&self) -> f64 {
///         3.0 * self.r * self.r
///     }
/// }
///
/// register_polymorphic!(dyn Shape as "geo.Shape": Circle);
///
/// let weft = Weft::default();
/// let shape: Ref<dyn Shape> = shared(Circle { r: 2.0 });
/// let bytes = weft.serialize(&shape).unwrap();
/// let back: Ref<dyn Shape> = weft.deserialize(&bytes).unwrap();
/// assert_eq!(back.borrow().area(), 12.0);
/// ```
#[macro_export]
macro_rules! register_polymorphic {
    (dyn $trait:ident as $name:literal : $($impl:ty),+ $(,)?) => {
        impl $crate::serializer::reference::Referent for dyn $trait {
            fn write_referent(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::reference::Object::weft_write_referent(self, context)
            }

            fn read_referent(
                context: &mut $crate::resolver::context::ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                let resolver = context.get_weft().resolver();
                $(resolver.resolve::<$impl>()?;)+
                let slot = context.read_dynamic_referent(wire, ref_id, false)?;
                <Self as $crate::serializer::reference::Referent>::from_slot(&slot)
            }

            fn read_referent_deferred(
                context: &mut $crate::resolver::context::ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                let resolver = context.get_weft().resolver();
                $(resolver.resolve::<$impl>()?;)+
                let slot = context.read_dynamic_referent(wire, ref_id, true)?;
                <Self as $crate::serializer::reference::Referent>::from_slot(&slot)
            }

            fn splits_referent(&self) -> bool {
                $crate::serializer::reference::Object::weft_splits(self)
            }

            fn write_referent_head(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::reference::Object::weft_write_head(self, context)
            }

            fn write_referent_body(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::reference::Object::weft_write_body(self, context)
            }

            fn from_slot(
                slot: &$crate::resolver::ref_resolver::RefSlot,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                $(
                    if let Some(rc) = slot.downcast::<$impl>() {
                        let rc: $crate::serializer::reference::Ref<dyn $trait> = rc;
                        return Ok(rc);
                    }
                )+
                Err($crate::error::Error::type_error(format!(
                    "shared instance of `{}` is not a `{}`",
                    slot.type_name(),
                    $name
                )))
            }

            fn referent_field_type() -> $crate::meta::FieldType {
                $crate::meta::FieldType::new($name, $crate::types::TypeKind::Polymorphic)
                    .with_discovery(|resolver| {
                        $(resolver.resolve::<$impl>()?;)+
                        Ok(())
                    })
            }

            fn referent_type_name(&self) -> std::borrow::Cow<'static, str> {
                $crate::serializer::reference::Object::weft_type_name(self)
            }
        }
    };
}

// Primitives held through `Ref<T>`. The payload is the full tagged value,
// read before the instance is allocated since it cannot refer back to it.
macro_rules! impl_boxed {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl WeftType for $ty {
                fn weft_type_info() -> TypeInfo {
                    TypeInfo::new::<$ty>(TypeDescriptor::builtin(
                        &<$ty as Serializer>::weft_field_type(),
                        TypeKind::Boxed,
                    ))
                    .with_harness(read_slot::<$ty>)
                }
            }

            impl Referent for $ty {
                fn write_referent(&self, context: &mut WriteContext<'_>) -> Result<(), Error> {
                    context.write_type_header::<$ty>()?;
                    self.weft_write(context)
                }

                fn read_referent(
                    context: &mut ReadContext<'_>,
                    wire: usize,
                    ref_id: Option<u32>,
                ) -> Result<Ref<Self>, Error> {
                    context.expect_type::<$ty>(wire)?;
                    let rc = shared(<$ty as Serializer>::weft_read(context)?);
                    context.fill_ref(ref_id, &rc)?;
                    Ok(rc)
                }

                fn from_slot(slot: &RefSlot) -> Result<Ref<Self>, Error> {
                    slot.downcast_or_err::<$ty>(<$ty as Serializer>::weft_field_type().name())
                }

                fn referent_field_type() -> FieldType {
                    <$ty as Serializer>::weft_field_type()
                }

                fn referent_type_name(&self) -> Cow<'static, str> {
                    Cow::Owned(<$ty as Serializer>::weft_field_type().name().to_owned())
                }
            }
        )+
    };
}

impl_boxed!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    char,
    String,
    Decimal,
    NaiveDateTime,
    NaiveDate,
    TimeDelta,
);
