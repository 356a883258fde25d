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

//! Field-by-field serialization of user structs.
//!
//! [`impl_object!`](crate::impl_object) enumerates the fields of a struct and
//! generates its descriptor and pipelines. A `value` type is always inlined
//! where it appears. A `class` type may also be held through
//! [`Ref`](crate::serializer::reference::Ref), in which case it is reference
//! tracked and readable through `dyn Object`.

use crate::error::Error;
use crate::meta::{FieldDescriptor, FieldType, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::{discover, TypeInfo, WeftType};
use crate::resolver::version::{FieldAction, FieldPlan};
use crate::serializer::reference::{borrow_target, shared, Ref, Referent};
use crate::serializer::value::{ExtraData, Value};
use crate::serializer::{expect_tag, Serializer};
use crate::types::{SerializeStrategy, Tag, TypeKind};

/// Construction and lifecycle hooks of an object type.
///
/// `impl_object!` without `with hooks` implements this through `Default`.
pub trait ObjectHooks: Sized + 'static {
    /// Builds the instance the read pipeline populates.
    fn weft_construct() -> Option<Self> {
        None
    }

    /// Whether reads build instances through [`ObjectHooks::weft_construct_uninit`]
    /// instead of [`ObjectHooks::weft_construct`].
    fn weft_skip_init() -> bool {
        false
    }

    /// Builds a blank instance without running initialization logic.
    fn weft_construct_uninit() -> Option<Self> {
        None
    }

    /// Runs after every field was populated, before the version strategy's
    /// finalize step.
    fn weft_after_read(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Bag that receives on-wire fields with no local counterpart. Without
    /// one they are dropped.
    fn weft_extras(&mut self) -> Option<&mut ExtraData> {
        None
    }
}

pub trait ObjectType: ObjectHooks + WeftType {
    const WEFT_NAME: &'static str;
    const WEFT_KIND: TypeKind;

    /// Declared fields, serialized ones first in wire order.
    fn weft_fields() -> Vec<FieldDescriptor>;

    fn weft_write_fields(&self, context: &mut WriteContext<'_>) -> Result<(), Error>;

    /// Reads one value into the serialized field at `index`.
    fn weft_read_field(&mut self, index: usize, context: &mut ReadContext<'_>)
        -> Result<(), Error>;
}

pub fn describe<T: ObjectType>() -> TypeDescriptor {
    TypeDescriptor::new(T::WEFT_NAME, T::WEFT_KIND, SerializeStrategy::Fields)
        .with_fields(T::weft_fields())
        .with_skip_ctor(T::weft_skip_init())
}

pub fn type_info<T: ObjectType>() -> TypeInfo {
    TypeInfo::new::<T>(describe::<T>())
}

pub fn field_type<T: ObjectType>() -> FieldType {
    FieldType::new(T::WEFT_NAME, T::WEFT_KIND).with_discovery(discover::<T>)
}

pub fn construct<T: ObjectType>() -> Result<T, Error> {
    if T::weft_skip_init() {
        T::weft_construct_uninit().ok_or_else(|| {
            Error::type_resolution(format!(
                "`{}` skips initialization on read but has no uninitialized construction path",
                T::WEFT_NAME
            ))
        })
    } else {
        T::weft_construct().ok_or_else(|| {
            Error::type_resolution(format!("`{}` has no construction path", T::WEFT_NAME))
        })
    }
}

pub fn write_inline<T: ObjectType>(value: &T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_tag(Tag::Struct);
    context.write_type_header::<T>()?;
    context.enter()?;
    value.weft_write_fields(context)?;
    context.leave();
    Ok(())
}

pub fn read_inline<T: ObjectType>(tag: Tag, context: &mut ReadContext<'_>) -> Result<T, Error> {
    expect_tag(tag, Tag::Struct)?;
    let wire = context.read_type_header()?;
    let plan = context.field_plan::<T>(wire)?;
    let mut value = construct::<T>()?;
    context.enter()?;
    populate(&mut value, context, &plan)?;
    context.leave();
    Ok(value)
}

pub fn write_class<T: ObjectType>(value: &T, context: &mut WriteContext<'_>) -> Result<(), Error> {
    context.write_type_header::<T>()?;
    value.weft_write_fields(context)
}

/// Allocates an instance, publishes it under `ref_id`, then populates it, so
/// fields that point back at it resolve to the same instance.
pub fn read_class<T: ObjectType + Referent>(
    context: &mut ReadContext<'_>,
    wire: usize,
    ref_id: Option<u32>,
) -> Result<Ref<T>, Error> {
    let plan = context.field_plan::<T>(wire)?;
    let rc = shared(construct::<T>()?);
    context.fill_ref(ref_id, &rc)?;
    {
        let mut target = borrow_target(&rc)?;
        populate(&mut *target, context, &plan)?;
    }
    Ok(rc)
}

/// Like [`read_class`], but the fields follow the root value: the instance is
/// published now and populated when the read context drains its queue.
pub fn read_class_deferred<T: ObjectType + Referent>(
    context: &mut ReadContext<'_>,
    wire: usize,
    ref_id: Option<u32>,
) -> Result<Ref<T>, Error> {
    let plan = context.field_plan::<T>(wire)?;
    let rc = shared(construct::<T>()?);
    context.fill_ref(ref_id, &rc)?;
    let pending = rc.clone();
    context.defer(Box::new(move |context: &mut ReadContext<'_>| {
        let mut target = borrow_target(&pending)?;
        populate(&mut *target, context, &plan)
    }));
    Ok(rc)
}

fn populate<T: ObjectType>(
    target: &mut T,
    context: &mut ReadContext<'_>,
    plan: &FieldPlan,
) -> Result<(), Error> {
    let mut extras = ExtraData::new();
    for action in plan.actions() {
        match action {
            FieldAction::Assign(index) => target.weft_read_field(*index, context)?,
            FieldAction::Extra(name) => {
                let value = Value::weft_read(context)?;
                extras.insert(name.clone(), value);
            }
            FieldAction::Skip => {
                Value::weft_read(context)?;
            }
        }
    }
    target.weft_after_read()?;
    if let Some(strategy) = context.strategy() {
        strategy.finalize(plan.wire_name(), target, &extras)?;
    }
    if !extras.is_empty() {
        match target.weft_extras() {
            Some(bag) => bag.extend(extras),
            None => log::debug!(
                "dropping {} unmapped field(s) of `{}` read as `{}`",
                extras.len(),
                plan.wire_name(),
                T::WEFT_NAME
            ),
        }
    }
    Ok(())
}

/// Implements the pipelines of a struct by listing its fields.
///
/// ```rust
/// use weft_core::{impl_object, Weft};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
///     cached_norm: Option<f64>,
/// }
///
/// impl_object!(value Point("demo.Point") { x: i32, y: i32 } transient { cached_norm: Option<f64> });
///
/// let weft = Weft::default();
/// let bytes = weft.serialize(&Point { x: 1, y: -2, cached_norm: Some(2.2) }).unwrap();
/// let back: Point = weft.deserialize(&bytes).unwrap();
/// assert_eq!(back, Point { x: 1, y: -2, cached_norm: None });
/// ```
///
/// `class` types are reference tracked when held through `Ref<T>`. Adding
/// `with hooks` leaves the [`ObjectHooks`] implementation to the caller, for
/// types without `Default` or with custom construction.
#[macro_export]
macro_rules! impl_object {
    (@common $ty:ident, $name:literal, $kind:ident,
        [$($field:ident : $fty:ty),*], [$($tfield:ident : $tty:ty),*]) => {
        impl $crate::serializer::object::ObjectType for $ty {
            const WEFT_NAME: &'static str = $name;
            const WEFT_KIND: $crate::types::TypeKind = $crate::types::TypeKind::$kind;

            fn weft_fields() -> Vec<$crate::meta::FieldDescriptor> {
                vec![
                    $($crate::meta::FieldDescriptor::new(
                        stringify!($field),
                        <$fty as $crate::serializer::Serializer>::weft_field_type(),
                        false,
                    ),)*
                    $($crate::meta::FieldDescriptor::new(
                        stringify!($tfield),
                        $crate::meta::FieldType::opaque(std::any::type_name::<$tty>()),
                        true,
                    ),)*
                ]
            }

            #[allow(unused_variables)]
            fn weft_write_fields(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $($crate::serializer::Serializer::weft_write(&self.$field, context)?;)*
                Ok(())
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn weft_read_field(
                &mut self,
                index: usize,
                context: &mut $crate::resolver::context::ReadContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                let mut _i = 0usize;
                $(
                    if index == _i {
                        self.$field = <$fty as $crate::serializer::Serializer>::weft_read(context)?;
                        return Ok(());
                    }
                    _i += 1;
                )*
                Err($crate::error::Error::invalid_data(format!(
                    "`{}` has no field #{}",
                    $name, index
                )))
            }
        }

        impl $crate::serializer::Serializer for $ty {
            fn weft_write(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::object::write_inline(self, context)
            }

            fn weft_read_tagged(
                tag: $crate::types::Tag,
                context: &mut $crate::resolver::context::ReadContext<'_>,
            ) -> Result<Self, $crate::error::Error> {
                $crate::serializer::object::read_inline::<$ty>(tag, context)
            }

            fn weft_field_type() -> $crate::meta::FieldType {
                $crate::serializer::object::field_type::<$ty>()
            }
        }
    };
    (@default_hooks $ty:ident) => {
        impl $crate::serializer::object::ObjectHooks for $ty {
            fn weft_construct() -> Option<Self> {
                Some(<$ty as ::std::default::Default>::default())
            }
        }
    };
    (@value $ty:ident) => {
        impl $crate::resolver::type_resolver::WeftType for $ty {
            fn weft_type_info() -> $crate::resolver::type_resolver::TypeInfo {
                $crate::serializer::object::type_info::<$ty>()
            }
        }
    };
    (@class $ty:ident, $name:literal) => {
        impl $crate::resolver::type_resolver::WeftType for $ty {
            fn weft_type_info() -> $crate::resolver::type_resolver::TypeInfo {
                $crate::serializer::object::type_info::<$ty>()
                    .with_harness($crate::serializer::reference::read_slot::<$ty>)
            }
        }

        impl $crate::serializer::reference::Referent for $ty {
            fn write_referent(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::object::write_class(self, context)
            }

            fn read_referent(
                context: &mut $crate::resolver::context::ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                $crate::serializer::object::read_class::<$ty>(context, wire, ref_id)
            }

            fn read_referent_deferred(
                context: &mut $crate::resolver::context::ReadContext<'_>,
                wire: usize,
                ref_id: Option<u32>,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                $crate::serializer::object::read_class_deferred::<$ty>(context, wire, ref_id)
            }

            fn from_slot(
                slot: &$crate::resolver::ref_resolver::RefSlot,
            ) -> Result<$crate::serializer::reference::Ref<Self>, $crate::error::Error> {
                slot.downcast_or_err::<$ty>($name)
            }

            fn referent_field_type() -> $crate::meta::FieldType {
                $crate::serializer::object::field_type::<$ty>()
            }

            fn referent_type_name(&self) -> std::borrow::Cow<'static, str> {
                std::borrow::Cow::Borrowed($name)
            }

            fn splits_referent(&self) -> bool {
                true
            }

            fn write_referent_head(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                context.write_type_header::<$ty>()
            }

            fn write_referent_body(
                &self,
                context: &mut $crate::resolver::context::WriteContext<'_>,
            ) -> Result<(), $crate::error::Error> {
                $crate::serializer::object::ObjectType::weft_write_fields(self, context)
            }
        }
    };
    (class $ty:ident ($name:literal) with hooks { $($field:ident : $fty:ty),* $(,)? }
        $(transient { $($tfield:ident : $tty:ty),* $(,)? })?) => {
        $crate::impl_object!(@common $ty, $name, Class, [$($field : $fty),*], [$($($tfield : $tty),*)?]);
        $crate::impl_object!(@class $ty, $name);
    };
    (class $ty:ident ($name:literal) { $($field:ident : $fty:ty),* $(,)? }
        $(transient { $($tfield:ident : $tty:ty),* $(,)? })?) => {
        $crate::impl_object!(@default_hooks $ty);
        $crate::impl_object!(@common $ty, $name, Class, [$($field : $fty),*], [$($($tfield : $tty),*)?]);
        $crate::impl_object!(@class $ty, $name);
    };
    (value $ty:ident ($name:literal) with hooks { $($field:ident : $fty:ty),* $(,)? }
        $(transient { $($tfield:ident : $tty:ty),* $(,)? })?) => {
        $crate::impl_object!(@common $ty, $name, Value, [$($field : $fty),*], [$($($tfield : $tty),*)?]);
        $crate::impl_object!(@value $ty);
    };
    (value $ty:ident ($name:literal) { $($field:ident : $fty:ty),* $(,)? }
        $(transient { $($tfield:ident : $tty:ty),* $(,)? })?) => {
        $crate::impl_object!(@default_hooks $ty);
        $crate::impl_object!(@common $ty, $name, Value, [$($field : $fty),*], [$($($tfield : $tty),*)?]);
        $crate::impl_object!(@value $ty);
    };
}
