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

//! Error type shared by every weft operation.
//!
//! Constructors are marked `#[cold]` so that the success paths of buffer reads
//! and tag checks stay small. Build with `WEFT_PANIC_ON_ERROR=1` to turn every
//! constructed error into a panic at its creation site, which gives a full
//! backtrace while debugging a failing stream.

use std::borrow::Cow;

use thiserror::Error;

/// Set `WEFT_PANIC_ON_ERROR` at compile time to panic where an error is created.
pub const PANIC_ON_ERROR: bool = option_env!("WEFT_PANIC_ON_ERROR").is_some();

#[inline(always)]
pub const fn should_panic_on_error() -> bool {
    PANIC_ON_ERROR
}

/// Coarse classification of an [`enum@Error`].
///
/// Callers use it to tell bad input ([`ErrorCategory::Format`]) apart from a
/// reader that lacks a type ([`ErrorCategory::TypeResolution`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown or unconstructable type met while reading.
    TypeResolution,
    /// An instance contains itself through a path that is not reference tracked.
    ReferenceCycle,
    /// Truncated stream, unexpected tag or otherwise corrupted bytes.
    Format,
    /// A version strategy could not map a type or field.
    VersionTransform,
    Other,
}

/// Error type for weft serialization and deserialization.
///
/// Always build errors through the static constructors (`Error::invalid_data`,
/// `Error::type_resolution`, ...) rather than the variants, so that the
/// `WEFT_PANIC_ON_ERROR` switch sees every error.
///
/// ```rust
/// use weft_core::error::{Error, ErrorCategory};
///
/// let err = Error::invalid_data(format!("bad tag {}", 200));
/// assert_eq!(err.category(), ErrorCategory::Format);
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A type on the stream is unknown to the reader or cannot be constructed.
    #[error("type resolution failed: {0}")]
    TypeResolution(Cow<'static, str>),

    /// A shared instance was reached again while it was still being written
    /// and reference tracking was off.
    #[error("reference cycle: {0}")]
    ReferenceCycle(Cow<'static, str>),

    /// A read ran past the end of the input.
    #[error("buffer out of bound: {0} + {1} > {2}")]
    BufferOutOfBound(usize, usize, usize),

    /// Invalid or corrupted data.
    #[error("{0}")]
    InvalidData(Cow<'static, str>),

    /// A back-reference that does not name a materialized instance.
    #[error("{0}")]
    InvalidRef(Cow<'static, str>),

    /// The value tag or on-wire type kind differs from what the reader expects.
    #[error("type mismatch: {0}")]
    TypeMismatch(Cow<'static, str>),

    /// Enum discriminant with no matching variant.
    #[error("{0}")]
    UnknownEnum(Cow<'static, str>),

    /// General type error, such as a shared instance of the wrong concrete type.
    #[error("{0}")]
    TypeError(Cow<'static, str>),

    /// Maximum nesting depth exceeded.
    #[error("{0}")]
    DepthExceed(Cow<'static, str>),

    /// Raised by a version strategy.
    #[error("version transform failed: {0}")]
    VersionTransform(Cow<'static, str>),

    /// Operation not allowed in the current state, such as writing an
    /// instance that is mutably borrowed.
    #[error("{0}")]
    NotAllowed(Cow<'static, str>),

    /// Generic error, mostly raised from custom hooks.
    #[error("{0}")]
    Unknown(Cow<'static, str>),
}

macro_rules! cold_constructor {
    ($(#[$meta:meta])* $fn_name:ident => $variant:ident) => {
        $(#[$meta])*
        #[inline(always)]
        #[cold]
        #[track_caller]
        pub fn $fn_name<S: Into<Cow<'static, str>>>(s: S) -> Self {
            let err = Error::$variant(s.into());
            if PANIC_ON_ERROR {
                panic!("WEFT_PANIC_ON_ERROR: {}", err);
            }
            err
        }
    };
}

impl Error {
    cold_constructor!(
        /// Creates an [`Error::TypeResolution`].
        type_resolution => TypeResolution
    );
    cold_constructor!(
        /// Creates an [`Error::ReferenceCycle`].
        reference_cycle => ReferenceCycle
    );
    cold_constructor!(
        /// Creates an [`Error::InvalidData`].
        invalid_data => InvalidData
    );
    cold_constructor!(
        /// Creates an [`Error::InvalidRef`].
        invalid_ref => InvalidRef
    );
    cold_constructor!(
        /// Creates an [`Error::TypeMismatch`].
        type_mismatch => TypeMismatch
    );
    cold_constructor!(
        /// Creates an [`Error::UnknownEnum`].
        unknown_enum => UnknownEnum
    );
    cold_constructor!(
        /// Creates an [`Error::TypeError`].
        type_error => TypeError
    );
    cold_constructor!(
        /// Creates an [`Error::DepthExceed`].
        depth_exceed => DepthExceed
    );
    cold_constructor!(
        /// Creates an [`Error::VersionTransform`].
        version_transform => VersionTransform
    );
    cold_constructor!(
        /// Creates an [`Error::NotAllowed`].
        not_allowed => NotAllowed
    );
    cold_constructor!(
        /// Creates an [`Error::Unknown`].
        unknown => Unknown
    );

    /// Creates an [`Error::BufferOutOfBound`] for a read of `length` bytes at
    /// `offset` from a buffer holding `capacity` bytes.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_out_of_bound(offset: usize, length: usize, capacity: usize) -> Self {
        let err = Error::BufferOutOfBound(offset, length, capacity);
        if PANIC_ON_ERROR {
            panic!("WEFT_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::TypeResolution(_) => ErrorCategory::TypeResolution,
            Error::ReferenceCycle(_) => ErrorCategory::ReferenceCycle,
            Error::BufferOutOfBound(..)
            | Error::InvalidData(_)
            | Error::InvalidRef(_)
            | Error::TypeMismatch(_)
            | Error::UnknownEnum(_)
            | Error::TypeError(_) => ErrorCategory::Format,
            Error::VersionTransform(_) => ErrorCategory::VersionTransform,
            Error::DepthExceed(_) | Error::NotAllowed(_) | Error::Unknown(_) => {
                ErrorCategory::Other
            }
        }
    }

    /// Prefixes the message of a [`Error::TypeResolution`] or [`Error::TypeError`]
    /// with the Rust type being read, leaving other variants untouched.
    #[inline(never)]
    pub fn enhance_type_error<T: ?Sized + 'static>(err: Error) -> Error {
        match err {
            Error::TypeError(s) => Error::type_error(format!(
                "{} (reading `{}`)",
                s,
                std::any::type_name::<T>()
            )),
            Error::TypeResolution(s) => Error::type_resolution(format!(
                "{} (reading `{}`)",
                s,
                std::any::type_name::<T>()
            )),
            other => other,
        }
    }
}

/// Returns early with an [`enum@Error`] when a condition does not hold.
///
/// ```rust
/// use weft_core::ensure;
/// use weft_core::error::Error;
///
/// fn check_rank(rank: usize) -> Result<(), Error> {
///     ensure!(rank > 0, "rank must be positive");
///     ensure!(rank <= 32, Error::invalid_data(format!("rank {} too large", rank)));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            return Err($crate::error::Error::unknown($msg));
        }
    };
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::unknown(format!($fmt, $($arg)*)));
        }
    };
}

/// Returns early with an [`Error::Unknown`].
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::error::Error::unknown($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::unknown(format!($fmt, $($arg)*)))
    };
}

/// Returns early with an [`Error::NotAllowed`].
#[macro_export]
macro_rules! not_allowed {
    ($err:expr) => {
        return Err($crate::error::Error::not_allowed($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::not_allowed(format!($fmt, $($arg)*)))
    };
}
