//! Data type system for packed matrices
//!
//! Packed matrices hold real floating-point elements in single or double
//! precision, chosen per matrix at construction time. The `DType` enum is the
//! runtime tag; the [`Element`] trait connects it to the Rust type system.

mod element;

pub use element::{Element, RealElement};

use std::fmt;

/// Element types supported by packed matrices
///
/// Using a runtime enum (rather than a type parameter on every matrix)
/// allows precision to be a configuration decision while keeping a single
/// storage representation per backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
        }
    }
}

/// Macro for runtime dtype dispatch to typed operations.
///
/// Takes a `DType` value and executes a code block with `$T` bound to the
/// corresponding Rust type. Both supported dtypes are floating point, so the
/// match is exhaustive.
#[macro_export]
macro_rules! dispatch_float {
    ($dtype:expr, $T:ident => $body:block) => {
        match $dtype {
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}
