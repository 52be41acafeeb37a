//! Element types, the null wrapper, and literal scalars.
//!
//! `DataType` is the closed set of element kinds the evaluator understands, mirroring
//! `ast::TypeTag` but flattened to the fixed-width/POD kinds a columnar engine actually
//! stores. Each variant is associated, at compile time, with one Rust storage type via
//! the `ElementType` trait -- that association is what lets the rest of the crate pick a
//! monomorphic code path from a runtime tag instead of carrying a `dyn` value around.

use enumflags2::BitFlags;
use std::fmt;
use std::rc::Rc;

/// Closed set of element kinds. Bitflag-backed so the dispatcher can report "one of
/// these types was expected" sets in assertion messages, the way `vm.rs` reports
/// `Error::TypeError { expect: TypeSet, .. }`.
#[derive(BitFlags, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataType {
    Bool = 0b0_0000_0001,
    Int32 = 0b0_0000_0010,
    Int64 = 0b0_0000_0100,
    Float32 = 0b0_0000_1000,
    Float64 = 0b0_0001_0000,
    TimestampMicros = 0b0_0010_0000,
    DurationMicros = 0b0_0100_0000,
    Decimal64 = 0b0_1000_0000,
    Utf8 = 0b1_0000_0000,
}

pub type TypeSet = BitFlags<DataType>;

/// Whether a `DataType` can live in an intermediate slot (<=8 bytes, fixed layout).
/// `Utf8` is the one kind that cannot: its representative storage type is a reference-
/// counted string, which does not fit the byte-copy contract intermediates rely on.
pub fn fits_in_intermediate(data_type: DataType) -> bool {
    data_type != DataType::Utf8
}

/// A value that may be null, independent of its element type. This is the Rust
/// realization of the value/validity split every column and literal carries; `Option`
/// already models "has a value, or doesn't" exactly, so there is no reason to wrap it
/// in a second type.
pub type PossiblyNull<T> = Option<T>;

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct TimestampMicros(pub i64);

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct DurationMicros(pub i64);

/// Fixed-point decimal, represented by its unscaled mantissa. The scale itself is a
/// property of a column or literal's declared `DataType`, not of the Rust storage
/// type -- arithmetic here operates on mantissas directly and does not rescale.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Decimal64(pub i64);

fn widen(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

fn narrow<const N: usize>(bytes: [u8; 8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// The compile-time association between a `DataType` tag and its representative Rust
/// storage type. Every match on `DataType` elsewhere in the crate has one arm per
/// `ElementType` impl, and each arm is monomorphized independently -- this is the
/// mechanism the rest of the evaluator depends on to avoid a single heap-allocated
/// runtime `Value`-style enum.
pub trait ElementType: Clone + fmt::Debug + PartialEq + PartialOrd + 'static {
    const TAG: DataType;

    /// Copy this value into an 8-byte intermediate slot. Panics for element types
    /// that do not fit (only `Utf8` -- see `fits_in_intermediate`); a well-formed
    /// plan never reaches that panic because `PlanBuilder` rejects such a plan at
    /// construction time.
    fn to_intermediate(&self) -> [u8; 8];

    fn from_intermediate(bytes: [u8; 8]) -> Self;
}

impl ElementType for bool {
    const TAG: DataType = DataType::Bool;

    fn to_intermediate(&self) -> [u8; 8] {
        widen(&(*self as u8).to_ne_bytes())
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        u8::from_ne_bytes(narrow(bytes)) != 0
    }
}

impl ElementType for i32 {
    const TAG: DataType = DataType::Int32;

    fn to_intermediate(&self) -> [u8; 8] {
        widen(&self.to_ne_bytes())
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        i32::from_ne_bytes(narrow(bytes))
    }
}

impl ElementType for i64 {
    const TAG: DataType = DataType::Int64;

    fn to_intermediate(&self) -> [u8; 8] {
        widen(&self.to_ne_bytes())
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        i64::from_ne_bytes(narrow(bytes))
    }
}

impl ElementType for f32 {
    const TAG: DataType = DataType::Float32;

    fn to_intermediate(&self) -> [u8; 8] {
        widen(&self.to_ne_bytes())
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        f32::from_ne_bytes(narrow(bytes))
    }
}

impl ElementType for f64 {
    const TAG: DataType = DataType::Float64;

    fn to_intermediate(&self) -> [u8; 8] {
        widen(&self.to_ne_bytes())
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        f64::from_ne_bytes(narrow(bytes))
    }
}

impl ElementType for TimestampMicros {
    const TAG: DataType = DataType::TimestampMicros;

    fn to_intermediate(&self) -> [u8; 8] {
        self.0.to_ne_bytes()
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        TimestampMicros(i64::from_ne_bytes(bytes))
    }
}

impl ElementType for DurationMicros {
    const TAG: DataType = DataType::DurationMicros;

    fn to_intermediate(&self) -> [u8; 8] {
        self.0.to_ne_bytes()
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        DurationMicros(i64::from_ne_bytes(bytes))
    }
}

impl ElementType for Decimal64 {
    const TAG: DataType = DataType::Decimal64;

    fn to_intermediate(&self) -> [u8; 8] {
        self.0.to_ne_bytes()
    }

    fn from_intermediate(bytes: [u8; 8]) -> Self {
        Decimal64(i64::from_ne_bytes(bytes))
    }
}

impl ElementType for Rc<String> {
    const TAG: DataType = DataType::Utf8;

    fn to_intermediate(&self) -> [u8; 8] {
        panic!("Utf8 values are not layout-compatible with intermediate storage (>8 bytes) -- rejected by PlanBuilder, reached only on a malformed plan")
    }

    fn from_intermediate(_bytes: [u8; 8]) -> Self {
        panic!("Utf8 values are not layout-compatible with intermediate storage (>8 bytes) -- rejected by PlanBuilder, reached only on a malformed plan")
    }
}

/// A literal value bound into a plan, one variant per `DataType`. Mirrors `vm.rs`'s
/// `Value` enum in spirit (a closed tagged union of storage types) but is never used
/// for runtime dispatch -- `FromScalar` (in `resolver.rs`) is the only thing that reads
/// one apart, and it does so for a single, statically-known `T` at a time.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(PossiblyNull<bool>),
    Int32(PossiblyNull<i32>),
    Int64(PossiblyNull<i64>),
    Float32(PossiblyNull<f32>),
    Float64(PossiblyNull<f64>),
    TimestampMicros(PossiblyNull<TimestampMicros>),
    DurationMicros(PossiblyNull<DurationMicros>),
    Decimal64(PossiblyNull<Decimal64>),
    Utf8(PossiblyNull<Rc<String>>),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Bool(_) => DataType::Bool,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::Float32(_) => DataType::Float32,
            Scalar::Float64(_) => DataType::Float64,
            Scalar::TimestampMicros(_) => DataType::TimestampMicros,
            Scalar::DurationMicros(_) => DataType::DurationMicros,
            Scalar::Decimal64(_) => DataType::Decimal64,
            Scalar::Utf8(_) => DataType::Utf8,
        }
    }
}
