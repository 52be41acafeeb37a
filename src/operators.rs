//! Operators and their per-element-type functors.
//!
//! Grounded directly on `vm.rs::BinOp`/`UnOp` and the `operator!` macro: there, a single
//! whitelist match generates one method per operator on the dynamic `Value` enum, with a
//! fallthrough arm returning `Error::TypeMismatch`. Here the same whitelist-with-
//! fallthrough shape is generalized from "one dynamic enum, many operators" to "one
//! operator trait per arity, many monomorphic element types" -- each element type
//! overrides only the operator methods it actually supports; every other method falls
//! back to a default that panics, which is this crate's equivalent of the device-side
//! assertion the specification calls for on an invalid (operator, type) combination.

use crate::types::{DataType, Decimal64, DurationMicros, ElementType, PossiblyNull, TimestampMicros};
use serde::Deserialize;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Identity,
    Neg,
    Abs,
    Sin,
    Cos,
    Not,
    BitNot,
    CastToInt64,
    CastToFloat64,
    CastToBool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum NullEqualityPolicy {
    /// `null == null` evaluates to `true`.
    Equal,
    /// `null == null` evaluates to `false`.
    Unequal,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl Operator {
    pub fn arity(&self) -> usize {
        match self {
            Operator::Unary(_) => 1,
            Operator::Binary(_) => 2,
        }
    }
}

fn unsupported_unary(op: UnaryOp, t: DataType) -> ! {
    panic!(
        "unary operator {:?} is not defined for element type {:?} -- this indicates an invalid plan",
        op, t
    )
}

fn unsupported_binary(op: BinaryOp, t: DataType) -> ! {
    panic!(
        "binary operator {:?} is not defined for element type {:?} -- this indicates an invalid plan",
        op, t
    )
}

fn unsupported_cast(name: &str, t: DataType) -> ! {
    panic!(
        "cast {} is not defined for element type {:?} -- this indicates an invalid plan",
        name, t
    )
}

/// Per-type unary functors. `op_identity` is valid for every type -- it is the no-op
/// pass-through a caller can use to move a value to a new intermediate slot or out to a
/// column without transforming it.
pub trait UnaryEval: ElementType {
    fn op_identity(self) -> Self {
        self
    }
    fn op_neg(self) -> Self {
        unsupported_unary(UnaryOp::Neg, Self::TAG)
    }
    fn op_abs(self) -> Self {
        unsupported_unary(UnaryOp::Abs, Self::TAG)
    }
    fn op_sin(self) -> Self {
        unsupported_unary(UnaryOp::Sin, Self::TAG)
    }
    fn op_cos(self) -> Self {
        unsupported_unary(UnaryOp::Cos, Self::TAG)
    }
    fn op_not(self) -> Self {
        unsupported_unary(UnaryOp::Not, Self::TAG)
    }
    fn op_bitnot(self) -> Self {
        unsupported_unary(UnaryOp::BitNot, Self::TAG)
    }
}

/// Per-type binary functors, same-type in and same-type out. Comparison and equality
/// operators are handled separately in `eval_comparison`/`eval_equality` since their
/// result type (`bool`) never matches the operand type.
pub trait BinaryEval: ElementType {
    fn op_add(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Add, Self::TAG)
    }
    fn op_sub(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Sub, Self::TAG)
    }
    fn op_mul(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Mul, Self::TAG)
    }
    fn op_div(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Div, Self::TAG)
    }
    fn op_mod(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Mod, Self::TAG)
    }
    fn op_pow(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::Pow, Self::TAG)
    }
    fn op_and(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::LogicalAnd, Self::TAG)
    }
    fn op_or(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::LogicalOr, Self::TAG)
    }
    fn op_bitand(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::BitwiseAnd, Self::TAG)
    }
    fn op_bitor(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::BitwiseOr, Self::TAG)
    }
    fn op_bitxor(self, _rhs: Self) -> Self {
        unsupported_binary(BinaryOp::BitwiseXor, Self::TAG)
    }
}

/// Per-type casts. Only exercised by `UnaryOp::CastTo*`, where the result type differs
/// from the operand type.
pub trait CastOps: ElementType {
    fn cast_to_int64(&self) -> i64 {
        unsupported_cast("CAST_TO_INT64", Self::TAG)
    }
    fn cast_to_float64(&self) -> f64 {
        unsupported_cast("CAST_TO_FLOAT64", Self::TAG)
    }
    fn cast_to_bool(&self) -> bool {
        unsupported_cast("CAST_TO_BOOL", Self::TAG)
    }
}

impl UnaryEval for bool {
    fn op_not(self) -> Self {
        !self
    }
}
impl BinaryEval for bool {
    fn op_and(self, rhs: Self) -> Self {
        self & rhs
    }
    fn op_or(self, rhs: Self) -> Self {
        self | rhs
    }
    fn op_bitand(self, rhs: Self) -> Self {
        self & rhs
    }
    fn op_bitor(self, rhs: Self) -> Self {
        self | rhs
    }
    fn op_bitxor(self, rhs: Self) -> Self {
        self ^ rhs
    }
}
impl CastOps for bool {
    fn cast_to_int64(&self) -> i64 {
        *self as i64
    }
    fn cast_to_float64(&self) -> f64 {
        if *self {
            1.0
        } else {
            0.0
        }
    }
    fn cast_to_bool(&self) -> bool {
        *self
    }
}

macro_rules! impl_integer_ops {
    ($t:ty) => {
        impl UnaryEval for $t {
            fn op_neg(self) -> Self {
                self.wrapping_neg()
            }
            fn op_abs(self) -> Self {
                self.wrapping_abs()
            }
            fn op_bitnot(self) -> Self {
                !self
            }
        }
        impl BinaryEval for $t {
            fn op_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn op_sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            fn op_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn op_div(self, rhs: Self) -> Self {
                self / rhs
            }
            fn op_mod(self, rhs: Self) -> Self {
                self % rhs
            }
            fn op_pow(self, rhs: Self) -> Self {
                self.wrapping_pow(rhs as u32)
            }
            fn op_bitand(self, rhs: Self) -> Self {
                self & rhs
            }
            fn op_bitor(self, rhs: Self) -> Self {
                self | rhs
            }
            fn op_bitxor(self, rhs: Self) -> Self {
                self ^ rhs
            }
        }
        impl CastOps for $t {
            fn cast_to_int64(&self) -> i64 {
                *self as i64
            }
            fn cast_to_float64(&self) -> f64 {
                *self as f64
            }
            fn cast_to_bool(&self) -> bool {
                *self != 0
            }
        }
    };
}
impl_integer_ops!(i32);
impl_integer_ops!(i64);

macro_rules! impl_float_ops {
    ($t:ty) => {
        impl UnaryEval for $t {
            fn op_neg(self) -> Self {
                -self
            }
            fn op_abs(self) -> Self {
                self.abs()
            }
            fn op_sin(self) -> Self {
                self.sin()
            }
            fn op_cos(self) -> Self {
                self.cos()
            }
        }
        impl BinaryEval for $t {
            fn op_add(self, rhs: Self) -> Self {
                self + rhs
            }
            fn op_sub(self, rhs: Self) -> Self {
                self - rhs
            }
            fn op_mul(self, rhs: Self) -> Self {
                self * rhs
            }
            fn op_div(self, rhs: Self) -> Self {
                self / rhs
            }
            fn op_mod(self, rhs: Self) -> Self {
                self % rhs
            }
            fn op_pow(self, rhs: Self) -> Self {
                self.powf(rhs)
            }
        }
        impl CastOps for $t {
            fn cast_to_int64(&self) -> i64 {
                *self as i64
            }
            fn cast_to_float64(&self) -> f64 {
                *self as f64
            }
        }
    };
}
impl_float_ops!(f32);
impl_float_ops!(f64);

impl UnaryEval for DurationMicros {
    fn op_neg(self) -> Self {
        DurationMicros(-self.0)
    }
    fn op_abs(self) -> Self {
        DurationMicros(self.0.abs())
    }
}
impl BinaryEval for DurationMicros {
    fn op_add(self, rhs: Self) -> Self {
        DurationMicros(self.0 + rhs.0)
    }
    fn op_sub(self, rhs: Self) -> Self {
        DurationMicros(self.0 - rhs.0)
    }
}
impl CastOps for DurationMicros {}

impl UnaryEval for TimestampMicros {}
impl BinaryEval for TimestampMicros {
    // A timestamp minus a timestamp is, properly, a duration; the single-type dispatch
    // this evaluator uses for binary operators can't express that type change, so the
    // result is represented in the same timestamp-tagged storage. Downstream code that
    // needs an actual `DurationMicros` should re-tag the result explicitly.
    fn op_sub(self, rhs: Self) -> Self {
        TimestampMicros(self.0 - rhs.0)
    }
}
impl CastOps for TimestampMicros {}

impl UnaryEval for Decimal64 {
    fn op_neg(self) -> Self {
        Decimal64(-self.0)
    }
    fn op_abs(self) -> Self {
        Decimal64(self.0.abs())
    }
}
impl BinaryEval for Decimal64 {
    fn op_add(self, rhs: Self) -> Self {
        Decimal64(self.0 + rhs.0)
    }
    fn op_sub(self, rhs: Self) -> Self {
        Decimal64(self.0 - rhs.0)
    }
}
impl CastOps for Decimal64 {}

impl UnaryEval for Rc<String> {}
impl BinaryEval for Rc<String> {}
impl CastOps for Rc<String> {}

/// Default null propagation for a binary operator: the result is null unless both
/// operands are non-null. Every binary operator except equality uses this.
pub fn propagate_binary<T, F: FnOnce(T, T) -> T>(
    lhs: PossiblyNull<T>,
    rhs: PossiblyNull<T>,
    f: F,
) -> PossiblyNull<T> {
    match (lhs, rhs) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

/// Default null propagation for a unary operator: null in, null out.
pub fn propagate_unary<T, F: FnOnce(T) -> T>(value: PossiblyNull<T>, f: F) -> PossiblyNull<T> {
    value.map(f)
}

pub fn eval_unary<T: UnaryEval>(op: UnaryOp, value: PossiblyNull<T>) -> PossiblyNull<T> {
    propagate_unary(value, |a| match op {
        UnaryOp::Identity => a.op_identity(),
        UnaryOp::Neg => a.op_neg(),
        UnaryOp::Abs => a.op_abs(),
        UnaryOp::Sin => a.op_sin(),
        UnaryOp::Cos => a.op_cos(),
        UnaryOp::Not => a.op_not(),
        UnaryOp::BitNot => a.op_bitnot(),
        UnaryOp::CastToInt64 | UnaryOp::CastToFloat64 | UnaryOp::CastToBool => {
            unreachable!("cast operators change the element type and are dispatched separately")
        }
    })
}

pub fn eval_cast_to_int64<T: CastOps>(value: PossiblyNull<T>) -> PossiblyNull<i64> {
    value.map(|v| v.cast_to_int64())
}
pub fn eval_cast_to_float64<T: CastOps>(value: PossiblyNull<T>) -> PossiblyNull<f64> {
    value.map(|v| v.cast_to_float64())
}
pub fn eval_cast_to_bool<T: CastOps>(value: PossiblyNull<T>) -> PossiblyNull<bool> {
    value.map(|v| v.cast_to_bool())
}

pub fn eval_binary_same_type<T: BinaryEval>(
    op: BinaryOp,
    lhs: PossiblyNull<T>,
    rhs: PossiblyNull<T>,
) -> PossiblyNull<T> {
    propagate_binary(lhs, rhs, |a, b| match op {
        BinaryOp::Add => a.op_add(b),
        BinaryOp::Sub => a.op_sub(b),
        BinaryOp::Mul => a.op_mul(b),
        BinaryOp::Div => a.op_div(b),
        BinaryOp::Mod => a.op_mod(b),
        BinaryOp::Pow => a.op_pow(b),
        BinaryOp::LogicalAnd => a.op_and(b),
        BinaryOp::LogicalOr => a.op_or(b),
        BinaryOp::BitwiseAnd => a.op_bitand(b),
        BinaryOp::BitwiseOr => a.op_bitor(b),
        BinaryOp::BitwiseXor => a.op_bitxor(b),
        BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Less | BinaryOp::Greater
        | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
            unreachable!("comparison/equality operators are dispatched separately")
        }
    })
}

pub fn eval_comparison<T: PartialOrd>(
    op: BinaryOp,
    lhs: PossiblyNull<T>,
    rhs: PossiblyNull<T>,
) -> PossiblyNull<bool> {
    propagate_binary(lhs, rhs, |a, b| match op {
        BinaryOp::Less => a < b,
        BinaryOp::Greater => a > b,
        BinaryOp::LessEqual => a <= b,
        BinaryOp::GreaterEqual => a >= b,
        _ => unreachable!("eval_comparison called with a non-comparison operator"),
    })
}

/// Equality uses the construction-time null-equality policy; every other binary
/// operator uses default propagation regardless of the policy.
pub fn eval_equality<T: PartialEq>(
    op: BinaryOp,
    lhs: PossiblyNull<T>,
    rhs: PossiblyNull<T>,
    policy: NullEqualityPolicy,
) -> PossiblyNull<bool> {
    match op {
        BinaryOp::Equal => match (lhs, rhs) {
            (None, None) => Some(policy == NullEqualityPolicy::Equal),
            (Some(a), Some(b)) => Some(a == b),
            _ => None,
        },
        BinaryOp::NotEqual => propagate_binary(lhs, rhs, |a, b| a != b),
        _ => unreachable!("eval_equality called with a non-equality operator"),
    }
}

/// Whether `op` is defined for element type `t`. Consulted by `PlanBuilder` at
/// construction time; the per-type trait defaults above re-enforce the same boundary
/// at evaluation time as a second line of defense.
pub fn unary_is_valid(op: UnaryOp, t: DataType) -> bool {
    use DataType::*;
    use UnaryOp::*;
    match (op, t) {
        (Identity, _) => true,
        (Neg | Abs, Int32 | Int64 | Float32 | Float64 | DurationMicros | Decimal64) => true,
        (Sin | Cos, Float32 | Float64) => true,
        (Not, Bool) => true,
        (BitNot, Int32 | Int64) => true,
        (CastToInt64 | CastToFloat64, Bool | Int32 | Int64 | Float32 | Float64) => true,
        (CastToBool, Bool | Int32 | Int64) => true,
        _ => false,
    }
}

pub fn binary_is_valid(op: BinaryOp, t: DataType) -> bool {
    use BinaryOp::*;
    use DataType::*;
    match (op, t) {
        (Add, Int32 | Int64 | Float32 | Float64 | DurationMicros | Decimal64) => true,
        (Sub, Int32 | Int64 | Float32 | Float64 | DurationMicros | Decimal64 | TimestampMicros) => true,
        (Mul | Div | Mod | Pow, Int32 | Int64 | Float32 | Float64) => true,
        (Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual, _) => true,
        (LogicalAnd | LogicalOr, Bool) => true,
        (BitwiseAnd | BitwiseOr | BitwiseXor, Bool | Int32 | Int64) => true,
        _ => false,
    }
}

/// The `DataType` a unary operator produces given its operand type. Differs from the
/// operand type only for casts.
pub fn unary_result_type(op: UnaryOp, operand: DataType) -> DataType {
    match op {
        UnaryOp::CastToInt64 => DataType::Int64,
        UnaryOp::CastToFloat64 => DataType::Float64,
        UnaryOp::CastToBool => DataType::Bool,
        _ => operand,
    }
}

/// The `DataType` a binary operator produces given its (shared) operand type. Differs
/// from the operand type only for comparisons and equality, which always produce
/// `Bool`.
pub fn binary_result_type(op: BinaryOp, operand: DataType) -> DataType {
    use BinaryOp::*;
    match op {
        Equal | NotEqual | Less | Greater | LessEqual | GreaterEqual => DataType::Bool,
        _ => operand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_unary<T: UnaryEval>(op: UnaryOp, input: T, expected: T) {
        assert_eq!(eval_unary(op, Some(input)), Some(expected));
    }

    fn test_binary<T: BinaryEval>(op: BinaryOp, lhs: T, rhs: T, expected: T) {
        assert_eq!(eval_binary_same_type(op, Some(lhs), Some(rhs)), Some(expected));
    }

    #[test]
    fn unary_arithmetic() {
        test_unary(UnaryOp::Neg, 5i32, -5i32);
        test_unary(UnaryOp::Abs, -5i64, 5i64);
        test_unary(UnaryOp::Not, true, false);
        test_unary(UnaryOp::BitNot, 0i32, -1i32);
    }

    #[test]
    fn unary_propagates_null() {
        assert_eq!(eval_unary::<i32>(UnaryOp::Neg, None), None);
    }

    #[test]
    fn binary_arithmetic() {
        test_binary(BinaryOp::Add, 2i32, 3i32, 5i32);
        test_binary(BinaryOp::Mul, 2.0f64, 3.0f64, 6.0f64);
        test_binary(BinaryOp::BitwiseAnd, true, false, false);
    }

    #[test]
    fn binary_propagates_null() {
        assert_eq!(eval_binary_same_type(BinaryOp::Add, Some(1i32), None), None);
        assert_eq!(eval_binary_same_type::<i32>(BinaryOp::Add, None, None), None);
    }

    #[test]
    #[should_panic]
    fn invalid_unary_combination_panics() {
        eval_unary(UnaryOp::Sin, Some(1i32));
    }

    #[test]
    #[should_panic]
    fn invalid_binary_combination_panics() {
        eval_binary_same_type(BinaryOp::Mod, Some(true), Some(false));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval_comparison(BinaryOp::Less, Some(1i32), Some(2i32)), Some(true));
        assert_eq!(eval_comparison::<i32>(BinaryOp::Less, None, Some(2)), None);
    }

    #[test]
    fn equality_policy_governs_null_equal_null() {
        assert_eq!(
            eval_equality::<i32>(BinaryOp::Equal, None, None, NullEqualityPolicy::Equal),
            Some(true)
        );
        assert_eq!(
            eval_equality::<i32>(BinaryOp::Equal, None, None, NullEqualityPolicy::Unequal),
            Some(false)
        );
    }

    #[test]
    fn equality_between_one_null_one_valid_is_always_null() {
        assert_eq!(
            eval_equality(BinaryOp::Equal, Some(1i32), None, NullEqualityPolicy::Equal),
            None
        );
    }

    #[test]
    fn not_equal_ignores_policy_and_propagates() {
        assert_eq!(
            eval_equality::<i32>(BinaryOp::NotEqual, None, None, NullEqualityPolicy::Equal),
            None
        );
        assert_eq!(
            eval_equality(BinaryOp::NotEqual, Some(1i32), Some(2i32), NullEqualityPolicy::Equal),
            Some(true)
        );
    }

    #[test]
    fn casts() {
        assert_eq!(eval_cast_to_int64(Some(true)), Some(1i64));
        assert_eq!(eval_cast_to_float64(Some(4i32)), Some(4.0f64));
        assert_eq!(eval_cast_to_bool(Some(0i64)), Some(false));
    }

    #[test]
    fn validity_table_matches_functor_overrides() {
        assert!(binary_is_valid(BinaryOp::Add, DataType::Int32));
        assert!(!binary_is_valid(BinaryOp::Mod, DataType::Bool));
        assert!(binary_is_valid(BinaryOp::Equal, DataType::Utf8));
        assert!(unary_is_valid(UnaryOp::Sin, DataType::Float64));
        assert!(!unary_is_valid(UnaryOp::Sin, DataType::Int64));
    }
}
