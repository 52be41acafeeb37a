//! Resolves a `DataReference` to a typed, possibly-null value.
//!
//! Grounded on `vm.rs::VM::get`/`load_immediate`: both dispatch on where a value lives
//! (stack slot, constant pool, ...) before reading it. Here the "where" is
//! `ReferenceKind`, and the destination type `T` is fixed by the caller's type dispatch
//! rather than discovered at the call site.

use crate::intermediate::IntermediateStorage;
use crate::reference::{DataReference, ReferenceKind, TableSource};
use crate::table::{FromAnyColumn, Table};
use crate::types::{ElementType, PossiblyNull, Scalar};

/// Extracts a `PossiblyNull<Self>` out of a `Scalar`. Panics on a type mismatch --
/// reachable only if a reference's declared `data_type` disagrees with the literal it
/// points at, which `PlanBuilder` should already have ruled out.
pub trait FromScalar: ElementType {
    fn from_scalar(scalar: &Scalar) -> PossiblyNull<Self>;
}

macro_rules! impl_from_scalar {
    ($t:ty, $variant:ident) => {
        impl FromScalar for $t {
            fn from_scalar(scalar: &Scalar) -> PossiblyNull<Self> {
                match scalar {
                    Scalar::$variant(v) => v.clone(),
                    other => panic!(
                        "resolver type mismatch: expected {:?} literal, found {:?}",
                        <$t as ElementType>::TAG,
                        other.data_type()
                    ),
                }
            }
        }
    };
}

impl_from_scalar!(bool, Bool);
impl_from_scalar!(i32, Int32);
impl_from_scalar!(i64, Int64);
impl_from_scalar!(f32, Float32);
impl_from_scalar!(f64, Float64);
impl_from_scalar!(crate::types::TimestampMicros, TimestampMicros);
impl_from_scalar!(crate::types::DurationMicros, DurationMicros);
impl_from_scalar!(crate::types::Decimal64, Decimal64);
impl_from_scalar!(std::rc::Rc<String>, Utf8);

/// Resolves `reference` against the literal pool, `left`/`right` tables, and the
/// per-row intermediate scratch, picking `left_row` or `right_row` according to
/// `reference.table_source`.
pub fn resolve<T>(
    reference: &DataReference,
    literals: &[Scalar],
    left: &Table,
    right: &Table,
    intermediates: &IntermediateStorage,
    left_row: usize,
    right_row: usize,
) -> PossiblyNull<T>
where
    T: ElementType + FromScalar + FromAnyColumn,
{
    match reference.kind {
        ReferenceKind::Column => {
            debug_assert!(
                reference.table_source != TableSource::Output,
                "a column reference may not read from the OUTPUT table source"
            );
            let (table, row) = match reference.table_source {
                TableSource::Left => (left, left_row),
                TableSource::Right => (right, right_row),
                TableSource::Output => unreachable!("rejected by the debug_assert above"),
            };
            let column = table.column::<T>(reference.data_index as usize);
            if column.is_valid(row) {
                Some(column.element(row).clone())
            } else {
                None
            }
        }
        ReferenceKind::Literal => T::from_scalar(&literals[reference.data_index as usize]),
        ReferenceKind::Intermediate => intermediates.read::<T>(reference.data_index as usize),
    }
}
