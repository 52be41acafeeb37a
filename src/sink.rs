//! Result sinks: the two ways a plan's terminal output can be consumed.
//!
//! Grounded on `vm.rs::Output`, a capability-set trait multiple concrete renderers
//! implement, selected statically by the caller rather than through a `dyn` object.
//! `ResultSink<T>` plays the same role for the evaluator's single write per row.

use crate::table::Column;
use crate::types::{ElementType, PossiblyNull};

/// Something the last operator of a plan can write its one result into. Implemented
/// for a single, statically-known element type `T` per sink instance -- the caller
/// already knows, from the plan it built, what `T` the terminal output reference
/// declares.
pub trait ResultSink<T: ElementType> {
    fn set_value(&mut self, row_index: usize, value: PossiblyNull<T>);
}

/// Captures a single nullable value, written at most once per evaluation. Used when
/// the caller evaluates a plan against one fixed pair of rows rather than an entire
/// column.
pub struct ScalarSink<T: ElementType> {
    written: Option<PossiblyNull<T>>,
}

impl<T: ElementType> ScalarSink<T> {
    pub fn new() -> Self {
        ScalarSink { written: None }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.written, Some(Some(_)))
    }

    pub fn value(&self) -> PossiblyNull<T> {
        self.written
            .clone()
            .unwrap_or_else(|| panic!("scalar sink read before an evaluation wrote a value"))
    }
}

impl<T: ElementType> Default for ScalarSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ElementType> ResultSink<T> for ScalarSink<T> {
    fn set_value(&mut self, _row_index: usize, value: PossiblyNull<T>) {
        self.written = Some(value);
    }
}

/// A non-owning handle to a destination column, written one row at a time across many
/// evaluations of the same plan.
pub struct ColumnSink<'a, T: ElementType> {
    column: &'a mut Column<T>,
}

impl<'a, T: ElementType> ColumnSink<'a, T> {
    pub fn new(column: &'a mut Column<T>) -> Self {
        ColumnSink { column }
    }
}

impl<'a, T: ElementType> ResultSink<T> for ColumnSink<'a, T> {
    fn set_value(&mut self, row_index: usize, value: PossiblyNull<T>) {
        self.column.set(row_index, value);
    }
}
