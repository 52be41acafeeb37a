//! The evaluator: walks a validated plan's flat operator stream, row by row.
//!
//! Grounded on `vm.rs::VM::exec`/`step`/`dispatch`: a fetch-operand, dispatch-on-
//! opcode, advance loop over a flat instruction stream, with no recursion and no
//! per-step heap allocation. The type dispatch this module performs (picking a
//! monomorphic element type from a runtime `DataType` tag) has no direct analogue in
//! `vm.rs` -- there, `Value` carries its type at runtime in every instance -- so
//! `dispatch_data_type!` is new machinery, built the way `vm.rs`'s `operator!` macro
//! builds its whitelist match, generalized from "one arm per `Value` variant" to "one
//! arm per element type".

use crate::intermediate::IntermediateStorage;
use crate::operators::{
    eval_binary_same_type, eval_cast_to_bool, eval_cast_to_float64, eval_cast_to_int64, eval_comparison,
    eval_equality, eval_unary, BinaryOp, NullEqualityPolicy, Operator, UnaryOp,
};
use crate::plan::ExpressionPlan;
use crate::reference::{DataReference, ReferenceKind};
use crate::resolver::resolve;
use crate::sink::ResultSink;
use crate::table::Table;
use crate::types::{Decimal64, DurationMicros, ElementType, PossiblyNull, TimestampMicros};
use std::any::Any;
use std::rc::Rc;

/// Expands to one match arm per `DataType` variant, each binding `$T` to that
/// variant's representative Rust storage type before running `$body`. The single
/// source of the type-dispatch table the rest of this module relies on.
macro_rules! dispatch_data_type {
    ($data_type:expr, $t:ident => $body:block) => {
        match $data_type {
            crate::types::DataType::Bool => {
                type $t = bool;
                $body
            }
            crate::types::DataType::Int32 => {
                type $t = i32;
                $body
            }
            crate::types::DataType::Int64 => {
                type $t = i64;
                $body
            }
            crate::types::DataType::Float32 => {
                type $t = f32;
                $body
            }
            crate::types::DataType::Float64 => {
                type $t = f64;
                $body
            }
            crate::types::DataType::TimestampMicros => {
                type $t = TimestampMicros;
                $body
            }
            crate::types::DataType::DurationMicros => {
                type $t = DurationMicros;
                $body
            }
            crate::types::DataType::Decimal64 => {
                type $t = Decimal64;
                $body
            }
            crate::types::DataType::Utf8 => {
                type $t = Rc<String>;
                $body
            }
        }
    };
}

/// Bridges an operator's locally-computed result type `T` to the sink's fixed output
/// type `Out`. For every operator but the plan's last, the result only ever feeds an
/// `Intermediate` reference and this function is never called. For the last operator,
/// plan validation (`unary_result_type`/`binary_result_type` checked against the
/// terminal reference's declared `data_type`) guarantees `T == Out`; the downcast
/// below is how that guarantee crosses the generic boundary since Rust cannot express
/// "these two type parameters are equal" directly. A mismatch here is the same class
/// of programmer error as an invalid (operator, type) combination.
fn into_output<T: ElementType, Out: ElementType>(value: PossiblyNull<T>) -> PossiblyNull<Out> {
    let boxed: Box<dyn Any> = Box::new(value);
    match boxed.downcast::<PossiblyNull<Out>>() {
        Ok(v) => *v,
        Err(_) => panic!(
            "plan output type ({:?}) does not match the result sink's element type ({:?}) -- this indicates an invalid plan",
            T::TAG,
            Out::TAG
        ),
    }
}

/// Evaluates one compiled expression plan against a pair of row-aligned tables
/// (`left`/`right`), one row-pair at a time. Owns a per-instance `IntermediateStorage`
/// scratch, sized from the plan -- the host analogue of the fixed-size scratch a
/// single GPU thread would hold across the lifetime of one row's evaluation. A
/// parallel caller should construct one `ExpressionEvaluator` per worker, each with
/// its own intermediate scratch; nothing here shares mutable state across rows other
/// than those scratch bytes, which every row overwrites before reading (`PlanBuilder`
/// rejects any plan that would read a slot before writing it).
pub struct ExpressionEvaluator<'a> {
    left: &'a Table,
    right: &'a Table,
    plan: &'a ExpressionPlan,
    intermediates: IntermediateStorage,
    null_equality_policy: NullEqualityPolicy,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(
        left: &'a Table,
        right: &'a Table,
        plan: &'a ExpressionPlan,
        null_equality_policy: NullEqualityPolicy,
    ) -> Self {
        ExpressionEvaluator {
            left,
            right,
            plan,
            intermediates: IntermediateStorage::new(plan.num_intermediates()),
            null_equality_policy,
        }
    }

    /// Convenience constructor for a plan that reads from a single table as both
    /// `left` and `right`.
    pub fn with_single_table(
        table: &'a Table,
        plan: &'a ExpressionPlan,
        null_equality_policy: NullEqualityPolicy,
    ) -> Self {
        Self::new(table, table, plan, null_equality_policy)
    }

    /// Shorthand for `evaluate(sink, row, row, row)`, for the common case where the
    /// input and output row alignments coincide (no join, single table driving both
    /// sides).
    pub fn evaluate_aligned<Out: ElementType, S: ResultSink<Out>>(&mut self, sink: &mut S, row: usize) {
        self.evaluate(sink, row, row, row);
    }

    /// Evaluates the plan for one row pair, writing its one result to `sink` at
    /// `output_row`. `Out` is the sink's declared element type; it must match the
    /// plan's terminal output type (see `into_output`).
    pub fn evaluate<Out: ElementType, S: ResultSink<Out>>(
        &mut self,
        sink: &mut S,
        left_row: usize,
        right_row: usize,
        output_row: usize,
    ) {
        let mut cursor = 0usize;

        for op in self.plan.operators().iter().copied() {
            match op {
                Operator::Unary(uop) => {
                    let in_ref = self.plan_reference(cursor);
                    let out_ref = self.plan_reference(cursor + 1);
                    cursor += 2;
                    self.evaluate_unary(uop, in_ref, out_ref, left_row, right_row, output_row, sink);
                }
                Operator::Binary(bop) => {
                    let lhs_ref = self.plan_reference(cursor);
                    let rhs_ref = self.plan_reference(cursor + 1);
                    let out_ref = self.plan_reference(cursor + 2);
                    cursor += 3;
                    self.evaluate_binary(bop, lhs_ref, rhs_ref, out_ref, left_row, right_row, output_row, sink);
                }
            }
        }
    }

    fn plan_reference(&self, operand_position: usize) -> DataReference {
        let index = self.plan.operand_indices[operand_position];
        self.plan.references[index as usize]
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_unary<Out: ElementType, S: ResultSink<Out>>(
        &mut self,
        op: UnaryOp,
        in_ref: DataReference,
        out_ref: DataReference,
        left_row: usize,
        right_row: usize,
        output_row: usize,
        sink: &mut S,
    ) {
        dispatch_data_type!(in_ref.data_type, T => {
            let value: PossiblyNull<T> = resolve(&in_ref, &self.plan.literals, self.left, self.right, &self.intermediates, left_row, right_row);
            match op {
                UnaryOp::CastToInt64 => {
                    let result = eval_cast_to_int64(value);
                    self.write_output(&out_ref, result, sink, output_row);
                }
                UnaryOp::CastToFloat64 => {
                    let result = eval_cast_to_float64(value);
                    self.write_output(&out_ref, result, sink, output_row);
                }
                UnaryOp::CastToBool => {
                    let result = eval_cast_to_bool(value);
                    self.write_output(&out_ref, result, sink, output_row);
                }
                _ => {
                    let result: PossiblyNull<T> = eval_unary(op, value);
                    self.write_output(&out_ref, result, sink, output_row);
                }
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_binary<Out: ElementType, S: ResultSink<Out>>(
        &mut self,
        op: BinaryOp,
        lhs_ref: DataReference,
        rhs_ref: DataReference,
        out_ref: DataReference,
        left_row: usize,
        right_row: usize,
        output_row: usize,
        sink: &mut S,
    ) {
        dispatch_data_type!(lhs_ref.data_type, T => {
            let lhs: PossiblyNull<T> = resolve(&lhs_ref, &self.plan.literals, self.left, self.right, &self.intermediates, left_row, right_row);
            let rhs: PossiblyNull<T> = resolve(&rhs_ref, &self.plan.literals, self.left, self.right, &self.intermediates, left_row, right_row);
            match op {
                BinaryOp::Equal | BinaryOp::NotEqual => {
                    let result = eval_equality(op, lhs, rhs, self.null_equality_policy);
                    self.write_output(&out_ref, result, sink, output_row);
                }
                BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
                    let result = eval_comparison(op, lhs, rhs);
                    self.write_output(&out_ref, result, sink, output_row);
                }
                _ => {
                    let result: PossiblyNull<T> = eval_binary_same_type(op, lhs, rhs);
                    self.write_output(&out_ref, result, sink, output_row);
                }
            }
        });
    }

    fn write_output<T: ElementType, Out: ElementType, S: ResultSink<Out>>(
        &mut self,
        out_ref: &DataReference,
        result: PossiblyNull<T>,
        sink: &mut S,
        output_row: usize,
    ) {
        match out_ref.kind {
            ReferenceKind::Intermediate => {
                self.intermediates.write(out_ref.data_index as usize, result);
            }
            ReferenceKind::Column => {
                sink.set_value(output_row, into_output::<T, Out>(result));
            }
            ReferenceKind::Literal => {
                unreachable!("a literal cannot be used as an output reference -- rejected by PlanBuilder")
            }
        }
    }
}

/// Evaluates `plan` once per row of `left`/`right` (which must have the same row
/// count), writing each row's result into `sink`. The ambient, host-side stand-in for
/// "one cooperating thread per row": every row gets its own `left_row`/`right_row`/
/// `output_row` index but shares no mutable state with any other row beyond what a
/// fresh `ExpressionEvaluator` already owns privately.
pub fn evaluate_column<Out: ElementType, S: ResultSink<Out>>(
    plan: &ExpressionPlan,
    left: &Table,
    right: &Table,
    null_equality_policy: NullEqualityPolicy,
    sink: &mut S,
) {
    assert_eq!(
        left.num_rows(),
        right.num_rows(),
        "left and right tables must have the same row count"
    );
    let mut evaluator = ExpressionEvaluator::new(left, right, plan, null_equality_policy);
    for row in 0..left.num_rows() {
        evaluator.evaluate(sink, row, row, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::UnaryOp;
    use crate::plan::PlanBuilder;
    use crate::reference::{DataReference, TableSource};
    use crate::sink::{ColumnSink, ScalarSink};
    use crate::table::{AnyColumn, Column};
    use crate::types::{DataType, Scalar};

    fn two_column_tables() -> (Table, Table) {
        let left = Table::new(vec![AnyColumn::Int64(Column::new(vec![1, 2, 3]))]);
        let right = Table::new(vec![AnyColumn::Int64(Column::new(vec![10, 20, 30]))]);
        (left, right)
    }

    // Scenario A: single-column addition.
    #[test]
    fn adds_two_columns() {
        let (left, right) = two_column_tables();
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Left));
        let b = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, a, b, out);
        let plan = builder.build().unwrap();

        let mut output = Column::new(vec![0i64; 3]);
        {
            let mut sink = ColumnSink::new(&mut output);
            evaluate_column(&plan, &left, &right, NullEqualityPolicy::Equal, &mut sink);
        }
        assert_eq!(*output.element(0), 11);
        assert_eq!(*output.element(1), 22);
        assert_eq!(*output.element(2), 33);
    }

    // Scenario B: null propagation through arithmetic.
    #[test]
    fn null_propagates_through_addition() {
        let left = Table::new(vec![AnyColumn::Int64(Column::with_validity(
            vec![1, 2, 3],
            vec![true, false, true],
        ))]);
        let right = Table::new(vec![AnyColumn::Int64(Column::new(vec![10, 20, 30]))]);
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Left));
        let b = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, a, b, out);
        let plan = builder.build().unwrap();

        let mut output = Column::new(vec![0i64; 3]);
        {
            let mut sink = ColumnSink::new(&mut output);
            evaluate_column(&plan, &left, &right, NullEqualityPolicy::Equal, &mut sink);
        }
        assert!(output.is_valid(0));
        assert!(!output.is_valid(1));
        assert!(output.is_valid(2));
    }

    fn single_row_equal_plan(policy: NullEqualityPolicy) -> (ExpressionPlan, Table, Table) {
        let left = Table::new(vec![AnyColumn::Int32(Column::with_validity(vec![0], vec![false]))]);
        let right = Table::new(vec![AnyColumn::Int32(Column::with_validity(vec![0], vec![false]))]);
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int32, 0, TableSource::Left));
        let b = builder.push_reference(DataReference::column(DataType::Int32, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Bool, 0));
        builder.push_binary(BinaryOp::Equal, a, b, out);
        let _ = policy;
        (builder.build().unwrap(), left, right)
    }

    // Scenario C: EQUAL null-equality policy.
    #[test]
    fn equal_policy_treats_null_equal_null_as_true() {
        let (plan, left, right) = single_row_equal_plan(NullEqualityPolicy::Equal);
        let mut evaluator = ExpressionEvaluator::new(&left, &right, &plan, NullEqualityPolicy::Equal);
        let mut sink: ScalarSink<bool> = ScalarSink::new();
        evaluator.evaluate(&mut sink, 0, 0, 0);
        assert_eq!(sink.value(), Some(true));
    }

    // Scenario D: UNEQUAL null-equality policy.
    #[test]
    fn unequal_policy_treats_null_equal_null_as_false() {
        let (plan, left, right) = single_row_equal_plan(NullEqualityPolicy::Unequal);
        let mut evaluator = ExpressionEvaluator::new(&left, &right, &plan, NullEqualityPolicy::Unequal);
        let mut sink: ScalarSink<bool> = ScalarSink::new();
        evaluator.evaluate(&mut sink, 0, 0, 0);
        assert_eq!(sink.value(), Some(false));
    }

    // Scenario E: binary evaluation across two tables with differing row indices.
    #[test]
    fn evaluates_against_distinct_left_and_right_rows() {
        let (left, right) = two_column_tables();
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Left));
        let b = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, a, b, out);
        let plan = builder.build().unwrap();

        let mut evaluator = ExpressionEvaluator::new(&left, &right, &plan, NullEqualityPolicy::Equal);
        let mut sink: ScalarSink<i64> = ScalarSink::new();
        evaluator.evaluate(&mut sink, 0, 2, 0);
        assert_eq!(sink.value(), Some(1 + 30));
    }

    // Scenario F: intermediate reuse -- (-a) + (-a).
    #[test]
    fn reuses_an_intermediate_slot() {
        let left = Table::new(vec![AnyColumn::Int64(Column::new(vec![5]))]);
        let right = Table::new(vec![AnyColumn::Int64(Column::new(vec![0]))]);
        let mut builder = PlanBuilder::new(1);
        let a = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Left));
        let t0 = builder.push_reference(DataReference::intermediate(DataType::Int64, 0));
        builder.push_unary(UnaryOp::Neg, a, t0);
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, t0, t0, out);
        let plan = builder.build().unwrap();

        let mut evaluator = ExpressionEvaluator::new(&left, &right, &plan, NullEqualityPolicy::Equal);
        let mut sink: ScalarSink<i64> = ScalarSink::new();
        evaluator.evaluate(&mut sink, 0, 0, 0);
        assert_eq!(sink.value(), Some(-10));
    }

    #[test]
    fn literal_addition_x_plus_zero_is_identity() {
        let left = Table::new(vec![AnyColumn::Int32(Column::new(vec![7, -3, 0]))]);
        let right = Table::new(vec![AnyColumn::Int32(Column::new(vec![0, 0, 0]))]);
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int32, 0, TableSource::Left));
        let zero = builder.push_literal(Scalar::Int32(Some(0)));
        let zero_ref = builder.push_reference(DataReference::literal(DataType::Int32, zero));
        let out = builder.push_reference(DataReference::output(DataType::Int32, 0));
        builder.push_binary(BinaryOp::Add, a, zero_ref, out);
        let plan = builder.build().unwrap();

        let mut output = Column::new(vec![0i32; 3]);
        {
            let mut sink = ColumnSink::new(&mut output);
            evaluate_column(&plan, &left, &right, NullEqualityPolicy::Equal, &mut sink);
        }
        assert_eq!(*output.element(0), 7);
        assert_eq!(*output.element(1), -3);
        assert_eq!(*output.element(2), 0);
    }

    #[test]
    fn row_evaluation_is_order_independent() {
        let (left, right) = two_column_tables();
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Left));
        let b = builder.push_reference(DataReference::column(DataType::Int64, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, a, b, out);
        let plan = builder.build().unwrap();

        let mut forward = Column::new(vec![0i64; 3]);
        {
            let mut sink = ColumnSink::new(&mut forward);
            evaluate_column(&plan, &left, &right, NullEqualityPolicy::Equal, &mut sink);
        }

        let mut evaluator = ExpressionEvaluator::new(&left, &right, &plan, NullEqualityPolicy::Equal);
        let mut backward = Column::new(vec![0i64; 3]);
        {
            let mut sink = ColumnSink::new(&mut backward);
            for row in (0..3).rev() {
                evaluator.evaluate(&mut sink, row, row, row);
            }
        }
        for row in 0..3 {
            assert_eq!(forward.element(row), backward.element(row));
        }
    }
}
