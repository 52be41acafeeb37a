//! `ExpressionPlan`: the flat, validated program the evaluator runs, and the
//! `PlanBuilder` that constructs one.
//!
//! Grounded on `vm.rs::Program` (a flat code+data aggregate with no internal
//! recursion) and `vm.rs::Error` (a hand-rolled, `Debug`-derived, flat enum -- this
//! crate follows the rest of the teacher repo in not reaching for `thiserror`).

use crate::operators::{binary_is_valid, binary_result_type, unary_is_valid, unary_result_type, Operator};
use crate::reference::{DataReference, ReferenceKind, TableSource};
use crate::types::{fits_in_intermediate, DataType, Scalar};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq)]
pub enum PlanError {
    /// A plan with no operators at all.
    EmptyProgram,
    /// An operand index does not address a valid entry in `references` (or a
    /// `Literal` reference's `data_index` does not address a valid entry in
    /// `literals`).
    DanglingReference { operand_index: u32 },
    /// An `Intermediate` reference is read before any operator has written that slot.
    UseBeforeDef { slot: u32 },
    /// An `Intermediate` reference's `data_index` is not less than the plan's declared
    /// intermediate capacity.
    IntermediateOutOfRange { slot: u32, capacity: usize },
    /// An `Intermediate` reference's `data_type` does not fit in 8 bytes.
    OversizedIntermediate { data_type: DataType },
    /// An (operator, element type) combination that has no defined semantics.
    InvalidOperatorType { operator: Operator, data_type: DataType },
    /// Two operand references (or an operand and its declared output) disagree on
    /// element type where the plan requires them to match.
    OperandTypeMismatch { expected: DataType, found: DataType },
    /// A `Column` reference with `table_source == Output` is used as an operator
    /// input rather than as the plan's terminal output.
    OutputAsInput { reference_index: u32 },
    /// Either the last operator's output is not a `Column` reference with
    /// `table_source == Output`, or some non-last operator's output is.
    MissingTerminalOutput,
}

/// A flattened, validated operator program: operators in evaluation order, their
/// operand references as one flat index stream, the reference table those indices
/// address, and the literal pool `Literal` references draw from.
pub struct ExpressionPlan {
    pub(crate) operators: Vec<Operator>,
    pub(crate) operand_indices: Vec<u32>,
    pub(crate) references: Vec<DataReference>,
    pub(crate) literals: Vec<Scalar>,
    pub(crate) num_intermediates: usize,
}

impl ExpressionPlan {
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn num_intermediates(&self) -> usize {
        self.num_intermediates
    }

    /// The reference the plan's last operator writes its result to.
    pub fn terminal_output(&self) -> &DataReference {
        let mut cursor = 0usize;
        for (index, op) in self.operators.iter().enumerate() {
            let arity = op.arity();
            if index + 1 == self.operators.len() {
                return &self.references[self.operand_indices[cursor + arity] as usize];
            }
            cursor += arity + 1;
        }
        unreachable!("PlanBuilder::build rejects empty plans")
    }
}

/// Accumulates operators, operand references, and literals, then validates the whole
/// program's invariants at once in `build`.
pub struct PlanBuilder {
    literals: Vec<Scalar>,
    references: Vec<DataReference>,
    operators: Vec<Operator>,
    operand_indices: Vec<u32>,
    num_intermediates: usize,
}

impl PlanBuilder {
    pub fn new(num_intermediates: usize) -> Self {
        PlanBuilder {
            literals: Vec::new(),
            references: Vec::new(),
            operators: Vec::new(),
            operand_indices: Vec::new(),
            num_intermediates,
        }
    }

    pub fn push_literal(&mut self, scalar: Scalar) -> u32 {
        let index = self.literals.len() as u32;
        self.literals.push(scalar);
        index
    }

    pub fn push_reference(&mut self, reference: DataReference) -> u32 {
        let index = self.references.len() as u32;
        self.references.push(reference);
        index
    }

    pub fn push_unary(&mut self, op: crate::operators::UnaryOp, input: u32, output: u32) -> &mut Self {
        self.operators.push(Operator::Unary(op));
        self.operand_indices.push(input);
        self.operand_indices.push(output);
        self
    }

    pub fn push_binary(
        &mut self,
        op: crate::operators::BinaryOp,
        lhs: u32,
        rhs: u32,
        output: u32,
    ) -> &mut Self {
        self.operators.push(Operator::Binary(op));
        self.operand_indices.push(lhs);
        self.operand_indices.push(rhs);
        self.operand_indices.push(output);
        self
    }

    pub fn build(self) -> Result<ExpressionPlan, PlanError> {
        if self.operators.is_empty() {
            return Err(PlanError::EmptyProgram);
        }

        for &index in &self.operand_indices {
            if index as usize >= self.references.len() {
                return Err(PlanError::DanglingReference { operand_index: index });
            }
        }
        for reference in &self.references {
            if reference.kind == ReferenceKind::Literal
                && reference.data_index as usize >= self.literals.len()
            {
                return Err(PlanError::DanglingReference {
                    operand_index: reference.data_index,
                });
            }
        }

        let mut defined_intermediates: HashSet<u32> = HashSet::new();
        let mut cursor = 0usize;
        let last_operator = self.operators.len() - 1;

        for (op_index, op) in self.operators.iter().enumerate() {
            let arity = op.arity();
            let input_positions = &self.operand_indices[cursor..cursor + arity];
            let output_position = self.operand_indices[cursor + arity];
            cursor += arity + 1;

            let inputs: Vec<&DataReference> =
                input_positions.iter().map(|&i| &self.references[i as usize]).collect();
            let output = &self.references[output_position as usize];

            for (&position, reference) in input_positions.iter().zip(inputs.iter()) {
                if reference.kind == ReferenceKind::Column
                    && reference.table_source == TableSource::Output
                {
                    return Err(PlanError::OutputAsInput { reference_index: position });
                }
                if reference.kind == ReferenceKind::Intermediate {
                    if reference.data_index as usize >= self.num_intermediates {
                        return Err(PlanError::IntermediateOutOfRange {
                            slot: reference.data_index,
                            capacity: self.num_intermediates,
                        });
                    }
                    if !defined_intermediates.contains(&reference.data_index) {
                        return Err(PlanError::UseBeforeDef { slot: reference.data_index });
                    }
                }
            }

            let result_type = match op {
                Operator::Unary(uop) => {
                    if !unary_is_valid(*uop, inputs[0].data_type) {
                        return Err(PlanError::InvalidOperatorType {
                            operator: *op,
                            data_type: inputs[0].data_type,
                        });
                    }
                    unary_result_type(*uop, inputs[0].data_type)
                }
                Operator::Binary(bop) => {
                    if inputs[0].data_type != inputs[1].data_type {
                        return Err(PlanError::OperandTypeMismatch {
                            expected: inputs[0].data_type,
                            found: inputs[1].data_type,
                        });
                    }
                    if !binary_is_valid(*bop, inputs[0].data_type) {
                        return Err(PlanError::InvalidOperatorType {
                            operator: *op,
                            data_type: inputs[0].data_type,
                        });
                    }
                    binary_result_type(*bop, inputs[0].data_type)
                }
            };

            if result_type != output.data_type {
                return Err(PlanError::OperandTypeMismatch {
                    expected: result_type,
                    found: output.data_type,
                });
            }

            match output.kind {
                ReferenceKind::Intermediate => {
                    if output.data_index as usize >= self.num_intermediates {
                        return Err(PlanError::IntermediateOutOfRange {
                            slot: output.data_index,
                            capacity: self.num_intermediates,
                        });
                    }
                    if !fits_in_intermediate(output.data_type) {
                        return Err(PlanError::OversizedIntermediate {
                            data_type: output.data_type,
                        });
                    }
                    if op_index == last_operator {
                        return Err(PlanError::MissingTerminalOutput);
                    }
                    defined_intermediates.insert(output.data_index);
                }
                ReferenceKind::Column => {
                    if output.table_source != TableSource::Output || op_index != last_operator {
                        return Err(PlanError::MissingTerminalOutput);
                    }
                }
                ReferenceKind::Literal => return Err(PlanError::MissingTerminalOutput),
            }
        }

        Ok(ExpressionPlan {
            operators: self.operators,
            operand_indices: self.operand_indices,
            references: self.references,
            literals: self.literals,
            num_intermediates: self.num_intermediates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{BinaryOp, UnaryOp};

    fn col(dt: DataType, index: u32, source: TableSource) -> DataReference {
        DataReference::column(dt, index, source)
    }

    #[test]
    fn rejects_empty_program() {
        let builder = PlanBuilder::new(0);
        assert_eq!(builder.build().unwrap_err(), PlanError::EmptyProgram);
    }

    #[test]
    fn builds_single_column_addition() {
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(col(DataType::Int64, 0, TableSource::Left));
        let b = builder.push_reference(col(DataType::Int64, 0, TableSource::Right));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, a, b, out);
        let plan = builder.build().expect("valid plan");
        assert_eq!(plan.operators().len(), 1);
    }

    #[test]
    fn rejects_dangling_reference() {
        let mut builder = PlanBuilder::new(0);
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_unary(UnaryOp::Identity, 99, out);
        assert_eq!(
            builder.build().unwrap_err(),
            PlanError::DanglingReference { operand_index: 99 }
        );
    }

    #[test]
    fn rejects_use_before_def() {
        let mut builder = PlanBuilder::new(1);
        let intermediate_in = builder.push_reference(DataReference::intermediate(DataType::Int64, 0));
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_unary(UnaryOp::Identity, intermediate_in, out);
        assert_eq!(
            builder.build().unwrap_err(),
            PlanError::UseBeforeDef { slot: 0 }
        );
    }

    #[test]
    fn rejects_oversized_intermediate() {
        let mut builder = PlanBuilder::new(1);
        let a = builder.push_reference(col(DataType::Utf8, 0, TableSource::Left));
        let intermediate_out = builder.push_reference(DataReference::intermediate(DataType::Utf8, 0));
        builder.push_unary(UnaryOp::Identity, a, intermediate_out);
        assert_eq!(
            builder.build().unwrap_err(),
            PlanError::OversizedIntermediate { data_type: DataType::Utf8 }
        );
    }

    #[test]
    fn rejects_invalid_operator_type() {
        let mut builder = PlanBuilder::new(0);
        let a = builder.push_reference(col(DataType::Bool, 0, TableSource::Left));
        let out = builder.push_reference(DataReference::output(DataType::Bool, 0));
        builder.push_unary(UnaryOp::Sin, a, out);
        assert_eq!(
            builder.build().unwrap_err(),
            PlanError::InvalidOperatorType {
                operator: Operator::Unary(UnaryOp::Sin),
                data_type: DataType::Bool
            }
        );
    }

    #[test]
    fn rejects_output_as_input() {
        let mut builder = PlanBuilder::new(0);
        let bogus_input = builder.push_reference(col(DataType::Int32, 0, TableSource::Output));
        let out = builder.push_reference(DataReference::output(DataType::Int32, 0));
        builder.push_unary(UnaryOp::Identity, bogus_input, out);
        assert_eq!(
            builder.build().unwrap_err(),
            PlanError::OutputAsInput { reference_index: bogus_input }
        );
    }

    #[test]
    fn rejects_missing_terminal_output() {
        let mut builder = PlanBuilder::new(1);
        let a = builder.push_reference(col(DataType::Int32, 0, TableSource::Left));
        let intermediate_out = builder.push_reference(DataReference::intermediate(DataType::Int32, 0));
        builder.push_unary(UnaryOp::Identity, a, intermediate_out);
        assert_eq!(builder.build().unwrap_err(), PlanError::MissingTerminalOutput);
    }

    #[test]
    fn intermediate_reuse_across_two_operators() {
        let mut builder = PlanBuilder::new(1);
        let a = builder.push_reference(col(DataType::Int64, 0, TableSource::Left));
        let t0 = builder.push_reference(DataReference::intermediate(DataType::Int64, 0));
        builder.push_unary(UnaryOp::Neg, a, t0);
        let out = builder.push_reference(DataReference::output(DataType::Int64, 0));
        builder.push_binary(BinaryOp::Add, t0, t0, out);
        assert!(builder.build().is_ok());
    }
}
