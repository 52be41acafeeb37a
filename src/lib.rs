// ast-eval: columnar AST expression evaluator.
//
// Copyright (C) 2019  Brandon Lewis
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

//! Evaluates a flat, pre-validated arithmetic/logical/comparison expression over one
//! or two row-aligned tables, producing either a single scalar or a whole output
//! column. See `plan` for how a program is built and validated, and `eval` for how it
//! is run.

pub mod config;
pub mod eval;
pub mod intermediate;
pub mod operators;
pub mod plan;
pub mod reference;
pub mod resolver;
pub mod sink;
pub mod table;
pub mod types;

pub use config::EvaluatorConfig;
pub use eval::{evaluate_column, ExpressionEvaluator};
pub use operators::{BinaryOp, NullEqualityPolicy, Operator, UnaryOp};
pub use plan::{ExpressionPlan, PlanBuilder, PlanError};
pub use reference::{DataReference, ReferenceKind, TableSource};
pub use sink::{ColumnSink, ResultSink, ScalarSink};
pub use table::{AnyColumn, Column, Table};
pub use types::{DataType, Decimal64, DurationMicros, ElementType, PossiblyNull, Scalar, TimestampMicros};
