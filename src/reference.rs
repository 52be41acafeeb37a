//! Data references: operand descriptors a plan's operators index into.
//!
//! Grounded on `vm.rs::Opcode` -- a small `Copy` enum describing one step of work over
//! explicit, address-like operands -- generalized here to describe *where a value comes
//! from* rather than *what to do with it*.

use crate::types::DataType;

/// Where a reference's `data_index` should be looked up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A column of `left` or `right`, selected by `table_source`.
    Column,
    /// An entry in the plan's literal pool.
    Literal,
    /// A slot in the per-row intermediate scratch.
    Intermediate,
}

/// Which table a `Column` reference's `data_index` selects into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableSource {
    Left,
    Right,
    /// The terminal output column. Only ever valid as the *output* reference of the
    /// last operator; never a legal input -- see `PlanError::OutputAsInput`.
    Output,
}

/// An immutable descriptor of one operand or result slot. `table_source` is only
/// meaningful when `kind == Column`; callers constructing `Literal`/`Intermediate`
/// references should use the convenience constructors below rather than populate it
/// themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataReference {
    pub kind: ReferenceKind,
    pub data_type: DataType,
    pub data_index: u32,
    pub table_source: TableSource,
}

impl DataReference {
    pub fn column(data_type: DataType, data_index: u32, table_source: TableSource) -> Self {
        DataReference {
            kind: ReferenceKind::Column,
            data_type,
            data_index,
            table_source,
        }
    }

    pub fn literal(data_type: DataType, data_index: u32) -> Self {
        DataReference {
            kind: ReferenceKind::Literal,
            data_type,
            data_index,
            table_source: TableSource::Output,
        }
    }

    pub fn intermediate(data_type: DataType, data_index: u32) -> Self {
        DataReference {
            kind: ReferenceKind::Intermediate,
            data_type,
            data_index,
            table_source: TableSource::Output,
        }
    }

    /// The terminal output reference of a plan's last operator.
    pub fn output(data_type: DataType, data_index: u32) -> Self {
        DataReference {
            kind: ReferenceKind::Column,
            data_type,
            data_index,
            table_source: TableSource::Output,
        }
    }
}
