//! In-memory column storage: the minimal stand-in for the device table views the
//! evaluator reads from. This is ambient collaborator machinery -- a real caller
//! supplies its own column/table abstraction -- grounded on `data.rs::State`'s plain,
//! typed, host-resident data container for its construction style.

use crate::types::{DataType, Decimal64, DurationMicros, ElementType, TimestampMicros};
use std::rc::Rc;

/// A single typed, nullable column. `validity` is `None` when every value is known
/// valid -- the common case -- and only materializes once a null is written.
#[derive(Clone, Debug)]
pub struct Column<T: ElementType> {
    values: Vec<T>,
    validity: Option<Vec<bool>>,
}

impl<T: ElementType> Column<T> {
    pub fn new(values: Vec<T>) -> Self {
        Column {
            values,
            validity: None,
        }
    }

    pub fn with_validity(values: Vec<T>, validity: Vec<bool>) -> Self {
        assert_eq!(
            values.len(),
            validity.len(),
            "column values and validity mask must have the same length"
        );
        Column {
            values,
            validity: Some(validity),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn element(&self, row: usize) -> &T {
        &self.values[row]
    }

    pub fn is_valid(&self, row: usize) -> bool {
        self.validity.as_ref().map_or(true, |mask| mask[row])
    }

    /// Used by `ColumnSink::set_value` to write the terminal output of an evaluation.
    pub fn set(&mut self, row: usize, value: Option<T>) {
        match value {
            Some(v) => {
                self.values[row] = v;
                if let Some(mask) = &mut self.validity {
                    mask[row] = true;
                }
            }
            None => {
                if self.validity.is_none() {
                    self.validity = Some(vec![true; self.values.len()]);
                }
                self.validity.as_mut().unwrap()[row] = false;
            }
        }
    }
}

/// A type-erased column, one variant per `DataType`. `Table` stores a vector of these
/// so it can hold columns of differing element types side by side.
pub enum AnyColumn {
    Bool(Column<bool>),
    Int32(Column<i32>),
    Int64(Column<i64>),
    Float32(Column<f32>),
    Float64(Column<f64>),
    TimestampMicros(Column<TimestampMicros>),
    DurationMicros(Column<DurationMicros>),
    Decimal64(Column<Decimal64>),
    Utf8(Column<Rc<String>>),
}

impl AnyColumn {
    pub fn data_type(&self) -> DataType {
        match self {
            AnyColumn::Bool(_) => DataType::Bool,
            AnyColumn::Int32(_) => DataType::Int32,
            AnyColumn::Int64(_) => DataType::Int64,
            AnyColumn::Float32(_) => DataType::Float32,
            AnyColumn::Float64(_) => DataType::Float64,
            AnyColumn::TimestampMicros(_) => DataType::TimestampMicros,
            AnyColumn::DurationMicros(_) => DataType::DurationMicros,
            AnyColumn::Decimal64(_) => DataType::Decimal64,
            AnyColumn::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnyColumn::Bool(c) => c.len(),
            AnyColumn::Int32(c) => c.len(),
            AnyColumn::Int64(c) => c.len(),
            AnyColumn::Float32(c) => c.len(),
            AnyColumn::Float64(c) => c.len(),
            AnyColumn::TimestampMicros(c) => c.len(),
            AnyColumn::DurationMicros(c) => c.len(),
            AnyColumn::Decimal64(c) => c.len(),
            AnyColumn::Utf8(c) => c.len(),
        }
    }
}

/// Extracts the concretely typed `Column<Self>` out of an `AnyColumn`. Panics on a
/// type mismatch -- the "resolver encounters an unsupported element type" assertion
/// named in the error handling design; a well-formed plan, matched against the table
/// it actually runs over, never hits it.
pub trait FromAnyColumn: ElementType {
    fn extract(column: &AnyColumn) -> &Column<Self>;
    fn extract_mut(column: &mut AnyColumn) -> &mut Column<Self>;
}

macro_rules! impl_from_any_column {
    ($t:ty, $variant:ident) => {
        impl FromAnyColumn for $t {
            fn extract(column: &AnyColumn) -> &Column<Self> {
                match column {
                    AnyColumn::$variant(c) => c,
                    other => panic!(
                        "resolver type mismatch: expected {:?} column, found {:?}",
                        <$t as ElementType>::TAG,
                        other.data_type()
                    ),
                }
            }

            fn extract_mut(column: &mut AnyColumn) -> &mut Column<Self> {
                match column {
                    AnyColumn::$variant(c) => c,
                    other => panic!(
                        "resolver type mismatch: expected {:?} column, found {:?}",
                        <$t as ElementType>::TAG,
                        other.data_type()
                    ),
                }
            }
        }
    };
}

impl_from_any_column!(bool, Bool);
impl_from_any_column!(i32, Int32);
impl_from_any_column!(i64, Int64);
impl_from_any_column!(f32, Float32);
impl_from_any_column!(f64, Float64);
impl_from_any_column!(TimestampMicros, TimestampMicros);
impl_from_any_column!(DurationMicros, DurationMicros);
impl_from_any_column!(Decimal64, Decimal64);
impl_from_any_column!(Rc<String>, Utf8);

/// A row-aligned collection of columns, the evaluator's view of `left`/`right`.
pub struct Table {
    columns: Vec<AnyColumn>,
    num_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<AnyColumn>) -> Self {
        let num_rows = columns.first().map_or(0, AnyColumn::len);
        for column in &columns {
            assert_eq!(
                column.len(),
                num_rows,
                "all columns in a table must have the same row count"
            );
        }
        Table { columns, num_rows }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column<T: FromAnyColumn>(&self, index: usize) -> &Column<T> {
        T::extract(&self.columns[index])
    }

    pub fn column_mut<T: FromAnyColumn>(&mut self, index: usize) -> &mut Column<T> {
        T::extract_mut(&mut self.columns[index])
    }
}
