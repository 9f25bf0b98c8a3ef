use crate::column::{Column, Datum};
use serde_json::Value;
use std::sync::Arc;

// Read-only, row-addressable access to a named column.
pub trait ColumnView: Send + Sync {
    fn name(&self) -> &str;
    fn size(&self) -> usize;
    fn get(&self, i: usize) -> Datum<'_>;
    fn as_array(&self) -> Value {
        Value::Array((0..self.size()).map(|i| self.get(i).to_value()).collect())
    }
}

impl std::fmt::Debug for dyn ColumnView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnView")
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

pub type BoxedView = Box<dyn ColumnView>;

#[derive(Clone, Debug)]
pub struct Vector {
    name: String,
    column: Arc<Column>,
}

impl Vector {
    pub fn new(name: impl Into<String>, column: Arc<Column>) -> Self {
        Vector {
            name: name.into(),
            column,
        }
    }

    pub fn column(&self) -> &Arc<Column> {
        &self.column
    }

    // Restrict to `indices`, in the given order. The column is shared, not copied.
    pub fn slice(self, indices: impl Into<Arc<[usize]>>) -> SlicedVector {
        SlicedVector {
            inner: self,
            indices: indices.into(),
        }
    }
}

impl ColumnView for Vector {
    fn name(&self) -> &str {
        &self.name
    }
    fn size(&self) -> usize {
        self.column.len()
    }
    fn get(&self, i: usize) -> Datum<'_> {
        self.column.datum(i)
    }
    fn as_array(&self) -> Value {
        match &*self.column {
            // Per-row coordinates, the same shape a slice of it produces.
            Column::Object(_) => {
                Value::Array((0..self.size()).map(|i| self.get(i).to_value()).collect())
            }
            col => serde_json::to_value(col).unwrap_or(Value::Null),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlicedVector {
    inner: Vector,
    indices: Arc<[usize]>,
}

impl SlicedVector {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl ColumnView for SlicedVector {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn size(&self) -> usize {
        self.indices.len()
    }
    fn get(&self, i: usize) -> Datum<'_> {
        self.indices
            .get(i)
            .map_or(Datum::Missing, |row| self.inner.get(*row))
    }
}
