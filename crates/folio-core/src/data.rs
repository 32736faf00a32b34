//! Validated data instances and tables.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use serde::Serialize;

use crate::{identifier::Id, schema::TypeRef, span::Span, value::Value};

/// A `data` block bound to its struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInstance {
    pub type_name: Id,
    pub name: Id,
    /// Field values in source order, followed by any defaults that were filled in.
    pub fields: IndexMap<Id, Value>,
    #[serde(skip)]
    pub span: Span,
}

impl DataInstance {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Writes the instance back as a `data` block.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::{data::DataInstance, identifier::Id, span::Span, value::Value};
    ///
    /// let mut fields = indexmap::IndexMap::new();
    /// fields.insert(Id::new("x"), Value::Int(1));
    /// let instance = DataInstance {
    ///     type_name: Id::new("Point"),
    ///     name: Id::new("p"),
    ///     fields,
    ///     span: Span::default(),
    /// };
    /// assert_eq!(instance.to_source(), "data Point p {\n    x = 1;\n}\n");
    /// ```
    pub fn to_source(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DataInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "data {} {} {{", self.type_name, self.name)?;
        for (field, value) in &self.fields {
            writeln!(f, "    {field} = {value};")?;
        }
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: Id,
    pub ty: TypeRef,
}

/// A `table` block with its validated rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub name: Id,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip)]
    pub span: Span,
}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Writes the table back as a `table` block.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{self}");
        out
    }
}

impl fmt::Display for TableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {} {{ ", self.name)?;
        for column in &self.columns {
            write!(f, "{}: {}; ", column.name, column.ty)?;
        }
        writeln!(f, "}} = [")?;
        for row in &self.rows {
            f.write_str("    [")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{cell}")?;
            }
            writeln!(f, "],")?;
        }
        writeln!(f, "];")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimitiveKind;

    #[test]
    fn test_table_to_source() {
        let table = TableDef {
            name: Id::new("Scores"),
            columns: vec![
                Column {
                    name: Id::new("name"),
                    ty: TypeRef::Primitive(PrimitiveKind::String),
                },
                Column {
                    name: Id::new("score"),
                    ty: TypeRef::Primitive(PrimitiveKind::Float),
                },
            ],
            rows: vec![vec![Value::String("ada".to_string()), Value::Float(9.5)]],
            span: Span::default(),
        };

        assert_eq!(
            table.to_source(),
            "table Scores { name: string; score: float; } = [\n    [\"ada\", 9.5],\n];\n"
        );
        assert_eq!(table.column_index("score"), Some(1));
    }
}
