//! Ordered column schemas and schema expressions.
//!
//! A [`Schema`] is the contract a partition worker must satisfy exactly. Its
//! textual form is `name:type,name:type` (e.g. `unique_id:str,ds:timestamp`).
//!
//! A [`SchemaSpec`] is what callers hand to an engine: either an explicit schema,
//! or an expression over the input schema such as `*-y+Naive:float` ("every
//! input column except `y`, then `Naive`"). Derived specs are resolved once per
//! job against the input table.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::value::DType;

/// Entity key column.
pub const ID_COL: &str = "unique_id";
/// Time index column.
pub const TIME_COL: &str = "ds";
/// Target column.
pub const TARGET_COL: &str = "y";
/// Cross-validation window boundary column.
pub const CUTOFF_COL: &str = "cutoff";

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.dtype)
    }
}

/// Ordered, duplicate-free list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Build a schema, rejecting empty or duplicate column names.
    pub fn new(fields: Vec<Field>) -> CoreResult<Self> {
        for (i, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(CoreError::schema("column name cannot be empty"));
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(CoreError::schema(format!(
                    "duplicate column `{}`",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn field(&self, name: &str) -> CoreResult<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| CoreError::unknown_column(name))
    }

    /// Index of `name`, or `UnknownColumn`.
    pub fn require(&self, name: &str) -> CoreResult<usize> {
        self.index_of(name)
            .ok_or_else(|| CoreError::unknown_column(name))
    }

    /// All columns except the named ones. Unknown names are ignored.
    pub fn exclude(&self, names: &[&str]) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .filter(|f| !names.contains(&f.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Append `other`; a column already present is replaced in place.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        for field in &other.fields {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => existing.dtype = field.dtype,
                None => fields.push(field.clone()),
            }
        }
        Schema { fields }
    }
}

impl TryFrom<Vec<Field>> for Schema {
    type Error = CoreError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

impl FromStr for Schema {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Schema::empty());
        }
        let fields = s
            .split(',')
            .map(|part| {
                let (name, dtype) = part
                    .split_once(':')
                    .ok_or_else(|| CoreError::schema(format!("expected `name:type`, got `{part}`")))?;
                Ok(Field::new(name.trim(), dtype.parse()?))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Schema::new(fields)
    }
}

/// Declared output schema of a partitioned job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaSpec {
    /// Output columns are exactly these.
    Explicit(Schema),
    /// Input columns minus `drop`, then `append`.
    Derived { drop: Vec<String>, append: Schema },
}

impl SchemaSpec {
    /// `*-<drop...>+<append>`.
    pub fn derived(drop: &[&str], append: Schema) -> Self {
        SchemaSpec::Derived {
            drop: drop.iter().map(|s| s.to_string()).collect(),
            append,
        }
    }

    /// Resolve against the schema of the input table.
    pub fn resolve(&self, input: &Schema) -> CoreResult<Schema> {
        match self {
            SchemaSpec::Explicit(schema) => Ok(schema.clone()),
            SchemaSpec::Derived { drop, append } => {
                let drop: Vec<&str> = drop.iter().map(String::as_str).collect();
                let resolved = input.exclude(&drop).merge(append);
                if resolved.is_empty() {
                    return Err(CoreError::schema(format!(
                        "`{self}` resolves to no columns against `{input}`"
                    )));
                }
                Ok(resolved)
            }
        }
    }
}

impl fmt::Display for SchemaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSpec::Explicit(schema) => write!(f, "{schema}"),
            SchemaSpec::Derived { drop, append } => {
                f.write_str("*")?;
                for name in drop {
                    write!(f, "-{name}")?;
                }
                if !append.is_empty() {
                    write!(f, "+{append}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Schema> for SchemaSpec {
    fn from(schema: Schema) -> Self {
        SchemaSpec::Explicit(schema)
    }
}
