//! Key/type mapping between semantic fields and physical columns
//!
//! The sample table stores every objective and design variable in its own
//! column. Callers address groups of columns through the closed [`Field`]
//! enum; a [`Layout`] built once from `n_var`/`n_obj` resolves each field to
//! its ordered physical columns and column type.
//!
//! ```text
//! X             -> x1 .. x{n_var}                       Real
//! Y             -> f1 .. f{n_obj}                       Real
//! Y_expected    -> expected_f1 .. expected_f{n_obj}     Real
//! Y_uncertainty -> uncertainty_f1 .. uncertainty_f{n}   Real
//! hv            -> hv                                   Real
//! pred_error    -> pred_error                           Real
//! is_pareto     -> is_pareto                            Boolean
//! config_id     -> config_id                            Integer
//! batch_id      -> batch_id                             Integer
//! ```

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{DataType, Field as ArrowField, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Error, Result};

/// Semantic field of the sample table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// Design variables (`n_var` columns)
    #[serde(rename = "X")]
    X,
    /// Measured objectives (`n_obj` columns, unset until evaluated)
    #[serde(rename = "Y")]
    Y,
    /// Optimizer's predicted objectives (`n_obj` columns)
    #[serde(rename = "Y_expected")]
    YExpected,
    /// Optimizer's prediction uncertainty (`n_obj` columns)
    #[serde(rename = "Y_uncertainty")]
    YUncertainty,
    /// Hypervolume stamped by the last update touching the row
    #[serde(rename = "hv")]
    Hv,
    /// Prediction error stamped by the last update touching the row
    #[serde(rename = "pred_error")]
    PredError,
    /// Whether the row is currently Pareto-optimal
    #[serde(rename = "is_pareto")]
    IsPareto,
    /// Configuration that produced the row
    #[serde(rename = "config_id")]
    ConfigId,
    /// Batch that produced the row (0 = initial samples)
    #[serde(rename = "batch_id")]
    BatchId,
}

impl Field {
    /// Every field, in physical column order.
    pub const ALL: [Self; 9] = [
        Self::X,
        Self::Y,
        Self::YExpected,
        Self::YUncertainty,
        Self::Hv,
        Self::PredError,
        Self::IsPareto,
        Self::ConfigId,
        Self::BatchId,
    ];

    /// Semantic name as used by callers (`"X"`, `"Y_expected"`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::YExpected => "Y_expected",
            Self::YUncertainty => "Y_uncertainty",
            Self::Hv => "hv",
            Self::PredError => "pred_error",
            Self::IsPareto => "is_pareto",
            Self::ConfigId => "config_id",
            Self::BatchId => "batch_id",
        }
    }

    /// Column type shared by all physical columns of this field.
    #[must_use]
    pub const fn column_type(self) -> ColumnType {
        match self {
            Self::X | Self::Y | Self::YExpected | Self::YUncertainty | Self::Hv | Self::PredError => {
                ColumnType::Real
            }
            Self::IsPareto => ColumnType::Boolean,
            Self::ConfigId | Self::BatchId => ColumnType::Integer,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown field '{s}'")))
    }
}

/// Physical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit float, nullable (null = unset)
    Real,
    /// Boolean, non-nullable, defaults to `false`
    Boolean,
    /// 64-bit integer, nullable
    Integer,
}

impl ColumnType {
    /// Arrow data type used when materializing the column.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::Real => DataType::Float64,
            Self::Boolean => DataType::Boolean,
            Self::Integer => DataType::Int64,
        }
    }

    /// Whether the column can hold unset values.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Map an Arrow data type back to a column type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaError`] for types the store cannot hold.
    pub fn from_data_type(data_type: &DataType) -> Result<Self> {
        match data_type {
            DataType::Float64 => Ok(Self::Real),
            DataType::Boolean => Ok(Self::Boolean),
            DataType::Int64 => Ok(Self::Integer),
            other => Err(Error::SchemaError(format!("unsupported column type {other:?}"))),
        }
    }
}

/// Name and type of one physical column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Column type
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a column spec.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Arrow field for this column.
    #[must_use]
    pub fn arrow_field(&self) -> ArrowField {
        ArrowField::new(
            self.name.clone(),
            self.column_type.data_type(),
            self.column_type.is_nullable(),
        )
    }
}

/// Resolved mapping from every [`Field`] to its physical columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    n_var: usize,
    n_obj: usize,
    columns: [Vec<String>; 9],
}

impl Layout {
    /// Build the layout for `n_var` design variables and `n_obj` objectives.
    #[must_use]
    pub fn new(n_var: usize, n_obj: usize) -> Self {
        let numbered = |prefix: &str, n: usize| -> Vec<String> {
            (1..=n).map(|i| format!("{prefix}{i}")).collect()
        };
        let single = |name: &str| vec![name.to_string()];

        Self {
            n_var,
            n_obj,
            columns: [
                numbered("x", n_var),
                numbered("f", n_obj),
                numbered("expected_f", n_obj),
                numbered("uncertainty_f", n_obj),
                single("hv"),
                single("pred_error"),
                single("is_pareto"),
                single("config_id"),
                single("batch_id"),
            ],
        }
    }

    /// Number of design variables.
    #[must_use]
    pub const fn n_var(&self) -> usize {
        self.n_var
    }

    /// Number of objectives.
    #[must_use]
    pub const fn n_obj(&self) -> usize {
        self.n_obj
    }

    /// Physical columns of `field`, in order.
    #[must_use]
    pub fn columns(&self, field: Field) -> &[String] {
        &self.columns[field as usize]
    }

    /// Physical columns of several fields, flattened in request order.
    #[must_use]
    pub fn flatten(&self, fields: &[Field]) -> Vec<String> {
        fields
            .iter()
            .flat_map(|&field| self.columns(field).iter().cloned())
            .collect()
    }

    /// Column specs of the whole table, in physical order.
    #[must_use]
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        Field::ALL
            .into_iter()
            .flat_map(|field| {
                self.columns(field)
                    .iter()
                    .map(move |name| ColumnSpec::new(name.clone(), field.column_type()))
            })
            .collect()
    }

    /// Arrow schema for a projection of `fields`.
    #[must_use]
    pub fn arrow_schema(&self, fields: &[Field]) -> SchemaRef {
        let arrow_fields: Vec<ArrowField> = fields
            .iter()
            .flat_map(|&field| {
                self.columns(field)
                    .iter()
                    .map(move |name| ColumnSpec::new(name.clone(), field.column_type()).arrow_field())
            })
            .collect();
        Arc::new(Schema::new(arrow_fields))
    }
}
