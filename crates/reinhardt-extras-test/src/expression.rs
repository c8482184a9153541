//! Expressions understood by the in-memory ORM

use reinhardt_extras_core::orm::{Expression, OutputType};
use serde_json::Value;
use std::any::Any;

/// A small set of aggregate and scalar expressions, evaluated per row by
/// [`MemoryQuerySet`](crate::MemoryQuerySet).
#[derive(Debug, Clone, PartialEq)]
pub enum TestExpr {
	/// A constant.
	Value {
		value: Value,
		output: Option<OutputType>,
	},
	/// Another column of the same row.
	Column { name: String },
	/// Number of related rows, optionally only those whose `field` equals `value`.
	Count {
		relation: String,
		filter: Option<(String, Value)>,
	},
	/// Sum over related rows of the weight of the first matching case.
	SumCase {
		relation: String,
		field: String,
		cases: Vec<(Value, i64)>,
	},
	/// Average of a numeric column over related rows.
	Avg { relation: String, field: String },
	/// `prefix` followed by the row's primary key.
	ConcatPk { prefix: String },
}

impl TestExpr {
	pub fn value(value: Value) -> Self {
		TestExpr::Value {
			value,
			output: None,
		}
	}

	pub fn typed_value(value: Value, output: OutputType) -> Self {
		TestExpr::Value {
			value,
			output: Some(output),
		}
	}

	pub fn column(name: impl Into<String>) -> Self {
		TestExpr::Column { name: name.into() }
	}

	pub fn count(relation: impl Into<String>) -> Self {
		TestExpr::Count {
			relation: relation.into(),
			filter: None,
		}
	}

	pub fn count_where(
		relation: impl Into<String>,
		field: impl Into<String>,
		value: impl Into<Value>,
	) -> Self {
		TestExpr::Count {
			relation: relation.into(),
			filter: Some((field.into(), value.into())),
		}
	}

	pub fn sum_case<I, V>(relation: impl Into<String>, field: impl Into<String>, cases: I) -> Self
	where
		I: IntoIterator<Item = (V, i64)>,
		V: Into<Value>,
	{
		TestExpr::SumCase {
			relation: relation.into(),
			field: field.into(),
			cases: cases.into_iter().map(|(v, w)| (v.into(), w)).collect(),
		}
	}

	pub fn avg(relation: impl Into<String>, field: impl Into<String>) -> Self {
		TestExpr::Avg {
			relation: relation.into(),
			field: field.into(),
		}
	}

	pub fn concat_pk(prefix: impl Into<String>) -> Self {
		TestExpr::ConcatPk {
			prefix: prefix.into(),
		}
	}
}

impl Expression for TestExpr {
	fn output_type(&self) -> Option<OutputType> {
		match self {
			TestExpr::Value { output, .. } => *output,
			TestExpr::Count { .. } | TestExpr::SumCase { .. } => Some(OutputType::Integer),
			TestExpr::ConcatPk { .. } => Some(OutputType::Char),
			TestExpr::Column { .. } | TestExpr::Avg { .. } => None,
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}
