//! Query collaborator contracts
//!
//! reinhardt-extras never builds or runs queries itself. It talks to the ORM
//! through the traits in this module: a [`QuerySet`] that can be filtered,
//! annotated and evaluated, the [`Instance`]s it yields, and opaque
//! [`Expression`]s that only the ORM knows how to compute.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::exception::Result;

/// Declared result type of a database expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
	AutoField,
	Integer,
	SmallInteger,
	BigInteger,
	PositiveInteger,
	Float,
	Decimal,
	Char,
	Text,
	Boolean,
	Date,
	DateTime,
	Json,
}

/// A database-level expression. Only the ORM collaborator evaluates these.
pub trait Expression: Send + Sync + fmt::Debug {
	/// Declared output type, if the expression has one.
	fn output_type(&self) -> Option<OutputType> {
		None
	}

	/// Access to the concrete expression for the ORM that compiles it.
	fn as_any(&self) -> &dyn Any;
}

/// Expression key to expression, in annotation order.
pub type AnnotationMap = IndexMap<String, Arc<dyn Expression>>;

/// Field lookup (`bar__startswith`) to value constraints.
pub type Lookups = IndexMap<String, Value>;

/// Per-instance store of values the ORM materialized for annotation keys.
///
/// A key holding `Value::Null` counts as present: it records that the value
/// was fetched and is absent, so it is never fetched again.
#[derive(Debug, Default)]
pub struct AnnotationCache {
	values: RwLock<HashMap<String, Value>>,
}

impl AnnotationCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.values.read().get(key).cloned()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.values.read().contains_key(key)
	}

	pub fn insert(&self, key: impl Into<String>, value: Value) {
		self.values.write().insert(key.into(), value);
	}

	/// Store every entry of `values`, then mark each key in `keys` that
	/// `values` did not provide as fetched-but-absent.
	pub fn fill<'a, I>(&self, values: HashMap<String, Value>, keys: I)
	where
		I: IntoIterator<Item = &'a String>,
	{
		let mut guard = self.values.write();
		for key in keys {
			guard.entry(key.clone()).or_insert(Value::Null);
		}
		for (key, value) in values {
			guard.insert(key, value);
		}
	}

	pub fn len(&self) -> usize {
		self.values.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.read().is_empty()
	}
}

impl Clone for AnnotationCache {
	fn clone(&self) -> Self {
		Self {
			values: RwLock::new(self.values.read().clone()),
		}
	}
}

/// A row materialized by the ORM.
pub trait Instance: Send + Sync + fmt::Debug {
	/// Name of the model the row belongs to.
	fn model_name(&self) -> &str;

	/// Primary key value.
	fn pk(&self) -> Value;

	/// Plain attribute value (column or foreign-key id). `None` when the
	/// model has no such attribute.
	fn attribute(&self, name: &str) -> Option<Value>;

	/// Relation accessor. `None` when `name` is not a relation of the model.
	fn related(&self, name: &str) -> Option<Relation>;

	/// A queryset over every row of this instance's model.
	fn objects(&self) -> Box<dyn QuerySet>;

	/// Annotation values materialized for this instance.
	fn annotation_cache(&self) -> &AnnotationCache;
}

/// A lazily evaluated, chainable query over one model.
pub trait QuerySet: Send + Sync + fmt::Debug {
	fn model_name(&self) -> &str;

	/// Narrow by lookups. Does not run a query.
	fn filter(&self, lookups: &Lookups) -> Box<dyn QuerySet>;

	/// Attach annotation expressions. Does not run a query.
	fn annotate(&self, annotations: &AnnotationMap) -> Box<dyn QuerySet>;

	/// Keep at most `limit` rows starting at row `offset`. Does not run a
	/// query.
	fn slice(&self, offset: usize, limit: usize) -> Box<dyn QuerySet>;

	/// Evaluate and return the first row.
	fn first(&self) -> Result<Option<Arc<dyn Instance>>>;

	/// Evaluate a count aggregation.
	fn count(&self) -> Result<usize>;

	/// Evaluate and return every row.
	fn fetch(&self) -> Result<Vec<Arc<dyn Instance>>>;
}

/// What a relation accessor yields.
#[derive(Debug)]
pub enum Relation {
	/// A to-one relation, as a queryset of at most one row.
	One(Box<dyn QuerySet>),
	/// A to-many relation still open for filtering and annotation.
	Many(Box<dyn QuerySet>),
	/// Related rows that were already materialized.
	Items(Vec<Arc<dyn Instance>>),
}

impl Relation {
	/// Evaluate the relation into rows.
	pub fn fetch(self) -> Result<Vec<Arc<dyn Instance>>> {
		match self {
			Relation::One(queryset) => Ok(queryset.first()?.into_iter().collect()),
			Relation::Many(queryset) => queryset.fetch(),
			Relation::Items(items) => Ok(items),
		}
	}
}

/// Builds a [`Lookups`] map from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use reinhardt_extras_core::lookups;
///
/// let lookups = lookups! { "bar__startswith" => "test" };
/// assert_eq!(lookups["bar__startswith"], "test");
/// ```
#[macro_export]
macro_rules! lookups {
	($($key:expr => $value:expr),* $(,)?) => {{
		let mut map = $crate::orm::Lookups::new();
		$(map.insert(($key).to_string(), $crate::__private::json!($value));)*
		map
	}};
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_annotation_cache_null_counts_as_present() {
		// Arrange
		let cache = AnnotationCache::new();
		let keys = vec!["_annotated_a".to_string(), "_annotated_b".to_string()];
		let mut values = HashMap::new();
		values.insert("_annotated_a".to_string(), json!(3));

		// Act
		cache.fill(values, &keys);

		// Assert
		assert_eq!(cache.get("_annotated_a"), Some(json!(3)));
		assert_eq!(cache.get("_annotated_b"), Some(Value::Null));
		assert!(cache.contains("_annotated_b"));
		assert!(!cache.contains("_annotated_c"));
		assert_eq!(cache.len(), 2);
	}

	#[rstest]
	fn test_annotation_cache_fill_overwrites_null_placeholder() {
		let cache = AnnotationCache::new();
		cache.insert("_annotated_a", Value::Null);
		let mut values = HashMap::new();
		values.insert("_annotated_a".to_string(), json!("x"));

		cache.fill(values, std::iter::empty());

		assert_eq!(cache.get("_annotated_a"), Some(json!("x")));
	}

	#[rstest]
	fn test_lookups_macro_preserves_order() {
		let lookups = lookups! { "b" => 1, "a" => "x" };

		let keys: Vec<&String> = lookups.keys().collect();
		assert_eq!(keys, vec!["b", "a"]);
		assert_eq!(lookups["a"], json!("x"));
	}
}
