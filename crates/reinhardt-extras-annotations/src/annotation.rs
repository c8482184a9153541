//! Annotation descriptors
//!
//! A [`ScalarAnnotation`] is one value the database computes per row and
//! stores on the instance under a namespaced storage key. An
//! [`AnnotationGroup`] bundles several of them behind one field name.

use indexmap::IndexMap;
use reinhardt_extras_core::orm::{AnnotationMap, Expression, Instance, Lookups, OutputType};
use reinhardt_extras_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix of a scalar annotation's storage key.
pub const ANNOTATION_PREFIX: &str = "_annotated_";

/// Prefix of a group member's storage key.
pub const ANNOTATION_LIST_PREFIX: &str = "_annotated_list_";

/// What an annotation declaration produces.
#[derive(Debug, Clone)]
pub enum AnnotationExpr {
	/// One expression, exposed as a single value.
	Scalar(Arc<dyn Expression>),
	/// Member name to expression, exposed as one object.
	Group(IndexMap<String, Arc<dyn Expression>>),
}

impl AnnotationExpr {
	pub fn scalar<E: Expression + 'static>(expression: E) -> Self {
		AnnotationExpr::Scalar(Arc::new(expression))
	}

	pub fn group<I, K, E>(members: I) -> Self
	where
		I: IntoIterator<Item = (K, E)>,
		K: Into<String>,
		E: Expression + 'static,
	{
		AnnotationExpr::Group(
			members
				.into_iter()
				.map(|(name, expression)| {
					(name.into(), Arc::new(expression) as Arc<dyn Expression>)
				})
				.collect(),
		)
	}
}

/// Lookups selecting exactly `instance`.
pub(crate) fn pk_lookup(instance: &dyn Instance) -> Lookups {
	let mut lookups = Lookups::new();
	lookups.insert("pk".to_string(), instance.pk());
	lookups
}

/// Run one query fetching `expressions` for `instance` and store every
/// requested key on it. Keys the ORM did not return are stored as null.
pub(crate) fn fetch_into_cache(instance: &dyn Instance, expressions: &AnnotationMap) -> Result<()> {
	tracing::debug!(
		model = instance.model_name(),
		pk = %instance.pk(),
		keys = expressions.len(),
		"annotation fallback fetch"
	);
	let row = instance
		.objects()
		.filter(&pk_lookup(instance))
		.annotate(expressions)
		.first()?;
	let mut values = HashMap::new();
	if let Some(row) = row {
		for key in expressions.keys() {
			if let Some(value) = row.annotation_cache().get(key) {
				values.insert(key.clone(), value);
			}
		}
	}
	instance.annotation_cache().fill(values, expressions.keys());
	Ok(())
}

/// A single computed value.
#[derive(Debug, Clone)]
pub struct ScalarAnnotation {
	name: String,
	storage_key: String,
	expression: Arc<dyn Expression>,
}

impl ScalarAnnotation {
	/// A top-level annotation stored under `_annotated_<name>`.
	pub fn new(name: impl Into<String>, expression: Arc<dyn Expression>) -> Self {
		let name = name.into();
		Self {
			storage_key: format!("{}{}", ANNOTATION_PREFIX, name),
			name,
			expression,
		}
	}

	/// A group member stored under `_annotated_list_<member>`.
	pub fn member(member: impl Into<String>, expression: Arc<dyn Expression>) -> Self {
		let name = member.into();
		Self {
			storage_key: format!("{}{}", ANNOTATION_LIST_PREFIX, name),
			name,
			expression,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn storage_key(&self) -> &str {
		&self.storage_key
	}

	pub fn expression(&self) -> Arc<dyn Expression> {
		self.expression.clone()
	}

	pub fn output_type(&self) -> Option<OutputType> {
		self.expression.output_type()
	}

	/// `{storage_key: expression}`, ready for `QuerySet::annotate`.
	pub fn annotation_expression(&self) -> AnnotationMap {
		let mut map = AnnotationMap::new();
		map.insert(self.storage_key.clone(), self.expression.clone());
		map
	}

	/// The materialized value, if the instance carries one.
	pub fn cached_value(&self, instance: &dyn Instance) -> Option<Value> {
		instance.annotation_cache().get(&self.storage_key)
	}

	/// The value for `instance`, fetching and memoizing it when the instance
	/// was loaded without this annotation.
	pub fn value(&self, instance: &dyn Instance) -> Result<Value> {
		if let Some(value) = self.cached_value(instance) {
			return Ok(value);
		}
		fetch_into_cache(instance, &self.annotation_expression())?;
		Ok(self.cached_value(instance).unwrap_or(Value::Null))
	}
}

/// Several annotations exposed as one object field.
#[derive(Debug, Clone)]
pub struct AnnotationGroup {
	name: String,
	members: Vec<ScalarAnnotation>,
}

impl AnnotationGroup {
	pub fn new(name: impl Into<String>, members: IndexMap<String, Arc<dyn Expression>>) -> Self {
		Self {
			name: name.into(),
			members: members
				.into_iter()
				.map(|(member, expression)| ScalarAnnotation::member(member, expression))
				.collect(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn members(&self) -> &[ScalarAnnotation] {
		&self.members
	}

	/// One entry per member, in declaration order.
	pub fn annotation_expression(&self) -> AnnotationMap {
		self.members
			.iter()
			.map(|member| (member.storage_key.clone(), member.expression.clone()))
			.collect()
	}

	/// Member values assembled from the cache. Missing members are null.
	pub fn cached_value(&self, instance: &dyn Instance) -> Value {
		let object: Map<String, Value> = self
			.members
			.iter()
			.map(|member| {
				(
					member.name.clone(),
					member.cached_value(instance).unwrap_or(Value::Null),
				)
			})
			.collect();
		Value::Object(object)
	}

	/// Member values, fetching every missing member in a single query.
	pub fn value(&self, instance: &dyn Instance) -> Result<Value> {
		let missing: AnnotationMap = self
			.members
			.iter()
			.filter(|member| !instance.annotation_cache().contains(&member.storage_key))
			.map(|member| (member.storage_key.clone(), member.expression.clone()))
			.collect();
		if !missing.is_empty() {
			fetch_into_cache(instance, &missing)?;
		}
		Ok(self.cached_value(instance))
	}
}

/// A registered annotation.
#[derive(Debug, Clone)]
pub enum Annotation {
	Scalar(ScalarAnnotation),
	Group(AnnotationGroup),
}

impl Annotation {
	pub fn from_expr(name: impl Into<String>, expr: AnnotationExpr) -> Self {
		match expr {
			AnnotationExpr::Scalar(expression) => {
				Annotation::Scalar(ScalarAnnotation::new(name, expression))
			}
			AnnotationExpr::Group(members) => Annotation::Group(AnnotationGroup::new(name, members)),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Annotation::Scalar(scalar) => scalar.name(),
			Annotation::Group(group) => group.name(),
		}
	}

	pub fn is_group(&self) -> bool {
		matches!(self, Annotation::Group(_))
	}

	pub fn storage_keys(&self) -> Vec<&str> {
		match self {
			Annotation::Scalar(scalar) => vec![scalar.storage_key()],
			Annotation::Group(group) => group.members.iter().map(|m| m.storage_key()).collect(),
		}
	}

	pub fn annotation_expression(&self) -> AnnotationMap {
		match self {
			Annotation::Scalar(scalar) => scalar.annotation_expression(),
			Annotation::Group(group) => group.annotation_expression(),
		}
	}

	/// Value assembled from the instance cache, nulls for anything missing.
	pub fn cached_value(&self, instance: &dyn Instance) -> Value {
		match self {
			Annotation::Scalar(scalar) => scalar.cached_value(instance).unwrap_or(Value::Null),
			Annotation::Group(group) => group.cached_value(instance),
		}
	}

	pub fn value(&self, instance: &dyn Instance) -> Result<Value> {
		match self {
			Annotation::Scalar(scalar) => scalar.value(instance),
			Annotation::Group(group) => group.value(instance),
		}
	}
}

pub(crate) fn duplicate_key_error(model: &str, key: &str) -> Error {
	Error::ImproperlyConfigured(format!(
		"annotation storage key `{}` is declared more than once on `{}`",
		key, model
	))
}
