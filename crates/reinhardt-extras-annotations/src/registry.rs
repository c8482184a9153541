//! Per-model annotation registry
//!
//! Models register their annotations explicitly through
//! [`AnnotationRegistryBuilder`]. A built registry is immutable and cheap to
//! clone; [`annotation_registry`] caches one per model type for the life of
//! the process.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use reinhardt_extras_core::fields::{FieldTypeRegistry, Fields};
use reinhardt_extras_core::orm::{AnnotationMap, Instance};
use reinhardt_extras_core::{ExtrasSettings, Field, Result};
use serde_json::Value;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::annotation::{Annotation, AnnotationExpr, duplicate_key_error, fetch_into_cache};
use crate::fields::{AnnotationDictField, AnnotationField};

type ExpressionFn = Box<dyn Fn() -> AnnotationExpr + Send + Sync>;

/// Collects annotation declarations for one model.
pub struct AnnotationRegistryBuilder {
	model: String,
	wildcard: String,
	declarations: IndexMap<String, ExpressionFn>,
}

impl fmt::Debug for AnnotationRegistryBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AnnotationRegistryBuilder")
			.field("model", &self.model)
			.field("declarations", &self.declarations.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl AnnotationRegistryBuilder {
	/// Declare an annotation. Declaring a name again replaces the earlier
	/// declaration in place.
	///
	/// # Examples
	///
	/// ```rust,ignore
	/// let registry = AnnotationRegistry::builder("AnnotatedModel")
	///     .annotation("count_foo", || AnnotationExpr::scalar(Count::new("foo")))
	///     .build()?;
	/// ```
	pub fn annotation<F>(mut self, name: impl Into<String>, expression_fn: F) -> Self
	where
		F: Fn() -> AnnotationExpr + Send + Sync + 'static,
	{
		self.declarations.insert(name.into(), Box::new(expression_fn));
		self
	}

	/// Token selecting every annotation in [`AnnotationRegistry::intersection`].
	pub fn wildcard(mut self, wildcard: impl Into<String>) -> Self {
		self.wildcard = wildcard.into();
		self
	}

	/// Classify every declaration and check that storage keys are unique.
	pub fn build(self) -> Result<AnnotationRegistry> {
		let mut annotations = IndexMap::new();
		let mut keys = HashSet::new();
		for (name, expression_fn) in self.declarations {
			let annotation = Annotation::from_expr(name.clone(), expression_fn());
			for key in annotation.storage_keys() {
				if !keys.insert(key.to_string()) {
					return Err(duplicate_key_error(&self.model, key));
				}
			}
			annotations.insert(name, annotation);
		}
		tracing::debug!(
			model = %self.model,
			annotations = annotations.len(),
			"built annotation registry"
		);
		Ok(AnnotationRegistry {
			inner: Arc::new(RegistryInner {
				model: self.model,
				wildcard: self.wildcard,
				annotations,
			}),
		})
	}
}

#[derive(Debug)]
struct RegistryInner {
	model: String,
	wildcard: String,
	annotations: IndexMap<String, Annotation>,
}

/// Name to annotation mapping for one model.
#[derive(Debug, Clone)]
pub struct AnnotationRegistry {
	inner: Arc<RegistryInner>,
}

impl AnnotationRegistry {
	pub fn builder(model: impl Into<String>) -> AnnotationRegistryBuilder {
		AnnotationRegistryBuilder {
			model: model.into(),
			wildcard: ExtrasSettings::global().annotation_wildcard.clone(),
			declarations: IndexMap::new(),
		}
	}

	pub fn model_name(&self) -> &str {
		&self.inner.model
	}

	pub fn wildcard(&self) -> &str {
		&self.inner.wildcard
	}

	/// Registered names, in registration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.inner.annotations.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.inner.annotations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.annotations.is_empty()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.inner.annotations.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&Annotation> {
		self.inner.annotations.get(name)
	}

	/// Registered names among `requested`, in registration order. The
	/// wildcard selects every name; unknown names are ignored.
	pub fn intersection<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
		let wildcard = requested.iter().any(|name| name.as_ref() == self.inner.wildcard);
		self.inner
			.annotations
			.keys()
			.filter(|name| wildcard || requested.iter().any(|r| r.as_ref() == name.as_str()))
			.cloned()
			.collect()
	}

	/// Expressions for the requested annotations, keyed by storage key with
	/// groups flattened into their members.
	pub fn get_annotations<S: AsRef<str>>(&self, requested: &[S]) -> AnnotationMap {
		let mut expressions = AnnotationMap::new();
		for name in self.intersection(requested) {
			if let Some(annotation) = self.get(&name) {
				for (key, expression) in annotation.annotation_expression() {
					expressions.entry(key).or_insert(expression);
				}
			}
		}
		expressions
	}

	/// Every annotation's expressions.
	pub fn all_annotations(&self) -> AnnotationMap {
		self.get_annotations(&[self.inner.wildcard.as_str()])
	}

	/// Read-only serializer fields for the requested annotations.
	pub fn serializer_fields<S: AsRef<str>>(
		&self,
		requested: &[S],
		field_types: &FieldTypeRegistry,
	) -> Fields {
		let mut fields = Fields::new();
		for name in self.intersection(requested) {
			let field: Arc<dyn Field> = match self.get(&name) {
				Some(Annotation::Scalar(scalar)) => Arc::new(AnnotationField::new(
					self.clone(),
					name.clone(),
					field_types.field_for(scalar.output_type()),
				)),
				Some(Annotation::Group(group)) => Arc::new(AnnotationDictField::new(
					self.clone(),
					name.clone(),
					group
						.members()
						.iter()
						.map(|member| {
							(
								member.name().to_string(),
								field_types.field_for(member.output_type()),
							)
						})
						.collect(),
				)),
				None => continue,
			};
			fields.insert(name, field);
		}
		fields
	}

	/// Make sure every annotation of this model is cached on `instance`,
	/// fetching all missing ones with one query.
	pub fn ensure_loaded(&self, instance: &dyn Instance) -> Result<()> {
		let cache = instance.annotation_cache();
		let missing: AnnotationMap = self
			.all_annotations()
			.into_iter()
			.filter(|(key, _)| !cache.contains(key))
			.collect();
		if missing.is_empty() {
			return Ok(());
		}
		fetch_into_cache(instance, &missing)
	}

	/// Value of one annotation on `instance`. Unknown names yield null.
	///
	/// When the annotation is not cached yet, every missing annotation of the
	/// model is fetched with it.
	pub fn value(&self, instance: &dyn Instance, name: &str) -> Result<Value> {
		let Some(annotation) = self.get(name) else {
			return Ok(Value::Null);
		};
		let cache = instance.annotation_cache();
		if !annotation.storage_keys().iter().all(|key| cache.contains(key)) {
			self.ensure_loaded(instance)?;
		}
		Ok(annotation.cached_value(instance))
	}
}

/// A model type that declares annotations.
///
/// # Examples
///
/// ```rust,ignore
/// struct AnnotatedModel;
///
/// impl AnnotatedModel for AnnotatedModel {
///     fn model_name() -> &'static str {
///         "AnnotatedModel"
///     }
///
///     fn declare_annotations(builder: AnnotationRegistryBuilder) -> AnnotationRegistryBuilder {
///         builder.annotation("count_foo", || AnnotationExpr::scalar(Count::new("foo")))
///     }
/// }
///
/// let registry = annotation_registry::<AnnotatedModel>()?;
/// ```
pub trait AnnotatedModel: 'static {
	fn model_name() -> &'static str;

	fn declare_annotations(builder: AnnotationRegistryBuilder) -> AnnotationRegistryBuilder;
}

static REGISTRIES: Lazy<RwLock<HashMap<TypeId, AnnotationRegistry>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// The cached registry of `M`, built on first use.
///
/// Concurrent first calls may both build; the first one stored wins and
/// both callers get the stored registry.
pub fn annotation_registry<M: AnnotatedModel>() -> Result<AnnotationRegistry> {
	let type_id = TypeId::of::<M>();
	if let Some(registry) = REGISTRIES.read().get(&type_id) {
		return Ok(registry.clone());
	}
	let built = M::declare_annotations(AnnotationRegistry::builder(M::model_name())).build()?;
	let mut registries = REGISTRIES.write();
	Ok(registries.entry(type_id).or_insert(built).clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::annotation::ANNOTATION_LIST_PREFIX;
	use reinhardt_extras_core::Error;
	use reinhardt_extras_core::fields::{CharField, IntegerField, ReadOnlyField};
	use reinhardt_extras_test::{MemoryDatabase, TestExpr};
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn registry() -> AnnotationRegistry {
		AnnotationRegistry::builder("Item")
			.annotation("count_tags", || AnnotationExpr::scalar(TestExpr::count("tags")))
			.annotation("label", || {
				AnnotationExpr::scalar(TestExpr::concat_pk("item "))
			})
			.annotation("tag_counts", || {
				AnnotationExpr::group([
					("red", TestExpr::count_where("tags", "name", "red")),
					("blue", TestExpr::count_where("tags", "name", "blue")),
				])
			})
			.build()
			.unwrap()
	}

	#[fixture]
	fn database() -> Arc<MemoryDatabase> {
		let db = MemoryDatabase::new();
		db.register_many_to_many("Item", "tags", "Tag");
		let red = db.insert("Tag", json!({"name": "red"}));
		let blue = db.insert("Tag", json!({"name": "blue"}));
		let item = db.insert("Item", json!({"title": "first"}));
		db.link("Item", "tags", item, red);
		db.link("Item", "tags", item, blue);
		db.link("Item", "tags", item, red);
		db
	}

	#[rstest]
	fn test_intersection_wildcard_returns_all_names() {
		let registry = registry();

		let names = registry.intersection(&["*"]);

		assert_eq!(names, vec!["count_tags", "label", "tag_counts"]);
	}

	#[rstest]
	#[case(&["label", "bogus", "id"], &["label"])]
	#[case(&["tag_counts", "count_tags"], &["count_tags", "tag_counts"])]
	#[case(&["bogus"], &[])]
	fn test_intersection_drops_unknown_names(#[case] requested: &[&str], #[case] expected: &[&str]) {
		assert_eq!(registry().intersection(requested), expected);
	}

	#[rstest]
	fn test_get_annotations_flattens_groups() {
		// Arrange
		let registry = registry();

		// Act
		let expressions = registry.get_annotations(&["*"]);

		// Assert
		let keys: Vec<&str> = expressions.keys().map(String::as_str).collect();
		assert_eq!(
			keys,
			vec![
				"_annotated_count_tags",
				"_annotated_label",
				"_annotated_list_red",
				"_annotated_list_blue",
			]
		);
	}

	#[rstest]
	fn test_later_declaration_replaces_earlier() {
		let registry = AnnotationRegistry::builder("Item")
			.annotation("a", || AnnotationExpr::scalar(TestExpr::value(json!(1))))
			.annotation("b", || AnnotationExpr::scalar(TestExpr::value(json!(2))))
			.annotation("a", || AnnotationExpr::scalar(TestExpr::count("tags")))
			.build()
			.unwrap();

		let names: Vec<&str> = registry.names().collect();

		assert_eq!(names, vec!["a", "b"]);
		let Some(Annotation::Scalar(a)) = registry.get("a") else {
			panic!("`a` should be a scalar annotation");
		};
		assert!(a.output_type().is_some());
	}

	#[rstest]
	fn test_duplicate_storage_key_is_configuration_error() {
		let result = AnnotationRegistry::builder("Item")
			.annotation("first", || {
				AnnotationExpr::group([("shared", TestExpr::value(json!(1)))])
			})
			.annotation("second", || {
				AnnotationExpr::group([("shared", TestExpr::value(json!(2)))])
			})
			.build();

		let Err(Error::ImproperlyConfigured(message)) = result else {
			panic!("expected a configuration error");
		};
		assert!(message.contains(&format!("{}shared", ANNOTATION_LIST_PREFIX)));
	}

	#[rstest]
	fn test_serializer_fields_types() {
		// Arrange
		let registry = registry();

		// Act
		let fields = registry.serializer_fields(&["*"], &FieldTypeRegistry::new());

		// Assert
		let count = fields["count_tags"].as_any().downcast_ref::<AnnotationField>().unwrap();
		assert!(count.child().as_any().is::<IntegerField>());
		let label = fields["label"].as_any().downcast_ref::<AnnotationField>().unwrap();
		assert!(label.child().as_any().is::<CharField>());
		assert!(fields["tag_counts"].as_any().is::<AnnotationDictField>());
		assert!(fields.values().all(|f| f.is_read_only()));
	}

	#[rstest]
	fn test_serializer_fields_untyped_expression_is_read_only_field() {
		let registry = AnnotationRegistry::builder("Item")
			.annotation("avg_weight", || AnnotationExpr::scalar(TestExpr::avg("tags", "weight")))
			.build()
			.unwrap();

		let fields = registry.serializer_fields(&["avg_weight"], &FieldTypeRegistry::new());

		let avg = fields["avg_weight"].as_any().downcast_ref::<AnnotationField>().unwrap();
		assert!(avg.child().as_any().is::<ReadOnlyField>());
	}

	#[rstest]
	fn test_value_falls_back_once_for_all_annotations(database: Arc<MemoryDatabase>) {
		// Arrange
		let registry = registry();
		let item = database.objects("Item").first().unwrap().unwrap();
		database.reset_queries();

		// Act
		let first = registry.value(item.as_ref(), "count_tags").unwrap();
		let reads: Vec<Value> = (0..10)
			.map(|_| registry.value(item.as_ref(), "tag_counts").unwrap())
			.collect();

		// Assert
		assert_eq!(first, json!(3));
		assert_eq!(reads[9], json!({"red": 2, "blue": 1}));
		assert_eq!(database.query_count(), 1);
	}

	#[rstest]
	fn test_value_uses_pushed_down_annotations(database: Arc<MemoryDatabase>) {
		// Arrange
		let registry = registry();
		let item = database
			.objects("Item")
			.annotate(&registry.all_annotations())
			.first()
			.unwrap()
			.unwrap();
		database.reset_queries();

		// Act
		let label = registry.value(item.as_ref(), "label").unwrap();

		// Assert
		assert_eq!(label, json!(format!("item {}", item.pk())));
		assert_eq!(database.query_count(), 0);
	}

	#[rstest]
	fn test_value_of_pushed_subset_skips_fallback(database: Arc<MemoryDatabase>) {
		// Arrange
		let registry = registry();
		let item = database
			.objects("Item")
			.annotate(&registry.get_annotations(&["label"]))
			.first()
			.unwrap()
			.unwrap();
		database.reset_queries();

		// Act
		registry.value(item.as_ref(), "label").unwrap();
		let reads_before_fallback = database.query_count();
		registry.value(item.as_ref(), "tag_counts").unwrap();

		// Assert
		assert_eq!(reads_before_fallback, 0);
		assert_eq!(database.query_count(), 1);
	}

	#[rstest]
	fn test_value_of_unknown_name_is_null(database: Arc<MemoryDatabase>) {
		let item = database.objects("Item").first().unwrap().unwrap();
		database.reset_queries();

		let value = registry().value(item.as_ref(), "bogus").unwrap();

		assert_eq!(value, Value::Null);
		assert_eq!(database.query_count(), 0);
	}

	struct Tagged;

	impl AnnotatedModel for Tagged {
		fn model_name() -> &'static str {
			"Item"
		}

		fn declare_annotations(builder: AnnotationRegistryBuilder) -> AnnotationRegistryBuilder {
			builder.annotation("count_tags", || AnnotationExpr::scalar(TestExpr::count("tags")))
		}
	}

	#[rstest]
	fn test_annotation_registry_is_cached_per_model() {
		let first = annotation_registry::<Tagged>().unwrap();
		let second = annotation_registry::<Tagged>().unwrap();

		assert!(Arc::ptr_eq(&first.inner, &second.inner));
		assert_eq!(first.model_name(), "Item");
	}
}
