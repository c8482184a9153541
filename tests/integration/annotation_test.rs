//! Integration tests for model annotations
//!
//! Annotation values pushed down into the queryset, the fallback fetch for
//! instances loaded without them, and annotation fields on serializers.

use reinhardt_extras::{SerializerOptions, annotation_registry};
use rstest::rstest;
use serde_json::{Value, json};

use crate::fixtures::{ManyModel, TaggedWorld, many_serializer, tagged_world};

/// Test the wildcard selects every scalar and group annotation
#[rstest]
fn test_wildcard_selects_every_annotation() {
	// Arrange
	let registry = annotation_registry::<ManyModel>().unwrap();

	// Act
	let names = registry.intersection(&["*"]);
	let expressions = registry.get_annotations(&["*"]);

	// Assert
	assert_eq!(names, vec!["count_foo", "complex_foo", "list_foo"]);
	// Two scalars plus three group members
	assert_eq!(expressions.len(), 5);
}

/// Test serializing an annotated instance reproduces every expression value
#[rstest]
fn test_annotated_instance_renders_expression_values(tagged_world: TaggedWorld) {
	// Arrange
	let TaggedWorld { db, many } = tagged_world;
	let registry = annotation_registry::<ManyModel>().unwrap();
	let serializer = many_serializer().bind(SerializerOptions::new()).unwrap();
	let instance = db
		.objects("Many")
		.annotate(&registry.get_annotations(&["*"]))
		.first()
		.unwrap()
		.unwrap();
	db.reset_queries();

	// Act
	let data = serializer.to_representation(instance.as_ref()).unwrap();

	// Assert
	assert_eq!(
		data,
		json!({
			"id": many,
			"name": "tagged",
			"count_foo": 6,
			"complex_foo": 13,
			"list_foo": {"test_1": 2, "test_2": 1, "test_3": 3},
		})
	);
	assert_eq!(db.query_count(), 0);
}

/// Test an instance fetched without annotations loads them all in one query
#[rstest]
fn test_fallback_fetch_runs_once(tagged_world: TaggedWorld) {
	// Arrange
	let TaggedWorld { db, many } = tagged_world;
	let registry = annotation_registry::<ManyModel>().unwrap();
	let instance = db.get("Many", many).unwrap().unwrap();
	db.reset_queries();

	// Act
	let count = registry.value(instance.as_ref(), "count_foo").unwrap();
	let after_first = db.query_count();
	let complex = registry.value(instance.as_ref(), "complex_foo").unwrap();
	let list = registry.value(instance.as_ref(), "list_foo").unwrap();
	let again = registry.value(instance.as_ref(), "count_foo").unwrap();

	// Assert
	assert_eq!(count, json!(6));
	assert_eq!(complex, json!(13));
	assert_eq!(list, json!({"test_1": 2, "test_2": 1, "test_3": 3}));
	assert_eq!(again, count);
	assert_eq!(after_first, 1);
	assert_eq!(db.query_count(), 1);
}

/// Test unknown annotation names read as null without querying
#[rstest]
fn test_unknown_annotation_is_null(tagged_world: TaggedWorld) {
	// Arrange
	let TaggedWorld { db, many } = tagged_world;
	let registry = annotation_registry::<ManyModel>().unwrap();
	let instance = db.get("Many", many).unwrap().unwrap();
	db.reset_queries();

	// Act
	let value = registry.value(instance.as_ref(), "missing").unwrap();

	// Assert
	assert_eq!(value, Value::Null);
	assert_eq!(db.query_count(), 0);
}

/// Test narrowing to one annotation renders only that annotation
#[rstest]
fn test_narrowed_serializer_renders_selected_annotation(tagged_world: TaggedWorld) {
	// Arrange
	let TaggedWorld { db, many } = tagged_world;
	let serializer = many_serializer()
		.bind(SerializerOptions::new().fields(["id", "list_foo"]))
		.unwrap();
	let annotations = serializer.annotation_map();
	let instance = db
		.objects("Many")
		.annotate(&annotations)
		.first()
		.unwrap()
		.unwrap();
	db.reset_queries();

	// Act
	let data = serializer.to_representation(instance.as_ref()).unwrap();

	// Assert
	assert_eq!(annotations.len(), 3);
	assert_eq!(
		data,
		json!({"id": many, "list_foo": {"test_1": 2, "test_2": 1, "test_3": 3}})
	);
	assert_eq!(db.query_count(), 0);
}
