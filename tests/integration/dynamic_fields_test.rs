//! Integration tests for dynamic field selection
//!
//! Tests narrowing a serializer with literal names, `@all` and named groups.

use reinhardt_extras::core::fields::{CharField, IntegerField};
use reinhardt_extras::{Error, ModelSerializer, SerializerOptions};
use rstest::rstest;
use serde_json::{Value, json};

use crate::fixtures::{OwnerWorld, foo_serializer, owner_world};

fn render_foo(world: &OwnerWorld, fields: Option<&[&str]>) -> Value {
	let mut options = SerializerOptions::new();
	if let Some(fields) = fields {
		options = options.fields(fields.iter().copied());
	}
	let serializer = foo_serializer().bind(options).unwrap();
	let instance = world.db.get("Foo", world.foo).unwrap().unwrap();
	serializer.to_representation(instance.as_ref()).unwrap()
}

/// Test narrowing the three-field `Foo` serializer
#[rstest]
#[case(None, json!({"id": 1, "bar": "test", "creator": 1}))]
#[case(Some(&["id"][..]), json!({"id": 1}))]
#[case(Some(&["id", "id"][..]), json!({"id": 1}))]
#[case(Some(&["@all"][..]), json!({"id": 1, "bar": "test", "creator": 1}))]
#[case(Some(&["bogus"][..]), json!({}))]
#[case(Some(&[][..]), json!({}))]
#[case(Some(&["@min"][..]), json!({"id": 1}))]
#[case(Some(&["@min", "bar"][..]), json!({"id": 1, "bar": "test"}))]
fn test_field_narrowing(
	owner_world: OwnerWorld,
	#[case] fields: Option<&[&str]>,
	#[case] expected: Value,
) {
	// Act
	let data = render_foo(&owner_world, fields);

	// Assert
	assert_eq!(data, expected);
}

/// Test rendered keys keep declaration order, not request order
#[rstest]
fn test_narrowing_keeps_declaration_order(owner_world: OwnerWorld) {
	// Arrange
	let serializer = foo_serializer()
		.bind(SerializerOptions::new().fields(["creator", "id"]))
		.unwrap();

	// Act
	let names = serializer.field_names();
	let instance = owner_world.db.get("Foo", owner_world.foo).unwrap().unwrap();
	let data = serializer.to_representation(instance.as_ref()).unwrap();

	// Assert
	assert_eq!(names, vec!["id", "creator"]);
	let keys: Vec<&String> = data.as_object().unwrap().keys().collect();
	assert_eq!(keys, vec!["id", "creator"]);
}

/// Test a serializer without field selection rejects a field list
#[rstest]
fn test_static_serializer_rejects_field_list() {
	// Arrange
	let serializer = ModelSerializer::builder("StaticSerializer", "Foo")
		.field("id", IntegerField::read_only())
		.field("bar", CharField::new())
		.build();

	// Act
	let result = serializer.bind(SerializerOptions::new().fields(["id"]));

	// Assert
	assert!(matches!(result, Err(Error::ImproperlyConfigured(_))));
}
