//! Integration tests for embedded related objects
//!
//! Tests selection, filtering, permissions and serializer references of
//! related objects rendered through a serializer context.

use reinhardt_extras::core::fields::{CharField, IntegerField, PrimaryKeyRelatedField};
use reinhardt_extras::{
	Error, ModelSerializer, RelatedObject, Request, SerializerContext, SerializerOptions, User,
	register_serializer,
};
use reinhardt_extras_test::RequestFactory;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::fixtures::{OwnerWorld, bar_serializer, owner_serializer, owner_world};

fn render_owner(
	world: &OwnerWorld,
	serializer: &ModelSerializer,
	context: SerializerContext,
) -> reinhardt_extras::Result<Value> {
	let owner = world.db.get("Owner", world.owner)?.unwrap();
	world.db.reset_queries();
	serializer
		.bind(SerializerOptions::new().context(context))?
		.to_representation(owner.as_ref())
}

fn request_as(user: Option<User>) -> Arc<Request> {
	let factory = match user {
		Some(user) => RequestFactory::new().with_user(user),
		None => RequestFactory::new(),
	};
	Arc::new(factory.get("/owners/1/").unwrap())
}

/// Test relations render as ids until selected
#[rstest]
fn test_unselected_relations_render_ids(owner_world: OwnerWorld) {
	// Act
	let data = render_owner(&owner_world, &owner_serializer(), SerializerContext::new()).unwrap();

	// Assert
	assert_eq!(
		data,
		json!({
			"id": owner_world.owner,
			"foo": owner_world.foo,
			"foes": owner_world.foes,
			"bars": owner_world.bars,
		})
	);
}

/// Test a selected collection embeds only rows matching its filter
#[rstest]
fn test_selected_collection_is_filtered(owner_world: OwnerWorld) {
	// Arrange
	let context = SerializerContext::new().related_object("foes", ["id"]);

	// Act
	let data = render_owner(&owner_world, &owner_serializer(), context).unwrap();

	// Assert
	let expected: Vec<Value> = owner_world
		.matching
		.iter()
		.map(|id| json!({"id": id}))
		.collect();
	assert_eq!(data["foes"], Value::Array(expected));
	// Embedded foes, then the ids of bars
	assert_eq!(owner_world.db.query_count(), 2);
}

/// Test a selected single relation renders the child serializer
#[rstest]
fn test_selected_single_relation(owner_world: OwnerWorld) {
	// Arrange
	let context = SerializerContext::new()
		.with_request(request_as(Some(User::new(1, "alice"))))
		.related_object("foo", ["id", "bar"]);

	// Act
	let data = render_owner(&owner_world, &owner_serializer(), context).unwrap();

	// Assert
	assert_eq!(data["foo"], json!({"id": owner_world.foo, "bar": "test"}));
	assert_eq!(data["foes"], json!(owner_world.foes));
}

/// Test a denied relation fails with a message naming the relation
#[rstest]
#[case(None)]
#[case(Some(User::new(1, "alice").inactive()))]
fn test_denied_relation_is_forbidden(owner_world: OwnerWorld, #[case] user: Option<User>) {
	// Arrange
	let context = SerializerContext::new()
		.with_request(request_as(user))
		.related_object("foo", ["id", "bar"]);

	// Act
	let result = render_owner(&owner_world, &owner_serializer(), context);

	// Assert
	assert_eq!(
		result,
		Err(Error::PermissionDenied(
			"You do not have permission to access the related object `foo`.".to_string()
		))
	);
}

/// Test a relation whose serializer cannot narrow its fields is rejected
#[rstest]
fn test_static_child_serializer_is_improperly_configured(owner_world: OwnerWorld) {
	// Arrange
	let child = ModelSerializer::builder("StaticBarSerializer", "Bar")
		.field("id", IntegerField::read_only())
		.field("name", CharField::new())
		.build();
	let serializer = ModelSerializer::builder("OwnerSerializer", "Owner")
		.field("id", IntegerField::read_only())
		.field("bars", PrimaryKeyRelatedField::many())
		.related_object("bars", RelatedObject::serializer(child).many())
		.build();
	let context = SerializerContext::new().related_object("bars", ["id"]);

	// Act
	let result = render_owner(&owner_world, &serializer, context);

	// Assert
	assert!(matches!(result, Err(Error::ImproperlyConfigured(_))));
}

/// Test a relation referencing its serializer by registered path
#[rstest]
fn test_serializer_resolved_by_path(owner_world: OwnerWorld) {
	// Arrange
	register_serializer("integration.BarSerializer", bar_serializer());
	let serializer = ModelSerializer::builder("OwnerSerializer", "Owner")
		.field("id", IntegerField::read_only())
		.field("bars", PrimaryKeyRelatedField::many())
		.related_object(
			"bars",
			RelatedObject::path("integration.BarSerializer").many(),
		)
		.build();
	let context = SerializerContext::new().related_object("bars", ["name"]);

	// Act
	let data = render_owner(&owner_world, &serializer, context).unwrap();

	// Assert
	assert_eq!(data["bars"], json!([{"name": "a"}, {"name": "b"}]));
}

/// Test an unregistered serializer path is a configuration error
#[rstest]
fn test_unregistered_path_is_improperly_configured(owner_world: OwnerWorld) {
	// Arrange
	let serializer = ModelSerializer::builder("OwnerSerializer", "Owner")
		.field("id", IntegerField::read_only())
		.field("bars", PrimaryKeyRelatedField::many())
		.related_object("bars", RelatedObject::path("integration.Missing").many())
		.build();
	let context = SerializerContext::new().related_object("bars", ["name"]);

	// Act
	let result = render_owner(&owner_world, &serializer, context);

	// Assert
	assert_eq!(
		result,
		Err(Error::ImproperlyConfigured(
			"could not resolve serializer `integration.Missing`".to_string()
		))
	);
}
