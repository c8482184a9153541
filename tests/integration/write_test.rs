//! Integration tests for the write helpers
//!
//! Tests create-only and update-only fields and permissions on related
//! objects submitted in validated data.

use reinhardt_extras::core::fields::{CharField, IntegerField, PrimaryKeyRelatedField};
use reinhardt_extras::core::permissions::IsCreator;
use reinhardt_extras::{
	Error, FieldPermissions, MetaConfig, ModelSerializer, Permission, User,
};
use reinhardt_extras_test::RequestFactory;
use rstest::rstest;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::fixtures::{OwnerWorld, owner_world};

fn comment_serializer() -> Arc<ModelSerializer> {
	ModelSerializer::builder("CommentSerializer", "Comment")
		.field("id", IntegerField::read_only())
		.field("foo", PrimaryKeyRelatedField::new())
		.field("slug", CharField::new())
		.field("body", CharField::new())
		.meta(
			MetaConfig::new()
				.with_create_only_fields(["slug"])
				.with_permissions_for_field(
					FieldPermissions::new()
						.field("foo", vec![Arc::new(IsCreator) as Arc<dyn Permission>]),
				),
		)
		.build()
}

fn payload() -> Map<String, Value> {
	json!({"foo": 1, "slug": "first", "body": "hello"})
		.as_object()
		.cloned()
		.unwrap()
}

/// Test create-only fields are kept on create and dropped on update
#[rstest]
fn test_create_only_fields(owner_world: OwnerWorld) {
	// Arrange
	let serializer = comment_serializer();
	let comment_id = owner_world.db.insert("Comment", json!({"slug": "first"}));
	let comment = owner_world.db.get("Comment", comment_id).unwrap().unwrap();

	// Act
	let created = serializer.restrict_write_fields(payload(), None);
	let updated = serializer.restrict_write_fields(payload(), Some(comment.as_ref()));

	// Assert
	assert_eq!(Value::Object(created), json!({"foo": 1, "slug": "first", "body": "hello"}));
	assert_eq!(Value::Object(updated), json!({"foo": 1, "body": "hello"}));
	assert!(!serializer.is_required("slug", Some(comment.as_ref())));
}

/// Test a related object the user did not create is rejected on write
#[rstest]
#[case(1, None)]
#[case(2, Some("You do not have permission to use `foo` with id `1`."))]
fn test_field_permission_on_submitted_object(
	owner_world: OwnerWorld,
	#[case] user_id: i64,
	#[case] denial: Option<&str>,
) {
	// Arrange
	let serializer = comment_serializer();
	let foo = owner_world.db.get("Foo", owner_world.foo).unwrap().unwrap();
	let request = RequestFactory::new()
		.with_user(User::new(user_id, "writer"))
		.post("/comments/")
		.unwrap();

	// Act
	let result = serializer.validate_related(&request, &[("foo", foo.as_ref())]);

	// Assert
	match denial {
		None => assert!(result.is_ok()),
		Some(message) => {
			assert_eq!(result, Err(Error::PermissionDenied(message.to_string())))
		}
	}
}

/// Test unguarded fields are never checked
#[rstest]
fn test_unguarded_field_is_not_checked(owner_world: OwnerWorld) {
	// Arrange
	let serializer = comment_serializer();
	let foe = owner_world.db.get("Foo", owner_world.foes[0]).unwrap().unwrap();
	let request = RequestFactory::new()
		.with_user(User::new(1, "writer"))
		.post("/comments/")
		.unwrap();

	// Act
	let result = serializer.validate_related(&request, &[("other", foe.as_ref())]);

	// Assert
	assert!(result.is_ok());
}
