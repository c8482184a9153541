//! Serializers over the fixture models

use reinhardt_extras::annotations::AnnotationRegistryBuilder;
use reinhardt_extras::core::fields::{CharField, IntegerField, PrimaryKeyRelatedField};
use reinhardt_extras::core::permissions::IsAuthenticated;
use reinhardt_extras::{
	AnnotatedModel, AnnotationExpr, MetaConfig, ModelSerializer, RelatedObject,
	annotation_registry, lookups,
};
use reinhardt_extras_test::TestExpr;
use std::sync::Arc;

/// `Many` declares a count, a weighted sum and a per-tag count group.
pub struct ManyModel;

impl AnnotatedModel for ManyModel {
	fn model_name() -> &'static str {
		"Many"
	}

	fn declare_annotations(builder: AnnotationRegistryBuilder) -> AnnotationRegistryBuilder {
		builder
			.annotation("count_foo", || AnnotationExpr::scalar(TestExpr::count("foes")))
			.annotation("complex_foo", || {
				AnnotationExpr::scalar(TestExpr::sum_case(
					"foes",
					"bar",
					[("test_1", 1), ("test_2", 2), ("test_3", 3)],
				))
			})
			.annotation("list_foo", || {
				AnnotationExpr::group(["test_1", "test_2", "test_3"].map(|tag| {
					(tag, TestExpr::count_where("foes", "bar", tag))
				}))
			})
	}
}

pub fn many_serializer() -> Arc<ModelSerializer> {
	ModelSerializer::builder("ManySerializer", "Many")
		.field("id", IntegerField::read_only())
		.field("name", CharField::new())
		.annotations(annotation_registry::<ManyModel>().unwrap())
		.dynamic_fields()
		.build()
}

/// `id`, `bar` and `creator`, with `@min` selecting `id`.
pub fn foo_serializer() -> Arc<ModelSerializer> {
	ModelSerializer::builder("FooSerializer", "Foo")
		.field("id", IntegerField::read_only())
		.field("bar", CharField::new())
		.field("creator", IntegerField::new())
		.meta(MetaConfig::new().with_field_group("min_fields", ["id"]))
		.dynamic_fields()
		.build()
}

pub fn bar_serializer() -> Arc<ModelSerializer> {
	ModelSerializer::builder("BarSerializer", "Bar")
		.field("id", IntegerField::read_only())
		.field("name", CharField::new())
		.dynamic_fields()
		.build()
}

/// `foo` requires an authenticated user, `foes` only embeds rows whose
/// `bar` starts with `test`.
pub fn owner_serializer() -> Arc<ModelSerializer> {
	ModelSerializer::builder("OwnerSerializer", "Owner")
		.field("id", IntegerField::read_only())
		.field("foo", PrimaryKeyRelatedField::new())
		.field("foes", PrimaryKeyRelatedField::many())
		.field("bars", PrimaryKeyRelatedField::many())
		.meta(MetaConfig::new().with_field_group("min_fields", ["id"]))
		.related_object(
			"foo",
			RelatedObject::serializer(foo_serializer()).permission(IsAuthenticated),
		)
		.related_object(
			"foes",
			RelatedObject::serializer(foo_serializer())
				.many()
				.filter(lookups! { "bar__startswith" => "test" }),
		)
		.related_object("bars", RelatedObject::serializer(bar_serializer()).many())
		.dynamic_fields()
		.build()
}
