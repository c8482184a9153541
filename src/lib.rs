//! # Reinhardt Extras
//!
//! Serializer and viewset extensions for Reinhardt REST APIs.
//!
//! - **Annotations**: computed values declared once on a model, pushed down
//!   into the queryset and exposed as read-only serializer fields
//! - **Dynamic fields**: clients narrow a response with `?fields=id,name`
//!   and named groups such as `@min`
//! - **Related objects**: embedded child serializers selected per request,
//!   with filtering, per-relation pagination and permissions
//! - **Permissions**: permissions per action and per writable field
//!
//! ## Feature Flags
//!
//! - `minimal` - annotations and serializers
//! - `full` (default) - `minimal` plus the viewset layer
//! - `annotations`, `serializers`, `views` - individual layers
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_extras::prelude::*;
//!
//! let registry = AnnotationRegistry::builder("Foo")
//! 	.annotation("count_bars", || AnnotationExpr::scalar(Count::new("bars")))
//! 	.build()?;
//!
//! let serializer = ModelSerializer::builder("FooSerializer", "Foo")
//! 	.field("id", IntegerField::read_only())
//! 	.annotations(registry)
//! 	.dynamic_fields()
//! 	.build();
//!
//! let view = ModelViewSet::new("foo", serializer, move || db.objects("Foo"))
//! 	.with_dynamic_fields()
//! 	.with_annotations();
//! ```

pub use reinhardt_extras_core as core;

#[cfg(feature = "annotations")]
pub use reinhardt_extras_annotations as annotations;

#[cfg(feature = "serializers")]
pub use reinhardt_extras_serializers as serializers;

#[cfg(feature = "views")]
pub use reinhardt_extras_views as views;

pub use reinhardt_extras_core::lookups;
pub use reinhardt_extras_core::{
	Error, ExtrasSettings, Field, FieldTokens, Fields, Instance, Permission, QuerySet, Relation,
	Request, Result, SerializerContext, User,
};

#[cfg(feature = "annotations")]
pub use reinhardt_extras_annotations::{
	AnnotatedModel, Annotation, AnnotationExpr, AnnotationGroup, AnnotationRegistry,
	annotation_registry,
};

#[cfg(feature = "serializers")]
pub use reinhardt_extras_serializers::{
	BoundSerializer, DynamicFields, FieldPermissions, GenericField, MetaConfig, ModelSerializer,
	RelatedObject, SerializerOptions, register_serializer,
};

#[cfg(feature = "views")]
pub use reinhardt_extras_views::{Action, ModelViewSet, PermissionByAction, Response};

/// Commonly used types
pub mod prelude {
	pub use crate::{
		Error, ExtrasSettings, Field, FieldTokens, Fields, Instance, Permission, QuerySet,
		Relation, Request, Result, SerializerContext, User,
	};

	#[cfg(feature = "annotations")]
	pub use crate::{
		AnnotatedModel, Annotation, AnnotationExpr, AnnotationGroup, AnnotationRegistry,
		annotation_registry,
	};

	#[cfg(feature = "serializers")]
	pub use crate::{
		BoundSerializer, DynamicFields, FieldPermissions, GenericField, MetaConfig,
		ModelSerializer, RelatedObject, SerializerOptions, register_serializer,
	};

	#[cfg(feature = "views")]
	pub use crate::{Action, ModelViewSet, PermissionByAction, Response};
}
