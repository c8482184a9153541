//! Serializers for reinhardt-extras
//!
//! A [`ModelSerializer`] is declared once and bound per request. Binding
//! runs its stages over the declared fields:
//!
//! 1. [`AnnotationFields`] adds the model's annotations as read-only fields
//! 2. [`RelatedObjects`] embeds the relations selected with `fields[<relation>]`
//! 3. [`DynamicFields`] narrows everything to the `fields=` selection
//!
//! ```rust,ignore
//! let bound = FooSerializer.bind(
//!     SerializerOptions::new()
//!         .fields(["id", "@default"])
//!         .context(SerializerContext::new().related_object("foes", ["id", "page(2)"])),
//! )?;
//! let data = bound.to_representation(foo.as_ref())?;
//! ```

pub mod annotated;
pub mod dynamic_fields;
pub mod generic;
pub mod list;
pub mod meta;
pub mod related;
pub mod serializer;
pub mod write;

pub use annotated::AnnotationFields;
pub use dynamic_fields::DynamicFields;
pub use generic::GenericField;
pub use list::{ItemGuard, ListPaginator, PaginatedListSerializer};
pub use meta::MetaConfig;
pub use related::{
	PageState, RelatedFilter, RelatedObject, RelatedObjectField, RelatedObjectPaginator,
	RelatedObjects, SerializerRef, register_serializer, resolve_serializer,
};
pub use serializer::{
	BoundSerializer, ModelSerializer, ModelSerializerBuilder, SerializerOptions, SerializerStage,
};
pub use write::{FieldPermissions, WriteOperation, strip_restricted_fields};
