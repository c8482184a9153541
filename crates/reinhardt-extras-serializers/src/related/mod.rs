//! Embedded related objects
//!
//! A serializer declares which relations may be embedded and how
//! ([`RelatedObject`]). A request selects relations through
//! `fields[<relation>]=...`, which the view turns into
//! [`SerializerContext::related_objects`]. For every selected relation the
//! [`RelatedObjects`] stage swaps the serializer's ordinary field for a
//! [`RelatedObjectField`] rendering the related object(s) with the child
//! serializer. Collections are filtered and, when a request is available,
//! paginated by a [`RelatedObjectPaginator`] driven by the `page(<n>)` and
//! `page_size(<n>)` tokens of the selection.
//!
//! [`SerializerContext::related_objects`]: reinhardt_extras_core::SerializerContext::related_objects

mod field;
mod paginator;
mod reference;
mod stage;

pub use field::RelatedObjectField;
pub use paginator::{PageState, RelatedObjectPaginator};
pub use reference::{SerializerRef, register_serializer, resolve_serializer};
pub use stage::RelatedObjects;

use reinhardt_extras_core::orm::{Instance, Lookups};
use reinhardt_extras_core::Permission;
use std::fmt;
use std::sync::Arc;

use crate::serializer::ModelSerializer;

/// Filter applied to a related collection before pagination.
#[derive(Clone)]
pub enum RelatedFilter {
	/// Pushed into the query as `filter(lookups)`. Applied to plain item
	/// lists as equality on each attribute.
	Lookups(Lookups),
	/// Applied in memory after fetching.
	Predicate(Arc<dyn Fn(&dyn Instance) -> bool + Send + Sync>),
}

impl fmt::Debug for RelatedFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RelatedFilter::Lookups(lookups) => f.debug_tuple("Lookups").field(lookups).finish(),
			RelatedFilter::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

/// How one relation is embedded.
///
/// # Examples
///
/// ```rust,ignore
/// use reinhardt_extras_core::lookups;
/// use reinhardt_extras_serializers::{ModelSerializer, RelatedObject};
///
/// let serializer = ModelSerializer::builder("RelatedManySerializer", "RelatedMany")
///     .field("id", IntegerField::read_only())
///     .field("foes", PrimaryKeyRelatedField::many())
///     .related_object(
///         "foes",
///         RelatedObject::path("tests.FooSerializer")
///             .many()
///             .filter(lookups! { "bar__startswith" => "test" }),
///     )
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RelatedObject {
	serializer: SerializerRef,
	many: bool,
	filter: Option<RelatedFilter>,
	permissions: Vec<Arc<dyn Permission>>,
}

impl RelatedObject {
	pub fn new(serializer: SerializerRef) -> Self {
		Self {
			serializer,
			many: false,
			filter: None,
			permissions: Vec::new(),
		}
	}

	/// Embed with a serializer built up front.
	pub fn serializer(serializer: Arc<ModelSerializer>) -> Self {
		Self::new(SerializerRef::direct(serializer))
	}

	/// Embed with a serializer registered under `path`, resolved on first use.
	pub fn path(path: impl Into<String>) -> Self {
		Self::new(SerializerRef::path(path))
	}

	/// Embed with a serializer built by `factory` on first use.
	pub fn factory(factory: fn() -> Arc<ModelSerializer>) -> Self {
		Self::new(SerializerRef::factory(factory))
	}

	/// The relation is a collection.
	pub fn many(mut self) -> Self {
		self.many = true;
		self
	}

	pub fn filter(mut self, lookups: Lookups) -> Self {
		self.filter = Some(RelatedFilter::Lookups(lookups));
		self
	}

	pub fn filter_fn<F>(mut self, predicate: F) -> Self
	where
		F: Fn(&dyn Instance) -> bool + Send + Sync + 'static,
	{
		self.filter = Some(RelatedFilter::Predicate(Arc::new(predicate)));
		self
	}

	/// Object-level permission every embedded object must pass.
	pub fn permission<P: Permission + 'static>(mut self, permission: P) -> Self {
		self.permissions.push(Arc::new(permission));
		self
	}

	pub fn serializer_ref(&self) -> &SerializerRef {
		&self.serializer
	}

	pub fn is_many(&self) -> bool {
		self.many
	}

	pub fn filter_rule(&self) -> Option<&RelatedFilter> {
		self.filter.as_ref()
	}

	pub fn permissions(&self) -> &[Arc<dyn Permission>] {
		&self.permissions
	}
}
