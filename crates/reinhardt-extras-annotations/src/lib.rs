//! # Reinhardt Extras Annotations
//!
//! Database-computed, read-only serializer fields.
//!
//! A model declares annotations once through an [`AnnotationRegistryBuilder`].
//! Views push the expressions of the fields they are about to render into
//! their queryset (`QuerySet::annotate`) so every value arrives with the row.
//! An instance loaded without them still works: the first read fetches every
//! missing annotation for that instance in one query and memoizes it.
//!
//! ```rust,ignore
//! use reinhardt_extras_annotations::{AnnotationExpr, AnnotationRegistry};
//!
//! let registry = AnnotationRegistry::builder("AnnotatedModel")
//!     .annotation("count_foo", || AnnotationExpr::scalar(Count::new("foo")))
//!     .annotation("list_foo", || {
//!         AnnotationExpr::group([
//!             ("test_1", Count::filtered("foo", "foo__bar", "test_1")),
//!             ("test_2", Count::filtered("foo", "foo__bar", "test_2")),
//!         ])
//!     })
//!     .build()?;
//!
//! let queryset = AnnotatedModel::objects().annotate(&registry.get_annotations(&["count_foo"]));
//! ```

pub mod annotation;
pub mod fields;
pub mod registry;

pub use annotation::{
	ANNOTATION_LIST_PREFIX, ANNOTATION_PREFIX, Annotation, AnnotationExpr, AnnotationGroup,
	ScalarAnnotation,
};
pub use fields::{AnnotationDictField, AnnotationField};
pub use registry::{
	AnnotatedModel, AnnotationRegistry, AnnotationRegistryBuilder, annotation_registry,
};
