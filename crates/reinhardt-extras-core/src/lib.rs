//! # Reinhardt Extras Core
//!
//! Shared building blocks for the reinhardt-extras crates.
//!
//! ## Overview
//!
//! - [`exception`]: the [`Error`] taxonomy and [`Result`] alias
//! - [`settings`]: [`ExtrasSettings`], loaded from TOML and the environment
//! - [`tokens`]: parsing of `fields` / `fields[<relation>]` token lists
//! - [`orm`]: the query collaborator contracts ([`QuerySet`], [`Instance`], [`Expression`])
//! - [`request`]: the request collaborator and query-parameter rewriting
//! - [`fields`]: the serializer [`Field`] trait, leaf fields and the output-type registry
//! - [`permissions`]: DRF-style permission classes

pub mod context;
pub mod exception;
pub mod fields;
pub mod orm;
pub mod permissions;
pub mod request;
pub mod settings;
pub mod tokens;

pub use context::SerializerContext;
pub use exception::{Error, Result};
pub use fields::{Field, FieldTypeRegistry, Fields};
pub use orm::{
	AnnotationCache, AnnotationMap, Expression, Instance, Lookups, OutputType, QuerySet, Relation,
};
pub use permissions::{Permission, PermissionContext};
pub use request::{Request, User};
pub use settings::ExtrasSettings;
pub use tokens::{Directive, FieldTokens, match_iterator_pattern};

#[doc(hidden)]
pub mod __private {
	pub use serde_json::json;
}
