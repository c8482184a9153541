//! The field rendering one selected relation

use reinhardt_extras_core::orm::{Instance, Relation};
use reinhardt_extras_core::permissions::check_object;
use reinhardt_extras_core::tokens::FieldTokens;
use reinhardt_extras_core::{
	Error, Field, Permission, PermissionContext, Request, Result, SerializerContext,
};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::{RelatedFilter, RelatedObject, RelatedObjectPaginator};
use crate::list::PaginatedListSerializer;
use crate::serializer::{BoundSerializer, SerializerOptions};

/// Renders a relation with its child serializer instead of its ids.
#[derive(Debug, Clone)]
pub struct RelatedObjectField {
	relation: String,
	tokens: Vec<String>,
	child: Arc<BoundSerializer>,
	many: bool,
	filter: Option<RelatedFilter>,
	permissions: Vec<Arc<dyn Permission>>,
}

impl RelatedObjectField {
	/// Resolve and bind the child serializer for `relation`, selected with
	/// `tokens`.
	///
	/// # Errors
	///
	/// [`Error::ImproperlyConfigured`] when the child serializer cannot be
	/// resolved or does not support dynamic fields.
	pub fn bind(
		relation: impl Into<String>,
		related_object: &RelatedObject,
		tokens: &[String],
		context: &SerializerContext,
	) -> Result<Self> {
		let relation = relation.into();
		let serializer = related_object.serializer_ref().resolve()?;
		if !serializer.supports_dynamic_fields() {
			return Err(Error::ImproperlyConfigured(format!(
				"`{}` must support dynamic fields to be used for the related object `{}`",
				serializer.name(),
				relation
			)));
		}
		let parsed = FieldTokens::parse(tokens);
		let child = serializer.bind(SerializerOptions {
			fields: Some(parsed.fields),
			context: context.for_child(),
		})?;
		Ok(Self {
			relation,
			tokens: tokens.to_vec(),
			child: Arc::new(child),
			many: related_object.is_many(),
			filter: related_object.filter_rule().cloned(),
			permissions: related_object.permissions().to_vec(),
		})
	}

	pub fn relation(&self) -> &str {
		&self.relation
	}

	pub fn child(&self) -> &BoundSerializer {
		&self.child
	}

	pub fn is_many(&self) -> bool {
		self.many
	}

	fn check_permissions(&self, context: &SerializerContext, obj: &dyn Instance) -> Result<()> {
		check_permissions(&self.relation, &self.permissions, context.request.as_deref(), obj)
	}

	fn represent_one(&self, relation: Relation, context: &SerializerContext) -> Result<Value> {
		let instance = match relation {
			Relation::One(queryset) | Relation::Many(queryset) => {
				let annotations = self.child.annotation_map();
				if annotations.is_empty() {
					queryset.first()?
				} else {
					queryset.annotate(&annotations).first()?
				}
			}
			Relation::Items(items) => items.into_iter().next(),
		};
		let Some(instance) = instance else {
			return Ok(Value::Null);
		};
		self.check_permissions(context, instance.as_ref())?;
		self.child.to_representation(instance.as_ref())
	}

	fn represent_many(&self, relation: Relation, context: &SerializerContext) -> Result<Value> {
		let mut list =
			PaginatedListSerializer::new(self.child.clone()).with_filter(self.filter.clone());
		if let Some(request) = &context.request {
			list = list.with_paginator(Box::new(RelatedObjectPaginator::new(
				self.relation.clone(),
				&self.tokens,
				request.clone(),
				context.settings.related_object_page_size,
			)));
		}
		if !self.permissions.is_empty() {
			let relation_name = self.relation.clone();
			let permissions = self.permissions.clone();
			let request = context.request.clone();
			list = list.with_guard(Arc::new(move |obj: &dyn Instance| -> Result<()> {
				check_permissions(&relation_name, &permissions, request.as_deref(), obj)
			}));
		}
		list.to_representation(relation)
	}
}

/// Every permission must pass both its checks. Without a request nothing
/// passes.
fn check_permissions(
	relation: &str,
	permissions: &[Arc<dyn Permission>],
	request: Option<&Request>,
	obj: &dyn Instance,
) -> Result<()> {
	if permissions.is_empty() {
		return Ok(());
	}
	let allowed = request.is_some_and(|request| {
		let context = PermissionContext::from_request(request);
		permissions
			.iter()
			.all(|permission| check_object(permission.as_ref(), &context, obj))
	});
	if allowed {
		return Ok(());
	}
	tracing::debug!(relation = %relation, "related object permission denied");
	Err(Error::PermissionDenied(format!(
		"You do not have permission to access the related object `{}`.",
		relation
	)))
}

impl Field for RelatedObjectField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		Ok(value.clone())
	}

	fn represent(
		&self,
		instance: &dyn Instance,
		_field_name: &str,
		context: &SerializerContext,
	) -> Result<Value> {
		let Some(relation) = instance.related(&self.relation) else {
			return Ok(Value::Null);
		};
		if self.many {
			self.represent_many(relation, context)
		} else {
			self.represent_one(relation, context)
		}
	}

	fn is_read_only(&self) -> bool {
		true
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}
