//! Write-path helpers: create/update-only fields and field permissions

use reinhardt_extras_core::orm::Instance;
use reinhardt_extras_core::permissions::check_object;
use reinhardt_extras_core::{Error, Permission, PermissionContext, Request, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::meta::MetaConfig;
use crate::serializer::ModelSerializer;

/// Which write is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
	Create,
	Update,
}

impl WriteOperation {
	/// `Update` when an instance is being modified.
	pub fn for_instance(instance: Option<&dyn Instance>) -> Self {
		if instance.is_some() {
			WriteOperation::Update
		} else {
			WriteOperation::Create
		}
	}
}

/// Drop the fields `operation` may not set: create-only fields on update,
/// update-only fields on create.
pub fn strip_restricted_fields(
	meta: &MetaConfig,
	mut data: Map<String, Value>,
	operation: WriteOperation,
) -> Map<String, Value> {
	let restricted = match operation {
		WriteOperation::Create => meta.update_only_fields(),
		WriteOperation::Update => meta.create_only_fields(),
	};
	data.retain(|field, _| !restricted.contains(field));
	data
}

/// Permissions guarding related objects by the field they are submitted in.
///
/// Entries are field tuples sharing one permission list. A field listed in
/// several entries uses the first.
#[derive(Debug, Clone, Default)]
pub struct FieldPermissions {
	entries: Vec<(Vec<String>, Vec<Arc<dyn Permission>>)>,
}

impl FieldPermissions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fields<I, S>(mut self, fields: I, permissions: Vec<Arc<dyn Permission>>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.entries
			.push((fields.into_iter().map(Into::into).collect(), permissions));
		self
	}

	pub fn field(self, field: impl Into<String>, permissions: Vec<Arc<dyn Permission>>) -> Self {
		self.fields([field.into()], permissions)
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn permissions_for(&self, field: &str) -> Option<&[Arc<dyn Permission>]> {
		self.entries
			.iter()
			.find(|(fields, _)| fields.iter().any(|f| f == field))
			.map(|(_, permissions)| permissions.as_slice())
	}

	/// Check every guarded field present in `attrs`.
	///
	/// # Errors
	///
	/// [`Error::PermissionDenied`] naming the field and the object id.
	pub fn validate(&self, request: &Request, attrs: &[(&str, &dyn Instance)]) -> Result<()> {
		let context = PermissionContext::from_request(request);
		for (field, obj) in attrs {
			let Some(permissions) = self.permissions_for(field) else {
				continue;
			};
			if permissions
				.iter()
				.all(|permission| check_object(permission.as_ref(), &context, *obj))
			{
				continue;
			}
			let id = match obj.pk() {
				Value::String(id) => id,
				id => id.to_string(),
			};
			tracing::debug!(field = %field, id = %id, "field permission denied");
			return Err(Error::PermissionDenied(format!(
				"You do not have permission to use `{}` with id `{}`.",
				field, id
			)));
		}
		Ok(())
	}
}

impl ModelSerializer {
	/// Validated data with the fields this operation may not set removed.
	pub fn restrict_write_fields(
		&self,
		data: Map<String, Value>,
		instance: Option<&dyn Instance>,
	) -> Map<String, Value> {
		strip_restricted_fields(self.meta(), data, WriteOperation::for_instance(instance))
	}

	/// Whether `field` must be supplied. Create-only fields become optional
	/// on update.
	pub fn is_required(&self, field: &str, instance: Option<&dyn Instance>) -> bool {
		match WriteOperation::for_instance(instance) {
			WriteOperation::Update => !self.meta().is_create_only(field),
			WriteOperation::Create => !self.meta().is_update_only(field),
		}
	}

	/// Run the field permissions declared in the serializer's meta.
	pub fn validate_related(&self, request: &Request, attrs: &[(&str, &dyn Instance)]) -> Result<()> {
		self.meta().permissions_for_field().validate(request, attrs)
	}
}
