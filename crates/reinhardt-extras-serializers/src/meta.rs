//! Meta configuration for serializers
//!
//! Django REST Framework-style `Meta` options that are not fields
//! themselves: named field groups for dynamic field selection and the
//! write-path field restrictions.

use indexmap::IndexMap;

use crate::write::FieldPermissions;

/// Configuration builder for serializers
///
/// # Examples
///
/// ```
/// use reinhardt_extras_serializers::MetaConfig;
///
/// let config = MetaConfig::new()
///     .with_field_group("min_fields", ["id"])
///     .with_field_group("default_fields", ["id", "bar"])
///     .with_create_only_fields(["bar"]);
///
/// assert_eq!(config.field_group("min_fields"), Some(&["id".to_string()][..]));
/// assert!(config.field_group("list_fields").is_none());
/// assert!(config.is_create_only("bar"));
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct MetaConfig {
	field_groups: IndexMap<String, Vec<String>>,
	create_only_fields: Vec<String>,
	update_only_fields: Vec<String>,
	permissions_for_field: FieldPermissions,
}

impl MetaConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare a named group of fields (`min_fields`, `default_fields`, ...).
	pub fn with_field_group<I, S>(mut self, group: impl Into<String>, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.field_groups
			.insert(group.into(), fields.into_iter().map(Into::into).collect());
		self
	}

	/// Fields accepted when creating and dropped when updating.
	pub fn with_create_only_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.create_only_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Fields accepted when updating and dropped when creating.
	pub fn with_update_only_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.update_only_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Object permissions for related objects submitted in `fields`.
	pub fn with_permissions_for_field(mut self, permissions: FieldPermissions) -> Self {
		self.permissions_for_field = permissions;
		self
	}

	pub fn field_group(&self, group: &str) -> Option<&[String]> {
		self.field_groups.get(group).map(Vec::as_slice)
	}

	pub fn create_only_fields(&self) -> &[String] {
		&self.create_only_fields
	}

	pub fn update_only_fields(&self) -> &[String] {
		&self.update_only_fields
	}

	pub fn is_create_only(&self, field: &str) -> bool {
		self.create_only_fields.iter().any(|f| f == field)
	}

	pub fn is_update_only(&self, field: &str) -> bool {
		self.update_only_fields.iter().any(|f| f == field)
	}

	pub fn permissions_for_field(&self) -> &FieldPermissions {
		&self.permissions_for_field
	}
}
