//! `fields=` narrowing

use indexmap::{IndexMap, IndexSet};
use reinhardt_extras_core::{Fields, Result};

use crate::serializer::{ModelSerializer, SerializerOptions, SerializerStage};

/// Narrows a serializer's fields to a requested token list.
///
/// With no token list nothing changes. When the list contains the
/// all-fields token nothing changes either. Otherwise every group token
/// (`@min`, `@default`, ...) expands to the matching [`MetaConfig`] group,
/// and every field outside the resulting set is dropped. Unknown names are
/// ignored.
///
/// Group tokens and the all-fields token come from the context settings
/// unless overridden here.
///
/// [`MetaConfig`]: crate::MetaConfig
#[derive(Debug, Clone, Default)]
pub struct DynamicFields {
	field_types: Option<IndexMap<String, String>>,
	all_token: Option<String>,
}

impl DynamicFields {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the group-token mapping (token to `MetaConfig` group name).
	pub fn with_field_types<I, K, V>(mut self, field_types: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.field_types = Some(
			field_types
				.into_iter()
				.map(|(token, group)| (token.into(), group.into()))
				.collect(),
		);
		self
	}

	pub fn with_all_token(mut self, token: impl Into<String>) -> Self {
		self.all_token = Some(token.into());
		self
	}

	/// Names allowed by `requested`, or `None` when narrowing is disabled.
	pub fn allowed_fields(
		&self,
		serializer: &ModelSerializer,
		requested: &[String],
		options: &SerializerOptions,
	) -> Option<IndexSet<String>> {
		let settings = &options.context.settings;
		let all_token = self.all_token.as_deref().unwrap_or(&settings.all_fields_token);
		if requested.iter().any(|token| token == all_token) {
			return None;
		}
		let field_types = self.field_types.as_ref().unwrap_or(&settings.field_types);
		let mut allowed: IndexSet<String> = requested.iter().cloned().collect();
		for token in requested {
			let Some(group) = field_types.get(token) else {
				continue;
			};
			if let Some(names) = serializer.meta().field_group(group) {
				allowed.extend(names.iter().cloned());
			}
		}
		Some(allowed)
	}
}

impl SerializerStage for DynamicFields {
	fn name(&self) -> &'static str {
		"dynamic_fields"
	}

	fn narrows_fields(&self) -> bool {
		true
	}

	fn apply(
		&self,
		serializer: &ModelSerializer,
		fields: &mut Fields,
		options: &SerializerOptions,
	) -> Result<()> {
		let Some(requested) = &options.fields else {
			return Ok(());
		};
		if let Some(allowed) = self.allowed_fields(serializer, requested, options) {
			fields.retain(|name, _| allowed.contains(name));
		}
		Ok(())
	}
}
