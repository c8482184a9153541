//! Library settings
//!
//! Settings are plain data loaded from TOML and optionally overridden from
//! environment variables prefixed with `REINHARDT_EXTRAS_`. They are handed to
//! serializers through the serializer context rather than read from a global,
//! so tests can inject a different page size per request.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::exception::{Error, Result};

/// Default page size for embedded related-object collections.
pub const RELATED_OBJECT_PAGINATED_BY: usize = 100;

/// Environment variable prefix used by [`ExtrasSettings::with_env_overrides`].
pub const ENV_PREFIX: &str = "REINHARDT_EXTRAS_";

static GLOBAL: Lazy<Arc<ExtrasSettings>> = Lazy::new(|| {
	let settings = ExtrasSettings::default();
	match settings.clone().with_env_overrides() {
		Ok(settings) => Arc::new(settings),
		Err(err) => {
			tracing::warn!(error = %err, "ignoring invalid reinhardt-extras environment overrides");
			Arc::new(settings)
		}
	}
});

/// Settings controlling field selection and related-object pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrasSettings {
	/// Page size used when a relation's field tokens carry no `page_size(n)`.
	pub related_object_page_size: usize,
	/// Token disabling dynamic-field narrowing.
	pub all_fields_token: String,
	/// Token selecting every registered annotation.
	pub annotation_wildcard: String,
	/// Named field-group tokens mapped to the serializer metadata group they expand to.
	pub field_types: IndexMap<String, String>,
	/// Name of the top-level field-selection query parameter.
	pub fields_query_param: String,
}

impl Default for ExtrasSettings {
	fn default() -> Self {
		let mut field_types = IndexMap::new();
		field_types.insert("@min".to_string(), "min_fields".to_string());
		field_types.insert("@default".to_string(), "default_fields".to_string());
		Self {
			related_object_page_size: RELATED_OBJECT_PAGINATED_BY,
			all_fields_token: "@all".to_string(),
			annotation_wildcard: "*".to_string(),
			field_types,
			fields_query_param: "fields".to_string(),
		}
	}
}

impl ExtrasSettings {
	/// Process-wide defaults, with environment overrides applied once.
	pub fn global() -> Arc<ExtrasSettings> {
		GLOBAL.clone()
	}

	/// Parse settings from a TOML document. Missing keys keep their defaults.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_extras_core::settings::ExtrasSettings;
	///
	/// let settings = ExtrasSettings::from_toml_str("related_object_page_size = 25").unwrap();
	/// assert_eq!(settings.related_object_page_size, 25);
	/// assert_eq!(settings.all_fields_token, "@all");
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let settings: ExtrasSettings = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Read settings from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|err| {
			Error::ImproperlyConfigured(format!("cannot read {}: {}", path.display(), err))
		})?;
		Self::from_toml_str(&source)
	}

	/// Apply `REINHARDT_EXTRAS_*` environment variables on top of these settings.
	pub fn with_env_overrides(self) -> Result<Self> {
		self.with_overrides_from(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
	}

	/// Apply overrides from an arbitrary key lookup (keys are upper-case, unprefixed).
	pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(value) = lookup("RELATED_OBJECT_PAGE_SIZE") {
			self.related_object_page_size = value.trim().parse().map_err(|_| {
				Error::ImproperlyConfigured(format!(
					"RELATED_OBJECT_PAGE_SIZE must be a positive integer, got `{}`",
					value
				))
			})?;
		}
		if let Some(value) = lookup("ALL_FIELDS_TOKEN") {
			self.all_fields_token = value;
		}
		if let Some(value) = lookup("ANNOTATION_WILDCARD") {
			self.annotation_wildcard = value;
		}
		if let Some(value) = lookup("FIELDS_QUERY_PARAM") {
			self.fields_query_param = value;
		}
		self.validate()?;
		Ok(self)
	}

	/// Builder-style page size override.
	pub fn related_object_page_size(mut self, page_size: usize) -> Self {
		self.related_object_page_size = page_size;
		self
	}

	/// Register an additional named field-group token.
	pub fn field_type(mut self, token: impl Into<String>, group: impl Into<String>) -> Self {
		self.field_types.insert(token.into(), group.into());
		self
	}

	fn validate(&self) -> Result<()> {
		if self.related_object_page_size == 0 {
			return Err(Error::ImproperlyConfigured(
				"related_object_page_size must be greater than zero".to_string(),
			));
		}
		if self.all_fields_token.is_empty() || self.annotation_wildcard.is_empty() {
			return Err(Error::ImproperlyConfigured(
				"field selection tokens must not be empty".to_string(),
			));
		}
		Ok(())
	}
}
