//! Serializer references

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use reinhardt_extras_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::serializer::ModelSerializer;

static SERIALIZERS: Lazy<RwLock<HashMap<String, Arc<ModelSerializer>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Make `serializer` resolvable as `path`. A later registration under the
/// same path replaces the earlier one for references not yet resolved.
pub fn register_serializer(path: impl Into<String>, serializer: Arc<ModelSerializer>) {
	let path = path.into();
	tracing::debug!(path = %path, serializer = %serializer.name(), "registered serializer");
	SERIALIZERS.write().insert(path, serializer);
}

/// Look up a serializer registered with [`register_serializer`].
pub fn resolve_serializer(path: &str) -> Result<Arc<ModelSerializer>> {
	SERIALIZERS.read().get(path).cloned().ok_or_else(|| {
		Error::ImproperlyConfigured(format!("could not resolve serializer `{}`", path))
	})
}

#[derive(Clone)]
enum Target {
	Direct,
	Path(String),
	Factory(fn() -> Arc<ModelSerializer>),
}

/// A child serializer given directly, by registered path, or by factory.
///
/// Paths and factories let serializers refer to each other. They are
/// resolved on first use and the result is kept.
#[derive(Clone)]
pub struct SerializerRef {
	target: Target,
	resolved: OnceCell<Arc<ModelSerializer>>,
}

impl SerializerRef {
	pub fn direct(serializer: Arc<ModelSerializer>) -> Self {
		Self {
			target: Target::Direct,
			resolved: OnceCell::with_value(serializer),
		}
	}

	pub fn path(path: impl Into<String>) -> Self {
		Self {
			target: Target::Path(path.into()),
			resolved: OnceCell::new(),
		}
	}

	pub fn factory(factory: fn() -> Arc<ModelSerializer>) -> Self {
		Self {
			target: Target::Factory(factory),
			resolved: OnceCell::new(),
		}
	}

	pub fn is_resolved(&self) -> bool {
		self.resolved.get().is_some()
	}

	pub fn resolve(&self) -> Result<Arc<ModelSerializer>> {
		self.resolved
			.get_or_try_init(|| match &self.target {
				Target::Direct => Err(Error::ImproperlyConfigured(
					"direct serializer reference without a serializer".to_string(),
				)),
				Target::Path(path) => resolve_serializer(path),
				Target::Factory(factory) => Ok(factory()),
			})
			.cloned()
	}
}

// Serializers may reference each other, so only names are printed.
impl fmt::Debug for SerializerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.target, self.resolved.get()) {
			(_, Some(serializer)) => write!(f, "SerializerRef({})", serializer.name()),
			(Target::Path(path), None) => write!(f, "SerializerRef({:?})", path),
			(_, None) => f.write_str("SerializerRef(<unresolved>)"),
		}
	}
}
