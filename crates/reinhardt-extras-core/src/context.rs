//! Serializer context

use indexmap::IndexMap;
use std::sync::Arc;

use crate::request::Request;
use crate::settings::ExtrasSettings;

/// State shared by a serializer and every field it renders.
#[derive(Debug, Clone)]
pub struct SerializerContext {
	/// The request being served, when there is one.
	pub request: Option<Arc<Request>>,
	/// Relation name to its requested field tokens (`fields[<relation>]`).
	pub related_objects: IndexMap<String, Vec<String>>,
	/// View action (`list`, `retrieve`, ...).
	pub action: Option<String>,
	pub settings: Arc<ExtrasSettings>,
}

impl Default for SerializerContext {
	fn default() -> Self {
		Self {
			request: None,
			related_objects: IndexMap::new(),
			action: None,
			settings: ExtrasSettings::global(),
		}
	}
}

impl SerializerContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_request(mut self, request: Arc<Request>) -> Self {
		self.request = Some(request);
		self
	}

	pub fn with_action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn with_settings(mut self, settings: Arc<ExtrasSettings>) -> Self {
		self.settings = settings;
		self
	}

	/// Request an embedded relation with the given field tokens.
	pub fn related_object<I, S>(mut self, relation: impl Into<String>, tokens: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.related_objects
			.insert(relation.into(), tokens.into_iter().map(Into::into).collect());
		self
	}

	/// Context handed to a nested serializer: same request and settings, no
	/// nested relation selections.
	pub fn for_child(&self) -> Self {
		Self {
			request: self.request.clone(),
			related_objects: IndexMap::new(),
			action: self.action.clone(),
			settings: self.settings.clone(),
		}
	}
}
