//! Model view set

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use reinhardt_extras_core::orm::{Instance, QuerySet};
use reinhardt_extras_core::permissions::check_object;
use reinhardt_extras_core::tokens::split_field_tokens;
use reinhardt_extras_core::{
	Error, ExtrasSettings, PermissionContext, Request, Result, SerializerContext, lookups,
};
use reinhardt_extras_serializers::{BoundSerializer, ModelSerializer, SerializerOptions};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::actions::Action;
use crate::permission_by_action::PermissionByAction;
use crate::response::Response;

/// `<param>[<name>]`
static BRACKETED_PARAM: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^([^\[\]]+)\[([^\[\]]+)\]$").unwrap());

const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Builds the base queryset of a view.
pub type QuerySetFactory = Arc<dyn Fn() -> Box<dyn QuerySet> + Send + Sync>;

/// Read view over one model.
///
/// Request features are opt-in:
///
/// - [`with_dynamic_fields`](Self::with_dynamic_fields): `?fields=` narrows the serializer
/// - [`with_annotations`](Self::with_annotations): the queryset is annotated with the
///   annotations the serializer will render
/// - [`with_related_objects`](Self::with_related_objects): `?fields[<relation>]=` embeds
///   relations
///
/// # Examples
///
/// ```rust,ignore
/// let view = ModelViewSet::new("foo", FooSerializer.clone(), move || db.objects("Foo"))
///     .with_dynamic_fields()
///     .with_annotations()
///     .with_related_objects();
///
/// let response = view.dispatch(request, Action::Retrieve, Some(json!(1)));
/// ```
pub struct ModelViewSet {
	basename: String,
	serializer: Arc<ModelSerializer>,
	queryset: QuerySetFactory,
	dynamic_fields: bool,
	annotations: bool,
	related_objects: bool,
	permissions: PermissionByAction,
	settings: Option<Arc<ExtrasSettings>>,
}

impl fmt::Debug for ModelViewSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelViewSet")
			.field("basename", &self.basename)
			.field("serializer", &self.serializer.name())
			.field("dynamic_fields", &self.dynamic_fields)
			.field("annotations", &self.annotations)
			.field("related_objects", &self.related_objects)
			.field("permissions", &self.permissions)
			.finish()
	}
}

impl ModelViewSet {
	pub fn new<F>(basename: impl Into<String>, serializer: Arc<ModelSerializer>, queryset: F) -> Self
	where
		F: Fn() -> Box<dyn QuerySet> + Send + Sync + 'static,
	{
		Self {
			basename: basename.into(),
			serializer,
			queryset: Arc::new(queryset),
			dynamic_fields: false,
			annotations: false,
			related_objects: false,
			permissions: PermissionByAction::default(),
			settings: None,
		}
	}

	pub fn with_dynamic_fields(mut self) -> Self {
		self.dynamic_fields = true;
		self
	}

	pub fn with_annotations(mut self) -> Self {
		self.annotations = true;
		self
	}

	pub fn with_related_objects(mut self) -> Self {
		self.related_objects = true;
		self
	}

	pub fn with_permissions(mut self, permissions: PermissionByAction) -> Self {
		self.permissions = permissions;
		self
	}

	pub fn with_settings(mut self, settings: Arc<ExtrasSettings>) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn basename(&self) -> &str {
		&self.basename
	}

	pub fn settings(&self) -> Arc<ExtrasSettings> {
		self.settings.clone().unwrap_or_else(ExtrasSettings::global)
	}

	/// Tokens of the `fields` query parameter. An absent or empty parameter
	/// means no selection.
	pub fn requested_fields(&self, request: &Request) -> Option<Vec<String>> {
		if !self.dynamic_fields {
			return None;
		}
		let value = request.query_param(&self.settings().fields_query_param)?;
		if value.is_empty() {
			return None;
		}
		Some(split_field_tokens(&value))
	}

	/// Every `fields[<relation>]` query parameter, as relation to tokens.
	pub fn related_object_selections(&self, request: &Request) -> IndexMap<String, Vec<String>> {
		if !self.related_objects {
			return IndexMap::new();
		}
		let param = self.settings().fields_query_param.clone();
		request
			.query_params()
			.into_iter()
			.filter_map(|(key, value)| {
				let captures = BRACKETED_PARAM.captures(&key)?;
				if captures[1] != *param {
					return None;
				}
				Some((captures[2].to_string(), split_field_tokens(&value)))
			})
			.collect()
	}

	pub fn serializer_context(&self, request: &Arc<Request>, action: &Action) -> SerializerContext {
		let mut context = SerializerContext::new()
			.with_settings(self.settings())
			.with_request(request.clone())
			.with_action(action.name());
		context.related_objects = self.related_object_selections(request);
		context
	}

	pub fn get_serializer(&self, request: &Arc<Request>, action: &Action) -> Result<BoundSerializer> {
		self.serializer.bind(SerializerOptions {
			fields: self.requested_fields(request),
			context: self.serializer_context(request, action),
		})
	}

	/// Base queryset, annotated with what `serializer` renders when
	/// annotations are enabled.
	pub fn get_queryset(&self, serializer: &BoundSerializer) -> Box<dyn QuerySet> {
		let queryset = (self.queryset)();
		if !self.annotations {
			return queryset;
		}
		let annotations = serializer.annotation_map();
		if annotations.is_empty() {
			return queryset;
		}
		tracing::trace!(
			view = %self.basename,
			annotations = ?annotations.keys().collect::<Vec<_>>(),
			"annotating queryset"
		);
		queryset.annotate(&annotations)
	}

	pub fn check_permissions(&self, request: &Request, action: &Action) -> Result<()> {
		let context = PermissionContext::from_request(request);
		for permission in self.permissions.get_permissions(action.name()) {
			if !permission.has_permission(&context) {
				tracing::debug!(
					view = %self.basename,
					permission = permission.name(),
					"permission denied"
				);
				return Err(Error::PermissionDenied(PERMISSION_DENIED.to_string()));
			}
		}
		Ok(())
	}

	pub fn check_object_permissions(
		&self,
		request: &Request,
		action: &Action,
		obj: &dyn Instance,
	) -> Result<()> {
		let context = PermissionContext::from_request(request);
		for permission in self.permissions.get_permissions(action.name()) {
			if !check_object(permission.as_ref(), &context, obj) {
				tracing::debug!(
					view = %self.basename,
					permission = permission.name(),
					"object permission denied"
				);
				return Err(Error::PermissionDenied(PERMISSION_DENIED.to_string()));
			}
		}
		Ok(())
	}

	pub fn list(&self, request: Arc<Request>) -> Result<Value> {
		let action = Action::List;
		self.check_permissions(&request, &action)?;
		let serializer = self.get_serializer(&request, &action)?;
		let instances = self.get_queryset(&serializer).fetch()?;
		serializer.to_representation_many(&instances)
	}

	pub fn retrieve(&self, request: Arc<Request>, pk: Value) -> Result<Value> {
		let action = Action::Retrieve;
		self.check_permissions(&request, &action)?;
		let serializer = self.get_serializer(&request, &action)?;
		let instance = self
			.get_queryset(&serializer)
			.filter(&lookups! { "pk" => pk })
			.first()?
			.ok_or_else(|| Error::NotFound("Not found.".to_string()))?;
		self.check_object_permissions(&request, &action, instance.as_ref())?;
		serializer.to_representation(instance.as_ref())
	}

	/// Run `action` and render the outcome, errors included.
	pub fn dispatch(&self, request: Request, action: Action, pk: Option<Value>) -> Response {
		tracing::debug!(
			view = %self.basename,
			action = action.name(),
			url = %request.url(),
			"dispatch"
		);
		let request = Arc::new(request);
		let result = match (&action, pk) {
			(Action::List, _) => self.list(request),
			(Action::Retrieve, Some(pk)) => self.retrieve(request, pk),
			(Action::Retrieve, None) => Err(Error::NotFound("Not found.".to_string())),
			_ => {
				return Response::detail(
					http::StatusCode::METHOD_NOT_ALLOWED,
					format!("Method \"{}\" not allowed.", request.method()),
				);
			}
		};
		match result {
			Ok(data) => Response::ok(data),
			Err(error) => Response::from_error(&error),
		}
	}
}
