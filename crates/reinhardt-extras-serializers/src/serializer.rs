//! Model serializers built from an explicit stage pipeline
//!
//! A [`ModelSerializer`] is a static definition: declared fields, a
//! [`MetaConfig`] and an ordered list of [`SerializerStage`]s. Binding it
//! with [`SerializerOptions`] runs every stage over a copy of the declared
//! fields and yields a [`BoundSerializer`] ready to render instances.
//!
//! The builder always composes the built-in stages in the same order:
//! annotation fields, then related objects, then dynamic-field narrowing.
//! Narrowing therefore sees every field the serializer could emit and only
//! ever removes.

use indexmap::IndexMap;
use reinhardt_extras_annotations::AnnotationRegistry;
use reinhardt_extras_core::fields::{FieldTypeRegistry, Fields};
use reinhardt_extras_core::orm::{AnnotationMap, Instance};
use reinhardt_extras_core::{Error, Field, Result, SerializerContext};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::annotated::AnnotationFields;
use crate::dynamic_fields::DynamicFields;
use crate::meta::MetaConfig;
use crate::related::{RelatedObject, RelatedObjects};

/// One step of the serializer pipeline.
pub trait SerializerStage: Send + Sync + fmt::Debug {
	fn name(&self) -> &'static str;

	/// Whether this stage implements `fields=` narrowing.
	fn narrows_fields(&self) -> bool {
		false
	}

	/// Annotation registry contributed by this stage, if any.
	fn annotations(&self) -> Option<&AnnotationRegistry> {
		None
	}

	/// Adjust the field set being bound.
	fn apply(
		&self,
		serializer: &ModelSerializer,
		fields: &mut Fields,
		options: &SerializerOptions,
	) -> Result<()>;
}

/// Arguments of [`ModelSerializer::bind`].
#[derive(Debug, Clone, Default)]
pub struct SerializerOptions {
	/// Requested field tokens. `None` means no narrowing.
	pub fields: Option<Vec<String>>,
	pub context: SerializerContext,
}

impl SerializerOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	pub fn context(mut self, context: SerializerContext) -> Self {
		self.context = context;
		self
	}
}

/// A serializer definition.
#[derive(Debug)]
pub struct ModelSerializer {
	name: String,
	model: String,
	declared: Fields,
	meta: MetaConfig,
	stages: Vec<Arc<dyn SerializerStage>>,
	field_types: FieldTypeRegistry,
}

impl ModelSerializer {
	/// Start a serializer definition named `name` for `model`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_extras_core::fields::{CharField, IntegerField};
	/// use reinhardt_extras_serializers::{MetaConfig, ModelSerializer, SerializerOptions};
	///
	/// let serializer = ModelSerializer::builder("FooSerializer", "Foo")
	///     .field("id", IntegerField::read_only())
	///     .field("bar", CharField::new())
	///     .meta(MetaConfig::new().with_field_group("min_fields", ["id"]))
	///     .dynamic_fields()
	///     .build();
	///
	/// let bound = serializer.bind(SerializerOptions::new().fields(["@min"])).unwrap();
	/// assert_eq!(bound.field_names(), vec!["id"]);
	/// ```
	pub fn builder(name: impl Into<String>, model: impl Into<String>) -> ModelSerializerBuilder {
		ModelSerializerBuilder {
			name: name.into(),
			model: model.into(),
			declared: Fields::new(),
			meta: MetaConfig::default(),
			annotations: None,
			related_objects: IndexMap::new(),
			dynamic_fields: None,
			extra_stages: Vec::new(),
			field_types: FieldTypeRegistry::default(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model_name(&self) -> &str {
		&self.model
	}

	pub fn meta(&self) -> &MetaConfig {
		&self.meta
	}

	pub fn declared_fields(&self) -> &Fields {
		&self.declared
	}

	pub fn field_types(&self) -> &FieldTypeRegistry {
		&self.field_types
	}

	pub fn stages(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.stages.iter().map(|stage| stage.name())
	}

	/// Whether the serializer accepts a `fields` selection.
	pub fn supports_dynamic_fields(&self) -> bool {
		self.stages.iter().any(|stage| stage.narrows_fields())
	}

	pub fn annotation_registry(&self) -> Option<&AnnotationRegistry> {
		self.stages.iter().find_map(|stage| stage.annotations())
	}

	/// Run the pipeline and produce a serializer ready to render.
	pub fn bind(&self, options: SerializerOptions) -> Result<BoundSerializer> {
		let dynamic = self.supports_dynamic_fields();
		if options.fields.is_some() && !dynamic {
			return Err(Error::ImproperlyConfigured(format!(
				"`{}` does not support dynamic fields",
				self.name
			)));
		}
		let mut fields = self.declared.clone();
		for stage in &self.stages {
			stage.apply(self, &mut fields, &options)?;
		}
		tracing::trace!(
			serializer = %self.name,
			fields = ?fields.keys().collect::<Vec<_>>(),
			"bound serializer"
		);
		Ok(BoundSerializer {
			name: self.name.clone(),
			model: self.model.clone(),
			fields,
			annotations: self.annotation_registry().cloned(),
			dynamic,
			context: options.context,
		})
	}
}

/// Builder for [`ModelSerializer`].
#[derive(Debug)]
pub struct ModelSerializerBuilder {
	name: String,
	model: String,
	declared: Fields,
	meta: MetaConfig,
	annotations: Option<AnnotationRegistry>,
	related_objects: IndexMap<String, RelatedObject>,
	dynamic_fields: Option<DynamicFields>,
	extra_stages: Vec<Arc<dyn SerializerStage>>,
	field_types: FieldTypeRegistry,
}

impl ModelSerializerBuilder {
	/// Declare a field. Declaring a name again replaces it in place.
	pub fn field<F: Field + 'static>(self, name: impl Into<String>, field: F) -> Self {
		self.field_arc(name, Arc::new(field))
	}

	pub fn field_arc(mut self, name: impl Into<String>, field: Arc<dyn Field>) -> Self {
		self.declared.insert(name.into(), field);
		self
	}

	pub fn meta(mut self, meta: MetaConfig) -> Self {
		self.meta = meta;
		self
	}

	/// Output-type mapping used for annotation fields.
	pub fn field_types(mut self, field_types: FieldTypeRegistry) -> Self {
		self.field_types = field_types;
		self
	}

	/// Enable `fields=` narrowing with the settings' group tokens.
	pub fn dynamic_fields(self) -> Self {
		self.dynamic_fields_with(DynamicFields::default())
	}

	pub fn dynamic_fields_with(mut self, stage: DynamicFields) -> Self {
		self.dynamic_fields = Some(stage);
		self
	}

	/// Expose the model's annotations as read-only fields.
	pub fn annotations(mut self, registry: AnnotationRegistry) -> Self {
		self.annotations = Some(registry);
		self
	}

	/// Allow `relation` to be embedded through `fields[<relation>]`.
	pub fn related_object(mut self, relation: impl Into<String>, object: RelatedObject) -> Self {
		self.related_objects.insert(relation.into(), object);
		self
	}

	/// Append a custom stage after the built-in ones.
	pub fn stage<S: SerializerStage + 'static>(mut self, stage: S) -> Self {
		self.extra_stages.push(Arc::new(stage));
		self
	}

	pub fn build(self) -> Arc<ModelSerializer> {
		let mut stages: Vec<Arc<dyn SerializerStage>> = Vec::new();
		if let Some(registry) = self.annotations {
			stages.push(Arc::new(AnnotationFields::new(registry)));
		}
		if !self.related_objects.is_empty() {
			stages.push(Arc::new(RelatedObjects::new(self.related_objects)));
		}
		if let Some(dynamic_fields) = self.dynamic_fields {
			stages.push(Arc::new(dynamic_fields));
		}
		stages.extend(self.extra_stages);
		Arc::new(ModelSerializer {
			name: self.name,
			model: self.model,
			declared: self.declared,
			meta: self.meta,
			stages,
			field_types: self.field_types,
		})
	}
}

/// A serializer with its final field set and context.
#[derive(Debug, Clone)]
pub struct BoundSerializer {
	name: String,
	model: String,
	fields: Fields,
	annotations: Option<AnnotationRegistry>,
	dynamic: bool,
	context: SerializerContext,
}

impl BoundSerializer {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model_name(&self) -> &str {
		&self.model
	}

	pub fn fields(&self) -> &Fields {
		&self.fields
	}

	pub fn field_names(&self) -> Vec<String> {
		self.fields.keys().cloned().collect()
	}

	pub fn context(&self) -> &SerializerContext {
		&self.context
	}

	/// Annotation expressions a queryset should carry before rendering with
	/// this serializer: those of the surviving fields, or every annotation
	/// when the serializer cannot narrow its fields.
	pub fn annotation_map(&self) -> AnnotationMap {
		match &self.annotations {
			Some(registry) if self.dynamic => registry.get_annotations(&self.field_names()),
			Some(registry) => registry.all_annotations(),
			None => AnnotationMap::new(),
		}
	}

	/// Render one instance as an object, fields in order.
	pub fn to_representation(&self, instance: &dyn Instance) -> Result<Value> {
		let mut object = Map::new();
		for (name, field) in &self.fields {
			object.insert(name.clone(), field.represent(instance, name, &self.context)?);
		}
		Ok(Value::Object(object))
	}

	pub fn to_representation_many(&self, instances: &[Arc<dyn Instance>]) -> Result<Value> {
		instances
			.iter()
			.map(|instance| self.to_representation(instance.as_ref()))
			.collect::<Result<Vec<_>>>()
			.map(Value::Array)
	}
}
