//! Polymorphic relation field

use indexmap::IndexMap;
use reinhardt_extras_core::orm::{Instance, Relation};
use reinhardt_extras_core::{Error, Field, Result, SerializerContext};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use crate::serializer::{BoundSerializer, ModelSerializer, SerializerOptions};

/// Renders a relation whose target model varies, choosing the serializer by
/// the related instance's model name.
#[derive(Debug, Clone, Default)]
pub struct GenericField {
	serializers: IndexMap<String, Arc<BoundSerializer>>,
}

impl GenericField {
	pub fn new() -> Self {
		Self::default()
	}

	/// Use `serializer` for instances of its model.
	pub fn serializer(mut self, serializer: &ModelSerializer) -> Result<Self> {
		let bound = serializer.bind(SerializerOptions::new())?;
		self.serializers
			.insert(serializer.model_name().to_string(), Arc::new(bound));
		Ok(self)
	}

	pub fn models(&self) -> impl Iterator<Item = &str> {
		self.serializers.keys().map(String::as_str)
	}

	/// Render `instance` with the serializer registered for its model.
	pub fn to_instance_representation(&self, instance: &dyn Instance) -> Result<Value> {
		let serializer =
			self.serializers
				.get(instance.model_name())
				.ok_or_else(|| Error::Serialization {
					field: "generic".to_string(),
					message: format!("no serializer registered for `{}`", instance.model_name()),
				})?;
		serializer.to_representation(instance)
	}
}

impl Field for GenericField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		Ok(value.clone())
	}

	fn represent(
		&self,
		instance: &dyn Instance,
		field_name: &str,
		_context: &SerializerContext,
	) -> Result<Value> {
		let Some(relation) = instance.related(field_name) else {
			return Ok(Value::Null);
		};
		match relation {
			Relation::One(queryset) => match queryset.first()? {
				Some(related) => self.to_instance_representation(related.as_ref()),
				None => Ok(Value::Null),
			},
			relation => relation
				.fetch()?
				.iter()
				.map(|related| self.to_instance_representation(related.as_ref()))
				.collect::<Result<Vec<_>>>()
				.map(Value::Array),
		}
	}

	fn is_read_only(&self) -> bool {
		true
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}
