//! Serializer fields backed by annotations

use indexmap::IndexMap;
use reinhardt_extras_core::orm::Instance;
use reinhardt_extras_core::{Field, Result, SerializerContext};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

use crate::registry::AnnotationRegistry;

/// Read-only field rendering one scalar annotation through a typed child.
#[derive(Debug, Clone)]
pub struct AnnotationField {
	registry: AnnotationRegistry,
	name: String,
	child: Arc<dyn Field>,
}

impl AnnotationField {
	pub fn new(registry: AnnotationRegistry, name: impl Into<String>, child: Arc<dyn Field>) -> Self {
		Self {
			registry,
			name: name.into(),
			child,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn child(&self) -> &Arc<dyn Field> {
		&self.child
	}
}

impl Field for AnnotationField {
	fn get_attribute(
		&self,
		instance: &dyn Instance,
		_field_name: &str,
		_context: &SerializerContext,
	) -> Result<Value> {
		self.registry.value(instance, &self.name)
	}

	fn to_representation(&self, value: &Value) -> Result<Value> {
		self.child.to_representation(value)
	}

	fn is_read_only(&self) -> bool {
		true
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Read-only field rendering an annotation group as an object.
///
/// Each member goes through its own typed child field; a missing member is
/// rendered as null rather than the child's zero value.
#[derive(Debug, Clone)]
pub struct AnnotationDictField {
	registry: AnnotationRegistry,
	name: String,
	children: IndexMap<String, Arc<dyn Field>>,
}

impl AnnotationDictField {
	pub fn new(
		registry: AnnotationRegistry,
		name: impl Into<String>,
		children: IndexMap<String, Arc<dyn Field>>,
	) -> Self {
		Self {
			registry,
			name: name.into(),
			children,
		}
	}

	pub fn children(&self) -> &IndexMap<String, Arc<dyn Field>> {
		&self.children
	}
}

impl Field for AnnotationDictField {
	fn get_attribute(
		&self,
		instance: &dyn Instance,
		_field_name: &str,
		_context: &SerializerContext,
	) -> Result<Value> {
		self.registry.value(instance, &self.name)
	}

	fn to_representation(&self, value: &Value) -> Result<Value> {
		let mut object = Map::new();
		for (member, child) in &self.children {
			let rendered = match value.get(member) {
				None | Some(Value::Null) => Value::Null,
				Some(raw) => child.to_representation(raw)?,
			};
			object.insert(member.clone(), rendered);
		}
		Ok(Value::Object(object))
	}

	fn is_read_only(&self) -> bool {
		true
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}
