//! Annotation fields stage

use reinhardt_extras_annotations::AnnotationRegistry;
use reinhardt_extras_core::{Fields, Result};

use crate::serializer::{ModelSerializer, SerializerOptions, SerializerStage};

/// Adds one read-only field per registered annotation.
///
/// A declared field with the same name as an annotation is replaced by the
/// annotation field.
#[derive(Debug, Clone)]
pub struct AnnotationFields {
	registry: AnnotationRegistry,
}

impl AnnotationFields {
	pub fn new(registry: AnnotationRegistry) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &AnnotationRegistry {
		&self.registry
	}
}

impl SerializerStage for AnnotationFields {
	fn name(&self) -> &'static str {
		"annotation_fields"
	}

	fn annotations(&self) -> Option<&AnnotationRegistry> {
		Some(&self.registry)
	}

	fn apply(
		&self,
		serializer: &ModelSerializer,
		fields: &mut Fields,
		_options: &SerializerOptions,
	) -> Result<()> {
		let annotation_fields = self
			.registry
			.serializer_fields(&[self.registry.wildcard()], serializer.field_types());
		fields.extend(annotation_fields);
		Ok(())
	}
}
