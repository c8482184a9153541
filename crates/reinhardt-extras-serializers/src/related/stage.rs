//! Related objects stage

use indexmap::IndexMap;
use reinhardt_extras_core::{Fields, Result, SerializerContext};
use std::sync::Arc;

use super::{RelatedObject, RelatedObjectField};
use crate::serializer::{ModelSerializer, SerializerOptions, SerializerStage};

/// Replaces every selected relation's field with a [`RelatedObjectField`].
///
/// A relation is selected when the context carries tokens for it.
/// Selections naming relations this serializer does not declare are
/// ignored; unselected relations keep their ordinary field.
#[derive(Debug, Clone)]
pub struct RelatedObjects {
	relations: IndexMap<String, RelatedObject>,
}

impl RelatedObjects {
	pub fn new(relations: IndexMap<String, RelatedObject>) -> Self {
		Self { relations }
	}

	pub fn relations(&self) -> &IndexMap<String, RelatedObject> {
		&self.relations
	}

	/// The context's selections this serializer can honor.
	pub fn selected(&self, context: &SerializerContext) -> IndexMap<String, Vec<String>> {
		context
			.related_objects
			.iter()
			.filter(|(relation, _)| self.relations.contains_key(*relation))
			.map(|(relation, tokens)| (relation.clone(), tokens.clone()))
			.collect()
	}
}

impl SerializerStage for RelatedObjects {
	fn name(&self) -> &'static str {
		"related_objects"
	}

	fn apply(
		&self,
		_serializer: &ModelSerializer,
		fields: &mut Fields,
		options: &SerializerOptions,
	) -> Result<()> {
		for (relation, tokens) in self.selected(&options.context) {
			let Some(related_object) = self.relations.get(&relation) else {
				continue;
			};
			let field =
				RelatedObjectField::bind(relation.clone(), related_object, &tokens, &options.context)?;
			fields.insert(relation, Arc::new(field));
		}
		Ok(())
	}
}
