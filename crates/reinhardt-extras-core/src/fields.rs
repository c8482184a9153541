//! Serializer field primitives
//!
//! Fields turn one attribute of an [`Instance`] into its JSON
//! representation. The leaf fields here cover the ORM's output types; the
//! annotation and related-object crates add composite fields on the same
//! trait.

use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::SerializerContext;
use crate::exception::{Error, Result};
use crate::orm::{Instance, OutputType};

/// Field name to field, in declaration order.
pub type Fields = IndexMap<String, Arc<dyn Field>>;

/// A serializer field.
pub trait Field: Send + Sync + fmt::Debug {
	/// Read the raw value for `field_name` from the instance.
	fn get_attribute(
		&self,
		instance: &dyn Instance,
		field_name: &str,
		_context: &SerializerContext,
	) -> Result<Value> {
		Ok(instance.attribute(field_name).unwrap_or(Value::Null))
	}

	/// Convert a non-null raw value into its representation.
	fn to_representation(&self, value: &Value) -> Result<Value>;

	/// Render the field for one instance. Null raw values render as null
	/// without reaching [`Field::to_representation`].
	fn represent(
		&self,
		instance: &dyn Instance,
		field_name: &str,
		context: &SerializerContext,
	) -> Result<Value> {
		let value = self.get_attribute(instance, field_name, context)?;
		if value.is_null() {
			return Ok(Value::Null);
		}
		self.to_representation(&value)
	}

	fn is_read_only(&self) -> bool {
		false
	}

	fn as_any(&self) -> &dyn Any;
}

fn invalid(kind: &str, value: &Value) -> Error {
	Error::Serialization {
		field: kind.to_string(),
		message: format!("cannot represent {}", value),
	}
}

/// Emits the raw value unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyField;

impl Field for ReadOnlyField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		Ok(value.clone())
	}

	fn is_read_only(&self) -> bool {
		true
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct IntegerField {
	read_only: bool,
}

impl IntegerField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for IntegerField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match value {
			Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
			Value::Number(n) => n
				.as_f64()
				.map(|f| Value::from(f.trunc() as i64))
				.ok_or_else(|| invalid("IntegerField", value)),
			Value::Bool(b) => Ok(Value::from(i64::from(*b))),
			Value::String(s) => s
				.trim()
				.parse::<i64>()
				.map(Value::from)
				.map_err(|_| invalid("IntegerField", value)),
			_ => Err(invalid("IntegerField", value)),
		}
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct FloatField {
	read_only: bool,
}

impl FloatField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for FloatField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		let float = match value {
			Value::Number(n) => n.as_f64(),
			Value::String(s) => s.trim().parse::<f64>().ok(),
			_ => None,
		};
		float
			.and_then(Number::from_f64)
			.map(Value::Number)
			.ok_or_else(|| invalid("FloatField", value))
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Decimals are emitted as strings so no precision is lost.
#[derive(Debug, Clone, Default)]
pub struct DecimalField {
	read_only: bool,
}

impl DecimalField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for DecimalField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match value {
			Value::Number(n) => Ok(Value::String(n.to_string())),
			Value::String(_) => Ok(value.clone()),
			_ => Err(invalid("DecimalField", value)),
		}
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct CharField {
	read_only: bool,
}

impl CharField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for CharField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match value {
			Value::String(_) => Ok(value.clone()),
			Value::Number(n) => Ok(Value::String(n.to_string())),
			Value::Bool(b) => Ok(Value::String(b.to_string())),
			_ => Err(invalid("CharField", value)),
		}
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct BooleanField {
	read_only: bool,
}

impl BooleanField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for BooleanField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match value {
			Value::Bool(_) => Ok(value.clone()),
			Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
			Value::String(s) => match s.to_ascii_lowercase().as_str() {
				"true" | "t" | "1" | "yes" => Ok(Value::Bool(true)),
				"false" | "f" | "0" | "no" => Ok(Value::Bool(false)),
				_ => Err(invalid("BooleanField", value)),
			},
			_ => Err(invalid("BooleanField", value)),
		}
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Dates and datetimes arrive from the ORM already formatted as ISO 8601.
#[derive(Debug, Clone, Default)]
pub struct DateTimeField {
	read_only: bool,
}

impl DateTimeField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for DateTimeField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match value {
			Value::String(_) => Ok(value.clone()),
			_ => Err(invalid("DateTimeField", value)),
		}
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct JsonField {
	read_only: bool,
}

impl JsonField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_only() -> Self {
		Self { read_only: true }
	}
}

impl Field for JsonField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		Ok(value.clone())
	}

	fn is_read_only(&self) -> bool {
		self.read_only
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Represents a relation by primary key(s).
///
/// For a to-one relation the instance attribute holds the related id; for a
/// to-many relation it holds the list of related ids.
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyRelatedField {
	many: bool,
}

impl PrimaryKeyRelatedField {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn many() -> Self {
		Self { many: true }
	}

	pub fn is_many(&self) -> bool {
		self.many
	}
}

impl Field for PrimaryKeyRelatedField {
	fn to_representation(&self, value: &Value) -> Result<Value> {
		match (self.many, value) {
			(true, Value::Array(_)) => Ok(value.clone()),
			(true, other) => Ok(Value::Array(vec![other.clone()])),
			(false, _) => Ok(value.clone()),
		}
	}

	fn represent(
		&self,
		instance: &dyn Instance,
		field_name: &str,
		context: &SerializerContext,
	) -> Result<Value> {
		let value = self.get_attribute(instance, field_name, context)?;
		match value {
			Value::Null if self.many => Ok(Value::Array(Vec::new())),
			Value::Null => Ok(Value::Null),
			value => self.to_representation(&value),
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Builds a leaf field for one output type.
pub type FieldFactory = fn() -> Arc<dyn Field>;

/// Output type to serializer field mapping.
///
/// Expressions without a declared output type, or with a type missing from
/// the registry, map to [`ReadOnlyField`].
#[derive(Debug, Clone)]
pub struct FieldTypeRegistry {
	mapping: IndexMap<OutputType, FieldFactory>,
}

fn integer_field() -> Arc<dyn Field> {
	Arc::new(IntegerField::read_only())
}

fn float_field() -> Arc<dyn Field> {
	Arc::new(FloatField::read_only())
}

fn decimal_field() -> Arc<dyn Field> {
	Arc::new(DecimalField::read_only())
}

fn char_field() -> Arc<dyn Field> {
	Arc::new(CharField::read_only())
}

fn boolean_field() -> Arc<dyn Field> {
	Arc::new(BooleanField::read_only())
}

fn datetime_field() -> Arc<dyn Field> {
	Arc::new(DateTimeField::read_only())
}

fn json_field() -> Arc<dyn Field> {
	Arc::new(JsonField::read_only())
}

impl Default for FieldTypeRegistry {
	fn default() -> Self {
		let mut mapping: IndexMap<OutputType, FieldFactory> = IndexMap::new();
		for integer in [
			OutputType::AutoField,
			OutputType::Integer,
			OutputType::SmallInteger,
			OutputType::BigInteger,
			OutputType::PositiveInteger,
		] {
			mapping.insert(integer, integer_field);
		}
		mapping.insert(OutputType::Float, float_field);
		mapping.insert(OutputType::Decimal, decimal_field);
		mapping.insert(OutputType::Char, char_field);
		mapping.insert(OutputType::Text, char_field);
		mapping.insert(OutputType::Boolean, boolean_field);
		mapping.insert(OutputType::Date, datetime_field);
		mapping.insert(OutputType::DateTime, datetime_field);
		mapping.insert(OutputType::Json, json_field);
		Self { mapping }
	}
}

impl FieldTypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Override the field used for one output type.
	pub fn register(mut self, output_type: OutputType, factory: FieldFactory) -> Self {
		self.mapping.insert(output_type, factory);
		self
	}

	pub fn field_for(&self, output_type: Option<OutputType>) -> Arc<dyn Field> {
		output_type
			.and_then(|t| self.mapping.get(&t))
			.map(|factory| factory())
			.unwrap_or_else(|| Arc::new(ReadOnlyField))
	}
}
