//! Field schemas for event shapes.
//!
//! A [`Schema`] is the table the decoder walks: one [`Field`] per wire key,
//! naming the semantic field it lands in, its [`FieldType`] and whether it is
//! required.
//!
//! ```rust,ignore
//! let channel_updated = Schema::builder()
//!     .required("guild_id", FieldType::Id)
//!     .required("channel_id", FieldType::Id)
//!     .required("operator_id", FieldType::Id)
//!     .optional("old_info", FieldType::record(channel_info()))
//!     .optional("new_info", FieldType::record(channel_info()))
//!     .build();
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::foundation::value::{FieldValue, Id, Record};

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A JSON string.
    String,
    /// An identifier sent as a string or an integer; see [`Id`].
    Id,
    /// A JSON integer fitting `i64`.
    Int,
    /// Any JSON number.
    Float,
    Bool,
    /// Any JSON value, kept opaque.
    Json,
    /// A JSON array with elements of the inner type.
    List(Box<FieldType>),
    /// A nested JSON object decoded with its own schema.
    Record(Schema),
}

impl FieldType {
    /// Creates a list type.
    pub fn list(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    /// Creates a nested record type.
    pub fn record(schema: Schema) -> Self {
        Self::Record(schema)
    }

    /// Returns the name used in type mismatch errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Id => "id",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Json => "json",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// The value an absent optional field decodes to.
    pub fn zero_value(&self) -> FieldValue {
        match self {
            Self::String => FieldValue::Str(String::new()),
            Self::Id => FieldValue::Id(Id::default()),
            Self::Int => FieldValue::Int(0),
            Self::Float => FieldValue::Float(0.0),
            Self::Bool => FieldValue::Bool(false),
            Self::Json => FieldValue::Json(Value::Null),
            Self::List(_) => FieldValue::List(Vec::new()),
            Self::Record(schema) => FieldValue::Record(schema.zero_record()),
        }
    }
}

/// One entry of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    wire_name: Arc<str>,
    name: Arc<str>,
    ty: FieldType,
    required: bool,
}

impl Field {
    /// Creates a field whose semantic name differs from its wire name.
    pub fn new(
        wire_name: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        ty: FieldType,
        required: bool,
    ) -> Self {
        Self {
            wire_name: wire_name.into(),
            name: name.into(),
            ty,
            required,
        }
    }

    /// Key of the field in the JSON payload.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Name of the field in the decoded record.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// An ordered, cheaply clonable list of fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Arc<[Field]>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Returns the fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks a field up by semantic name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a record holding the zero value of every field.
    pub fn zero_record(&self) -> Record {
        let mut record = Record::with_capacity(self.fields.len());
        for field in self.fields.iter() {
            record.insert(field.name_arc(), field.ty.zero_value());
        }
        record
    }
}

/// Builder for [`Schema`].
///
/// Adding a field whose semantic name is already present replaces the earlier
/// definition in place, so a shape can extend a shared header and override
/// one of its fields.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Adds a field.
    pub fn field(mut self, field: Field) -> Self {
        if let Some(slot) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *slot = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Adds a required field whose semantic name equals its wire name.
    pub fn required(self, wire_name: &str, ty: FieldType) -> Self {
        self.field(Field::new(wire_name, wire_name, ty, true))
    }

    /// Adds an optional field whose semantic name equals its wire name.
    pub fn optional(self, wire_name: &str, ty: FieldType) -> Self {
        self.field(Field::new(wire_name, wire_name, ty, false))
    }

    /// Adds a required field with a distinct semantic name.
    pub fn required_as(self, wire_name: &str, name: &str, ty: FieldType) -> Self {
        self.field(Field::new(wire_name, name, ty, true))
    }

    /// Adds an optional field with a distinct semantic name.
    pub fn optional_as(self, wire_name: &str, name: &str, ty: FieldType) -> Self {
        self.field(Field::new(wire_name, name, ty, false))
    }

    /// Appends every field of `other`.
    pub fn extend(self, other: &Schema) -> Self {
        other
            .fields()
            .iter()
            .cloned()
            .fold(self, |builder, field| builder.field(field))
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Schema {
        Schema::builder()
            .required("time", FieldType::Int)
            .required("self_id", FieldType::Id)
            .build()
    }

    #[test]
    fn test_builder_preserves_order_and_overrides() {
        let schema = Schema::builder()
            .extend(&header())
            .optional("time", FieldType::Float)
            .required_as("user_id", "user", FieldType::Id)
            .build();

        let names: Vec<_> = schema.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["time", "self_id", "user"]);
        assert_eq!(schema.field("time").unwrap().ty(), &FieldType::Float);
        assert!(!schema.field("time").unwrap().is_required());
        assert_eq!(schema.field("user").unwrap().wire_name(), "user_id");
    }

    #[test]
    fn test_zero_values() {
        let inner = Schema::builder()
            .optional("name", FieldType::String)
            .optional("tags", FieldType::list(FieldType::String))
            .build();
        let schema = Schema::builder()
            .extend(&header())
            .optional("info", FieldType::record(inner))
            .optional("extra", FieldType::Json)
            .build();

        let zero = schema.zero_record();
        assert_eq!(zero.int("time"), Some(0));
        assert_eq!(zero.id("self_id"), Some(&Id::default()));
        assert_eq!(zero.json("extra"), Some(&Value::Null));

        let info = zero.record("info").unwrap();
        assert_eq!(info.str("name"), Some(""));
        assert_eq!(info.list("tags"), Some(&[][..]));
    }
}
