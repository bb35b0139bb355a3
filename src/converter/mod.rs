//! Conversion between protocol records and handler-side values.
//!
//! Every payload crossing the bridge goes through [`ProtocolValueConverter`].
//! A conversion either yields a complete [`HandlerValue`] or fails with a
//! [`ConversionError`] naming the schema; nothing partial is ever returned.

mod registry;
mod value;

pub use registry::SchemaRegistry;
pub use value::{FieldEncoder, HandlerField, HandlerValue};

use crate::error::{ConversionError, ConversionResult};
use crate::protocol::ProtocolRecord;

#[derive(Debug, Clone, Default)]
pub struct ProtocolValueConverter {
    registry: SchemaRegistry,
}

impl ProtocolValueConverter {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn to_handler_value<R: ProtocolRecord>(
        &self,
        record: &R,
        schema: &str,
    ) -> ConversionResult<HandlerValue> {
        self.check_schema::<R>(schema)?;

        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(ConversionError::Uninitialized {
                schema: schema.to_string(),
                missing,
            });
        }

        let value = record.to_record_value();
        if let Some(path) = value.non_finite_path() {
            return Err(ConversionError::NonFinite {
                schema: schema.to_string(),
                path,
            });
        }
        Ok(value)
    }

    /// Converts an ordered sequence. The result has exactly `records.len()`
    /// items, or the first failing element's error.
    pub fn to_handler_sequence<R: ProtocolRecord>(
        &self,
        records: &[R],
        schema: &str,
    ) -> ConversionResult<HandlerValue> {
        self.check_schema::<R>(schema)?;

        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.to_handler_value(record, schema)
                    .map_err(|source| ConversionError::SequenceElement {
                        schema: schema.to_string(),
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<ConversionResult<Vec<_>>>()
            .map(HandlerValue::List)
    }

    /// Wraps an opaque binary payload. The bytes are copied verbatim.
    pub fn bytes(&self, data: &[u8]) -> HandlerValue {
        HandlerValue::Bytes(data.to_vec())
    }

    /// Decodes a record handed back by a handler, e.g. a `TaskStatus` the
    /// handler wants sent through the driver.
    pub fn from_handler_value<R: ProtocolRecord>(
        &self,
        value: &HandlerValue,
        schema: &str,
    ) -> ConversionResult<R> {
        self.check_schema::<R>(schema)?;

        if let Some(actual) = value.schema() {
            if actual != schema {
                return Err(ConversionError::SchemaMismatch {
                    requested: schema.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let record: R =
            serde_json::from_value(value.to_json()).map_err(|e| ConversionError::Decode {
                schema: schema.to_string(),
                message: e.to_string(),
            })?;

        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(ConversionError::Uninitialized {
                schema: schema.to_string(),
                missing,
            });
        }

        Ok(record)
    }

    fn check_schema<R: ProtocolRecord>(&self, schema: &str) -> ConversionResult<()> {
        if !self.registry.contains(schema) {
            return Err(ConversionError::UnknownSchema(schema.to_string()));
        }
        if R::SCHEMA != schema {
            return Err(ConversionError::SchemaMismatch {
                requested: schema.to_string(),
                actual: R::SCHEMA.to_string(),
            });
        }
        Ok(())
    }
}
