use super::{nested_records, require_text, ProtocolRecord};
use crate::converter::FieldEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! protocol_id {
    ($(#[$meta:meta])* $name:ident, $schema:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default)]
            pub value: String,
        }

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self {
                    value: value.into(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.value)
            }
        }

        impl ProtocolRecord for $name {
            const SCHEMA: &'static str = $schema;

            fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
                require_text(missing, path, "value", &self.value);
            }

            fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
                fields.field("value", &self.value)
            }
        }

        nested_records!($name);
    };
}

protocol_id!(
    /// Assigned by the master when a framework registers.
    FrameworkId,
    "FrameworkID"
);
protocol_id!(OfferId, "OfferID");
protocol_id!(SlaveId, "SlaveID");
protocol_id!(TaskId, "TaskID");
protocol_id!(ExecutorId, "ExecutorID");
