use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A duration value that can be specified as a number of milliseconds or
/// a string with suffix (ms, s)
/// Examples: 100, "250ms", "2s"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMs(pub u64);

impl DurationMs {
    /// Parse a string with ms/s suffix into milliseconds
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty string".to_string());
        }

        // Check for suffix; "ms" must be tested before "s"
        let (num_part, multiplier) = if let Some(prefix) = s.strip_suffix("ms") {
            (prefix, 1u64)
        } else if let Some(prefix) = s.strip_suffix('s') {
            (prefix, 1000u64)
        } else {
            (s, 1u64)
        };

        let num: u64 = num_part
            .trim()
            .parse()
            .map_err(|e| format!("Invalid number '{}': {}", num_part, e))?;

        Ok(DurationMs(num.saturating_mul(multiplier)))
    }

    /// Get the value in milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get the value as a `std::time::Duration`
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl fmt::Display for DurationMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0;
        if ms >= 1000 && ms % 1000 == 0 {
            write!(f, "{}s", ms / 1000)
        } else {
            write!(f, "{}ms", ms)
        }
    }
}

impl Serialize for DurationMs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialize as a formatted string for readability
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DurationMs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DurationMsVisitor;

        impl<'de> Visitor<'de> for DurationMsVisitor {
            type Value = DurationMs;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(
                    "a number of milliseconds or a string with ms/s suffix (e.g., 100, \"250ms\", \"2s\")",
                )
            }

            fn visit_u64<E>(self, value: u64) -> Result<DurationMs, E>
            where
                E: de::Error,
            {
                Ok(DurationMs(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<DurationMs, E>
            where
                E: de::Error,
            {
                if value < 0 {
                    Err(E::custom("duration cannot be negative"))
                } else {
                    Ok(DurationMs(value as u64))
                }
            }

            fn visit_str<E>(self, value: &str) -> Result<DurationMs, E>
            where
                E: de::Error,
            {
                DurationMs::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DurationMsVisitor)
    }
}

impl JsonSchema for DurationMs {
    fn schema_name() -> String {
        "DurationMs".to_string()
    }

    fn json_schema(_gen: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};

        // Accept both string and integer
        let mut schema = SchemaObject::default();
        schema.instance_type = Some(SingleOrVec::Vec(vec![
            InstanceType::String,
            InstanceType::Integer,
        ]));
        schema.metadata().description = Some(
            "Duration as milliseconds or string with suffix (ms, s). Examples: 100, \"250ms\", \"2s\""
                .to_string(),
        );
        Schema::Object(schema)
    }
}
