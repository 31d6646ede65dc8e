//! Minimal stand-in for the out-of-scope scheme/converter subsystem
//! (spec §6 "Scheme/converter contract").
//!
//! A [`Converter`] validates and parses a raw path segment (or a raw form
//! value) into a typed, JSON-representable value. `TaskId` stores one
//! converter per dynamic segment (spec §4.1); `Handler` asks the same
//! converters to turn a resolved parameter into its declared type
//! (spec §4.3).

use std::fmt;
use std::sync::Arc;

/// A converter failed to accept the given raw input.
#[derive(Debug, Clone)]
pub struct ConvertError {
    pub message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConvertError {}

/// Validates and parses a raw string into a typed, JSON-representable
/// value, and can dump a value back to wire forms.
///
/// Converters are the only extension point the core router needs from
/// the (out-of-scope) scheme subsystem: given an annotation/declared
/// type, produce a `Converter` instance once at wiring time (spec §4.1,
/// §6).
pub trait Converter: Send + Sync + fmt::Debug {
    /// Parse `raw` into a typed value, raising a validation error on
    /// failure (spec §4.1 step 4, §8 "Path parameter of declared type
    /// `int` with value `"abc"`").
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError>;

    /// Serialize a previously converted value back to its canonical
    /// string form (round-trip support, spec §8).
    fn dump_to_str(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// A short, stable name used in error messages and OpenAPI-ish
    /// tooling.
    fn type_name(&self) -> &'static str;
}

/// The identity converter: any non-empty segment is accepted as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyConverter;

impl Converter for AnyConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        Ok(serde_json::Value::String(raw.to_string()))
    }

    fn type_name(&self) -> &'static str {
        "any"
    }
}

/// String converter — identical to [`AnyConverter`] but named for clarity
/// in declared-type tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        Ok(serde_json::Value::String(raw.to_string()))
    }

    fn type_name(&self) -> &'static str {
        "string"
    }
}

/// Signed 64-bit integer converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConverter;

impl Converter for IntConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        raw.parse::<i64>()
            .map(|v| serde_json::Value::Number(v.into()))
            .map_err(|_| ConvertError::new(format!("'{raw}' is not a valid int")))
    }

    fn type_name(&self) -> &'static str {
        "int"
    }
}

/// 64-bit floating point converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        raw.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ConvertError::new(format!("'{raw}' is not a valid float")))
    }

    fn type_name(&self) -> &'static str {
        "float"
    }
}

/// Boolean converter: accepts `true`/`false` (case-insensitive) and `1`/`0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(serde_json::Value::Bool(true)),
            "false" | "0" => Ok(serde_json::Value::Bool(false)),
            _ => Err(ConvertError::new(format!("'{raw}' is not a valid bool"))),
        }
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }
}

/// RFC 4122 UUID converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidConverter;

impl Converter for UuidConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        uuid::Uuid::parse_str(raw)
            .map(|u| serde_json::Value::String(u.to_string()))
            .map_err(|e| ConvertError::new(format!("'{raw}' is not a valid uuid: {e}")))
    }

    fn type_name(&self) -> &'static str {
        "uuid"
    }
}

/// RFC 3339 datetime converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| serde_json::Value::String(dt.to_rfc3339()))
            .map_err(|e| ConvertError::new(format!("'{raw}' is not a valid datetime: {e}")))
    }

    fn type_name(&self) -> &'static str {
        "datetime"
    }
}

/// Closed enum converter: the raw value must be one of `variants`.
#[derive(Debug, Clone)]
pub struct EnumConverter {
    pub variants: Vec<String>,
}

impl EnumConverter {
    pub fn new(variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { variants: variants.into_iter().map(Into::into).collect() }
    }
}

impl Converter for EnumConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        if self.variants.iter().any(|v| v == raw) {
            Ok(serde_json::Value::String(raw.to_string()))
        } else {
            Err(ConvertError::new(format!(
                "'{raw}' is not one of {:?}",
                self.variants
            )))
        }
    }

    fn type_name(&self) -> &'static str {
        "enum"
    }
}

/// `Optional<T>` combinator: an empty raw string converts to `null`;
/// otherwise delegates to the inner converter.
#[derive(Debug, Clone)]
pub struct OptionalConverter {
    pub inner: Arc<dyn Converter>,
}

impl OptionalConverter {
    pub fn new(inner: Arc<dyn Converter>) -> Self {
        Self { inner }
    }
}

impl Converter for OptionalConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        if raw.is_empty() {
            Ok(serde_json::Value::Null)
        } else {
            self.inner.convert(raw)
        }
    }

    fn type_name(&self) -> &'static str {
        "optional"
    }
}

/// `Union<T, U, ...>` combinator: tries each alternative in order, keeping
/// the first one that accepts the raw value.
#[derive(Debug, Clone)]
pub struct UnionConverter {
    pub alternatives: Vec<Arc<dyn Converter>>,
}

impl UnionConverter {
    pub fn new(alternatives: Vec<Arc<dyn Converter>>) -> Self {
        Self { alternatives }
    }
}

impl Converter for UnionConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        for alt in &self.alternatives {
            if let Ok(v) = alt.convert(raw) {
                return Ok(v);
            }
        }
        Err(ConvertError::new(format!(
            "'{raw}' matched none of {} alternatives",
            self.alternatives.len()
        )))
    }

    fn type_name(&self) -> &'static str {
        "union"
    }
}

/// `List<T>` combinator: splits the raw value on commas and converts each
/// element with the inner converter.
#[derive(Debug, Clone)]
pub struct ListConverter {
    pub inner: Arc<dyn Converter>,
}

impl ListConverter {
    pub fn new(inner: Arc<dyn Converter>) -> Self {
        Self { inner }
    }
}

impl Converter for ListConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        if raw.is_empty() {
            return Ok(serde_json::Value::Array(Vec::new()));
        }
        let items = raw
            .split(',')
            .map(|part| self.inner.convert(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::Value::Array(items))
    }

    fn type_name(&self) -> &'static str {
        "list"
    }
}

/// `Set<T>` combinator: like [`ListConverter`] but de-duplicates elements
/// by their dumped string form, preserving first-seen order.
#[derive(Debug, Clone)]
pub struct SetConverter {
    pub inner: Arc<dyn Converter>,
}

impl SetConverter {
    pub fn new(inner: Arc<dyn Converter>) -> Self {
        Self { inner }
    }
}

impl Converter for SetConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        if !raw.is_empty() {
            for part in raw.split(',') {
                let value = self.inner.convert(part.trim())?;
                let key = value.to_string();
                if seen.insert(key) {
                    out.push(value);
                }
            }
        }
        Ok(serde_json::Value::Array(out))
    }

    fn type_name(&self) -> &'static str {
        "set"
    }
}

/// `Tuple<T, U, ...>` combinator: splits on commas positionally; arity
/// must match exactly.
#[derive(Debug, Clone)]
pub struct TupleConverter {
    pub elements: Vec<Arc<dyn Converter>>,
}

impl TupleConverter {
    pub fn new(elements: Vec<Arc<dyn Converter>>) -> Self {
        Self { elements }
    }
}

impl Converter for TupleConverter {
    fn convert(&self, raw: &str) -> Result<serde_json::Value, ConvertError> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() != self.elements.len() {
            return Err(ConvertError::new(format!(
                "expected {} elements, got {}",
                self.elements.len(),
                parts.len()
            )));
        }
        let items = parts
            .iter()
            .zip(&self.elements)
            .map(|(part, conv)| conv.convert(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::Value::Array(items))
    }

    fn type_name(&self) -> &'static str {
        "tuple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_converter_rejects_non_digits() {
        assert!(IntConverter.convert("42").is_ok());
        assert!(IntConverter.convert("abc").is_err());
    }

    #[test]
    fn optional_converter_treats_empty_as_null() {
        let c = OptionalConverter::new(Arc::new(IntConverter));
        assert_eq!(c.convert("").unwrap(), serde_json::Value::Null);
        assert_eq!(c.convert("5").unwrap(), serde_json::json!(5));
    }

    #[test]
    fn list_converter_splits_on_comma() {
        let c = ListConverter::new(Arc::new(IntConverter));
        assert_eq!(c.convert("1,2,3").unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn set_converter_dedupes() {
        let c = SetConverter::new(Arc::new(IntConverter));
        assert_eq!(c.convert("1,2,1,3").unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn union_converter_tries_alternatives_in_order() {
        let c = UnionConverter::new(vec![Arc::new(IntConverter), Arc::new(StringConverter)]);
        assert_eq!(c.convert("42").unwrap(), serde_json::json!(42));
        assert_eq!(c.convert("abc").unwrap(), serde_json::json!("abc"));
    }

    #[test]
    fn enum_converter_rejects_unknown_variant() {
        let c = EnumConverter::new(["a", "b"]);
        assert!(c.convert("a").is_ok());
        assert!(c.convert("z").is_err());
    }
}
