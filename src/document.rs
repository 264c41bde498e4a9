//! Document value model.
//!
//! An already-parsed, read-only JSON-shaped value. Numbers are kept as their
//! source text so nothing is lost before a scalar loader decides how to read
//! them; objects keep insertion order.
use std::fmt;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// Key serde_json (`arbitrary_precision`) uses to hand a number's source text
/// to `visit_map`.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Insertion-ordered object body.
pub type Object = IndexMap<String, Document>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Document {
    #[default]
    Null,
    Bool(bool),
    /// Number carried as text, e.g. `"5"`, `"-1.25"`.
    Number(String),
    String(String),
    Array(Vec<Document>),
    Object(Object),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Document {
    pub fn kind(&self) -> Kind {
        match self {
            Document::Null => Kind::Null,
            Document::Bool(_) => Kind::Bool,
            Document::Number(_) => Kind::Number,
            Document::String(_) => Kind::String,
            Document::Array(_) => Kind::Array,
            Document::Object(_) => Kind::Object,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_number_text(&self) -> Option<&str> {
        match self {
            Document::Number(text) => Some(text),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&[Document]> {
        match self {
            Document::Array(xs) => Some(xs),
            _ => None,
        }
    }
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Document::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        };
        f.write_str(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Document::Null,
            Value::Bool(b) => Document::Bool(b),
            // source text under `arbitrary_precision`
            Value::Number(n) => Document::Number(n.to_string()),
            Value::String(s) => Document::String(s),
            Value::Array(xs) => Document::Array(xs.into_iter().map(Document::from).collect()),
            Value::Object(map) => Document::Object(
                map.into_iter().map(|(k, v)| (k, Document::from(v))).collect()
            ),
        }
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::String(s.to_string())
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Document::Bool(b)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, b: bool) -> Result<Document, E> {
        Ok(Document::Bool(b))
    }
    fn visit_i64<E>(self, n: i64) -> Result<Document, E> {
        Ok(Document::Number(n.to_string()))
    }
    fn visit_u64<E>(self, n: u64) -> Result<Document, E> {
        Ok(Document::Number(n.to_string()))
    }
    fn visit_f64<E>(self, n: f64) -> Result<Document, E> {
        Ok(Document::Number(n.to_string()))
    }
    fn visit_str<E>(self, s: &str) -> Result<Document, E> {
        Ok(Document::String(s.to_string()))
    }
    fn visit_string<E>(self, s: String) -> Result<Document, E> {
        Ok(Document::String(s))
    }
    fn visit_unit<E>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }
    fn visit_none<E>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }
    fn visit_some<D>(self, deserializer: D) -> Result<Document, D::Error>
    where
        D: Deserializer<'de>,
    {
        Document::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Document, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(el) = seq.next_element::<Document>()? {
            out.push(el);
        }
        Ok(Document::Array(out))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Document, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Object::with_capacity(map.size_hint().unwrap_or(0));
        let Some(first) = map.next_key::<String>()? else {
            return Ok(Document::Object(out));
        };
        if first == NUMBER_TOKEN {
            return Ok(Document::Number(map.next_value::<String>()?));
        }
        out.insert(first, map.next_value::<Document>()?);
        while let Some((k, v)) = map.next_entry::<String, Document>()? {
            // duplicate keys: last value wins, first position is kept
            out.insert(k, v);
        }
        Ok(Document::Object(out))
    }
}

// ------------------------------- Tests ------------------------------------ //
