//! Decoded content documents.
//!
//! Content files are decoded into a [`Node`] tree. The loader only needs
//! key lookup, sequence iteration and scalar coercion, so any `serde`
//! format can feed it; the workspace reads RON.
//!
//! Mapping order is preserved as written in the file.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::FileFault;

/// One node of a decoded document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// Unit, `None` or an absent value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Ordered sequence.
    Seq(Vec<Node>),
    /// Ordered mapping with string keys.
    Map(Vec<(String, Node)>),
}

impl Node {
    /// Child of a mapping by key. `None` for missing keys and non-mappings.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// True if this is a mapping containing `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Mapping entries in file order.
    #[must_use]
    pub fn entries(&self) -> Option<&[(String, Node)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Sequence items.
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Integer coercion. Floats with no fractional part are accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// String coercion.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean coercion.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for [`Node::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the node's shape, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }

    /// Render a scalar as a mapping key.
    fn into_key(self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(v) => Some(v.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, sequence or mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(i64::try_from(v).map_or(Node::Float(v as f64), Node::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<Node, E> {
        Ok(Node::Str(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Str(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::Seq(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let capacity = map.size_hint().unwrap_or(0);
        let mut entries: Vec<(String, Node)> = Vec::with_capacity(capacity);
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(capacity);
        while let Some((key, value)) = map.next_entry::<Node, Node>()? {
            let kind = key.kind();
            let key = key
                .into_key()
                .ok_or_else(|| {
                    de::Error::custom(format!("mapping key must be a scalar, got {kind}"))
                })?;
            // Later duplicates win, matching how a second file patches a first.
            match positions.get(&key) {
                Some(&position) => entries[position].1 = value,
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, value));
                }
            }
        }
        Ok(Node::Map(entries))
    }
}

/// Decode RON text into a node tree.
///
/// # Errors
///
/// Returns the RON parse error with its span.
pub fn parse_ron(text: &str) -> Result<Node, ron::error::SpannedError> {
    ron::from_str(text)
}

/// Read and decode a RON content file.
///
/// # Errors
///
/// Returns [`FileFault::Io`] or [`FileFault::Parse`] naming the path.
pub fn read_document(path: &Path) -> Result<Node, FileFault> {
    let text = std::fs::read_to_string(path).map_err(|source| FileFault::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ron(&text).map_err(|source| FileFault::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_preserves_order() {
        let node = parse_ron(r#"{ "zeta": 1, "alpha": 2, "mid": 3 }"#).unwrap();
        let keys: Vec<_> = node.entries().unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_scalars() {
        let node = parse_ron(
            r#"{ "i": -1, "f": 2.0, "s": "STR_X", "b": true, "o": Some(4), "n": None }"#,
        )
        .unwrap();
        assert_eq!(node.get("i").unwrap().as_i64(), Some(-1));
        assert_eq!(node.get("f").unwrap().as_i64(), Some(2));
        assert_eq!(node.get("s").unwrap().as_str(), Some("STR_X"));
        assert_eq!(node.get("b").unwrap().as_bool(), Some(true));
        assert_eq!(node.get("o").unwrap().as_i64(), Some(4));
        assert!(node.get("n").unwrap().is_null());
        assert!(node.get("missing").is_none());
    }

    #[test]
    fn test_nested_sequence() {
        let node = parse_ron(r#"{ "items": [ { "type": "A" }, { "delete": "B" } ] }"#).unwrap();
        let items = node.get("items").unwrap().as_seq().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[1].has("delete"));
        assert_eq!(items[0].kind(), "mapping");
    }

    #[test]
    fn test_integer_keys_become_strings() {
        let node = parse_ron(r#"{ 12: "a.png" }"#).unwrap();
        assert_eq!(node.get("12").unwrap().as_str(), Some("a.png"));
    }

    #[test]
    fn test_duplicate_keys_keep_position_and_take_last_value() {
        let node = parse_ron(r#"{ "a": 1, "b": 2, "a": 3, 7: "x", 7: "y" }"#).unwrap();
        let entries = node.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("a".to_string(), Node::Int(3)));
        assert_eq!(entries[2], ("7".to_string(), Node::Str("y".to_string())));

        let text = format!(
            "{{ {} }}",
            (0..5000)
                .chain(0..5000)
                .map(|i| format!("{i}: \"f{i}.png\""))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let big = parse_ron(&text).unwrap();
        assert_eq!(big.entries().unwrap().len(), 5000);
        assert_eq!(big.get("4999").unwrap().as_str(), Some("f4999.png"));
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_ron("{ \"a\": ").is_err());
    }
}
