//! Logical export document.
//!
//! Decoded structures render into an ordered tree of mappings, sequences and
//! scalars. The tree implements `serde::Serialize` so any serde renderer can
//! produce the final text; key order and scalar types are kept as decoded.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Vec<(String, Node)>),
}

impl Node {
    pub fn mapping() -> Self {
        Node::Mapping(Vec::new())
    }

    /// Appends a key to a mapping node. Ignored on non-mapping nodes.
    pub fn add(mut self, key: &str, value: impl Into<Node>) -> Self {
        if let Node::Mapping(entries) = &mut self {
            entries.push((key.to_string(), value.into()));
        }
        self
    }

    pub fn add_serialized_version(self, version: i32) -> Self {
        self.add("serializedVersion", version)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Node::Mapping(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Node::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Anything that renders into the export document.
pub trait ToDocument {
    fn to_document(&self) -> Node;
}

impl<T: ToDocument> ToDocument for [T] {
    fn to_document(&self) -> Node {
        Node::Sequence(self.iter().map(ToDocument::to_document).collect())
    }
}

impl<T: ToDocument> ToDocument for Vec<T> {
    fn to_document(&self) -> Node {
        self.as_slice().to_document()
    }
}

impl<T: ToDocument> ToDocument for Option<T> {
    fn to_document(&self) -> Node {
        match self {
            Some(value) => value.to_document(),
            None => Node::mapping(),
        }
    }
}

macro_rules! node_from {
    ($variant:ident, $target:ty, $($t:ty),*) => {
        $(impl From<$t> for Node {
            fn from(value: $t) -> Self {
                Node::$variant(value as $target)
            }
        })*
    };
}

node_from!(Int, i64, i8, i16, i32, i64);
node_from!(UInt, u64, u8, u16, u32, u64, usize);

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<f32> for Node {
    fn from(value: f32) -> Self {
        Node::Float(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Sequence(value)
    }
}

impl From<&[f32]> for Node {
    fn from(value: &[f32]) -> Self {
        Node::Sequence(value.iter().map(|&v| Node::Float(v)).collect())
    }
}

impl From<&[i32]> for Node {
    fn from(value: &[i32]) -> Self {
        Node::Sequence(value.iter().map(|&v| Node::Int(v as i64)).collect())
    }
}

impl From<&[u8]> for Node {
    fn from(value: &[u8]) -> Self {
        Node::Sequence(value.iter().map(|&v| Node::UInt(v as u64)).collect())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Bool(v) => serializer.serialize_bool(*v),
            Node::Int(v) => serializer.serialize_i64(*v),
            Node::UInt(v) => serializer.serialize_u64(*v),
            Node::Float(v) => serializer.serialize_f32(*v),
            Node::String(v) => serializer.serialize_str(v),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
