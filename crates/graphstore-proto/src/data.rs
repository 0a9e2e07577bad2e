//! The typed payload attached to nodes, edges, and components.

use rkyv::{Archive, Deserialize, Serialize};

use crate::value::Value;

/// A typed payload carried by a node, edge, or component version.
///
/// `class` is a caller-chosen logical tag (e.g. `"person"`, `"account"`)
/// used as a hint by codecs and by callers that want to interpret `fields`
/// without inspecting every value. `fields` is an ordered property map;
/// order is preserved so round-tripping through either codec is stable.
#[derive(Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize)]
pub struct Data {
    pub class: String,
    pub fields: Vec<(String, Value)>,
}

impl Data {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_order() {
        let data = Data::new("person")
            .with_field("name", "Ada")
            .with_field("age", 36i64);

        assert_eq!(data.class, "person");
        assert_eq!(data.fields[0].0, "name");
        assert_eq!(data.fields[1].0, "age");
        assert_eq!(data.get("name"), Some(&Value::String("Ada".into())));
        assert_eq!(data.get("missing"), None);
    }
}
