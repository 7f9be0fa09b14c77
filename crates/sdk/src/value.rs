use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// The declared type of an operation parameter or setter argument.
///
/// Raw request values only ever carry the JSON kinds, so anything richer
/// (identifiers, timestamps, domain value objects) is a [`TypeTag::Named`]
/// and always goes through a converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    String,
    List,
    Map,
    Named(&'static str),
}

impl TypeTag {
    /// Returns the runtime type of a raw value, or `None` for `null`.
    pub fn of(value: &Value) -> Option<TypeTag> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(TypeTag::Bool),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(TypeTag::Int),
            Value::Number(_) => Some(TypeTag::Float),
            Value::String(_) => Some(TypeTag::String),
            Value::Array(_) => Some(TypeTag::List),
            Value::Object(_) => Some(TypeTag::Map),
        }
    }

    /// Returns true when the raw value can be handed over as is.
    ///
    /// `null` matches every tag since it stands for an absent optional.
    pub fn matches(&self, value: &Value) -> bool {
        match TypeTag::of(value) {
            None => true,
            Some(actual) => actual == *self,
        }
    }

    /// Parses a type name as written in `#[param(ty = "...")]`.
    pub fn from_name(name: &'static str) -> TypeTag {
        match name {
            "int" | "integer" => TypeTag::Int,
            "float" => TypeTag::Float,
            "bool" | "boolean" => TypeTag::Bool,
            "string" => TypeTag::String,
            "list" | "array" => TypeTag::List,
            "map" => TypeTag::Map,
            other => TypeTag::Named(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::String => "string",
            TypeTag::List => "list",
            TypeTag::Map => "map",
            TypeTag::Named(name) => name,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn runtime_type_of_raw_values() {
        assert_eq!(TypeTag::of(&json!(5)), Some(TypeTag::Int));
        assert_eq!(TypeTag::of(&json!(-5)), Some(TypeTag::Int));
        assert_eq!(TypeTag::of(&json!(5.5)), Some(TypeTag::Float));
        assert_eq!(TypeTag::of(&json!("5")), Some(TypeTag::String));
        assert_eq!(TypeTag::of(&json!(true)), Some(TypeTag::Bool));
        assert_eq!(TypeTag::of(&json!([1])), Some(TypeTag::List));
        assert_eq!(TypeTag::of(&json!({"a": 1})), Some(TypeTag::Map));
        assert_eq!(TypeTag::of(&Value::Null), None);
    }

    #[test]
    fn named_tags_never_match_raw_values() {
        let tag = TypeTag::Named("Uuid");
        assert!(!tag.matches(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8")));
        assert!(tag.matches(&Value::Null));
    }

    #[test]
    fn parses_type_names() {
        assert_eq!(TypeTag::from_name("int"), TypeTag::Int);
        assert_eq!(TypeTag::from_name("array"), TypeTag::List);
        assert_eq!(TypeTag::from_name("DateTime"), TypeTag::Named("DateTime"));
        assert_eq!(TypeTag::Named("DateTime").to_string(), "DateTime");
    }
}
