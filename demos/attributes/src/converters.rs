use opbind_sdk::prelude::*;
use serde_json::Value;

/// Converts `"1,3"`, `[1, "3"]` or a single id into a list of integer ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdListConverter;

impl IdListConverter {
    pub const TYPE: TypeTag = TypeTag::Named("IdList");
}

impl Converter for IdListConverter {
    fn supports(&self, ty: &TypeTag) -> bool {
        *ty == Self::TYPE
    }

    fn convert(&self, value: Value) -> Result<Value, ConversionError> {
        let items: Vec<Value> = match &value {
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            Value::String(s) => s.split(',').map(|id| Value::from(id.trim())).collect(),
            Value::Array(items) => items.clone(),
            Value::Number(_) => vec![value.clone()],
            _ => return Err(ConversionError::new(Self::TYPE, value, "not an id list")),
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in &items {
            let id = match item {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match id {
                Some(id) if id > 0 => ids.push(Value::from(id)),
                _ => {
                    return Err(ConversionError::new(
                        Self::TYPE,
                        value,
                        format!("{item} is not a valid id"),
                    ));
                }
            }
        }

        Ok(Value::Array(ids))
    }
}
