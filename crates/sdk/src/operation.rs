use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{error::BindError, value::TypeTag};

/// Whether an operation changes state or reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Command,
    Query,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Command => "Command",
            OperationKind::Query => "Query",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constructor parameter of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Name of the parameter as it appears in the input bag.
    pub name: &'static str,
    /// Declared type.
    pub ty: TypeTag,
    /// False when a default value is available.
    pub required: bool,
    /// Index in the constructor argument list.
    pub position: usize,
}

/// A public setter applied after construction for extra input values.
pub struct Setter<O> {
    /// Setter name, eg. `setShopIds`.
    pub method: &'static str,
    /// Declared type of the setter's sole argument.
    pub ty: TypeTag,
    /// Applies a raw value to the operation.
    pub apply: fn(&mut O, Value) -> Result<(), serde_json::Error>,
}

impl<O> Setter<O> {
    pub const fn new(
        method: &'static str,
        ty: TypeTag,
        apply: fn(&mut O, Value) -> Result<(), serde_json::Error>,
    ) -> Self {
        Setter { method, ty, apply }
    }

    /// The property this setter writes: `setShopIds` -> `shopIds`.
    pub fn property(&self) -> String {
        property_name(self.method)
    }

    /// Invokes the setter on `operation`.
    pub fn invoke(&self, operation: &mut O, value: Value) -> Result<(), BindError> {
        (self.apply)(operation, value).map_err(|err| BindError::InvalidParameter {
            parameter: self.method,
            reason: err.to_string(),
        })
    }
}

impl<O> fmt::Debug for Setter<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("method", &self.method)
            .field("ty", &self.ty)
            .finish()
    }
}

/// Strips the `set` prefix from a setter name and lower-cases the first letter.
pub fn property_name(method: &str) -> String {
    let stripped = method.strip_prefix("set").unwrap_or(method);
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Positional constructor arguments resolved by the binder.
#[derive(Debug)]
pub struct Arguments {
    operation: &'static str,
    slots: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(operation: &'static str, len: usize) -> Self {
        Arguments {
            operation,
            slots: vec![None; len],
        }
    }

    /// Places a value at a parameter's position.
    pub fn set(&mut self, parameter: &Parameter, value: Value) {
        if parameter.position >= self.slots.len() {
            self.slots.resize(parameter.position + 1, None);
        }
        self.slots[parameter.position] = Some(value);
    }

    pub fn is_set(&self, parameter: &Parameter) -> bool {
        matches!(self.slots.get(parameter.position), Some(Some(_)))
    }

    /// Takes the value of a required parameter.
    pub fn take<T: DeserializeOwned>(&mut self, parameter: &Parameter) -> Result<T, BindError> {
        match self.take_slot(parameter) {
            Some(value) => deserialize(parameter, value),
            None => Err(BindError::MissingRequiredParameter {
                operation: self.operation,
                parameter: parameter.name,
            }),
        }
    }

    /// Takes the value of a parameter, falling back to `default` when absent.
    pub fn take_or_else<T: DeserializeOwned>(
        &mut self,
        parameter: &Parameter,
        default: impl FnOnce() -> T,
    ) -> Result<T, BindError> {
        match self.take_slot(parameter) {
            Some(value) => deserialize(parameter, value),
            None => Ok(default()),
        }
    }

    fn take_slot(&mut self, parameter: &Parameter) -> Option<Value> {
        self.slots.get_mut(parameter.position).and_then(Option::take)
    }
}

fn deserialize<T: DeserializeOwned>(parameter: &Parameter, value: Value) -> Result<T, BindError> {
    serde_json::from_value(value).map_err(|err| BindError::InvalidParameter {
        parameter: parameter.name,
        reason: err.to_string(),
    })
}

/// A typed business operation (command or query) with its binding table.
///
/// Usually derived:
///
/// ```rust,ignore
/// /// Gets attribute for editing.
/// #[derive(Operation)]
/// #[operation(query)]
/// pub struct GetAttributeForEditing {
///     attribute_id: i64,
///     #[setter]
///     shop_id: Option<i64>,
/// }
/// ```
pub trait Operation: Sized + Send + 'static {
    /// Operation name, listed in the catalog.
    const NAME: &'static str;
    const KIND: OperationKind;
    /// Business domain the operation belongs to, eg. `AttributeGroup`.
    const DOMAIN: &'static str = "";
    /// First paragraph of the operation's documentation.
    const DESCRIPTION: &'static str = "";
    /// Constructor parameters in declaration order.
    const PARAMETERS: &'static [Parameter];

    /// Setters available for extra input values.
    fn setters() -> Vec<Setter<Self>> {
        Vec::new()
    }

    /// Builds the operation from resolved positional arguments.
    fn construct(arguments: Arguments) -> Result<Self, BindError>;
}

/// A description of an operation, decoupled from its Rust type.
#[derive(Clone, Debug, Serialize)]
pub struct OperationDefinition {
    pub name: &'static str,
    pub kind: OperationKind,
    pub domain: &'static str,
    pub description: &'static str,
    pub parameters: &'static [Parameter],
    pub properties: Vec<String>,
}

impl OperationDefinition {
    pub fn of<O: Operation>() -> Self {
        OperationDefinition {
            name: O::NAME,
            kind: O::KIND,
            domain: O::DOMAIN,
            description: O::DESCRIPTION,
            parameters: O::PARAMETERS,
            properties: O::setters().iter().map(Setter::property).collect(),
        }
    }

    /// The name prefixed with its domain, eg. `AttributeGroup::GetAttributeForEditing`.
    pub fn qualified_name(&self) -> String {
        if self.domain.is_empty() {
            self.name.to_string()
        } else {
            format!("{}::{}", self.domain, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ID: Parameter = Parameter {
        name: "attributeId",
        ty: TypeTag::Int,
        required: true,
        position: 0,
    };

    #[test]
    fn derives_property_names_from_setters() {
        assert_eq!(property_name("setShopIds"), "shopIds");
        assert_eq!(property_name("setColor"), "color");
        assert_eq!(property_name("set"), "");
    }

    #[test]
    fn take_reports_missing_required_parameter() {
        let mut args = Arguments::new("GetAttributeForEditing", 1);

        let err = args.take::<i64>(&ID).unwrap_err();

        assert!(matches!(
            err,
            BindError::MissingRequiredParameter {
                operation: "GetAttributeForEditing",
                parameter: "attributeId",
            }
        ));
    }

    #[test]
    fn take_or_else_falls_back_to_default() {
        let mut args = Arguments::new("GetAttributeForEditing", 1);
        assert_eq!(args.take_or_else(&ID, || 7i64).unwrap(), 7);

        args.set(&ID, json!(3));
        assert!(args.is_set(&ID));
        assert_eq!(args.take_or_else(&ID, || 7i64).unwrap(), 3);
        assert!(!args.is_set(&ID));
    }

    #[test]
    fn take_rejects_values_of_the_wrong_shape() {
        let mut args = Arguments::new("GetAttributeForEditing", 1);
        args.set(&ID, json!("five"));

        let err = args.take::<i64>(&ID).unwrap_err();

        assert!(matches!(
            err,
            BindError::InvalidParameter {
                parameter: "attributeId",
                ..
            }
        ));
    }

    /// Edits an attribute value.
    ///
    /// Not part of the summary.
    #[derive(Debug, crate::Operation)]
    #[operation(command, name = "EditAttributeValue", domain = "Attribute")]
    struct EditValue {
        attribute_id: i64,
        #[param(rename = "shopIds", ty = "list", default = vec!["1".to_string()])]
        shops: Vec<String>,
        position: Option<i64>,
        #[setter(with = "paint")]
        color: String,
        #[setter]
        r#type: Option<String>,
    }

    impl EditValue {
        fn paint(&mut self, color: String) {
            self.color = color.to_lowercase();
        }
    }

    #[test]
    fn derive_generates_binding_table() {
        assert_eq!(EditValue::NAME, "EditAttributeValue");
        assert_eq!(EditValue::KIND, OperationKind::Command);
        assert_eq!(EditValue::DOMAIN, "Attribute");
        assert_eq!(EditValue::DESCRIPTION, "Edits an attribute value.");

        let params: Vec<_> = EditValue::PARAMETERS
            .iter()
            .map(|p| (p.name, p.ty, p.required, p.position))
            .collect();
        assert_eq!(
            params,
            [
                ("attributeId", TypeTag::Int, true, 0),
                ("shopIds", TypeTag::List, false, 1),
                ("position", TypeTag::Int, false, 2),
            ]
        );

        let definition = OperationDefinition::of::<EditValue>();
        assert_eq!(definition.properties, ["color", "type"]);
        assert_eq!(definition.qualified_name(), "Attribute::EditAttributeValue");
    }

    #[test]
    fn derive_constructs_with_defaults_and_setters() {
        let mut args = Arguments::new(EditValue::NAME, EditValue::PARAMETERS.len());
        args.set(&EditValue::PARAMETERS[0], json!(4));

        let mut op = EditValue::construct(args).unwrap();
        assert_eq!(op.attribute_id, 4);
        assert_eq!(op.shops, ["1"]);
        assert_eq!(op.position, None);
        assert_eq!(op.color, "");

        let setters = EditValue::setters();
        assert_eq!(setters[0].method, "setColor");
        setters[0].invoke(&mut op, json!("#FF0000")).unwrap();
        assert_eq!(op.color, "#ff0000");

        setters[1].invoke(&mut op, json!("select")).unwrap();
        assert_eq!(op.r#type.as_deref(), Some("select"));

        let err = setters[0].invoke(&mut op, json!(5)).unwrap_err();
        assert!(matches!(
            err,
            BindError::InvalidParameter {
                parameter: "setColor",
                ..
            }
        ));
    }
}
