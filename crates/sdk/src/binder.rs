use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    bag::InputBag,
    converter::ConverterRegistry,
    error::BindError,
    operation::{Arguments, Operation},
    value::TypeTag,
};

/// Builds typed operations out of untyped input bags.
///
/// Constructor parameters are bound positionally from the bag, converting
/// values whose runtime type differs from the declared type. A `null`
/// parameter value is treated as missing. Values left in
/// the bag afterwards are applied through the operation's setters, and
/// dropped when no setter matches.
#[derive(Clone, Copy, Debug)]
pub struct Binder<'a> {
    converters: &'a ConverterRegistry,
}

impl<'a> Binder<'a> {
    pub fn new(converters: &'a ConverterRegistry) -> Self {
        Binder { converters }
    }

    pub fn bind<O: Operation>(&self, mut bag: InputBag) -> Result<O, BindError> {
        let mut arguments = Arguments::new(O::NAME, O::PARAMETERS.len());

        for parameter in O::PARAMETERS {
            // An explicit `null` counts as absent.
            match bag.take(parameter.name).filter(|value| !value.is_null()) {
                Some(value) => {
                    let value = self.convert(&parameter.ty, value)?;
                    arguments.set(parameter, value);
                }
                None if parameter.required => {
                    return Err(BindError::MissingRequiredParameter {
                        operation: O::NAME,
                        parameter: parameter.name,
                    });
                }
                None => {}
            }
        }

        let mut operation = O::construct(arguments)?;

        if bag.is_empty() {
            return Ok(operation);
        }

        let setters = O::setters();
        for (key, value) in bag.into_residual() {
            let Some(setter) = setters
                .iter()
                .find(|setter| setter.property().eq_ignore_ascii_case(&key))
            else {
                debug!(operation = O::NAME, property = %key, "no setter for extra property, ignoring");
                continue;
            };

            let value = self.convert(&setter.ty, value)?;
            setter.invoke(&mut operation, value)?;
        }

        Ok(operation)
    }

    /// Converts `value` to `ty` unless it already has that runtime type.
    pub fn convert(&self, ty: &TypeTag, value: Value) -> Result<Value, BindError> {
        if ty.matches(&value) {
            return Ok(value);
        }

        trace!(%ty, ?value, "converting value");
        let converted = self.converters.find(ty)?.convert(value)?;
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;

    use super::*;
    use crate::{
        converter::{Converter, IntConverter},
        error::ConversionError,
        operation::{OperationKind, Parameter, Setter},
    };

    #[derive(Debug, Default)]
    struct EditAttribute {
        attribute_group_id: i64,
        color: String,
        position: i64,
        extra: Option<String>,
    }

    impl Operation for EditAttribute {
        const NAME: &'static str = "EditAttribute";
        const KIND: OperationKind = OperationKind::Command;
        const PARAMETERS: &'static [Parameter] = &[
            Parameter {
                name: "attributeGroupId",
                ty: TypeTag::Int,
                required: true,
                position: 0,
            },
            Parameter {
                name: "color",
                ty: TypeTag::String,
                required: true,
                position: 1,
            },
            Parameter {
                name: "position",
                ty: TypeTag::Int,
                required: false,
                position: 2,
            },
        ];

        fn setters() -> Vec<Setter<Self>> {
            vec![Setter::new("setExtra", TypeTag::String, |op, value| {
                op.extra = serde_json::from_value(value)?;
                Ok(())
            })]
        }

        fn construct(mut arguments: Arguments) -> Result<Self, BindError> {
            Ok(EditAttribute {
                attribute_group_id: arguments.take(&Self::PARAMETERS[0])?,
                color: arguments.take(&Self::PARAMETERS[1])?,
                position: arguments.take_or_else(&Self::PARAMETERS[2], || -1)?,
                extra: None,
            })
        }
    }

    #[derive(Debug)]
    struct GetAttribute {
        attribute_id: i64,
    }

    impl Operation for GetAttribute {
        const NAME: &'static str = "GetAttribute";
        const KIND: OperationKind = OperationKind::Query;
        const PARAMETERS: &'static [Parameter] = &[Parameter {
            name: "attributeId",
            ty: TypeTag::Int,
            required: true,
            position: 0,
        }];

        fn construct(mut arguments: Arguments) -> Result<Self, BindError> {
            Ok(GetAttribute {
                attribute_id: arguments.take(&Self::PARAMETERS[0])?,
            })
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        output: Value,
    }

    impl Converter for Counting {
        fn supports(&self, ty: &TypeTag) -> bool {
            *ty == TypeTag::Int
        }

        fn convert(&self, _value: Value) -> Result<Value, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn registry() -> ConverterRegistry {
        ConverterRegistry::new().with(IntConverter)
    }

    #[test]
    fn binds_and_converts_required_parameters() {
        let registry = registry();
        let bag: InputBag = [
            ("attributeGroupId", json!("5")),
            ("color", json!("red")),
            ("extra", json!("ignored-or-setter")),
        ]
        .into_iter()
        .collect();

        let op: EditAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.attribute_group_id, 5);
        assert_eq!(op.color, "red");
        assert_eq!(op.position, -1);
        assert_eq!(op.extra.as_deref(), Some("ignored-or-setter"));
    }

    #[test]
    fn optional_parameters_are_bound_when_present() {
        let registry = registry();
        let bag: InputBag = [
            ("attributeGroupId", json!(5)),
            ("color", json!("red")),
            ("position", json!("3")),
        ]
        .into_iter()
        .collect();

        let op: EditAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.position, 3);
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let registry = registry();
        let bag: InputBag = [("attributeGroupId", json!("5"))].into_iter().collect();

        let err = Binder::new(&registry).bind::<EditAttribute>(bag).unwrap_err();

        assert!(matches!(
            err,
            BindError::MissingRequiredParameter {
                operation: "EditAttribute",
                parameter: "color",
            }
        ));
    }

    #[test]
    fn matching_types_skip_converters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ConverterRegistry::new().with(Counting {
            calls: calls.clone(),
            output: json!(99),
        });
        let bag: InputBag = [("attributeId", json!(5))].into_iter().collect();

        let op: GetAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.attribute_id, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn converter_output_replaces_raw_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ConverterRegistry::new().with(Counting {
            calls: calls.clone(),
            output: json!(99),
        });
        let bag: InputBag = [("attributeId", json!("5"))].into_iter().collect();

        let op: GetAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.attribute_id, 99);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_supporting_converter_is_used() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let registry = ConverterRegistry::new()
            .with(Counting {
                calls: first.clone(),
                output: json!(1),
            })
            .with(Counting {
                calls: second.clone(),
                output: json!(2),
            });
        let bag: InputBag = [("attributeId", json!("5"))].into_iter().collect();

        let op: GetAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.attribute_id, 1);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn type_mismatch_without_converter_fails() {
        let registry = ConverterRegistry::new();
        let bag: InputBag = [("attributeId", json!("5"))].into_iter().collect();

        let err = Binder::new(&registry).bind::<GetAttribute>(bag).unwrap_err();

        assert!(matches!(err, BindError::NoConverterFound { ty: TypeTag::Int }));
    }

    #[test]
    fn failed_conversion_is_reported() {
        let registry = registry();
        let bag: InputBag = [("attributeId", json!("five"))].into_iter().collect();

        let err = Binder::new(&registry).bind::<GetAttribute>(bag).unwrap_err();

        assert!(matches!(err, BindError::Conversion(_)));
    }

    #[test]
    fn unmatched_extra_properties_are_dropped() {
        let registry = registry();
        let bag: InputBag = [("attributeId", json!(5)), ("colour", json!("blue"))]
            .into_iter()
            .collect();

        let op: GetAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.attribute_id, 5);
    }

    #[test]
    fn setters_match_properties_ignoring_case() {
        let registry = registry();
        let bag: InputBag = [
            ("attributeGroupId", json!(1)),
            ("color", json!("red")),
            ("EXTRA", json!("set")),
        ]
        .into_iter()
        .collect();

        let op: EditAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.extra.as_deref(), Some("set"));
    }

    #[test]
    fn setter_values_go_through_converters() {
        let registry = ConverterRegistry::new();
        let bag: InputBag = [
            ("attributeGroupId", json!(1)),
            ("color", json!("red")),
            ("extra", json!(12)),
        ]
        .into_iter()
        .collect();

        let err = Binder::new(&registry)
            .bind::<EditAttribute>(bag)
            .unwrap_err();

        assert!(matches!(
            err,
            BindError::NoConverterFound {
                ty: TypeTag::String
            }
        ));
    }

    #[test]
    fn null_required_parameter_is_missing() {
        let registry = registry();
        let bag: InputBag = [("attributeGroupId", json!(5)), ("color", Value::Null)]
            .into_iter()
            .collect();

        let err = Binder::new(&registry).bind::<EditAttribute>(bag).unwrap_err();

        assert!(matches!(
            err,
            BindError::MissingRequiredParameter {
                operation: "EditAttribute",
                parameter: "color",
            }
        ));
    }

    #[test]
    fn null_optional_parameter_takes_its_default() {
        let registry = registry();
        let bag: InputBag = [
            ("attributeGroupId", json!(5)),
            ("color", json!("red")),
            ("position", Value::Null),
        ]
        .into_iter()
        .collect();

        let op: EditAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.position, -1);
    }

    #[test]
    fn null_setter_value_is_passed_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ConverterRegistry::new().with(Counting {
            calls: calls.clone(),
            output: json!(0),
        });
        let bag: InputBag = [
            ("attributeGroupId", json!(5)),
            ("color", json!("red")),
            ("extra", Value::Null),
        ]
        .into_iter()
        .collect();

        let op: EditAttribute = Binder::new(&registry).bind(bag).unwrap();

        assert_eq!(op.extra, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
