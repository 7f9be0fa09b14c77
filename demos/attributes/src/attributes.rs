use std::sync::Arc;

use opbind_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use crate::store::{Store, Tables};

/// Stores attribute data needed for editing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EditableAttribute {
    pub attribute_id: i64,
    pub attribute_group_id: i64,
    pub name: String,
    pub color: String,
    pub shop_association_ids: Vec<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttributeList {
    pub attribute_group_id: i64,
    pub total: usize,
    pub attributes: Vec<EditableAttribute>,
}

/// Attribute as exposed by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AttributeResource {
    pub attribute_id: i64,
    pub attribute_group_id: i64,
    pub name: String,
    pub color: String,
    #[serde(rename(serialize = "shopIds"))]
    pub shop_association_ids: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct DeletedAttributeResource {
    pub attribute_id: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AttributeListResource {
    pub attribute_group_id: i64,
    pub total: usize,
    pub attributes: Vec<AttributeResource>,
}

/// Gets attribute for editing.
#[derive(Debug, Operation)]
#[operation(query, domain = "AttributeGroup")]
pub struct GetAttributeForEditing {
    pub attribute_id: i64,
}

/// Lists the attributes of an attribute group.
///
/// Results can be narrowed to a shop and paginated.
#[derive(Debug, Operation)]
#[operation(query, domain = "AttributeGroup")]
pub struct GetAttributeList {
    pub attribute_group_id: i64,
    pub shop_id: Option<i64>,
    #[setter]
    pub limit: Option<usize>,
    #[setter]
    pub offset: Option<usize>,
}

/// Adds a new attribute to an attribute group.
#[derive(Debug, Operation)]
#[operation(command, domain = "AttributeGroup")]
pub struct AddAttribute {
    pub attribute_group_id: i64,
    pub name: String,
    #[param(default)]
    pub color: String,
    #[param(default = vec![1], ty = "IdList", rename = "shopIds")]
    pub shop_association_ids: Vec<i64>,
}

/// Edits an attribute. Only provided properties are changed.
#[derive(Debug, Operation)]
#[operation(command, domain = "AttributeGroup")]
pub struct EditAttribute {
    pub attribute_id: i64,
    #[setter]
    pub name: Option<String>,
    #[setter]
    pub color: Option<String>,
    #[setter(rename = "shopIds", ty = "IdList")]
    pub shop_association_ids: Option<Vec<i64>>,
}

/// Deletes an attribute.
#[derive(Debug, Operation)]
#[operation(command, domain = "AttributeGroup")]
pub struct DeleteAttribute {
    pub attribute_id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeletedAttribute {
    pub attribute_id: i64,
}

#[derive(Clone, Debug)]
pub struct AttributeHandlers {
    store: Arc<Store>,
}

impl AttributeHandlers {
    pub fn new(store: Arc<Store>) -> Self {
        AttributeHandlers { store }
    }
}

impl Handler<GetAttributeForEditing> for AttributeHandlers {
    type Output = EditableAttribute;

    async fn handle(&self, query: GetAttributeForEditing) -> Result<EditableAttribute, OperationError> {
        self.store
            .read()
            .await
            .attributes
            .get(&query.attribute_id)
            .cloned()
            .ok_or_else(|| attribute_not_found(query.attribute_id))
    }
}

impl Handler<GetAttributeList> for AttributeHandlers {
    type Output = AttributeList;

    async fn handle(&self, query: GetAttributeList) -> Result<AttributeList, OperationError> {
        let tables = self.store.read().await;
        if !tables.attribute_groups.contains_key(&query.attribute_group_id) {
            return Err(group_not_found(query.attribute_group_id));
        }

        let matching: Vec<_> = tables
            .attributes
            .values()
            .filter(|attribute| attribute.attribute_group_id == query.attribute_group_id)
            .filter(|attribute| {
                query
                    .shop_id
                    .is_none_or(|shop_id| attribute.shop_association_ids.contains(&shop_id))
            })
            .collect();

        let total = matching.len();
        let attributes = matching
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(AttributeList {
            attribute_group_id: query.attribute_group_id,
            total,
            attributes,
        })
    }
}

impl Handler<AddAttribute> for AttributeHandlers {
    type Output = EditableAttribute;

    async fn handle(&self, command: AddAttribute) -> Result<EditableAttribute, OperationError> {
        let mut tables = self.store.write().await;
        let Some(group) = tables.attribute_groups.get(&command.attribute_group_id) else {
            return Err(group_not_found(command.attribute_group_id));
        };

        validate_name(&command.name)?;
        if group.is_color_group {
            validate_color(&command.color)?;
        }

        ensure_name_unused(&tables, command.attribute_group_id, &command.name, None)?;

        let attribute = EditableAttribute {
            attribute_id: tables.next_attribute_id(),
            attribute_group_id: command.attribute_group_id,
            name: command.name,
            color: command.color,
            shop_association_ids: command.shop_association_ids,
        };
        tables
            .attributes
            .insert(attribute.attribute_id, attribute.clone());

        Ok(attribute)
    }
}

impl Handler<EditAttribute> for AttributeHandlers {
    type Output = EditableAttribute;

    async fn handle(&self, command: EditAttribute) -> Result<EditableAttribute, OperationError> {
        let mut tables = self.store.write().await;
        let Some(current) = tables.attributes.get(&command.attribute_id) else {
            return Err(attribute_not_found(command.attribute_id));
        };
        let is_color_group = tables
            .attribute_groups
            .get(&current.attribute_group_id)
            .is_some_and(|group| group.is_color_group);

        let mut attribute = current.clone();
        if let Some(name) = command.name {
            validate_name(&name)?;
            ensure_name_unused(
                &tables,
                attribute.attribute_group_id,
                &name,
                Some(attribute.attribute_id),
            )?;
            attribute.name = name;
        }
        if let Some(color) = command.color {
            if is_color_group {
                validate_color(&color)?;
            }
            attribute.color = color;
        }
        if let Some(shop_ids) = command.shop_association_ids {
            attribute.shop_association_ids = shop_ids;
        }

        tables
            .attributes
            .insert(attribute.attribute_id, attribute.clone());
        Ok(attribute)
    }
}

impl Handler<DeleteAttribute> for AttributeHandlers {
    type Output = DeletedAttribute;

    async fn handle(&self, command: DeleteAttribute) -> Result<DeletedAttribute, OperationError> {
        match self.store.write().await.attributes.remove(&command.attribute_id) {
            Some(attribute) => Ok(DeletedAttribute {
                attribute_id: attribute.attribute_id,
            }),
            None => Err(attribute_not_found(command.attribute_id)),
        }
    }
}

fn attribute_not_found(attribute_id: i64) -> OperationError {
    OperationError::not_found(format!("Attribute {attribute_id} not found"))
}

fn group_not_found(attribute_group_id: i64) -> OperationError {
    OperationError::not_found(format!("Attribute group {attribute_group_id} not found"))
}

/// Names are unique within a group, ignoring case.
fn ensure_name_unused(
    tables: &Tables,
    attribute_group_id: i64,
    name: &str,
    except: Option<i64>,
) -> Result<(), OperationError> {
    let duplicate = tables.attributes.values().any(|attribute| {
        Some(attribute.attribute_id) != except
            && attribute.attribute_group_id == attribute_group_id
            && attribute.name.eq_ignore_ascii_case(name)
    });
    if duplicate {
        return Err(OperationError::rejected(format!(
            "Attribute {name} already exists in group {attribute_group_id}"
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), OperationError> {
    if name.trim().is_empty() {
        return Err(OperationError::invalid_input("Attribute name cannot be empty"));
    }
    Ok(())
}

/// Color groups need a `#rrggbb` color.
fn validate_color(color: &str) -> Result<(), OperationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(OperationError::invalid_input(format!(
            "Invalid color {color:?}, expected #rrggbb"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::converters::IdListConverter;

    fn handlers() -> AttributeHandlers {
        AttributeHandlers::new(Arc::new(Store::seeded()))
    }

    fn bind<O: Operation>(values: serde_json::Value) -> Result<O, BindError> {
        let registry = ConverterRegistry::with_defaults().with(IdListConverter);
        let bag: InputBag = values
            .as_object()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();
        Binder::new(&registry).bind(bag)
    }

    #[test]
    fn derived_binding_table() {
        let names: Vec<_> = AddAttribute::PARAMETERS.iter().map(|p| p.name).collect();
        assert_eq!(names, ["attributeGroupId", "name", "color", "shopIds"]);
        assert_eq!(AddAttribute::PARAMETERS[3].ty, TypeTag::Named("IdList"));
        assert!(!AddAttribute::PARAMETERS[2].required);
        assert_eq!(AddAttribute::KIND, OperationKind::Command);
        assert_eq!(
            AddAttribute::DESCRIPTION,
            "Adds a new attribute to an attribute group."
        );

        let properties: Vec<_> = EditAttribute::setters().iter().map(Setter::property).collect();
        assert_eq!(properties, ["name", "color", "shopIds"]);
    }

    #[test]
    fn binds_add_attribute_with_defaults() {
        let command: AddAttribute =
            bind(json!({ "attributeGroupId": "1", "name": "XL" })).unwrap();

        assert_eq!(command.attribute_group_id, 1);
        assert_eq!(command.color, "");
        assert_eq!(command.shop_association_ids, [1]);
    }

    #[test]
    fn binds_id_lists_from_strings() {
        let command: AddAttribute =
            bind(json!({ "attributeGroupId": 1, "name": "XL", "shopIds": "1, 3" })).unwrap();

        assert_eq!(command.shop_association_ids, [1, 3]);
    }

    #[tokio::test]
    async fn gets_attribute_for_editing() {
        let attribute = handlers()
            .handle(GetAttributeForEditing { attribute_id: 4 })
            .await
            .unwrap();

        assert_eq!(attribute.name, "Red");
        assert_eq!(attribute.color, "#e84c3d");
    }

    #[tokio::test]
    async fn missing_attribute_is_not_found() {
        let err = handlers()
            .handle(GetAttributeForEditing { attribute_id: 99 })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn lists_attributes_with_pagination_setters() {
        let query: GetAttributeList =
            bind(json!({ "attributeGroupId": "1", "limit": "2", "offset": "1" })).unwrap();
        assert_eq!(query.limit, Some(2));

        let list = handlers().handle(query).await.unwrap();

        assert_eq!(list.total, 3);
        let names: Vec<_> = list.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["M", "L"]);
    }

    #[tokio::test]
    async fn color_groups_require_valid_colors() {
        let err = handlers()
            .handle(AddAttribute {
                attribute_group_id: 2,
                name: "Green".to_string(),
                color: "green".to_string(),
                shop_association_ids: vec![1],
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("expected #rrggbb"));
    }

    #[tokio::test]
    async fn adds_attribute() {
        let handlers = handlers();

        let attribute = handlers
            .handle(AddAttribute {
                attribute_group_id: 2,
                name: "Green".to_string(),
                color: "#00ff00".to_string(),
                shop_association_ids: vec![1, 2],
            })
            .await
            .unwrap();

        assert_eq!(attribute.attribute_id, 6);
        let stored = handlers
            .handle(GetAttributeForEditing { attribute_id: 6 })
            .await
            .unwrap();
        assert_eq!(stored, attribute);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let err = handlers()
            .handle(AddAttribute {
                attribute_group_id: 1,
                name: "m".to_string(),
                color: String::new(),
                shop_association_ids: vec![1],
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Rejected);
    }

    #[tokio::test]
    async fn edits_only_provided_properties() {
        let command: EditAttribute =
            bind(json!({ "attributeId": "5", "color": "#0000ff", "typo": "x" })).unwrap();

        let attribute = handlers().handle(command).await.unwrap();

        assert_eq!(attribute.name, "Blue");
        assert_eq!(attribute.color, "#0000ff");
    }

    #[tokio::test]
    async fn renaming_to_a_taken_name_is_rejected() {
        let handlers = handlers();

        let err = handlers
            .handle(EditAttribute {
                attribute_id: 2,
                name: Some("s".to_string()),
                color: None,
                shop_association_ids: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Rejected);

        let renamed = handlers
            .handle(EditAttribute {
                attribute_id: 2,
                name: Some("m".to_string()),
                color: None,
                shop_association_ids: None,
            })
            .await
            .unwrap();
        assert_eq!(renamed.name, "m");
    }

    #[tokio::test]
    async fn deletes_attribute_once() {
        let handlers = handlers();

        let deleted = handlers
            .handle(DeleteAttribute { attribute_id: 1 })
            .await
            .unwrap();
        assert_eq!(deleted.attribute_id, 1);

        let err = handlers
            .handle(DeleteAttribute { attribute_id: 1 })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
