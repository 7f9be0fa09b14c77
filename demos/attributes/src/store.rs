use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::{api_access::EditableApiAccess, attributes::EditableAttribute};

#[derive(Clone, Debug)]
pub struct AttributeGroup {
    pub attribute_group_id: i64,
    pub name: String,
    pub is_color_group: bool,
}

#[derive(Debug, Default)]
pub struct Tables {
    pub attribute_groups: BTreeMap<i64, AttributeGroup>,
    pub attributes: BTreeMap<i64, EditableAttribute>,
    pub api_accesses: BTreeMap<i64, EditableApiAccess>,
}

impl Tables {
    pub fn next_attribute_id(&self) -> i64 {
        self.attributes.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn next_api_access_id(&self) -> i64 {
        self.api_accesses.keys().next_back().map_or(1, |id| id + 1)
    }
}

/// In-memory storage shared by the handlers.
#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    /// A store holding a size group and a color group with a few attributes.
    pub fn seeded() -> Self {
        let mut tables = Tables::default();

        for (attribute_group_id, name, is_color_group) in [(1, "Size", false), (2, "Color", true)] {
            tables.attribute_groups.insert(
                attribute_group_id,
                AttributeGroup {
                    attribute_group_id,
                    name: name.to_string(),
                    is_color_group,
                },
            );
        }

        for (attribute_id, attribute_group_id, name, color) in [
            (1, 1, "S", ""),
            (2, 1, "M", ""),
            (3, 1, "L", ""),
            (4, 2, "Red", "#e84c3d"),
            (5, 2, "Blue", "#5d9cec"),
        ] {
            tables.attributes.insert(
                attribute_id,
                EditableAttribute {
                    attribute_id,
                    attribute_group_id,
                    name: name.to_string(),
                    color: color.to_string(),
                    shop_association_ids: vec![1],
                },
            );
        }

        Store {
            tables: RwLock::new(tables),
        }
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
