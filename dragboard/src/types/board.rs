//! Board-level types: Container and Item

use super::ids::{ContainerId, ItemId};
use serde::{Deserialize, Deserializer, Serialize};

/// A named, ordered list of items (a board column).
///
/// The order of `items` is the display order and the persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    /// Older payloads call this field `tasks` and may send `null` for an empty column
    #[serde(default, alias = "tasks", deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,
}

impl Container {
    /// Create an empty container
    pub fn new(id: impl Into<ContainerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Append items, taking ownership of them
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        for mut item in items {
            item.container_id = self.id.clone();
            self.items.push(item);
        }
        self
    }

    /// Index of an item within this container
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == *id)
    }

    /// Ids of the items in display order
    pub fn item_ids(&self) -> Vec<&ItemId> {
        self.items.iter().map(|item| &item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A unit of work that belongs to exactly one container at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    /// Must equal the id of the container whose sequence holds this item
    #[serde(alias = "columnId")]
    pub container_id: ContainerId,
    pub name: String,
}

impl Item {
    /// Create a new item owned by the given container
    pub fn new(
        id: impl Into<ItemId>,
        container_id: impl Into<ContainerId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            container_id: container_id.into(),
            name: name.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Item>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_items_takes_ownership() {
        let column = Container::new("done", "Done").with_items([Item::new("a", "todo", "A")]);
        assert_eq!(column.items[0].container_id, "done");
        assert_eq!(column.index_of("a"), Some(0));
        assert_eq!(column.index_of("zzz"), None);
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = Item::new("a", "todo", "Write docs");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["containerId"], "todo");
        assert!(json.get("container_id").is_none());
    }

    #[test]
    fn test_container_reads_legacy_payload() {
        let json = r#"[
            {"id": "todo", "name": "To Do", "tasks": [{"id": "a", "columnId": "todo", "name": "A"}]},
            {"id": "done", "name": "Done", "tasks": null},
            {"id": "later", "name": "Later"}
        ]"#;

        let containers: Vec<Container> = serde_json::from_str(json).unwrap();
        assert_eq!(containers[0].items.len(), 1);
        assert_eq!(containers[0].items[0].container_id, "todo");
        assert!(containers[1].is_empty());
        assert!(containers[2].is_empty());
    }
}
