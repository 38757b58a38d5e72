use super::{Inventory, InventoryError, Result};
use crate::document_store::{DocumentStore, KeyPath, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A rack standing in a room (`racks/<room>-<rack>`), holding `rows * columns` shelves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    pub room: String,
    pub rack: String,
    pub rows: u32,
    pub columns: u32,
    pub shelf_capacity: u32,
}

/// A shelf of a rack (`shelves/<room>-<rack>-<index>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelf {
    pub id: String,
    pub room: String,
    pub rack: String,
    pub index: u32,
    pub row: u32,
    pub column: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfUsage {
    pub shelf: Shelf,
    pub occupied: usize,
    pub capacity: u32,
}

impl ShelfUsage {
    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity as usize
    }

    pub fn free(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.occupied)
    }
}

pub const MAX_SHELVES_PER_RACK: u32 = 1000;

impl Rack {
    pub fn id(&self) -> String {
        rack_id(&self.room, &self.rack)
    }

    /// The shelves of the rack, numbered from 1 in row-major order.
    /// Empty for layouts rejected by `create_rack`.
    pub fn shelves(&self) -> Vec<Shelf> {
        if self.check_layout().is_err() {
            return Vec::new();
        }

        let mut shelves = Vec::with_capacity((self.rows * self.columns) as usize);
        for row in 1..=self.rows {
            for column in 1..=self.columns {
                let index = (row - 1) * self.columns + column;
                shelves.push(Shelf {
                    id: format!("{}-{}", self.id(), index),
                    room: self.room.clone(),
                    rack: self.rack.clone(),
                    index,
                    row,
                    column,
                    capacity: self.shelf_capacity,
                });
            }
        }

        shelves
    }

    fn check_layout(&self) -> Result<()> {
        let reason = if self.room.trim().is_empty() {
            Some("the room must not be empty")
        } else if self.rack.trim().is_empty() {
            Some("the rack must not be empty")
        } else if self.rows == 0 || self.columns == 0 {
            Some("a rack needs at least one row and one column")
        } else if self
            .rows
            .checked_mul(self.columns)
            .map_or(true, |count| count > MAX_SHELVES_PER_RACK)
        {
            Some("a rack holds at most 1000 shelves")
        } else if self.shelf_capacity == 0 {
            Some("shelves need a capacity of at least one")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InventoryError::InvalidRackLayout { reason }),
            None => Ok(()),
        }
    }
}

pub fn rack_id(room: &str, rack: &str) -> String {
    format!("{}-{}", room, rack)
}

impl<S: DocumentStore> Inventory<S> {
    /// Stores the rack together with all of its shelves in one update.
    pub fn create_rack(&self, rack: Rack) -> Result<Vec<Shelf>> {
        rack.check_layout()?;

        let id = rack.id();
        let rack_path = KeyPath::root().child("racks")?.child(&id)?;
        if self.store.get(&rack_path)?.is_some() {
            return Err(InventoryError::RackExists { id });
        }

        let shelves = rack.shelves();
        let mut patch = Map::new();
        patch.insert(rack_path.to_string(), to_document(&rack)?);
        for shelf in &shelves {
            patch.insert(shelf_path(&shelf.id)?.to_string(), to_document(shelf)?);
        }
        self.store.update(&KeyPath::root(), &patch)?;
        tracing::info!(%id, shelves = shelves.len(), "created rack");

        Ok(shelves)
    }

    pub fn list_racks(&self) -> Result<Vec<Rack>> {
        let mut racks: Vec<Rack> = self.read_collection("racks")?;
        racks.sort_by(|a, b| a.room.cmp(&b.room).then_with(|| a.rack.cmp(&b.rack)));
        Ok(racks)
    }

    /// The shelves of a rack ordered by index.
    pub fn shelves_for_rack(&self, room: &str, rack: &str) -> Result<Vec<Shelf>> {
        let id = rack_id(room, rack);
        if self.store.get(&KeyPath::root().child("racks")?.child(&id)?)?.is_none() {
            return Err(InventoryError::RackNotFound { id });
        }

        let mut shelves: Vec<Shelf> = self
            .read_collection::<Shelf>("shelves")?
            .into_iter()
            .filter(|shelf| shelf.room == room && shelf.rack == rack)
            .collect();
        shelves.sort_by_key(|shelf| shelf.index);
        Ok(shelves)
    }

    /// Removes the rack and all of its shelves in one update.
    /// Entries stored on the shelves keep their location.
    pub fn remove_rack(&self, room: &str, rack: &str) -> Result<()> {
        let shelves = self.shelves_for_rack(room, rack)?;

        let mut patch = Map::new();
        patch.insert(
            KeyPath::root().child("racks")?.child(&rack_id(room, rack))?.to_string(),
            Value::Null,
        );
        for shelf in shelves {
            patch.insert(shelf_path(&shelf.id)?.to_string(), Value::Null);
        }
        self.store.update(&KeyPath::root(), &patch)?;

        Ok(())
    }

    /// Number of entries located on a shelf compared to its capacity.
    /// None if no shelf with that id exists.
    pub fn shelf_usage(&self, shelf_id: &str) -> Result<Option<ShelfUsage>> {
        // Locations are free text, ids that are no valid key were never stored as a shelf
        let path = match KeyPath::root().child("shelves")?.child(shelf_id) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        let shelf: Shelf = match self.store.get_typed(&path)? {
            Some(shelf) => shelf,
            None => return Ok(None),
        };

        let occupied = self
            .list_entries()?
            .iter()
            .filter(|entry| entry.location.shelf_id().as_deref() == Some(shelf_id))
            .count();

        Ok(Some(ShelfUsage {
            capacity: shelf.capacity,
            shelf,
            occupied,
        }))
    }
}

fn shelf_path(shelf_id: &str) -> Result<KeyPath> {
    Ok(KeyPath::root().child("shelves")?.child(shelf_id)?)
}

fn to_document<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(StoreError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelves_are_numbered_row_major() {
        let rack = Rack {
            room: "R1".to_string(),
            rack: "A".to_string(),
            rows: 2,
            columns: 3,
            shelf_capacity: 10,
        };

        let shelves = rack.shelves();
        assert_eq!(shelves.len(), 6);
        assert_eq!(shelves[0].id, "R1-A-1");
        assert_eq!((shelves[0].row, shelves[0].column), (1, 1));
        assert_eq!(shelves[3].id, "R1-A-4");
        assert_eq!((shelves[3].row, shelves[3].column), (2, 1));
        assert_eq!(shelves[5].id, "R1-A-6");
        assert!(shelves.iter().all(|shelf| shelf.capacity == 10));
    }

    #[test]
    fn reject_degenerated_layouts() {
        let rack = Rack {
            room: "R1".to_string(),
            rack: "A".to_string(),
            rows: 0,
            columns: 3,
            shelf_capacity: 10,
        };
        assert!(rack.check_layout().is_err());
        assert!(Rack { rows: 1, shelf_capacity: 0, ..rack.clone() }.check_layout().is_err());
        assert!(Rack { rows: 1, room: " ".to_string(), ..rack.clone() }.check_layout().is_err());
        assert!(Rack { rows: 1, ..rack.clone() }.check_layout().is_ok());

        let huge = Rack {
            rows: 70_000,
            columns: 70_000,
            ..rack.clone()
        };
        assert!(huge.check_layout().is_err());
        assert!(huge.shelves().is_empty());
        assert!(Rack { rows: 10, columns: 101, ..rack.clone() }.check_layout().is_err());
        assert!(Rack { rows: 10, columns: 100, ..rack }.check_layout().is_ok());
    }

    #[test]
    fn usage_counts_free_slots() {
        let shelf = Shelf {
            id: "R1-A-1".to_string(),
            room: "R1".to_string(),
            rack: "A".to_string(),
            index: 1,
            row: 1,
            column: 1,
            capacity: 2,
        };
        let usage = ShelfUsage {
            shelf,
            occupied: 1,
            capacity: 2,
        };

        assert!(!usage.is_full());
        assert_eq!(usage.free(), 1);
    }
}
