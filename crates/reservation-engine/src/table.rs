//! Table registry.
//!
//! Owns the physical tables of one restaurant. Every read hands out an owned
//! clone so callers can never mutate registry state behind its back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// A physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    /// Floor number shown to staff. Unique per restaurant.
    pub number: u32,
    pub name: String,
    /// Seats. Always at least one.
    pub capacity: u32,
    pub section: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Create table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTable {
    pub number: u32,
    pub name: String,
    pub capacity: u32,
    pub section: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_active() -> bool {
    true
}

impl NewTable {
    pub fn new(number: u32, capacity: u32, section: impl Into<String>) -> Self {
        Self {
            number,
            name: format!("Table {number}"),
            capacity,
            section: section.into(),
            is_active: true,
            notes: None,
        }
    }
}

/// Update table payload. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablePatch {
    pub number: Option<u32>,
    pub name: Option<String>,
    pub capacity: Option<u32>,
    pub section: Option<String>,
    pub is_active: Option<bool>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Table>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, new: NewTable) -> Result<Table> {
        validate_capacity(new.capacity)?;
        self.ensure_number_free(new.number, None)?;

        let table = Table {
            id: Uuid::new_v4().to_string(),
            number: new.number,
            name: new.name,
            capacity: new.capacity,
            section: new.section,
            is_active: new.is_active,
            notes: new.notes,
        };
        self.tables.insert(table.id.clone(), table.clone());
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Result<Table> {
        self.tables
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::table_not_found(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tables.contains_key(id)
    }

    /// Tables ordered by number, optionally restricted to active ones and one section.
    pub fn list(&self, active_only: bool, section: Option<&str>) -> Vec<Table> {
        let mut tables: Vec<Table> = self
            .tables
            .values()
            .filter(|t| !active_only || t.is_active)
            .filter(|t| section.is_none_or(|s| t.section == s))
            .cloned()
            .collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    /// Borrowing iterator for the availability engine.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn update(&mut self, id: &str, patch: TablePatch) -> Result<Table> {
        if !self.tables.contains_key(id) {
            return Err(EngineError::table_not_found(id));
        }
        if let Some(capacity) = patch.capacity {
            validate_capacity(capacity)?;
        }
        if let Some(number) = patch.number {
            self.ensure_number_free(number, Some(id))?;
        }

        let table = self
            .tables
            .get_mut(id)
            .ok_or_else(|| EngineError::table_not_found(id))?;
        if let Some(number) = patch.number {
            table.number = number;
        }
        if let Some(name) = patch.name {
            table.name = name;
        }
        if let Some(capacity) = patch.capacity {
            table.capacity = capacity;
        }
        if let Some(section) = patch.section {
            table.section = section;
        }
        if let Some(is_active) = patch.is_active {
            table.is_active = is_active;
        }
        if let Some(notes) = patch.notes {
            table.notes = notes;
        }
        Ok(table.clone())
    }

    /// Remove a table. Reservation checks are the caller's job.
    pub fn remove(&mut self, id: &str) -> Result<Table> {
        self.tables
            .remove(id)
            .ok_or_else(|| EngineError::table_not_found(id))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn ensure_number_free(&self, number: u32, except: Option<&str>) -> Result<()> {
        let taken = self
            .tables
            .values()
            .any(|t| t.number == number && Some(t.id.as_str()) != except);
        if taken {
            return Err(EngineError::Conflict(format!(
                "table number {number} is already in use"
            )));
        }
        Ok(())
    }
}

fn validate_capacity(capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Err(EngineError::Validation(
            "table capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}
