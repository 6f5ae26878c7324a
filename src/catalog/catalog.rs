//! System catalog for moDB
//!
//! Databases are directories under the base data directory. A table is a
//! pair of files inside its database directory: `<name>.db` (heap) and
//! `<name>.json` (schema). The catalog tracks the active database and keeps
//! the in-memory registry of open tables.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::{Pager, Schema, Table};

/// Catalog: databases on disk plus the registry of open tables
#[derive(Debug)]
pub struct Catalog {
    /// Base directory holding one subdirectory per database
    base_dir: PathBuf,
    /// Name of the active database, if one has been selected
    active_db: Option<String>,
    /// Open tables of the active database, keyed by name
    tables: HashMap<String, Table>,
}

impl Catalog {
    /// Create a catalog over the given base directory, creating it if missing
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            active_db: None,
            tables: HashMap::new(),
        })
    }

    /// Name of the active database, if any
    pub fn active_db(&self) -> Option<&str> {
        self.active_db.as_deref()
    }

    /// Directory of the active database; fails when none is selected
    pub fn active_dir(&self) -> Result<PathBuf> {
        let db = self.active_db.as_ref().ok_or(Error::NoActiveDatabase)?;
        Ok(self.base_dir.join(db))
    }

    /// Create a new database directory
    pub fn create_database(&mut self, name: &str) -> Result<()> {
        let path = self.base_dir.join(name);
        if path.exists() {
            return Err(Error::DatabaseAlreadyExists(name.to_string()));
        }
        fs::create_dir(&path)?;
        info!(database = name, "created database");
        Ok(())
    }

    /// Select the active database and reload its tables
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        let path = self.base_dir.join(name);
        if !path.is_dir() {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }
        self.active_db = Some(name.to_string());
        self.reload_tables()
    }

    /// Rebuild the table registry from the active database directory.
    ///
    /// Scans for `*.json` schema files with a sibling `*.db` heap file;
    /// unpaired or undecodable entries are skipped.
    pub fn reload_tables(&mut self) -> Result<()> {
        let db_dir = match self.active_db.as_ref() {
            Some(db) => self.base_dir.join(db),
            None => {
                self.tables.clear();
                return Ok(());
            }
        };

        let mut new_tables = HashMap::new();
        for entry in fs::read_dir(&db_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let table_name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };

            let db_path = db_dir.join(format!("{}.db", table_name));
            if !db_path.exists() {
                continue;
            }

            let schema_file = match fs::File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    warn!(table = %table_name, error = %e, "skipping unreadable schema");
                    continue;
                }
            };
            let schema: Schema = match serde_json::from_reader(schema_file) {
                Ok(s) => s,
                Err(e) => {
                    warn!(table = %table_name, error = %e, "skipping undecodable schema");
                    continue;
                }
            };

            let pager = match Pager::open(&db_path) {
                Ok(p) => p,
                Err(e) => {
                    warn!(table = %table_name, error = %e, "skipping unopenable heap file");
                    continue;
                }
            };

            new_tables.insert(table_name, Table::new(pager, schema));
        }

        info!(count = new_tables.len(), "reloaded tables");
        self.tables = new_tables;
        Ok(())
    }

    /// Persist a schema as `<name>.json` in the active database directory
    pub fn save_schema(&self, name: &str, schema: &Schema) -> Result<()> {
        let path = self.active_dir()?.join(format!("{}.json", name));
        let file = fs::File::create(path)?;
        serde_json::to_writer(file, schema)?;
        Ok(())
    }

    /// Path of a table's heap file in the active database
    pub fn heap_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.active_dir()?.join(format!("{}.db", name)))
    }

    /// Install a table in the registry
    pub fn register_table(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    /// Check whether a table is registered
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Look up a table by name, mutably
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Names of all registered tables
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Column, DataType, Value};

    fn test_catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path().join("data")).unwrap();
        (dir, catalog)
    }

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Int32).primary_key(),
            Column::new("name", DataType::FixedText).size(16),
        ])
    }

    #[test]
    fn test_create_database() {
        let (_dir, mut catalog) = test_catalog();

        catalog.create_database("shop").unwrap();
        let result = catalog.create_database("shop");
        assert!(matches!(result, Err(Error::DatabaseAlreadyExists(_))));
    }

    #[test]
    fn test_use_missing_database() {
        let (_dir, mut catalog) = test_catalog();
        let result = catalog.use_database("nope");
        assert!(matches!(result, Err(Error::DatabaseNotFound(_))));
    }

    #[test]
    fn test_no_active_database() {
        let (_dir, catalog) = test_catalog();
        assert!(matches!(catalog.active_dir(), Err(Error::NoActiveDatabase)));
        assert!(matches!(
            catalog.save_schema("t", &users_schema()),
            Err(Error::NoActiveDatabase)
        ));
    }

    #[test]
    fn test_save_and_reload_tables() {
        let (_dir, mut catalog) = test_catalog();

        catalog.create_database("shop").unwrap();
        catalog.use_database("shop").unwrap();

        let schema = users_schema();
        let pager = Pager::open(catalog.heap_path("users").unwrap()).unwrap();
        let mut table = Table::new(pager, schema.clone());
        table
            .insert(&[Value::Int32(1), Value::Text("ada".to_string())])
            .unwrap();
        catalog.register_table("users", table);
        catalog.save_schema("users", &schema).unwrap();

        // A fresh USE rebuilds the registry from disk
        catalog.use_database("shop").unwrap();
        assert!(catalog.has_table("users"));

        let rows = catalog.table_mut("users").unwrap().select_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values[0], Value::Int32(1));
    }

    #[test]
    fn test_reload_skips_unpaired_schema() {
        let (_dir, mut catalog) = test_catalog();

        catalog.create_database("shop").unwrap();
        catalog.use_database("shop").unwrap();

        // Schema file without a sibling heap file
        catalog.save_schema("ghost", &users_schema()).unwrap();
        catalog.reload_tables().unwrap();

        assert!(!catalog.has_table("ghost"));
    }

    #[test]
    fn test_switching_database_swaps_registry() {
        let (_dir, mut catalog) = test_catalog();

        catalog.create_database("a").unwrap();
        catalog.create_database("b").unwrap();

        catalog.use_database("a").unwrap();
        let schema = users_schema();
        let pager = Pager::open(catalog.heap_path("only_in_a").unwrap()).unwrap();
        catalog.register_table("only_in_a", Table::new(pager, schema.clone()));
        catalog.save_schema("only_in_a", &schema).unwrap();

        catalog.use_database("b").unwrap();
        assert!(!catalog.has_table("only_in_a"));

        catalog.use_database("a").unwrap();
        assert!(catalog.has_table("only_in_a"));
    }
}
