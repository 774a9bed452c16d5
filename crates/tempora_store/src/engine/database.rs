use std::sync::Arc;

use ahash::HashMap;
use parking_lot::Mutex;

use crate::engine::Collection;

// ----------------------------------------------------------------------------

/// A named database: a lazily-populated set of named collections.
///
/// Collection entries are write-once: once created, the same handle is
/// returned for the lifetime of the database.
pub struct Database {
    name: String,
    collections: Mutex<HashMap<String, Arc<Collection>>>,
}

impl Database {
    fn new(name: String) -> Self {
        Self {
            name,
            collections: Mutex::new(HashMap::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The collection with the given name, created empty on first use.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        let mut collections = self.collections.lock();
        if let Some(collection) = collections.get(name) {
            return collection.clone();
        }
        let collection = Arc::new(Collection::new(name.to_owned()));
        collections.insert(name.to_owned(), collection.clone());
        collection
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.lock().keys().cloned().collect()
    }
}

// ----------------------------------------------------------------------------

/// The storage endpoint: a set of named databases.
///
/// One client instance plays the role of one database server; tests create a
/// fresh client each so their databases are isolated.
#[derive(Default)]
pub struct StorageClient {
    databases: Mutex<HashMap<String, Arc<Database>>>,
}

impl StorageClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The database with the given name, created empty on first use.
    pub fn database(&self, name: &str) -> Arc<Database> {
        let mut databases = self.databases.lock();
        if let Some(database) = databases.get(name) {
            return database.clone();
        }
        let database = Arc::new(Database::new(name.to_owned()));
        databases.insert(name.to_owned(), database.clone());
        database
    }

    /// Drop a database and everything in it.
    ///
    /// Handles held by callers keep working against the dropped storage but
    /// are no longer reachable under the name.
    pub fn drop_database(&self, name: &str) {
        self.databases.lock().remove(name);
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.lock().keys().cloned().collect()
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_are_write_once() {
        let client = StorageClient::new();
        let db = client.database("TEST;a;b");
        let first = db.collection("Sample");
        let second = db.collection("Sample");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn drop_database_removes_the_name() {
        let client = StorageClient::new();
        let db = client.database("TEST;a;b");
        db.collection("Sample");
        assert_eq!(client.database_names(), vec!["TEST;a;b".to_owned()]);

        client.drop_database("TEST;a;b");
        assert!(client.database_names().is_empty());

        // A fresh database under the same name starts empty.
        let db = client.database("TEST;a;b");
        assert!(db.collection_names().is_empty());
    }
}
