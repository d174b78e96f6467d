//! Local persisted state.
//!
//! The browser-storage collaborator of the original product: the auth
//! session, the storefront shopping cart, and the storefront's
//! locally-simulated records. Everything is stored as string-keyed JSON
//! documents behind the [`LocalStore`] trait so tests run against
//! [`MemoryStore`] while applications persist through [`JsonFileStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::model::{Prescription, User};

const TOKEN_KEY: &str = "auth.token";
const PROFILE_KEY: &str = "auth.profile";
const CART_KEY: &str = "cart.lines";
const LOCAL_PRESCRIPTIONS_KEY: &str = "local.prescriptions";
const LOCAL_USERS_KEY: &str = "local.users";

/// String-keyed JSON document storage.
pub trait LocalStore: Send + Sync {
    /// Reads the document stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, replacing any previous document.
    fn set(&self, key: &str, value: Value);

    /// Removes the document stored under `key`.
    fn remove(&self, key: &str);
}

/// Volatile in-memory store, the default for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// File-backed store: a single JSON object, written through on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing contents if present.
    ///
    /// A missing or unreadable file starts the store empty; it will be
    /// created on the first write.
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn save(&self, entries: &HashMap<String, Value>) {
        match serde_json::to_string_pretty(entries) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.path, text) {
                    warn!(path = %self.path.display(), error = %e, "failed to persist local store");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize local store"),
        }
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
            self.save(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
            self.save(&entries);
        }
    }
}

fn read_typed<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    store
        .get(key)
        .and_then(|value| serde_json::from_value(value).ok())
}

fn write_typed<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(value) => store.set(key, value),
        Err(e) => warn!(key, error = %e, "failed to serialize local document"),
    }
}

/// The authenticated session: bearer token and user profile.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn LocalStore>,
}

impl Session {
    /// Creates a session backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// The persisted bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        read_typed(self.store.as_ref(), TOKEN_KEY)
    }

    /// Persists the bearer token.
    pub fn set_token(&self, token: impl Into<String>) {
        write_typed(self.store.as_ref(), TOKEN_KEY, &token.into());
    }

    /// The persisted user profile, if any.
    #[must_use]
    pub fn profile(&self) -> Option<User> {
        read_typed(self.store.as_ref(), PROFILE_KEY)
    }

    /// Persists the user profile.
    pub fn set_profile(&self, profile: &User) {
        write_typed(self.store.as_ref(), PROFILE_KEY, profile);
    }

    /// Returns `true` if a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Removes token and profile. Invoked by the transport on a 401 response.
    pub fn clear(&self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(PROFILE_KEY);
    }
}

/// One line of the storefront cart.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartLine {
    pub product: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// The storefront shopping cart.
#[derive(Clone)]
pub struct Cart {
    store: Arc<dyn LocalStore>,
}

impl Cart {
    /// Creates a cart backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Current cart lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        read_typed(self.store.as_ref(), CART_KEY).unwrap_or_default()
    }

    fn save(&self, lines: &[CartLine]) {
        write_typed(self.store.as_ref(), CART_KEY, &lines);
    }

    /// Adds `quantity` of a product, merging with an existing line.
    pub fn add(&self, product: i64, name: impl Into<String>, quantity: u32, unit_price: f64) {
        let mut lines = self.lines();
        if let Some(line) = lines.iter_mut().find(|line| line.product == product) {
            line.quantity += quantity;
        } else {
            lines.push(CartLine {
                product,
                name: name.into(),
                quantity,
                unit_price,
            });
        }
        self.save(&lines);
    }

    /// Sets the quantity of a product's line; zero removes the line.
    pub fn set_quantity(&self, product: i64, quantity: u32) {
        let mut lines = self.lines();
        if quantity == 0 {
            lines.retain(|line| line.product != product);
        } else if let Some(line) = lines.iter_mut().find(|line| line.product == product) {
            line.quantity = quantity;
        }
        self.save(&lines);
    }

    /// Removes a product's line.
    pub fn remove(&self, product: i64) {
        self.set_quantity(product, 0);
    }

    /// Sum over lines of `quantity * unit_price`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.lines()
            .iter()
            .map(|line| f64::from(line.quantity) * line.unit_price)
            .sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines().iter().map(|line| line.quantity).sum()
    }

    /// Empties the cart.
    pub fn clear(&self) {
        self.store.remove(CART_KEY);
    }
}

/// Locally-simulated storefront records: prescriptions and registered users
/// that never reach the server.
#[derive(Clone)]
pub struct LocalRecords {
    store: Arc<dyn LocalStore>,
}

impl LocalRecords {
    /// Creates local records backed by the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Stored prescriptions, newest last.
    #[must_use]
    pub fn prescriptions(&self) -> Vec<Prescription> {
        read_typed(self.store.as_ref(), LOCAL_PRESCRIPTIONS_KEY).unwrap_or_default()
    }

    /// Appends a prescription record.
    pub fn add_prescription(&self, prescription: Prescription) {
        let mut all = self.prescriptions();
        all.push(prescription);
        write_typed(self.store.as_ref(), LOCAL_PRESCRIPTIONS_KEY, &all);
    }

    /// Stored registered users, newest last.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        read_typed(self.store.as_ref(), LOCAL_USERS_KEY).unwrap_or_default()
    }

    /// Appends a registered-user record.
    pub fn add_user(&self, user: User) {
        let mut all = self.users();
        all.push(user);
        write_typed(self.store.as_ref(), LOCAL_USERS_KEY, &all);
    }
}
