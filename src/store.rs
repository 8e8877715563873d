use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::StorageError;
use crate::storage::BlobStorage;
use crate::types::{NewUser, UserData};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 13;

/// Submission records kept as one JSON array inside a single blob.
pub struct UserStore<S: BlobStorage> {
    storage: S,
    max_age: Duration,
}

impl<S: BlobStorage> UserStore<S> {
    pub fn new(storage: S, max_age: Duration) -> Self {
        Self { storage, max_age }
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All records in insertion order.
    ///
    /// Never fails: an unreadable blob counts as no records, and a record
    /// that cannot be decoded is dropped.
    pub fn list_all(&self) -> Vec<UserData> {
        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read stored users, treating as empty: {}", e);
                return Vec::new();
            }
        };

        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Stored users are not a JSON array, treating as empty: {}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<UserData>(entry) {
                Ok(user) if !user.id.is_empty() => Some(user),
                Ok(_) => {
                    warn!("Skipping stored user #{} without an id", index);
                    None
                }
                Err(e) => {
                    warn!("Skipping unreadable stored user #{}: {}", index, e);
                    None
                }
            })
            .collect()
    }

    /// Appends a submission and writes the whole collection back.
    pub fn add_user(&self, new_user: NewUser) -> Result<UserData, StorageError> {
        let mut users = self.list_all();

        let id = loop {
            let candidate = generate_id();
            if !users.iter().any(|u| u.id == candidate) {
                break candidate;
            }
            debug!("Generated id {} already taken, retrying", candidate);
        };

        let user = UserData {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            timestamp: Utc::now(),
            device_data: new_user.device_data,
        };

        users.push(user.clone());

        let encoded = serde_json::to_string(&users)?;
        if let Err(e) = self.storage.write(&encoded, self.max_age) {
            error!("Failed to persist users: {}", e);
            return Err(e);
        }

        info!("Stored user {} ({} total)", user.id, users.len());
        Ok(user)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.clear()?;
        info!("Cleared all stored users");
        Ok(())
    }
}

fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
