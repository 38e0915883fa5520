//! Durable account records.
//!
//! Layout under the data directory:
//! - `accounts.json`: login identity to account id index
//! - `saves/<id>.json`: one [`Account`] with all of its characters
//!
//! Every read-modify-write of an account runs under that account's async
//! mutex, so a timer completion and a live handler never interleave their
//! writes to the same record.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use super::record::Character;
use crate::net::MAX_CHARACTERS;

pub type AccountId = u32;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),
    #[error("account {account} has no character {name:?}")]
    UnknownCharacter { account: AccountId, name: String },
    #[error("character name {0:?} is already used")]
    NameTaken(String),
    #[error("account {0} has no free character slot")]
    AccountFull(AccountId),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownAccount(_) | Self::UnknownCharacter { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: AccountId,
    pub email: String,
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl Account {
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountIndex {
    next_id: AccountId,
    accounts: BTreeMap<String, AccountId>,
    /// Rebuilt from the saves on open.
    #[serde(skip)]
    names: HashMap<String, AccountId>,
}

type AccountCell = Arc<AsyncMutex<Option<Account>>>;

pub struct AccountStore {
    root: PathBuf,
    index: AsyncMutex<AccountIndex>,
    cells: Mutex<HashMap<AccountId, AccountCell>>,
}

fn normalize_identity(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Character names are unique across all accounts, ignoring case.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

impl AccountStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let saves = root.join("saves");
        std::fs::create_dir_all(&saves).map_err(|source| StoreError::Io {
            path: saves.clone(),
            source,
        })?;

        let index_path = root.join("accounts.json");
        let mut index: AccountIndex = match std::fs::read(&index_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                path: index_path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AccountIndex::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: index_path,
                    source,
                });
            }
        };
        for &user_id in index.accounts.values() {
            let path = saves.join(format!("{user_id}.json"));
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Io { path, source }),
            };
            let account: Account = serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Json { path, source })?;
            for c in &account.characters {
                index.names.insert(normalize_name(&c.name), user_id);
            }
        }
        log::info!(
            "account store at {} ({} accounts, {} characters)",
            root.display(),
            index.accounts.len(),
            index.names.len()
        );

        Ok(Self {
            root,
            index: AsyncMutex::new(index),
            cells: Mutex::new(HashMap::new()),
        })
    }

    fn save_path(&self, user_id: AccountId) -> PathBuf {
        self.root.join("saves").join(format!("{user_id}.json"))
    }

    fn cell(&self, user_id: AccountId) -> AccountCell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(user_id).or_default())
    }

    async fn load(&self, user_id: AccountId) -> Result<Account, StoreError> {
        let path = self.save_path(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::UnknownAccount(user_id))
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Lock one account, load it on first use, and run `f` against it. The
    /// record is written back only when `f` succeeds and asks for it.
    async fn with_account<T, E>(
        &self,
        user_id: AccountId,
        f: impl FnOnce(&mut Account) -> Result<(T, bool), E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let cell = self.cell(user_id);
        let mut guard = cell.lock().await;
        if guard.is_none() {
            *guard = Some(self.load(user_id).await?);
        }
        let Some(account) = guard.as_mut() else {
            return Err(StoreError::UnknownAccount(user_id).into());
        };

        let mut draft = account.clone();
        let (value, dirty) = f(&mut draft)?;
        if dirty {
            write_json(&self.save_path(user_id), &draft).await?;
            *account = draft;
        }
        Ok(value)
    }

    /// Resolve a login identity, creating an empty account on first sight.
    pub async fn login(&self, email: &str) -> Result<AccountId, StoreError> {
        let identity = normalize_identity(email);
        let mut index = self.index.lock().await;
        if let Some(&id) = index.accounts.get(&identity) {
            return Ok(id);
        }

        index.next_id += 1;
        let user_id = index.next_id;
        let account = Account {
            user_id,
            email: identity.clone(),
            characters: Vec::new(),
        };
        write_json(&self.save_path(user_id), &account).await?;
        index.accounts.insert(identity, user_id);
        write_json(&self.root.join("accounts.json"), &*index).await?;
        log::info!("created account {}", user_id);
        Ok(user_id)
    }

    pub async fn account_ids(&self) -> Vec<AccountId> {
        self.index.lock().await.accounts.values().copied().collect()
    }

    pub async fn characters(&self, user_id: AccountId) -> Result<Vec<Character>, StoreError> {
        self.with_account(user_id, |a| Ok((a.characters.clone(), false)))
            .await
    }

    pub async fn character(
        &self,
        user_id: AccountId,
        name: &str,
    ) -> Result<Character, StoreError> {
        self.with_account(user_id, |a| {
            let c = a
                .character(name)
                .cloned()
                .ok_or_else(|| StoreError::UnknownCharacter {
                    account: user_id,
                    name: name.to_string(),
                })?;
            Ok((c, false))
        })
        .await
    }

    pub async fn create_character(
        &self,
        user_id: AccountId,
        character: Character,
    ) -> Result<(), StoreError> {
        // Held across the account write so two accounts cannot claim the
        // same name at once.
        let mut index = self.index.lock().await;
        let key = normalize_name(&character.name);
        if index.names.contains_key(&key) {
            return Err(StoreError::NameTaken(character.name));
        }
        self.with_account(user_id, |a| {
            if a.characters.len() >= MAX_CHARACTERS as usize {
                return Err(StoreError::AccountFull(user_id));
            }
            a.characters.push(character);
            Ok(((), true))
        })
        .await?;
        index.names.insert(key, user_id);
        Ok(())
    }

    /// Serialized read-modify-write of one character. If `f` fails the stored
    /// record is left exactly as it was.
    pub async fn update_character<T, E>(
        &self,
        user_id: AccountId,
        name: &str,
        f: impl FnOnce(&mut Character) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.with_account(user_id, |a| {
            let c = a
                .characters
                .iter_mut()
                .find(|c| c.name == name)
                .ok_or_else(|| StoreError::UnknownCharacter {
                    account: user_id,
                    name: name.to_string(),
                })?;
            Ok((f(c)?, true))
        })
        .await
    }

    /// Apply `f` to every character of an account and persist once.
    pub async fn update_all<T>(
        &self,
        user_id: AccountId,
        mut f: impl FnMut(&mut Character) -> T,
    ) -> Result<Vec<(String, T)>, StoreError> {
        self.with_account(user_id, |a| {
            let out = a
                .characters
                .iter_mut()
                .map(|c| (c.name.clone(), f(c)))
                .collect();
            Ok((out, true))
        })
        .await
    }
}
