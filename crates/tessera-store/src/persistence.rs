//! Loading a saved session at startup and saving every change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_protocol::UserIdentity;
use tessera_session::{SessionManager, SessionState};
use tessera_transport::AuthTransport;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{KeyValueStore, StoreError};

pub const KEY_TOKEN: &str = "auth.token";
pub const KEY_REFRESH_TOKEN: &str = "auth.refreshToken";
pub const KEY_EXPIRES_AT: &str = "auth.expiresAt";
pub const KEY_ROLES: &str = "auth.roles";
pub const KEY_USER: &str = "auth.user";

/// Every key the session is stored under.
pub const SESSION_KEYS: [&str; 5] = [
    KEY_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_EXPIRES_AT,
    KEY_ROLES,
    KEY_USER,
];

/// Reads and writes a [`SessionState`] through a [`KeyValueStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the saved session.
    ///
    /// Fields that fail to parse are removed from the store and read as
    /// empty. Without an access token the result is the empty (logged-out)
    /// state, whatever else is stored. `is_loading` is always `false`.
    ///
    /// # Errors
    /// Only if the store itself fails; corrupted values are not errors.
    pub fn load(&self) -> Result<SessionState, StoreError> {
        let Some(access_token) = self.field(KEY_TOKEN, parse_token)? else {
            debug!("no saved session");
            return Ok(SessionState::default());
        };

        let refresh_token = self.field(KEY_REFRESH_TOKEN, parse_token)?;
        let expires_at = self.field(KEY_EXPIRES_AT, parse_timestamp)?;
        let roles = self.field(KEY_ROLES, parse_roles)?.unwrap_or_default();
        let user = self.field(KEY_USER, parse_user)?;

        debug!(
            has_refresh_token = refresh_token.is_some(),
            expires_at = ?expires_at,
            roles = roles.len(),
            "saved session loaded"
        );
        Ok(SessionState {
            access_token: Some(access_token),
            refresh_token,
            expires_at,
            roles,
            user,
            is_loading: false,
        })
    }

    /// Writes `state` to the store. A logged-out state removes every key.
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if !state.is_logged_in() {
            for key in SESSION_KEYS {
                self.store.remove(key)?;
            }
            return Ok(());
        }

        self.put(KEY_TOKEN, state.access_token.clone())?;
        self.put(KEY_REFRESH_TOKEN, state.refresh_token.clone())?;
        self.put(KEY_EXPIRES_AT, state.expires_at.map(|t| t.to_rfc3339()))?;
        self.put(KEY_ROLES, Some(serde_json::to_string(&state.roles)?))?;
        let user = state.user.as_ref().map(serde_json::to_string).transpose()?;
        self.put(KEY_USER, user)?;
        Ok(())
    }

    /// Saves every change `manager` makes, until the manager is dropped.
    ///
    /// Changes that only flip `is_loading` are skipped. A failed write is
    /// logged and the next change is written as usual. Stores block, so
    /// each save runs on Tokio's blocking pool.
    pub fn attach<T: AuthTransport>(&self, manager: &SessionManager<T>) -> JoinHandle<()> {
        let mut changes = manager.subscribe();
        let persistence = self.clone();

        tokio::spawn(async move {
            let mut last_saved = changes.borrow_and_update().clone().normalized();
            while changes.changed().await.is_ok() {
                let state = changes.borrow_and_update().clone().normalized();
                if state == last_saved {
                    continue;
                }
                let saving = {
                    let persistence = persistence.clone();
                    let state = state.clone();
                    tokio::task::spawn_blocking(move || persistence.save(&state))
                };
                match saving.await {
                    Ok(Ok(())) => {
                        debug!(logged_in = state.is_logged_in(), "session saved");
                        last_saved = state;
                    }
                    Ok(Err(err)) => warn!(error = %err, "failed to save session"),
                    Err(err) => warn!(error = %err, "session save task died"),
                }
            }
            debug!("session manager dropped, persistence stopped");
        })
    }

    /// Reads one key. A value `parse` rejects is removed and reads as
    /// `None`.
    fn field<V>(
        &self,
        key: &str,
        parse: fn(&str) -> Result<V, String>,
    ) -> Result<Option<V>, StoreError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match parse(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(reason) => {
                let err = StoreError::Corrupted {
                    key: key.to_owned(),
                    reason,
                };
                warn!(error = %err, "discarding corrupted session field");
                self.store.remove(key)?;
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, value: Option<String>) -> Result<(), StoreError> {
        match value {
            Some(value) => self.store.set(key, &value),
            None => self.store.remove(key),
        }
    }
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence").finish_non_exhaustive()
    }
}

fn parse_token(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("empty token".into());
    }
    Ok(raw.to_owned())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| err.to_string())
}

fn parse_roles(raw: &str) -> Result<Vec<String>, String> {
    let parsed: Vec<String> = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let mut roles = Vec::with_capacity(parsed.len());
    for role in parsed {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

fn parse_user(raw: &str) -> Result<UserIdentity, String> {
    serde_json::from_str(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::MemoryStore;

    fn store_with(entries: &[(&str, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (key, value) in entries {
            store.set(key, value).unwrap();
        }
        store
    }

    fn logged_in() -> SessionState {
        SessionState {
            access_token: Some("T1".into()),
            refresh_token: Some("R1".into()),
            expires_at: Some("2026-10-18T12:00:00Z".parse().unwrap()),
            roles: vec!["Proprietario".into()],
            user: Some(UserIdentity {
                id: "123".into(),
                user_name: "u".into(),
                email: "u@x.com".into(),
                display_name: "U".into(),
            }),
            is_loading: false,
        }
    }

    // =====================================================================
    // load
    // =====================================================================

    #[test]
    fn test_load_empty_store_is_logged_out() {
        let persistence = SessionPersistence::new(Arc::new(MemoryStore::new()));
        assert_eq!(persistence.load().unwrap(), SessionState::default());
    }

    #[test]
    fn test_load_reads_saved_fields() {
        let store = store_with(&[
            (KEY_TOKEN, "T1"),
            (KEY_REFRESH_TOKEN, "R1"),
            (KEY_EXPIRES_AT, "2026-10-18T12:00:00Z"),
            (KEY_ROLES, r#"["Proprietario"]"#),
            (
                KEY_USER,
                r#"{"id":"123","userName":"u","email":"u@x.com","displayName":"U"}"#,
            ),
        ]);
        let persistence = SessionPersistence::new(store);

        assert_eq!(persistence.load().unwrap(), logged_in());
    }

    #[test]
    fn test_load_without_access_token_ignores_other_keys() {
        let store = store_with(&[(KEY_REFRESH_TOKEN, "R1"), (KEY_ROLES, r#"["Proprietario"]"#)]);
        let persistence = SessionPersistence::new(store);

        assert_eq!(persistence.load().unwrap(), SessionState::default());
    }

    #[test]
    fn test_load_corrupted_roles_resets_to_empty_and_removes_key() {
        let store = store_with(&[(KEY_TOKEN, "T1"), (KEY_ROLES, "Proprietario,Gerente")]);
        let persistence = SessionPersistence::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);

        let state = persistence.load().unwrap();

        assert_eq!(state.access_token.as_deref(), Some("T1"));
        assert!(state.roles.is_empty());
        assert_eq!(store.get(KEY_ROLES).unwrap(), None, "raw value discarded");
    }

    #[test]
    fn test_load_corrupted_expiry_reads_as_absent() {
        let store = store_with(&[(KEY_TOKEN, "T1"), (KEY_EXPIRES_AT, "tomorrow")]);
        let persistence = SessionPersistence::new(store);

        assert_eq!(persistence.load().unwrap().expires_at, None);
    }

    #[test]
    fn test_load_empty_access_token_is_logged_out() {
        let store = store_with(&[(KEY_TOKEN, "  "), (KEY_REFRESH_TOKEN, "R1")]);
        let persistence = SessionPersistence::new(store);

        assert_eq!(persistence.load().unwrap(), SessionState::default());
    }

    #[test]
    fn test_load_dedups_roles() {
        let store = store_with(&[(KEY_TOKEN, "T1"), (KEY_ROLES, r#"["A","B","A"]"#)]);
        let persistence = SessionPersistence::new(store);

        assert_eq!(persistence.load().unwrap().roles, vec!["A", "B"]);
    }

    // =====================================================================
    // save
    // =====================================================================

    #[test]
    fn test_save_then_load_returns_same_state() {
        let persistence = SessionPersistence::new(Arc::new(MemoryStore::new()));
        persistence.save(&logged_in()).unwrap();

        assert_eq!(persistence.load().unwrap(), logged_in());
    }

    #[test]
    fn test_save_logged_out_removes_every_key() {
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        persistence.save(&logged_in()).unwrap();
        assert_eq!(store.len(), SESSION_KEYS.len());

        persistence.save(&SessionState::default()).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_save_missing_optional_fields_removes_their_keys() {
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        persistence.save(&logged_in()).unwrap();

        let partial = SessionState {
            user: None,
            expires_at: None,
            ..logged_in()
        };
        persistence.save(&partial).unwrap();

        assert_eq!(store.get(KEY_USER).unwrap(), None);
        assert_eq!(store.get(KEY_EXPIRES_AT).unwrap(), None);
        assert_eq!(store.get(KEY_TOKEN).unwrap().as_deref(), Some("T1"));
    }

    #[test]
    fn test_save_writes_expected_formats() {
        let store = Arc::new(MemoryStore::new());
        let persistence = SessionPersistence::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        persistence.save(&logged_in()).unwrap();

        assert_eq!(store.get(KEY_TOKEN).unwrap().as_deref(), Some("T1"));
        assert_eq!(
            store.get(KEY_ROLES).unwrap().as_deref(),
            Some(r#"["Proprietario"]"#)
        );
        let expires = store.get(KEY_EXPIRES_AT).unwrap().unwrap();
        assert!(expires.starts_with("2026-10-18T12:00:00"), "{expires}");
        assert!(store.get(KEY_USER).unwrap().unwrap().contains(r#""userName":"u""#));
    }
}
