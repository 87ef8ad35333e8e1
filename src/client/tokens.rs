use crate::client::types::TokenPair;
use anyhow::{Context, Result};
use tracing::debug;

const SESSION_KEY: &str = "session";

/// Client-persistent storage for the bearer token pair
pub struct TokenStore {
    db: sled::Db,
    tokens: sled::Tree,
}

impl TokenStore {
    pub fn open(db_path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create token store directory: {}", parent.display()))?;
        }

        let db = sled::open(db_path)
            .with_context(|| format!("Failed to open sled database at: {}", db_path))?;

        let tokens = db.open_tree("auth_tokens").context("Failed to open auth_tokens tree")?;

        Ok(TokenStore { db, tokens })
    }

    /// In-memory store, nothing is written to disk
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("Failed to open temporary sled database")?;
        let tokens = db.open_tree("auth_tokens").context("Failed to open auth_tokens tree")?;
        Ok(TokenStore { db, tokens })
    }

    pub fn load(&self) -> Result<Option<TokenPair>> {
        match self.tokens.get(SESSION_KEY)? {
            Some(value) => {
                let pair: TokenPair =
                    bincode::deserialize(&value).context("Failed to deserialize token pair")?;
                Ok(Some(pair))
            }
            None => Ok(None),
        }
    }

    pub fn save(&self, pair: &TokenPair) -> Result<()> {
        let value = bincode::serialize(pair).context("Failed to serialize token pair")?;

        self.tokens
            .insert(SESSION_KEY, value)
            .context("Failed to store token pair")?;
        self.db.flush().context("Failed to flush token store")?;

        debug!("Token pair stored");
        Ok(())
    }

    /// Replace the access token, keeping the stored refresh token
    pub fn update_access(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let current = self
            .load()?
            .ok_or_else(|| anyhow::anyhow!("No token pair stored"))?;

        self.save(&TokenPair {
            access: access.to_string(),
            refresh: refresh.map(str::to_string).unwrap_or(current.refresh),
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.tokens
            .remove(SESSION_KEY)
            .context("Failed to remove token pair")?;
        self.db.flush().context("Failed to flush token store")?;

        debug!("Token pair cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, TokenStore) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tokens.db");
        let store = TokenStore::open(db_path.to_str().unwrap()).unwrap();
        (temp_dir, store)
    }

    fn pair() -> TokenPair {
        TokenPair {
            access: "access-1".to_string(),
            refresh: "refresh-1".to_string(),
        }
    }

    #[test]
    fn test_empty_store_has_no_tokens() {
        let (_temp_dir, store) = create_test_store();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_tokens_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tokens.db");

        {
            let store = TokenStore::open(db_path.to_str().unwrap()).unwrap();
            store.save(&pair()).unwrap();
        }

        let store = TokenStore::open(db_path.to_str().unwrap()).unwrap();
        assert_eq!(store.load().unwrap(), Some(pair()));
    }

    #[test]
    fn test_update_access_keeps_refresh_token() {
        let (_temp_dir, store) = create_test_store();
        store.save(&pair()).unwrap();

        store.update_access("access-2", None).unwrap();

        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.access, "access-2");
        assert_eq!(stored.refresh, "refresh-1");
    }

    #[test]
    fn test_update_access_without_session_fails() {
        let (_temp_dir, store) = create_test_store();
        assert!(store.update_access("access-2", None).is_err());
    }

    #[test]
    fn test_clear_removes_tokens() {
        let (_temp_dir, store) = create_test_store();
        store.save(&pair()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
