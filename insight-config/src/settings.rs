//! API credentials kept in the key-value store.
use crate::store::KeyValueStore;
use insight_common::Result;
use std::fmt;

pub const TWITTER_API_KEY: &str = "twitterApiKey";
pub const OPENAI_API_KEY: &str = "openaiApiKey";
pub const APIFY_TOKEN: &str = "apifyToken";

/// Blank values count as unset.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub twitter_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub apify_token: Option<String>,
}

fn read(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>> {
    Ok(store
        .get(key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn write(store: &dyn KeyValueStore, key: &str, value: Option<&str>) -> Result<()> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => store.set(key, v),
        None => store.remove(key),
    }
}

impl Credentials {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(Self {
            twitter_api_key: read(store, TWITTER_API_KEY)?,
            openai_api_key: read(store, OPENAI_API_KEY)?,
            apify_token: read(store, APIFY_TOKEN)?,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        write(store, TWITTER_API_KEY, self.twitter_api_key.as_deref())?;
        write(store, OPENAI_API_KEY, self.openai_api_key.as_deref())?;
        write(store, APIFY_TOKEN, self.apify_token.as_deref())?;
        tracing::info!(
            twitter = self.twitter_api_key.is_some(),
            openai = self.openai_api_key.is_some(),
            apify = self.apify_token.is_some(),
            "settings.saved"
        );
        Ok(())
    }

    pub fn clear(store: &dyn KeyValueStore) -> Result<()> {
        for key in [TWITTER_API_KEY, OPENAI_API_KEY, APIFY_TOKEN] {
            store.remove(key)?;
        }
        tracing::info!("settings.cleared");
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.as_deref().map(mask_secret);
        f.debug_struct("Credentials")
            .field("twitter_api_key", &show(&self.twitter_api_key))
            .field("openai_api_key", &show(&self.openai_api_key))
            .field("apify_token", &show(&self.apify_token))
            .finish()
    }
}

/// `abcd***wxyz` for long keys; short keys are hidden entirely.
pub fn mask_secret(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn blank_values_are_unset() {
        let store = MemoryStore::new();
        store.set(TWITTER_API_KEY, "   ").unwrap();
        store.set(OPENAI_API_KEY, " sk-live ").unwrap();
        let creds = Credentials::load(&store).unwrap();
        assert_eq!(creds.twitter_api_key, None);
        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-live"));
    }

    #[test]
    fn save_then_clear() {
        let store = MemoryStore::new();
        let creds = Credentials {
            twitter_api_key: Some("tw".into()),
            openai_api_key: None,
            apify_token: Some("apify_api_xyz".into()),
        };
        creds.save(&store).unwrap();
        assert_eq!(Credentials::load(&store).unwrap(), creds);

        Credentials::clear(&store).unwrap();
        assert_eq!(Credentials::load(&store).unwrap(), Credentials::default());
    }

    #[test]
    fn masking() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1***abcd");
    }

    #[test]
    fn debug_never_prints_secrets() {
        let creds = Credentials {
            twitter_api_key: Some("twitter-secret-value".into()),
            ..Default::default()
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("twitter-secret-value"));
        assert!(dbg.contains("twit***alue"));
    }
}
