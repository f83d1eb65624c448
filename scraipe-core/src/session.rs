//! Per-session state: saved credentials, cached probe results and the last
//! exported table.
//!
//! Values are addressed through typed keys so every slot has exactly one
//! value type. The initial (process default) credential checks use their own
//! keys, independent of each other and of explicitly saved credentials.

use crate::table::ExportTable;
use crate::types::{Checked, OpenAiCredentials, RedditCredentials};

pub trait SessionKey {
    type Value: Clone;

    fn slot(state: &SessionState) -> &Option<Self::Value>;
    fn slot_mut(state: &mut SessionState) -> &mut Option<Self::Value>;
}

macro_rules! session_key {
    ($(#[$meta:meta])* $key:ident => $field:ident: $value:ty) => {
        $(#[$meta])*
        pub struct $key;

        impl SessionKey for $key {
            type Value = $value;

            fn slot(state: &SessionState) -> &Option<Self::Value> {
                &state.$field
            }

            fn slot_mut(state: &mut SessionState) -> &mut Option<Self::Value> {
                &mut state.$field
            }
        }
    };
}

session_key!(
    /// Probe result for the configured default Reddit credentials.
    InitialRedditValid => initial_reddit_valid: bool
);
session_key!(
    /// Probe result for the configured default OpenAI key.
    InitialOpenAiValid => initial_openai_valid: bool
);
session_key!(SavedReddit => saved_reddit: Checked<RedditCredentials>);
session_key!(SavedOpenAi => saved_openai: Checked<OpenAiCredentials>);
session_key!(LastExport => last_export: ExportTable);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    initial_reddit_valid: Option<bool>,
    initial_openai_valid: Option<bool>,
    saved_reddit: Option<Checked<RedditCredentials>>,
    saved_openai: Option<Checked<OpenAiCredentials>>,
    last_export: Option<ExportTable>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<K: SessionKey>(&self) -> Option<&K::Value> {
        K::slot(self).as_ref()
    }

    /// Returns the stored value, storing `initial` first if the slot is empty.
    pub fn get_or_default<K: SessionKey>(&mut self, initial: K::Value) -> K::Value {
        K::slot_mut(self).get_or_insert(initial).clone()
    }

    pub fn set<K: SessionKey>(&mut self, value: K::Value) {
        *K::slot_mut(self) = Some(value);
    }

    /// Saved credentials if any, otherwise the defaults with their cached
    /// initial check (unchecked defaults count as invalid).
    pub fn resolved_reddit(&self, defaults: &RedditCredentials) -> Checked<RedditCredentials> {
        match self.get::<SavedReddit>() {
            Some(saved) => saved.clone(),
            None => Checked::new(
                defaults.clone(),
                self.get::<InitialRedditValid>().copied().unwrap_or(false),
            ),
        }
    }

    pub fn resolved_openai(&self, defaults: &OpenAiCredentials) -> Checked<OpenAiCredentials> {
        match self.get::<SavedOpenAi>() {
            Some(saved) => saved.clone(),
            None => Checked::new(
                defaults.clone(),
                self.get::<InitialOpenAiValid>().copied().unwrap_or(false),
            ),
        }
    }

    pub fn last_export(&self) -> Option<&ExportTable> {
        self.get::<LastExport>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_default_caches_first_value() {
        let mut session = SessionState::new();
        assert!(session.get::<InitialRedditValid>().is_none());

        assert!(session.get_or_default::<InitialRedditValid>(true));
        // Later defaults do not replace the cached value
        assert!(session.get_or_default::<InitialRedditValid>(false));
        assert_eq!(session.get::<InitialRedditValid>(), Some(&true));
    }

    #[test]
    fn test_initial_checks_are_independent() {
        let mut session = SessionState::new();
        session.set::<InitialRedditValid>(true);
        session.set::<InitialOpenAiValid>(false);

        let reddit = session.resolved_reddit(&RedditCredentials::new("id", "secret"));
        let openai = session.resolved_openai(&OpenAiCredentials::new("sk"));
        assert!(reddit.valid);
        assert!(!openai.valid);
    }

    #[test]
    fn test_saved_credentials_override_defaults() {
        let mut session = SessionState::new();
        session.set::<InitialRedditValid>(false);
        let defaults = RedditCredentials::new("default", "default-secret");

        let saved = Checked::new(RedditCredentials::new("mine", "my-secret"), true);
        session.set::<SavedReddit>(saved.clone());
        assert_eq!(session.resolved_reddit(&defaults), saved);

        // Re-saving replaces, including with an invalid result
        let resaved = Checked::new(RedditCredentials::new("other", "bad"), false);
        session.set::<SavedReddit>(resaved.clone());
        assert_eq!(session.resolved_reddit(&defaults), resaved);
    }

    #[test]
    fn test_unchecked_defaults_are_invalid() {
        let session = SessionState::new();
        let resolved = session.resolved_openai(&OpenAiCredentials::new("sk"));
        assert_eq!(resolved.credentials.api_key, "sk");
        assert!(!resolved.valid);
    }

    #[test]
    fn test_last_export_slot() {
        let mut session = SessionState::new();
        assert!(session.last_export().is_none());
        session.set::<LastExport>(ExportTable::default());
        assert!(session.last_export().unwrap().is_empty());
    }
}
