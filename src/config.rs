use std::path::PathBuf;

pub const DEFAULT_MAX_TOKENS: usize = 1000;

/// Runtime settings, read from the environment (and an optional `.env`).
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub api_key: String,
    pub base_url: String,
    pub user: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
    pub db_path: PathBuf,
    pub docs_dir: PathBuf,
    pub timeout_secs: u64,
    pub max_tokens: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            user: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            db_path: PathBuf::from("main.db"),
            docs_dir: PathBuf::from("./animals"),
            timeout_secs: 60,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl RagConfig {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset, empty, or
    /// unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(key) = get("OPENAI_APIKEY").or_else(|| get("OPENAI_API_KEY")) {
            config.api_key = key;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        config.user = get("OPENAI_USER");
        if let Some(model) = get("RAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(model) = get("RAG_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(path) = get("RAG_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = get("RAG_DOCS_DIR") {
            config.docs_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("RAG_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.timeout_secs = secs;
        }
        if let Some(max) = get("RAG_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            config.max_tokens = max;
        }

        config
    }
}
