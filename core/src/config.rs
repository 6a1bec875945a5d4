use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CatalogConfig {
    /// JSON file holding items together with their precomputed embeddings.
    pub cache_path: String,
    /// JSON file holding the raw items (name, tags, description).
    pub source_path: String,
    /// Number of embedding requests issued together while refreshing the cache.
    pub batch_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_path: "data/suggestions-with-embeddings.json".to_string(),
            source_path: "data/suggestions.json".to_string(),
            batch_size: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable carrying the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Dimensionality used by the offline deterministic embedder.
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            dims: 1536,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Acceptance threshold per depth; the last entry applies to every deeper level.
    pub thresholds: Vec<f64>,
    pub max_links_per_node: usize,
    pub max_levels: u8,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.7, 0.65, 0.6],
            max_links_per_node: 3,
            max_levels: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
}

impl AppConfig {
    /// Layers built-in defaults, `{dir}/default`, `{dir}/{RUN_MODE}` and
    /// `SIMGRAPH__SECTION__KEY` environment variables, in that order.
    /// `SIMGRAPH__BUILDER__THRESHOLDS` takes a comma-separated list.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let dir = dir.as_ref();

        let builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(
                File::with_name(&dir.join(&run_mode).to_string_lossy()).required(false),
            )
            .add_source(
                Environment::with_prefix("SIMGRAPH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("builder.thresholds")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
