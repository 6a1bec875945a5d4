use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use catalog::{load_sources, CatalogError, CatalogStore, EmbeddingCache};
use embedding::{BoxFuture, DeterministicEmbedder, Embedder, EmbeddingError};
use simgraph_core::model::{Item, ItemSource};

const DIMS: usize = 8;

/// Deterministic embedder that remembers every text it was asked to embed.
#[derive(Default)]
struct RecordingEmbedder {
    inner: DeterministicEmbedder,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    fn new() -> Self {
        Self {
            inner: DeterministicEmbedder::new(DIMS),
            ..Self::default()
        }
    }
}

impl Embedder for RecordingEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f64>, EmbeddingError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        self.inner.embed(text)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

struct RateLimitedEmbedder;

impl Embedder for RateLimitedEmbedder {
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f64>, EmbeddingError>> {
        Box::pin(async {
            Err(EmbeddingError::Status {
                status: 429,
                body: "rate limited".to_string(),
            })
        })
    }

    fn model_id(&self) -> &str {
        "rate-limited"
    }
}

fn source(name: &str, tags: &[&str], description: &str) -> ItemSource {
    ItemSource {
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        description: description.to_string(),
    }
}

fn club_sources() -> Vec<ItemSource> {
    vec![
        source("Chess Club", &["board", "strategy"], "Weekly tournaments"),
        source("Go Club", &["board"], "Nine stones handicap games"),
        source("Shogi Club", &["board", "japan"], "Japanese chess"),
        source("Go Club", &["duplicate"], "Listed twice upstream"),
    ]
}

#[tokio::test]
async fn refresh_embeds_only_missing_names() {
    let cached = Item {
        name: "Chess Club".to_string(),
        tags: vec!["board".to_string()],
        description: "already embedded".to_string(),
        embedding: vec![1.0; DIMS],
    };
    let mut cache = EmbeddingCache::new(vec![cached.clone()]);
    let embedder = Arc::new(RecordingEmbedder::new());

    let added = cache
        .refresh(&club_sources(), embedder.clone(), 5)
        .await
        .expect("refresh");

    assert_eq!(added, 2);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

    let names: Vec<&str> = cache.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Chess Club", "Go Club", "Shogi Club"]);
    assert_eq!(cache.items()[0], cached, "cached entries are left untouched");
    assert!(cache.contains("Shogi Club"));
    assert!(!cache.contains("Tea Club"));

    let mut inputs = embedder.inputs.lock().unwrap().clone();
    inputs.sort();
    assert_eq!(
        inputs,
        vec![
            "Go Club board Nine stones handicap games".to_string(),
            "Shogi Club board japan Japanese chess".to_string(),
        ]
    );
}

#[tokio::test]
async fn refresh_keeps_source_order_across_small_batches() {
    let mut cache = EmbeddingCache::default();
    let embedder = Arc::new(RecordingEmbedder::new());

    let added = cache
        .refresh(&club_sources(), embedder.clone(), 1)
        .await
        .expect("refresh");

    assert_eq!(added, 3);
    let names: Vec<&str> = cache.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Chess Club", "Go Club", "Shogi Club"]);
    assert!(cache.items().iter().all(|i| i.embedding.len() == DIMS));
}

#[tokio::test]
async fn saved_cache_round_trips_and_needs_no_new_embeddings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("suggestions-with-embeddings.json");

    let mut cache = EmbeddingCache::default();
    cache
        .refresh(&club_sources(), Arc::new(RecordingEmbedder::new()), 5)
        .await
        .expect("first refresh");
    cache.save(&path).await.expect("save");

    let mut reloaded = EmbeddingCache::load(&path).await.expect("load");
    assert_eq!(reloaded, cache);

    let embedder = Arc::new(RecordingEmbedder::new());
    let added = reloaded
        .refresh(&club_sources(), embedder.clone(), 5)
        .await
        .expect("second refresh");
    assert_eq!(added, 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    let catalog = reloaded.into_catalog().expect("valid catalog");
    assert_eq!(catalog.dimension(), Some(DIMS));
}

#[tokio::test]
async fn saved_embeddings_reload_bit_for_bit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("suggestions-with-embeddings.json");
    let embedding = vec![-0.19215686274509802, 0.1 + 0.2, 1.0 / 3.0, f64::MIN_POSITIVE];
    let cache = EmbeddingCache::new(vec![Item {
        name: "Chess Club".to_string(),
        tags: vec!["board".to_string()],
        description: "Weekly tournaments".to_string(),
        embedding: embedding.clone(),
    }]);

    cache.save(&path).await.expect("save");
    let reloaded = EmbeddingCache::load(&path).await.expect("load");

    let bits = |values: &[f64]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&reloaded.items()[0].embedding), bits(&embedding));
}

#[tokio::test]
async fn missing_cache_file_loads_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = EmbeddingCache::load(dir.path().join("absent.json"))
        .await
        .expect("load");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn malformed_cache_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"[{"name": "Chess Club", "embedding": "oops"}]"#).unwrap();

    let err = EmbeddingCache::load(&path).await.unwrap_err();
    assert!(matches!(err, CatalogError::Json(_)));
}

#[tokio::test]
async fn provider_failure_names_the_item() {
    let mut cache = EmbeddingCache::default();
    let err = cache
        .refresh(&club_sources()[..1], Arc::new(RateLimitedEmbedder), 5)
        .await
        .unwrap_err();

    match err {
        CatalogError::Embedding { name, source } => {
            assert_eq!(name, "Chess Club");
            assert!(matches!(source, EmbeddingError::Status { status: 429, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(cache.is_empty());
}

#[tokio::test]
async fn sources_file_allows_missing_optional_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("suggestions.json");
    std::fs::write(
        &path,
        r#"[{"name": "Chess Club", "tags": ["board"], "description": "Weekly"}, {"name": "Tea Club"}]"#,
    )
    .unwrap();

    let sources = load_sources(&path).await.expect("load sources");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1], source("Tea Club", &[], ""));
}
