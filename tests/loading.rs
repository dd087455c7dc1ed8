use lottie_engine::lottie_core::{AnimationInstance, CancellationFlag, CompositionError};
use lottie_engine::{
    from_document, from_json_value, load_composition, load_composition_cancellable,
    load_composition_sync, parse_composition_sync, AssetLoader, FileAssetLoader, LoadError,
    LoaderConfig,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct MockLoader {
    files: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MockLoader {
    fn with(path: &str, bytes: Vec<u8>) -> Self {
        MockLoader {
            files: HashMap::from([(path.to_string(), bytes)]),
            calls: AtomicUsize::new(0),
        }
    }
}

impl AssetLoader for MockLoader {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such asset: {path}"))
    }
}

fn document() -> serde_json::Value {
    json!({
        "v": "5.7.0", "fr": 30, "ip": 0, "op": 60, "w": 100, "h": 50,
        "layers": [{
            "ty": 4, "ind": 1, "ip": 0, "op": 60, "ks": {},
            "shapes": [
                { "ty": "rc", "p": { "k": [50, 25] }, "s": { "k": [100, 50] }, "r": { "k": 40 } },
                { "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } }
            ]
        }]
    })
}

fn document_bytes() -> Vec<u8> {
    serde_json::to_vec(&document()).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_strict_load() {
    init_tracing();
    let loader = Arc::new(MockLoader::with("anim.json", document_bytes()));
    let comp = load_composition(loader.clone(), "anim.json", LoaderConfig::default())
        .await
        .unwrap();
    assert_eq!(comp.duration_ms(), 2000.0);
    assert_eq!(comp.layers.len(), 1);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

    let mut instance = AnimationInstance::new(comp);
    assert_eq!(instance.render_tree().layers.len(), 1);
}

#[tokio::test]
async fn test_strict_load_surfaces_missing_file() {
    let loader = Arc::new(MockLoader::with("anim.json", document_bytes()));
    let err = load_composition(loader, "missing.json", LoaderConfig::default())
        .await
        .unwrap_err();
    match err {
        LoadError::Read { path, .. } => assert_eq!(path, "missing.json"),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_strict_load_surfaces_parse_errors() {
    let loader = Arc::new(MockLoader::with("anim.json", b"{ not json".to_vec()));
    let err = load_composition(loader, "anim.json", LoaderConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Composition(CompositionError::Parse(_))));
}

#[tokio::test]
async fn test_cancelled_load_publishes_nothing() {
    let loader = Arc::new(MockLoader::with("anim.json", document_bytes()));
    let flag = CancellationFlag::new();
    flag.cancel();
    let err = load_composition_cancellable(loader, "anim.json", LoaderConfig::default(), flag)
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Composition(CompositionError::Cancelled)));
}

#[tokio::test]
async fn test_scale_applies_to_bounds() {
    let loader = Arc::new(MockLoader::with("anim.json", document_bytes()));
    let comp = load_composition(loader, "anim.json", LoaderConfig { scale: 2.0 })
        .await
        .unwrap();
    let bounds = comp.bounds.unwrap();
    assert_eq!((bounds.width(), bounds.height()), (200.0, 100.0));
}

#[test]
fn test_best_effort_success() {
    let loader = MockLoader::with("anim.json", document_bytes());
    let outcome = load_composition_sync(&loader, "anim.json", LoaderConfig::default());
    assert!(outcome.composition.is_some());
    assert!(outcome.diagnostic.is_none());
}

#[test]
fn test_best_effort_swallows_errors() {
    init_tracing();
    let loader = MockLoader::with("anim.json", document_bytes());
    let outcome = load_composition_sync(&loader, "missing.json", LoaderConfig::default());
    assert!(outcome.composition.is_none());
    assert!(outcome.diagnostic.unwrap().contains("missing.json"));

    let outcome = parse_composition_sync(b"[1, 2", LoaderConfig::default());
    assert!(outcome.composition.is_none());
    assert!(outcome.diagnostic.is_some());
}

#[test]
fn test_from_decoded_document() {
    let doc: lottie_engine::lottie_data::model::LottieJson = serde_json::from_value(document()).unwrap();
    let comp = from_document(&doc, LoaderConfig::default()).unwrap();
    assert_eq!(comp.layers.len(), 1);

    let comp = from_json_value(document(), LoaderConfig::default()).unwrap();
    assert_eq!(comp.frame_rate(), 30.0);

    assert!(from_json_value(json!({ "layers": 5 }), LoaderConfig::default()).is_err());
}

#[test]
fn test_file_loader_reports_path() {
    let err = FileAssetLoader
        .load_bytes("/definitely/not/here.json")
        .unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.json"));
}
