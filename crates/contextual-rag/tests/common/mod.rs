//! Shared fixtures: deterministic fake model providers and a tiny PDF writer

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use contextual_rag::config::RagConfig;
use contextual_rag::providers::{EmbeddingProvider, LlmProvider, ModelProviders};
use contextual_rag::storage::SqliteVectorStore;
use contextual_rag::{Error, RagPipeline, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use uuid::Uuid;

pub const ANNOTATION: &str = "This chunk is part of a short document about European geography.";
pub const ANSWER: &str = "The capital of France is Paris.";
pub const FRANCE: &str = "The capital of France is Paris.";
pub const GERMANY: &str = "The capital of Germany is Berlin.";

/// Bag-of-words embedder: every lowercase word is hashed into one of
/// `dims` buckets and the vector is L2-normalized.
pub struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            v[(hash % self.dims as u64) as usize] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Chat model with canned replies whose failures can be switched on per test
#[derive(Default)]
pub struct ScriptedLlm {
    calls: AtomicUsize,
    structured_calls: AtomicUsize,
    /// Annotation fails for chunks containing this text ("" matches all)
    fail_annotation_on: Mutex<Option<String>>,
    empty_annotations: Mutex<bool>,
    fail_answers: Mutex<bool>,
    healthy: Mutex<Option<bool>>,
    /// When set, annotations wait for a permit
    gate: Mutex<Option<Arc<Semaphore>>>,
    held: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.structured_calls.store(0, Ordering::SeqCst);
    }

    pub fn fail_annotation_on(&self, needle: Option<&str>) {
        *self.fail_annotation_on.lock() = needle.map(str::to_string);
    }

    pub fn return_empty_annotations(&self, empty: bool) {
        *self.empty_annotations.lock() = empty;
    }

    pub fn fail_answers(&self, fail: bool) {
        *self.fail_answers.lock() = fail;
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = Some(healthy);
    }

    /// Make annotation calls block until [`ScriptedLlm::release_annotations`]
    pub fn hold_annotations(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_annotations(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Annotation calls currently blocked or released from the gate
    pub fn held_annotations(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }
}

/// The text between the `<chunk>` tags of an annotation prompt
fn chunk_of(prompt: &str) -> Option<&str> {
    let start = prompt.find("<chunk>")? + "<chunk>".len();
    let end = prompt[start..].find("</chunk>")? + start;
    Some(prompt[start..end].trim())
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(chunk) = chunk_of(prompt) {
            let gate = self.gate.lock().clone();
            if let Some(gate) = gate {
                self.held.fetch_add(1, Ordering::SeqCst);
                let _permit = gate.acquire().await;
            }

            if let Some(needle) = self.fail_annotation_on.lock().as_deref() {
                if chunk.contains(needle) {
                    return Err(Error::llm("annotation request timed out"));
                }
            }
            if *self.empty_annotations.lock() {
                return Ok("   ".to_string());
            }
            return Ok(ANNOTATION.to_string());
        }

        if *self.fail_answers.lock() {
            return Err(Error::llm("model unavailable"));
        }
        Ok(format!("  {}  ", ANSWER))
    }

    /// Cites the first context article with a verbatim quote, plus one
    /// citation of an article that was never retrieved.
    async fn generate_structured(
        &self,
        prompt: &str,
        _schema_name: &str,
        _schema: &Value,
    ) -> Result<Value> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);

        let first_id = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Context Article ID: "))
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(json!({
            "citations": [
                {
                    "id": first_id,
                    "source": "hallucinated.pdf",
                    "title": "Hallucinated",
                    "page": 99,
                    "quotes": FRANCE,
                },
                {
                    "id": Uuid::new_v4().to_string(),
                    "source": "nowhere.pdf",
                    "title": "nowhere.pdf",
                    "page": 7,
                    "quotes": "Invented sentence.",
                }
            ]
        }))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy.lock().unwrap_or(true))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// A pipeline over fakes and an in-memory store, with handles to all three
pub struct Harness {
    pub pipeline: RagPipeline,
    pub llm: Arc<ScriptedLlm>,
    pub embedder: Arc<HashEmbedder>,
    pub store: SqliteVectorStore,
}

pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 0;
    config.embeddings.batch_size = 4;
    config
}

pub async fn harness(config: RagConfig) -> Harness {
    let store = SqliteVectorStore::in_memory("test").unwrap();
    harness_with_store(config, store).await
}

pub async fn harness_with_store(config: RagConfig, store: SqliteVectorStore) -> Harness {
    let llm = Arc::new(ScriptedLlm::new());
    let embedder = Arc::new(HashEmbedder::new(256));
    let providers = ModelProviders {
        llm: llm.clone(),
        embedder: embedder.clone(),
    };

    let pipeline = RagPipeline::new(config, providers, Arc::new(store.clone()))
        .await
        .unwrap();

    Harness {
        pipeline,
        llm,
        embedder,
        store,
    }
}

/// Build a PDF with one line of Courier text per page
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// `(filename, bytes)` upload for a generated PDF
pub fn upload(filename: &str, pages: &[&str]) -> (String, bytes::Bytes) {
    (filename.to_string(), bytes::Bytes::from(pdf_with_pages(pages)))
}
