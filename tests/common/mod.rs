//! In-process providers and a counting store for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use snapdex::adapters::{
    EmbeddingModel, GenerativeModel, ImageHost, Providers, SpeechService, SpeechSession,
};
use snapdex::core::Orchestrator;
use snapdex::domain::{
    Capture, Entry, ImagePayload, Owner, SubmittedJob, VoiceJob, VoiceStatus, VoiceUpdate,
};
use snapdex::store::{DocumentStore, InsertOutcome, SqliteStore, StoreError};

/// Prefix the fake vision model puts before the subject name
pub const SUBJECT_PREFIX: &str = "Subject: ";

/// Credential the failing fakes embed in their error messages
pub const PROVIDER_SECRET: &str = "SECRET-KEY-123";

/// Capture whose payload data is the subject name
pub fn capture_of(subject: &str) -> Capture {
    Capture::new(format!("data:image/png;base64,{}", subject))
}

pub enum VisionReply {
    /// Describe the payload data as the subject
    Echo,
    Text(String),
    Fail,
}

pub enum EntryReply {
    /// JSON entry for the subject named in the description
    Json,
    /// Same JSON, wrapped in a markdown fence
    Fenced,
    Raw(String),
    Fail,
}

pub struct FakeModel {
    pub vision: VisionReply,
    pub entry: EntryReply,
    pub vision_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::with(VisionReply::Echo, EntryReply::Json)
    }

    pub fn with(vision: VisionReply, entry: EntryReply) -> Self {
        Self {
            vision,
            entry,
            vision_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }
}

fn entry_json(object: &str) -> String {
    json!({
        "object": object,
        "species": "Test Species",
        "approximateWeight": "1-2 kg",
        "approximateHeight": "10 cm",
        "weight": 1.5,
        "height": "10 cm",
        "hp": 50,
        "attack": 40,
        "defense": "30",
        "speed": 20,
        "type": "normal"
    })
    .to_string()
}

#[async_trait]
impl GenerativeModel for FakeModel {
    fn name(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str, image: Option<&ImagePayload>) -> Result<String> {
        if let Some(image) = image {
            self.vision_calls.fetch_add(1, Ordering::SeqCst);
            return match &self.vision {
                VisionReply::Echo => Ok(format!("{}{}", SUBJECT_PREFIX, image.data())),
                VisionReply::Text(text) => Ok(text.clone()),
                VisionReply::Fail => anyhow::bail!(
                    "vision model unavailable (503) for url (http://model.test/v1?key={})",
                    PROVIDER_SECRET
                ),
            };
        }

        self.text_calls.fetch_add(1, Ordering::SeqCst);
        let object = prompt
            .rsplit_once(SUBJECT_PREFIX)
            .map(|(_, subject)| subject.trim())
            .unwrap_or("Thing");

        match &self.entry {
            EntryReply::Json => Ok(entry_json(object)),
            EntryReply::Fenced => Ok(format!("```json\n{}\n```", entry_json(object))),
            EntryReply::Raw(text) => Ok(text.clone()),
            EntryReply::Fail => anyhow::bail!(
                "text model unavailable for url (http://model.test/v1?key={})",
                PROVIDER_SECRET
            ),
        }
    }
}

pub struct FakeEmbeddings {
    pub vector: Vec<f32>,
    pub fail: bool,
}

impl FakeEmbeddings {
    pub fn new() -> Self {
        Self {
            vector: vec![0.1, 0.2, 0.3, 0.4],
            fail: false,
        }
    }
}

#[async_trait]
impl EmbeddingModel for FakeEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("embedding quota exceeded for key {}", PROVIDER_SECRET);
        }
        Ok(self.vector.clone())
    }
}

pub struct FakeImageHost {
    pub fail: bool,
    pub uploads: AtomicUsize,
}

impl FakeImageHost {
    pub fn new() -> Self {
        Self {
            fail: false,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageHost for FakeImageHost {
    fn name(&self) -> &str {
        "fake-images"
    }

    async fn upload(&self, _image: &str) -> Result<String> {
        if self.fail {
            anyhow::bail!("upload rejected (401) for api_secret {}", PROVIDER_SECRET);
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://images.test/{}.png", n))
    }

    async fn health_check(&self) -> Result<()> {
        if self.fail {
            anyhow::bail!("ping rejected (401)");
        }
        Ok(())
    }
}

/// Sets the flag if dropped before `done` is set
struct InFlight<'a> {
    cancelled: &'a AtomicBool,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }
}

pub struct FakeSpeech {
    pub login_delay: Duration,
    pub fail_login: bool,
    /// Audio path returned synchronously on submit
    pub audio_path: Option<String>,
    /// What polling reports
    pub poll_status: VoiceStatus,
    pub poll_audio_url: Option<String>,
    pub fail_poll: bool,
    /// Set when an in-flight login is dropped before finishing
    pub cancelled: AtomicBool,
    pub submissions: Mutex<Vec<(String, String)>>,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self {
            login_delay: Duration::ZERO,
            fail_login: false,
            audio_path: None,
            poll_status: VoiceStatus::Pending,
            poll_audio_url: None,
            fail_poll: false,
            cancelled: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Login that never finishes within any test budget
    pub fn hanging() -> Self {
        Self {
            login_delay: Duration::from_secs(60),
            ..Self::new()
        }
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for FakeSpeech {
    fn name(&self) -> &str {
        "fake-speech"
    }

    async fn login(&self) -> Result<SpeechSession> {
        let mut guard = InFlight {
            cancelled: &self.cancelled,
            done: false,
        };
        tokio::time::sleep(self.login_delay).await;
        guard.done = true;

        if self.fail_login {
            anyhow::bail!("login rejected");
        }
        Ok(SpeechSession {
            cookie: "session=test".to_string(),
        })
    }

    async fn submit(
        &self,
        _session: &SpeechSession,
        text: &str,
        idempotency_token: &str,
    ) -> Result<SubmittedJob> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((text.to_string(), idempotency_token.to_string()));
        Ok(SubmittedJob {
            job_token: format!("jinf_{}", submissions.len()),
            audio_path: self.audio_path.clone(),
        })
    }

    async fn poll(&self, job_token: &str) -> Result<VoiceJob> {
        if self.fail_poll {
            anyhow::bail!("job lookup failed");
        }
        Ok(VoiceJob {
            job_token: job_token.to_string(),
            status: self.poll_status,
            audio_url: self.poll_audio_url.clone(),
        })
    }
}

/// SQLite store that counts calls to the write paths
pub struct CountingStore {
    pub inner: SqliteStore,
    pub inserts: AtomicUsize,
    pub sequences: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            inserts: AtomicUsize::new(0),
            sequences: AtomicUsize::new(0),
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn sequence_calls(&self) -> usize {
        self.sequences.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn find_owner(&self, provider_account_id: &str) -> Result<Option<Owner>, StoreError> {
        self.inner.find_owner(provider_account_id).await
    }

    async fn upsert_owner(&self, owner: &Owner) -> Result<(), StoreError> {
        self.inner.upsert_owner(owner).await
    }

    async fn find_entry(
        &self,
        object: &str,
        owner_id: Option<&str>,
    ) -> Result<Option<Entry>, StoreError> {
        self.inner.find_entry(object, owner_id).await
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<Entry>, StoreError> {
        self.inner.get_entry(id).await
    }

    async fn latest_entry(&self) -> Result<Option<Entry>, StoreError> {
        self.inner.latest_entry().await
    }

    async fn next_sequence(&self) -> Result<u64, StoreError> {
        self.sequences.fetch_add(1, Ordering::SeqCst);
        self.inner.next_sequence().await
    }

    async fn insert_entry_if_absent(&self, entry: &Entry) -> Result<InsertOutcome, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_entry_if_absent(entry).await
    }

    async fn update_voice(&self, id: Uuid, update: &VoiceUpdate) -> Result<bool, StoreError> {
        self.inner.update_voice(id, update).await
    }

    async fn count_entries(&self) -> Result<u64, StoreError> {
        self.inner.count_entries().await
    }

    async fn list_entries(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        self.inner.list_entries(limit).await
    }
}

/// Fakes wired together
pub struct Harness {
    pub model: Arc<FakeModel>,
    pub embeddings: Arc<FakeEmbeddings>,
    pub images: Arc<FakeImageHost>,
    pub speech: Arc<FakeSpeech>,
    pub store: Arc<CountingStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            model: Arc::new(FakeModel::new()),
            embeddings: Arc::new(FakeEmbeddings::new()),
            images: Arc::new(FakeImageHost::new()),
            speech: Arc::new(FakeSpeech::new()),
            store: Arc::new(CountingStore::new()),
        }
    }

    pub fn with_model(mut self, model: FakeModel) -> Self {
        self.model = Arc::new(model);
        self
    }

    pub fn with_embeddings(mut self, embeddings: FakeEmbeddings) -> Self {
        self.embeddings = Arc::new(embeddings);
        self
    }

    pub fn with_images(mut self, images: FakeImageHost) -> Self {
        self.images = Arc::new(images);
        self
    }

    pub fn with_speech(mut self, speech: FakeSpeech) -> Self {
        self.speech = Arc::new(speech);
        self
    }

    pub fn providers(&self) -> Providers {
        Providers {
            vision: self.model.clone(),
            text: self.model.clone(),
            embeddings: self.embeddings.clone(),
            image_host: self.images.clone(),
            speech: self.speech.clone(),
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        self.orchestrator_with_budget(Duration::from_millis(4500))
    }

    pub fn orchestrator_with_budget(&self, budget: Duration) -> Orchestrator {
        Orchestrator::new(&self.providers(), self.store.clone(), budget)
    }

    /// Register an owner and return it
    pub async fn owner(&self, account: &str, name: &str) -> Owner {
        let owner = Owner::new(account, name);
        self.store.upsert_owner(&owner).await.unwrap();
        owner
    }

    pub async fn entries_created(&self, account: &str) -> u64 {
        self.store
            .find_owner(account)
            .await
            .unwrap()
            .map(|o| o.entries_created)
            .unwrap_or(0)
    }
}
