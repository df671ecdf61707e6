use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use url::Url;

use crate::core::clipboard::{ClipboardPayload, ClipboardSink, CopyGate};
use crate::core::codec;
use crate::core::error::{ClipboardError, RenderError};
use crate::core::renderer::{Rendered, RenderingEngine};
use crate::core::spec::{RawInputs, RenderSpec, normalize};

/// A rendered output published under a temporary id.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: &'static str,
    pub filename: String,
    pub bytes: Arc<Vec<u8>>,
}

/// Exclusive claim on one stored object. Not `Clone`: revoking consumes it,
/// so an object can only be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectHandle {
    id: u64,
}

impl ObjectHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> String {
        format!("/objects/{}", self.id)
    }
}

/// Temporary output objects addressable by id.
#[derive(Debug)]
pub struct ObjectStore {
    objects: Mutex<HashMap<u64, StoredObject>>,
    next_id: AtomicU64,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, rendered: &Rendered, filename: String) -> ObjectHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.objects.lock().insert(
            id,
            StoredObject {
                content_type: rendered.content_type(),
                filename,
                bytes: Arc::new(rendered.bytes().to_vec()),
            },
        );
        tracing::debug!("created object {}", id);
        ObjectHandle { id }
    }

    pub fn get(&self, id: u64) -> Option<StoredObject> {
        self.objects.lock().get(&id).cloned()
    }

    pub fn revoke(&self, handle: ObjectHandle) {
        if self.objects.lock().remove(&handle.id).is_none() {
            tracing::warn!("object {} was already gone when revoked", handle.id);
        } else {
            tracing::debug!("revoked object {}", handle.id);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

/// Holds at most one live object. The previous one is revoked before a new
/// one is stored, and whatever is left is revoked on drop.
#[derive(Debug)]
pub struct PreviewSlot {
    store: Arc<ObjectStore>,
    current: Option<ObjectHandle>,
}

impl PreviewSlot {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn acquire(&mut self, rendered: &Rendered, filename: String) -> &ObjectHandle {
        self.release();
        let handle = self.store.create(rendered, filename);
        self.current.insert(handle)
    }

    pub fn release(&mut self) {
        if let Some(old) = self.current.take() {
            self.store.revoke(old);
        }
    }

    pub fn current(&self) -> Option<&ObjectHandle> {
        self.current.as_ref()
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.release();
    }
}

/// Last successful render of a session.
#[derive(Debug, Clone)]
pub struct PreviewState {
    pub spec: RenderSpec,
    pub rendered: Rendered,
}

impl PreviewState {
    pub fn filename(&self) -> String {
        self.spec.filename()
    }

    pub fn summary(&self) -> String {
        self.spec.summary()
    }

    pub fn query(&self) -> String {
        codec::encode(&self.spec)
    }
}

/// One preview: the `normalize -> render -> publish` pipeline plus the
/// clipboard paths. A failed render leaves the previous state and object
/// untouched.
pub struct PreviewSession {
    engine: RenderingEngine,
    slot: PreviewSlot,
    state: Option<PreviewState>,
    copy_gate: CopyGate,
}

impl PreviewSession {
    pub fn new(engine: RenderingEngine, store: Arc<ObjectStore>) -> Self {
        Self {
            engine,
            slot: PreviewSlot::new(store),
            state: None,
            copy_gate: CopyGate::new(),
        }
    }

    pub fn update(&mut self, raw: &RawInputs) -> Result<&PreviewState, RenderError> {
        let spec = normalize(raw);
        let rendered = self.engine.render_sync(&spec).inspect_err(|e| {
            tracing::warn!("preview not updated: {}", e);
        })?;
        Ok(self.commit(spec, rendered))
    }

    /// Publishes an already rendered output as the current preview.
    pub fn commit(&mut self, spec: RenderSpec, rendered: Rendered) -> &PreviewState {
        self.slot.acquire(&rendered, spec.filename());
        self.state.insert(PreviewState { spec, rendered })
    }

    pub fn current(&self) -> Option<&PreviewState> {
        self.state.as_ref()
    }

    pub fn object(&self) -> Option<&ObjectHandle> {
        self.slot.current()
    }

    pub fn share_url(&self, base: &Url) -> Option<Url> {
        self.state
            .as_ref()
            .map(|state| codec::share_url(base, &state.spec))
    }

    pub async fn copy_image<S: ClipboardSink>(&self, sink: &S) -> Result<(), ClipboardError> {
        let payload = self
            .state
            .as_ref()
            .map(|state| state.rendered.clipboard_payload())
            .ok_or(ClipboardError::Empty)?;
        self.copy_gate.copy(sink, payload).await
    }

    pub async fn copy_share_url<S: ClipboardSink>(
        &self,
        sink: &S,
        base: &Url,
    ) -> Result<(), ClipboardError> {
        let url = self.share_url(base).ok_or(ClipboardError::Empty)?;
        self.copy_gate
            .copy(sink, ClipboardPayload::text(url.as_str()))
            .await
    }
}

/// Named preview sessions, bounded. Touching a session makes it the most
/// recent; going over the limit drops the least recent one, which revokes its
/// object.
pub struct PreviewSessions {
    engine: RenderingEngine,
    store: Arc<ObjectStore>,
    limit: usize,
    sessions: HashMap<String, PreviewSession>,
    recency: VecDeque<String>,
}

impl PreviewSessions {
    /// `limit` is raised to 1 if given as 0.
    pub fn new(engine: RenderingEngine, store: Arc<ObjectStore>, limit: usize) -> Self {
        Self {
            engine,
            store,
            limit: limit.max(1),
            sessions: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn session(&mut self, name: &str) -> &mut PreviewSession {
        if let Some(pos) = self.recency.iter().position(|n| n == name) {
            self.recency.remove(pos);
        } else {
            while self.sessions.len() >= self.limit {
                let Some(oldest) = self.recency.pop_front() else {
                    break;
                };
                tracing::info!("evicting preview {:?}", oldest);
                self.sessions.remove(&oldest);
            }
        }
        self.recency.push_back(name.to_string());

        let (engine, store) = (&self.engine, &self.store);
        self.sessions
            .entry(name.to_string())
            .or_insert_with(|| PreviewSession::new(engine.clone(), store.clone()))
    }

    pub fn get(&self, name: &str) -> Option<&PreviewSession> {
        self.sessions.get(name)
    }

    /// Drops a session and its object. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.recency.retain(|n| n != name);
        self.sessions.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
