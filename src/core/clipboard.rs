use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::ClipboardError;

/// Bytes plus the MIME type a clipboard write needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    mime: String,
    data: Vec<u8>,
}

impl ClipboardPayload {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new("text/plain", text.into().into_bytes())
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_text(&self) -> bool {
        self.mime.starts_with("text/")
    }
}

/// Platform clipboard. Implemented by whatever hosts the engine.
pub trait ClipboardSink {
    fn supports(&self, mime: &str) -> bool;

    fn write(
        &self,
        payload: ClipboardPayload,
    ) -> impl Future<Output = Result<(), ClipboardError>> + Send;
}

/// Lets at most one clipboard write run at a time. A request arriving while
/// another is in flight is dropped with [`ClipboardError::Busy`].
#[derive(Debug, Default)]
pub struct CopyGate {
    busy: AtomicBool,
}

struct CopyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for CopyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl CopyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn enter(&self) -> Option<CopyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CopyGuard { busy: &self.busy })
    }

    pub async fn copy<S: ClipboardSink>(
        &self,
        sink: &S,
        payload: ClipboardPayload,
    ) -> Result<(), ClipboardError> {
        if !sink.supports(payload.mime()) {
            tracing::warn!("clipboard cannot take {}", payload.mime());
            return Err(ClipboardError::Unsupported(payload.mime().to_string()));
        }

        let Some(_guard) = self.enter() else {
            tracing::debug!("dropping overlapping clipboard write");
            return Err(ClipboardError::Busy);
        };

        let mime = payload.mime().to_string();
        match sink.write(payload).await {
            Ok(()) => {
                tracing::info!("copied {} to clipboard", mime);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("clipboard write failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MemoryClipboard {
        text_only: bool,
        reject: bool,
        written: Mutex<Vec<ClipboardPayload>>,
    }

    impl ClipboardSink for MemoryClipboard {
        fn supports(&self, mime: &str) -> bool {
            !self.text_only || mime.starts_with("text/")
        }

        async fn write(&self, payload: ClipboardPayload) -> Result<(), ClipboardError> {
            if self.reject {
                return Err(ClipboardError::Rejected("permission denied".into()));
            }
            self.written.lock().push(payload);
            Ok(())
        }
    }

    struct SlowClipboard {
        release: Arc<Notify>,
    }

    impl ClipboardSink for SlowClipboard {
        fn supports(&self, _mime: &str) -> bool {
            true
        }

        fn write(
            &self,
            _payload: ClipboardPayload,
        ) -> impl Future<Output = Result<(), ClipboardError>> + Send {
            let release = self.release.clone();
            async move {
                release.notified().await;
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn writes_payload() {
        let gate = CopyGate::new();
        let sink = MemoryClipboard::default();
        gate.copy(&sink, ClipboardPayload::text("https://example.test/?w=1"))
            .await
            .unwrap();
        let written = sink.written.lock();
        assert_eq!(written.len(), 1);
        assert!(written[0].is_text());
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn unsupported_mime_is_reported() {
        let gate = CopyGate::new();
        let sink = MemoryClipboard {
            text_only: true,
            ..Default::default()
        };
        let err = gate
            .copy(&sink, ClipboardPayload::new("image/png", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert_eq!(err, ClipboardError::Unsupported("image/png".into()));
    }

    #[tokio::test]
    async fn rejection_releases_gate() {
        let gate = CopyGate::new();
        let sink = MemoryClipboard {
            reject: true,
            ..Default::default()
        };
        let err = gate.copy(&sink, ClipboardPayload::text("x")).await.unwrap_err();
        assert!(matches!(err, ClipboardError::Rejected(_)));
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn overlapping_write_is_dropped() {
        let gate = Arc::new(CopyGate::new());
        let release = Arc::new(Notify::new());
        let sink = Arc::new(SlowClipboard {
            release: release.clone(),
        });

        let first = {
            let gate = gate.clone();
            let sink = sink.clone();
            tokio::spawn(async move { gate.copy(sink.as_ref(), ClipboardPayload::text("a")).await })
        };

        while !gate.is_busy() {
            tokio::task::yield_now().await;
        }

        let second = gate.copy(sink.as_ref(), ClipboardPayload::text("b")).await;
        assert_eq!(second, Err(ClipboardError::Busy));

        release.notify_one();
        assert_eq!(first.await.unwrap(), Ok(()));
        assert!(!gate.is_busy());
    }
}
