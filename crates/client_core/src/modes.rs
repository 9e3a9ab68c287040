//! Mode (tab) switching. Any switch resets every session, not only the one
//! being left.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{MediaType, Mode};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::{
    config::Settings,
    gateway::PredictionGateway,
    notify::Notifier,
    preview::PreviewBackend,
    session::{BatchSubmitter, SessionController, SingleSubmitter, Submitter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChanged {
    pub from: Mode,
    pub to: Mode,
}

#[async_trait]
pub trait ModeListener: Send + Sync {
    async fn on_mode_changed(&self, change: ModeChanged);
}

#[async_trait]
impl<S: Submitter> ModeListener for SessionController<S> {
    async fn on_mode_changed(&self, _change: ModeChanged) {
        self.reset().await;
    }
}

pub struct ModeSwitch {
    active: Mutex<Mode>,
    listeners: Vec<Arc<dyn ModeListener>>,
    events: broadcast::Sender<ModeChanged>,
}

impl ModeSwitch {
    pub fn new(initial: Mode) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            active: Mutex::new(initial),
            listeners: Vec::new(),
            events,
        }
    }

    pub fn register(&mut self, listener: Arc<dyn ModeListener>) {
        self.listeners.push(listener);
    }

    pub async fn active(&self) -> Mode {
        *self.active.lock().await
    }

    /// Makes `mode` active and dispatches the change to every listener, in
    /// registration order, before publishing it to subscribers.
    pub async fn switch_to(&self, mode: Mode) -> ModeChanged {
        let change = {
            let mut active = self.active.lock().await;
            let change = ModeChanged {
                from: *active,
                to: mode,
            };
            *active = mode;
            change
        };
        info!(from = %change.from, to = %change.to, "mode changed");
        for listener in &self.listeners {
            listener.on_mode_changed(change).await;
        }
        let _ = self.events.send(change);
        change
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModeChanged> {
        self.events.subscribe()
    }
}

/// The four classification sessions plus the switch that ties them together.
pub struct Workbench {
    image: Arc<SessionController<SingleSubmitter>>,
    audio: Arc<SessionController<SingleSubmitter>>,
    batch_image: Arc<SessionController<BatchSubmitter>>,
    batch_audio: Arc<SessionController<BatchSubmitter>>,
    modes: ModeSwitch,
}

impl Workbench {
    pub fn new(
        gateway: Arc<dyn PredictionGateway>,
        settings: &Settings,
        previews: Arc<dyn PreviewBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let single = |media| {
            Arc::new(SessionController::new(
                SingleSubmitter::new(gateway.clone(), media),
                settings,
                previews.clone(),
                notifier.clone(),
            ))
        };
        let batch = |media| {
            Arc::new(SessionController::new(
                BatchSubmitter::new(gateway.clone(), media),
                settings,
                previews.clone(),
                notifier.clone(),
            ))
        };

        let image = single(MediaType::Image);
        let audio = single(MediaType::Audio);
        let batch_image = batch(MediaType::Image);
        let batch_audio = batch(MediaType::Audio);

        let mut modes = ModeSwitch::new(Mode::Image);
        modes.register(image.clone());
        modes.register(audio.clone());
        modes.register(batch_image.clone());
        modes.register(batch_audio.clone());

        Self {
            image,
            audio,
            batch_image,
            batch_audio,
            modes,
        }
    }

    pub fn single(&self, media: MediaType) -> &Arc<SessionController<SingleSubmitter>> {
        match media {
            MediaType::Image => &self.image,
            MediaType::Audio => &self.audio,
        }
    }

    pub fn batch(&self, media: MediaType) -> &Arc<SessionController<BatchSubmitter>> {
        match media {
            MediaType::Image => &self.batch_image,
            MediaType::Audio => &self.batch_audio,
        }
    }

    pub async fn active_mode(&self) -> Mode {
        self.modes.active().await
    }

    pub async fn switch_mode(&self, mode: Mode) -> ModeChanged {
        self.modes.switch_to(mode).await
    }

    pub fn subscribe_mode_changes(&self) -> broadcast::Receiver<ModeChanged> {
        self.modes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use shared::protocol::{BatchPredictionResponse, PredictionResult};

    use super::*;
    use crate::{
        error::GatewayError,
        notify::TracingNotifier,
        preview::MemoryPreviews,
        session::SessionState,
        upload::UploadFile,
    };

    struct EchoGateway;

    #[async_trait]
    impl PredictionGateway for EchoGateway {
        async fn predict(
            &self,
            media: MediaType,
            file: &UploadFile,
        ) -> Result<PredictionResult, GatewayError> {
            Ok(PredictionResult {
                filename: file.filename.clone(),
                media_type: media,
                predicted_label: "guitar".into(),
                confidence: 0.6,
            })
        }

        async fn batch_predict(
            &self,
            _media: MediaType,
            _files: &[UploadFile],
        ) -> Result<BatchPredictionResponse, GatewayError> {
            Err(GatewayError::Status {
                status: 415,
                body: None,
            })
        }
    }

    #[derive(Default)]
    struct CountingListener {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl ModeListener for CountingListener {
        async fn on_mode_changed(&self, _change: ModeChanged) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn workbench(previews: Arc<MemoryPreviews>) -> Workbench {
        Workbench::new(
            Arc::new(EchoGateway),
            &Settings::default(),
            previews,
            Arc::new(TracingNotifier),
        )
    }

    fn file(name: &str) -> UploadFile {
        UploadFile::from_bytes(name, vec![1u8; 8])
    }

    #[tokio::test]
    async fn switching_tabs_resets_every_session() {
        let previews = Arc::new(MemoryPreviews::default());
        let bench = workbench(previews.clone());

        bench
            .single(MediaType::Image)
            .classify(vec![file("a.png")])
            .await
            .expect("image accepted");
        bench
            .batch(MediaType::Audio)
            .select(vec![file("a.wav"), file("b.wav")])
            .await
            .expect("audio selected");
        bench
            .batch(MediaType::Image)
            .classify(vec![file("c.jpg")])
            .await
            .expect("batch accepted");
        assert_eq!(previews.live_count(), 4);
        assert!(bench.batch(MediaType::Image).snapshot().await.is_error());

        let change = bench.switch_mode(Mode::Audio).await;
        assert_eq!(
            change,
            ModeChanged {
                from: Mode::Image,
                to: Mode::Audio
            }
        );
        assert_eq!(bench.active_mode().await, Mode::Audio);

        for media in [MediaType::Image, MediaType::Audio] {
            assert_eq!(bench.single(media).snapshot().await.state, SessionState::Idle);
            let batch = bench.batch(media).snapshot().await;
            assert_eq!(batch.state, SessionState::Idle);
            assert!(batch.files.is_empty());
        }
        assert_eq!(previews.live_count(), 0);
    }

    #[tokio::test]
    async fn listeners_and_subscribers_see_every_switch() {
        let listener = Arc::new(CountingListener::default());
        let mut switch = ModeSwitch::new(Mode::Image);
        switch.register(listener.clone());
        let mut rx = switch.subscribe();

        switch.switch_to(Mode::BatchImage).await;
        switch.switch_to(Mode::BatchAudio).await;

        assert_eq!(listener.seen.load(Ordering::SeqCst), 2);
        assert_eq!(
            rx.recv().await.expect("first"),
            ModeChanged {
                from: Mode::Image,
                to: Mode::BatchImage
            }
        );
        assert_eq!(rx.recv().await.expect("second").to, Mode::BatchAudio);
    }
}
