//! Sampling Loop: periodic frame → classifier → kiosk, plus flow timers
//! and touch input, all on one task.
//!
//! The loop task owns the `Kiosk` while running and hands it back on
//! stop, so nothing else ever mutates the registry concurrently. At most
//! one classifier call is in flight; ticks landing while it is pending,
//! or while the source is not ready, are skipped rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use futures_util::future::OptionFuture;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::boundary::{FrameSource, IdentityClassifier, Overlay, PhotoSink};
use crate::core::kiosk::{Kiosk, KioskOutput};
use crate::error::{ClassifierError, KioskError};
use crate::types::{Detection, FlowEvent, FlowInput, SessionSnapshot, SessionView, VipId};

/// Requests into the running loop
#[derive(Debug)]
pub enum KioskCommand {
    /// Touch-screen input; the resulting view is sent back
    Input {
        input: FlowInput,
        reply: oneshot::Sender<SessionView>,
    },
    /// Forget a VIP
    Clear {
        vip_id: VipId,
        reply: oneshot::Sender<SessionView>,
    },
    /// List suspended sessions
    Sessions {
        reply: oneshot::Sender<Vec<SessionSnapshot>>,
    },
}

/// External collaborators the loop talks to
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn FrameSource>,
    pub classifier: Arc<dyn IdentityClassifier>,
    pub sink: Arc<dyn PhotoSink>,
    pub overlay: Arc<dyn Overlay>,
}

/// Cloneable handle for the API and other front ends
#[derive(Clone)]
pub struct KioskHandle {
    commands: mpsc::Sender<KioskCommand>,
    views: watch::Receiver<SessionView>,
    events: broadcast::Sender<FlowEvent>,
    /// Cleared while the loop is stopped; requests fail fast
    running: Arc<AtomicBool>,
    reply_timeout: Duration,
}

impl KioskHandle {
    /// Latest published view
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    /// Receiver notified on every published view
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.views.clone()
    }

    /// Flow events as they happen
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub async fn input(&self, input: FlowInput) -> Result<SessionView, KioskError> {
        let (reply, rx) = oneshot::channel();
        self.request(KioskCommand::Input { input, reply }, rx).await
    }

    pub async fn clear(&self, vip_id: VipId) -> Result<SessionView, KioskError> {
        let (reply, rx) = oneshot::channel();
        self.request(KioskCommand::Clear { vip_id, reply }, rx).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>, KioskError> {
        let (reply, rx) = oneshot::channel();
        self.request(KioskCommand::Sessions { reply }, rx).await
    }

    async fn request<T>(
        &self,
        command: KioskCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, KioskError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(KioskError::LoopUnavailable);
        }
        match tokio::time::timeout(self.reply_timeout, self.commands.send(command)).await {
            Ok(Ok(())) => {}
            _ => return Err(KioskError::LoopUnavailable),
        }
        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            _ => Err(KioskError::LoopUnavailable),
        }
    }
}

enum LoopState {
    Stopped {
        kiosk: Kiosk,
        commands: mpsc::Receiver<KioskCommand>,
    },
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<(Kiosk, mpsc::Receiver<KioskCommand>)>,
    },
    /// The loop task panicked and took the kiosk with it
    Failed,
}

/// Owner of the sampling task
pub struct SamplingLoop {
    interval: Duration,
    collaborators: Collaborators,
    state: LoopState,
    handle: KioskHandle,
    views: Arc<watch::Sender<SessionView>>,
}

impl SamplingLoop {
    pub fn new(kiosk: Kiosk, interval: Duration, collaborators: Collaborators) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (views, view_rx) = watch::channel(kiosk.view());
        let (events, _) = broadcast::channel(100);
        let handle = KioskHandle {
            commands: command_tx,
            views: view_rx,
            events,
            running: Arc::new(AtomicBool::new(false)),
            reply_timeout: Duration::from_secs(2),
        };
        Self {
            interval,
            collaborators,
            state: LoopState::Stopped {
                kiosk,
                commands: command_rx,
            },
            handle,
            views: Arc::new(views),
        }
    }

    pub fn handle(&self) -> KioskHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    /// Spawn the loop. No-op (returns false) if already running.
    pub fn start(&mut self) -> bool {
        let LoopState::Stopped { .. } = self.state else {
            return false;
        };
        let LoopState::Stopped { mut kiosk, mut commands } =
            std::mem::replace(&mut self.state, LoopState::Failed)
        else {
            return false;
        };

        // Anything that slipped in while stopped was already refused
        reject_pending(&mut commands);
        kiosk.resume_timers(now());

        let (stop, stop_rx) = oneshot::channel();
        let ctx = LoopContext {
            interval: self.interval,
            collaborators: self.collaborators.clone(),
            views: Arc::clone(&self.views),
            events: self.handle.events.clone(),
        };
        let task = tokio::spawn(run(kiosk, commands, stop_rx, ctx));
        self.state = LoopState::Running { stop, task };
        self.handle.running.store(true, Ordering::SeqCst);
        info!(interval_ms = self.interval.as_millis() as u64, "sampling loop started");
        true
    }

    /// Stop the loop, cancel pending work and clear the overlay.
    ///
    /// The kiosk (and all sessions) survive. The active flow timer is
    /// cancelled and re-armed from scratch on the next start. Requests made
    /// while stopped fail with `LoopUnavailable` and are never applied.
    pub async fn stop(&mut self) -> Result<bool, KioskError> {
        if !self.is_running() {
            return Ok(false);
        }
        let LoopState::Running { stop, task } =
            std::mem::replace(&mut self.state, LoopState::Failed)
        else {
            return Ok(false);
        };

        self.handle.running.store(false, Ordering::SeqCst);
        // The task may already have exited
        let _ = stop.send(());
        let (mut kiosk, mut commands) = task.await?;
        kiosk.pause_timers();
        reject_pending(&mut commands);
        self.collaborators.overlay.clear();
        self.state = LoopState::Stopped { kiosk, commands };
        info!("sampling loop stopped");
        Ok(true)
    }
}

struct LoopContext {
    interval: Duration,
    collaborators: Collaborators,
    views: Arc<watch::Sender<SessionView>>,
    events: broadcast::Sender<FlowEvent>,
}

type PendingDetection = JoinHandle<Result<Detection, ClassifierError>>;

async fn run(
    mut kiosk: Kiosk,
    mut commands: mpsc::Receiver<KioskCommand>,
    mut stop: oneshot::Receiver<()>,
    ctx: LoopContext,
) -> (Kiosk, mpsc::Receiver<KioskCommand>) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<PendingDetection> = None;
    let mut commands_open = true;

    loop {
        let deadline = kiosk.next_deadline().map(Instant::from_std);
        let timer: OptionFuture<_> = deadline.map(tokio::time::sleep_until).into();

        tokio::select! {
            biased;

            _ = &mut stop => break,

            Some(joined) = OptionFuture::from(in_flight.as_mut()) => {
                in_flight = None;
                let detection = match joined {
                    Ok(Ok(detection)) => detection,
                    Ok(Err(e)) => {
                        warn!("classifier failed: {}", e);
                        Detection::NoFace
                    }
                    Err(e) => {
                        warn!("classifier task failed: {}", e);
                        Detection::NoFace
                    }
                };
                ctx.collaborators
                    .overlay
                    .show_face(detection.classification().and_then(|c| c.face_coords));
                let out = kiosk.on_detection(detection, now());
                publish(&ctx, out);
            }

            Some(()) = timer => {
                let out = kiosk.advance(now());
                publish(&ctx, out);
            }

            command = commands.recv(), if commands_open => match command {
                Some(command) => handle_command(&mut kiosk, command, &ctx),
                None => commands_open = false,
            },

            _ = ticker.tick() => {
                if in_flight.is_some() {
                    debug!("classifier busy, tick skipped");
                    continue;
                }
                if !ctx.collaborators.source.is_ready() {
                    debug!("capture source not ready, tick skipped");
                    continue;
                }
                match ctx.collaborators.source.capture() {
                    Ok(frame) => {
                        kiosk.on_frame(frame.clone());
                        let classifier = Arc::clone(&ctx.collaborators.classifier);
                        in_flight = Some(tokio::spawn(async move {
                            classifier.classify(&frame).await
                        }));
                    }
                    Err(e) => warn!("capture failed: {}", e),
                }
            }
        }
    }

    if let Some(pending) = in_flight {
        debug!("classifier call in flight, aborted");
        pending.abort();
    }
    (kiosk, commands)
}

/// Drop queued commands; their callers see `LoopUnavailable`
fn reject_pending(commands: &mut mpsc::Receiver<KioskCommand>) {
    let mut dropped = 0usize;
    while commands.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "queued commands rejected");
    }
}

fn handle_command(kiosk: &mut Kiosk, command: KioskCommand, ctx: &LoopContext) {
    match command {
        KioskCommand::Input { input, reply } => {
            let out = kiosk.on_input(input, now());
            let _ = reply.send(out.view.clone());
            publish(ctx, out);
        }
        KioskCommand::Clear { vip_id, reply } => {
            let out = kiosk.clear(vip_id);
            let _ = reply.send(out.view.clone());
            publish(ctx, out);
        }
        KioskCommand::Sessions { reply } => {
            let _ = reply.send(kiosk.suspended());
        }
    }
}

/// Push a kiosk output to the view channel, event subscribers and the
/// persistence collaborator. Persistence is fire-and-forget.
fn publish(ctx: &LoopContext, out: KioskOutput) {
    for event in &out.events {
        let _ = ctx.events.send(event.clone());
    }
    for photo in out.photos {
        let sink = Arc::clone(&ctx.collaborators.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.save_photo(photo).await {
                warn!("failed to save photo: {}", e);
            }
        });
    }
    for rating in out.ratings {
        let sink = Arc::clone(&ctx.collaborators.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.save_rating(rating).await {
                warn!("failed to save rating: {}", e);
            }
        });
    }
    ctx.views.send_replace(out.view);
}

/// Loop clock; follows tokio's (pausable) clock
fn now() -> std::time::Instant {
    Instant::now().into_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::core::boundary::LogSink;
    use crate::core::registry::SessionRegistry;
    use crate::core::resolver::RuleTable;
    use crate::error::CaptureError;
    use crate::types::{FaceCoords, Frame, Gender, OwnerKind};

    struct StaticSource {
        ready: AtomicBool,
    }

    impl FrameSource for StaticSource {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn capture(&self) -> Result<Frame, CaptureError> {
            Ok(Frame::jpeg(vec![0xff, 0xd8]))
        }
    }

    struct CountingClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityClassifier for CountingClassifier {
        async fn classify(&self, _frame: &Frame) -> Result<Detection, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Detection::face(Gender::Female, 28))
        }
    }

    #[derive(Default)]
    struct FlagOverlay {
        shown: AtomicUsize,
        cleared: AtomicBool,
    }

    impl Overlay for FlagOverlay {
        fn show_face(&self, _coords: Option<FaceCoords>) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }

        fn clear(&self) {
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    fn setup(ready: bool) -> (SamplingLoop, Arc<CountingClassifier>, Arc<FlagOverlay>) {
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
        });
        let overlay = Arc::new(FlagOverlay::default());
        let kiosk = Kiosk::new(Box::new(RuleTable::default()), SessionRegistry::default());
        let collaborators = Collaborators {
            source: Arc::new(StaticSource {
                ready: AtomicBool::new(ready),
            }),
            classifier: classifier.clone(),
            sink: Arc::new(LogSink),
            overlay: overlay.clone(),
        };
        let sampler = SamplingLoop::new(kiosk, Duration::from_millis(200), collaborators);
        (sampler, classifier, overlay)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (mut sampler, _, _) = setup(true);
        assert!(sampler.start());
        assert!(!sampler.start());
        assert!(sampler.is_running());
        assert!(sampler.stop().await.unwrap());
        assert!(!sampler.stop().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_overlay_and_keeps_sessions() {
        let (mut sampler, _, overlay) = setup(true);
        let handle = sampler.handle();
        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(overlay.shown.load(Ordering::SeqCst) >= 1);
        assert_eq!(handle.view().owner_id, Some(VipId(2)));

        sampler.stop().await.unwrap();
        assert!(overlay.cleared.load(Ordering::SeqCst));

        // Restart resumes the same kiosk
        sampler.start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(handle.view().owner_kind, OwnerKind::Vip);
        sampler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_source_skips_ticks() {
        let (mut sampler, classifier, _) = setup(false);
        sampler.start();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sampler.handle().view().owner_kind, OwnerKind::Idle);
        sampler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_fails_when_stopped() {
        let (sampler, _, _) = setup(true);
        let handle = sampler.handle();
        let result = handle.sessions().await;
        assert!(matches!(result, Err(KioskError::LoopUnavailable)));
    }
}
