use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};

/// Which kind of access a grant gives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Reader,
    Writer,
}

/// A reader currently holding the gate.
#[derive(Clone, Debug)]
pub struct ActiveReader {
    pub id: u64,
    pub info: Option<String>,
    pub started: Instant,
}

/// The writer currently holding the gate.
#[derive(Clone, Debug)]
pub struct ActiveWriter {
    pub info: Option<String>,
    pub started: Instant,
}

/// Point-in-time view of the gate.
#[derive(Clone, Debug, Default)]
pub struct GateStatus {
    pub active_readers: Vec<ActiveReader>,
    pub active_writer: Option<ActiveWriter>,
    pub queued_readers: usize,
    pub writer_queued: bool,
}

struct QueuedRequest {
    info: Option<String>,
    reply: oneshot::Sender<Grant>,
}

#[derive(Default)]
struct GateState {
    queued_readers: VecDeque<QueuedRequest>,
    queued_writer: Option<QueuedRequest>,
    active_readers: BTreeMap<u64, ActiveReader>,
    active_writer: Option<ActiveWriter>,
    next_reader_id: u64,
}

type SharedState = Arc<Mutex<GateState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, GateState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reader/writer admission controller.
///
/// Any number of readers may hold the gate together; a writer holds it alone.
/// A queued writer is served before readers that arrive after it, but never
/// preempts readers that are already active.
///
/// Requests are only ever granted from a scheduling pass on a background
/// task, never from inside [`add_reader`](Self::add_reader),
/// [`add_writer`](Self::add_writer) or a release. Usage errors (a second
/// writer, a full reader queue) are returned synchronously.
pub struct AdmissionGate {
    config: GateConfig,
    state: SharedState,
    reschedule: mpsc::UnboundedSender<()>,
}

impl AdmissionGate {
    /// Create a gate and start its scheduler.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, unless the gate is
    /// disabled.
    pub fn new(config: GateConfig) -> Self {
        let state = SharedState::default();
        let (reschedule, requests) = mpsc::unbounded_channel();
        if !config.disabled {
            tokio::spawn(run_scheduler(
                Arc::clone(&state),
                reschedule.downgrade(),
                requests,
            ));
        }
        Self {
            config,
            state,
            reschedule,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Queue a reader. Await the returned future for the grant.
    pub fn add_reader(&self) -> GateResult<PendingGrant> {
        self.enqueue(AccessKind::Reader, None)
    }

    pub fn add_reader_with_info(&self, info: impl Into<String>) -> GateResult<PendingGrant> {
        self.enqueue(AccessKind::Reader, Some(info.into()))
    }

    /// Queue the writer. Await the returned future for the grant.
    pub fn add_writer(&self) -> GateResult<PendingGrant> {
        self.enqueue(AccessKind::Writer, None)
    }

    pub fn add_writer_with_info(&self, info: impl Into<String>) -> GateResult<PendingGrant> {
        self.enqueue(AccessKind::Writer, Some(info.into()))
    }

    pub fn status(&self) -> GateStatus {
        let state = lock(&self.state);
        GateStatus {
            active_readers: state.active_readers.values().cloned().collect(),
            active_writer: state.active_writer.clone(),
            queued_readers: state.queued_readers.len(),
            writer_queued: state.queued_writer.is_some(),
        }
    }

    fn enqueue(&self, kind: AccessKind, info: Option<String>) -> GateResult<PendingGrant> {
        if self.config.disabled {
            return Ok(PendingGrant::ready(Grant::unmanaged(kind)));
        }

        let (reply, receiver) = oneshot::channel();
        {
            let mut state = lock(&self.state);
            match kind {
                AccessKind::Reader => {
                    let limit = self.config.reader_queue_size_limit;
                    if state.queued_readers.len() >= limit {
                        return Err(GateError::ReaderQueueFull { limit });
                    }
                    state.queued_readers.push_back(QueuedRequest { info, reply });
                }
                AccessKind::Writer => {
                    if state.queued_writer.is_some() {
                        return Err(GateError::WriterAlreadyQueued);
                    }
                    if state.active_writer.is_some() {
                        return Err(GateError::WriterAlreadyActive);
                    }
                    state.queued_writer = Some(QueuedRequest { info, reply });
                }
            }
        }
        trace!(?kind, "request queued");
        // A closed channel means the scheduler is gone; the pending grant
        // then resolves to `GateError::Closed`.
        let _ = self.reschedule.send(());
        Ok(PendingGrant::waiting(receiver))
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

async fn run_scheduler(
    state: SharedState,
    reschedule: mpsc::WeakUnboundedSender<()>,
    mut requests: mpsc::UnboundedReceiver<()>,
) {
    while requests.recv().await.is_some() {
        while requests.try_recv().is_ok() {}
        let Some(sender) = reschedule.upgrade() else {
            break;
        };
        let admitted = schedule(&state, &sender);
        drop(sender);

        for (reply, grant) in admitted {
            if let Err(grant) = reply.send(grant) {
                debug!(kind = ?grant.kind(), "requester went away, releasing grant");
                drop(grant);
            }
        }
    }
    trace!("gate scheduler stopped");
}

/// One scheduling pass. Grants are delivered by the caller after the state
/// lock is released.
fn schedule(
    shared: &SharedState,
    reschedule: &mpsc::UnboundedSender<()>,
) -> Vec<(oneshot::Sender<Grant>, Grant)> {
    let releaser = || Releaser {
        state: Arc::clone(shared),
        reschedule: reschedule.clone(),
    };
    let mut state = lock(shared);
    let mut admitted = Vec::new();
    let now = Instant::now();

    if state.active_writer.is_some() {
        return admitted;
    }

    if state.queued_writer.is_some() {
        if state.active_readers.is_empty() {
            if let Some(request) = state.queued_writer.take() {
                debug!(info = ?request.info, "writer granted");
                state.active_writer = Some(ActiveWriter {
                    info: request.info,
                    started: now,
                });
                let grant = Grant::managed(AccessKind::Writer, None, releaser());
                admitted.push((request.reply, grant));
            }
        }
        return admitted;
    }

    while let Some(request) = state.queued_readers.pop_front() {
        let id = state.next_reader_id;
        state.next_reader_id += 1;
        debug!(id, info = ?request.info, "reader granted");
        state.active_readers.insert(
            id,
            ActiveReader {
                id,
                info: request.info,
                started: now,
            },
        );
        let grant = Grant::managed(AccessKind::Reader, Some(id), releaser());
        admitted.push((request.reply, grant));
    }
    admitted
}

struct Releaser {
    state: SharedState,
    reschedule: mpsc::UnboundedSender<()>,
}

impl Releaser {
    fn release(self, kind: AccessKind, id: Option<u64>) {
        {
            let mut state = lock(&self.state);
            match (kind, id) {
                (AccessKind::Reader, Some(id)) => {
                    state.active_readers.remove(&id);
                }
                (AccessKind::Reader, None) => {}
                (AccessKind::Writer, _) => state.active_writer = None,
            }
        }
        debug!(?kind, ?id, "grant released");
        let _ = self.reschedule.send(());
    }
}

/// Access to the gate, held until released or dropped.
///
/// Releasing happens exactly once: either through [`Grant::release`] or when
/// the grant is dropped.
#[must_use = "dropping a grant releases it immediately"]
pub struct Grant {
    kind: AccessKind,
    id: Option<u64>,
    releaser: Option<Releaser>,
}

impl Grant {
    fn managed(kind: AccessKind, id: Option<u64>, releaser: Releaser) -> Self {
        Self {
            kind,
            id,
            releaser: Some(releaser),
        }
    }

    /// Grant from a disabled gate; releasing it does nothing.
    fn unmanaged(kind: AccessKind) -> Self {
        Self {
            kind,
            id: None,
            releaser: None,
        }
    }

    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    /// Reader id, unique per gate. `None` for writers and disabled gates.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Grant {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            releaser.release(self.kind, self.id);
        }
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("managed", &self.releaser.is_some())
            .finish()
    }
}

/// A queued request. Resolves to the [`Grant`] once the gate admits it.
///
/// Dropping it before it resolves abandons the request; if it is admitted
/// later, the grant is released straight away.
#[derive(Debug)]
#[must_use = "a pending grant does nothing unless awaited"]
pub struct PendingGrant {
    inner: Pending,
}

#[derive(Debug)]
enum Pending {
    Ready(Option<Grant>),
    Waiting(oneshot::Receiver<Grant>),
}

impl PendingGrant {
    fn ready(grant: Grant) -> Self {
        Self {
            inner: Pending::Ready(Some(grant)),
        }
    }

    fn waiting(receiver: oneshot::Receiver<Grant>) -> Self {
        Self {
            inner: Pending::Waiting(receiver),
        }
    }
}

impl Future for PendingGrant {
    type Output = GateResult<Grant>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Pending::Ready(grant) => Poll::Ready(grant.take().ok_or(GateError::Closed)),
            Pending::Waiting(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|result| result.map_err(|_| GateError::Closed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    async fn hold(pending: PendingGrant, name: &'static str, order: Arc<Mutex<Vec<&'static str>>>) {
        let grant = pending.await.unwrap();
        order.lock().unwrap().push(name);
        tokio::task::yield_now().await;
        grant.release();
    }

    async fn is_granted(pending: &mut PendingGrant) -> bool {
        tokio::time::timeout(Duration::from_millis(20), pending).await.is_ok()
    }

    // -----------------------------------------------------------------------
    // 1. Queued writer goes before readers queued ahead of it
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn writer_is_processed_first() {
        let gate = AdmissionGate::new(GateConfig::default());
        let order = log();

        let a = gate.add_reader().unwrap();
        let b = gate.add_reader().unwrap();
        let c = gate.add_writer().unwrap();

        let tasks = vec![
            tokio::spawn(hold(a, "reader", Arc::clone(&order))),
            tokio::spawn(hold(b, "reader", Arc::clone(&order))),
            tokio::spawn(hold(c, "writer", Arc::clone(&order))),
        ];
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec!["writer", "reader", "reader"]);
    }

    // -----------------------------------------------------------------------
    // 2. Readers in one batch are active together
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn readers_run_concurrently() {
        let gate = AdmissionGate::new(GateConfig::default());
        let first = gate.add_reader_with_info("first").unwrap().await.unwrap();
        let second = gate.add_reader_with_info("second").unwrap().await.unwrap();

        let status = gate.status();
        assert_eq!(status.active_readers.len(), 2);
        assert_eq!(status.active_readers[0].info.as_deref(), Some("first"));
        assert_ne!(first.id(), second.id());
        assert_eq!(first.kind(), AccessKind::Reader);
    }

    // -----------------------------------------------------------------------
    // 3. Writer waits for active readers; later readers wait for the writer
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn writer_waits_for_active_readers() {
        let gate = AdmissionGate::new(GateConfig::default());
        let reader = gate.add_reader().unwrap().await.unwrap();

        let mut writer = gate.add_writer().unwrap();
        let mut late_reader = gate.add_reader().unwrap();
        assert!(!is_granted(&mut writer).await);

        let status = gate.status();
        assert!(status.writer_queued);
        assert_eq!(status.queued_readers, 1);
        assert_eq!(status.active_readers.len(), 1);

        reader.release();
        let writer = writer.await.unwrap();
        assert_eq!(writer.kind(), AccessKind::Writer);
        assert!(gate.status().active_writer.is_some());
        assert!(!is_granted(&mut late_reader).await);

        writer.release();
        let late_reader = late_reader.await.unwrap();
        assert_eq!(late_reader.kind(), AccessKind::Reader);
        assert!(gate.status().active_writer.is_none());
    }

    // -----------------------------------------------------------------------
    // 4. Only one writer may be queued or active
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn second_writer_is_a_usage_error() {
        let gate = AdmissionGate::new(GateConfig::default());
        let pending = gate.add_writer().unwrap();
        let err = gate.add_writer().unwrap_err();
        assert_eq!(err, GateError::WriterAlreadyQueued);
        assert!(err.is_usage_error());

        let writer = pending.await.unwrap();
        assert_eq!(gate.add_writer().unwrap_err(), GateError::WriterAlreadyActive);

        drop(writer);
        let writer = gate.add_writer().unwrap().await.unwrap();
        assert_eq!(writer.id(), None);
    }

    // -----------------------------------------------------------------------
    // 5. Reader queue capacity
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn reader_queue_capacity() {
        let gate = AdmissionGate::new(GateConfig::default().with_reader_queue_size_limit(2));
        let first = gate.add_reader().unwrap();
        let second = gate.add_reader().unwrap();
        let err = gate.add_reader().unwrap_err();
        assert_eq!(err, GateError::ReaderQueueFull { limit: 2 });
        assert!(err.is_usage_error());

        // Once admitted, readers no longer count against the queue.
        let _first = first.await.unwrap();
        let _second = second.await.unwrap();
        let _third = gate.add_reader().unwrap().await.unwrap();
    }

    // -----------------------------------------------------------------------
    // 6. Disabled gate grants immediately
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn disabled_gate_grants_immediately() {
        let gate = AdmissionGate::new(GateConfig::disabled());
        let reader = gate.add_reader().unwrap().await.unwrap();
        let writer = gate.add_writer().unwrap().await.unwrap();
        let another = gate.add_writer().unwrap().await.unwrap();

        let status = gate.status();
        assert!(status.active_readers.is_empty());
        assert!(status.active_writer.is_none());
        reader.release();
        writer.release();
        another.release();
    }

    // -----------------------------------------------------------------------
    // 7. Abandoned requests are released once admitted
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn abandoned_request_is_released() {
        let gate = AdmissionGate::new(GateConfig::default());
        drop(gate.add_writer().unwrap());
        let reader = gate.add_reader().unwrap().await.unwrap();
        assert_eq!(reader.kind(), AccessKind::Reader);
        assert!(gate.status().active_writer.is_none());
    }

    // -----------------------------------------------------------------------
    // 8. Reader ids are scoped to the gate
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn reader_ids_are_per_gate() {
        let one = AdmissionGate::new(GateConfig::default());
        let two = AdmissionGate::new(GateConfig::default());

        let a = one.add_reader().unwrap().await.unwrap();
        let b = one.add_reader().unwrap().await.unwrap();
        let c = two.add_reader().unwrap().await.unwrap();
        assert_eq!(a.id(), Some(0));
        assert_eq!(b.id(), Some(1));
        assert_eq!(c.id(), Some(0));
    }
}
