use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::MediumError;

pub(crate) type Job = BoxFuture<'static, ()>;

enum Message {
    Run(Job),
    Flush(oneshot::Sender<()>),
}

/// FIFO queue for one backend's asynchronous medium operations.
///
/// Jobs run one at a time, in submission order, on a single worker task.
/// The worker is spawned on first use and exits once the dispatcher is
/// dropped and the queue has drained.
pub(crate) struct Dispatcher {
    handle: Option<Handle>,
    queue: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    pending: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub(crate) fn new(handle: Option<Handle>) -> Self {
        Self {
            handle,
            queue: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn submit(&self, job: Job) -> Result<(), MediumError> {
        let sender = self.sender()?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        sender.send(Message::Run(job)).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            MediumError::NoRuntime("dispatcher worker stopped".to_string())
        })
    }

    fn sender(&self) -> Result<mpsc::UnboundedSender<Message>, MediumError> {
        let mut queue = self.queue.lock();
        if let Some(sender) = queue.as_ref() {
            return Ok(sender.clone());
        }

        let handle = self
            .handle
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| MediumError::NoRuntime("asynchronous medium".to_string()))?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<Message>();
        let pending = Arc::clone(&self.pending);
        handle.spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    Message::Run(job) => {
                        job.await;
                        pending.fetch_sub(1, Ordering::SeqCst);
                    }
                    Message::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        *queue = Some(sender.clone());
        Ok(sender)
    }

    /// Number of submitted jobs that have not finished.
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until the queue is empty, including jobs that running jobs
    /// submit while we wait.
    pub(crate) async fn settle(&self) {
        let sender = self.queue.lock().clone();
        let Some(sender) = sender else {
            return;
        };

        while self.pending() > 0 {
            let (done, finished) = oneshot::channel();
            if sender.send(Message::Flush(done)).is_err() || finished.await.is_err() {
                return;
            }
        }
    }
}
