//! The message channel between the privileged dispatcher and the in-page
//! executor: strict request/reply, no fire-and-forget. The page side is an
//! actor servicing one request at a time, like its execution context would
//! in a real document.

use crate::dom::Dom;
use crate::executor::PageExecutor;
use tabweave_common::protocol::{PageRequest, PageResponse};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum PageChannelError {
    #[error("page channel closed")]
    Closed,
}

struct Envelope {
    request: PageRequest,
    reply: oneshot::Sender<PageResponse>,
}

/// Sending half held by the privileged side.
#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::Sender<Envelope>,
}

impl PageHandle {
    /// Round-trip one request. Blocks the caller until the page replies or
    /// the channel dies.
    pub async fn request(&self, request: PageRequest) -> Result<PageResponse, PageChannelError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| PageChannelError::Closed)?;
        rx.await.map_err(|_| PageChannelError::Closed)
    }
}

/// Spawn a page executor servicing requests over a channel. The join handle
/// resolves with the executor once every `PageHandle` is dropped, which lets
/// tests inspect the final document state.
pub fn spawn_page<D: Dom + Send + 'static>(dom: D) -> (PageHandle, JoinHandle<PageExecutor<D>>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(16);
    let task = tokio::spawn(async move {
        let mut executor = PageExecutor::new(dom);
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let response = executor.execute(&request);
            // A caller that gave up mid-flight is not an error here.
            let _ = reply.send(response);
        }
        executor
    });
    (PageHandle { tx }, task)
}
