//! Consumer handle for a proxy stream

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::{OpenProxyError, Result};
use crate::models::{FetchReport, ProxyEndpoint, StreamState};

pin_project! {
    /// Endless stream of shuffled proxy endpoints.
    ///
    /// Yields `Ok` endpoints forever once the fetch phase is done. If no
    /// source produced anything, the only item is `Err(EmptyResult)`.
    /// Dropping the handle (or calling [`ProxyStream::close`]) stops the
    /// background work that feeds it.
    pub struct ProxyStream {
        id: Uuid,
        #[pin]
        inner: ReceiverStream<Result<ProxyEndpoint>>,
        state: watch::Receiver<StreamState>,
        report: watch::Receiver<Option<FetchReport>>,
        shutdown: watch::Sender<bool>,
    }

    impl PinnedDrop for ProxyStream {
        fn drop(this: Pin<&mut Self>) {
            let _ = this.project().shutdown.send(true);
        }
    }
}

impl ProxyStream {
    pub(crate) fn new(
        id: Uuid,
        output: mpsc::Receiver<Result<ProxyEndpoint>>,
        state: watch::Receiver<StreamState>,
        report: watch::Receiver<Option<FetchReport>>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            id,
            inner: ReceiverStream::new(output),
            state,
            report,
            shutdown,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Watch handle on the lifecycle state, for observers that do not pull
    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Outcome of the fetch phase, once it has finished
    pub fn report(&self) -> Option<FetchReport> {
        self.report.borrow().clone()
    }

    pub fn subscribe_report(&self) -> watch::Receiver<Option<FetchReport>> {
        self.report.clone()
    }

    /// Wait for the fetch phase to finish and return the snapshot size
    pub async fn ready(&mut self) -> Result<usize> {
        let state = match self.state.wait_for(StreamState::is_settled).await {
            Ok(settled) => StreamState::clone(&settled),
            Err(_) => return Err(OpenProxyError::StreamClosed),
        };

        match state {
            StreamState::Rotating { snapshot_size, .. } => Ok(snapshot_size),
            StreamState::Empty => Err(OpenProxyError::EmptyResult),
            _ => Err(OpenProxyError::StreamClosed),
        }
    }

    /// Pull the next endpoint.
    ///
    /// A stream that collected nothing keeps answering `EmptyResult`.
    pub async fn next_proxy(&mut self) -> Result<ProxyEndpoint> {
        match self.next().await {
            Some(item) => item,
            None if *self.state.borrow() == StreamState::Empty => {
                Err(OpenProxyError::EmptyResult)
            }
            None => Err(OpenProxyError::StreamClosed),
        }
    }

    /// Stop the stream and release its background work
    pub fn close(self) {
        // PinnedDrop signals the shutdown.
        drop(self);
    }
}

impl Stream for ProxyStream {
    type Item = Result<ProxyEndpoint>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}
