//! Session: binds a [`Poller`] to a [`Backend`].
//!
//! Requests run as spawned tasks and report back through an `mpsc`
//! channel; the owner of the session feeds those completions to
//! [`Session::on_completion`] from its event loop, so the poller is only
//! ever touched from one place.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::action::UserAction;
use crate::backend::Backend;
use crate::error::ClientError;
use crate::poller::{Poller, Request};
use crate::view::View;

/// The outcome of one request.
#[derive(Debug)]
pub struct Completion {
    pub request: Request,
    pub outcome: Result<String, ClientError>,
}

pub struct Session<B: Backend, V: View> {
    poller: Poller<V>,
    backend: Arc<B>,
    completion_tx: mpsc::Sender<Completion>,
    requests_sent: u64,
}

impl<B: Backend, V: View> Session<B, V> {
    pub fn new(poller: Poller<V>, backend: Arc<B>) -> (Self, mpsc::Receiver<Completion>) {
        let (completion_tx, completion_rx) = mpsc::channel(64);
        (
            Self {
                poller,
                backend,
                completion_tx,
                requests_sent: 0,
            },
            completion_rx,
        )
    }

    pub fn poller(&self) -> &Poller<V> {
        &self.poller
    }

    pub fn poller_mut(&mut self) -> &mut Poller<V> {
        &mut self.poller
    }

    pub fn view(&self) -> &V {
        self.poller.view()
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    fn dispatch(&mut self, request: Request) {
        self.requests_sent += 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.fetch(&request.endpoint).await;
            if tx.send(Completion { request, outcome }).await.is_err() {
                trace!("session gone; dropping completion");
            }
        });
    }

    /// Poll now unless a poll is outstanding. Returns whether a request went out.
    pub fn poll(&mut self) -> bool {
        match self.poller.poll(Instant::now()) {
            Some(request) => {
                self.dispatch(request);
                true
            }
            None => false,
        }
    }

    pub fn perform(&mut self, action: &UserAction) {
        if let Some(request) = self.poller.action(action, Instant::now()) {
            self.dispatch(request);
        }
    }

    pub fn tick(&mut self) {
        if let Some(request) = self.poller.tick(Instant::now()) {
            self.dispatch(request);
        }
    }

    pub fn on_completion(&mut self, completion: Completion) {
        debug!(
            "completed {} ({})",
            completion.request.endpoint.path(),
            if completion.outcome.is_ok() { "ok" } else { "failed" }
        );
        self.poller.complete(&completion.request, completion.outcome);
    }
}
