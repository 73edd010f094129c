use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{LocationId, ResolvedDay};
use crate::provider::DataProvider;
use crate::series::assemble_series;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeriesRequest {
    pub location: LocationId,
    pub window_days: u32,
}

/// A finished assembly for the most recent request.
#[derive(Debug)]
pub struct SeriesResponse {
    pub request: SeriesRequest,
    pub elapsed: Duration,
    pub series: Result<Vec<ResolvedDay>>,
}

struct Delivery {
    generation: u64,
    response: SeriesResponse,
}

/// Runs one series assembly at a time. A new request abandons the one in
/// flight; anything it still delivers is dropped.
pub struct SeriesSession<P: ?Sized> {
    provider: Arc<P>,
    generation: u64,
    pending: bool,
    in_flight: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl<P: DataProvider + ?Sized + 'static> SeriesSession<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        SeriesSession {
            provider,
            generation: 0,
            pending: false,
            in_flight: None,
            sender,
            receiver,
        }
    }

    pub fn request(&mut self, request: SeriesRequest) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        self.generation += 1;
        self.pending = true;
        info!(
            "Requesting {} days for location {} (request #{})",
            request.window_days, request.location, self.generation
        );

        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            let assembly = assemble_series(provider.as_ref(), request.location, request.window_days);
            let series = AssertUnwindSafe(assembly)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Assembly for location {} panicked", request.location);
                    Err(Error::Interrupted(request.location))
                });
            let response = SeriesResponse {
                request,
                elapsed: started.elapsed(),
                series,
            };
            // The session owns the receiver; a send only fails once it is gone.
            let _ = sender.send(Delivery {
                generation,
                response,
            });
        }));
    }

    /// Whether the latest request has not been answered yet.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Waits for the response to the latest request. Cancel safe.
    pub async fn next_response(&mut self) -> Option<SeriesResponse> {
        loop {
            let delivery = self.receiver.recv().await?;
            if delivery.generation != self.generation {
                debug!(
                    "Discarding stale response #{} for location {}",
                    delivery.generation, delivery.response.request.location
                );
                continue;
            }
            self.pending = false;
            self.in_flight = None;
            return Some(delivery.response);
        }
    }
}
