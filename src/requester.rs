use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::sync::MutexExt;
use crate::transport::{RawResponse, Transport};
use crate::types::{Credential, RequestId};

const FORMAT_INDENT: &[u8] = b"   ";

/// Decoded JSON object answer.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ProfileResponse {
    pub status: u16,
    pub body: Map<String, Value>,
    /// `body` pretty-printed with a three-space indent, ready for display.
    pub formatted: String,
}

impl ProfileResponse {
    fn decode(raw: RawResponse) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(&raw.body)?;
        let Value::Object(body) = value else {
            return Err(Error::Decode("response body is not a JSON object".into()));
        };
        let formatted = format_indented(&body)?;
        Ok(Self {
            status: raw.status,
            body,
            formatted,
        })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn format_indented(body: &Map<String, Value>) -> Result<String, Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(FORMAT_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(body, &mut ser)?;
    String::from_utf8(out).map_err(|e| Error::Decode(e.to_string()))
}

/// Result of the call identified by `id`.
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub result: Result<ProfileResponse, Error>,
}

/// Receiving side of a [`SingleFlightRequester`].
///
/// Only completions of calls that were still live when they finished arrive
/// here; superseded and cancelled calls are dropped silently.
#[derive(Debug)]
pub struct Completions {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl Completions {
    /// Next completion, or `None` once the requester and all its calls are gone.
    pub async fn recv(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    live: Option<InFlight>,
}

impl Slot {
    /// Cancel and discard the live call, if any.
    fn clear(&mut self) -> Option<RequestId> {
        self.live.take().map(|prev| {
            prev.cancel.cancel();
            prev.id
        })
    }
}

/// Keeps at most one authenticated request outstanding.
///
/// Issuing a request cancels the previous one. A call's completion is only
/// delivered if it is still the live call at the moment it finishes; the check
/// and the delivery happen under the same lock that [`request`](Self::request)
/// takes, so a superseded call can never deliver after its replacement.
pub struct SingleFlightRequester<T> {
    transport: Arc<T>,
    slot: Arc<Mutex<Slot>>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<T: Transport> SingleFlightRequester<T> {
    #[must_use]
    pub fn new(transport: T) -> (Self, Completions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let requester = Self {
            transport: Arc::new(transport),
            slot: Arc::default(),
            completions: tx,
        };
        (requester, Completions { rx })
    }

    /// Issue `GET endpoint` with `credential`, replacing any live call.
    ///
    /// Returns immediately; the outcome arrives on [`Completions`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn request(&self, credential: Credential, endpoint: impl Into<String>) -> RequestId {
        let endpoint = endpoint.into();
        let cancel = CancellationToken::new();

        let id = {
            let mut slot = self.slot.lock_or_recover();
            if let Some(prev) = slot.clear() {
                tracing::debug!(request = %prev, "Cancelled superseded request");
            }
            slot.next_id += 1;
            let id = RequestId(slot.next_id);
            slot.live = Some(InFlight {
                id,
                cancel: cancel.clone(),
            });
            id
        };

        tracing::debug!(request = %id, endpoint = %endpoint, "Issuing request");

        let transport = Arc::clone(&self.transport);
        let slot = Arc::clone(&self.slot);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let raw = tokio::select! {
                () = cancel.cancelled() => return,
                raw = transport.get(&credential, &endpoint) => raw,
            };
            let result = raw.and_then(ProfileResponse::decode);
            deliver(&slot, &completions, id, result);
        });

        id
    }

    /// Cancel the live call without issuing a new one.
    pub fn cancel(&self) -> Option<RequestId> {
        let cancelled = self.slot.lock_or_recover().clear();
        if let Some(id) = cancelled {
            tracing::debug!(request = %id, "Cancelled request");
        }
        cancelled
    }

    /// Identity of the live call, if one is outstanding.
    #[must_use]
    pub fn in_flight(&self) -> Option<RequestId> {
        self.slot.lock_or_recover().live.as_ref().map(|l| l.id)
    }
}

impl<T> Drop for SingleFlightRequester<T> {
    fn drop(&mut self) {
        self.slot.lock_or_recover().clear();
    }
}

fn deliver(
    slot: &Mutex<Slot>,
    completions: &mpsc::UnboundedSender<Completion>,
    id: RequestId,
    result: Result<ProfileResponse, Error>,
) {
    let mut slot = slot.lock_or_recover();
    match &slot.live {
        Some(live) if live.id == id && !live.cancel.is_cancelled() => {
            slot.live = None;
            match &result {
                Ok(response) => {
                    tracing::debug!(request = %id, status = response.status, "Request completed");
                }
                Err(e) => tracing::warn!(request = %id, error = %e, "Request failed"),
            }
            // Receiver gone means nobody is listening any more.
            let _ = completions.send(Completion { id, result });
        }
        _ => tracing::debug!(request = %id, "Dropping stale completion"),
    }
}
