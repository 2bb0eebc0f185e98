// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::message::{Message, MsgToken};
use crate::transport::Metadata;
use crate::Error;

/// The lifecycle state of an in-flight client request.
///
/// See the [`super::Endpoint`] docs for the transition diagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestState {
    /// Built, but not yet handed to the transport sink.
    ReadyToSend,
    /// Handed to the sink; waiting for an ACK or a matching response.
    WaitingForAck,
    /// An empty ACK was received; waiting for the separate CON response.
    Acked,
    /// Cancelled while the endpoint was iterating the request table; the
    /// slot is freed by the deferred cleanup pass once iteration ends.
    Cancelled,
}

/// Callbacks delivered to the owner of a request over its lifetime.
///
/// A request always ends with exactly one of [`on_response`][RequestListener::on_response] or
/// [`on_error`][RequestListener::on_error], optionally preceded by one
/// [`on_ack`][RequestListener::on_ack].
pub trait RequestListener {
    /// An empty ACK was received for a confirmable request; the response will
    /// arrive separately.
    fn on_ack(&mut self) {}

    /// A response (piggybacked or separate) was matched to this request.
    fn on_response(&mut self, response: &Message, metadata: Metadata) {
        let _ = (response, metadata);
    }

    /// The request terminated without a response: a transport error,
    /// RST, or a retransmission timeout.
    fn on_error(&mut self, error: Error) {
        let _ = error;
    }
}

/// State for one in-flight client request, held in the endpoint's request table.
pub(crate) struct RequestContext {
    pub(crate) message: Message,
    pub(crate) metadata: Metadata,
    pub(crate) token: MsgToken,
    pub(crate) state: RequestState,
    pub(crate) resend_timeout_ms: u64,
    pub(crate) resend_count: u32,
    pub(crate) max_resend_count: u32,
    pub(crate) listener: Option<Box<dyn RequestListener>>,
}
