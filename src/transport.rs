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

//! The byte-oriented datagram sink/source pair the endpoint sends to and
//! receives from.
//!
//! Nothing in this crate owns a socket or an event loop: the caller supplies
//! a [`DataSink`] at construction and is responsible for feeding inbound
//! datagrams to [`crate::endpoint::Endpoint::receive`] itself.

use crate::Error;
use std::collections::VecDeque;

/// Per-datagram metadata: either absent, or the peer's socket address.
///
/// On an inbound datagram this is the *source* address; on an outbound one
/// it is the *destination* address. The endpoint doesn't interpret it beyond
/// echoing an inbound source back as the matching outbound destination.
pub type Metadata = Option<std::net::SocketAddr>;

/// Called when a previously backpressured [`DataSink`] becomes writable again.
pub trait DataSinkListener {
    /// Invoked once the sink can accept another `put_data` call.
    fn on_can_put(&mut self);
}

/// A byte-oriented datagram sink.
///
/// `put_data` never blocks: it either accepts the datagram, reports
/// [`Error::WouldBlock`] (in which case the caller must retry after
/// `on_can_put` fires), or fails outright.
pub trait DataSink {
    /// Attempts to deliver `buffer` to the peer named by `metadata`.
    fn put_data(&mut self, buffer: &[u8], metadata: Metadata) -> Result<(), Error>;

    /// Registers (or, with `None`, unregisters) the writable-notification listener.
    fn set_listener(&mut self, listener: Option<Box<dyn DataSinkListener>>);
}

/// A byte-oriented datagram source.
///
/// The source doesn't push datagrams on its own; it is handed a sink to
/// route *its own* inbound datagrams to, mirroring how a real socket
/// implementation would hand inbound packets to the endpoint.
pub trait DataSource {
    /// Routes this source's incoming datagrams to `sink`.
    fn set_data_sink(&mut self, sink: Box<dyn DataSink>);
}

/// An in-memory [`DataSink`] that queues outgoing datagrams for later
/// inspection, used to drive the endpoint in tests without a real socket.
///
/// Call [`LoopbackTransport::set_blocked`] to simulate sink backpressure and
/// [`LoopbackTransport::take_sent`] to drain what was actually written.
#[derive(Default)]
pub struct LoopbackTransport {
    sent: VecDeque<(Vec<u8>, Metadata)>,
    blocked: bool,
    listener: Option<Box<dyn DataSinkListener>>,
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("sent", &self.sent.len())
            .field("blocked", &self.blocked)
            .finish()
    }
}

impl LoopbackTransport {
    /// Creates a new, unblocked `LoopbackTransport`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets whether `put_data` should report [`Error::WouldBlock`].
    ///
    /// Transitioning from blocked to unblocked fires the registered listener,
    /// if any, mimicking a real sink signaling writability.
    pub fn set_blocked(&mut self, blocked: bool) {
        let was_blocked = self.blocked;
        self.blocked = blocked;
        if was_blocked && !blocked {
            if let Some(listener) = self.listener.as_mut() {
                listener.on_can_put();
            }
        }
    }

    /// Removes and returns all datagrams accepted so far, oldest first.
    pub fn take_sent(&mut self) -> Vec<(Vec<u8>, Metadata)> {
        self.sent.drain(..).collect()
    }
}

impl DataSink for LoopbackTransport {
    fn put_data(&mut self, buffer: &[u8], metadata: Metadata) -> Result<(), Error> {
        if self.blocked {
            return Err(Error::WouldBlock);
        }
        self.sent.push_back((buffer.to_vec(), metadata));
        Ok(())
    }

    fn set_listener(&mut self, listener: Option<Box<dyn DataSinkListener>>) {
        self.listener = listener;
    }
}
