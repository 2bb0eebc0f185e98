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


//! The client/server CoAP runtime: message dispatch, retransmission, the
//! handler registry, and the outgoing response queue.
//!
//! [`Endpoint`] owns no socket and no event loop. The caller feeds it
//! inbound datagrams via [`Endpoint::receive`], drives retransmission by
//! calling [`Endpoint::timer_fired`] when its own timer fires, and tells it
//! when a previously-backpressured sink can accept more data via
//! [`Endpoint::on_writable`].

mod filter;
mod handler;
mod queue;
mod request;
mod responder;

pub use filter::{FilterResult, GroupRequestFilter, RequestFilter};
pub use handler::{HandlerFlags, HandlerRequest, RequestHandler};
pub use request::{RequestListener, RequestState};
pub use responder::Responder;

use handler::{path_is_prefix, HandlerEntry};
use queue::ResponseQueue;
use request::RequestContext;

use crate::message::{Message, MessageRead, MessageWrite, MsgCode, MsgId, MsgToken, MsgType};
use crate::message::{VecMessageEncoder};
use crate::option::{OptionInsert, OptionIteratorExt, OptionNumber};
use crate::slab::{Handle, Slab};
use crate::trans_params::TransParams;
use crate::transport::{DataSink, Metadata};
use crate::Error;
use std::time::Duration;

/// The maximum length of a caller-supplied token prefix.
///
/// Tokens are built as `prefix || be32(counter)`, so an 8-byte `MsgToken`
/// caps the prefix at 4 bytes.
pub const MAX_TOKEN_PREFIX_LEN: usize = 4;

enum TimerAction {
    Expired,
    Resend,
}

/// A CoAP client and server endpoint, parameterized by its retransmission
/// schedule (see [`TransParams`]).
pub struct Endpoint<P: TransParams> {
    params: P,
    sink: Option<Box<dyn DataSink>>,
    token_prefix: Vec<u8>,
    token_counter: u32,
    msg_id_counter: u16,
    requests: Slab<RequestContext>,
    response_queue: ResponseQueue,
    handlers: Vec<HandlerEntry>,
    default_handler: Option<Box<dyn RequestHandler>>,
    filters: Vec<Box<dyn RequestFilter>>,
    locked: bool,
    pending_removals: Vec<Handle>,
    send_requests_first: bool,
}

impl<P: TransParams> std::fmt::Debug for Endpoint<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("requests", &self.requests.len())
            .field("handlers", &self.handlers.len())
            .field("filters", &self.filters.len())
            .field("has_default_handler", &self.default_handler.is_some())
            .field("has_transport", &self.sink.is_some())
            .finish()
    }
}

impl<P: TransParams> Endpoint<P> {
    /// Creates a new endpoint with no transport attached yet.
    ///
    /// Sending anything before [`Endpoint::set_transport`] is called fails
    /// with [`Error::NotSupported`].
    pub fn new(params: P) -> Self {
        Endpoint {
            params,
            sink: None,
            token_prefix: Vec::new(),
            token_counter: rand::random(),
            msg_id_counter: rand::random(),
            requests: Slab::new(),
            response_queue: ResponseQueue::new(queue::DEFAULT_CAPACITY),
            handlers: Vec::new(),
            default_handler: None,
            filters: Vec::new(),
            locked: false,
            pending_removals: Vec::new(),
            send_requests_first: true,
        }
    }

    /// Attaches (or replaces) the transport this endpoint sends datagrams to.
    pub fn set_transport(&mut self, sink: Box<dyn DataSink>) {
        self.sink = Some(sink);
    }

    /// Sets the prefix prepended to every generated token, up to
    /// [`MAX_TOKEN_PREFIX_LEN`] bytes.
    ///
    /// Useful for telling apart tokens minted by different endpoint
    /// instances sharing the same transport.
    pub fn set_token_prefix(&mut self, prefix: &[u8]) -> Result<(), Error> {
        if prefix.len() > MAX_TOKEN_PREFIX_LEN {
            return Err(Error::InvalidArgument);
        }
        self.token_prefix = prefix.to_vec();
        Ok(())
    }

    /// The currently configured token prefix.
    pub fn token_prefix(&self) -> &[u8] {
        &self.token_prefix
    }

    /// Registers `handler` for requests whose path starts with `path`'s
    /// segments (a plain path match, not a prefix of arbitrary strings:
    /// `"foo"` matches `"foo"` and `"foo/bar"` but not `"foobar"`).
    pub fn register_request_handler(
        &mut self,
        path: &str,
        flags: HandlerFlags,
        handler: Box<dyn RequestHandler>,
    ) {
        self.handlers.push(HandlerEntry {
            path: path.trim_matches('/').to_string(),
            flags,
            handler,
        });
    }

    /// Removes the handler registered under `path`, if any.
    pub fn unregister_request_handler(&mut self, path: &str) {
        let path = path.trim_matches('/');
        self.handlers.retain(|h| h.path != path);
    }

    /// Sets the handler invoked for requests that match no registered path.
    pub fn register_default_handler(&mut self, handler: Box<dyn RequestHandler>) {
        self.default_handler = Some(handler);
    }

    /// Appends a filter to the chain run, in registration order, before
    /// every handler invocation.
    pub fn register_request_filter(&mut self, filter: Box<dyn RequestFilter>) {
        self.filters.push(filter);
    }

    /// Removes every registered filter.
    pub fn clear_request_filters(&mut self) {
        self.filters.clear();
    }

    pub(crate) fn next_token(&mut self) -> MsgToken {
        self.token_counter = self.token_counter.wrapping_add(1);
        let mut bytes = self.token_prefix.clone();
        bytes.extend_from_slice(&self.token_counter.to_be_bytes());
        MsgToken::new(&bytes)
    }

    pub(crate) fn next_msg_id(&mut self) -> MsgId {
        self.msg_id_counter = self.msg_id_counter.wrapping_add(1);
        self.msg_id_counter
    }

    fn queue_new_request(
        &mut self,
        message: Message,
        metadata: Metadata,
        listener: Option<Box<dyn RequestListener>>,
    ) -> Handle {
        let token = message.msg_token();
        let ctx = RequestContext {
            message,
            metadata,
            token,
            state: RequestState::ReadyToSend,
            resend_timeout_ms: self.params.pick_initial_timeout().as_millis() as u64,
            resend_count: 0,
            max_resend_count: self.params.coap_max_retransmit(),
            listener,
        };

        let handle = self.requests.insert(ctx);
        self.drain();
        handle
    }

    /// Sends a caller-built message directly, bypassing the URI-path
    /// request builder in [`Endpoint::send_request`].
    ///
    /// Used by the blockwise drivers to attach `BLOCK1`/`BLOCK2`/`ETag`/
    /// `If-Match` options that a plain `send_request` call has no way to
    /// express. `message` must already carry a unique token (see
    /// [`Endpoint::next_token`]) and message id (see [`Endpoint::next_msg_id`]).
    pub(crate) fn send_prepared_request(
        &mut self,
        message: Message,
        metadata: Metadata,
        listener: Option<Box<dyn RequestListener>>,
    ) -> Result<Handle, Error> {
        Ok(self.guarded(|ep| ep.queue_new_request(message, metadata, listener)))
    }

    /// Builds and sends a confirmable request to `path`, returning a handle
    /// that can be used to look up its retransmission timeout or cancel it.
    ///
    /// `listener` is notified of the ACK, the eventual response, or a
    /// terminal error (reset, timeout, or transport failure).
    pub fn send_request(
        &mut self,
        method: MsgCode,
        path: &str,
        payload: &[u8],
        metadata: Metadata,
        listener: Option<Box<dyn RequestListener>>,
    ) -> Result<Handle, Error> {
        self.guarded(|ep| ep.send_request_locked(method, path, payload, metadata, listener))
    }

    fn send_request_locked(
        &mut self,
        method: MsgCode,
        path: &str,
        payload: &[u8],
        metadata: Metadata,
        listener: Option<Box<dyn RequestListener>>,
    ) -> Result<Handle, Error> {
        let token = self.next_token();
        let msg_id = self.next_msg_id();

        let mut encoder = VecMessageEncoder::with_payload_capacity(payload.len());
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(method);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(token);
        for seg in path.trim_matches('/').split('/').filter(|s| !s.is_empty()) {
            encoder.insert_option_with_str(OptionNumber::URI_PATH, seg)?;
        }
        encoder.append_payload_bytes(payload)?;

        let message: Message = encoder.into();

        Ok(self.queue_new_request(message, metadata, listener))
    }

    /// Cancels a pending request.
    ///
    /// If the endpoint is currently iterating its request table (e.g. this
    /// is called from within another request's `on_error`/`on_response`),
    /// the slot is marked cancelled and freed once iteration ends, rather
    /// than removed immediately.
    ///
    /// Returns [`Error::NoSuchItem`] if `handle` names no live request, or
    /// one that's already been cancelled.
    pub fn cancel_request(&mut self, handle: Handle) -> Result<(), Error> {
        let ctx = self.requests.get_mut(handle).ok_or(Error::NoSuchItem)?;
        if ctx.state == RequestState::Cancelled {
            return Err(Error::NoSuchItem);
        }
        if self.locked {
            ctx.state = RequestState::Cancelled;
            self.pending_removals.push(handle);
        } else {
            self.requests.remove(handle);
        }
        Ok(())
    }

    /// The delay to wait before the next (re)transmission of `handle`, for
    /// the caller's own timer scheduler to act on.
    ///
    /// Returns `None` if `handle` names no live request.
    pub fn retransmit_timeout(&self, handle: Handle) -> Option<Duration> {
        self.requests
            .get(handle)
            .map(|ctx| Duration::from_millis(ctx.resend_timeout_ms))
    }

    /// Drives the retransmission schedule for `handle`.
    ///
    /// The caller's timer scheduler should call this once the delay
    /// returned by [`Endpoint::retransmit_timeout`] (as of the last send or
    /// the previous `timer_fired` call) has elapsed. A no-op if `handle`
    /// names no live request, or one that was cancelled or already
    /// answered.
    pub fn timer_fired(&mut self, handle: Handle) {
        self.guarded(|ep| ep.timer_fired_locked(handle));
    }

    fn timer_fired_locked(&mut self, handle: Handle) {
        let action = match self.requests.get_mut(handle) {
            None => return,
            Some(ctx) if ctx.state == RequestState::Cancelled => return,
            Some(ctx) if ctx.resend_count >= ctx.max_resend_count => TimerAction::Expired,
            Some(ctx) => {
                ctx.resend_count += 1;
                ctx.resend_timeout_ms *= 2;
                ctx.state = RequestState::ReadyToSend;
                TimerAction::Resend
            }
        };

        match action {
            TimerAction::Expired => {
                if let Some(mut ctx) = self.requests.remove(handle) {
                    if let Some(mut listener) = ctx.listener.take() {
                        listener.on_error(Error::Timeout);
                    }
                }
            }
            TimerAction::Resend => self.drain(),
        }
    }

    /// Tells the endpoint a previously backpressured transport sink can
    /// accept more data, giving it a chance to flush the response queue
    /// and any requests still waiting to go out.
    pub fn on_writable(&mut self) {
        self.guarded(|ep| ep.drain());
    }

    /// Feeds one inbound datagram to the endpoint.
    ///
    /// Malformed datagrams are logged and dropped; this never returns an
    /// error to the caller, matching the fire-and-forget nature of UDP.
    pub fn receive(&mut self, datagram: &[u8], metadata: Metadata) {
        self.guarded(|ep| ep.receive_locked(datagram, metadata));
    }

    fn receive_locked(&mut self, datagram: &[u8], metadata: Metadata) {
        let message = match Message::from_datagram(datagram.to_vec()) {
            Ok(m) => m,
            Err(e) => {
                debug!("dropping malformed datagram: {:?}", e);
                return;
            }
        };

        if message.msg_type().is_res() {
            self.handle_reset(&message);
            return;
        }

        if message.msg_code() == MsgCode::Empty {
            if message.msg_type().is_ack() {
                self.handle_empty_ack(&message);
            }
            return;
        }

        if message.msg_code().is_method() {
            self.handle_request(message, metadata);
        } else {
            self.handle_response(message, metadata);
        }
    }

    fn handle_empty_ack(&mut self, message: &Message) {
        let msg_id = message.msg_id();
        let found = self.requests.iter_mut().find(|(_, ctx)| {
            ctx.state == RequestState::WaitingForAck && ctx.message.msg_id() == msg_id
        });

        if let Some((_, ctx)) = found {
            ctx.state = RequestState::Acked;
            if let Some(listener) = ctx.listener.as_mut() {
                listener.on_ack();
            }
        }
    }

    fn handle_reset(&mut self, message: &Message) {
        let msg_id = message.msg_id();
        let handle = self
            .requests
            .iter()
            .find(|(_, ctx)| ctx.message.msg_id() == msg_id)
            .map(|(h, _)| h);

        if let Some(handle) = handle {
            if let Some(mut ctx) = self.requests.remove(handle) {
                if let Some(mut listener) = ctx.listener.take() {
                    listener.on_error(Error::Reset);
                }
            }
        }
    }

    fn handle_response(&mut self, message: Message, metadata: Metadata) {
        let token = message.msg_token();
        let handle = self
            .requests
            .iter()
            .find(|(_, ctx)| ctx.state != RequestState::Cancelled && ctx.token == token)
            .map(|(h, _)| h);

        let handle = match handle {
            Some(h) => h,
            None => {
                debug!("no matching request for token {}", token);
                return;
            }
        };

        if message.msg_type().is_con() {
            self.enqueue_empty_ack(message.msg_id(), metadata);
        }

        if let Some(mut ctx) = self.requests.remove(handle) {
            if let Some(mut listener) = ctx.listener.take() {
                listener.on_response(&message, metadata);
            }
        }
    }

    fn enqueue_empty_ack(&mut self, request_msg_id: MsgId, metadata: Metadata) {
        let mut encoder = VecMessageEncoder::new();
        encoder.set_msg_type(MsgType::Ack);
        encoder.set_msg_code(MsgCode::Empty);
        encoder.set_msg_id(request_msg_id);
        let bytes: Vec<u8> = encoder.into();
        if !self.response_queue.push_back(bytes, metadata) {
            debug!("response queue full, dropping ack for message id {}", request_msg_id);
        }
    }

    fn handle_request(&mut self, message: Message, metadata: Metadata) {
        let path = match message.options().extract_uri_path() {
            Ok(p) => p,
            Err(_) => {
                self.enqueue_response_to(&message, metadata, MsgCode::ClientErrorBadRequest);
                return;
            }
        };

        let idx = self
            .handlers
            .iter()
            .position(|h| path_is_prefix(&h.path, &path));

        let flags = match idx {
            Some(i) => self.handlers[i].flags,
            None if self.default_handler.is_some() => HandlerFlags::default(),
            None => {
                self.enqueue_response_to(&message, metadata, MsgCode::ClientErrorNotFound);
                return;
            }
        };

        if !flags.allows_method(message.msg_code()) {
            self.enqueue_response_to(&message, metadata, MsgCode::ClientErrorMethodNotAllowed);
            return;
        }

        for filter in self.filters.iter_mut() {
            match filter.filter_request(&message, flags) {
                Ok(FilterResult::Continue) => continue,
                Ok(FilterResult::Respond(code)) => {
                    self.enqueue_response_bytes(&message, metadata, code, &[]);
                    return;
                }
                Err(e) => {
                    debug!("request filter failed: {:?}", e);
                    self.enqueue_response_to(&message, metadata, MsgCode::ServerErrorInternalServerError);
                    return;
                }
            }
        }

        let matched_path = idx.map(|i| self.handlers[i].path.clone()).unwrap_or_default();
        let request_view = HandlerRequest {
            message: &message,
            matched_path: &matched_path,
            metadata,
        };

        let responder = if flags.allows_async() {
            Some(Responder::new(
                message.msg_token(),
                message.msg_id(),
                message.msg_type(),
                metadata,
            ))
        } else {
            None
        };

        let result = match idx {
            Some(i) => self.handlers[i].handler.handle_request(&request_view, responder),
            None => self
                .default_handler
                .as_mut()
                .expect("checked above")
                .handle_request(&request_view, responder),
        };

        match result {
            Ok(code) => self.enqueue_response_bytes(&message, metadata, code, &[]),
            Err(Error::WouldBlock) => {
                // Either a Responder was handed out and will be used later,
                // or the handler already answered out-of-band.
            }
            Err(e) => {
                debug!("request handler failed: {:?}", e);
                self.enqueue_response_to(&message, metadata, MsgCode::ServerErrorInternalServerError);
            }
        }
    }

    fn enqueue_response_to(&mut self, request: &Message, metadata: Metadata, code: MsgCode) {
        self.enqueue_response_bytes(request, metadata, code, &[]);
    }

    fn enqueue_response_bytes(
        &mut self,
        request: &Message,
        metadata: Metadata,
        code: MsgCode,
        payload: &[u8],
    ) {
        let ack = request.msg_type().is_con();
        let msg_id = if ack { request.msg_id() } else { self.next_msg_id() };

        let mut encoder = VecMessageEncoder::with_payload_capacity(payload.len());
        encoder.set_msg_type(if ack { MsgType::Ack } else { MsgType::Non });
        encoder.set_msg_code(code);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(request.msg_token());
        if let Err(e) = encoder.append_payload_bytes(payload) {
            error!("failed to build response payload: {:?}", e);
            return;
        }

        let bytes: Vec<u8> = encoder.into();
        if !self.response_queue.push_back(bytes, metadata) {
            debug!("response queue full, dropping response");
        } else {
            self.drain_responses();
        }
    }

    /// Sends a response for a request that was deferred via a [`Responder`].
    ///
    /// The first call for a given `responder` piggybacks on the original
    /// request's ACK if it was confirmable and hasn't been acked yet;
    /// subsequent calls (and all calls for non-confirmable requests) go out
    /// as separate `NON` messages with fresh message ids.
    ///
    /// Returns [`Error::OutOfResources`] if the response queue is full.
    pub fn send_response(
        &mut self,
        responder: &mut Responder,
        code: MsgCode,
        payload: &[u8],
    ) -> Result<(), Error> {
        self.guarded(|ep| ep.send_response_locked(responder, code, payload))
    }

    fn send_response_locked(
        &mut self,
        responder: &mut Responder,
        code: MsgCode,
        payload: &[u8],
    ) -> Result<(), Error> {
        let ack = responder.request_was_confirmable && !responder.ack_already_sent;
        let msg_id = if ack {
            responder.request_msg_id
        } else {
            self.next_msg_id()
        };

        let mut encoder = VecMessageEncoder::with_payload_capacity(payload.len());
        encoder.set_msg_type(if ack { MsgType::Ack } else { MsgType::Non });
        encoder.set_msg_code(code);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(responder.token);
        encoder.append_payload_bytes(payload)?;

        let bytes: Vec<u8> = encoder.into();
        if !self.response_queue.push_back(bytes, responder.metadata) {
            return Err(Error::OutOfResources);
        }

        responder.ack_already_sent = true;
        self.drain_responses();
        Ok(())
    }

    /// An alias for [`Endpoint::send_response`], for callers that think of
    /// "create" and "send" as separate steps; this synchronous endpoint
    /// collapses them into one.
    pub fn create_response(
        &mut self,
        responder: &mut Responder,
        code: MsgCode,
        payload: &[u8],
    ) -> Result<(), Error> {
        self.send_response(responder, code, payload)
    }

    fn drain(&mut self) {
        if self.send_requests_first {
            self.drain_requests();
            self.drain_responses();
        } else {
            self.drain_responses();
            self.drain_requests();
        }
        self.send_requests_first = !self.send_requests_first;
    }

    fn drain_requests(&mut self) {
        let pending: Vec<Handle> = self
            .requests
            .iter()
            .filter(|(_, ctx)| ctx.state == RequestState::ReadyToSend)
            .map(|(h, _)| h)
            .collect();

        for handle in pending {
            let (bytes, metadata) = match self.requests.get(handle) {
                Some(ctx) if ctx.state == RequestState::ReadyToSend => {
                    (ctx.message.as_bytes().to_vec(), ctx.metadata)
                }
                _ => continue,
            };

            match self.put_data(&bytes, metadata) {
                Ok(()) => {
                    if let Some(ctx) = self.requests.get_mut(handle) {
                        ctx.state = RequestState::WaitingForAck;
                    }
                }
                Err(Error::WouldBlock) => break,
                Err(e) => {
                    if let Some(mut ctx) = self.requests.remove(handle) {
                        if let Some(mut listener) = ctx.listener.take() {
                            listener.on_error(e);
                        }
                    }
                }
            }
        }
    }

    fn drain_responses(&mut self) {
        while let Some((bytes, metadata)) = self.response_queue.front() {
            let next = (bytes.clone(), *metadata);

            match self.put_data(&next.0, next.1) {
                Ok(()) => self.response_queue.pop_front(),
                Err(Error::WouldBlock) => break,
                Err(e) => {
                    debug!("dropping response after send failure: {:?}", e);
                    self.response_queue.pop_front();
                }
            }
        }
    }

    fn put_data(&mut self, bytes: &[u8], metadata: Metadata) -> Result<(), Error> {
        match self.sink.as_mut() {
            Some(sink) => sink.put_data(bytes, metadata),
            None => Err(Error::NotSupported),
        }
    }

    fn apply_pending_removals(&mut self) {
        for handle in self.pending_removals.drain(..) {
            self.requests.remove(handle);
        }
    }

    fn guarded<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_locked = self.locked;
        self.locked = true;
        let result = f(self);
        if !was_locked {
            self.locked = false;
            self.apply_pending_removals();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trans_params::StandardCoapConstants;
    use crate::transport::LoopbackTransport;

    fn endpoint_with_loopback() -> Endpoint<StandardCoapConstants> {
        let mut ep = Endpoint::new(StandardCoapConstants);
        ep.set_transport(Box::new(LoopbackTransport::new()));
        ep
    }

    #[test]
    fn send_request_builds_con_with_uri_path() {
        let mut ep = endpoint_with_loopback();
        let handle = ep
            .send_request(MsgCode::MethodGet, "sensors/temp", b"", None, None)
            .unwrap();
        assert!(ep.retransmit_timeout(handle).is_some());
    }

    #[test]
    fn cancel_unknown_handle_is_no_such_item() {
        let mut ep = endpoint_with_loopback();
        let handle = ep
            .send_request(MsgCode::MethodGet, "foo", b"", None, None)
            .unwrap();
        assert!(ep.cancel_request(handle).is_ok());
        assert_eq!(ep.cancel_request(handle), Err(Error::NoSuchItem));
    }

    #[test]
    fn default_handler_answers_unmatched_paths() {
        let mut ep = endpoint_with_loopback();
        ep.register_default_handler(Box::new(|_req: &HandlerRequest<'_>, _resp| {
            Ok(MsgCode::SuccessContent)
        }));

        let mut req = VecMessageEncoder::new();
        req.set_msg_type(MsgType::Con);
        req.set_msg_code(MsgCode::MethodGet);
        req.set_msg_id(42);
        req.set_msg_token(MsgToken::new(&[1, 2, 3]));
        let datagram: Vec<u8> = req.into();

        ep.receive(&datagram, None);

        // Drain happens synchronously inside enqueue; pull the sent bytes
        // back out of the loopback transport via a second handle.
    }

    #[test]
    fn method_not_allowed_for_unregistered_verb() {
        let mut ep = endpoint_with_loopback();
        ep.register_request_handler(
            "foo",
            HandlerFlags(HandlerFlags::ALLOW_GET),
            Box::new(|_req: &HandlerRequest<'_>, _resp| Ok(MsgCode::SuccessContent)),
        );

        let mut req = VecMessageEncoder::new();
        req.set_msg_type(MsgType::Con);
        req.set_msg_code(MsgCode::MethodPost);
        req.set_msg_id(7);
        req.set_msg_token(MsgToken::new(&[9]));
        for seg in ["foo"] {
            req.insert_option_with_str(OptionNumber::URI_PATH, seg).unwrap();
        }
        let datagram: Vec<u8> = req.into();

        ep.receive(&datagram, None);
    }

    #[test]
    fn request_entry_retries_then_times_out() {
        struct Listener {
            errors: std::rc::Rc<std::cell::RefCell<Vec<Error>>>,
        }
        impl RequestListener for Listener {
            fn on_error(&mut self, error: Error) {
                self.errors.borrow_mut().push(error);
            }
        }

        let mut ep = endpoint_with_loopback();
        let errors = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let handle = ep
            .send_request(
                MsgCode::MethodGet,
                "foo",
                b"",
                None,
                Some(Box::new(Listener {
                    errors: errors.clone(),
                })),
            )
            .unwrap();

        for _ in 0..=StandardCoapConstants::COAP_MAX_RETRANSMIT {
            ep.timer_fired(handle);
        }

        assert_eq!(*errors.borrow(), vec![Error::Timeout]);
    }
}
