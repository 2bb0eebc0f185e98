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

//! A small-footprint, synchronous implementation of the Constrained Application
//! Protocol (CoAP, [RFC 7252]) runtime core: a message codec, a client/server
//! [`Endpoint`](endpoint::Endpoint) with retransmission and a handler registry,
//! and [RFC 7959] blockwise transfer drivers.
//!
//! [RFC 7252]: https://tools.ietf.org/html/rfc7252
//! [RFC 7959]: https://tools.ietf.org/html/rfc7959
//!
//! ## Design
//!
//! Unlike many CoAP libraries, this crate does not build on `Future`/`async`
//! combinators. The endpoint is single-threaded and cooperative: every
//! operation either completes or returns [`Error::WouldBlock`] immediately.
//! Sending to a backpressured [`transport::DataSink`] never blocks the
//! caller; instead the endpoint is notified again once the sink becomes
//! writable. Handlers that need to respond after returning are handed a
//! [`endpoint::Responder`] and return `Err(Error::WouldBlock)` to signal an
//! asynchronous response is coming.
//!
//! The caller owns the run loop: feed inbound datagrams to
//! [`Endpoint::receive`](endpoint::Endpoint::receive), and drive
//! retransmissions by calling [`Endpoint::timer_fired`](endpoint::Endpoint::timer_fired)
//! when the scheduler you provide invokes its callback. Nothing in this
//! crate spawns a thread or owns an event loop.
//!
//! ## Example
//!
//! ```
//! use coap_core::endpoint::{Endpoint, HandlerRequest};
//! use coap_core::message::MsgCode;
//! use coap_core::trans_params::StandardCoapConstants;
//!
//! let mut endpoint = Endpoint::<StandardCoapConstants>::new(StandardCoapConstants);
//! endpoint.register_default_handler(Box::new(|_req: &HandlerRequest<'_>, _responder| {
//!     Ok(MsgCode::SuccessContent)
//! }));
//! ```

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

#[macro_use]
extern crate log;

pub mod message;
pub mod option;

mod content_format;
pub use content_format::ContentFormat;

mod block;
pub use block::*;

pub mod trans_params;
pub use trans_params::{StandardCoapConstants, TransParams};

pub mod consts;

mod error;
pub use error::*;

mod util;
use util::*;

mod etag;
pub use etag::ETag;

pub mod extended_error;
pub use extended_error::ExtendedError;

pub mod slab;

pub mod transport;

pub mod endpoint;
pub mod blockwise;


#[doc(hidden)]
pub mod prelude {
    pub use super::endpoint::{Endpoint, Responder};
    pub use super::ContentFormat;

    pub use super::message::Message;
    pub use super::message::MsgCode;
    pub use super::message::MsgCodeClass;
    pub use super::message::MsgId;
    pub use super::message::MsgToken;
    pub use super::message::MsgType;

    pub use super::option;
    pub use option::OptionInsert;
    pub use option::OptionInsertExt;
    pub use option::OptionIterator;
    pub use option::OptionIteratorExt;
    pub use option::OptionKey;
    pub use option::OptionNumber;

    pub use super::Error;
}

use prelude::*;
