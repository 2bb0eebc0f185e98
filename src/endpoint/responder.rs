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

use crate::message::{MsgId, MsgToken, MsgType};
use crate::transport::Metadata;

/// A deferred-response handle, created when an async-capable handler is
/// invoked for a request it doesn't answer immediately.
///
/// Holds just enough of the original request (its token, message id and
/// type, and the peer metadata) to build a matching response later, via
/// [`super::Endpoint::send_response`]. Dropping a `Responder` without
/// sending releases it without a response ever going out — callers that
/// want that to be explicit can call [`Responder::release`].
#[derive(Debug, Clone)]
pub struct Responder {
    pub(crate) token: MsgToken,
    pub(crate) request_msg_id: MsgId,
    pub(crate) request_was_confirmable: bool,
    pub(crate) metadata: Metadata,
    pub(crate) ack_already_sent: bool,
}

impl Responder {
    pub(crate) fn new(
        token: MsgToken,
        request_msg_id: MsgId,
        request_msg_type: MsgType,
        metadata: Metadata,
    ) -> Self {
        Responder {
            token,
            request_msg_id,
            request_was_confirmable: request_msg_type.is_con(),
            metadata,
            ack_already_sent: false,
        }
    }

    /// The token that must appear on the response for the client to
    /// recognize it.
    pub fn token(&self) -> MsgToken {
        self.token
    }

    /// The peer metadata a response should target.
    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    /// Releases this responder without sending a response.
    pub fn release(self) {}
}
