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

use super::Responder;
use crate::message::{MessageRead, MsgCode};
use crate::transport::Metadata;
use crate::Error;

/// Bitmask controlling which methods a handler accepts, which groups it
/// belongs to, and whether it may respond asynchronously.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HandlerFlags(pub u32);

impl HandlerFlags {
    /// Accept `GET` requests.
    pub const ALLOW_GET: u32 = 1 << 0;
    /// Accept `POST` requests.
    pub const ALLOW_POST: u32 = 1 << 1;
    /// Accept `PUT` requests.
    pub const ALLOW_PUT: u32 = 1 << 2;
    /// Accept `DELETE` requests.
    pub const ALLOW_DELETE: u32 = 1 << 3;
    /// Accept all four methods.
    pub const ALLOW_ALL: u32 =
        Self::ALLOW_GET | Self::ALLOW_POST | Self::ALLOW_PUT | Self::ALLOW_DELETE;

    /// The handler may return [`Error::WouldBlock`] holding on to a
    /// [`Responder`] to answer later. Without this flag, a handler
    /// returning `WouldBlock` is taken to mean "I already responded
    /// out-of-band".
    pub const ENABLE_ASYNC: u32 = 1 << 4;

    const GROUP_SHIFT: u32 = 5;

    /// Builds a group-membership mask for group numbers `0..4`.
    pub fn group_mask(group: u8) -> u32 {
        1 << (Self::GROUP_SHIFT + group as u32)
    }

    /// Returns true if this handler accepts `method`.
    pub fn allows_method(self, method: MsgCode) -> bool {
        let bit = match method {
            MsgCode::MethodGet => Self::ALLOW_GET,
            MsgCode::MethodPost => Self::ALLOW_POST,
            MsgCode::MethodPut => Self::ALLOW_PUT,
            MsgCode::MethodDelete => Self::ALLOW_DELETE,
            _ => return false,
        };
        self.0 & bit != 0
    }

    /// Returns true if this handler is a member of `group` (`0..4`).
    ///
    /// Every handler is implicitly a member of group 0, even if it opted
    /// into no groups explicitly.
    pub fn is_in_group(self, group: u8) -> bool {
        group == 0 || self.0 & Self::group_mask(group) != 0
    }

    /// Returns true if [`ENABLE_ASYNC`][Self::ENABLE_ASYNC] is set.
    pub fn allows_async(self) -> bool {
        self.0 & Self::ENABLE_ASYNC != 0
    }
}

impl Default for HandlerFlags {
    fn default() -> Self {
        HandlerFlags(Self::ALLOW_ALL)
    }
}

impl std::ops::BitOr for HandlerFlags {
    type Output = HandlerFlags;
    fn bitor(self, rhs: Self) -> Self::Output {
        HandlerFlags(self.0 | rhs.0)
    }
}

/// The view of an inbound request handed to a [`RequestHandler`] or [`super::RequestFilter`].
pub struct HandlerRequest<'a> {
    /// The parsed inbound request message.
    pub message: &'a dyn MessageRead,

    /// The path segment the matched handler was registered under.
    pub matched_path: &'a str,

    /// Source-address metadata carried with the inbound datagram, if any.
    pub metadata: Metadata,
}

impl std::fmt::Debug for HandlerRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRequest")
            .field("matched_path", &self.matched_path)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A registered CoAP request handler.
///
/// Returning `Ok(code)` sends an immediate response with that code and
/// whatever payload/options the handler wrote via the `responder` (if any
/// was taken). Returning `Err(Error::WouldBlock)` either means "respond
/// later via the responder you were handed" (if [`HandlerFlags::ENABLE_ASYNC`]
/// is set) or "I already sent a response out-of-band" (if it isn't). Any
/// other `Err` becomes a 5.00 Internal Server Error response.
pub trait RequestHandler {
    /// Handles `request`, optionally taking ownership of `responder` to
    /// answer asynchronously.
    fn handle_request(
        &mut self,
        request: &HandlerRequest<'_>,
        responder: Option<Responder>,
    ) -> Result<MsgCode, Error>;
}

impl<F> RequestHandler for F
where
    F: FnMut(&HandlerRequest<'_>, Option<Responder>) -> Result<MsgCode, Error>,
{
    fn handle_request(
        &mut self,
        request: &HandlerRequest<'_>,
        responder: Option<Responder>,
    ) -> Result<MsgCode, Error> {
        self(request, responder)
    }
}

/// One entry in the endpoint's handler registry.
pub(crate) struct HandlerEntry {
    pub(crate) path: String,
    pub(crate) flags: HandlerFlags,
    pub(crate) handler: Box<dyn RequestHandler>,
}

/// Returns true if `request_segments` is prefixed by `handler_segments`.
///
/// Both are slash-separated paths with any leading slash already stripped.
/// An empty handler path (the default handler's synthetic `"/"` binding)
/// matches anything.
pub(crate) fn path_is_prefix(handler_path: &str, request_path: &str) -> bool {
    if handler_path.is_empty() {
        return true;
    }

    let mut handler_segs = handler_path.split('/');
    let mut request_segs = request_path.split('/');

    loop {
        match (handler_segs.next(), request_segs.next()) {
            (Some(h), Some(r)) => {
                if h != r {
                    return false;
                }
            }
            (Some(_), None) => return false,
            (None, _) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        assert!(path_is_prefix("foo/bar", "foo/bar"));
        assert!(path_is_prefix("foo/bar", "foo/bar/baz"));
        assert!(!path_is_prefix("foo/bar", "foobar"));
        assert!(!path_is_prefix("foo/bar", "foo"));
        assert!(path_is_prefix("", "anything/at/all"));
    }

    #[test]
    fn flags() {
        let f = HandlerFlags(HandlerFlags::ALLOW_GET | HandlerFlags::group_mask(2));
        assert!(f.allows_method(MsgCode::MethodGet));
        assert!(!f.allows_method(MsgCode::MethodPost));
        assert!(f.is_in_group(2));
        assert!(f.is_in_group(0));
        assert!(!f.is_in_group(1));
        assert!(!f.allows_async());
    }
}
