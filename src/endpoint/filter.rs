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

use super::HandlerFlags;
use crate::message::{MessageRead, MsgCode};
use crate::Error;

/// The outcome of a [`RequestFilter::filter_request`] call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FilterResult {
    /// Let the next filter (or the handler) run.
    Continue,
    /// Short-circuit with this response code.
    Respond(MsgCode),
}

/// A request filter, run for every request after handler selection and
/// before handler invocation.
///
/// Filters run in registration order. The first filter that doesn't return
/// [`FilterResult::Continue`] short-circuits the rest of the chain and the
/// handler itself.
pub trait RequestFilter {
    /// Inspects `request`, matched against a handler with `handler_flags`.
    fn filter_request(
        &mut self,
        request: &dyn MessageRead,
        handler_flags: HandlerFlags,
    ) -> Result<FilterResult, Error>;
}

impl<F> RequestFilter for F
where
    F: FnMut(&dyn MessageRead, HandlerFlags) -> Result<FilterResult, Error>,
{
    fn filter_request(
        &mut self,
        request: &dyn MessageRead,
        handler_flags: HandlerFlags,
    ) -> Result<FilterResult, Error> {
        self(request, handler_flags)
    }
}

/// Gates handlers by an integer group property (`0..`[`MAX_GROUP`][GroupRequestFilter::MAX_GROUP]``).
///
/// Every handler implicitly belongs to group 0. A request is let through
/// only if the matched handler's group-membership mask includes this
/// filter's configured group.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GroupRequestFilter {
    group: u8,
}

impl GroupRequestFilter {
    /// The highest legal group number.
    pub const MAX_GROUP: u8 = 3;

    /// Creates a new filter gating on group 0.
    pub fn new() -> Self {
        GroupRequestFilter { group: 0 }
    }

    /// Returns the group this filter currently gates on.
    pub fn group(&self) -> u8 {
        self.group
    }

    /// Sets the group this filter gates on.
    ///
    /// Returns [`Error::OutOfRange`] if `group` exceeds [`Self::MAX_GROUP`].
    pub fn set_group(&mut self, group: u8) -> Result<(), Error> {
        if group > Self::MAX_GROUP {
            return Err(Error::OutOfRange);
        }
        self.group = group;
        Ok(())
    }
}

impl Default for GroupRequestFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFilter for GroupRequestFilter {
    fn filter_request(
        &mut self,
        _request: &dyn MessageRead,
        handler_flags: HandlerFlags,
    ) -> Result<FilterResult, Error> {
        if handler_flags.is_in_group(self.group) {
            Ok(FilterResult::Continue)
        } else {
            Ok(FilterResult::Respond(MsgCode::ClientErrorForbidden))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_zero_is_implicit() {
        let mut filter = GroupRequestFilter::new();
        let msg = crate::message::ResetMessage;
        let flags = HandlerFlags(HandlerFlags::ALLOW_ALL);
        assert_eq!(
            filter.filter_request(&msg, flags).unwrap(),
            FilterResult::Continue
        );
    }

    #[test]
    fn non_member_is_forbidden() {
        let mut filter = GroupRequestFilter::new();
        filter.set_group(2).unwrap();
        let msg = crate::message::ResetMessage;
        let flags = HandlerFlags(HandlerFlags::ALLOW_ALL | HandlerFlags::group_mask(1));
        assert_eq!(
            filter.filter_request(&msg, flags).unwrap(),
            FilterResult::Respond(MsgCode::ClientErrorForbidden)
        );
    }

    #[test]
    fn set_group_out_of_range() {
        let mut filter = GroupRequestFilter::new();
        assert_eq!(filter.set_group(4), Err(Error::OutOfRange));
    }
}
