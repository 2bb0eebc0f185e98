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

use std::fmt::{Debug, Display, Formatter};

/// Type for errors encountered while building, parsing, sending or receiving
/// CoAP messages.
///
/// `WouldBlock` is an ordinary variant here, not a distinguished `io::ErrorKind`:
/// backpressure from the transport sink is routine control flow throughout
/// the endpoint, not an exceptional condition.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum Error {
    /// Unspecified internal error.
    Internal,

    /// One or more of the supplied arguments are not valid for the given operation.
    InvalidArgument,

    /// This operation is not supported.
    NotSupported,

    /// Not enough bytes were available to complete the parse.
    NotEnoughData,

    /// There is not enough space in the given buffer to complete the operation.
    NotEnoughSpace,

    /// A value did not fit into the field meant to hold it.
    Overflow,

    /// A resource table (request table, response queue, handler table, ...) is full.
    OutOfResources,

    /// A numeric argument (e.g. a group number) was out of its valid range.
    OutOfRange,

    /// The operation could not complete without blocking; retry once the
    /// underlying transport signals it is writable again.
    WouldBlock,

    /// Operation timed out waiting for a response.
    Timeout,

    /// No entry was found for the given handle or key.
    NoSuchItem,

    /// An error was encountered while attempting to parse the data's syntax.
    InvalidSyntax,

    /// The datagram is not a well-formed CoAP message (bad option delta/length,
    /// non-canonical option order, truncated token, ...).
    InvalidFormat,

    /// The CoAP version field was not 1.
    UnsupportedVersion,

    /// Sending a datagram to the transport failed for a reason other than
    /// [`Error::WouldBlock`].
    SendFailure,

    /// The response received was not appropriate for the given request.
    InvalidResponse,

    /// A message matched no pending request and was not itself a request.
    UnexpectedMessage,

    /// A blockwise response described an offset the client was not expecting.
    UnexpectedBlock,

    /// An ETag captured earlier in a blockwise transfer did not match a later block.
    ETagMismatch,

    /// The peer reset the transaction (RST).
    Reset,

    /// An I/O error occurred while performing this operation.
    IOError,
}

#[cfg(feature = "std")]
impl std::convert::From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::IOError
    }
}

impl std::convert::From<Error> for core::fmt::Error {
    fn from(_: Error) -> Self {
        core::fmt::Error
    }
}

impl From<std::fmt::Error> for crate::Error {
    fn from(_err: std::fmt::Error) -> Self {
        Error::NotEnoughSpace
    }
}

impl From<std::str::Utf8Error> for crate::Error {
    fn from(_err: std::str::Utf8Error) -> Self {
        Error::InvalidFormat
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        <Self as Debug>::fmt(self, f)
    }
}

impl Default for Error {
    fn default() -> Self {
        Error::Internal
    }
}

impl Extend<Result<(), Error>> for Error {
    fn extend<T: IntoIterator<Item = Result<(), Error>>>(&mut self, iter: T) {
        if let Some(Err(err)) = iter.into_iter().next() {
            *self = err;
        }
    }
}
