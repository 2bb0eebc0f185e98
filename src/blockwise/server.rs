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

use super::BlockwiseDirection;
use crate::message::{MessageRead, MessageWrite, MsgCode};
use crate::option::{OptionInsertExt, OptionIteratorExt, BLOCK1, BLOCK2, ETAG, IF_MATCH};
use crate::{BlockInfo, ETag, Error};

/// The outcome of classifying an inbound blockwise request against the
/// transfer's expected next offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockwiseOutcome {
    /// This is the block we were expecting; state has been advanced and a
    /// response can be built.
    Next,
    /// A resend of the final block we already answered (the peer must have
    /// missed our response); state was left untouched.
    ResentFinal,
}

/// A small, resource-scoped helper that drives one side of a blockwise
/// transfer for a single resource handler: classifies each inbound
/// request's block option against the transfer's expected offset, and
/// builds the corresponding response.
///
/// Unlike [`super::client::BlockwiseGet`]/[`super::client::BlockwiseUpload`],
/// this holds no request/response plumbing of its own — it's meant to be
/// created fresh (or reused) by a [`crate::endpoint::RequestHandler`] and
/// consulted once per request.
#[derive(Debug, Clone)]
pub struct BlockwiseResponder {
    direction: BlockwiseDirection,
    preferred_block_size: BlockInfo,
    next_offset: usize,
    done: bool,
    etag: ETag,
}

impl BlockwiseResponder {
    /// Creates a new responder. `preferred_block_size` caps the size of
    /// blocks this resource will hand out (a request for larger blocks is
    /// silently clamped down); `direction` selects whether `BLOCK1` (the
    /// peer is uploading) or `BLOCK2` (the peer is downloading) options
    /// are read and written.
    pub fn new(direction: BlockwiseDirection, preferred_block_size: BlockInfo) -> Self {
        BlockwiseResponder {
            direction,
            preferred_block_size,
            next_offset: 0,
            done: false,
            etag: ETag::EMPTY,
        }
    }

    /// Tags every response built by this responder with `etag`, so the
    /// peer can detect the underlying representation changing mid-transfer.
    pub fn set_etag(&mut self, etag: ETag) {
        self.etag = etag;
    }

    /// True once the transfer's final block has been handled.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn request_block(&self, request: &dyn MessageRead) -> BlockInfo {
        let block = match self.direction {
            BlockwiseDirection::Upload => request.block1(),
            BlockwiseDirection::Download => request.block2(),
        };
        block.unwrap_or_default()
    }

    /// Classifies `request`'s block option against the transfer's expected
    /// next offset.
    ///
    /// Returns [`BlockwiseOutcome::Next`] and advances `next_offset` past
    /// this block on a match (the caller should go build/consume the block
    /// body and respond). Restarting from offset 0 is always accepted as a
    /// fresh transfer, even mid-way through a previous one. Returns
    /// [`BlockwiseOutcome::ResentFinal`] without advancing state for an
    /// exact resend of the last block already handled. Otherwise returns
    /// the `4.xx` code the caller should answer with:
    /// [`MsgCode::ClientErrorRequestEntityIncomplete`] for a gap ahead of
    /// what's expected, [`MsgCode::ClientErrorBadOption`] for a resend of
    /// the final block that still claims more blocks follow, or
    /// [`MsgCode::ClientErrorPreconditionFailed`] for an `ETag` mismatch
    /// against `IF_MATCH`.
    pub fn on_request(&mut self, request: &dyn MessageRead) -> Result<BlockwiseOutcome, MsgCode> {
        if !self.etag.is_empty() {
            if let Some(Ok(if_match)) = request.options().find_next_of(IF_MATCH) {
                if if_match != self.etag {
                    return Err(MsgCode::ClientErrorPreconditionFailed);
                }
            }
        }

        let block = self.request_block(request);

        if block.offset() == self.next_offset {
            self.next_offset += block.len();
            self.done = !block.more_flag();
            return Ok(BlockwiseOutcome::Next);
        }

        if self.next_offset > 0 && block.offset() + block.len() == self.next_offset {
            if self.done && block.more_flag() {
                return Err(MsgCode::ClientErrorBadOption);
            }
            return Ok(BlockwiseOutcome::ResentFinal);
        }

        if block.offset() == 0 {
            self.next_offset = block.len();
            self.done = !block.more_flag();
            return Ok(BlockwiseOutcome::Next);
        }

        Err(MsgCode::ClientErrorRequestEntityIncomplete)
    }

    /// Builds the block option (and `ETag`, if set) for the response to a
    /// request classified by [`Self::on_request`], writing it into
    /// `encoder`. `body` is the full (unsegmented) representation; the
    /// block matching `block` is sliced out of it and appended as the
    /// payload.
    pub fn create_response(
        &self,
        encoder: &mut dyn MessageWrite,
        block: BlockInfo,
        body: &[u8],
    ) -> Result<(), Error> {
        if !self.etag.is_empty() {
            encoder.insert_option(ETAG, self.etag)?;
        }

        let szx = block.szx().min(self.preferred_block_size.szx());
        let clamped = BlockInfo::new(block.num(), false, szx).unwrap_or(block);
        let start = clamped.offset().min(body.len());
        let end = (start + clamped.len()).min(body.len());
        let more = end < body.len();
        let out_block = BlockInfo::new(clamped.num(), more, szx).ok_or(Error::InvalidArgument)?;

        match self.direction {
            BlockwiseDirection::Download => encoder.insert_option(BLOCK2, out_block)?,
            BlockwiseDirection::Upload => encoder.insert_option(BLOCK1, out_block)?,
        }

        encoder.append_payload_bytes(&body[start..end])
    }
}
