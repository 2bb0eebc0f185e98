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

use crate::endpoint::Endpoint;
use crate::message::{Message, MessageRead, MessageWrite, MsgCode, MsgType, VecMessageEncoder};
use crate::option::{OptionInsert, OptionInsertExt, OptionIteratorExt, OptionNumber, BLOCK1, BLOCK2, ETAG};
use crate::trans_params::TransParams;
use crate::transport::Metadata;
use crate::{BlockInfo, ETag, Error};

/// Which option a blockwise transfer is driven by.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockwiseDirection {
    /// The local side is sending a body to the peer, block by block
    /// (`BLOCK1`): a `PUT`/`POST` upload.
    Upload,
    /// The local side is receiving a body from the peer, block by block
    /// (`BLOCK2`): a `GET` download.
    Download,
}

/// Run state shared by [`BlockwiseGet`] and [`BlockwiseUpload`], tracking
/// whether the caller has paused or cancelled the transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
enum BlockwiseState {
    #[default]
    Active,
    Paused,
    Cancelled,
}

impl BlockwiseState {
    /// Mirrors [`crate::endpoint::Endpoint::cancel_request`]: cancelling an
    /// already-cancelled transfer is [`Error::NoSuchItem`], not a silent no-op.
    fn cancel(&mut self) -> Result<(), Error> {
        if *self == BlockwiseState::Cancelled {
            return Err(Error::NoSuchItem);
        }
        *self = BlockwiseState::Cancelled;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), Error> {
        if *self == BlockwiseState::Cancelled {
            return Err(Error::NoSuchItem);
        }
        *self = BlockwiseState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), Error> {
        if *self == BlockwiseState::Cancelled {
            return Err(Error::NoSuchItem);
        }
        *self = BlockwiseState::Active;
        Ok(())
    }
}

/// Drives a `BLOCK2` download of a resource representation.
///
/// This holds no request handle of its own and isn't itself a
/// [`crate::endpoint::RequestListener`] — the caller owns the run loop, so
/// it sends one block request at a time via [`Self::send_next`] and feeds
/// the matching response back in via [`Self::on_response`], same as it
/// would for any other request.
#[derive(Debug)]
pub struct BlockwiseGet {
    path: String,
    next_block: BlockInfo,
    etag: Option<ETag>,
    body: Vec<u8>,
    finished: bool,
    state: BlockwiseState,
}

impl BlockwiseGet {
    /// Creates a new downloader for `path`, requesting blocks no larger
    /// than `preferred_block_size`.
    pub fn new(path: impl Into<String>, preferred_block_size: BlockInfo) -> Self {
        BlockwiseGet {
            path: path.into(),
            next_block: BlockInfo::new(0, false, preferred_block_size.szx()).unwrap(),
            etag: None,
            body: Vec::new(),
            finished: false,
            state: BlockwiseState::Active,
        }
    }

    /// True once every block has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while the transfer is paused via [`Self::pause`].
    pub fn is_paused(&self) -> bool {
        self.state == BlockwiseState::Paused
    }

    /// Suspends the transfer: [`Self::send_next`] refuses to send further
    /// block requests until [`Self::resume`] is called. Returns
    /// [`Error::NoSuchItem`] if the transfer was already cancelled.
    pub fn pause(&mut self) -> Result<(), Error> {
        self.state.pause()
    }

    /// Lifts a previous [`Self::pause`]. Returns [`Error::NoSuchItem`] if
    /// the transfer was already cancelled.
    pub fn resume(&mut self) -> Result<(), Error> {
        self.state.resume()
    }

    /// Cancels the transfer. Further calls to [`Self::send_next`] fail with
    /// [`Error::NoSuchItem`]. Calling this a second time also returns
    /// [`Error::NoSuchItem`], matching
    /// [`crate::endpoint::Endpoint::cancel_request`]'s double-cancel
    /// behavior.
    pub fn cancel(&mut self) -> Result<(), Error> {
        self.state.cancel()
    }

    /// The `ETag` of the representation, once the first block's response
    /// has arrived with one.
    pub fn etag(&self) -> Option<ETag> {
        self.etag
    }

    /// Consumes the downloader, returning the body assembled so far
    /// (complete, if [`Self::is_finished`]).
    pub fn take_body(self) -> Vec<u8> {
        self.body
    }

    /// Sends a `GET` for the next expected block.
    ///
    /// Returns [`Error::WouldBlock`] while the transfer is paused, or
    /// [`Error::NoSuchItem`] once it has been cancelled.
    pub fn send_next<P: TransParams>(
        &mut self,
        endpoint: &mut Endpoint<P>,
        metadata: Metadata,
    ) -> Result<crate::slab::Handle, Error> {
        match self.state {
            BlockwiseState::Cancelled => return Err(Error::NoSuchItem),
            BlockwiseState::Paused => return Err(Error::WouldBlock),
            BlockwiseState::Active => {}
        }

        let token = endpoint.next_token();
        let msg_id = endpoint.next_msg_id();

        let mut encoder = VecMessageEncoder::new();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(MsgCode::MethodGet);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(token);
        for seg in self.path.trim_matches('/').split('/').filter(|s| !s.is_empty()) {
            encoder.insert_option_with_str(OptionNumber::URI_PATH, seg)?;
        }
        encoder.insert_option(BLOCK2, self.next_block)?;
        if let Some(etag) = self.etag {
            encoder.insert_option(ETAG, etag)?;
        }

        let message: Message = encoder.into();
        endpoint.send_prepared_request(message, metadata, None)
    }

    /// Feeds the response to the request built by the last
    /// [`Self::send_next`] call. Returns `Ok(true)` once the transfer is
    /// complete, [`Error::NoSuchItem`] if the transfer was cancelled,
    /// [`Error::UnexpectedBlock`] if a present `BLOCK2` option names an
    /// offset other than the one expected, [`Error::InvalidResponse`] if
    /// `BLOCK2` is absent from a response expected to carry one, or
    /// [`Error::ETagMismatch`] if the response's `ETag` doesn't match the
    /// one already seen earlier in the transfer.
    pub fn on_response(&mut self, response: &dyn MessageRead) -> Result<bool, Error> {
        if self.state == BlockwiseState::Cancelled {
            return Err(Error::NoSuchItem);
        }
        if self.finished {
            return Ok(true);
        }

        let block = match response.block2() {
            Some(block) => block,
            // A response with no BLOCK2 option at all is only valid for a
            // body that fit in a single message, i.e. the very first block.
            None if self.next_block.offset() == 0 => BlockInfo::default().without_more_flag(),
            None => return Err(Error::InvalidResponse),
        };
        if block.offset() != self.next_block.offset() {
            return Err(Error::UnexpectedBlock);
        }

        if let Some(Ok(tag)) = response.options().find_next_of(ETAG) {
            match self.etag {
                Some(seen) if seen != tag => return Err(Error::ETagMismatch),
                _ => self.etag = Some(tag),
            }
        }

        self.body.extend_from_slice(response.payload());

        if block.more_flag() {
            self.next_block = block.without_more_flag().next().ok_or(Error::InvalidResponse)?;
            Ok(false)
        } else {
            self.finished = true;
            Ok(true)
        }
    }
}

/// Drives a `BLOCK1` upload of a body to a resource.
#[derive(Debug)]
pub struct BlockwiseUpload {
    path: String,
    method: MsgCode,
    body: Vec<u8>,
    block_size: BlockInfo,
    next_block: BlockInfo,
    finished: bool,
    state: BlockwiseState,
}

impl BlockwiseUpload {
    /// Creates a new uploader sending `body` to `path` via `method`
    /// (`POST` or `PUT`), in blocks no larger than `preferred_block_size`.
    pub fn new(
        path: impl Into<String>,
        method: MsgCode,
        body: Vec<u8>,
        preferred_block_size: BlockInfo,
    ) -> Self {
        BlockwiseUpload {
            path: path.into(),
            method,
            body,
            block_size: preferred_block_size.without_more_flag(),
            next_block: BlockInfo::new(0, false, preferred_block_size.szx()).unwrap(),
            finished: false,
            state: BlockwiseState::Active,
        }
    }

    /// True once the final block has been acknowledged.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while the transfer is paused via [`Self::pause`].
    pub fn is_paused(&self) -> bool {
        self.state == BlockwiseState::Paused
    }

    /// Suspends the transfer: [`Self::send_next`] refuses to send further
    /// block requests until [`Self::resume`] is called. Returns
    /// [`Error::NoSuchItem`] if the transfer was already cancelled.
    pub fn pause(&mut self) -> Result<(), Error> {
        self.state.pause()
    }

    /// Lifts a previous [`Self::pause`]. Returns [`Error::NoSuchItem`] if
    /// the transfer was already cancelled.
    pub fn resume(&mut self) -> Result<(), Error> {
        self.state.resume()
    }

    /// Cancels the transfer. Further calls to [`Self::send_next`] fail with
    /// [`Error::NoSuchItem`]. Calling this a second time also returns
    /// [`Error::NoSuchItem`], matching
    /// [`crate::endpoint::Endpoint::cancel_request`]'s double-cancel
    /// behavior.
    pub fn cancel(&mut self) -> Result<(), Error> {
        self.state.cancel()
    }

    /// Sends the next block of the body.
    ///
    /// Returns [`Error::WouldBlock`] while the transfer is paused, or
    /// [`Error::NoSuchItem`] once it has been cancelled.
    pub fn send_next<P: TransParams>(
        &mut self,
        endpoint: &mut Endpoint<P>,
        metadata: Metadata,
    ) -> Result<crate::slab::Handle, Error> {
        match self.state {
            BlockwiseState::Cancelled => return Err(Error::NoSuchItem),
            BlockwiseState::Paused => return Err(Error::WouldBlock),
            BlockwiseState::Active => {}
        }

        let start = self.next_block.offset().min(self.body.len());
        let end = (start + self.block_size.len()).min(self.body.len());
        let more = end < self.body.len();
        let block = BlockInfo::new(self.next_block.num(), more, self.block_size.szx())
            .ok_or(Error::InvalidArgument)?;

        let token = endpoint.next_token();
        let msg_id = endpoint.next_msg_id();

        let mut encoder = VecMessageEncoder::with_payload_capacity(end - start);
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(self.method);
        encoder.set_msg_id(msg_id);
        encoder.set_msg_token(token);
        for seg in self.path.trim_matches('/').split('/').filter(|s| !s.is_empty()) {
            encoder.insert_option_with_str(OptionNumber::URI_PATH, seg)?;
        }
        encoder.insert_option(BLOCK1, block)?;
        encoder.append_payload_bytes(&self.body[start..end])?;

        self.next_block = block;
        let message: Message = encoder.into();
        endpoint.send_prepared_request(message, metadata, None)
    }

    /// The just-acknowledged block succeeded at `new_szx`, smaller than what
    /// was sent; shrinks `block_size` and advances `next_block` past it
    /// using the new, smaller granularity.
    fn downsize_to(&mut self, new_szx: u8) -> Result<(), Error> {
        let resume_offset = self.next_block.offset() + self.next_block.len();
        let new_len = BlockInfo::new(0, false, new_szx)
            .ok_or(Error::InvalidResponse)?
            .len();
        let new_num = (resume_offset / new_len) as u32;
        self.block_size = BlockInfo::new(0, false, new_szx).ok_or(Error::InvalidResponse)?;
        self.next_block = BlockInfo::new(new_num, true, new_szx).ok_or(Error::InvalidResponse)?;
        Ok(())
    }

    /// Feeds the response to the block sent by the last [`Self::send_next`]
    /// call. Returns `Ok(true)` once the server has acknowledged the final
    /// block, [`Error::NoSuchItem`] if the transfer was cancelled, or the
    /// response's code mapped to [`Error::InvalidResponse`] for any
    /// non-2.xx other than a `4.13` (which retries with the next smaller
    /// block size).
    ///
    /// A `2.31 Continue` response may itself carry a `BLOCK1` option
    /// requesting a smaller block size than the one just sent; when it
    /// does, `block_size`/`next_block` are shrunk to match before the next
    /// block is sent, same as an explicit `4.13` does.
    pub fn on_response(&mut self, response: &dyn MessageRead) -> Result<bool, Error> {
        if self.state == BlockwiseState::Cancelled {
            return Err(Error::NoSuchItem);
        }

        if !response.msg_code().is_success() {
            if response.msg_code() == MsgCode::ClientErrorRequestEntityTooLarge {
                if let Some(smaller) = self.next_block.smaller() {
                    self.next_block = smaller;
                    self.block_size = smaller.without_more_flag();
                    return Ok(false);
                }
            }
            return Err(Error::InvalidResponse);
        }

        if response.msg_code() == MsgCode::SuccessContinue {
            if let Some(echoed) = response.block1() {
                if echoed.szx() < self.block_size.szx() {
                    self.downsize_to(echoed.szx())?;
                    return Ok(false);
                }
            }
        }

        if !self.next_block.more_flag() {
            self.finished = true;
            return Ok(true);
        }

        self.next_block = self
            .next_block
            .without_more_flag()
            .next()
            .ok_or(Error::InvalidResponse)?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trans_params::StandardCoapConstants;
    use crate::transport::LoopbackTransport;

    fn endpoint() -> Endpoint<StandardCoapConstants> {
        let mut ep = Endpoint::new(StandardCoapConstants);
        ep.set_transport(Box::new(LoopbackTransport::new()));
        ep
    }

    #[test]
    fn get_sends_block2_zero_first() {
        let mut ep = endpoint();
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, false, 2).unwrap());
        assert!(get.send_next(&mut ep, None).is_ok());
        assert!(!get.is_finished());
    }

    #[test]
    fn upload_advances_through_blocks() {
        let mut ep = endpoint();
        let body = vec![7u8; 64];
        let mut upload =
            BlockwiseUpload::new("put", MsgCode::MethodPut, body, BlockInfo::new(0, false, 2).unwrap());
        assert!(upload.send_next(&mut ep, None).is_ok());
        assert!(!upload.is_finished());
    }

    fn ack_with_block2(
        block: Option<BlockInfo>,
        etag: Option<ETag>,
        payload: &[u8],
    ) -> Message {
        let mut enc = VecMessageEncoder::new();
        enc.set_msg_type(MsgType::Ack);
        enc.set_msg_code(MsgCode::SuccessContent);
        enc.set_msg_id(1);
        if let Some(block) = block {
            enc.insert_option(BLOCK2, block).unwrap();
        }
        if let Some(etag) = etag {
            enc.insert_option(ETAG, etag).unwrap();
        }
        enc.append_payload_bytes(payload).unwrap();
        enc.into()
    }

    #[test]
    fn get_rejects_unexpected_block_offset() {
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, false, 2).unwrap());
        let resp = ack_with_block2(Some(BlockInfo::new(3, false, 2).unwrap()), None, &[0u8; 64]);
        assert_eq!(get.on_response(&resp), Err(Error::UnexpectedBlock));
    }

    #[test]
    fn get_rejects_missing_block_option_mid_transfer() {
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, true, 2).unwrap());
        let first = ack_with_block2(Some(BlockInfo::new(0, true, 2).unwrap()), None, &[0u8; 64]);
        assert_eq!(get.on_response(&first), Ok(false));

        let resp = ack_with_block2(None, None, &[0u8; 64]);
        assert_eq!(get.on_response(&resp), Err(Error::InvalidResponse));
    }

    #[test]
    fn get_rejects_etag_mismatch() {
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, true, 2).unwrap());
        let first = ack_with_block2(
            Some(BlockInfo::new(0, true, 2).unwrap()),
            Some(ETag::from(1u32)),
            &[0u8; 64],
        );
        assert_eq!(get.on_response(&first), Ok(false));

        let second = ack_with_block2(
            Some(BlockInfo::new(1, false, 2).unwrap()),
            Some(ETag::from(2u32)),
            &[0u8; 64],
        );
        assert_eq!(get.on_response(&second), Err(Error::ETagMismatch));
    }

    #[test]
    fn get_cancel_twice_is_no_such_item() {
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, false, 2).unwrap());
        assert!(get.cancel().is_ok());
        assert_eq!(get.cancel(), Err(Error::NoSuchItem));
    }

    #[test]
    fn get_paused_send_next_would_block() {
        let mut ep = endpoint();
        let mut get = BlockwiseGet::new("big", BlockInfo::new(0, false, 2).unwrap());
        get.pause().unwrap();
        assert!(get.is_paused());
        assert_eq!(get.send_next(&mut ep, None), Err(Error::WouldBlock));
        get.resume().unwrap();
        assert!(get.send_next(&mut ep, None).is_ok());
    }

    fn continue_with_block1(block: BlockInfo) -> Message {
        let mut enc = VecMessageEncoder::new();
        enc.set_msg_type(MsgType::Ack);
        enc.set_msg_code(MsgCode::SuccessContinue);
        enc.set_msg_id(1);
        enc.insert_option(BLOCK1, block).unwrap();
        enc.into()
    }

    #[test]
    fn upload_shrinks_block_size_on_continue_downsize() {
        let mut ep = endpoint();
        let body = vec![9u8; 1024];
        let mut upload = BlockwiseUpload::new(
            "put",
            MsgCode::MethodPut,
            body,
            BlockInfo::new(0, false, 4).unwrap(), // 256-byte blocks
        );
        assert!(upload.send_next(&mut ep, None).is_ok());

        // Server only accepts 64-byte blocks (szx 2), signalled on a 2.31.
        let resp = continue_with_block1(BlockInfo::new(0, true, 2).unwrap());
        assert_eq!(upload.on_response(&resp), Ok(false));
        assert_eq!(upload.block_size.szx(), 2);

        assert!(upload.send_next(&mut ep, None).is_ok());
        assert_eq!(upload.is_finished(), false);
    }

    #[test]
    fn upload_cancel_twice_is_no_such_item() {
        let mut upload = BlockwiseUpload::new(
            "put",
            MsgCode::MethodPut,
            vec![1u8; 16],
            BlockInfo::new(0, false, 2).unwrap(),
        );
        assert!(upload.cancel().is_ok());
        assert_eq!(upload.cancel(), Err(Error::NoSuchItem));
    }
}
