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

//! RFC 7959 blockwise transfers layered on top of [`super::endpoint`].
//!
//! [`client::BlockwiseGet`] and [`client::BlockwiseUpload`] drive a
//! `BLOCK2` download or `BLOCK1` upload one block at a time, to be pumped
//! by the caller between calls to [`super::endpoint::Endpoint::send_request`]
//! and its response listener. [`server::BlockwiseResponder`] is the
//! resource-side counterpart: a small per-resource helper that classifies
//! an inbound blockwise request (next block, resent block, or out of
//! sequence) and builds the matching response.

mod client;
mod server;

pub use client::{BlockwiseDirection, BlockwiseGet, BlockwiseUpload};
pub use server::{BlockwiseOutcome, BlockwiseResponder};
