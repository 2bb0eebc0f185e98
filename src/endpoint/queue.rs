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

use crate::transport::Metadata;
use std::collections::VecDeque;

/// The default capacity of a fresh [`ResponseQueue`], per the C source's
/// compile-time constant — exposed here as a constructor default rather
/// than a hard limit.
pub const DEFAULT_CAPACITY: usize = 16;

/// A bounded, strict-FIFO queue of outgoing response datagrams, used to
/// hold responses that couldn't be sent immediately because the transport
/// sink reported backpressure.
#[derive(Debug)]
pub(crate) struct ResponseQueue {
    entries: VecDeque<(Vec<u8>, Metadata)>,
    capacity: usize,
}

impl ResponseQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        ResponseQueue {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn front(&self) -> Option<&(Vec<u8>, Metadata)> {
        self.entries.front()
    }

    pub(crate) fn pop_front(&mut self) {
        self.entries.pop_front();
    }

    /// Appends a datagram. Returns `false` if the queue was already at capacity.
    pub(crate) fn push_back(&mut self, datagram: Vec<u8>, metadata: Metadata) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push_back((datagram, metadata));
        true
    }
}
