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

use std::time::Duration;

/// Trait defining the retransmission parameters used by an [`Endpoint`](crate::endpoint::Endpoint).
///
/// Implement this on a zero-sized unit type and pass it as the endpoint's
/// parameter type to override any subset of the defaults. [`StandardCoapConstants`]
/// supplies the values used throughout this crate's documentation.
pub trait TransParams: Default + Copy + Sync + Send + Unpin {
    /// Maximum number of retransmissions attempted before a request times out.
    fn coap_max_retransmit(&self) -> u32 {
        Self::COAP_MAX_RETRANSMIT
    }

    /// Base acknowledgement timeout.
    fn coap_ack_timeout(&self) -> Duration {
        Self::COAP_ACK_TIMEOUT
    }

    /// Multiplier applied to the upper bound of the randomized initial timeout.
    fn coap_ack_random_factor(&self) -> f32 {
        Self::COAP_ACK_RANDOM_FACTOR
    }

    /// Maximum number of retransmissions. Default is 4.
    const COAP_MAX_RETRANSMIT: u32 = 4;

    /// Base acknowledgement timeout.
    ///
    /// [RFC 7252 Section 4.8] recommends 2 seconds; this crate's default
    /// matches the value used by the embedded stack it was built against,
    /// which intentionally runs higher.
    ///
    /// [RFC 7252 Section 4.8]: https://tools.ietf.org/html/rfc7252#section-4.8
    const COAP_ACK_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Randomization factor for the initial timeout. Default is 1.5.
    const COAP_ACK_RANDOM_FACTOR: f32 = 1.5;

    /// Calculates the delay before the next (re)transmission. `attempt` is
    /// zero-based: `0` means "first transmission, no delay yet", `1` means
    /// the delay between the first and second transmission, and so on.
    fn calc_retransmit_duration(&self, mut attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        if attempt > self.coap_max_retransmit() {
            attempt = self.coap_max_retransmit();
        }

        attempt -= 1;

        let ret = (self.coap_ack_timeout().as_millis() as u64) << attempt;

        const JDIV: u64 = 512u64;
        let rmod: u64 = (JDIV as f32 * (self.coap_ack_random_factor() - 1.0)) as u64;
        let jmul = JDIV + rand::random::<u64>() % rmod;

        Duration::from_millis(ret * jmul / JDIV)
    }

    /// Initial timeout picked uniformly from `[ack_timeout, ack_timeout * ack_random_factor)`.
    fn pick_initial_timeout(&self) -> Duration {
        let base = self.coap_ack_timeout().as_millis() as u64;
        let span = (base as f32 * (self.coap_ack_random_factor() - 1.0)) as u64;
        let span = span.max(1);
        Duration::from_millis(base + rand::random::<u64>() % span)
    }
}

/// The set of transmission parameters used by default: `ACK_TIMEOUT_MS = 5000`,
/// `ACK_RANDOM_FACTOR = 1.5`, `MAX_RETRANSMIT = 4`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StandardCoapConstants;

impl TransParams for StandardCoapConstants {}

impl Default for StandardCoapConstants {
    fn default() -> Self {
        StandardCoapConstants
    }
}
