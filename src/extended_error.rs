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

//! Codec for the extended-error payload carried in a private CoAP option.
//!
//! The wire format is a tiny Protobuf-shaped structure: `namespace` (string,
//! field 1), `code` (zigzag-encoded `sint32`, field 2), `message` (string,
//! field 3). Unknown field tags are skipped.

use crate::Error;

/// A decoded extended-error payload.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExtendedError {
    /// The namespace string identifying the source of the error.
    pub namespace: String,

    /// The error code, specific to `namespace`.
    pub code: i32,

    /// A human-readable error message.
    pub message: String,
}

const WIRE_TYPE_VARINT: u8 = 0;
const WIRE_TYPE_LEN: u8 = 2;

const FIELD_NAMESPACE: u32 = 1;
const FIELD_CODE: u32 = 2;
const FIELD_MESSAGE: u32 = 3;

fn zigzag_decode(x: u64) -> i32 {
    ((x >> 1) as i64 ^ -((x & 1) as i64)) as i32
}

fn zigzag_encode(x: i32) -> u64 {
    (((x << 1) ^ (x >> 31)) as u32) as u64
}

fn decode_varint(buffer: &[u8], pos: &mut usize) -> Result<u64, Error> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *buffer.get(*pos).ok_or(Error::NotEnoughData)?;
        *pos += 1;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::Overflow);
        }
    }
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

impl ExtendedError {
    /// Decodes an `ExtendedError` from its wire representation.
    ///
    /// An empty payload decodes to a zero-valued `ExtendedError`.
    pub fn try_from_bytes(buffer: &[u8]) -> Result<ExtendedError, Error> {
        let mut ret = ExtendedError::default();
        let mut pos = 0;

        while pos < buffer.len() {
            let key = decode_varint(buffer, &mut pos)?;
            let field = (key >> 3) as u32;
            let wire_type = (key & 0x7) as u8;

            match wire_type {
                WIRE_TYPE_VARINT => {
                    let value = decode_varint(buffer, &mut pos)?;
                    if field == FIELD_CODE {
                        ret.code = zigzag_decode(value);
                    }
                }
                WIRE_TYPE_LEN => {
                    let len = decode_varint(buffer, &mut pos)? as usize;
                    let end = pos.checked_add(len).ok_or(Error::Overflow)?;
                    let bytes = buffer.get(pos..end).ok_or(Error::NotEnoughData)?;
                    pos = end;

                    match field {
                        FIELD_NAMESPACE => {
                            ret.namespace = std::str::from_utf8(bytes)?.to_owned();
                        }
                        FIELD_MESSAGE => {
                            ret.message = std::str::from_utf8(bytes)?.to_owned();
                        }
                        _ => {
                            // Unknown field: already skipped.
                        }
                    }
                }
                _ => return Err(Error::InvalidFormat),
            }
        }

        Ok(ret)
    }

    /// Encodes this `ExtendedError` to its wire representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if !self.namespace.is_empty() {
            encode_varint(((FIELD_NAMESPACE << 3) | WIRE_TYPE_LEN as u32) as u64, &mut out);
            encode_varint(self.namespace.len() as u64, &mut out);
            out.extend_from_slice(self.namespace.as_bytes());
        }

        if self.code != 0 {
            encode_varint(((FIELD_CODE << 3) | WIRE_TYPE_VARINT as u32) as u64, &mut out);
            encode_varint(zigzag_encode(self.code), &mut out);
        }

        if !self.message.is_empty() {
            encode_varint(((FIELD_MESSAGE << 3) | WIRE_TYPE_LEN as u32) as u64, &mut out);
            encode_varint(self.message.len() as u64, &mut out);
            out.extend_from_slice(self.message.as_bytes());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_literal_scenario() {
        let bytes: &[u8] = &[
            0x0A, 0x0F, b'o', b'r', b'g', b'.', b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.',
            b'f', b'o', b'o', 0x10, 0xAB, 0x02, 0x1A, 0x05, b'h', b'e', b'l', b'l', b'o',
        ];

        let err = ExtendedError::try_from_bytes(bytes).unwrap();

        assert_eq!(err.namespace, "org.example.foo");
        assert_eq!(err.code, -150);
        assert_eq!(err.message, "hello");

        assert_eq!(err.to_bytes(), bytes);
    }

    #[test]
    fn empty_payload_decodes_to_zero_value() {
        let err = ExtendedError::try_from_bytes(&[]).unwrap();
        assert_eq!(err, ExtendedError::default());
    }

    #[test]
    fn unknown_tags_are_skipped() {
        let mut bytes = vec![];
        // Unknown field 4, varint wire type, value 42.
        encode_varint((4u64 << 3) | WIRE_TYPE_VARINT as u64, &mut bytes);
        encode_varint(42, &mut bytes);
        // Followed by a known field.
        encode_varint(((FIELD_CODE as u64) << 3) | WIRE_TYPE_VARINT as u64, &mut bytes);
        encode_varint(zigzag_encode(7), &mut bytes);

        let err = ExtendedError::try_from_bytes(&bytes).unwrap();
        assert_eq!(err.code, 7);
    }
}
