//! Client side [`tokio_util::codec`] support.
//!
//! Responses do not identify the request they answer and their length field wraps for
//! large payloads, so the codec keeps track of the reads it has encoded and decodes
//! responses in the same order.
use std::{collections::VecDeque, io};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::ReadError,
    protocol::{RESPONSE_HEADER_LEN, ReadResponse, Request},
};

/// Encodes [`Request`]s and decodes the [`ReadResponse`]s that answer them.
#[derive(Debug, Default)]
pub struct RegisterCodec {
    pending_reads: VecDeque<u16>,
}

impl RegisterCodec {
    pub fn new() -> RegisterCodec {
        RegisterCodec::default()
    }

    /// Number of reads that have been encoded but not yet answered
    pub fn pending_reads(&self) -> usize {
        self.pending_reads.len()
    }
}

impl Encoder<Request> for RegisterCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(&mut dst.writer())?;
        if let Request::Read { length, .. } = item {
            self.pending_reads.push_back(length);
        }
        Ok(())
    }
}

impl Decoder for RegisterCodec {
    type Item = ReadResponse;
    type Error = ReadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let Some(&length) = self.pending_reads.front() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Received data without an outstanding read request",
            )
            .into());
        };

        let frame_len = RESPONSE_HEADER_LEN + length as usize;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        self.pending_reads.pop_front();
        let frame = src.split_to(frame_len);
        ReadResponse::from_reader(&mut frame.reader(), length).map(Some)
    }
}
