//! Wire framing and field parsing for the chat daemon's line-based TCP
//! protocol.
//!
//! # Overview
//! This crate has no knowledge of sockets, accounts, or storage: it turns
//! a byte stream into discrete messages ([`Framer`]) and a message into
//! its command name and fields ([`fields`]). The daemon crate's dispatcher
//! decides what each command means; this crate only decides where one
//! message ends and the next begins.
//!
//! # Design
//! Every message is CRLF-terminated, except `upload`, whose payload is a
//! length-prefixed binary blob that may itself contain `\r\n` bytes. The
//! framer special-cases that command so the rest of the daemon never has
//! to think about it.

#![deny(unsafe_code)]

mod error;
mod fields;
mod framer;

pub use error::FrameError;
pub use fields::{command_name, split_fields};
pub use framer::Framer;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_a_simple_crlf_terminated_message() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(b"logout\r\n".to_vec());
        assert_eq!(framer.next_message(&mut reader).unwrap(), b"logout");
    }

    #[test]
    fn leaves_extra_data_buffered_for_the_next_call() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(b"login alice secret\r\nlogout\r\n".to_vec());
        assert_eq!(
            framer.next_message(&mut reader).unwrap(),
            b"login alice secret"
        );
        assert_eq!(framer.next_message(&mut reader).unwrap(), b"logout");
    }

    #[test]
    fn assembles_a_message_split_across_reads() {
        struct Chunked(std::vec::IntoIter<Vec<u8>>);
        impl std::io::Read for Chunked {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.next() {
                    Some(chunk) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    None => Ok(0),
                }
            }
        }
        let mut reader = Chunked(
            vec![b"log".to_vec(), b"out\r".to_vec(), b"\n".to_vec()].into_iter(),
        );
        let mut framer = Framer::new();
        assert_eq!(framer.next_message(&mut reader).unwrap(), b"logout");
    }

    #[test]
    fn connection_closed_with_no_data_is_reported() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(Vec::new());
        assert!(matches!(
            framer.next_message(&mut reader).unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn upload_payload_may_contain_crlf_bytes() {
        let mut framer = Framer::new();
        let payload = b"first\r\nsecond".to_vec();
        let mut wire = format!("upload report.bin {} ", payload.len()).into_bytes();
        wire.extend_from_slice(&payload);
        wire.extend_from_slice(b"\r\n");

        let mut reader = Cursor::new(wire);
        let message = framer.next_message(&mut reader).unwrap();
        assert_eq!(
            message,
            [b"upload report.bin 13 ".as_ref(), &payload].concat()
        );
    }

    #[test]
    fn upload_payload_straddling_a_read_boundary_is_reassembled() {
        struct Chunked(std::vec::IntoIter<Vec<u8>>);
        impl std::io::Read for Chunked {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.next() {
                    Some(chunk) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    None => Ok(0),
                }
            }
        }

        // The payload itself contains a CRLF, so the first terminator the
        // framer notices is mid-payload, before the declared length (8
        // bytes) has fully arrived. It must keep reading past that point
        // instead of stopping there.
        let header = b"upload a.bin 8 ".to_vec();
        let mut reader = Chunked(
            vec![header, b"ab\r\n".to_vec(), b"cdef\r\n".to_vec()].into_iter(),
        );
        let mut framer = Framer::new();
        let message = framer.next_message(&mut reader).unwrap();
        assert_eq!(message, b"upload a.bin 8 ab\r\ncdef");
    }

    #[test]
    fn invalid_upload_length_is_a_wire_error() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(b"upload a.bin notanumber blah\r\n".to_vec());
        let err = framer.next_message(&mut reader).unwrap_err();
        assert!(matches!(err, FrameError::InvalidUploadLength));
        assert!(err.is_wire_error());
    }

    #[test]
    fn connection_survives_an_invalid_upload_length() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(b"upload a.bin notanumber blah\r\nlogout\r\n".to_vec());
        assert!(framer.next_message(&mut reader).is_err());
        assert_eq!(framer.next_message(&mut reader).unwrap(), b"logout");
    }

    #[test]
    fn upload_without_length_field_falls_through_to_field_count_validation() {
        let mut framer = Framer::new();
        let mut reader = Cursor::new(b"upload a.bin\r\n".to_vec());
        assert_eq!(framer.next_message(&mut reader).unwrap(), b"upload a.bin");
    }
}
