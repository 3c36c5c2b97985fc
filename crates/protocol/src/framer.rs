use std::io::Read;

use crate::error::FrameError;

const READ_CHUNK: usize = 4096;

/// Finds the next message on a `Read` stream, handling the `upload`
/// command's length-prefixed binary payload.
///
/// A [`Framer`] owns the leftover bytes from the last read that hadn't yet
/// been consumed into a message; the start of that buffer always aligns
/// with the start of the next message. It has no notion of sockets itself
/// and works against anything implementing [`Read`], which keeps it
/// unit-testable without a live connection.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the next complete message, returning its bytes without the
    /// trailing CRLF.
    ///
    /// For every command except `upload` this is just the line up to the
    /// first CRLF. For `upload`, the first CRLF in the stream may be part
    /// of the file payload rather than the message terminator, so the
    /// length field (`upload <filename> <length> ...`) is parsed first and
    /// exactly `length` payload bytes are read regardless of any CRLF
    /// bytes they contain.
    pub fn next_message<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, FrameError> {
        let mut data = std::mem::take(&mut self.buffer);

        let mut end = find_crlf(&data, 0);
        while end.is_none() {
            let before = data.len();
            if read_chunk(reader, &mut data)? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
            end = find_crlf(&data, before.saturating_sub(1));
        }
        let mut end = end.expect("loop only exits once a terminator is found");

        if data.starts_with(b"upload ") {
            end = self.extend_for_upload_payload(reader, &mut data, end)?;
        }

        self.buffer = data.get(end + 2..).unwrap_or_default().to_vec();
        Ok(data[..end].to_vec())
    }

    /// Given the raw `upload` command line found up to `header_end` (the
    /// position of the first CRLF), parses its length field and reads the
    /// rest of the payload, returning the true end-of-message position.
    fn extend_for_upload_payload<R: Read>(
        &mut self,
        reader: &mut R,
        data: &mut Vec<u8>,
        header_end: usize,
    ) -> Result<usize, FrameError> {
        let Some(second_space) = memchr::memchr(b' ', &data[7..]).map(|i| i + 7) else {
            return Ok(header_end);
        };
        let Some(third_space) =
            memchr::memchr(b' ', &data[second_space + 1..]).map(|i| i + second_space + 1)
        else {
            return Ok(header_end);
        };

        let length = std::str::from_utf8(&data[second_space + 1..third_space])
            .ok()
            .and_then(|s| s.parse::<usize>().ok());

        let Some(length) = length else {
            self.buffer = data[header_end + 2..].to_vec();
            return Err(FrameError::InvalidUploadLength);
        };

        let datapos = third_space + 1;
        let have_so_far = data.len() - datapos;
        if have_so_far < length {
            read_at_least(reader, data, length - have_so_far)?;
        }

        let payload_end = datapos + length;
        if payload_end < header_end {
            self.buffer = data[header_end + 2..].to_vec();
            return Err(FrameError::UnterminatedMessage);
        }

        Ok(payload_end)
    }
}

fn find_crlf(data: &[u8], search_from: usize) -> Option<usize> {
    let haystack = data.get(search_from..)?;
    memchr::memmem::find(haystack, b"\r\n").map(|pos| pos + search_from)
}

fn read_chunk<R: Read>(reader: &mut R, data: &mut Vec<u8>) -> Result<usize, FrameError> {
    let start = data.len();
    data.resize(start + READ_CHUNK, 0);
    let read = reader.read(&mut data[start..])?;
    data.truncate(start + read);
    Ok(read)
}

fn read_at_least<R: Read>(reader: &mut R, data: &mut Vec<u8>, n: usize) -> Result<(), FrameError> {
    let mut obtained = 0;
    while obtained < n {
        let want = (n - obtained).max(READ_CHUNK);
        let start = data.len();
        data.resize(start + want, 0);
        let read = reader.read(&mut data[start..])?;
        data.truncate(start + read);
        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        obtained += read;
    }
    Ok(())
}
