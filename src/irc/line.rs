//! Line codec for the gateway's wire framing.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// Newline-delimited line codec.
///
/// The server terminates lines with `\n` but is inconsistent about `\r`, so
/// every carriage return is dropped on receipt. A partial trailing line
/// stays in the buffer until the next read completes it. Outgoing lines
/// always get `\r\n`.
pub struct LineCodec {
    /// Index of next byte to check for a newline.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        // Look for a newline starting from where the last scan stopped
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(Error::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let stripped: Vec<u8> = line
                .iter()
                .copied()
                .filter(|b| *b != b'\r' && *b != b'\n')
                .collect();
            // Lossy decode: a stray bad byte from the server must not cost
            // us the connection
            Ok(Some(String::from_utf8_lossy(&stripped).into_owned()))
        } else {
            // No complete line yet; remember where we stopped
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(Error::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Error> {
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new(512);
        let mut buf = BytesMut::from("PING :test\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("PING :test".to_owned()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line_retained() {
        let mut codec = LineCodec::new(512);
        let mut buf = BytesMut::from("PRIVMSG #osu :hel");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"lo\nNEXT");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #osu :hello".to_owned())
        );
        // the tail stays buffered for the next read
        assert_eq!(&buf[..], b"NEXT");
    }

    #[test]
    fn test_decode_strips_every_carriage_return() {
        let mut codec = LineCodec::new(512);
        let mut buf = BytesMut::from("a\rb\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("ab".to_owned()));
    }

    #[test]
    fn test_decode_bare_newline() {
        let mut codec = LineCodec::new(512);
        let mut buf = BytesMut::from("PING :x\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :x".to_owned()));
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::new(10);
        let mut buf = BytesMut::from("this line is way too long\n");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(Error::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = LineCodec::new(512);
        let mut buf = BytesMut::new();
        codec.encode("PONG :test".to_owned(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :test\r\n");
    }
}
