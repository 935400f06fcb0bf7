//! Socket and message framing.
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

mod socket;
mod stream;

pub use socket::Socket;
pub use stream::PgStream;

pub(crate) const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Largest accepted frame length, the server `MaxAllocSize`.
pub const MAX_MESSAGE_LEN: usize = 0x4000_0000;

/// Read one message frame, returning the message type and its body.
///
/// Buffered bytes past the frame are kept in `buf`. The frame layout is
/// shared by frontend messages, except `Startup`.
///
/// # Errors
///
/// Returns [`io::ErrorKind::UnexpectedEof`] if the stream ends, and
/// [`io::ErrorKind::InvalidData`] for a length below 4 or above
/// [`MAX_MESSAGE_LEN`].
pub async fn read_message<R>(io: &mut R, buf: &mut BytesMut) -> io::Result<(u8, Bytes)>
where
    R: AsyncRead + Unpin,
{
    loop {
        match buf.get(..5) {
            Some(mut header) => {
                let msgtype = header.get_u8();
                let len = header.get_i32();

                if len < 4 {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid message length"));
                }

                // length includes itself but not the message type
                let len = len as usize;
                if len > MAX_MESSAGE_LEN {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "message length too large"));
                }
                if buf.len() > len {
                    buf.advance(5);
                    let body = buf.split_to(len - 4).freeze();
                    return Ok((msgtype, body));
                }

                buf.reserve(1 + len - buf.len());
            },
            None => buf.reserve(DEFAULT_BUF_CAPACITY),
        }

        if io.read_buf(buf).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn read_split_frames() {
        let input = b"1\0\0\0\x04C\0\0\0\x0dSELECT 1\0Z\0\0\0\x05I";
        let mut io = &input[..];
        let mut buf = BytesMut::new();

        block_on(async {
            let (ty, body) = read_message(&mut io, &mut buf).await.unwrap();
            assert_eq!((ty, &body[..]), (b'1', &b""[..]));
            let (ty, body) = read_message(&mut io, &mut buf).await.unwrap();
            assert_eq!((ty, &body[..]), (b'C', &b"SELECT 1\0"[..]));
            let (ty, body) = read_message(&mut io, &mut buf).await.unwrap();
            assert_eq!((ty, &body[..]), (b'Z', &b"I"[..]));

            let err = read_message(&mut io, &mut buf).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        });
    }

    #[test]
    fn invalid_length() {
        let input = b"Z\0\0\0\x02";
        let mut io = &input[..];
        let mut buf = BytesMut::new();
        let err = block_on(read_message(&mut io, &mut buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_length_is_rejected() {
        let input = b"D\x40\0\0\x01";
        let mut io = &input[..];
        let mut buf = BytesMut::new();
        let err = block_on(read_message(&mut io, &mut buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        // nothing reserved for the declared body
        assert!(buf.capacity() < MAX_MESSAGE_LEN);
    }

    #[test]
    fn truncated_frame() {
        let input = b"C\0\0\0\x0dSELE";
        let mut io = &input[..];
        let mut buf = BytesMut::new();
        let err = block_on(read_message(&mut io, &mut buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
