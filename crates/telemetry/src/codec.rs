//! Frame codec
//!
//! `[u32 big-endian length][JSON body]`

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{TelemetryError, TelemetryRecord};

/// Largest accepted frame body (1 MiB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Serialize a record into a length-prefixed frame
pub fn encode_frame<T: Serialize>(record: &T) -> Result<Vec<u8>, TelemetryError> {
    let body = serde_json::to_vec(record)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(TelemetryError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parse and validate a frame body
pub fn decode_record<T: TelemetryRecord>(body: &[u8]) -> Result<T, TelemetryError> {
    let record: T = serde_json::from_slice(body)?;
    record.validate()?;
    Ok(record)
}

/// Read one frame body
///
/// Returns `Ok(None)` when the stream ends before a complete length prefix.
/// A stream ending inside the body yields `Truncated` and the partial body
/// is discarded.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, TelemetryError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > max_len {
        return Err(TelemetryError::FrameTooLarge { len, max: max_len });
    }

    let mut body = vec![0u8; len];
    match reader.read_exact(&mut body).await {
        Ok(_) => Ok(Some(body)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(TelemetryError::Truncated(len)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaceRecord, ObjectRecord};

    #[test]
    fn test_length_prefix_is_big_endian() {
        let record = ObjectRecord::default();
        let frame = encode_frame(&record).unwrap();
        let body_len = frame.len() - 4;
        assert_eq!(&frame[..4], &(body_len as u32).to_be_bytes());
        assert_eq!(frame[4], b'{');
    }

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let first = FaceRecord {
            timestamp_ms: 1,
            flagged: true,
            ..Default::default()
        };
        let second = FaceRecord {
            timestamp_ms: 2,
            ..Default::default()
        };
        let mut bytes = encode_frame(&first).unwrap();
        bytes.extend(encode_frame(&second).unwrap());

        let mut reader = bytes.as_slice();
        let a: FaceRecord = decode_record(&read_frame(&mut reader, MAX_FRAME_LEN).await.unwrap().unwrap()).unwrap();
        let b: FaceRecord = decode_record(&read_frame(&mut reader, MAX_FRAME_LEN).await.unwrap().unwrap()).unwrap();
        assert_eq!(a, first);
        assert_eq!(b, second);
        assert!(read_frame(&mut reader, MAX_FRAME_LEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_prefix_is_end_of_stream() {
        let mut reader: &[u8] = &[0, 0];
        assert!(read_frame(&mut reader, MAX_FRAME_LEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefix_then_close_is_truncated() {
        let mut reader: &[u8] = &[0, 0, 0, 10, b'{'];
        assert!(matches!(
            read_frame(&mut reader, MAX_FRAME_LEN).await,
            Err(TelemetryError::Truncated(10))
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut reader: &[u8] = &[0, 0, 1, 0];
        assert!(matches!(
            read_frame(&mut reader, 128).await,
            Err(TelemetryError::FrameTooLarge { len: 256, max: 128 })
        ));
    }

    #[test]
    fn test_malformed_body_rejected() {
        assert!(matches!(
            decode_record::<FaceRecord>(b"not json"),
            Err(TelemetryError::Malformed(_))
        ));
        assert!(matches!(
            decode_record::<ObjectRecord>(br#"{"detection_confidence": 4.0}"#),
            Err(TelemetryError::Invalid { .. })
        ));
    }
}
