//! 8-byte frame header: `{type: u16, icd_version: u16, request_id: u32}`.

use crate::error::{Error, Result};
use crate::event::EventType;

/// Must match the server's `ICD_VERSION`; a mismatched handshake is
/// rejected before any message body is parsed.
pub const ICD_VERSION: u16 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub event_type: u16,
    pub icd_version: u16,
    pub request_id: u32,
}

impl FrameHeader {
    pub const SIZE: usize = 8;

    pub fn new(event_type: EventType, request_id: u32) -> Self {
        Self {
            event_type: event_type as u16,
            icd_version: ICD_VERSION,
            request_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.event_type.to_be_bytes());
        out[2..4].copy_from_slice(&self.icd_version.to_be_bytes());
        out[4..8].copy_from_slice(&self.request_id.to_be_bytes());
        out
    }

    /// Parses a header from the first 8 bytes of `bytes`. Does not by
    /// itself reject a version mismatch — callers check `icd_version`
    /// against their own `ICD_VERSION` constant so the rejection reason
    /// can be logged with context.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            event_type: u16::from_be_bytes([bytes[0], bytes[1]]),
            icd_version: u16::from_be_bytes([bytes[2], bytes[3]]),
            request_id: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Validates the header's ICD version against our own.
    pub fn check_version(&self) -> Result<()> {
        if self.icd_version != ICD_VERSION {
            return Err(Error::IcdVersionMismatch {
                server: ICD_VERSION,
                client: self.icd_version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = FrameHeader::new(EventType::OpenFile, 42);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), FrameHeader::SIZE);
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = FrameHeader::from_bytes(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::FrameTooShort { expected: 8, actual: 4 }));
    }

    #[test]
    fn version_mismatch_is_detected_not_silently_parsed() {
        let mut header = FrameHeader::new(EventType::OpenFile, 1);
        header.icd_version = ICD_VERSION + 1;
        assert!(matches!(header.check_version(), Err(Error::IcdVersionMismatch { .. })));
    }
}
