//! Header block extraction.

use std::io::BufRead;

use crate::error::AppError;

use super::record_scanner::RecordScanner;

/// The leading records of a source, replicated verbatim into every shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    bytes: Vec<u8>,
    records: u64,
}

impl HeaderBlock {
    /// Pulls `header_lines` records off the front of the scanner.
    ///
    /// With `header_lines == 0` nothing is read and the block is empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TruncatedSource` if the source runs out of records
    /// first, and propagates scanner errors unchanged.
    pub fn extract<R: BufRead>(
        scanner: &mut RecordScanner<R>,
        header_lines: u64,
    ) -> Result<Self, AppError> {
        let mut block = HeaderBlock::default();
        let mut record = Vec::new();

        while block.records < header_lines {
            match scanner.read_record(&mut record)? {
                Some(_) => {
                    block.bytes.extend_from_slice(&record);
                    block.records += 1;
                }
                None => {
                    return Err(AppError::TruncatedSource {
                        expected: header_lines,
                        found: block.records,
                    })
                }
            }
        }

        Ok(block)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn record_count(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scanner(input: &str) -> RecordScanner<Cursor<Vec<u8>>> {
        RecordScanner::new(Cursor::new(input.as_bytes().to_vec()))
    }

    #[test]
    fn test_zero_header_lines_reads_nothing() {
        let mut scanner = scanner("a\nb\n");
        let header = HeaderBlock::extract(&mut scanner, 0).unwrap();

        assert!(header.is_empty());
        assert!(header.bytes().is_empty());
        assert_eq!(scanner.bytes_read(), 0);
    }

    #[test]
    fn test_multi_line_header_is_verbatim() {
        let mut scanner = scanner("# export\r\nId,\"Note\nwrapped\"\r\n1,x\r\n");
        let header = HeaderBlock::extract(&mut scanner, 2).unwrap();

        assert_eq!(header.record_count(), 2);
        assert_eq!(header.bytes(), b"# export\r\nId,\"Note\nwrapped\"\r\n");

        let mut rest = Vec::new();
        scanner.read_record(&mut rest).unwrap();
        assert_eq!(rest, b"1,x\r\n");
    }

    #[test]
    fn test_truncated_source() {
        let mut scanner = scanner("a\nb\nc\n");
        match HeaderBlock::extract(&mut scanner, 5) {
            Err(AppError::TruncatedSource { expected, found }) => {
                assert_eq!(expected, 5);
                assert_eq!(found, 3);
            }
            other => panic!("Expected TruncatedSource, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_source_is_not_truncated() {
        let mut scanner = scanner("Id,Name\n");
        let header = HeaderBlock::extract(&mut scanner, 1).unwrap();
        assert_eq!(header.record_count(), 1);

        let mut rest = Vec::new();
        assert!(scanner.read_record(&mut rest).unwrap().is_none());
    }

    #[test]
    fn test_malformed_header_propagates() {
        let mut scanner = scanner("\"open,header\n");
        assert!(matches!(
            HeaderBlock::extract(&mut scanner, 1),
            Err(AppError::MalformedRecord { offset: 0, .. })
        ));
    }
}
