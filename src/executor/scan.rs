use crate::types::{error::DatabaseError, record::Record};

pub trait Scanner {
    fn scan(&mut self) -> Result<Option<Record>, DatabaseError>;
    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Record>, DatabaseError>;
    fn reset(&mut self) -> Result<(), DatabaseError>;
}

pub struct ScanIterator<S: Scanner> {
    scanner: S,
    failed: bool,
}

impl<S: Scanner> ScanIterator<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner,
            failed: false,
        }
    }
}

impl<S: Scanner> Iterator for ScanIterator<S> {
    type Item = Result<Record, DatabaseError>;
    fn next(&mut self) -> Option<Self::Item> {
        // an error ends the sequence; the scanner's position is unreliable after it
        if self.failed {
            return None;
        }
        match self.scanner.scan() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
