//! Trace sources and the validating reader the fetch stage pulls from.

use std::fmt;

use super::record::InstructionRecord;
use crate::common::{InstId, TraceError};

/// A finite, ordered producer of instruction records.
///
/// `None` signals the end of the trace; it is not an error. Any iterator over
/// records is a trace source.
pub trait TraceSource {
    /// Returns the next record, or `None` once the trace is exhausted.
    fn next_record(&mut self) -> Option<InstructionRecord>;
}

impl<I> TraceSource for I
where
    I: Iterator<Item = InstructionRecord>,
{
    fn next_record(&mut self) -> Option<InstructionRecord> {
        self.next()
    }
}

/// Validating, peekable front end over a [`TraceSource`].
///
/// Every record is checked on its own and against its predecessor before the
/// core sees it. Peeking is side-effect free: repeated `peek` calls return the
/// same record until `next_instruction` consumes it.
pub struct TraceReader {
    source: Box<dyn TraceSource>,
    peeked: Option<InstructionRecord>,
    last: Option<InstId>,
    exhausted: bool,
    emitted: u64,
}

impl fmt::Debug for TraceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceReader")
            .field("peeked", &self.peeked.as_ref().map(|r| r.id))
            .field("last", &self.last)
            .field("exhausted", &self.exhausted)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl TraceReader {
    /// Wraps a trace source.
    pub fn new(source: Box<dyn TraceSource>) -> Self {
        Self {
            source,
            peeked: None,
            last: None,
            exhausted: false,
            emitted: 0,
        }
    }

    /// Returns the next record without consuming it.
    pub fn peek(&mut self) -> Result<Option<&InstructionRecord>, TraceError> {
        self.fill()?;
        Ok(self.peeked.as_ref())
    }

    /// Consumes and returns the next record.
    pub fn next_instruction(&mut self) -> Result<Option<InstructionRecord>, TraceError> {
        self.fill()?;
        let record = self.peeked.take();
        if record.is_some() {
            self.emitted += 1;
        }
        Ok(record)
    }

    /// Returns true once the source reported end of trace and nothing is buffered.
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted && self.peeked.is_none()
    }

    /// Number of records handed out so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    fn fill(&mut self) -> Result<(), TraceError> {
        if self.peeked.is_some() || self.exhausted {
            return Ok(());
        }
        let Some(record) = self.source.next_record() else {
            self.exhausted = true;
            return Ok(());
        };
        if let Some(prev) = self.last {
            if record.id <= prev {
                return Err(TraceError::NonMonotonicId {
                    prev,
                    id: record.id,
                });
            }
        }
        record.validate()?;
        self.last = Some(record.id);
        self.peeked = Some(record);
        Ok(())
    }
}
