use std::cell::RefCell;
use std::rc::Rc;

use mockall::mock;
use tracesim_core::common::Cycle;
use tracesim_core::memory::controller::SimpleController;
use tracesim_core::memory::{Completion, MemRequest, MemoryInterface, RequestId, TimedMemory};

mock! {
    pub Memory {}

    impl MemoryInterface for Memory {
        fn issue_request(&mut self, request: MemRequest, now: Cycle) -> RequestId;
        fn drain_completions(&mut self, now: Cycle) -> Vec<Completion>;
    }
}

/// Shared log of `(issue cycle, request)` pairs.
pub type RequestLog = Rc<RefCell<Vec<(Cycle, MemRequest)>>>;

/// Fixed-latency memory that logs every request it accepts.
pub struct RecordingMemory {
    inner: TimedMemory<SimpleController>,
    log: RequestLog,
}

impl RecordingMemory {
    pub fn new(latency: Cycle) -> (Self, RequestLog) {
        let log = RequestLog::default();
        let memory = Self {
            inner: TimedMemory::new(SimpleController::new(latency)),
            log: Rc::clone(&log),
        };
        (memory, log)
    }
}

impl MemoryInterface for RecordingMemory {
    fn issue_request(&mut self, request: MemRequest, now: Cycle) -> RequestId {
        self.log.borrow_mut().push((now, request));
        self.inner.issue_request(request, now)
    }

    fn drain_completions(&mut self, now: Cycle) -> Vec<Completion> {
        self.inner.drain_completions(now)
    }
}
