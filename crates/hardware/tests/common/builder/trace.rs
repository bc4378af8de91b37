use tracesim_core::common::{InstId, OpClass, StreamId};
use tracesim_core::trace::{BranchOutcome, InstructionRecord, MemAccess, StreamDecl, StreamEvent};

/// Appends records with consecutive ids starting at 0.
#[derive(Default)]
pub struct TraceBuilder {
    records: Vec<InstructionRecord>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> InstId {
        InstId(self.records.len() as u64)
    }

    /// Id the next pushed record will get.
    pub fn peek_id(&self) -> InstId {
        self.next_id()
    }

    pub fn op(mut self, op: OpClass) -> Self {
        let rec = InstructionRecord::new(self.next_id(), op);
        self.records.push(rec);
        self
    }

    pub fn alu(self) -> Self {
        self.op(OpClass::IntAlu)
    }

    pub fn alus(mut self, n: usize) -> Self {
        for _ in 0..n {
            self = self.alu();
        }
        self
    }

    /// Makes the last record depend on `deps`.
    pub fn deps(mut self, deps: &[u64]) -> Self {
        if let Some(last) = self.records.last_mut() {
            last.deps = deps.iter().copied().map(InstId).collect();
        }
        self
    }

    fn access(mut self, op: OpClass, addr: u64, stream: Option<StreamId>) -> Self {
        let rec = InstructionRecord {
            mem: Some(MemAccess {
                addr,
                size: 8,
                stream,
            }),
            ..InstructionRecord::new(self.next_id(), op)
        };
        self.records.push(rec);
        self
    }

    pub fn load(self, addr: u64) -> Self {
        self.access(OpClass::MemRead, addr, None)
    }

    pub fn store(self, addr: u64) -> Self {
        self.access(OpClass::MemWrite, addr, None)
    }

    pub fn stream_load(self, stream: u64, addr: u64) -> Self {
        self.access(OpClass::MemRead, addr, Some(StreamId(stream)))
    }

    /// Pushes a `Nop` that declares a strided stream.
    pub fn configure(self, stream: u64, base: u64, stride: i64, length: Option<u64>) -> Self {
        self.configure_decl(StreamDecl {
            id: StreamId(stream),
            base,
            stride,
            elem_size: 8,
            length,
            history: Vec::new(),
            base_stream: None,
        })
    }

    pub fn configure_decl(mut self, decl: StreamDecl) -> Self {
        let mut rec = InstructionRecord::new(self.next_id(), OpClass::Nop);
        rec.stream_event = Some(StreamEvent::Configure(decl));
        self.records.push(rec);
        self
    }

    pub fn end(mut self, stream: u64) -> Self {
        let mut rec = InstructionRecord::new(self.next_id(), OpClass::Nop);
        rec.stream_event = Some(StreamEvent::End(StreamId(stream)));
        self.records.push(rec);
        self
    }

    pub fn branch(mut self, mispredicted: bool) -> Self {
        let mut rec = InstructionRecord::new(self.next_id(), OpClass::IntAlu);
        rec.outcome = Some(BranchOutcome {
            predicted_taken: false,
            taken: mispredicted,
        });
        self.records.push(rec);
        self
    }

    /// Configures stream `stream` and emits `n` strided loads tagged with it.
    pub fn strided_loop(self, stream: u64, base: u64, stride: i64, n: u64) -> Self {
        let mut b = self.configure(stream, base, stride, Some(n));
        for i in 0..n {
            let addr = base.wrapping_add((i as i64 * stride) as u64);
            b = b.stream_load(stream, addr).alu();
        }
        b.end(stream)
    }

    pub fn build(self) -> Vec<InstructionRecord> {
        self.records
    }
}
