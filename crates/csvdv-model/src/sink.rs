//! Record sink abstraction and the per-record staging buffer.
//!
//! A [`RecordBuilder`] owns the sink for the lifetime of a run. Values are
//! staged column by column and only reach the sink when the whole record is
//! committed with [`RecordBuilder::add_record`]. The sink is closed when the
//! builder is dropped, on success and on every early return.

use crate::error::SinkError;
use crate::schema::Column;
use crate::value::{TypedRecord, Value};

/// Destination for committed records.
pub trait RecordSink {
    /// Receives one complete record.
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError>;

    /// Flushes buffered output after the last record of a successful run.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Releases resources. Called exactly once, whether or not the run succeeded.
    fn close(&mut self) {}
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        (**self).add_record(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        (**self).add_record(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Unset,
    Null,
    Value(Value),
}

/// Stages one record at a time in front of a [`RecordSink`].
pub struct RecordBuilder<S: RecordSink> {
    sink: S,
    slots: Vec<Slot>,
    committed: u64,
}

impl<S: RecordSink> RecordBuilder<S> {
    pub fn new(sink: S, column_count: usize) -> Self {
        Self {
            sink,
            slots: vec![Slot::Unset; column_count],
            committed: 0,
        }
    }

    pub fn set_value(&mut self, column: &Column, value: Value) {
        self.slots[column.index] = Slot::Value(value);
    }

    pub fn set_null(&mut self, column: &Column) {
        self.slots[column.index] = Slot::Null;
    }

    /// Drops whatever has been staged for the current record.
    pub fn discard(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = Slot::Unset);
    }

    /// Commits the staged record. Every column must have been set.
    pub fn add_record(&mut self) -> Result<(), SinkError> {
        if let Some(index) = self.slots.iter().position(|s| matches!(s, Slot::Unset)) {
            return Err(SinkError::IncompleteRecord { index });
        }
        let values = self
            .slots
            .iter_mut()
            .map(|slot| match std::mem::replace(slot, Slot::Unset) {
                Slot::Value(v) => Some(v),
                Slot::Null | Slot::Unset => None,
            })
            .collect();
        self.sink.add_record(TypedRecord::new(values))?;
        self.committed += 1;
        Ok(())
    }

    /// Number of records committed so far.
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Flushes the sink. The sink is closed when the builder drops.
    pub fn finish(mut self) -> Result<(), SinkError> {
        self.discard();
        self.sink.finish()
    }
}

impl<S: RecordSink> Drop for RecordBuilder<S> {
    fn drop(&mut self) {
        self.sink.close();
    }
}

/// Sink collecting records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<TypedRecord>,
    pub finished: bool,
    pub closed: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn add_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
