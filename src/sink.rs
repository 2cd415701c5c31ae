//! Output sinks for rendered notes

use crate::error::Result;
use crate::synth::SampleBuffer;
use std::sync::{Arc, Mutex};

/// Consumer of PCM buffers, 8-bit unsigned mono.
///
/// `write` is synchronous: it returns once the buffer has been handed to
/// the device (or wherever the sink sends it), in call order.
pub trait AudioSink: Send {
    fn write(&mut self, buffer: &SampleBuffer) -> Result<()>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn write(&mut self, buffer: &SampleBuffer) -> Result<()> {
        (**self).write(buffer)
    }
}

/// Keeps every buffer it receives. Clones share storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffers: Arc<Mutex<Vec<SampleBuffer>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers received so far, in delivery order
    pub fn buffers(&self) -> Vec<SampleBuffer> {
        match self.buffers.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, buffer: &SampleBuffer) -> Result<()> {
        match self.buffers.lock() {
            Ok(mut guard) => guard.push(buffer.clone()),
            Err(poisoned) => poisoned.into_inner().push(buffer.clone()),
        }
        Ok(())
    }
}

/// Discards everything; used when running without an audio device
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write(&mut self, _buffer: &SampleBuffer) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write(&SampleBuffer::from_bytes(vec![1, 2])).unwrap();
        writer.write(&SampleBuffer::from_bytes(vec![3])).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.buffers()[1].as_bytes(), &[3]);
    }

    #[test]
    fn test_boxed_sink() {
        let mut boxed: Box<dyn AudioSink> = Box::new(NullSink);
        assert!(boxed.write(&SampleBuffer::default()).is_ok());
    }
}
