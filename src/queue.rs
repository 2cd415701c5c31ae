//! Bounded playback queue between event handling and audio output
//!
//! Producers call [`PlaybackQueue::try_enqueue`], which never blocks: a full
//! queue drops the new sound and keeps everything already queued. A single
//! [`QueueDrain`] pulls buffers out in FIFO order and writes them to an
//! [`AudioSink`], blocking while the queue is empty.
//!
//! # Design
//! - crossbeam bounded channel for storage and wakeups
//! - Sender held in an `ArcSwapOption` so `close()` needs no lock
//! - Atomic counters for enqueued / dropped / delivered

use crate::sink::AudioSink;
use crate::synth::SampleBuffer;
use arc_swap::ArcSwapOption;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Default number of notes that may wait for playback
pub const DEFAULT_CAPACITY: usize = 10;

/// Producer handle. Cheap to clone; all clones feed the same drain.
#[derive(Clone)]
pub struct PlaybackQueue {
    shared: Arc<Shared>,
}

/// Consumer half, owned by the one drain thread
pub struct QueueDrain {
    receiver: Receiver<SampleBuffer>,
    shared: Arc<Shared>,
}

struct Shared {
    sender: ArcSwapOption<Sender<SampleBuffer>>,
    capacity: usize,
    enqueued: AtomicUsize,
    dropped: AtomicUsize,
    delivered: AtomicUsize,
}

/// Snapshot of queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub enqueued: usize,
    pub dropped: usize,
    pub delivered: usize,
}

impl QueueStats {
    /// Accepted but not yet taken by the drain
    pub fn pending(&self) -> usize {
        self.enqueued.saturating_sub(self.delivered)
    }
}

/// Summary returned when a drain loop finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub delivered: usize,
    pub sink_errors: usize,
}

impl PlaybackQueue {
    /// Create a queue holding at most `capacity` buffers
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> (PlaybackQueue, QueueDrain) {
        assert!(capacity > 0, "playback queue capacity must be positive");

        let (sender, receiver) = channel::bounded(capacity);
        let shared = Arc::new(Shared {
            sender: ArcSwapOption::from_pointee(sender),
            capacity,
            enqueued: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
        });

        (
            PlaybackQueue {
                shared: shared.clone(),
            },
            QueueDrain { receiver, shared },
        )
    }

    /// Append `buffer` unless the queue is full or closed.
    ///
    /// Returns `false` and leaves the queue unchanged when the buffer is
    /// rejected; the caller reports the skipped sound.
    pub fn try_enqueue(&self, buffer: SampleBuffer) -> bool {
        let sender = self.shared.sender.load();
        let accepted = match &*sender {
            Some(tx) => match tx.try_send(buffer) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
            },
            None => false,
        };

        if accepted {
            self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// Stop accepting buffers. The drain exits once the backlog is played.
    pub fn close(&self) {
        if self.shared.sender.swap(None).is_some() {
            debug!("Playback queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.sender.load().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Buffers waiting for the drain
    pub fn len(&self) -> usize {
        self.stats().pending()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }
}

impl Shared {
    fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

impl QueueDrain {
    /// Deliver buffers to `sink` in FIFO order until the queue is closed
    /// and empty. Sink failures are logged and the loop continues.
    pub fn run<S: AudioSink + ?Sized>(self, sink: &mut S) -> DrainReport {
        let mut report = DrainReport::default();

        for buffer in self.receiver.iter() {
            self.shared.delivered.fetch_add(1, Ordering::Relaxed);
            report.delivered += 1;

            debug!("Playing {} samples", buffer.len());
            if let Err(e) = sink.write(&buffer) {
                report.sink_errors += 1;
                error!("Audio sink error: {}", e);
            }
        }

        info!(
            "Playback drain finished: {} delivered, {} sink errors",
            report.delivered, report.sink_errors
        );
        report
    }

    /// Run the drain loop on a dedicated thread
    pub fn spawn<S: AudioSink + 'static>(
        self,
        mut sink: S,
    ) -> std::io::Result<JoinHandle<DrainReport>> {
        thread::Builder::new()
            .name("keytone-drain".to_string())
            .spawn(move || self.run(&mut sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn tagged(tag: u8) -> SampleBuffer {
        SampleBuffer::from_bytes(vec![tag; 4])
    }

    #[test]
    fn test_overflow_rejects_newest() {
        let (queue, drain) = PlaybackQueue::with_capacity(10);

        let results: Vec<bool> = (0..11).map(|i| queue.try_enqueue(tagged(i))).collect();
        assert_eq!(results.iter().filter(|ok| !**ok).count(), 1);
        assert!(!results[10], "the eleventh buffer should be the one dropped");
        assert_eq!(queue.len(), 10);

        queue.close();
        let mut sink = MemorySink::new();
        let report = drain.run(&mut sink);
        assert_eq!(report.delivered, 10);

        let tags: Vec<u8> = sink.buffers().iter().map(|b| b.as_bytes()[0]).collect();
        assert_eq!(tags, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_stats_track_outcomes() {
        let (queue, drain) = PlaybackQueue::with_capacity(2);
        assert!(queue.try_enqueue(tagged(1)));
        assert!(queue.try_enqueue(tagged(2)));
        assert!(!queue.try_enqueue(tagged(3)));

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.delivered, 0);

        queue.close();
        drain.run(&mut MemorySink::new());
        assert_eq!(queue.stats().delivered, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closed_queue_rejects() {
        let (queue, _drain) = PlaybackQueue::with_capacity(4);
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.try_enqueue(tagged(1)));
        assert_eq!(queue.stats().dropped, 1);
        // closing twice is harmless
        queue.close();
    }

    #[test]
    fn test_drain_delivers_backlog_after_close() {
        let (queue, drain) = PlaybackQueue::with_capacity(4);
        let sink = MemorySink::new();
        let handle = drain.spawn(sink.clone()).unwrap();

        for i in 0..3 {
            while !queue.try_enqueue(tagged(i)) {
                std::thread::yield_now();
            }
        }
        queue.close();

        let report = handle.join().unwrap();
        assert_eq!(report.delivered, 3);
        let tags: Vec<u8> = sink.buffers().iter().map(|b| b.as_bytes()[0]).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn test_concurrent_producers_never_exceed_capacity() {
        let (queue, drain) = PlaybackQueue::with_capacity(3);
        let mut handles = vec![];

        for t in 0..4u8 {
            let q = queue.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    q.try_enqueue(tagged(t));
                    assert!(q.len() <= q.capacity());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = queue.stats();
        assert_eq!(stats.enqueued + stats.dropped, 200);
        assert_eq!(stats.enqueued, 3);

        queue.close();
        let report = drain.run(&mut MemorySink::new());
        assert_eq!(report.delivered, 3);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _ = PlaybackQueue::with_capacity(0);
    }
}
