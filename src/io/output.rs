use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use super::OutputSink;
use crate::error::{Error, Result};
use crate::{MIN_QUEUE_BLOCKS, N_CHANNELS};

const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/*
The render loop and the audio callback are decoupled by one SPSC ring of
interleaved stereo samples:

  render thread ── QueueOutput::push ──► [ rtrb ring, >= 4 blocks ] ──► QueueReader::pull ── device callback

Neither side ever blocks. When the ring is full the producer writes as many
whole frames as fit and reports the short transfer; when it is empty the
consumer zero-fills.
*/

/// Build a queue holding `blocks` periods of `block_samples` stereo frames.
pub fn output_queue(block_samples: usize, blocks: usize) -> Result<(QueueOutput, QueueReader)> {
    if blocks < MIN_QUEUE_BLOCKS {
        return Err(Error::QueueCapacity {
            blocks,
            minimum: MIN_QUEUE_BLOCKS,
        });
    }
    if block_samples == 0 {
        return Err(Error::InvalidBlock("block size is zero"));
    }
    let capacity = blocks * block_samples * N_CHANNELS;
    let (producer, consumer) = RingBuffer::<f32>::new(capacity);
    let open = Arc::new(AtomicBool::new(false));
    log::debug!("output queue: {blocks} blocks, {capacity} samples");
    Ok((
        QueueOutput {
            producer,
            open: Arc::clone(&open),
        },
        QueueReader { consumer, open },
    ))
}

/// Producer half, owned by the render loop.
pub struct QueueOutput {
    producer: Producer<f32>,
    open: Arc<AtomicBool>,
}

impl QueueOutput {
    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.producer.buffer().capacity()
    }

    /// Free space in samples.
    pub fn free(&self) -> usize {
        self.producer.slots()
    }
}

impl OutputSink for QueueOutput {
    fn start(&mut self) -> Result<()> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn push(&mut self, frames: &[f32]) -> usize {
        if !self.open.load(Ordering::Relaxed) {
            return 0;
        }
        let fit = self.producer.slots().min(frames.len());
        let whole = fit - fit % N_CHANNELS;
        if whole == 0 {
            return 0;
        }
        match self.producer.write_chunk(whole) {
            Ok(mut chunk) => {
                let (first, second) = chunk.as_mut_slices();
                let split = first.len();
                first.copy_from_slice(&frames[..split]);
                second.copy_from_slice(&frames[split..whole]);
                chunk.commit_all();
                whole * SAMPLE_BYTES
            }
            Err(_) => 0,
        }
    }

    fn stop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Consumer half, owned by the playback callback.
pub struct QueueReader {
    consumer: Consumer<f32>,
    open: Arc<AtomicBool>,
}

impl QueueReader {
    /// True between the producer's `start` and `stop`.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Samples waiting to be played.
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }

    /// Fill `out` from the queue. Returns the number of samples read; the rest
    /// of `out` is zeroed.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let n = self.consumer.slots().min(out.len());
        let mut read = 0;
        if n > 0 {
            if let Ok(chunk) = self.consumer.read_chunk(n) {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..n].copy_from_slice(second);
                chunk.commit_all();
                read = n;
            }
        }
        out[read..].fill(0.0);
        read
    }

    /// Drop everything queued.
    pub fn discard(&mut self) -> usize {
        let n = self.consumer.slots();
        if let Ok(chunk) = self.consumer.read_chunk(n) {
            chunk.commit_all();
        }
        n
    }
}

/// Accepts every frame and throws it away. Runs the loop without a device.
#[derive(Debug, Default)]
pub struct DiscardSink {
    open: bool,
    bytes: u64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes accepted so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl OutputSink for DiscardSink {
    fn start(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn push(&mut self, frames: &[f32]) -> usize {
        if !self.open {
            return 0;
        }
        let whole = frames.len() - frames.len() % N_CHANNELS;
        self.bytes += (whole * SAMPLE_BYTES) as u64;
        whole * SAMPLE_BYTES
    }

    fn stop(&mut self) {
        self.open = false;
    }
}
