use rodio::Source;
use rtrb::Producer;
use std::time::Duration;

/// Pass-through source that copies a mono mix of everything it yields into
/// a ring buffer for the analyser. Decoders are converted to `f32` before
/// they reach the tap.
///
/// Runs on the audio output thread, so it never blocks: when the ring is
/// full the newest samples are dropped.
pub struct Tap<S> {
    inner: S,
    producer: Producer<f32>,
    channel: u16,
    accumulator: f32,
}

impl<S> Tap<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, producer: Producer<f32>) -> Self {
        Self {
            inner,
            producer,
            channel: 0,
            accumulator: 0.0,
        }
    }
}

impl<S> Iterator for Tap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.inner.next()?;
        let channels = self.inner.channels().max(1);

        self.accumulator += sample;
        self.channel += 1;
        if self.channel >= channels {
            let _ = self.producer.push(self.accumulator / channels as f32);
            self.channel = 0;
            self.accumulator = 0.0;
        }

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for Tap<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
