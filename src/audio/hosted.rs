use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    io::Cursor,
};

use rodio::{
    Decoder,
    OutputStream,
    OutputStreamHandle,
    Sink,
};

use crate::core::errors::KotonoteError;

/// How many synthesized clips to keep before evicting the oldest.
pub const AUDIO_CACHE_CAPACITY: usize = 64;

type ClipKey = (String, String);

/// Synthesized WAV clips keyed by (hosted voice, exact text). Bounded;
/// the oldest entry leaves once the cap is reached, and rewriting a key
/// moves it to the back of the eviction queue.
pub struct AudioCache {
    clips: HashMap<ClipKey, Vec<u8>>,
    order: VecDeque<ClipKey>,
    capacity: usize,
}

impl Default for AudioCache {
    fn default() -> Self {
        Self::new(AUDIO_CACHE_CAPACITY)
    }
}

impl AudioCache {
    pub fn new(capacity: usize) -> Self {
        Self { clips: HashMap::new(), order: VecDeque::new(), capacity }
    }

    pub fn get(&self, voice: &str, text: &str) -> Option<&[u8]> {
        self.clips.get(&(voice.to_string(), text.to_string())).map(Vec::as_slice)
    }

    pub fn contains(&self, voice: &str, text: &str) -> bool {
        self.clips.contains_key(&(voice.to_string(), text.to_string()))
    }

    pub fn insert(&mut self, voice: &str, text: &str, wav: Vec<u8>) {
        let key = (voice.to_string(), text.to_string());
        if self.clips.insert(key.clone(), wav).is_some() {
            // A rewrite counts as fresh for eviction.
            self.order.retain(|known| known != &key);
        }
        self.order.push_back(key);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.clips.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Playback sink seam; lets the engine run against a fake output in tests.
/// Implementations stay on the embedder's thread (`rodio`'s stream handle is
/// not `Send`), so no `Send` bound here.
pub trait AudioOutput {
    fn play(&mut self, wav: &[u8]) -> Result<(), KotonoteError>;

    /// Stops the current clip. Idempotent.
    fn stop(&mut self);

    /// True once the current clip has drained (or nothing is playing).
    fn finished(&self) -> bool;
}

/// Default output on the platform's audio device.
pub struct RodioOutput {
    // Dropping the stream kills the sink, so it rides along here.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl RodioOutput {
    pub fn new() -> Result<Self, KotonoteError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|error| KotonoteError::Audio(error.to_string()))?;
        Ok(Self { _stream: stream, handle, sink: None })
    }
}

impl AudioOutput for RodioOutput {
    fn play(&mut self, wav: &[u8]) -> Result<(), KotonoteError> {
        self.stop();

        let sink = Sink::try_new(&self.handle)
            .map_err(|error| KotonoteError::Audio(error.to_string()))?;
        let source = Decoder::new(Cursor::new(wav.to_vec()))
            .map_err(|error| KotonoteError::Audio(error.to_string()))?;
        sink.append(source);
        self.sink = Some(sink);

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map_or(true, Sink::empty)
    }
}
