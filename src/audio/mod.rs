pub mod device;
pub mod engine;
pub mod hosted;
pub mod voices;
pub mod wav;

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod wav_tests;

pub use device::{
    DeviceSynth,
    DeviceVoice,
    NullDevice,
    UtteranceJob,
};
pub use engine::{
    AudioEngine,
    AudioEvent,
    PlaybackState,
};
pub use hosted::{
    AudioCache,
    AudioOutput,
    RodioOutput,
};
pub use voices::{
    Voice,
    VoiceKind,
};
