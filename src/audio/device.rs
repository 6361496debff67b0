use std::sync::mpsc::Sender;

use super::{
    engine::AudioEvent,
    voices::{
        device_display_name,
        is_japanese,
        Voice,
    },
};
use crate::core::slots::RequestToken;

/// Fixed speaking rate for device utterances, slightly slower than natural
/// so learners can follow along.
pub const DEVICE_SPEECH_RATE: f32 = 0.9;

/// A voice as reported by the platform speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceVoice {
    pub name: String,
    pub lang: String,
}

/// One utterance handed to the device engine. The engine reports progress
/// back through `events`, tagging every message with `token` so stale
/// sessions can be told apart from the live one.
pub struct UtteranceJob {
    pub text: String,
    pub voice: Option<DeviceVoice>,
    pub rate: f32,
    pub token: RequestToken,
    pub events: Sender<AudioEvent>,
}

/// Platform speech engine seam. `voices()` must return a fresh snapshot on
/// every call; handles cached across calls go stale on some platforms.
/// Implementations report asynchronous progress through the job's event
/// sender rather than blocking in `speak`.
pub trait DeviceSynth {
    fn voices(&self) -> Vec<DeviceVoice>;

    fn speak(&mut self, job: UtteranceJob);

    /// Stops any in-flight utterance. Idempotent.
    fn stop(&mut self);
}

/// Stand-in when no platform engine is wired up: reports no voices, and
/// fails any utterance straight away so the session resets.
pub struct NullDevice;

impl DeviceSynth for NullDevice {
    fn voices(&self) -> Vec<DeviceVoice> {
        Vec::new()
    }

    fn speak(&mut self, job: UtteranceJob) {
        let _ = job.events.send(AudioEvent::DeviceErrored(job.token));
    }

    fn stop(&mut self) {}
}

/// Resolves the engine voice to speak with from a fresh snapshot: exact label
/// match first, then a label-prefix match (covers engines that decorate names
/// between catalog refreshes), then the first Japanese voice. `None` means the
/// engine should fall back to its own default.
pub fn pick_device_voice(fresh: &[DeviceVoice], selected: &Voice) -> Option<DeviceVoice> {
    let japanese: Vec<&DeviceVoice> =
        fresh.iter().filter(|voice| is_japanese(&voice.lang)).collect();

    japanese
        .iter()
        .find(|voice| device_display_name(&voice.name) == selected.display_name)
        .or_else(|| {
            japanese.iter().find(|voice| {
                device_display_name(&voice.name).contains(&selected.display_name)
                    || voice.name == selected.name
            })
        })
        .or_else(|| japanese.first())
        .map(|voice| (*voice).clone())
}
