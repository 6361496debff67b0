use std::{
    sync::{
        mpsc::{
            self,
            Receiver,
            Sender,
        },
        Arc,
    },
    thread,
};

use tokio::runtime::Runtime;
use tracing::{
    debug,
    warn,
};

use super::{
    device::{
        pick_device_voice,
        DeviceSynth,
        UtteranceJob,
        DEVICE_SPEECH_RATE,
    },
    hosted::{
        AudioCache,
        AudioOutput,
    },
    voices::{
        build_catalog,
        reconcile_selection,
        Voice,
        VoiceKind,
    },
    wav::pcm_to_wav,
};
use crate::{
    core::{
        errors::KotonoteError,
        messages,
        slots::{
            RequestSlots,
            RequestToken,
        },
    },
    remote::SpeechSynthesizer,
};

/// The engine runs at most one playback session, so a single slot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlaybackSlot;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Idle,
    /// A hosted clip is being fetched; `text` is what will be spoken.
    Loading { text: String },
    Speaking,
}

/// Completion messages from the worker thread and the device engine. Every
/// variant carries the session token it belongs to; stale ones are dropped.
pub enum AudioEvent {
    SpeechFetched {
        token: RequestToken,
        voice: String,
        text: String,
        result: Result<Vec<u8>, KotonoteError>,
    },
    DeviceStarted(RequestToken),
    DeviceFinished(RequestToken),
    DeviceErrored(RequestToken),
}

struct ActiveSession {
    token: RequestToken,
    kind: VoiceKind,
}

/// Two-tier speech playback: hosted synthesis through the remote client and
/// `rodio`, or the platform engine via [`DeviceSynth`]. Poll-driven; the
/// embedder calls [`poll`](Self::poll) every frame and renders the returned
/// notices.
pub struct AudioEngine {
    runtime: Arc<Runtime>,
    synth: Arc<dyn SpeechSynthesizer>,
    device: Box<dyn DeviceSynth>,
    output: Box<dyn AudioOutput>,
    sender: Sender<AudioEvent>,
    receiver: Receiver<AudioEvent>,
    session: RequestSlots<PlaybackSlot>,
    active: Option<ActiveSession>,
    state: PlaybackState,
    cache: AudioCache,
    voices: Vec<Voice>,
    selected: Option<Voice>,
    notices: Vec<String>,
}

impl AudioEngine {
    pub fn new(
        runtime: Arc<Runtime>,
        synth: Arc<dyn SpeechSynthesizer>,
        device: Box<dyn DeviceSynth>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();

        let mut engine = Self {
            runtime,
            synth,
            device,
            output,
            sender,
            receiver,
            session: RequestSlots::new(),
            active: None,
            state: PlaybackState::Idle,
            cache: AudioCache::default(),
            voices: Vec::new(),
            selected: None,
            notices: Vec::new(),
        };
        engine.refresh_voices();
        engine
    }

    /// Rebuilds the catalog from a fresh device snapshot and reconciles the
    /// selection. Call whenever the platform reports its voices changed;
    /// device catalogs routinely arrive after startup.
    pub fn refresh_voices(&mut self) {
        let fresh = self.device.voices();
        self.voices = build_catalog(&fresh);
        self.selected = reconcile_selection(&self.voices, self.selected.as_ref());
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.selected.as_ref()
    }

    /// Selects a catalog voice by its display label. Unknown labels leave the
    /// current selection in place.
    pub fn select_voice(&mut self, display_name: &str) {
        if let Some(voice) = self.voices.iter().find(|v| v.display_name == display_name) {
            self.selected = Some(voice.clone());
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.state == PlaybackState::Speaking
    }

    pub fn loading_text(&self) -> Option<&str> {
        match &self.state {
            PlaybackState::Loading { text } => Some(text),
            _ => None,
        }
    }

    /// Speaks `text` with the selected voice, replacing any session already
    /// in flight. No-op when nothing is selected.
    pub fn play(&mut self, text: &str) {
        self.cancel();

        let voice = match self.selected.clone() {
            Some(voice) => voice,
            None => return,
        };

        match voice.kind {
            VoiceKind::Device => self.play_device(text, &voice),
            VoiceKind::Hosted => self.play_hosted(text, &voice),
        }
    }

    /// Invalidates the session token and stops both backends. Safe to call
    /// at any time, including when nothing is playing.
    pub fn cancel(&mut self) {
        self.session.cancel(PlaybackSlot);
        self.device.stop();
        self.output.stop();
        self.active = None;
        self.state = PlaybackState::Idle;
    }

    /// Drains pending events, watches the sink for hosted completion, and
    /// returns any user-facing playback messages raised since the last call.
    pub fn poll(&mut self) -> Vec<String> {
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
        }

        if let Some(active) = &self.active {
            if active.kind == VoiceKind::Hosted
                && self.state == PlaybackState::Speaking
                && self.output.finished()
            {
                let token = active.token;
                self.session.finish(&PlaybackSlot, token);
                self.active = None;
                self.state = PlaybackState::Idle;
            }
        }

        std::mem::take(&mut self.notices)
    }

    fn play_device(&mut self, text: &str, voice: &Voice) {
        let token = self.session.start(PlaybackSlot);
        self.active = Some(ActiveSession { token, kind: VoiceKind::Device });

        // Resolve against a fresh snapshot right before speaking; handles
        // cached from the catalog build may already be stale.
        let fresh = self.device.voices();
        let resolved = pick_device_voice(&fresh, voice);

        self.device.speak(UtteranceJob {
            text: text.to_string(),
            voice: resolved,
            rate: DEVICE_SPEECH_RATE,
            token,
            events: self.sender.clone(),
        });
        // State flips to Speaking on the engine-reported start event.
    }

    fn play_hosted(&mut self, text: &str, voice: &Voice) {
        let token = self.session.start(PlaybackSlot);
        self.active = Some(ActiveSession { token, kind: VoiceKind::Hosted });

        if let Some(wav) = self.cache.get(&voice.name, text) {
            let wav = wav.to_vec();
            self.start_playback(token, &wav);
            return;
        }

        self.state = PlaybackState::Loading { text: text.to_string() };

        let sender = self.sender.clone();
        let runtime = self.runtime.clone();
        let synth = self.synth.clone();
        let voice_name = voice.name.clone();
        let text = text.to_string();

        thread::spawn(move || {
            let result = runtime.block_on(async { synth.synthesize(&text, &voice_name).await });

            let _ = sender.send(AudioEvent::SpeechFetched {
                token,
                voice: voice_name,
                text,
                result,
            });
        });
    }

    fn start_playback(&mut self, token: RequestToken, wav: &[u8]) {
        if !self.session.is_current(&PlaybackSlot, token) {
            return;
        }

        match self.output.play(wav) {
            Ok(()) => self.state = PlaybackState::Speaking,
            Err(error) => {
                warn!(%error, "playback failed to start");
                self.notices.push(messages::TTS_FAILED.to_string());
                self.session.finish(&PlaybackSlot, token);
                self.active = None;
                self.state = PlaybackState::Idle;
            }
        }
    }

    fn apply(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::SpeechFetched { token, voice, text, result } => {
                if !self.session.is_current(&PlaybackSlot, token) {
                    debug!("discarding superseded speech response");
                    return;
                }

                let pcm = match result {
                    Ok(pcm) => pcm,
                    Err(error) => {
                        warn!(%error, "speech synthesis failed");
                        self.notices.push(messages::TTS_NETWORK_ERROR.to_string());
                        self.session.finish(&PlaybackSlot, token);
                        self.active = None;
                        self.state = PlaybackState::Idle;
                        return;
                    }
                };

                match pcm_to_wav(&pcm) {
                    Ok(wav) => {
                        self.cache.insert(&voice, &text, wav.clone());
                        self.start_playback(token, &wav);
                    }
                    Err(error) => {
                        warn!(%error, "could not wrap synthesized audio");
                        self.notices.push(messages::TTS_FAILED.to_string());
                        self.session.finish(&PlaybackSlot, token);
                        self.active = None;
                        self.state = PlaybackState::Idle;
                    }
                }
            }
            AudioEvent::DeviceStarted(token) => {
                if self.session.is_current(&PlaybackSlot, token) {
                    self.state = PlaybackState::Speaking;
                }
            }
            AudioEvent::DeviceFinished(token) => {
                if self.session.finish(&PlaybackSlot, token) {
                    self.active = None;
                    self.state = PlaybackState::Idle;
                }
            }
            // Device failures reset the session without surfacing a message;
            // the platform engines mis-report errors too often to alert on.
            AudioEvent::DeviceErrored(token) => {
                if self.session.finish(&PlaybackSlot, token) {
                    self.active = None;
                    self.state = PlaybackState::Idle;
                }
            }
        }
    }
}
