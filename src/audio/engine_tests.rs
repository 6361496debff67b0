#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc::Sender,
            Arc, Mutex,
        },
        thread,
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio::runtime::Runtime;

    use crate::{
        audio::{
            device::{DeviceSynth, DeviceVoice, UtteranceJob},
            engine::{AudioEngine, AudioEvent, PlaybackState},
            hosted::AudioOutput,
        },
        core::{errors::KotonoteError, messages, slots::RequestToken},
        remote::SpeechSynthesizer,
    };

    const SLOW_MS: u64 = 80;

    /// Returns the text itself as PCM so tests can recognize clips by their
    /// payload. Texts listed as slow take `SLOW_MS` to resolve.
    struct ScriptedSynth {
        calls: AtomicUsize,
        fail: bool,
        slow_text: Option<String>,
    }

    impl ScriptedSynth {
        fn instant() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false, slow_text: None }
        }

        fn slow_on(text: &str) -> Self {
            Self { calls: AtomicUsize::new(0), fail: false, slow_text: Some(text.to_string()) }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true, slow_text: None }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ScriptedSynth {
        async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, KotonoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.slow_text.as_deref() == Some(text) {
                tokio::time::sleep(Duration::from_millis(SLOW_MS)).await;
            }
            if self.fail {
                return Err(KotonoteError::Custom("offline".to_string()));
            }
            Ok(text.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct DeviceLog {
        jobs: Vec<(String, Option<String>, f32, RequestToken, Sender<AudioEvent>)>,
        stops: usize,
    }

    struct ScriptedDevice {
        catalog: Arc<Mutex<Vec<DeviceVoice>>>,
        log: Arc<Mutex<DeviceLog>>,
    }

    impl DeviceSynth for ScriptedDevice {
        fn voices(&self) -> Vec<DeviceVoice> {
            self.catalog.lock().unwrap().clone()
        }

        fn speak(&mut self, job: UtteranceJob) {
            self.log.lock().unwrap().jobs.push((
                job.text,
                job.voice.map(|voice| voice.name),
                job.rate,
                job.token,
                job.events,
            ));
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().stops += 1;
        }
    }

    #[derive(Default)]
    struct FakeOutputState {
        played: Vec<Vec<u8>>,
        stops: usize,
        drained: bool,
        fail_next: bool,
    }

    struct FakeOutput {
        state: Arc<Mutex<FakeOutputState>>,
    }

    impl AudioOutput for FakeOutput {
        fn play(&mut self, wav: &[u8]) -> Result<(), KotonoteError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_next {
                return Err(KotonoteError::Audio("no output route".to_string()));
            }
            state.played.push(wav.to_vec());
            state.drained = false;
            Ok(())
        }

        fn stop(&mut self) {
            self.state.lock().unwrap().stops += 1;
        }

        fn finished(&self) -> bool {
            self.state.lock().unwrap().drained
        }
    }

    struct Harness {
        engine: AudioEngine,
        synth: Arc<ScriptedSynth>,
        device_catalog: Arc<Mutex<Vec<DeviceVoice>>>,
        device_log: Arc<Mutex<DeviceLog>>,
        output: Arc<Mutex<FakeOutputState>>,
    }

    fn harness(synth: ScriptedSynth, device_voices: Vec<DeviceVoice>) -> Harness {
        let synth = Arc::new(synth);
        let device_catalog = Arc::new(Mutex::new(device_voices));
        let device_log = Arc::new(Mutex::new(DeviceLog::default()));
        let output = Arc::new(Mutex::new(FakeOutputState::default()));

        let engine = AudioEngine::new(
            Arc::new(Runtime::new().unwrap()),
            synth.clone(),
            Box::new(ScriptedDevice {
                catalog: device_catalog.clone(),
                log: device_log.clone(),
            }),
            Box::new(FakeOutput { state: output.clone() }),
        );

        Harness { engine, synth, device_catalog, device_log, output }
    }

    fn kyoko() -> DeviceVoice {
        DeviceVoice { name: "Kyoko".to_string(), lang: "ja-JP".to_string() }
    }

    fn poll_until(
        engine: &mut AudioEngine,
        mut done: impl FnMut(&AudioEngine) -> bool,
    ) -> Vec<String> {
        let mut notices = Vec::new();
        for _ in 0..400 {
            notices.extend(engine.poll());
            if done(engine) {
                return notices;
            }
            thread::sleep(Duration::from_millis(5));
        }
        notices
    }

    #[test]
    fn hosted_play_fetches_wraps_and_caches() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());
        assert_eq!(h.engine.selected_voice().map(|v| v.name.as_str()), Some("Kore"));

        h.engine.play("いい");
        assert_eq!(h.engine.loading_text(), Some("いい"));

        let notices = poll_until(&mut h.engine, |engine| engine.is_speaking());
        assert!(notices.is_empty(), "unexpected notices: {:?}", notices);
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);

        let output = h.output.lock().unwrap();
        assert_eq!(output.played.len(), 1);
        assert_eq!(output.played[0].len(), 44 + "いい".len());
        assert_eq!(&output.played[0][44..], "いい".as_bytes());
    }

    #[test]
    fn replaying_cached_text_skips_the_fetch_and_the_loading_state() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());

        h.engine.play("いい");
        poll_until(&mut h.engine, |engine| engine.is_speaking());
        h.output.lock().unwrap().drained = true;
        poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);

        // Cache hit: straight to Speaking, no second synthesis call.
        h.engine.play("いい");
        assert!(h.engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.output.lock().unwrap().played.len(), 2);
    }

    #[test]
    fn later_play_wins_regardless_of_completion_order() {
        let mut h = harness(ScriptedSynth::slow_on("ああ"), Vec::new());

        h.engine.play("ああ");
        h.engine.play("いい");

        let notices = poll_until(&mut h.engine, |engine| engine.is_speaking());
        assert!(notices.is_empty());
        assert_eq!(&h.output.lock().unwrap().played[0][44..], "いい".as_bytes());

        // Let the slow first clip resolve; it must be dropped, not played.
        thread::sleep(Duration::from_millis(SLOW_MS + 60));
        let notices = h.engine.poll();
        assert!(notices.is_empty());
        assert!(h.engine.is_speaking());
        assert_eq!(h.output.lock().unwrap().played.len(), 1);

        // The superseded clip was never cached either.
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 2);
        h.engine.play("ああ");
        poll_until(&mut h.engine, |engine| engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_mid_fetch_discards_the_clip_entirely() {
        let mut h = harness(ScriptedSynth::slow_on("ああ"), Vec::new());

        h.engine.play("ああ");
        assert_eq!(h.engine.loading_text(), Some("ああ"));
        h.engine.cancel();
        assert_eq!(*h.engine.state(), PlaybackState::Idle);

        thread::sleep(Duration::from_millis(SLOW_MS + 60));
        let notices = h.engine.poll();

        assert!(notices.is_empty(), "cancelled fetch must stay silent");
        assert_eq!(*h.engine.state(), PlaybackState::Idle);
        {
            let output = h.output.lock().unwrap();
            assert!(output.played.is_empty());
            assert!(output.stops >= 1, "cancel must stop the sink");
        }

        // Uncached: a fresh play fetches again.
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);
        h.engine.play("ああ");
        poll_until(&mut h.engine, |engine| engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn synthesis_failure_surfaces_the_network_message() {
        let mut h = harness(ScriptedSynth::failing(), Vec::new());

        h.engine.play("いい");
        let notices = poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);

        assert_eq!(notices, vec![messages::TTS_NETWORK_ERROR.to_string()]);
        assert!(h.output.lock().unwrap().played.is_empty());
    }

    #[test]
    fn sink_failure_surfaces_the_playback_message_but_keeps_the_clip() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());
        h.output.lock().unwrap().fail_next = true;

        h.engine.play("いい");
        let notices = poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);
        assert_eq!(notices, vec![messages::TTS_FAILED.to_string()]);

        // The clip made it into the cache before the sink refused it.
        h.output.lock().unwrap().fail_next = false;
        h.engine.play("いい");
        assert!(h.engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn each_voice_keeps_its_own_cached_clip() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());

        h.engine.play("いい");
        poll_until(&mut h.engine, |engine| engine.is_speaking());

        h.engine.select_voice("[AI] Fenrir (男聲/深沈)");
        h.engine.play("いい");
        poll_until(&mut h.engine, |engine| engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 2, "same text, new voice, new fetch");

        // Replays under either voice come from the cache.
        h.engine.play("いい");
        assert!(h.engine.is_speaking());
        h.engine.select_voice("[AI] Kore (女聲/平穩)");
        h.engine.play("いい");
        assert!(h.engine.is_speaking());
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn hosted_completion_is_observed_through_the_drained_sink() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());

        h.engine.play("いい");
        poll_until(&mut h.engine, |engine| engine.is_speaking());

        h.output.lock().unwrap().drained = true;
        poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);
        assert_eq!(*h.engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn device_play_runs_at_the_fixed_slow_rate() {
        let mut h = harness(ScriptedSynth::instant(), vec![kyoko()]);
        h.engine.select_voice("[Device] Kyoko");

        h.engine.play("こんにちは");
        // No loading state on the device path.
        assert_eq!(*h.engine.state(), PlaybackState::Idle);

        let (token, sender) = {
            let log = h.device_log.lock().unwrap();
            assert_eq!(log.jobs.len(), 1);
            let job = &log.jobs[0];
            assert_eq!(job.0, "こんにちは");
            assert_eq!(job.1.as_deref(), Some("Kyoko"));
            assert!((job.2 - 0.9).abs() < f32::EPSILON);
            (job.3, job.4.clone())
        };

        sender.send(AudioEvent::DeviceStarted(token)).unwrap();
        poll_until(&mut h.engine, |engine| engine.is_speaking());

        sender.send(AudioEvent::DeviceFinished(token)).unwrap();
        poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 0, "device path never hits the API");
    }

    #[test]
    fn device_errors_are_swallowed() {
        let mut h = harness(ScriptedSynth::instant(), vec![kyoko()]);
        h.engine.select_voice("[Device] Kyoko");

        h.engine.play("こんにちは");
        let (token, sender) = {
            let log = h.device_log.lock().unwrap();
            (log.jobs[0].3, log.jobs[0].4.clone())
        };

        sender.send(AudioEvent::DeviceErrored(token)).unwrap();
        let notices = h.engine.poll();

        assert!(notices.is_empty(), "device failures must not alert");
        assert_eq!(*h.engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn stale_device_events_cannot_touch_the_new_session() {
        let mut h = harness(ScriptedSynth::instant(), vec![kyoko()]);
        h.engine.select_voice("[Device] Kyoko");

        h.engine.play("一つ目");
        h.engine.play("二つ目");

        let (first, second, sender) = {
            let log = h.device_log.lock().unwrap();
            assert_eq!(log.jobs.len(), 2);
            assert!(log.stops >= 2, "each play stops the previous utterance");
            (log.jobs[0].3, log.jobs[1].3, log.jobs[1].4.clone())
        };

        sender.send(AudioEvent::DeviceStarted(second)).unwrap();
        poll_until(&mut h.engine, |engine| engine.is_speaking());

        sender.send(AudioEvent::DeviceFinished(first)).unwrap();
        h.engine.poll();
        assert!(h.engine.is_speaking(), "stale finish must be ignored");

        sender.send(AudioEvent::DeviceFinished(second)).unwrap();
        poll_until(&mut h.engine, |engine| *engine.state() == PlaybackState::Idle);
        assert_eq!(*h.engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn refresh_folds_late_device_voices_into_the_catalog() {
        let mut h = harness(ScriptedSynth::instant(), Vec::new());
        assert_eq!(h.engine.voices().len(), 5);

        h.device_catalog.lock().unwrap().push(kyoko());
        h.engine.refresh_voices();

        assert_eq!(h.engine.voices().len(), 6);
        // The existing selection survives the rebuild.
        assert_eq!(h.engine.selected_voice().map(|v| v.name.as_str()), Some("Kore"));
    }
}
