use super::device::DeviceVoice;

/// Language tag reported for the fixed hosted voices.
pub const HOSTED_LANG: &str = "ja-JP";

/// The prebuilt hosted voices, paired with their short character blurbs.
pub const HOSTED_VOICES: [(&str, &str); 5] = [
    ("Kore", "女聲/平穩"),
    ("Fenrir", "男聲/深沈"),
    ("Puck", "男聲/活潑"),
    ("Charon", "男聲/低沈"),
    ("Zephyr", "女聲/溫柔"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    Hosted,
    Device,
}

/// A selectable voice. `name` is the canonical identifier (the prebuilt voice
/// id for hosted voices, the raw engine-reported name for device voices);
/// `display_name` is the prefixed label shown to the user and used to carry a
/// selection across catalog rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub name: String,
    pub display_name: String,
    pub kind: VoiceKind,
    pub lang: String,
}

/// A voice counts as Japanese when its language tag mentions `ja` or `JP`.
/// Kept loose on purpose: platforms disagree on `ja`, `ja-JP`, `ja_JP`.
pub fn is_japanese(lang: &str) -> bool {
    lang.contains("ja") || lang.contains("JP")
}

pub fn hosted_display_name(name: &str, description: &str) -> String {
    format!("[AI] {} ({})", name, description)
}

/// Device labels shorten the verbose Google voice names before prefixing.
pub fn device_display_name(raw: &str) -> String {
    let renamed =
        raw.replace("Google 日本語", "Google JP").replace("Google Japanese", "Google JP");
    format!("[Device] {}", renamed)
}

pub fn hosted_voices() -> Vec<Voice> {
    HOSTED_VOICES
        .iter()
        .map(|(name, description)| Voice {
            name: (*name).to_string(),
            display_name: hosted_display_name(name, description),
            kind: VoiceKind::Hosted,
            lang: HOSTED_LANG.to_string(),
        })
        .collect()
}

/// Rebuilds the full catalog from a fresh device snapshot: hosted voices
/// first, then the Japanese subset of the device voices.
pub fn build_catalog(device: &[DeviceVoice]) -> Vec<Voice> {
    let mut catalog = hosted_voices();
    catalog.extend(device.iter().filter(|voice| is_japanese(&voice.lang)).map(|voice| Voice {
        name: voice.name.clone(),
        display_name: device_display_name(&voice.name),
        kind: VoiceKind::Device,
        lang: voice.lang.clone(),
    }));
    catalog
}

/// Carries a selection across a catalog rebuild. A surviving label maps onto
/// the rebuilt entry, a vanished one falls back to the first voice, and an
/// empty catalog clears the selection.
pub fn reconcile_selection(catalog: &[Voice], previous: Option<&Voice>) -> Option<Voice> {
    match previous {
        Some(voice) => catalog
            .iter()
            .find(|candidate| candidate.display_name == voice.display_name)
            .or_else(|| catalog.first())
            .cloned(),
        None => catalog.first().cloned(),
    }
}
