use std::io::Cursor;

use hound::{
    SampleFormat,
    WavSpec,
    WavWriter,
};

use crate::core::errors::KotonoteError;

/// Sample rate of the PCM stream returned by the hosted speech endpoint.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Wraps raw little-endian 16-bit mono PCM in a WAV container so a format
/// sniffing decoder recognizes the stream. A trailing odd byte is dropped.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, KotonoteError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SPEECH_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for sample in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}
