#[cfg(test)]
mod tests {
    use crate::audio::wav::{pcm_to_wav, SPEECH_SAMPLE_RATE};

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    #[test]
    fn header_declares_mono_16_bit_at_24k() {
        let pcm = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let wav = pcm_to_wav(&pcm).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16_at(&wav, 20), 1, "PCM format tag");
        assert_eq!(u16_at(&wav, 22), 1, "channel count");
        assert_eq!(u32_at(&wav, 24), SPEECH_SAMPLE_RATE, "sample rate");
        assert_eq!(u16_at(&wav, 34), 16, "bits per sample");
    }

    #[test]
    fn samples_survive_the_wrap() {
        let pcm = vec![0x01, 0x02, 0x03, 0x04];
        let wav = pcm_to_wav(&pcm).unwrap();

        // 44-byte canonical header, then the payload verbatim.
        assert_eq!(wav.len(), 44 + pcm.len());
        assert_eq!(&wav[44..], &pcm[..]);
    }

    #[test]
    fn trailing_odd_byte_is_dropped() {
        let wav = pcm_to_wav(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(wav.len(), 44 + 2);
    }

    #[test]
    fn empty_pcm_still_yields_a_valid_container() {
        let wav = pcm_to_wav(&[]).unwrap();
        assert_eq!(wav.len(), 44);
        assert_eq!(&wav[0..4], b"RIFF");
    }
}
