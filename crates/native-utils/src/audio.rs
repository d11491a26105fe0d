use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate the Gemini Live API expects for microphone input (PCM16).
pub const LIVE_API_INPUT_SAMPLE_RATE: f64 = 16000.0;
/// Sample rate of the audio the Gemini Live API streams back (PCM16).
pub const LIVE_API_OUTPUT_SAMPLE_RATE: f64 = 24000.0;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits samples into fixed-size chunks, zero-padding the final one so every
/// chunk can be fed to a fixed-input resampler.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates a heap ring buffer shared between the playback queue and the
/// output stream callback.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Decodes a base64 PCM16 payload into f32 samples normalized to [-1, 1].
pub fn decode(base64_fragment: &str) -> Vec<f32> {
    if let Ok(pcm16) = base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        pcm16
            .chunks_exact(2)
            .map(|chunk| {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                (v as f32 / 32768.0).clamp(-1.0, 1.0)
            })
            .collect()
    } else {
        tracing::error!("Failed to decode base64 audio fragment");
        Vec::new()
    }
}

/// Encodes f32 samples as base64 PCM16 little-endian bytes.
pub fn encode(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32.to_binary();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// A trait for converting audio sample types to little-endian PCM16 bytes.
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| sample.to_le_bytes().to_vec())
            .collect()
    }
}

impl ToBinary for [f32] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| {
                let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                v.to_le_bytes().to_vec()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip_preserves_samples() {
        let samples = vec![0.0f32, 0.5, -0.5, 0.999];
        let encoded = encode(&samples);
        let decoded = decode(&encoded);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 1.0 / 32768.0 * 2.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn decode_of_invalid_base64_yields_empty() {
        assert!(decode("not base64!!!").is_empty());
    }

    #[test]
    fn split_pads_final_chunk_with_zeros() {
        let samples = vec![1.0f32; 5];
        let chunks = split_for_chunks(&samples, 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], vec![1.0, 0.0, 0.0, 0.0]);
    }
}
