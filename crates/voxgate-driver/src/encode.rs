//! Output encoding: WAV, raw PCM and (optionally) MP3.
//!
//! All formats are 16-bit mono. Samples outside `[-1.0, 1.0]` are clipped.

use std::io::Cursor;

use voxgate_core::{AudioFormat, GenerationError};

/// Whether this build can produce MP3.
pub const MP3_AVAILABLE: bool = cfg!(feature = "mp3");

/// Size sentinel for WAV headers whose length is not known up front.
const STREAMING_SIZE: u32 = u32::MAX;

#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Raw little-endian signed 16-bit PCM.
pub fn pcm_s16le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| to_i16(s).to_le_bytes())
        .collect()
}

/// Complete WAV file with exact sizes.
pub fn wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, GenerationError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(to_i16(sample)).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(cursor.into_inner())
}

#[allow(clippy::needless_pass_by_value)]
fn wav_error(e: hound::Error) -> GenerationError {
    GenerationError::Encoding(e.to_string())
}

/// 44-byte WAV header for a stream of unknown length.
///
/// RIFF and data sizes are set to `0xFFFFFFFF`; players treat that as
/// "read until end of stream".
pub fn streaming_wav_header(sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS: u16 = 16;
    let block_align = CHANNELS * BITS / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&CHANNELS.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&BITS.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&STREAMING_SIZE.to_le_bytes());
    header
}

/// Encode a complete sample buffer in `format`.
pub fn encode(
    format: AudioFormat,
    samples: &[f32],
    sample_rate: u32,
) -> Result<Vec<u8>, GenerationError> {
    match format {
        AudioFormat::Wav => wav(samples, sample_rate),
        AudioFormat::Pcm => Ok(pcm_s16le(samples)),
        AudioFormat::Mp3 => mp3(samples, sample_rate),
    }
}

#[cfg(feature = "mp3")]
fn mp3(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, GenerationError> {
    use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

    let fail = |what: &str, detail: String| GenerationError::Encoding(format!("{what}: {detail}"));

    let mut builder =
        Builder::new().ok_or_else(|| fail("mp3 encoder", "allocation failed".into()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| fail("set channels", format!("{e:?}")))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| fail("set sample rate", format!("{e:?}")))?;
    // MPEG-2.5 rates (below 16 kHz) top out at 64 kbps.
    let bitrate = if sample_rate < 16_000 {
        Bitrate::Kbps64
    } else {
        Bitrate::Kbps128
    };
    builder
        .set_brate(bitrate)
        .map_err(|e| fail("set bitrate", format!("{e:?}")))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| fail("set quality", format!("{e:?}")))?;
    let mut encoder = builder
        .build()
        .map_err(|e| fail("build encoder", format!("{e:?}")))?;

    let pcm: Vec<i16> = samples.iter().map(|&s| to_i16(s)).collect();
    let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(pcm.len()));
    encoder
        .encode_to_vec(MonoPcm(&pcm), &mut out)
        .map_err(|e| fail("encode", format!("{e:?}")))?;
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| fail("flush", format!("{e:?}")))?;
    Ok(out)
}

#[cfg(not(feature = "mp3"))]
fn mp3(_samples: &[f32], _sample_rate: u32) -> Result<Vec<u8>, GenerationError> {
    Err(GenerationError::Encoding(
        "MP3 output is not available in this build".into(),
    ))
}
