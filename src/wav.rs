//! WAV encoding and decoding for [`AudioTrack`]

use anyhow::{anyhow, Context, Result};
use dub_core::AudioTrack;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// Read a WAV file, down-mixing to mono
pub fn read_wav(path: &Path) -> Result<AudioTrack> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    decode(reader)
}

/// Decode an in-memory WAV body, down-mixing to mono
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<AudioTrack> {
    let reader = WavReader::new(Cursor::new(bytes)).context("Invalid WAV data")?;
    decode(reader)
}

/// Write a track as 16-bit PCM mono
pub fn write_wav(track: &AudioTrack, path: &Path) -> Result<()> {
    let writer = WavWriter::create(path, spec_for(track))
        .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
    encode(track, writer)
}

/// Encode a track as an in-memory 16-bit PCM mono WAV
pub fn encode_wav_bytes(track: &AudioTrack) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let writer = WavWriter::new(&mut cursor, spec_for(track))?;
        encode(track, writer)?;
    }
    Ok(cursor.into_inner())
}

fn spec_for(track: &AudioTrack) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: track.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn encode<W: Write + Seek>(track: &AudioTrack, mut writer: WavWriter<W>) -> Result<()> {
    for &sample in track.samples() {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<AudioTrack> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(anyhow!("WAV data declares zero channels"));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioTrack::new(samples, spec.sample_rate)?)
}
