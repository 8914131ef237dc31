// Asset loading - decode audio files into f32 sample buffers
//
// WAV goes through hound, FLAC through claxon, MP3 and Ogg through
// symphonia. Decoded data stays interleaved; `to_mono()`
// folds it down for the engine, which only plays monophonic clips.

use std::fs::File;
use std::path::Path;

use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::error::LoadError;

/// Decoded PCM data
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Average all channels of each frame into one sample
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Decode an audio file, dispatching on its extension
pub fn load_audio(path: &Path) -> Result<DecodedAudio, LoadError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    let decoded = match extension.as_str() {
        "wav" | "wave" => load_wav(path)?,
        "flac" => load_flac(path)?,
        "mp3" | "ogg" => load_with_symphonia(path)?,
        _ => return Err(LoadError::UnsupportedFormat(extension)),
    };

    if decoded.samples.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    log::debug!(
        "Loaded {}: {} frames, {} channel(s), {} Hz",
        path.display(),
        decoded.frames(),
        decoded.channels,
        decoded.sample_rate
    );

    Ok(decoded)
}

fn load_wav(path: &Path) -> Result<DecodedAudio, LoadError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample as u32);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn load_flac(path: &Path) -> Result<DecodedAudio, LoadError> {
    let mut reader = FlacReader::open(path)?;
    let info = reader.streaminfo();
    let scale = int_scale(info.bits_per_sample);

    let samples = reader
        .samples()
        .map(|s| s.map(|s| s as f32 / scale))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedAudio {
        samples,
        channels: info.channels as u16,
        sample_rate: info.sample_rate,
    })
}

fn load_with_symphonia(path: &Path) -> Result<DecodedAudio, LoadError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let (codec_params, track_id) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoadError::NoTracks(path.to_path_buf()))?;
        (track.codec_params.clone(), track.id)
    };

    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut samples = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frame: skip it, the stream may recover
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let buffer = sample_buffer.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        if buffer.capacity() < decoded.capacity() * spec.channels.count() {
            *buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        }
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Full-scale value for a signed integer of `bits` bits
fn int_scale(bits: u32) -> f32 {
    (1u64 << (bits.clamp(1, 32) - 1)) as f32
}
