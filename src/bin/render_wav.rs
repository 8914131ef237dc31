//! Offline render utility
//!
//! Mixes one or more audio files (or noise and a tone) through a manual engine
//! and writes the result to a stereo WAV file, without touching any device.
//!
//! Usage: render_wav <output.wav> [seconds] [input files...]

use mysound_engine::sound::signal::{sine, white_noise};
use mysound_engine::{AudioEngine, AudioExporter, EngineConfig, ExportSettings};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(
        args.next()
            .ok_or("Usage: render_wav <output.wav> [seconds] [input files...]")?,
    );
    let seconds: f32 = match args.next() {
        Some(value) => value.parse()?,
        None => 5.0,
    };
    let inputs: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = EngineConfig::default();
    let engine = AudioEngine::manual(config)?;

    if inputs.is_empty() {
        let sample_rate = engine.sample_rate();
        let noise = white_noise(sample_rate as usize / 2, 7);
        let id = engine.create_sound(&noise);
        engine.play(id)?;

        let tone = sine(sample_rate as usize, 440.0, sample_rate, 0.25);
        let id = engine.create_sound(&tone);
        engine.play(id)?;
    }
    for input in &inputs {
        let id = engine.create_sound_from_file(input)?;
        engine.play(id)?;
    }

    let cycles = (seconds * engine.sample_rate() as f32 / engine.window_length() as f32).ceil();
    let exporter = AudioExporter::new(ExportSettings::default());

    let mut last_percent = 0;
    let summary = exporter.render_to_wav_with_progress(
        &engine,
        &output,
        cycles as usize,
        |progress| {
            let percent = (progress * 100.0) as u32;
            if percent >= last_percent + 10 {
                log::info!("{}%", percent);
                last_percent = percent;
            }
        },
    )?;

    println!(
        "Wrote {} frames ({:.2}s) to {}",
        summary.frames,
        summary.frames as f32 / engine.sample_rate() as f32,
        output.display()
    );
    Ok(())
}
