use mysound_engine::audio::backend::list_output_devices;
use mysound_engine::sound::effect::Gain;
use mysound_engine::sound::signal::white_noise;
use mysound_engine::{AudioEngine, DeviceStatus, EngineConfig, MixMode};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const USAGE: &str =
    "Usage: mysound_engine [--config <engine.ron>] [--device <name>] [--list-devices] [audio file]";

struct Args {
    config: Option<PathBuf>,
    device: Option<String>,
    audio_file: Option<PathBuf>,
    list_devices: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        device: None,
        audio_file: None,
        list_devices: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--device" | "-d" => {
                args.device = Some(iter.next().ok_or("--device needs a name")?);
            }
            "--list-devices" => args.list_devices = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            other if other.starts_with('-') => {
                return Err(format!("Unknown option {}\n{}", other, USAGE));
            }
            other => args.audio_file = Some(PathBuf::from(other)),
        }
    }
    Ok(args)
}

fn main() {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    if args.list_devices {
        for device in list_output_devices() {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return;
    }

    let mut config = match &args.config {
        Some(path) => match EngineConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(device) = args.device {
        config = config.with_device_name(device);
    }

    let engine = match AudioEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Audio engine initialisation failed: {}", e);
            std::process::exit(1);
        }
    };

    let sound = match &args.audio_file {
        Some(path) => match engine.create_sound_from_file(path) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            log::info!("No audio file given, playing white noise");
            let noise = white_noise(engine.sample_rate() as usize, 1);
            let id = engine.create_sound(&noise);
            if let Err(e) = engine.add_effect(id, Box::new(Gain::new(0.1))) {
                log::error!("{}", e);
            }
            id
        }
    };

    if let Err(e) = engine.play(sound) {
        log::error!("{}", e);
        return;
    }

    let quit = Arc::new(AtomicBool::new(false));
    let quit_flag = Arc::clone(&quit);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        quit_flag.store(true, Ordering::Relaxed);
    });

    println!("Playing, press Enter to quit");

    let poll_interval = engine.config().period() / 4;
    let mut last_report = Instant::now();
    while !quit.load(Ordering::Relaxed) {
        if engine.mix_mode() == MixMode::Polled {
            engine.process_audio();
        }
        thread::sleep(poll_interval);

        if last_report.elapsed() >= Duration::from_secs(5) {
            let stats = engine.handoff_stats();
            log::info!(
                "Mix load {:.1}% ({:?}), peak {:.2}, {} cycles, {} stale, {} contended",
                engine.load_monitor().load_percentage(),
                engine.load_monitor().load_level(),
                engine.output_peak(),
                stats.serviced(),
                stats.replayed(),
                stats.contended()
            );
            if engine.device_status() == DeviceStatus::Error {
                log::warn!("Output device reported an error, audio may have stopped");
            }
            last_report = Instant::now();
        }
    }
}
