use clap::{Parser, Subcommand};
use drumloop::audio::buffer::RingStats;
use drumloop::audio::device::{AudioDeviceManager, DeviceStatus};
use drumloop::audio::export::{AudioExporter, ExportSettings};
use drumloop::codec::{CodecReport, MemoryBus, Pcm5242, pcm5242::DEFAULT_ADDRESS};
use drumloop::messaging::channels::NotificationConsumer;
use drumloop::messaging::command::Command;
use drumloop::messaging::notification::Notification;
use drumloop::{
    BufferRing, DrumEngine, DrumMachine, EngineConfig, OutputDevice, build_library,
    create_command_channel, create_notification_channel,
};
use ringbuf::traits::{Consumer, Producer};
use std::error::Error;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Ringbuffer capacity constants
const COMMAND_RINGBUFFER_CAPACITY: usize = 16;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

const CONTROL_POLL: Duration = Duration::from_millis(50);
const STATS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(version, about = "A sample-accurate drum loop player.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the arrangement in a loop through an audio output device.
    Play {
        /// Path to a .ron or .json engine config. Uses the built-in kit if omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output device name. Uses the host default if omitted.
        #[arg(short, long)]
        device: Option<String>,
        /// Stop after this many seconds instead of waiting for Enter.
        #[arg(short, long)]
        seconds: Option<u64>,
    },
    /// Renders the arrangement to a 16-bit stereo WAV file.
    Render {
        /// Output WAV path.
        #[arg(short, long)]
        out: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of passes through the arrangement.
        #[arg(short, long, default_value_t = 1)]
        loops: u32,
        /// Extra milliseconds rendered after the last pass.
        #[arg(long, default_value_t = 500)]
        tail_ms: u64,
    },
    /// Validates a config and prints the derived timing.
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Prints the built-in config as RON.
    DefaultConfig {},
    /// Lists the available audio output devices.
    Devices {},
    /// Runs the PCM5242 setup sequence against a shadow register file.
    Codec {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            device,
            seconds,
        } => play(config.as_deref(), device.as_deref(), seconds),
        Commands::Render {
            out,
            config,
            loops,
            tail_ms,
        } => render(config.as_deref(), out, loops, tail_ms),
        Commands::Check { config } => check(config.as_deref()),
        Commands::DefaultConfig {} => {
            println!("{}", EngineConfig::default().to_ron()?);
            Ok(())
        }
        Commands::Devices {} => {
            let devices = AudioDeviceManager::new().list_output_devices();
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("- {}{}", device.name, marker);
            }
            Ok(())
        }
        Commands::Codec {} => {
            codec();
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            EngineConfig::load(path)?
        }
        None => {
            let config = EngineConfig::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn play(
    config_path: Option<&Path>,
    device_name: Option<&str>,
    seconds: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path)?;

    let device = AudioDeviceManager::new().output_device(device_name)?;
    let output = OutputDevice::open(device, config.sample_rate())?;
    let sample_rate = output.sample_rate();

    let library = build_library(&config.samples, sample_rate)?.into_shared();
    let machine = DrumMachine::from_config(&config, library, sample_rate)?;

    let (producer, consumer) = BufferRing::new(config.ring_depth, config.frames_per_buffer).split();
    let monitor = producer.monitor();

    let (engine_notify_tx, mut engine_notify_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let (sink_notify_tx, mut sink_notify_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let (mut command_tx, command_rx) = create_command_channel(COMMAND_RINGBUFFER_CAPACITY);

    let mut engine =
        DrumEngine::new(machine, producer, sample_rate).with_notifications(engine_notify_tx);
    let primed = engine.prefill();
    info!(blocks = primed, "ring primed");

    let cpu_monitor = engine.cpu_monitor();
    let poll = engine.default_poll();

    // DAC setup runs before the first block is armed; faults never stop playback
    let codec_report = Pcm5242::new(MemoryBus::new(DEFAULT_ADDRESS)).configure();
    if let Some(faults) = Notification::from_codec_report(&codec_report) {
        faults.log();
    }

    let sink = output.start(consumer, sink_notify_tx)?;

    let fill_thread = thread::Builder::new()
        .name("drumloop-fill".to_string())
        .spawn(move || engine.run(command_rx, poll))?;

    let stop = Arc::new(AtomicBool::new(false));
    match seconds {
        Some(seconds) => info!(seconds, "playing"),
        None => {
            info!("playing, press Enter to stop");
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().lock().read_line(&mut line);
                stop.store(true, Ordering::Relaxed);
            });
        }
    }

    let started = Instant::now();
    let deadline = seconds.map(|s| started + Duration::from_secs(s));
    let mut last_report = Instant::now();
    let mut last_stats = RingStats::default();

    loop {
        let engine_failed = drain_notifications(&mut engine_notify_rx);
        let sink_failed = drain_notifications(&mut sink_notify_rx);

        if last_report.elapsed() >= STATS_INTERVAL {
            let stats = monitor.stats();
            info!(
                transfers = stats.transfers - last_stats.transfers,
                repeated = stats.repeated_blocks - last_stats.repeated_blocks,
                fill_avg_pct = cpu_monitor.get_cpu_percentage(),
                fill_worst_pct = cpu_monitor.get_worst_percentage(),
                load = ?cpu_monitor.get_load_level(),
                "ring status"
            );
            last_stats = stats;
            last_report = Instant::now();
        }

        if engine_failed || sink_failed || sink.status.get() == DeviceStatus::Error {
            warn!("output stream failed, stopping");
            break;
        }
        if stop.load(Ordering::Relaxed) || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        thread::sleep(CONTROL_POLL);
    }

    if command_tx.try_push(Command::Stop).is_err() {
        warn!("command queue full, fill thread may not stop");
    }
    let engine = fill_thread
        .join()
        .map_err(|_| "fill thread panicked")?;
    drop(sink);

    let stats = monitor.stats();
    info!(
        transfers = stats.transfers,
        repeated = stats.repeated_blocks,
        blocks_filled = engine.cpu_monitor().get_sample_count(),
        elapsed_s = started.elapsed().as_secs_f32(),
        "stopped"
    );
    Ok(())
}

/// Log everything pending; true if any of it was an error
fn drain_notifications(rx: &mut NotificationConsumer) -> bool {
    let mut failed = false;
    while let Some(notification) = rx.try_pop() {
        notification.log();
        failed |= notification.is_error();
    }
    failed
}

fn render(
    config_path: Option<&Path>,
    out: PathBuf,
    loops: u32,
    tail_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path)?;
    let sample_rate = config.sample_rate();

    let library = build_library(&config.samples, sample_rate)?.into_shared();
    let mut machine = DrumMachine::from_config(&config, library, sample_rate)?;

    let mut settings = ExportSettings::new(out, sample_rate);
    settings.loops = loops;
    settings.tail_frames = tail_ms * sample_rate as u64 / 1000;

    let summary = AudioExporter::new(settings).export(&mut machine, None)?;
    if summary.clipped_frames > 0 {
        warn!(frames = summary.clipped_frames, "output clipped");
    }
    println!(
        "Wrote {} frames to {}",
        summary.frames,
        summary.path.display()
    );
    Ok(())
}

fn check(config_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = load_config(config_path)?;
    let sample_rate = config.sample_rate();
    let timing = config.timing(sample_rate)?;
    let patterns = config.parse_patterns()?;

    let loop_frames = timing.loop_length_samples();
    println!("Sample rate:      {} Hz", sample_rate);
    println!("Tempo:            {} BPM", config.tempo_bpm);
    println!("Samples per tick: {}", timing.samples_per_tick);
    println!("Samples per bar:  {}", timing.samples_per_bar());
    println!(
        "Loop length:      {} bars, {} frames ({:.3} s)",
        timing.loop_bars,
        loop_frames,
        loop_frames as f64 / sample_rate as f64
    );
    println!(
        "Ring:             {} blocks of {} frames",
        config.ring_depth, config.frames_per_buffer
    );

    println!("\nPatterns (count: {}):", patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        println!("- {}: {} ({} hits)", index, pattern.name(), pattern.hit_count());
    }

    println!("\nArrangement: {:?}", config.arrangement);
    println!("\nConfig OK");
    Ok(())
}

fn codec() {
    let mut dac = Pcm5242::new(MemoryBus::new(DEFAULT_ADDRESS));

    let report = dac.configure();
    print_report("Setup", &report);

    let status = dac.check_status();
    print_report("Status", &status);

    println!("\nRegister dump (page {}):", dac.bus().page());
    for row in dac.dump_registers().chunks(16) {
        let Some(&(first, _)) = row.first() else {
            continue;
        };
        let cells: Vec<String> = row
            .iter()
            .map(|(_, value)| match value {
                Some(v) => format!("{:02X}", v),
                None => "--".to_string(),
            })
            .collect();
        println!("{:02X}: {}", first, cells.join(" "));
    }
}

fn print_report(title: &str, report: &CodecReport) {
    println!(
        "{}: {} writes, {} failed writes, {} failed reads, {} mismatches",
        title,
        report.writes,
        report.failed_writes.len(),
        report.failed_reads.len(),
        report.mismatches.len()
    );
    for mismatch in &report.mismatches {
        println!(
            "  reg {:3}: expected {:02X}, found {:02X}",
            mismatch.reg, mismatch.expected, mismatch.found
        );
    }
}
