use std::{
    fs::File,
    hash::{DefaultHasher, Hash, Hasher},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use famicore::{Nes, SCREEN_HEIGHT, SCREEN_WIDTH};
use log::*;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Run an iNES ROM headlessly for a number of frames and print a hash of the final picture.
#[derive(Parser, Debug)]
#[command(name = "famicore", version, about, long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,
    /// Number of frames to run
    #[arg(short, long, default_value_t = 60)]
    frames: u32,
    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
    /// Write the last frame to this path as a binary PPM image
    #[arg(short, long)]
    screenshot: Option<PathBuf>,
}

fn write_ppm(path: &Path, framebuffer: &[u8]) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write!(file, "P6\n{} {}\n255\n", SCREEN_WIDTH, SCREEN_HEIGHT)?;
    file.write_all(framebuffer)?;
    file.flush()
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = TermLogger::init(
        args.log_level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Unable to initialise logger: {}", e);
    }

    let data = match std::fs::read(&args.rom) {
        Ok(d) => d,
        Err(e) => {
            error!("Unable to read {}: {}", args.rom.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let mut nes = match Nes::from_rom(&data) {
        Ok(n) => n,
        Err(e) => {
            error!("Unable to load {}: {}", args.rom.display(), e);
            return ExitCode::FAILURE;
        }
    };
    info!("Running {} frames", args.frames);
    let cycles: u64 = (0..args.frames).map(|_| nes.step_frame() as u64).sum();

    let mut hasher = DefaultHasher::new();
    nes.framebuffer().hash(&mut hasher);
    println!(
        "{} frames, {} CPU cycles, frame hash {:016X}",
        nes.frame_count(),
        cycles,
        hasher.finish()
    );
    if nes.cpu.jammed {
        warn!("CPU is jammed, last instructions:");
        nes.recent_instructions()
            .iter()
            .for_each(|r| warn!("{}", r));
    }

    if let Some(path) = args.screenshot {
        if let Err(e) = write_ppm(&path, nes.framebuffer()) {
            error!("Unable to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote {}", path.display());
    }
    ExitCode::SUCCESS
}
