use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use glyphtape::command::disassemble;
use glyphtape::config::{self, MachineConfig};
use glyphtape::{Channels, Session};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glyphtape", about = "Tape machine for programs written in configurable tokens")]
struct Cli {
    /// YAML token table mapping command names to tokens.
    #[arg(long, short)]
    table: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Print the recognized tokens of a source file, one per line.
    Filter { source: PathBuf },

    /// Print the command listing of a source file.
    Build { source: PathBuf },

    /// Execute a source file and print its result.
    Run {
        source: PathBuf,

        /// Tape capacity (non-positive means the default of 100).
        #[arg(long)]
        size: Option<i64>,

        /// Write a per-step trace to stderr.
        #[arg(long)]
        debug: bool,

        /// Echo output bytes as they are produced.
        #[arg(long)]
        flash: bool,

        /// Disable bounds and sign checks.
        #[arg(long)]
        loose: bool,
    },

    /// Rewrite a source file from another dialect into this table's tokens.
    Render {
        source: PathBuf,

        /// Token table the source is written in.
        #[arg(long)]
        from: PathBuf,

        /// Random seed for picking among alternative tokens.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glyphtape=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(&cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: &Cli) -> glyphtape::Result<()> {
    let mut session = Session::from_file(&cli.table)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.mode {
        Mode::Filter { source } => {
            for token in session.filter_from_file(source)? {
                writeln!(out, "{token}")?;
            }
        }
        Mode::Build { source } => {
            let commands = session.build_from_file(source)?;
            write!(out, "{}", disassemble(&commands))?;
        }
        Mode::Run {
            source,
            size,
            debug,
            flash,
            loose,
        } => {
            let config = MachineConfig {
                size: *size,
                debug: *debug,
                flash: *flash,
                loose: *loose,
            };
            let result = run(&mut session, source, &config, &mut out)?;
            if !config.flash {
                out.write_all(&result)?;
            }
            writeln!(out)?;
        }
        Mode::Render { source, from, seed } => {
            let origin = Session::from_file(from)?;
            let commands = origin.build_from_file(source)?;
            let mut rng = SmallRng::seed_from_u64(*seed);
            writeln!(out, "{}", session.resolver().render(&commands, &mut rng)?)?;
        }
    }
    Ok(())
}

fn run(
    session: &mut Session,
    source: &Path,
    config: &MachineConfig,
    out: &mut dyn Write,
) -> glyphtape::Result<Vec<u8>> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let stderr = std::io::stderr();
    let mut trace = stderr.lock();
    let mut channels = Channels::new(&mut input, out, &mut trace);
    let text = config::read_source(source)?;
    session.execute(&text, config, &mut channels)
}
