#![deny(warnings)]
#![deny(clippy::all)]

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use boundcopy_core::{skip_exact, transfer_all, transfer_n, Source, TransferError};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CLI: i32 = 2;
const EXIT_SHORT: i32 = 3;
const EXIT_IO: i32 = 4;
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
const BUFFER_SIZE_ENV: &str = "BOUNDCOPY_BUFFER_SIZE";

#[derive(Parser, Debug)]
#[command(name = "boundcopy", version, about = "Bounded byte copies between files and pipes")]
struct Cli {
    /// Read buffer size for file inputs, in bytes
    #[arg(long, global = true)]
    buffer_size: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy all of INPUT (`-` for stdin)
    Cat {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    /// Copy exactly LENGTH bytes of INPUT starting at OFFSET
    Range {
        input: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        length: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Cli(String),
}

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return EXIT_CLI;
        }
    };

    let result = resolve_buffer_size(cli.buffer_size).and_then(|buffer_size| match cli.command {
        Commands::Cat {
            input,
            output,
            force,
        } => cmd_cat(&input, output.as_deref(), force, buffer_size),
        Commands::Range {
            input,
            offset,
            length,
            output,
            force,
        } => cmd_range(&input, offset, length, output.as_deref(), force, buffer_size),
    });

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            report_error(&err);
            map_exit_code(&err)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn report_error(err: &CliError) {
    error!(error = %err, "command failed");
    eprintln!("error: {err}");
}

fn map_exit_code(err: &CliError) -> i32 {
    match err {
        CliError::Transfer(err) if err.is_short() => EXIT_SHORT,
        CliError::Transfer(_) => EXIT_IO,
        CliError::Io(_) => EXIT_IO,
        CliError::Cli(_) => EXIT_CLI,
    }
}

fn resolve_buffer_size(flag: Option<usize>) -> Result<usize, CliError> {
    let size = match flag {
        Some(size) => size,
        None => match std::env::var(BUFFER_SIZE_ENV) {
            Ok(value) => value.trim().parse::<usize>().map_err(|_| {
                CliError::Cli(format!("{BUFFER_SIZE_ENV} must be a byte count, got {value:?}"))
            })?,
            Err(_) => DEFAULT_BUFFER_SIZE,
        },
    };

    if size == 0 {
        return Err(CliError::Cli("buffer size must be at least 1 byte".to_string()));
    }

    Ok(size)
}

fn cmd_cat(
    input: &Path,
    output: Option<&Path>,
    force: bool,
    buffer_size: usize,
) -> Result<(), CliError> {
    info!(input = %input.display(), buffer_size, "copying input");

    let mut source = open_input(input, 0, buffer_size)?;
    let transferred = write_output(output, force, |sink| transfer_all(sink, &mut *source))?;

    info!(bytes = transferred, "copy complete");
    Ok(())
}

fn cmd_range(
    input: &Path,
    offset: u64,
    length: u64,
    output: Option<&Path>,
    force: bool,
    buffer_size: usize,
) -> Result<(), CliError> {
    info!(
        input = %input.display(),
        offset,
        length,
        buffer_size,
        "copying range"
    );

    let mut source = open_input(input, offset, buffer_size)?;
    let transferred =
        write_output(output, force, |sink| transfer_n(sink, &mut *source, length))?;

    info!(bytes = transferred, "copy complete");
    Ok(())
}

fn open_input(input: &Path, offset: u64, buffer_size: usize) -> Result<Box<dyn Source>, CliError> {
    if input == Path::new("-") {
        let mut stdin = io::stdin().lock();
        skip_exact(&mut stdin, offset)?;
        return Ok(Box::new(stdin));
    }

    let mut file = File::open(input)?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset))?;
    }

    Ok(Box::new(BufReader::with_capacity(buffer_size, file)))
}

fn write_output<F>(output: Option<&Path>, force: bool, copy: F) -> Result<u64, CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<u64, TransferError>,
{
    let Some(output) = output else {
        let mut stdout = io::stdout().lock();
        let transferred = copy(&mut stdout)?;
        stdout.flush()?;
        return Ok(transferred);
    };

    if output.exists() && !force {
        return Err(CliError::Cli(format!(
            "{} already exists, pass --force to overwrite",
            output.display()
        )));
    }

    let tmp_path = temp_path_for(output);
    let mut output_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)?;

    let result = copy(&mut output_file)
        .map_err(CliError::from)
        .and_then(|transferred| {
            output_file.sync_all()?;
            Ok(transferred)
        });
    drop(output_file);

    match result {
        Ok(transferred) => {
            finalize_output(&tmp_path, output)?;
            Ok(transferred)
        }
        Err(err) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

/// Hidden sibling of `output`, unique to this process.
fn temp_path_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn finalize_output(tmp_path: &Path, output: &Path) -> Result<(), io::Error> {
    if output.exists() {
        std::fs::remove_file(output)?;
    }
    std::fs::rename(tmp_path, output)
}
