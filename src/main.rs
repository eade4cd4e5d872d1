use std::path::PathBuf;

use clap::Parser;
use log::info;

use cb2pgn::convert;

/// Convert a ChessBase database (.cbh + .cbg + .cbp + .cbt) into a PGN
/// file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Database path: the .cbh file or the shared base name.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path; .pgn is appended when missing.
    #[arg(short, long)]
    output: PathBuf,

    /// Convert with N parallel workers. With no value, uses the CPU
    /// count minus two.
    #[arg(short, long, value_name = "N", num_args = 0..=1, default_missing_value = "0")]
    parallel: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut base = args.input;
    if base.extension().is_some_and(|e| e == "cbh") {
        base.set_extension("");
    }
    let mut output = args.output;
    if output.extension().is_none_or(|e| e != "pgn") {
        let mut name = output.file_name().unwrap_or_default().to_os_string();
        name.push(".pgn");
        output.set_file_name(name);
    }

    info!("input file...: {}", base.display());
    info!("output file..: {}", output.display());

    match args.parallel {
        Some(n) => {
            let workers = if n == 0 {
                num_cpus::get().saturating_sub(2).max(1)
            } else {
                n
            };
            info!("workers......: {}", workers);
            convert::run_parallel(&base, &output, workers)?;
        }
        None => {
            convert::run_sequential(&base, &output)?;
        }
    }

    Ok(())
}
