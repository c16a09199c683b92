use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use cache_sim::{
    addr::Addr,
    cache::Cache,
    config::{CacheConfig, Geometry},
    memory::FlatMemory,
    trace::{self, ReferenceStream},
};
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// replay a reference stream through the cache
    Run(RunArgs),
    /// show the cache layout derived from the configuration
    Layout(LayoutArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// File path to cache configuration (json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Size of the fast memory in bytes, overrides the configuration
    #[arg(long)]
    arena_size: Option<usize>,
    /// Block size in bytes, overrides the configuration
    #[arg(long)]
    block_size: Option<usize>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to backing memory image, loaded at address 0
    #[arg(short, long)]
    memory: PathBuf,
    /// File path to reference stream
    #[arg(short, long)]
    refs: PathBuf,
    /// Make reads of the block at this address fail (repeatable)
    #[arg(long, value_parser = trace::parse_address)]
    fault: Vec<u64>,
    /// Only print statistics
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    delegate: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(RunArgs {
            delegate,
            memory,
            refs,
            fault,
            quiet,
        }) => {
            init_logger(delegate.verbose);
            let config = read_config(&delegate)?;
            let mut mem = FlatMemory::from_image(read_input(memory)?);
            for addr in fault {
                log::info!("reads of block {} will fail", Addr::new(addr));
                mem.refuse(addr);
            }
            let refs = read_refs(refs)?;
            log::info!("finished parsing reference stream. # of references: {}", refs.len());
            let mut cache = Cache::new(&config, mem)?;
            replay(&mut cache, refs, quiet)?;
            log::info!("finished replay.");
            output_stat(&cache);
            Ok(())
        }
        Command::Layout(LayoutArgs { delegate }) => {
            init_logger(delegate.verbose);
            let config = read_config(&delegate)?;
            let g = Geometry::new(&config)?;
            println!("arena size:  {:>8} bytes", config.arena_size);
            println!("block size:  {:>8} bytes", g.block_size());
            println!("offset bits: {:>8}", g.offset_bits());
            println!("line size:   {:>8} bytes", Geometry::line_size(g.block_size()));
            println!("lines:       {:>8}", g.num_lines());
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
}

fn replay(cache: &mut Cache<FlatMemory>, refs: ReferenceStream, quiet: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut failed = 0usize;
    for addr in refs {
        let a = Addr::new(addr);
        match cache.access(addr) {
            Ok(access) => {
                if !quiet {
                    match access.second {
                        Some(second) => writeln!(
                            out,
                            "{a} {:#018x} {} {second}",
                            access.value, access.first
                        )?,
                        None => writeln!(out, "{a} {:#018x} {}", access.value, access.first)?,
                    }
                }
            }
            Err(e) => {
                failed += 1;
                if !quiet {
                    writeln!(out, "{a} failed: {e}")?;
                }
            }
        }
    }
    out.flush()?;
    if failed > 0 {
        log::warn!("{failed} references could not be served");
    }
    Ok(())
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Cache<FlatMemory>) {}

#[cfg(feature = "stat")]
fn output_stat(cache: &Cache<FlatMemory>) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", cache.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}

fn read_config(args: &CommonArgs) -> Result<CacheConfig> {
    let mut config = match &args.config {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening {}", p.display()))?;
            CacheConfig::from_reader(file)
                .with_context(|| format!("reading configuration {}", p.display()))?
        }
        None => Default::default(),
    };
    if let Some(arena_size) = args.arena_size {
        config.arena_size = arena_size;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    Ok(config)
}

fn read_refs(refs: PathBuf) -> Result<ReferenceStream> {
    let mut buf = String::new();
    let mut file = File::open(&refs).with_context(|| format!("opening {}", refs.display()))?;
    file.read_to_string(&mut buf)?;
    ReferenceStream::parse(&buf).with_context(|| format!("parsing {}", refs.display()))
}

fn read_input(input: PathBuf) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_config_overrides() {
        let args = CommonArgs {
            config: None,
            arena_size: Some(176),
            block_size: None,
            verbose: false,
        };
        let config = read_config(&args).unwrap();
        assert_eq!(CacheConfig::new(176, 64), config);
        assert_eq!(2, Geometry::new(&config).unwrap().num_lines());
    }
    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "cli", "run", "-m", "mem.bin", "-r", "refs.txt", "--fault", "0x40", "--fault", "128",
        ])
        .unwrap();
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(vec![0x40, 128], run.fault);
        assert!(Cli::try_parse_from(["cli", "run", "-m", "m", "-r", "r", "--fault", "zz"]).is_err());
    }
}
