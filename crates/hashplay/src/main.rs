use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use libhashplay::{
    BlockServer, Encoder, EncoderOptions, FilesystemCacheStore, Id32, PreparedFile, StreamSummary,
    stream_file,
    tracing_subscriber_config_utils::{InitLoggingOptions, init_logging},
};
use serde::Serialize;
use size_format::SizeFormatterBinary as SF;
use tracing::{error, error_span, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser)]
#[command(version, author, about)]
struct Opts {
    /// The loglevel. RUST_LOG takes precedence if set.
    #[arg(value_enum, short = 'v', long = "log-level")]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Where chain hashes are cached. Defaults to the platform cache directory.
    #[arg(long, env = "HASHPLAY_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Block size in bytes. Values <= 0 fall back to 1024.
    #[arg(
        short = 'b',
        long,
        env = "HASHPLAY_BLOCK_SIZE",
        default_value_t = 1024,
        allow_negative_numbers = true
    )]
    block_size: i64,

    #[command(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
struct PrepareOpts {
    /// Files to build chains for.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Parser)]
struct InfoOpts {
    file: PathBuf,

    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct StreamOpts {
    /// Pairs of INPUT OUTPUT. Each pair is streamed independently and in parallel.
    #[arg(required = true, num_args = 2.., value_names = ["INPUT", "OUTPUT"])]
    paths: Vec<PathBuf>,
}

#[derive(Parser)]
enum SubCommand {
    /// Build (or reuse) the chain of each file and print its root hash.
    Prepare(PrepareOpts),
    /// Print block geometry, cache key and root hash of a file.
    Info(InfoOpts),
    /// Play files through the verifier into output files.
    Stream(StreamOpts),
}

#[derive(Serialize)]
struct FileInfo {
    path: PathBuf,
    cache_key: String,
    total_length: u64,
    block_size: u64,
    num_blocks: u64,
    highest_block_size: u64,
    root_hash: Id32,
    cache_hit: bool,
}

impl FileInfo {
    fn new(server: &BlockServer) -> anyhow::Result<Self> {
        let PreparedFile {
            path,
            key,
            lengths,
            cache_hit,
        } = server.prepared();
        Ok(Self {
            path: path.clone(),
            cache_key: key.to_string(),
            total_length: lengths.total_length(),
            block_size: lengths.default_block_length(),
            num_blocks: lengths.total_blocks(),
            highest_block_size: lengths.last_block_length(),
            root_hash: server.root_hash().context("error reading root hash")?,
            cache_hit: *cache_hit,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let default_rust_log = match opts.log_level.as_ref() {
        Some(level) => match level {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        },
        None => "info",
    };
    init_logging(InitLoggingOptions {
        default_rust_log_value: Some(default_rust_log),
        json: opts.log_json,
    })?;

    let store = match &opts.cache_dir {
        Some(dir) => FilesystemCacheStore::new(dir),
        None => FilesystemCacheStore::default(),
    };
    info!(cache_dir = ?store.root(), "using cache");
    let encoder = Encoder::new(
        Arc::new(store),
        EncoderOptions {
            block_size: opts.block_size,
        },
    );

    match opts.subcommand {
        SubCommand::Prepare(p) => prepare(&encoder, &p.files),
        SubCommand::Info(i) => info(&encoder, &i),
        SubCommand::Stream(s) => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("error building tokio runtime")?;
            rt.block_on(stream_all(encoder, s.paths))
        }
    }
}

fn prepare(encoder: &Encoder, files: &[PathBuf]) -> anyhow::Result<()> {
    for file in files {
        let prepared = encoder
            .prepare(file)
            .with_context(|| format!("error preparing {file:?}"))?;
        let server = encoder.serve(prepared);
        let root = server.root_hash().context("error reading root hash")?;
        let l = server.prepared().lengths;
        println!(
            "{root}  {file:?} ({}, {} blocks)",
            SF::new(l.total_length()),
            l.total_blocks()
        );
    }
    Ok(())
}

fn info(encoder: &Encoder, opts: &InfoOpts) -> anyhow::Result<()> {
    let prepared = encoder
        .prepare(&opts.file)
        .with_context(|| format!("error preparing {:?}", opts.file))?;
    let info = FileInfo::new(&encoder.serve(prepared))?;
    if opts.json {
        serde_json::to_writer_pretty(std::io::stdout(), &info)?;
        println!();
        return Ok(());
    }
    println!("path:               {:?}", info.path);
    println!("cache key:          {}", info.cache_key);
    println!("size:               {}", SF::new(info.total_length));
    println!("block size:         {}", info.block_size);
    println!("blocks:             {}", info.num_blocks);
    println!("highest block size: {}", info.highest_block_size);
    println!("root hash:          {}", info.root_hash);
    println!("cache hit:          {}", info.cache_hit);
    Ok(())
}

async fn stream_all(encoder: Encoder, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    if paths.len() % 2 != 0 {
        anyhow::bail!("expected INPUT OUTPUT pairs, got {} paths", paths.len());
    }

    let tasks = paths.chunks_exact(2).map(|pair| {
        let (input, output) = (pair[0].clone(), pair[1].clone());
        let label = input.clone();
        let encoder = encoder.clone();
        let span = error_span!("stream", ?input);
        async move {
            let result = tokio::task::spawn_blocking(move || {
                let _e = span.enter();
                stream_file(&encoder, &input, &output)
            })
            .await
            .context("stream task panicked")
            .and_then(|r| r);
            (label, result)
        }
    });

    let mut failed = 0;
    for (input, result) in futures::future::join_all(tasks).await {
        match result {
            Ok(StreamSummary {
                root_hash,
                blocks,
                bytes,
                ..
            }) => println!(
                "{root_hash}  {input:?}: end of stream, {blocks} blocks, {}",
                SF::new(bytes)
            ),
            Err(e) => {
                error!(?input, "error streaming: {e:#}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} stream(s) failed");
    }
    Ok(())
}
