//! slowreverb - Slow and Reverb Audio Processor

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slowreverb::audio::AudioFormat;
use slowreverb::config::{Command, Config, ProcessArgs};
use slowreverb::server::{serve, AppState};
use slowreverb::{init_logging, Args, SlowReverbProcessor};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        println!("{}", slowreverb::get_library_info());
        println!();
    }

    let config = Config::load(args.config_file.as_deref())?;

    match args.command {
        Command::Serve { host, port } => run_server(config.with_server_overrides(host, port)?),
        Command::Process(process_args) => run_process(config, process_args),
        Command::InitConfig { path } => {
            Config::create_default_config(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn run_server(config: Config) -> anyhow::Result<()> {
    let worker_threads = config.effective_worker_threads();
    if worker_threads < config.server.worker_threads {
        log::warn!(
            "worker_threads = {} exceeds 2x logical CPU cores, starting {} instead",
            config.server.worker_threads,
            worker_threads
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let addr = config.bind_address();
    let state = Arc::new(AppState::new(config));
    runtime
        .block_on(serve(state, &addr))
        .with_context(|| format!("server on {} failed", addr))
}

fn run_process(config: Config, args: ProcessArgs) -> anyhow::Result<()> {
    config.validate()?;

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let params = args.effect_parameters(config.effects.parameters())?;
    let output_format = if args.float_output { AudioFormat::Float32 } else { config.effects.output_format };
    let processor = SlowReverbProcessor::new(config.limits.max_duration_secs, output_format);

    println!("=== Slow + Reverb ===");
    println!("Input: {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Effects: {}", params);

    let result = processor.process_file(&args.input, &args.output, &params)?;

    let metrics = result.performance_metrics;
    println!("=== Processing Complete ===");
    println!("Duration: {:.2}s -> {:.2}s", metrics.input_duration_seconds, metrics.output_duration_seconds);
    println!("Time: {:.2}s", result.processing_time.as_secs_f64());
    println!("RTF: {:.3}", metrics.real_time_factor);

    Ok(())
}
