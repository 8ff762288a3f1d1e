use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trickle::cli::Args;
use trickle::paths::{self, PathConfig};
use trickle::{FileFetcher, LoaderConfig, LoaderService, Requester, Texture, Workers};

fn init_logger(args: &Args, path_config: &PathConfig) -> Result<()> {
    let log_level = args.log_level();

    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| paths::data_file(paths::LOG_FILE, path_config));
        if let Err(e) = paths::ensure_dirs(path_config) {
            eprintln!("Warning: {:#}", e);
        }
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        eprintln!("Logging to {}", log_path.display());
    } else {
        let default_level = log_level.to_string().to_lowercase();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.keys.is_empty() {
        use clap::CommandFactory;
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    init_logger(&args, &path_config)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| paths::config_file(paths::CONFIG_FILE, &path_config));
    let mut config = LoaderConfig::load_or_default(&config_path)?;
    if let Some(delay) = args.delay_override() {
        config.delay = delay;
    }
    if let Some(filter) = args.filter {
        config.filter_mode = filter.into();
    }
    info!("Config: {:?}", config);

    let fetcher = FileFetcher::new(&args.root)
        .with_subdir(args.subdir.clone())
        .with_extension(&args.extension);
    let service: LoaderService<Texture> = LoaderService::new(
        config.delay,
        config.memory_budget(),
        config.image_decoder(),
        fetcher,
        Workers::new(config.worker_threads()),
    );

    let failed = Arc::new(AtomicUsize::new(0));
    for key in &args.keys {
        let name = key.clone();
        let fail_count = Arc::clone(&failed);
        let requester = Requester::new(move |tex: Arc<Texture>| {
            println!(
                "{:<24} {}x{} {:?} {:?} ({} KB)",
                name,
                tex.width,
                tex.height,
                tex.format,
                tex.filter,
                tex.pixels.len() / 1024
            );
        })
        .on_failure(move |e| {
            eprintln!("{}", e);
            fail_count.fetch_add(1, Ordering::SeqCst);
        })
        .with_load_immediate(args.immediate);

        service.request(key, requester);
    }

    let finished = service.run_until_idle(args.frame_time(), Duration::from_secs(args.timeout));
    if !finished {
        warn!("Timed out with {} queued, {} fetching", service.queue_len(), service.in_flight());
    }

    let stats = service.stats();
    let missing: Vec<&String> = args
        .keys
        .iter()
        .filter(|k| !service.cache().contains(k))
        .collect();

    println!(
        "\n{} cached, {} KB / {} MB budget, {} decode failure(s)",
        stats.cached,
        stats.mem_usage / 1024,
        stats.mem_limit / 1024 / 1024,
        failed.load(Ordering::SeqCst)
    );
    if !missing.is_empty() {
        println!("not loaded: {:?}", missing);
        std::process::exit(1);
    }

    Ok(())
}
