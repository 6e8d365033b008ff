use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};

use parallelize::progress::create_progress_bar;
use parallelize::scenarios::{self, SAMPLE_WITH_EVEN};
use parallelize::{CancelToken, Options};

#[derive(Parser, Debug)]
#[command(name = "parallelize")]
#[command(about = "Run chunked parallel work with cancellation and first-error reporting", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Number of workers (defaults to 16, or 2 for the error scenarios)
    #[arg(short = 'j', long, global = true)]
    parallelism: Option<usize>,

    /// Use one worker per logical CPU
    #[arg(long, global = true, conflicts_with = "parallelism")]
    per_cpu: bool,

    /// Disable progress bar
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the general, stop-on-error and continue-on-error scenarios
    All,
    /// Add ten to 1..=10 and print the results in order
    General,
    /// Fail on the first even number and cancel the remaining work
    StopOnError,
    /// Fail on even numbers but keep processing every piece
    ContinueOnError,
    /// Mark primes below a limit and cross-check against rayon
    Primes {
        /// Upper bound (exclusive)
        #[arg(short, long, default_value_t = 1_000_000)]
        limit: usize,

        /// Cancel the sieve after this many milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let options = if args.per_cpu {
        Options::per_cpu()
    } else {
        args.parallelism
            .map_or_else(Options::default, |n| Options::default().with_parallelism(n))
    };
    // the error scenarios run on two workers unless told otherwise
    let error_options = if args.per_cpu || args.parallelism.is_some() {
        options
    } else {
        options.with_parallelism(2)
    };

    match args.command.unwrap_or(Command::All) {
        Command::All => {
            general(options)?;
            stop_on_error(error_options);
            continue_on_error(error_options);
        }
        Command::General => general(options)?,
        Command::StopOnError => stop_on_error(error_options),
        Command::ContinueOnError => continue_on_error(error_options),
        Command::Primes { limit, timeout_ms } => primes(options, limit, timeout_ms, args.quiet)?,
    }

    Ok(())
}

fn general(options: Options) -> Result<()> {
    log::info!("start func: general");
    let raw: Vec<i64> = (1..=10).collect();
    let result = scenarios::general(&raw, options)?;
    println!("general: raw={:?} result={:?}", raw, result);
    Ok(())
}

fn stop_on_error(options: Options) {
    log::info!("start func: stop on error");
    let report = scenarios::stop_on_error(&SAMPLE_WITH_EVEN, options);
    if let Some(err) = &report.error {
        log::error!("running stop on error case: {}", err);
    }
    println!(
        "stop on error: {}/{} pieces ran, error: {}",
        report.invoked,
        SAMPLE_WITH_EVEN.len(),
        describe(&report.error)
    );
}

fn continue_on_error(options: Options) {
    log::info!("start func: continue on error");
    let report = scenarios::continue_on_error(&SAMPLE_WITH_EVEN, options);
    if let Some(err) = &report.error {
        log::error!("running continue on error case: {}", err);
    }
    println!(
        "continue on error: {}/{} pieces ran, error: {}",
        report.invoked,
        SAMPLE_WITH_EVEN.len(),
        describe(&report.error)
    );
}

fn primes(options: Options, limit: usize, timeout_ms: Option<u64>, quiet: bool) -> Result<()> {
    let token = match timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };

    let plan = options.plan(limit);
    println!(
        "Marking primes below {} with {} workers (chunk size {})",
        limit, plan.workers, plan.chunk_size
    );

    let progress = if !quiet {
        Some(create_progress_bar(limit)?)
    } else {
        None
    };

    let start_time = Instant::now();
    let seen = scenarios::count_primes(limit, options, Some(&token), progress.as_ref());
    if let Some(ref pb) = progress {
        pb.finish_and_clear();
    }
    let seen = seen?;
    let elapsed = start_time.elapsed();

    if seen != scenarios::count_primes_reference(limit) {
        anyhow::bail!("Dispatcher result differs from rayon reference");
    }

    let count = seen.iter().filter(|&&p| p).count();
    println!("Found {} primes below {} in {:.2?}", count, limit, elapsed);
    Ok(())
}

fn describe(error: &Option<anyhow::Error>) -> String {
    error.as_ref().map_or_else(|| "none".to_string(), |e| e.to_string())
}
