use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use anyhow::{bail, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::error_slot::ErrorSlot;
use crate::parallel::{self, Options};

/// Odd numbers with a single even value at index 13.
pub const SAMPLE_WITH_EVEN: [i64; 21] = [
    1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 2, 27, 29, 31, 33, 35, 37, 39,
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("got even number {0}")]
    EvenNumber(i64),
}

/// Outcome of a batch whose callbacks may fail.
#[derive(Debug)]
pub struct BatchReport {
    /// Callbacks that actually ran.
    pub invoked: usize,
    /// First error reported by any callback.
    pub error: Option<anyhow::Error>,
}

pub fn add_ten(value: i64) -> Result<i64> {
    log::info!("add 10 for number {}", value);
    Ok(value + 10)
}

pub fn err_on_even(value: i64) -> Result<(), ScenarioError> {
    if value % 2 == 0 {
        return Err(ScenarioError::EvenNumber(value));
    }
    log::info!("got odd number {}", value);
    Ok(())
}

/// Adds ten to every value; results come back in input order.
pub fn general(values: &[i64], options: Options) -> Result<Vec<i64>> {
    let token = CancelToken::new();
    let slot = ErrorSlot::new();
    let results: Vec<AtomicI64> = values.iter().map(|_| AtomicI64::new(0)).collect();

    parallel::until(
        Some(&token),
        values.len(),
        |index| match add_ten(values[index]) {
            Ok(res) => results[index].store(res, Ordering::Relaxed),
            Err(err) => slot.send_and_cancel(err, || token.cancel()),
        },
        options,
    );

    slot.check()?;
    Ok(results.into_iter().map(AtomicI64::into_inner).collect())
}

/// Rejects even values and cancels the remaining work on the first one.
pub fn stop_on_error(values: &[i64], options: Options) -> BatchReport {
    let token = CancelToken::new();
    run_err_on_even(values, options, &token, |slot, err| {
        slot.send_and_cancel(err.into(), || token.cancel())
    })
}

/// Rejects even values but lets every piece run.
pub fn continue_on_error(values: &[i64], options: Options) -> BatchReport {
    let token = CancelToken::new();
    run_err_on_even(values, options, &token, |slot, err| slot.send(err.into()))
}

fn run_err_on_even<R>(
    values: &[i64],
    options: Options,
    token: &CancelToken,
    report: R,
) -> BatchReport
where
    R: Fn(&ErrorSlot, ScenarioError) + Sync,
{
    let slot = ErrorSlot::new();
    let invoked = AtomicUsize::new(0);

    parallel::until(
        Some(token),
        values.len(),
        |index| {
            invoked.fetch_add(1, Ordering::Relaxed);
            if let Err(err) = err_on_even(values[index]) {
                report(&slot, err);
            }
        },
        options,
    );

    BatchReport {
        invoked: invoked.into_inner(),
        error: slot.receive(),
    }
}

pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    let mut i = 2;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Primality of every number below `limit`, computed with the dispatcher.
///
/// Fails if `signal` fires before every piece has been visited.
pub fn count_primes(
    limit: usize,
    options: Options,
    signal: Option<&CancelToken>,
    progress: Option<&ProgressBar>,
) -> Result<Vec<bool>> {
    let seen: Vec<AtomicBool> = (0..limit).map(|_| AtomicBool::new(false)).collect();
    let done = AtomicUsize::new(0);

    parallel::until(
        signal,
        limit,
        |p| {
            seen[p].store(is_prime(p), Ordering::Relaxed);
            done.fetch_add(1, Ordering::Relaxed);
            if let Some(pb) = progress {
                pb.inc(1);
            }
        },
        options,
    );

    let done = done.into_inner();
    if done < limit {
        let reason = signal
            .and_then(CancelToken::reason)
            .map_or_else(|| "unknown".to_string(), |r| r.to_string());
        bail!("Prime sieve stopped after {}/{} pieces: {}", done, limit, reason);
    }

    Ok(seen.into_iter().map(AtomicBool::into_inner).collect())
}

/// Same table computed with rayon, used to cross-check the dispatcher.
pub fn count_primes_reference(limit: usize) -> Vec<bool> {
    (0..limit).into_par_iter().map(is_prime).collect()
}
