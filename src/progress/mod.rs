use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar ticked once per finished piece. `ProgressBar` is `Sync`, so
/// workers can share it.
pub fn create_progress_bar(total_pieces: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total_pieces as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pieces ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
