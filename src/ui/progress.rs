//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};

/// Progress of a single download
///
/// Shows an indicatif bar in interactive mode, one plain line otherwise.
pub struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext, label: &str, total: Option<u64>) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = match total {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::no_length(),
            };
            if let Ok(bar_style) = ProgressStyle::default_bar().template(
                "  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {elapsed:.dim}",
            ) {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            eprintln!("{} Downloading {}", style("...").dim(), label);
            None
        };
        Self { bar }
    }

    /// Copy `reader` into `writer`, counting bytes on the bar
    pub fn copy<R, W>(&self, mut reader: R, writer: &mut W) -> io::Result<u64>
    where
        R: Read,
        W: Write + ?Sized,
    {
        match self.bar {
            Some(ref bar) => io::copy(&mut bar.wrap_read(reader), writer),
            None => io::copy(&mut reader, writer),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
