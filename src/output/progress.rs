//! Progress bar utilities.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress bar for item counts whose length grows as items are queued.
pub fn create_item_bar(message: &str, hidden: bool) -> ProgressBar {
    let bar = ProgressBar::new(0);
    if hidden {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                message
            ))
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}
