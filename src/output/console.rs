//! Console output utilities.

use console::style;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Reddit Saved Downloader                           ║
║     Media from your saved posts, straight to disk     ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(source: &str, output_dir: &str, style_name: &str, concurrent: usize) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Source: {}", source);
    println!("  Directory: {}", output_dir);
    println!("  Filenames: {}", style_name);
    println!("  Concurrent downloads: {}", concurrent);
    println!();
}
