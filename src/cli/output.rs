//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, checkmarks
//! - Red: errors
//! - Yellow: warnings
//! - Cyan: paths, secret names, hints
//! - Bold: headers, important values
//! - Dimmed: secondary info

use std::fmt::Display;

use console::{style, StyledObject};

const RULE_WIDTH: usize = 56;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn styled<D>(value: D) -> StyledObject<D> {
    let s = style(value);
    if colors_enabled() {
        s.force_styling(true)
    } else {
        s.force_styling(false)
    }
}

/// Print a success message with checkmark (green).
///
/// Example: `✓ moved foo to team/foo`
pub fn success(msg: &str) {
    println!("{} {}", styled("✓").green(), msg);
}

/// Print an error message to stderr (red).
pub fn error(msg: &str) {
    eprintln!("{} {}", styled("✗").red(), msg);
}

/// Print a warning message to stderr (yellow).
pub fn warn(msg: &str) {
    eprintln!("{} {}", styled("⚠").yellow(), msg);
}

/// Print a hint message to stderr (cyan).
///
/// Example: `→ run: gpass init`
pub fn hint(msg: &str) {
    eprintln!("{} {}", styled("→").cyan(), styled(msg).cyan());
}

/// Print a key-value pair (label dimmed, value bold).
///
/// Example: `  recipients:  2`
pub fn kv(label: &str, value: impl Display) {
    println!("  {}  {}", styled(label).dim(), styled(value.to_string()).bold());
}

/// Print a list item with bullet.
pub fn list_item(item: &str) {
    println!("  • {}", item);
}

/// Format a path in cyan for inline use.
pub fn path(p: impl Display) -> String {
    styled(p.to_string()).cyan().to_string()
}

/// Format a secret name in cyan for inline use.
pub fn name(n: &str) -> String {
    styled(n).cyan().to_string()
}

/// Format a command in green for inline use.
pub fn cmd(c: &str) -> String {
    styled(c).green().to_string()
}

/// Format secondary text, dimmed, for inline use.
pub fn faint(s: &str) -> String {
    styled(s).dim().to_string()
}

/// Print a dimmed/secondary message.
///
/// Example: `no secrets stored`
pub fn dimmed(msg: &str) {
    println!("{}", styled(msg).dim());
}

/// Print a section header with a separator line.
pub fn section(title: &str) {
    println!();
    println!("{}", styled(title).bold());
    println!("{}", styled("─".repeat(RULE_WIDTH)).dim());
}
