use console::{style, StyledObject};

use super::tables::pass_rate;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// "passed/total (rate%)", green above 80%, yellow from 50%, red below.
pub fn styled_pass_rate(passed: usize, total: usize) -> StyledObject<String> {
    let rate = pass_rate(passed, total);
    let text = format!("{passed}/{total} ({rate:.1}%)");
    if rate > 80.0 {
        bright_green(text)
    } else if rate >= 50.0 {
        bright_yellow(text)
    } else {
        bright_red(text)
    }
}
