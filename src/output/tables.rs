use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub fn pass_rate(passed: usize, total: usize) -> f64 {
    if total > 0 {
        (passed as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

pub fn color_coded_pass_rate_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    if rate > 80.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if rate >= 50.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_rate_of_nothing_is_zero() {
        assert!(pass_rate(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn pass_rate_is_a_percentage() {
        assert!((pass_rate(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!((pass_rate(3, 3) - 100.0).abs() < f64::EPSILON);
    }
}
