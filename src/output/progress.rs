use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the three report phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Discovering periodic jobs").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, job_count: usize, window_hours: u32) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Discovered {job_count} jobs ✓")).to_string(),
        );
        let pb = create_spinner(
            bright_yellow(format!(
                "Phase 2/3: Collecting runs from the last {window_hours} hours"
            ))
            .to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self, execution_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 2/3: Collected {execution_count} runs ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Building report").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Report built ✓").to_string());
        eprintln!("\n");
    }

    /// Stops the spinner without a success mark, e.g. on error.
    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
