//! Small helpers shared by the commands and the output layer.

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Display a path with the home directory replaced by `~`.
///
/// Used whenever a path is logged so that simulation logs and bug reports
/// do not leak the user name.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Render a countdown as `1h 5m`, `45m` or `0m`.
pub fn format_countdown(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let (hours, rest) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

/// Single-line terminal progress bar, redrawn in place.
pub struct ProgressBar {
    width: usize,
    last_progress: f32,
    last_change: Instant,
}

impl ProgressBar {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            last_progress: 0.0,
            last_change: Instant::now(),
        }
    }

    /// Redraw the bar at `progress` (0.0..=1.0) with an optional trailing label.
    pub fn update(&mut self, progress: f32, suffix: Option<&str>) {
        let progress = progress.clamp(0.0, 1.0);
        if (progress - self.last_progress).abs() > f32::EPSILON {
            self.last_progress = progress;
            self.last_change = Instant::now();
        }

        let line = self.render(progress, suffix);
        let mut stdout = std::io::stdout();
        let _ = queue!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        );
        let _ = stdout.flush();
    }

    /// Clear the bar line.
    pub fn finish(&mut self) {
        let mut stdout = std::io::stdout();
        let _ = queue!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = stdout.flush();
    }

    /// Poll faster while the bar is moving, slower once it stalls.
    pub fn recommended_sleep(&self) -> Duration {
        if self.last_change.elapsed() < Duration::from_secs(1) {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(250)
        }
    }

    fn render(&self, progress: f32, suffix: Option<&str>) -> String {
        let filled = ((progress * self.width as f32).round() as usize).min(self.width);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(self.width - filled));
        let percent = (progress * 100.0).round() as u32;
        match suffix {
            Some(suffix) => format!("┣ [{bar}] {percent:>3}% {suffix}"),
            None => format!("┣ [{bar}] {percent:>3}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "0m");
        assert_eq!(format_countdown(45), "45m");
        assert_eq!(format_countdown(65), "1h 5m");
        assert_eq!(format_countdown(-3), "0m");
    }

    #[test]
    fn test_private_path_hides_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".config/salatr/salatr.toml");
            assert_eq!(private_path(&path), "~/.config/salatr/salatr.toml");
        }
        assert_eq!(private_path(Path::new("/etc/salatr.toml")), "/etc/salatr.toml");
    }

    #[test]
    fn test_progress_bar_render() {
        let bar = ProgressBar::new(10);
        assert_eq!(bar.render(0.5, None), "┣ [█████░░░░░]  50%");
        assert_eq!(
            bar.render(1.0, Some("done")),
            "┣ [██████████] 100% done"
        );
    }
}
