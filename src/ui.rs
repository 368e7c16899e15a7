//! The UI boundary: commands from the user, the preview state they change and
//! the metrics overlay.

use std::fmt::Write as _;
use std::str::FromStr;

use tracing::info;

use crate::filter::{FilterKind, UnknownFilter};
use crate::render::RenderHandle;
use crate::stats::{ms_to_fps, FrameMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    SelectFilter(FilterKind),
    ToggleMetrics,
    Quit,
}

impl FromStr for UiCommand {
    type Err = UnknownFilter;

    /// `metrics` / `quit`, otherwise a filter name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metrics" | "m" => Ok(UiCommand::ToggleMetrics),
            "quit" | "exit" | "q" => Ok(UiCommand::Quit),
            _ => s.parse().map(UiCommand::SelectFilter),
        }
    }
}

impl UiCommand {
    /// Map a key name (as reported by SDL) to a command.
    pub fn from_key(name: &str) -> Option<Self> {
        match name {
            "1" => Some(UiCommand::SelectFilter(FilterKind::Normal)),
            "2" => Some(UiCommand::SelectFilter(FilterKind::Gray)),
            "3" => Some(UiCommand::SelectFilter(FilterKind::Sepia)),
            "M" | "m" => Some(UiCommand::ToggleMetrics),
            "Escape" => Some(UiCommand::Quit),
            _ => None,
        }
    }
}

/// What the user has picked so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewState {
    /// Last filter asked for; the renderer may be drawing Normal instead
    pub selected: FilterKind,
    pub show_metrics: bool,
}

impl PreviewState {
    pub fn new(selected: FilterKind, show_metrics: bool) -> Self {
        Self {
            selected,
            show_metrics,
        }
    }

    /// Returns `true` when the overlay was just turned on; the caller resets
    /// the metrics so each viewing starts from a clean record.
    pub fn toggle_metrics(&mut self) -> bool {
        self.show_metrics = !self.show_metrics;
        self.show_metrics
    }

    /// Apply `command`, queueing render work on `render`.
    ///
    /// Every selection is forwarded, repeats included, so a filter that fell
    /// back to Normal can be retried. Returns `false` on `Quit`.
    pub fn apply(&mut self, command: UiCommand, render: &RenderHandle) -> bool {
        match command {
            UiCommand::SelectFilter(kind) => {
                info!(filter = %kind, "filter selected");
                self.selected = kind;
                render.select_filter(kind);
            }
            UiCommand::ToggleMetrics => {
                if self.toggle_metrics() {
                    render.reset_metrics();
                }
                info!(show = self.show_metrics, "metrics overlay toggled");
            }
            UiCommand::Quit => return false,
        }
        true
    }
}

/// Text for the metrics overlay.
pub fn overlay_text(filter: FilterKind, metrics: &FrameMetrics) -> String {
    let min = if metrics.is_empty() { 0.0 } else { metrics.min_ms };
    let mut text = format!("Filter: {filter}");
    for (label, ms) in [
        ("Frame", metrics.last_frame_time_ms),
        ("Avg", metrics.average_ms),
        ("Min", min),
        ("Max", metrics.max_ms),
    ] {
        let _ = write!(text, "\n{label}: {ms:.2} ms (~{:.0} FPS)", ms_to_fps(ms));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::fake::FakeGl;
    use crate::render::{render_channel, RenderLoop, Renderer};
    use crate::stats::metrics_channel;
    use crate::RenderConfig;

    #[test]
    fn toggling_on_asks_for_a_reset() {
        let mut state = PreviewState::default();
        assert!(state.toggle_metrics());
        assert!(!state.toggle_metrics());
        assert!(state.toggle_metrics());
    }

    fn ready_loop(gl: &FakeGl) -> (RenderHandle, RenderLoop<FakeGl>) {
        let (recorder, _) = metrics_channel();
        let mut renderer = Renderer::new(gl.clone(), &RenderConfig::default(), Box::new(recorder));
        renderer.on_surface_created().unwrap();
        let (handle, tasks) = render_channel();
        (handle, RenderLoop::new(renderer, tasks))
    }

    #[test]
    fn failed_selection_can_be_retried() {
        let gl = FakeGl::new();
        let (handle, mut render_loop) = ready_loop(&gl);
        let mut state = PreviewState::default();

        gl.fail_compile_containing("sepia");
        assert!(state.apply(UiCommand::SelectFilter(FilterKind::Sepia), &handle));
        render_loop.run_pending();
        assert_eq!(state.selected, FilterKind::Sepia);
        assert_eq!(handle.active_filter(), Some(FilterKind::Normal));

        gl.clear_failures();
        assert!(state.apply(UiCommand::SelectFilter(FilterKind::Sepia), &handle));
        render_loop.run_pending();
        assert_eq!(handle.active_filter(), Some(FilterKind::Sepia));
    }

    #[test]
    fn quit_stops_and_toggle_queues_a_reset() {
        let gl = FakeGl::new();
        let (handle, mut render_loop) = ready_loop(&gl);
        let mut state = PreviewState::default();

        assert!(state.apply(UiCommand::ToggleMetrics, &handle));
        assert!(state.show_metrics);
        assert!(render_loop.run_pending());
        assert!(!state.apply(UiCommand::Quit, &handle));
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(
            UiCommand::from_key("2"),
            Some(UiCommand::SelectFilter(FilterKind::Gray))
        );
        assert_eq!(UiCommand::from_key("Escape"), Some(UiCommand::Quit));
        assert_eq!(UiCommand::from_key("Space"), None);
    }
}
