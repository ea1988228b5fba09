//! Frame builder: turns a consistent copy of the shared state into styled
//! text, one block per panel. Nothing here touches the terminal.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::constants::MIN_BAR_WIDTH;
use crate::input::Command;
use crate::models::{Details, Event, OperationKind, SystemSnapshot};
use crate::state::{DatasetState, DownloadStatus, ProgressSnapshot};
use crate::ui::theme::Theme;
use crate::utils::{format_duration, format_eta, spinner_char, truncate_str};

/// Everything one frame is built from.
pub struct FrameInput<'a> {
    pub progress: &'a ProgressSnapshot,
    /// Recent events, oldest first.
    pub events: &'a [Event],
    pub snapshot: Option<&'a SystemSnapshot>,
    pub downloads: &'a DownloadStatus,
    pub paused: bool,
    pub input_enabled: bool,
    pub show_help: bool,
    pub tick: u64,
    /// Terminal width in columns.
    pub width: u16,
}

/// Styled text for each panel.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub header: Line<'static>,
    pub operation: Vec<Line<'static>>,
    pub operation_active: bool,
    /// `None` when no dataset has left the pending state.
    pub downloads: Option<Vec<Line<'static>>>,
    pub events: Vec<Line<'static>>,
    pub status: Line<'static>,
    pub help: Option<Vec<Line<'static>>>,
}

#[cfg(test)]
impl RenderedFrame {
    /// Plain-text rendition of every panel, top to bottom.
    pub fn to_text(&self) -> String {
        let mut lines = vec![line_text(&self.header)];
        lines.extend(self.operation.iter().map(line_text));
        if let Some(downloads) = &self.downloads {
            lines.extend(downloads.iter().map(line_text));
        }
        lines.extend(self.events.iter().map(line_text));
        lines.push(line_text(&self.status));
        if let Some(help) = &self.help {
            lines.extend(help.iter().map(line_text));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

pub fn build_frame(input: &FrameInput<'_>, theme: &Theme) -> RenderedFrame {
    let inner_width = input.width.saturating_sub(4) as usize;
    RenderedFrame {
        header: header_line(input, theme),
        operation: operation_lines(input, theme, inner_width),
        operation_active: !input.progress.is_idle(),
        downloads: download_lines(input, theme),
        events: event_lines(input.events, theme, inner_width),
        status: status_line(input, theme),
        help: input.show_help.then(|| help_lines(theme)),
    }
}

/// Percentage bar of exactly `width` block characters.
pub fn progress_bar(pct: f64, width: usize) -> String {
    let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn header_line(input: &FrameInput<'_>, t: &Theme) -> Line<'static> {
    let sep = || Span::styled(" │ ", t.muted_style());
    let mut spans = vec![Span::styled(" Tourney Dash", t.header_style())];

    match input.snapshot {
        Some(snap) => {
            spans.push(sep());
            spans.push(Span::styled("CPU ", t.dim_style()));
            spans.push(Span::styled(
                format!("{:.0}%", snap.cpu_pct),
                Style::default().fg(t.usage_color(snap.cpu_pct)),
            ));
            spans.push(sep());
            spans.push(Span::styled("RAM ", t.dim_style()));
            let mem_pct = snap.memory_percent();
            spans.push(Span::styled(
                format!(
                    "{:.1}/{:.1} GB ({:.0}%)",
                    snap.mem_used_gb, snap.mem_total_gb, mem_pct
                ),
                Style::default().fg(t.usage_color(mem_pct)),
            ));
            spans.push(sep());
            spans.push(Span::styled("Disk ", t.dim_style()));
            let disk_pct = snap.disk_used_percent();
            spans.push(Span::styled(
                format!("{:.1} GB free ({:.0}% used)", snap.disk_free_gb, disk_pct),
                Style::default().fg(t.usage_color(disk_pct)),
            ));
            spans.push(sep());
            spans.push(Span::styled(
                format!(
                    "Up {}",
                    format_duration(std::time::Duration::from_secs(snap.uptime_seconds))
                ),
                t.dim_style(),
            ));
        }
        None => {
            spans.push(sep());
            spans.push(Span::styled("collecting system stats…", t.muted_style()));
        }
    }

    if input.paused {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(" PAUSED ", t.badge_style(t.warning)));
    }
    Line::from(spans)
}

fn operation_lines(input: &FrameInput<'_>, t: &Theme, width: usize) -> Vec<Line<'static>> {
    let progress = input.progress;
    if progress.is_idle() {
        return vec![
            Line::from(Span::styled("No active operation.", t.dim_style())),
            Line::from(Span::styled(
                "Press s to run the pipeline, d to download, h for help.",
                t.muted_style(),
            )),
        ];
    }

    let mut lines = Vec::with_capacity(4);
    let spinner = if input.paused {
        "⏸"
    } else {
        spinner_char(input.tick)
    };
    let title = format!("{}: {}", progress.current.label(), progress.description);
    lines.push(Line::from(vec![
        Span::styled(format!("{} ", spinner), Style::default().fg(t.accent)),
        Span::styled(
            truncate_str(&title, width.saturating_sub(2)),
            t.text_style().add_modifier(Modifier::BOLD),
        ),
    ]));

    let label = format!(" {:5.1}%", progress.progress_pct);
    let bar_width = width.saturating_sub(label.len()).max(MIN_BAR_WIDTH);
    let bar = progress_bar(progress.progress_pct, bar_width);
    lines.push(Line::from(vec![
        Span::styled(bar, Style::default().fg(t.accent).bg(t.gauge_bg)),
        Span::styled(label, t.text_style()),
    ]));

    lines.push(Line::from(vec![
        Span::styled("Elapsed ", t.dim_style()),
        Span::styled(format_duration(progress.elapsed()), t.text_style()),
    ]));

    let details = detail_parts(progress.current, &progress.details);
    if !details.is_empty() {
        lines.push(Line::from(Span::styled(
            truncate_str(&details.join(" · "), width),
            t.dim_style(),
        )));
    }
    lines
}

/// Only the counters the collaborator actually reported.
fn detail_parts(kind: OperationKind, d: &Details) -> Vec<String> {
    let mut parts = Vec::new();
    match (d.current_mb, d.total_mb) {
        (Some(cur), Some(total)) => parts.push(format!("{:.1} / {:.1} MB", cur, total)),
        (Some(cur), None) => parts.push(format!("{:.1} MB", cur)),
        (None, Some(total)) => parts.push(format!("{:.1} MB total", total)),
        (None, None) => {}
    }
    if let Some(speed) = d.speed_mb_s {
        parts.push(format!("{:.1} MB/s", speed));
    }
    if let Some(eta) = d.eta_seconds {
        parts.push(format!("ETA {}", format_eta(eta)));
    }
    match (d.epoch, d.total_epochs) {
        (Some(e), Some(total)) => parts.push(format!("Epoch {}/{}", e, total)),
        (Some(e), None) => parts.push(format!("Epoch {}", e)),
        _ => {}
    }
    if let Some(loss) = d.loss {
        parts.push(format!("loss {:.4}", loss));
    }
    if let Some(score) = d.val_score {
        parts.push(format!("val {:.4}", score));
    }
    match (d.rows_processed, d.total_rows) {
        (Some(done), Some(total)) => parts.push(format!("Rows {}/{}", done, total)),
        (Some(done), None) => parts.push(format!("Rows {}", done)),
        _ => {}
    }
    if parts.is_empty() && kind == OperationKind::Uploading {
        parts.push("waiting for server".to_string());
    }
    parts
}

fn download_lines(input: &FrameInput<'_>, t: &Theme) -> Option<Vec<Line<'static>>> {
    let status = input.downloads;
    if !status.is_relevant() {
        return None;
    }
    let mut lines: Vec<Line<'static>> = status
        .datasets
        .iter()
        .map(|(name, state)| {
            let (icon, label) = match state {
                DatasetState::Pending => ("○", "pending"),
                DatasetState::InProgress => (spinner_char(input.tick), "downloading"),
                DatasetState::Completed => ("✓", "done"),
                DatasetState::Failed => ("✗", "failed"),
            };
            let color = t.dataset_color(*state);
            Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(format!("{:<12}", name), t.text_style()),
                Span::styled(label.to_string(), Style::default().fg(color)),
            ])
        })
        .collect();
    if status.required_met {
        lines.push(Line::from(Span::styled(
            "Required datasets ready",
            Style::default().fg(t.success),
        )));
    }
    Some(lines)
}

fn event_lines(events: &[Event], t: &Theme, width: usize) -> Vec<Line<'static>> {
    if events.is_empty() {
        return vec![Line::from(Span::styled("No events yet.", t.muted_style()))];
    }
    events
        .iter()
        .map(|e| {
            let color = t.event_color(e.level);
            // "HH:MM:SS x "
            let room = width.saturating_sub(11);
            Line::from(vec![
                Span::styled(format!("{} ", e.time_label()), t.muted_style()),
                Span::styled(format!("{} ", e.level.icon()), Style::default().fg(color)),
                Span::styled(truncate_str(&e.message, room), Style::default().fg(color)),
            ])
        })
        .collect()
}

fn status_line(input: &FrameInput<'_>, t: &Theme) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for cmd in [
        Command::StartPipeline,
        Command::DownloadOnly,
        Command::TrainOnly,
        Command::UploadOnly,
        Command::TogglePause,
        Command::Help,
        Command::Quit,
    ] {
        let label = match cmd {
            Command::TogglePause if input.paused => "Resume",
            Command::TogglePause => "Pause",
            Command::StartPipeline => "Pipeline",
            Command::DownloadOnly => "Download",
            Command::TrainOnly => "Train",
            Command::UploadOnly => "Upload",
            Command::Help => "Help",
            _ => "Quit",
        };
        spans.push(Span::styled(format!(" {} ", cmd.key()), t.badge_style(t.accent)));
        spans.push(Span::styled(format!(" {} ", label), t.dim_style()));
    }
    if !input.input_enabled {
        spans.push(Span::styled(
            "  keyboard unavailable",
            Style::default().fg(t.warning).add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn help_lines(t: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled("  Keyboard Shortcuts", t.header_style())),
        Line::raw(""),
    ];
    lines.extend(Command::ALL.iter().map(|cmd| {
        Line::from(vec![
            Span::styled(
                format!("  {:<6}", cmd.key()),
                Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(cmd.description().to_string(), t.text_style()),
        ])
    }));
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "  Keys are case-insensitive. Ctrl+C quits.",
        t.muted_style(),
    )));
    lines
}
