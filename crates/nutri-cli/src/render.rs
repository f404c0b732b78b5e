use std::fmt::Write;

use nutri_core::projection::ChartKind;
use nutri_core::projection::ChartSeries;
use nutri_core::projection::ChatView;
use nutri_core::projection::DashboardView;
use nutri_core::projection::MacroRow;
use nutri_core::projection::MealListView;
use nutri_core::projection::ProgressTier;
use nutri_core::projection::Screen;
use nutri_core::ClientState;
use nutri_core::Notification;

const BAR_WIDTH: usize = 20;
const CHART_WIDTH: usize = 30;

pub fn notification_line(notification: &Notification) -> String {
    format!("[{}] {}", notification.level.label(), notification.message)
}

pub fn status_text(state: &ClientState, screen: Screen) -> String {
    let mut out = String::new();
    match &state.session {
        Some(session) => {
            let _ = writeln!(out, "Signed in as {} <{}>", session.full_name, session.email);
        }
        None => {
            let _ = writeln!(out, "Not signed in");
        }
    }
    let next = match screen {
        Screen::Auth => "run `nutri login` or `nutri register`",
        Screen::ProfileSetup => "run `nutri profile` to finish setup",
        Screen::Dashboard => "ready",
    };
    let _ = writeln!(out, "Session: {} ({next})", state.phase.label());
    let _ = write!(out, "Theme: {}", state.theme.label());
    out
}

pub fn progress_line(row: &MacroRow) -> String {
    let filled = ((row.bar.width_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let marker = match row.bar.tier {
        ProgressTier::Normal => "",
        ProgressTier::Warning => " !",
        ProgressTier::Over => " over",
    };
    format!(
        "{:<9}{:>6} / {:<6}[{}{}] {:>3.0}%{marker}",
        row.label,
        format!("{}{}", row.consumed, row.unit),
        format!("{}{}", row.goal, row.unit),
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        row.bar.percent,
    )
}

pub fn dashboard_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.greeting);
    for row in &view.rows {
        let _ = writeln!(out, "  {}", progress_line(row));
    }
    out.trim_end().to_string()
}

pub fn meal_list_text(heading: &str, view: &MealListView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{heading}");
    match view {
        MealListView::Loading => {
            let _ = writeln!(out, "  (not loaded)");
        }
        MealListView::Empty { message } => {
            let _ = writeln!(out, "  {message}");
        }
        MealListView::Entries(rows) => {
            for row in rows {
                let _ = writeln!(
                    out,
                    "  #{:<5} {}  {}  {} cal | P {}g C {}g F {}g",
                    row.id,
                    row.time,
                    row.name,
                    row.calories,
                    row.protein,
                    row.carbohydrates,
                    row.fats,
                );
            }
        }
    }
    out.trim_end().to_string()
}

pub fn chat_text(view: &ChatView) -> String {
    match view {
        ChatView::Welcome(text) => (*text).to_string(),
        ChatView::Bubbles(bubbles) => bubbles
            .iter()
            .map(|bubble| format!("{}: {}", bubble.sender.label(), bubble.text))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn chart_text(series: &ChartSeries) -> String {
    let mut out = String::new();
    let kind = match series.kind {
        ChartKind::Line => "trend",
        ChartKind::Bar => "bars",
        ChartKind::Doughnut => "share",
    };
    let _ = writeln!(out, "{} ({kind})", series.title);
    if series.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return out.trim_end().to_string();
    }
    let max = series.max_value();
    let label_width = series.labels.iter().map(String::len).max().unwrap_or(0);
    for (label, value) in series.labels.iter().zip(&series.values) {
        let len = if max > 0.0 {
            ((value / max) * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "  {label:<label_width$} {:<width$} {value:.0}",
            "=".repeat(len),
            width = CHART_WIDTH,
        );
    }
    out.trim_end().to_string()
}
