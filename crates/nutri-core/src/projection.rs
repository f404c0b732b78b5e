use chrono::NaiveDate;

use super::state::ChatSender;
use super::state::ChatTranscript;
use super::state::ClientState;
use super::state::DailyLog;
use super::state::DashboardSnapshot;
use super::state::SessionPhase;

pub const WARNING_THRESHOLD_PERCENT: f64 = 80.0;
pub const EMPTY_CHAT_TEXT: &str = "Ask me anything about nutrition!";
pub const THINKING_TEXT: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    ProfileSetup,
    Dashboard,
}

pub fn screen(state: &ClientState) -> Screen {
    match state.phase {
        SessionPhase::Unauthenticated => Screen::Auth,
        SessionPhase::ProfileIncomplete => Screen::ProfileSetup,
        SessionPhase::Active => Screen::Dashboard,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTier {
    Normal,
    Warning,
    Over,
}

impl ProgressTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Over => "over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    pub percent: f64,
    pub width_percent: f64,
    pub tier: ProgressTier,
}

pub fn progress_bar(current: f64, goal: f64) -> ProgressBar {
    if goal <= 0.0 || !goal.is_finite() || !current.is_finite() {
        return ProgressBar {
            percent: 0.0,
            width_percent: 0.0,
            tier: ProgressTier::Normal,
        };
    }
    let percent = (current / goal * 100.0).max(0.0);
    let tier = if percent > 100.0 {
        ProgressTier::Over
    } else if percent >= WARNING_THRESHOLD_PERCENT {
        ProgressTier::Warning
    } else {
        ProgressTier::Normal
    };
    ProgressBar {
        percent,
        width_percent: percent.min(100.0),
        tier,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroRow {
    pub label: &'static str,
    pub unit: &'static str,
    pub consumed: i64,
    pub goal: i64,
    pub bar: ProgressBar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub greeting: String,
    pub rows: Vec<MacroRow>,
}

pub fn dashboard_view(state: &ClientState) -> Option<DashboardView> {
    let snapshot = state.dashboard.as_ref()?;
    let name = state
        .session
        .as_ref()
        .map(|session| session.full_name.as_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("there");
    let goals = snapshot.goals;
    let today = snapshot.today;
    let row = |label, unit, consumed: f64, goal: f64| MacroRow {
        label,
        unit,
        consumed: consumed.round() as i64,
        goal: goal.round() as i64,
        bar: progress_bar(consumed, goal),
    };
    Some(DashboardView {
        greeting: format!("Hello {name}! Track your meals and stay on top of your goals."),
        rows: vec![
            row("Calories", "", today.total_calories, goals.calories),
            row("Protein", "g", today.total_protein, goals.protein),
            row("Carbs", "g", today.total_carbohydrates, goals.carbs),
            row("Fats", "g", today.total_fats, goals.fats),
        ],
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealRow {
    pub id: i64,
    pub name: String,
    pub calories: i64,
    pub protein: i64,
    pub carbohydrates: i64,
    pub fats: i64,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealListView {
    Loading,
    Empty { message: String },
    Entries(Vec<MealRow>),
}

pub fn meal_list_view(log: Option<&DailyLog>, date: NaiveDate, today: NaiveDate) -> MealListView {
    let Some(log) = log else {
        return MealListView::Loading;
    };
    if log.meals.is_empty() {
        let message = if date == today {
            "No meals logged today".to_string()
        } else {
            format!("No meals logged on {}", date.format("%b %-d"))
        };
        return MealListView::Empty { message };
    }
    MealListView::Entries(
        log.meals
            .iter()
            .map(|meal| MealRow {
                id: meal.id,
                name: meal.name.clone(),
                calories: meal.calories.round() as i64,
                protein: meal.protein.round() as i64,
                carbohydrates: meal.carbohydrates.round() as i64,
                fats: meal.fats.round() as i64,
                time: meal.created_at.format("%H:%M").to_string(),
            })
            .collect(),
    )
}

pub fn selected_meals_view(state: &ClientState) -> MealListView {
    meal_list_view(
        state.meals.get(state.selected_date),
        state.selected_date,
        state.today,
    )
}

pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else {
        date.format("%A, %b %-d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBubble {
    pub sender: ChatSender,
    pub text: String,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    Welcome(&'static str),
    Bubbles(Vec<ChatBubble>),
}

pub fn chat_view(transcript: &ChatTranscript) -> ChatView {
    if transcript.is_empty() && transcript.pending().is_none() {
        return ChatView::Welcome(EMPTY_CHAT_TEXT);
    }
    let mut bubbles: Vec<ChatBubble> = transcript
        .messages()
        .iter()
        .map(|message| ChatBubble {
            sender: message.sender,
            text: message.text.clone(),
            placeholder: false,
        })
        .collect();
    if transcript.pending().is_some() {
        bubbles.push(ChatBubble {
            sender: ChatSender::Assistant,
            text: THINKING_TEXT.to_string(),
            placeholder: true,
        });
    }
    ChatView::Bubbles(bubbles)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub title: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

pub fn weekly_calories_series(snapshot: &DashboardSnapshot) -> ChartSeries {
    ChartSeries {
        kind: ChartKind::Line,
        title: "Weekly calories",
        labels: snapshot
            .weekly_trends
            .iter()
            .map(|day| day.date.format("%a").to_string())
            .collect(),
        values: snapshot.weekly_trends.iter().map(|day| day.calories).collect(),
    }
}

pub fn daily_calories_series(snapshot: &DashboardSnapshot) -> ChartSeries {
    ChartSeries {
        kind: ChartKind::Bar,
        title: "Daily calories",
        labels: snapshot
            .daily_data
            .iter()
            .map(|day| day.date.format("%b %-d").to_string())
            .collect(),
        values: snapshot.daily_data.iter().map(|day| day.calories).collect(),
    }
}

pub fn macro_breakdown_series(snapshot: &DashboardSnapshot) -> ChartSeries {
    let (protein, carbs, fats) = match snapshot.macro_data {
        Some(data) => (data.protein, data.carbs, data.fats),
        None => (
            snapshot.today.total_protein,
            snapshot.today.total_carbohydrates,
            snapshot.today.total_fats,
        ),
    };
    ChartSeries {
        kind: ChartKind::Doughnut,
        title: "Macro breakdown",
        labels: vec!["Protein".to_string(), "Carbs".to_string(), "Fats".to_string()],
        values: vec![protein.max(0.0), carbs.max(0.0), fats.max(0.0)],
    }
}

pub fn goal_progress_series(snapshot: &DashboardSnapshot) -> ChartSeries {
    let (achieved, remaining) = match snapshot.goal_progress {
        Some(progress) => (progress.achieved, progress.remaining),
        None => {
            let achieved =
                progress_bar(snapshot.today.total_calories, snapshot.goals.calories).percent;
            (achieved, 100.0 - achieved)
        }
    };
    ChartSeries {
        kind: ChartKind::Doughnut,
        title: "Goal progress",
        labels: vec!["Achieved".to_string(), "Remaining".to_string()],
        values: vec![achieved.max(0.0), remaining.max(0.0)],
    }
}

pub fn chart_series(snapshot: &DashboardSnapshot) -> Vec<ChartSeries> {
    vec![
        weekly_calories_series(snapshot),
        daily_calories_series(snapshot),
        macro_breakdown_series(snapshot),
        goal_progress_series(snapshot),
    ]
}
