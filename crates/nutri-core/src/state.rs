use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

pub const NOTIFICATION_CAPACITY: usize = 64;
pub const DEFAULT_CHART_PERIOD_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    ProfileIncomplete,
    Active,
}

impl SessionPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ProfileIncomplete => "profile-incomplete",
            Self::Active => "active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub auth_token: String,
}

impl Session {
    pub fn new(user: UserSummary, auth_token: impl Into<String>) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            auth_token: auth_token.into(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl ChatSender {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Nutritionist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: ChatSender,
    #[serde(alias = "message")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: ChatSender::User,
            text: text.into(),
            timestamp,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: ChatSender::Assistant,
            text: text.into(),
            timestamp,
        }
    }
}

// `pending` is the question awaiting an answer. It is rendered as a
// placeholder and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    pending: Option<String>,
}

impl ChatTranscript {
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            pending: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn begin_pending(&mut self, question: impl Into<String>) {
        self.pending = Some(question.into());
    }

    pub fn resolve_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: i64,
    #[serde(default)]
    pub log_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
}

// The backend emits naive ISO timestamps, but an offset suffix is accepted
// too and kept as the wall-clock time it names.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized timestamp: {raw}"))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbohydrates: f64,
    #[serde(default)]
    pub total_fats: f64,
}

impl DailyLog {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            meals: Vec::new(),
            total_calories: 0.0,
            total_protein: 0.0,
            total_carbohydrates: 0.0,
            total_fats: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionGoals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyTotals {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbohydrates: f64,
    pub total_fats: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTrend {
    pub date: NaiveDate,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroData {
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalProgress {
    pub achieved: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub goals: NutritionGoals,
    #[serde(default)]
    pub today: DailyTotals,
    #[serde(default)]
    pub weekly_trends: Vec<DayTrend>,
    #[serde(default)]
    pub daily_data: Vec<DayTrend>,
    #[serde(default)]
    pub macro_data: Option<MacroData>,
    #[serde(default)]
    pub goal_progress: Option<GoalProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    pub period_days: u32,
    pub range: ChartRange,
    pub snapshot: DashboardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    pub gender: String,
    pub activity_level: String,
    pub fitness_goal: String,
    #[serde(default)]
    pub daily_calorie_goal: f64,
    #[serde(default)]
    pub daily_protein_goal: f64,
    #[serde(default)]
    pub daily_carb_goal: f64,
    #[serde(default)]
    pub daily_fat_goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    pub gender: String,
    pub activity_level: String,
    pub fitness_goal: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found(Profile),
    Missing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

impl NotificationLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub seq: u64,
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NotificationBuffer {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<Notification>,
}

impl NotificationBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(Notification {
            seq,
            level,
            message: message.into(),
        });
        seq
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn since(&self, seq_exclusive: u64) -> Vec<Notification> {
        self.buf
            .iter()
            .filter(|notification| notification.seq > seq_exclusive)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.buf.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for NotificationBuffer {
    fn default() -> Self {
        Self::new(NOTIFICATION_CAPACITY)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealCache {
    by_date: BTreeMap<NaiveDate, DailyLog>,
}

impl MealCache {
    pub fn get(&self, date: NaiveDate) -> Option<&DailyLog> {
        self.by_date.get(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    pub fn insert(&mut self, log: DailyLog) {
        self.by_date.insert(log.date, log);
    }

    pub fn invalidate(&mut self, date: NaiveDate) {
        self.by_date.remove(&date);
    }

    pub fn invalidate_all(&mut self) {
        self.by_date.clear();
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub keep_session_on_network_error: bool,
    pub chart_period_days: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            keep_session_on_network_error: false,
            chart_period_days: DEFAULT_CHART_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientState {
    pub phase: SessionPhase,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub transcript: ChatTranscript,
    pub meals: MealCache,
    pub selected_date: NaiveDate,
    pub today: NaiveDate,
    pub dashboard: Option<DashboardSnapshot>,
    pub charts: Option<ChartSnapshot>,
    pub analysis_report: Option<String>,
    pub last_report_path: Option<String>,
    pub theme: Theme,
    pub notifications: NotificationBuffer,
    pub options: ClientOptions,
}

impl ClientState {
    pub fn new(today: NaiveDate, options: ClientOptions) -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            session: None,
            profile: None,
            transcript: ChatTranscript::default(),
            meals: MealCache::default(),
            selected_date: today,
            today,
            dashboard: None,
            charts: None,
            analysis_report: None,
            last_report_path: None,
            theme: Theme::default(),
            notifications: NotificationBuffer::default(),
            options,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|session| session.auth_token.as_str())
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        self.notifications.push(level, message)
    }

    // Drops everything tied to the signed-in user. Theme and notifications
    // belong to the client, not the session.
    pub fn sign_out(&mut self) {
        self.phase = SessionPhase::Unauthenticated;
        self.session = None;
        self.profile = None;
        self.transcript.clear();
        self.meals.invalidate_all();
        self.dashboard = None;
        self.charts = None;
        self.analysis_report = None;
    }
}
