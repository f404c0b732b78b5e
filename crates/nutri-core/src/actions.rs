use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::error::ApiFailure;
use super::state::ChartRange;
use super::state::ChatMessage;
use super::state::DailyLog;
use super::state::DashboardSnapshot;
use super::state::MealEntry;
use super::state::Profile;
use super::state::ProfileForm;
use super::state::ProfileLookup;
use super::state::Session;
use super::state::Theme;

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum ClientAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    Login(Credentials),
    Register(Registration),
    CompleteProfile(ProfileForm),
    LogMeal {
        description: String,
        date: Option<NaiveDate>,
    },
    DeleteMeal {
        meal_id: i64,
    },
    SelectDate(NaiveDate),
    RefreshDashboard,
    LoadCharts {
        period_days: Option<u32>,
    },
    Ask {
        question: String,
    },
    ClearChat,
    RequestAnalysisReport,
    DownloadReport,
    SetTheme(Theme),
    ToggleTheme,
    Logout,
}

impl UserAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Register(_) => "register",
            Self::CompleteProfile(_) => "complete_profile",
            Self::LogMeal { .. } => "log_meal",
            Self::DeleteMeal { .. } => "delete_meal",
            Self::SelectDate(_) => "select_date",
            Self::RefreshDashboard => "refresh_dashboard",
            Self::LoadCharts { .. } => "load_charts",
            Self::Ask { .. } => "ask",
            Self::ClearChat => "clear_chat",
            Self::RequestAnalysisReport => "request_analysis_report",
            Self::DownloadReport => "download_report",
            Self::SetTheme(_) => "set_theme",
            Self::ToggleTheme => "toggle_theme",
            Self::Logout => "logout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVia {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileCheckOrigin {
    Startup,
    Login,
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    SetToday(NaiveDate),
    SessionRestored {
        session: Option<Session>,
        transcript: Vec<ChatMessage>,
        theme: Theme,
        verify: bool,
    },
    Authenticated {
        session: Session,
        via: AuthVia,
    },
    ProfileChecked {
        origin: ProfileCheckOrigin,
        lookup: ProfileLookup,
    },
    ProfileSaved(Profile),
    MealLogged {
        entry: MealEntry,
        date: NaiveDate,
    },
    MealDeleted {
        meal_id: i64,
    },
    MealsLoaded(DailyLog),
    DashboardLoaded(DashboardSnapshot),
    ChartsLoaded {
        period_days: u32,
        range: ChartRange,
        snapshot: DashboardSnapshot,
    },
    AssistantAnswered(String),
    AnalysisReady(String),
    ReportDownloaded {
        html: String,
    },
    ReportSaved {
        path: String,
    },
    CallFailed {
        call: ApiCall,
        failure: ApiFailure,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Login(Credentials),
    Register(Registration),
    FetchProfile {
        origin: ProfileCheckOrigin,
    },
    SaveProfile(ProfileForm),
    LogMeal {
        description: String,
        date: NaiveDate,
    },
    DeleteMeal {
        meal_id: i64,
    },
    ListMeals {
        date: NaiveDate,
    },
    Dashboard,
    ChartRange {
        period_days: u32,
        range: ChartRange,
    },
    Ask {
        question: String,
    },
    AnalyzeMeals,
    DownloadReport,
}

impl ApiCall {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login(_) | Self::Register(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Register(_) => "register",
            Self::FetchProfile { .. } => "fetch_profile",
            Self::SaveProfile(_) => "save_profile",
            Self::LogMeal { .. } => "log_meal",
            Self::DeleteMeal { .. } => "delete_meal",
            Self::ListMeals { .. } => "list_meals",
            Self::Dashboard => "dashboard",
            Self::ChartRange { .. } => "chart_range",
            Self::Ask { .. } => "ask",
            Self::AnalyzeMeals => "analyze_meals",
            Self::DownloadReport => "download_report",
        }
    }
}
