use chrono::Duration;
use chrono::Utc;

use super::actions::ApiCall;
use super::actions::AuthVia;
use super::actions::ClientAction;
use super::actions::ProfileCheckOrigin;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::error::ApiFailure;
use super::error::NETWORK_ERROR_TEXT;
use super::state::ChartRange;
use super::state::ChartSnapshot;
use super::state::ChatMessage;
use super::state::ChatTranscript;
use super::state::ClientState;
use super::state::NotificationLevel;
use super::state::ProfileLookup;
use super::state::Session;
use super::state::SessionPhase;
use super::state::Theme;

pub const ASSISTANT_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const SIGN_IN_REQUIRED_TEXT: &str = "Please log in to continue.";

#[derive(Debug, Clone, PartialEq)]
pub enum NutriEffect {
    Call(ApiCall),
    PersistSession(Session),
    PersistTranscript(Vec<ChatMessage>),
    PersistTheme(Theme),
    ClearStoredSession,
    SaveReport { file_name: String, html: String },
    Diagnostic(String),
}

impl NutriEffect {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Call(_) => "call",
            Self::PersistSession(_) => "persist-session",
            Self::PersistTranscript(_) => "persist-transcript",
            Self::PersistTheme(_) => "persist-theme",
            Self::ClearStoredSession => "clear-stored-session",
            Self::SaveReport { .. } => "save-report",
            Self::Diagnostic(_) => "diagnostic",
        }
    }
}

pub fn reduce(state: &mut ClientState, action: ClientAction) -> Vec<NutriEffect> {
    match action {
        ClientAction::User(user) => reduce_user(state, user),
        ClientAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

// Dated by the local day held in `state.today`, not the UTC date.
pub fn report_file_name(state: &ClientState) -> String {
    format!("nutrition-report-{}.html", state.today.format("%Y-%m-%d"))
}

fn reduce_user(state: &mut ClientState, action: UserAction) -> Vec<NutriEffect> {
    match action {
        UserAction::Login(credentials) => {
            if credentials.email.trim().is_empty() || credentials.password.is_empty() {
                state.notify(NotificationLevel::Error, "Email and password are required.");
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::Login(credentials))]
        }
        UserAction::Register(registration) => {
            if registration.full_name.trim().is_empty()
                || registration.email.trim().is_empty()
                || registration.password.is_empty()
            {
                state.notify(
                    NotificationLevel::Error,
                    "Name, email and password are required.",
                );
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::Register(registration))]
        }
        UserAction::CompleteProfile(form) => {
            if !require_session(state) {
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::SaveProfile(form))]
        }
        UserAction::LogMeal { description, date } => {
            if !require_session(state) {
                return Vec::new();
            }
            let description = description.trim();
            if description.is_empty() {
                state.notify(NotificationLevel::Error, "Describe the meal you want to log.");
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::LogMeal {
                description: description.to_string(),
                date: date.unwrap_or(state.selected_date),
            })]
        }
        UserAction::DeleteMeal { meal_id } => {
            if !require_session(state) {
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::DeleteMeal { meal_id })]
        }
        UserAction::SelectDate(date) => {
            state.selected_date = date;
            if !state.is_authenticated() || state.meals.contains(date) {
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::ListMeals { date })]
        }
        UserAction::RefreshDashboard => {
            if !require_session(state) {
                return Vec::new();
            }
            dashboard_refresh(state)
        }
        UserAction::LoadCharts { period_days } => {
            if !require_session(state) {
                return Vec::new();
            }
            let period_days = period_days
                .unwrap_or(state.options.chart_period_days)
                .max(1);
            let range = ChartRange {
                start: state.today - Duration::days(i64::from(period_days)),
                end: state.today,
            };
            vec![NutriEffect::Call(ApiCall::ChartRange { period_days, range })]
        }
        UserAction::Ask { question } => {
            if !require_session(state) {
                return Vec::new();
            }
            let question = question.trim();
            if question.is_empty() {
                state.notify(NotificationLevel::Error, "Type a question first.");
                return Vec::new();
            }
            if state.transcript.pending().is_some() {
                state.notify(
                    NotificationLevel::Info,
                    "Still waiting for the previous answer.",
                );
                return Vec::new();
            }
            state
                .transcript
                .push(ChatMessage::user(question, Utc::now()));
            state.transcript.begin_pending(question);
            vec![
                persist_transcript(&state.transcript),
                NutriEffect::Call(ApiCall::Ask {
                    question: question.to_string(),
                }),
            ]
        }
        UserAction::ClearChat => {
            state.transcript.clear();
            state.notify(NotificationLevel::Success, "Chat history cleared");
            vec![NutriEffect::PersistTranscript(Vec::new())]
        }
        UserAction::RequestAnalysisReport => {
            if !require_session(state) {
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::AnalyzeMeals)]
        }
        UserAction::DownloadReport => {
            if !require_session(state) {
                return Vec::new();
            }
            vec![NutriEffect::Call(ApiCall::DownloadReport)]
        }
        UserAction::SetTheme(theme) => {
            state.theme = theme;
            vec![NutriEffect::PersistTheme(theme)]
        }
        UserAction::ToggleTheme => {
            state.theme = state.theme.toggle();
            vec![NutriEffect::PersistTheme(state.theme)]
        }
        UserAction::Logout => {
            state.sign_out();
            state.notify(NotificationLevel::Success, "Logged out successfully");
            vec![NutriEffect::ClearStoredSession]
        }
    }
}

fn reduce_runtime(state: &mut ClientState, action: RuntimeAction) -> Vec<NutriEffect> {
    match action {
        RuntimeAction::SetToday(today) => {
            if state.selected_date == state.today {
                state.selected_date = today;
            }
            state.today = today;
            Vec::new()
        }
        RuntimeAction::SessionRestored {
            session,
            transcript,
            theme,
            verify,
        } => {
            state.theme = theme;
            let Some(session) = session else {
                state.sign_out();
                return Vec::new();
            };
            state.session = Some(session);
            state.transcript = ChatTranscript::from_messages(transcript);
            state.phase = SessionPhase::ProfileIncomplete;
            if verify {
                vec![NutriEffect::Call(ApiCall::FetchProfile {
                    origin: ProfileCheckOrigin::Startup,
                })]
            } else {
                Vec::new()
            }
        }
        RuntimeAction::Authenticated { session, via } => {
            let mut effects = Vec::new();
            let switched_user = state
                .session
                .as_ref()
                .is_some_and(|current| current.user_id != session.user_id);
            if switched_user {
                // Cached meals, snapshots and the transcript belong to the
                // previous account.
                state.sign_out();
                effects.push(NutriEffect::PersistTranscript(Vec::new()));
            }
            state.session = Some(session.clone());
            state.profile = None;
            state.phase = SessionPhase::ProfileIncomplete;
            effects.push(NutriEffect::PersistSession(session));
            match via {
                AuthVia::Login => {
                    state.notify(NotificationLevel::Success, "Login successful!");
                    effects.push(NutriEffect::Call(ApiCall::FetchProfile {
                        origin: ProfileCheckOrigin::Login,
                    }));
                }
                AuthVia::Register => {
                    state.notify(NotificationLevel::Success, "Registration successful!");
                }
            }
            effects
        }
        RuntimeAction::ProfileChecked { origin, lookup } => match lookup {
            ProfileLookup::Found(profile) => {
                state.profile = Some(profile);
                state.phase = SessionPhase::Active;
                dashboard_refresh(state)
            }
            ProfileLookup::Missing => {
                state.profile = None;
                state.phase = SessionPhase::ProfileIncomplete;
                if origin == ProfileCheckOrigin::Login {
                    state.notify(
                        NotificationLevel::Info,
                        "Complete your profile to get started.",
                    );
                }
                Vec::new()
            }
        },
        RuntimeAction::ProfileSaved(profile) => {
            state.profile = Some(profile);
            state.phase = SessionPhase::Active;
            state.notify(NotificationLevel::Success, "Profile setup complete!");
            dashboard_refresh(state)
        }
        RuntimeAction::MealLogged { entry, date } => {
            state.notify(
                NotificationLevel::Success,
                format!("Meal logged successfully! ({})", entry.name),
            );
            state.meals.invalidate(date);
            vec![
                NutriEffect::Call(ApiCall::ListMeals { date }),
                NutriEffect::Call(ApiCall::Dashboard),
            ]
        }
        RuntimeAction::MealDeleted { .. } => {
            state.notify(NotificationLevel::Success, "Meal deleted successfully!");
            // The deleted meal's date is unknown here.
            state.meals.invalidate_all();
            vec![
                NutriEffect::Call(ApiCall::ListMeals {
                    date: state.selected_date,
                }),
                NutriEffect::Call(ApiCall::Dashboard),
            ]
        }
        RuntimeAction::MealsLoaded(log) => {
            state.meals.insert(log);
            Vec::new()
        }
        RuntimeAction::DashboardLoaded(snapshot) => {
            state.dashboard = Some(snapshot);
            Vec::new()
        }
        RuntimeAction::ChartsLoaded {
            period_days,
            range,
            snapshot,
        } => {
            state.charts = Some(ChartSnapshot {
                period_days,
                range,
                snapshot,
            });
            Vec::new()
        }
        RuntimeAction::AssistantAnswered(answer) => {
            state.transcript.resolve_pending();
            state
                .transcript
                .push(ChatMessage::assistant(answer, Utc::now()));
            vec![persist_transcript(&state.transcript)]
        }
        RuntimeAction::AnalysisReady(report) => {
            state.analysis_report = Some(report);
            state.notify(
                NotificationLevel::Success,
                "Analysis report generated successfully!",
            );
            Vec::new()
        }
        RuntimeAction::ReportDownloaded { html } => vec![NutriEffect::SaveReport {
            file_name: report_file_name(state),
            html,
        }],
        RuntimeAction::ReportSaved { path } => {
            state.notify(
                NotificationLevel::Success,
                format!("Report downloaded successfully! ({path})"),
            );
            state.last_report_path = Some(path);
            Vec::new()
        }
        RuntimeAction::CallFailed { call, failure } => reduce_failure(state, call, failure),
    }
}

fn reduce_failure(state: &mut ClientState, call: ApiCall, failure: ApiFailure) -> Vec<NutriEffect> {
    match call {
        ApiCall::FetchProfile {
            origin: ProfileCheckOrigin::Startup,
        } => {
            if failure.is_network() && state.options.keep_session_on_network_error {
                state.notify(
                    NotificationLevel::Error,
                    "Network error. Could not verify your session.",
                );
                return Vec::new();
            }
            let message = if failure.is_network() {
                "Network error"
            } else {
                "Authentication error"
            };
            state.notify(NotificationLevel::Error, message);
            state.sign_out();
            vec![
                NutriEffect::Diagnostic(format!("startup profile check failed: {failure}")),
                NutriEffect::ClearStoredSession,
            ]
        }
        ApiCall::FetchProfile {
            origin: ProfileCheckOrigin::Login,
        } => {
            state.notify(
                NotificationLevel::Error,
                failure.user_message("Could not load your profile"),
            );
            Vec::new()
        }
        ApiCall::Login(_) => notify_failure(state, &failure, "Login failed"),
        ApiCall::Register(_) => notify_failure(state, &failure, "Registration failed"),
        ApiCall::SaveProfile(_) => notify_failure(state, &failure, "Profile setup failed"),
        ApiCall::LogMeal { .. } => notify_failure(state, &failure, "Failed to log meal"),
        ApiCall::DeleteMeal { .. } => notify_failure(state, &failure, "Failed to delete meal"),
        ApiCall::Dashboard => {
            state.notify(NotificationLevel::Error, "Failed to load dashboard");
            vec![NutriEffect::Diagnostic(format!(
                "dashboard refresh failed: {failure}"
            ))]
        }
        ApiCall::ListMeals { date } => vec![NutriEffect::Diagnostic(format!(
            "meal list refresh for {date} failed: {failure}"
        ))],
        ApiCall::ChartRange { range, .. } => vec![NutriEffect::Diagnostic(format!(
            "chart load for {}..{} failed: {failure}",
            range.start, range.end
        ))],
        ApiCall::Ask { .. } => {
            state.transcript.resolve_pending();
            let text = if failure.is_network() {
                NETWORK_ERROR_TEXT
            } else {
                ASSISTANT_ERROR_TEXT
            };
            state.transcript.push(ChatMessage::assistant(text, Utc::now()));
            vec![
                NutriEffect::Diagnostic(format!("assistant request failed: {failure}")),
                persist_transcript(&state.transcript),
            ]
        }
        ApiCall::AnalyzeMeals => notify_failure(state, &failure, "Failed to generate report"),
        ApiCall::DownloadReport => notify_failure(state, &failure, "Failed to download report"),
    }
}

fn notify_failure(state: &mut ClientState, failure: &ApiFailure, fallback: &str) -> Vec<NutriEffect> {
    state.notify(NotificationLevel::Error, failure.user_message(fallback));
    Vec::new()
}

fn require_session(state: &mut ClientState) -> bool {
    if state.is_authenticated() {
        return true;
    }
    state.phase = SessionPhase::Unauthenticated;
    state.notify(NotificationLevel::Error, SIGN_IN_REQUIRED_TEXT);
    false
}

fn dashboard_refresh(state: &mut ClientState) -> Vec<NutriEffect> {
    let today = state.today;
    state.meals.invalidate(today);
    vec![
        NutriEffect::Call(ApiCall::Dashboard),
        NutriEffect::Call(ApiCall::ListMeals { date: today }),
    ]
}

fn persist_transcript(transcript: &ChatTranscript) -> NutriEffect {
    NutriEffect::PersistTranscript(transcript.messages().to_vec())
}

#[cfg(test)]
mod tests;
