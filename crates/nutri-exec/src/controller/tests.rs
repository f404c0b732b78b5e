use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Local;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use nutri_core::ApiFailure;
use nutri_core::ChartRange;
use nutri_core::ClientAction;
use nutri_core::ClientOptions;
use nutri_core::Credentials;
use nutri_core::DailyLog;
use nutri_core::DashboardSnapshot;
use nutri_core::KeyValueStore;
use nutri_core::MealEntry;
use nutri_core::MemoryKeyValueStore;
use nutri_core::Profile;
use nutri_core::ProfileForm;
use nutri_core::ProfileLookup;
use nutri_core::Registration;
use nutri_core::Session;
use nutri_core::SessionPhase;
use nutri_core::SessionStore;
use nutri_core::Theme;
use nutri_core::UserAction;
use nutri_core::UserSummary;
use nutri_core::ASSISTANT_ERROR_TEXT;
use nutri_core::NETWORK_ERROR_TEXT;

use super::ControllerError;
use super::SessionController;
use crate::client::ApiClient;

struct FakeApiClient {
    calls: Mutex<Vec<String>>,
    profile: Result<ProfileLookup, ApiFailure>,
    answer: Result<String, ApiFailure>,
    meals: Mutex<BTreeMap<NaiveDate, Vec<MealEntry>>>,
    next_meal_id: Mutex<i64>,
}

impl Default for FakeApiClient {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            profile: Ok(ProfileLookup::Found(profile())),
            answer: Ok("Add a portion of vegetables to lunch.".to_string()),
            meals: Mutex::new(BTreeMap::new()),
            next_meal_id: Mutex::new(1),
        }
    }
}

impl FakeApiClient {
    fn with_profile(profile: Result<ProfileLookup, ApiFailure>) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiFailure> {
        self.record("login");
        if credentials.password != "secret" {
            return Err(ApiFailure::Unauthorized(
                "Incorrect email or password".to_string(),
            ));
        }
        Ok(session())
    }

    async fn register(&self, _registration: &Registration) -> Result<Session, ApiFailure> {
        self.record("register");
        Ok(session())
    }

    async fn get_profile(&self, _token: &str) -> Result<ProfileLookup, ApiFailure> {
        self.record("get_profile");
        self.profile.clone()
    }

    async fn set_profile(&self, _token: &str, _form: &ProfileForm) -> Result<Profile, ApiFailure> {
        self.record("set_profile");
        Ok(profile())
    }

    async fn log_meal(
        &self,
        _token: &str,
        description: &str,
        date: Option<NaiveDate>,
    ) -> Result<MealEntry, ApiFailure> {
        self.record("log_meal");
        let date = date.unwrap_or_else(today);
        let mut next_id = self.next_meal_id.lock().unwrap();
        let entry = MealEntry {
            id: *next_id,
            log_id: Some(1),
            name: description.to_string(),
            calories: 300.0,
            protein: 20.0,
            carbohydrates: 30.0,
            fats: 10.0,
            created_at: date.and_hms_opt(12, 30, 0).unwrap(),
        };
        *next_id += 1;
        self.meals
            .lock()
            .unwrap()
            .entry(date)
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn delete_meal(&self, _token: &str, meal_id: i64) -> Result<(), ApiFailure> {
        self.record("delete_meal");
        let mut meals = self.meals.lock().unwrap();
        let before: usize = meals.values().map(Vec::len).sum();
        for entries in meals.values_mut() {
            entries.retain(|entry| entry.id != meal_id);
        }
        let after: usize = meals.values().map(Vec::len).sum();
        if before == after {
            return Err(ApiFailure::NotFound("Meal not found".to_string()));
        }
        Ok(())
    }

    async fn list_meals_for_date(
        &self,
        _token: &str,
        date: NaiveDate,
    ) -> Result<DailyLog, ApiFailure> {
        self.record(format!("list_meals {date}"));
        let meals = self
            .meals
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_default();
        let mut log = DailyLog::empty(date);
        log.total_calories = meals.iter().map(|meal| meal.calories).sum();
        log.meals = meals;
        Ok(log)
    }

    async fn get_dashboard(
        &self,
        _token: &str,
        range: Option<ChartRange>,
    ) -> Result<DashboardSnapshot, ApiFailure> {
        match range {
            Some(range) => self.record(format!("dashboard {}..{}", range.start, range.end)),
            None => self.record("dashboard"),
        }
        Ok(DashboardSnapshot::default())
    }

    async fn ask_ai(&self, _token: &str, _question: &str) -> Result<String, ApiFailure> {
        self.record("ask_ai");
        self.answer.clone()
    }

    async fn request_analysis_report(&self, _token: &str) -> Result<String, ApiFailure> {
        self.record("analyze_meals");
        Ok("# Weekly analysis".to_string())
    }

    async fn download_report(&self, _token: &str) -> Result<String, ApiFailure> {
        self.record("download_report");
        Ok("<html><body>report</body></html>".to_string())
    }
}

// Memory store whose writes to one key always fail.
struct FailingKeyStore {
    inner: MemoryKeyValueStore,
    failing_key: &'static str,
}

impl KeyValueStore for FailingKeyStore {
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        if key == self.failing_key {
            return Err(std::io::Error::other("disk full"));
        }
        self.inner.save(key, value)
    }

    fn load(&self, key: &str) -> std::io::Result<Option<String>> {
        self.inner.load(key)
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        self.inner.remove(key)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn session() -> Session {
    Session::new(
        UserSummary {
            id: 42,
            email: "ana@example.com".to_string(),
            full_name: "Ana Lima".to_string(),
        },
        "token-42",
    )
}

fn profile() -> Profile {
    Profile {
        id: Some(1),
        age: 31,
        weight: 64.0,
        height: 170.0,
        gender: "female".to_string(),
        activity_level: "moderate".to_string(),
        fitness_goal: "maintain".to_string(),
        daily_calorie_goal: 2100.0,
        daily_protein_goal: 120.0,
        daily_carb_goal: 260.0,
        daily_fat_goal: 70.0,
    }
}

fn seeded_store() -> MemoryKeyValueStore {
    let mut store = SessionStore::new(MemoryKeyValueStore::new());
    store.save_session(&session()).expect("seed session");
    store.into_inner()
}

fn controller(
    client: FakeApiClient,
    store: MemoryKeyValueStore,
) -> SessionController<FakeApiClient, MemoryKeyValueStore> {
    SessionController::new(client, store, ClientOptions::default(), "downloads")
}

async fn active_controller() -> SessionController<FakeApiClient, MemoryKeyValueStore> {
    let mut controller = controller(FakeApiClient::default(), seeded_store());
    controller.start().await.expect("start");
    assert_eq!(controller.state().phase, SessionPhase::Active);
    controller
}

fn ask(question: &str) -> UserAction {
    UserAction::Ask {
        question: question.to_string(),
    }
}

#[tokio::test]
async fn start_without_stored_session_stays_signed_out() {
    let mut controller = controller(FakeApiClient::default(), MemoryKeyValueStore::new());
    let report = controller.start().await.expect("start");
    assert!(report.calls.is_empty());
    assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    assert!(controller.client().calls().is_empty());
}

#[tokio::test]
async fn login_persists_session_and_loads_dashboard() {
    let mut controller = controller(FakeApiClient::default(), MemoryKeyValueStore::new());
    let report = controller
        .dispatch(UserAction::Login(Credentials::new("ana@example.com", "secret")))
        .await
        .expect("login");

    assert_eq!(
        report.calls,
        vec!["login", "fetch_profile", "dashboard", "list_meals"]
    );
    assert_eq!(controller.state().phase, SessionPhase::Active);
    assert_eq!(
        controller.store().load_session().expect("load"),
        Some(session())
    );
    assert!(report
        .notifications
        .iter()
        .any(|notification| notification.message == "Login successful!"));
}

#[tokio::test]
async fn rejected_login_leaves_store_empty() {
    let mut controller = controller(FakeApiClient::default(), MemoryKeyValueStore::new());
    let report = controller
        .dispatch(UserAction::Login(Credentials::new("ana@example.com", "nope")))
        .await
        .expect("login");

    assert_eq!(report.calls, vec!["login"]);
    assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    assert_eq!(controller.store().load_session().expect("load"), None);
    assert_eq!(
        report.notifications.last().map(|n| n.message.as_str()),
        Some("Incorrect email or password")
    );
}

#[tokio::test]
async fn startup_missing_profile_lands_in_profile_incomplete() {
    let mut controller = controller(
        FakeApiClient::with_profile(Ok(ProfileLookup::Missing)),
        seeded_store(),
    );
    let report = controller.start().await.expect("start");

    assert_eq!(report.calls, vec!["fetch_profile"]);
    assert_eq!(controller.state().phase, SessionPhase::ProfileIncomplete);
    assert!(controller.state().session.is_some());
}

#[tokio::test]
async fn startup_auth_failure_clears_stored_session() {
    let mut controller = controller(
        FakeApiClient::with_profile(Err(ApiFailure::Unauthorized(
            "Invalid authentication credentials".to_string(),
        ))),
        seeded_store(),
    );
    let report = controller.start().await.expect("start");

    assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    assert_eq!(controller.store().load_session().expect("load"), None);
    assert_eq!(report.diagnostics.len(), 1);
}

#[tokio::test]
async fn register_then_complete_profile_activates_session() {
    let mut controller = controller(FakeApiClient::default(), MemoryKeyValueStore::new());
    let report = controller
        .dispatch(UserAction::Register(Registration {
            full_name: "Ana Lima".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        }))
        .await
        .expect("register");
    assert_eq!(report.calls, vec!["register"]);
    assert_eq!(controller.state().phase, SessionPhase::ProfileIncomplete);

    let report = controller
        .dispatch(UserAction::CompleteProfile(ProfileForm {
            age: 31,
            weight: 64.0,
            height: 170.0,
            gender: "female".to_string(),
            activity_level: "moderate".to_string(),
            fitness_goal: "maintain".to_string(),
        }))
        .await
        .expect("profile");
    assert_eq!(report.calls, vec!["save_profile", "dashboard", "list_meals"]);
    assert_eq!(controller.state().phase, SessionPhase::Active);
}

#[tokio::test]
async fn logging_meal_refreshes_list_before_dashboard() {
    let mut controller = active_controller().await;
    let report = controller
        .dispatch(UserAction::LogMeal {
            description: "lentil soup".to_string(),
            date: None,
        })
        .await
        .expect("log meal");

    assert_eq!(report.calls, vec!["log_meal", "list_meals", "dashboard"]);
    let cached = controller.state().meals.get(today()).expect("cached log");
    assert_eq!(cached.meals.len(), 1);
    assert_eq!(cached.meals[0].name, "lentil soup");
}

#[tokio::test]
async fn deleting_meal_refreshes_active_date_and_dashboard() {
    let mut controller = active_controller().await;
    controller
        .dispatch(UserAction::LogMeal {
            description: "toast".to_string(),
            date: None,
        })
        .await
        .expect("log meal");
    let meal_id = controller.state().meals.get(today()).expect("cached").meals[0].id;

    let report = controller
        .dispatch(UserAction::DeleteMeal { meal_id })
        .await
        .expect("delete");

    assert_eq!(report.calls, vec!["delete_meal", "list_meals", "dashboard"]);
    let calls = controller.client().calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[format!("list_meals {}", today()), "dashboard".to_string()]
    );
    assert!(controller
        .state()
        .meals
        .get(today())
        .expect("refetched")
        .meals
        .is_empty());
}

#[tokio::test]
async fn charts_request_dashboard_for_period() {
    let mut controller = active_controller().await;
    controller
        .dispatch(UserAction::LoadCharts {
            period_days: Some(14),
        })
        .await
        .expect("charts");

    let start = today() - chrono::Duration::days(14);
    assert_eq!(
        controller.client().calls().last().cloned(),
        Some(format!("dashboard {start}..{}", today()))
    );
    assert_eq!(
        controller.state().charts.as_ref().map(|charts| charts.period_days),
        Some(14)
    );
}

#[tokio::test]
async fn chat_transcript_survives_restart() {
    let mut controller = active_controller().await;
    controller.dispatch(ask("How much protein?")).await.expect("ask");
    controller.dispatch(ask("And fibre?")).await.expect("ask");
    let before = controller.state().transcript.messages().to_vec();
    assert_eq!(before.len(), 4);

    let store = controller.store().inner().clone();
    let mut restarted = self::controller(FakeApiClient::default(), store);
    restarted.restore().await.expect("restore");

    assert_eq!(restarted.state().transcript.messages(), before.as_slice());
    assert!(restarted.client().calls().is_empty());
}

#[tokio::test]
async fn failed_answer_is_persisted_as_reply() {
    let client = FakeApiClient {
        answer: Err(ApiFailure::Network("connection reset".to_string())),
        ..FakeApiClient::default()
    };
    let mut controller = controller(client, seeded_store());
    controller.start().await.expect("start");
    controller.dispatch(ask("Is rice ok?")).await.expect("ask");

    let client = FakeApiClient {
        answer: Err(ApiFailure::Server {
            status: 500,
            detail: "Error getting AI response".to_string(),
        }),
        ..FakeApiClient::default()
    };
    let store = controller.store().inner().clone();
    let mut controller = self::controller(client, store);
    controller.start().await.expect("start");
    controller.dispatch(ask("Is pasta ok?")).await.expect("ask");

    let stored = controller.store().load_transcript().expect("load");
    let texts: Vec<&str> = stored.iter().map(|message| message.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Is rice ok?",
            NETWORK_ERROR_TEXT,
            "Is pasta ok?",
            ASSISTANT_ERROR_TEXT,
        ]
    );
    assert_eq!(controller.state().transcript.pending(), None);
}

#[tokio::test]
async fn logout_clears_store_without_network() {
    let mut controller = active_controller().await;
    controller.dispatch(ask("Snack ideas?")).await.expect("ask");
    controller
        .dispatch(UserAction::SetTheme(Theme::Light))
        .await
        .expect("theme");
    let calls_before = controller.client().calls().len();

    let report = controller.dispatch(UserAction::Logout).await.expect("logout");

    assert!(report.calls.is_empty());
    assert_eq!(controller.client().calls().len(), calls_before);
    assert_eq!(controller.state().phase, SessionPhase::Unauthenticated);
    assert!(controller.state().transcript.is_empty());
    assert_eq!(controller.store().load_session().expect("load"), None);
    assert!(controller.store().load_transcript().expect("load").is_empty());
    assert_eq!(controller.store().load_theme().expect("load"), Theme::Light);
}

#[tokio::test]
async fn hooks_observe_every_reduced_action() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut controller = controller(FakeApiClient::default(), MemoryKeyValueStore::new());
    let sink = Arc::clone(&seen);
    controller.after_action(move |state, action| {
        let label = match action {
            ClientAction::User(user) => user.label().to_string(),
            ClientAction::Runtime(_) => format!("runtime:{}", state.phase.label()),
        };
        sink.lock().unwrap().push(label);
    });

    controller
        .dispatch(UserAction::Login(Credentials::new("ana@example.com", "secret")))
        .await
        .expect("login");

    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![
            "login".to_string(),
            "runtime:profile-incomplete".to_string(),
            "runtime:active".to_string(),
            "runtime:active".to_string(),
            "runtime:active".to_string(),
        ]
    );
}

#[tokio::test]
async fn downloaded_report_is_written_to_downloads_dir() {
    let dir = tempdir().expect("tmpdir");
    let mut controller = SessionController::new(
        FakeApiClient::default(),
        seeded_store(),
        ClientOptions::default(),
        dir.path().join("reports"),
    );
    controller.start().await.expect("start");

    let report = controller
        .dispatch(UserAction::DownloadReport)
        .await
        .expect("download");

    let expected = dir
        .path()
        .join("reports")
        .join(format!("nutrition-report-{}.html", today().format("%Y-%m-%d")));
    assert_eq!(report.calls, vec!["download_report"]);
    assert_eq!(
        std::fs::read_to_string(&expected).expect("report file"),
        "<html><body>report</body></html>"
    );
    assert_eq!(
        controller.state().last_report_path.as_deref(),
        Some(expected.display().to_string().as_str())
    );
}

#[tokio::test]
async fn failed_transcript_write_still_resolves_pending_question() {
    let store = FailingKeyStore {
        inner: seeded_store(),
        failing_key: "chat_history",
    };
    let mut controller = SessionController::new(
        FakeApiClient::default(),
        store,
        ClientOptions::default(),
        "downloads",
    );
    controller.start().await.expect("start");

    let err = controller
        .dispatch(ask("How much protein?"))
        .await
        .expect_err("transcript write fails");
    assert!(matches!(err, ControllerError::Store(_)));
    assert_eq!(controller.state().transcript.pending(), None);
    assert_eq!(controller.state().transcript.messages().len(), 2);

    let _ = controller.dispatch(ask("And fibre?")).await;
    let asked = controller
        .client()
        .calls()
        .into_iter()
        .filter(|call| call == "ask_ai")
        .count();
    assert_eq!(asked, 2);
    assert_eq!(controller.state().transcript.messages().len(), 4);
}

#[tokio::test]
async fn unwritable_downloads_dir_reports_error_without_saving() {
    let dir = tempdir().expect("tmpdir");
    let blocker = dir.path().join("reports");
    std::fs::write(&blocker, "not a directory").expect("blocker file");
    let mut controller = SessionController::new(
        FakeApiClient::default(),
        seeded_store(),
        ClientOptions::default(),
        blocker,
    );
    controller.start().await.expect("start");

    let err = controller
        .dispatch(UserAction::DownloadReport)
        .await
        .expect_err("report write fails");
    assert!(matches!(err, ControllerError::Report { .. }));
    assert_eq!(controller.state().last_report_path, None);
    assert_eq!(controller.state().phase, SessionPhase::Active);
}
