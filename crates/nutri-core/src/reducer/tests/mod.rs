use chrono::NaiveDate;
use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::NutriEffect;
pub(super) use super::ASSISTANT_ERROR_TEXT;
pub(super) use super::SIGN_IN_REQUIRED_TEXT;
pub(super) use crate::actions::ApiCall;
pub(super) use crate::actions::AuthVia;
pub(super) use crate::actions::ClientAction;
pub(super) use crate::actions::Credentials;
pub(super) use crate::actions::ProfileCheckOrigin;
pub(super) use crate::actions::Registration;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::error::ApiFailure;
pub(super) use crate::error::NETWORK_ERROR_TEXT;
pub(super) use crate::state::ChatSender;
pub(super) use crate::state::ClientOptions;
pub(super) use crate::state::ClientState;
pub(super) use crate::state::DailyLog;
pub(super) use crate::state::MealEntry;
pub(super) use crate::state::NotificationLevel;
pub(super) use crate::state::Profile;
pub(super) use crate::state::ProfileForm;
pub(super) use crate::state::ProfileLookup;
pub(super) use crate::state::Session;
pub(super) use crate::state::SessionPhase;
pub(super) use crate::state::Theme;
pub(super) use crate::state::UserSummary;


fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn state() -> ClientState {
    ClientState::new(day(5), ClientOptions::default())
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

fn signed_in_state() -> ClientState {
    let mut state = state();
    state.session = Some(session());
    state.phase = SessionPhase::Active;
    state
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

fn profile_form() -> ProfileForm {
    ProfileForm {
        age: 31,
        weight: 64.0,
        height: 170.0,
        gender: "female".to_string(),
        activity_level: "moderate".to_string(),
        fitness_goal: "maintain".to_string(),
    }
}

fn meal(id: i64, date: NaiveDate) -> MealEntry {
    MealEntry {
        id,
        log_id: Some(3),
        name: "Grilled chicken salad".to_string(),
        calories: 450.0,
        protein: 38.0,
        carbohydrates: 20.0,
        fats: 18.0,
        created_at: date.and_hms_opt(13, 15, 0).unwrap(),
    }
}

fn run_user(state: &mut ClientState, action: UserAction) -> Vec<NutriEffect> {
    reduce(state, ClientAction::User(action))
}

fn run_runtime(state: &mut ClientState, action: RuntimeAction) -> Vec<NutriEffect> {
    reduce(state, ClientAction::Runtime(action))
}

fn calls(effects: &[NutriEffect]) -> Vec<&'static str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            NutriEffect::Call(call) => Some(call.label()),
            _ => None,
        })
        .collect()
}

fn last_notification(state: &ClientState) -> (NotificationLevel, String) {
    let latest = state.notifications.latest().expect("notification");
    (latest.level, latest.message.clone())
}

#[test]
fn fresh_state_is_unauthenticated_with_no_data() {
    let state = state();
    assert_eq!(state.phase, SessionPhase::Unauthenticated);
    assert_eq!(state.selected_date, day(5));
    assert!(state.transcript.is_empty());
    assert!(state.notifications.is_empty());
}
