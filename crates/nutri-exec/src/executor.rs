use tracing::info;

use nutri_core::ApiCall;
use nutri_core::ApiFailure;
use nutri_core::AuthVia;
use nutri_core::RuntimeAction;

use crate::client::ApiClient;

// Runs one reducer-requested call and folds its outcome back into a
// runtime action. Failures never escape: they become `CallFailed`.
pub async fn execute_call<C>(client: &C, call: ApiCall, token: Option<&str>) -> RuntimeAction
where
    C: ApiClient + ?Sized,
{
    let token = match token {
        Some(token) => token,
        None if call.requires_auth() => {
            return RuntimeAction::CallFailed {
                call,
                failure: ApiFailure::Unauthorized("not signed in".to_string()),
            };
        }
        None => "",
    };

    info!(call = call.label(), "api call");
    let outcome = match &call {
        ApiCall::Login(credentials) => client
            .login(credentials)
            .await
            .map(|session| RuntimeAction::Authenticated {
                session,
                via: AuthVia::Login,
            }),
        ApiCall::Register(registration) => client
            .register(registration)
            .await
            .map(|session| RuntimeAction::Authenticated {
                session,
                via: AuthVia::Register,
            }),
        ApiCall::FetchProfile { origin } => client
            .get_profile(token)
            .await
            .map(|lookup| RuntimeAction::ProfileChecked {
                origin: *origin,
                lookup,
            }),
        ApiCall::SaveProfile(form) => client
            .set_profile(token, form)
            .await
            .map(RuntimeAction::ProfileSaved),
        ApiCall::LogMeal { description, date } => client
            .log_meal(token, description, Some(*date))
            .await
            .map(|entry| RuntimeAction::MealLogged { entry, date: *date }),
        ApiCall::DeleteMeal { meal_id } => client
            .delete_meal(token, *meal_id)
            .await
            .map(|()| RuntimeAction::MealDeleted { meal_id: *meal_id }),
        ApiCall::ListMeals { date } => client
            .list_meals_for_date(token, *date)
            .await
            .map(RuntimeAction::MealsLoaded),
        ApiCall::Dashboard => client
            .get_dashboard(token, None)
            .await
            .map(RuntimeAction::DashboardLoaded),
        ApiCall::ChartRange { period_days, range } => client
            .get_dashboard(token, Some(*range))
            .await
            .map(|snapshot| RuntimeAction::ChartsLoaded {
                period_days: *period_days,
                range: *range,
                snapshot,
            }),
        ApiCall::Ask { question } => client
            .ask_ai(token, question)
            .await
            .map(RuntimeAction::AssistantAnswered),
        ApiCall::AnalyzeMeals => client
            .request_analysis_report(token)
            .await
            .map(RuntimeAction::AnalysisReady),
        ApiCall::DownloadReport => client
            .download_report(token)
            .await
            .map(|html| RuntimeAction::ReportDownloaded { html }),
    };

    match outcome {
        Ok(action) => action,
        Err(failure) => {
            info!(call = call.label(), kind = failure.kind().label(), "api call failed");
            RuntimeAction::CallFailed { call, failure }
        }
    }
}
