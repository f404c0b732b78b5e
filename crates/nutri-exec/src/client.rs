use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client as HttpClient;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use nutri_core::ApiFailure;
use nutri_core::ChartRange;
use nutri_core::Credentials;
use nutri_core::DailyLog;
use nutri_core::DashboardSnapshot;
use nutri_core::MealEntry;
use nutri_core::Profile;
use nutri_core::ProfileForm;
use nutri_core::ProfileLookup;
use nutri_core::Registration;
use nutri_core::Session;

use crate::contracts::failure_detail;
use crate::contracts::AiResponse;
use crate::contracts::AskRequest;
use crate::contracts::AuthResponse;
use crate::contracts::MealLogRequest;

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiFailure>;

    async fn register(&self, registration: &Registration) -> Result<Session, ApiFailure>;

    // A missing profile is an expected outcome, not a failure.
    async fn get_profile(&self, token: &str) -> Result<ProfileLookup, ApiFailure>;

    async fn set_profile(&self, token: &str, form: &ProfileForm) -> Result<Profile, ApiFailure>;

    async fn log_meal(
        &self,
        token: &str,
        description: &str,
        date: Option<NaiveDate>,
    ) -> Result<MealEntry, ApiFailure>;

    async fn delete_meal(&self, token: &str, meal_id: i64) -> Result<(), ApiFailure>;

    async fn list_meals_for_date(&self, token: &str, date: NaiveDate)
        -> Result<DailyLog, ApiFailure>;

    async fn get_dashboard(
        &self,
        token: &str,
        range: Option<ChartRange>,
    ) -> Result<DashboardSnapshot, ApiFailure>;

    async fn ask_ai(&self, token: &str, question: &str) -> Result<String, ApiFailure>;

    async fn request_analysis_report(&self, token: &str) -> Result<String, ApiFailure>;

    async fn download_report(&self, token: &str) -> Result<String, ApiFailure>;
}

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    http: HttpClient,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder()
            .user_agent(concat!("nutri/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiFailure> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiFailure::Network(err.to_string()))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "api response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiFailure::from_status(
            status.as_u16(),
            failure_detail(&body, status.canonical_reason()),
        ))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiFailure> {
        let response = self.send(request).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiFailure> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| ApiFailure::Network(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| ApiFailure::Server {
        status,
        detail: format!("unexpected response body: {err}"),
    })
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiFailure> {
        let request = self.http.post(self.endpoint("auth/login")).json(credentials);
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.into_session())
    }

    async fn register(&self, registration: &Registration) -> Result<Session, ApiFailure> {
        let request = self
            .http
            .post(self.endpoint("auth/register"))
            .json(registration);
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.into_session())
    }

    async fn get_profile(&self, token: &str) -> Result<ProfileLookup, ApiFailure> {
        let request = self.http.get(self.endpoint("profile")).bearer_auth(token);
        match self.send(request).await {
            Ok(response) => decode(response).await.map(ProfileLookup::Found),
            Err(ApiFailure::NotFound(_)) => Ok(ProfileLookup::Missing),
            Err(failure) => Err(failure),
        }
    }

    async fn set_profile(&self, token: &str, form: &ProfileForm) -> Result<Profile, ApiFailure> {
        let request = self
            .http
            .put(self.endpoint("profile"))
            .bearer_auth(token)
            .json(form);
        self.send_json(request).await
    }

    async fn log_meal(
        &self,
        token: &str,
        description: &str,
        date: Option<NaiveDate>,
    ) -> Result<MealEntry, ApiFailure> {
        let request = self
            .http
            .post(self.endpoint("logs/meals"))
            .bearer_auth(token)
            .json(&MealLogRequest { description, date });
        self.send_json(request).await
    }

    async fn delete_meal(&self, token: &str, meal_id: i64) -> Result<(), ApiFailure> {
        let request = self
            .http
            .delete(self.endpoint(&format!("logs/meals/{meal_id}")))
            .bearer_auth(token);
        self.send(request).await.map(|_| ())
    }

    async fn list_meals_for_date(
        &self,
        token: &str,
        date: NaiveDate,
    ) -> Result<DailyLog, ApiFailure> {
        let path = format!("logs/{}", date.format("%Y-%m-%d"));
        let request = self.http.get(self.endpoint(&path)).bearer_auth(token);
        self.send_json(request).await
    }

    async fn get_dashboard(
        &self,
        token: &str,
        range: Option<ChartRange>,
    ) -> Result<DashboardSnapshot, ApiFailure> {
        let mut request = self.http.get(self.endpoint("dashboard")).bearer_auth(token);
        if let Some(range) = range {
            request = request.query(&[
                ("start_date", range.start.format("%Y-%m-%d").to_string()),
                ("end_date", range.end.format("%Y-%m-%d").to_string()),
            ]);
        }
        self.send_json(request).await
    }

    async fn ask_ai(&self, token: &str, question: &str) -> Result<String, ApiFailure> {
        let request = self
            .http
            .post(self.endpoint("ai/ask"))
            .bearer_auth(token)
            .json(&AskRequest { question });
        let response: AiResponse = self.send_json(request).await?;
        Ok(response.response)
    }

    async fn request_analysis_report(&self, token: &str) -> Result<String, ApiFailure> {
        let request = self
            .http
            .post(self.endpoint("ai/analyze-meals"))
            .bearer_auth(token);
        let response: AiResponse = self.send_json(request).await?;
        Ok(response.response)
    }

    async fn download_report(&self, token: &str) -> Result<String, ApiFailure> {
        let request = self
            .http
            .get(self.endpoint("reports/download"))
            .bearer_auth(token);
        let response = self.send(request).await?;
        response
            .text()
            .await
            .map_err(|err| ApiFailure::Network(err.to_string()))
    }
}
