//! In-memory collaborators shared by the application tests.

use async_trait::async_trait;
use pagelink_core::automation::{AutomationKind, AutomationRule, AutomationRulePatch};
use pagelink_core::backend::{
    BackendApi, BackendError, BackendResult, BackendUser, ConnectionStatus, CreatedPost,
    GeneratedImage, GeneratedText, ImagePlacement, LinkAccountRequest, LinkAccountResponse,
    LinkedAccount, Platform,
};
use pagelink_core::page::AccessToken;
use pagelink_core::platform::{ApiParams, LoginStatus, PlatformSdk};
use pagelink_core::post::RawPost;
use pagelink_core::publish::PublishRequest;
use pagelink_core::{PagelinkError, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const USER_TOKEN: &str = "user-token";

pub(crate) struct MockSdk {
    ready: AtomicBool,
    pub init_calls: AtomicUsize,
    pub teardown_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub init_delay: Mutex<Option<Duration>>,
    pub api_delay: Mutex<Option<Duration>>,
    pub login_status: Mutex<LoginStatus>,
    pub responses: Mutex<HashMap<String, serde_json::Value>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            init_delay: Mutex::new(None),
            api_delay: Mutex::new(None),
            login_status: Mutex::new(LoginStatus::Connected {
                access_token: AccessToken::new(USER_TOKEN),
            }),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A user `u1` managing the given `(id, name)` pages with full grants.
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let sdk = Self::new();
        let data: Vec<_> = pages
            .iter()
            .map(|(id, name)| {
                json!({
                    "id": id,
                    "name": name,
                    "category": "Bakery",
                    "access_token": format!("page-token-{id}"),
                    "tasks": ["MANAGE"],
                    "followers_count": 10
                })
            })
            .collect();
        sdk.respond("me", json!({"id": "u1", "name": "Ada", "email": "ada@example.com"}));
        sdk.respond("me/accounts", json!({ "data": data }));
        sdk.respond(
            "me/permissions",
            json!({"data": [
                {"permission": "pages_show_list", "status": "granted"},
                {"permission": "pages_manage_posts", "status": "granted"}
            ]}),
        );
        sdk
    }

    pub fn respond(&self, path: &str, value: serde_json::Value) {
        self.responses.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn api_calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == path).count()
    }
}

#[async_trait]
impl PlatformSdk for MockSdk {
    async fn init(&self, _app_id: &str) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.init_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn login(&self, _scopes: &[String]) -> Result<LoginStatus> {
        Ok(self.login_status.lock().unwrap().clone())
    }

    async fn api(&self, path: &str, _params: &ApiParams) -> Result<serde_json::Value> {
        self.calls.lock().unwrap().push(path.to_string());
        let delay = *self.api_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PagelinkError::Sdk(format!("no response for {path}")))
    }

    async fn logout(&self) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn teardown(&self) {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
    }
}

pub(crate) fn status_error(status: u16, message: &str) -> BackendError {
    BackendError::Status {
        status,
        message: message.to_string(),
        code: None,
    }
}

pub(crate) fn rule(
    id: &str,
    kind: AutomationKind,
    is_active: bool,
    target: Option<&str>,
) -> AutomationRule {
    AutomationRule {
        id: id.to_string(),
        kind,
        is_active,
        template: "Thanks for reaching out!".to_string(),
        target_account_internal_id: target.map(str::to_string),
    }
}

pub(crate) struct MockBackend {
    pub status: Mutex<ConnectionStatus>,
    pub user: Mutex<BackendResult<BackendUser>>,
    /// Successive `list_linked_accounts` answers; the last one repeats
    pub accounts: Mutex<Vec<Vec<LinkedAccount>>>,
    pub accounts_error: Mutex<Option<BackendError>>,
    pub link_result: Mutex<BackendResult<LinkAccountResponse>>,
    pub unlink_result: Mutex<BackendResult<()>>,
    pub posts: Mutex<BackendResult<Vec<RawPost>>>,
    pub posts_delay: Mutex<Option<Duration>>,
    pub create_post_result: Mutex<BackendResult<CreatedPost>>,
    pub rules: Mutex<HashMap<AutomationKind, Vec<AutomationRule>>>,
    pub update_error: Mutex<Option<BackendError>>,
    pub delete_result: Mutex<BackendResult<()>>,
    pub created: Mutex<Vec<(String, PublishRequest)>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(ConnectionStatus::default()),
            user: Mutex::new(Ok(BackendUser {
                id: "user-1".into(),
                email: Some("ada@example.com".into()),
                name: Some("Ada".into()),
            })),
            accounts: Mutex::new(vec![Vec::new()]),
            accounts_error: Mutex::new(None),
            link_result: Mutex::new(Ok(LinkAccountResponse::default())),
            unlink_result: Mutex::new(Ok(())),
            posts: Mutex::new(Ok(Vec::new())),
            posts_delay: Mutex::new(None),
            create_post_result: Mutex::new(Ok(CreatedPost {
                id: "post-1".into(),
                status: Some("published".into()),
                scheduled_for: None,
            })),
            rules: Mutex::new(HashMap::new()),
            update_error: Mutex::new(None),
            delete_result: Mutex::new(Ok(())),
            created: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn linking(accounts: Vec<LinkedAccount>) -> Self {
        let backend = Self::new();
        *backend.link_result.lock().unwrap() = Ok(LinkAccountResponse {
            accounts,
            ..Default::default()
        });
        backend
    }

    pub fn set_accounts(&self, sequence: Vec<Vec<LinkedAccount>>) {
        *self.accounts.lock().unwrap() = sequence;
    }

    pub fn set_rules(&self, kind: AutomationKind, rules: Vec<AutomationRule>) {
        self.rules.lock().unwrap().insert(kind, rules);
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn get_connection_status(&self) -> BackendResult<ConnectionStatus> {
        self.record("get_connection_status");
        Ok(self.status.lock().unwrap().clone())
    }

    async fn list_linked_accounts(&self) -> BackendResult<Vec<LinkedAccount>> {
        self.record("list_linked_accounts");
        if let Some(err) = self.accounts_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut sequence = self.accounts.lock().unwrap();
        if sequence.len() > 1 {
            Ok(sequence.remove(0))
        } else {
            Ok(sequence.first().cloned().unwrap_or_default())
        }
    }

    async fn link_account(
        &self,
        _request: &LinkAccountRequest,
    ) -> BackendResult<LinkAccountResponse> {
        self.record("link_account");
        self.link_result.lock().unwrap().clone()
    }

    async fn unlink_account(&self) -> BackendResult<()> {
        self.record("unlink_account");
        self.unlink_result.lock().unwrap().clone()
    }

    async fn list_posts(
        &self,
        _platform: Platform,
        _limit: usize,
        _account_id: &str,
    ) -> BackendResult<Vec<RawPost>> {
        self.record("list_posts");
        let delay = *self.posts_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.posts.lock().unwrap().clone()
    }

    async fn create_post(
        &self,
        page_id: &str,
        request: &PublishRequest,
    ) -> BackendResult<CreatedPost> {
        self.record("create_post");
        self.created
            .lock()
            .unwrap()
            .push((page_id.to_string(), request.clone()));
        self.create_post_result.lock().unwrap().clone()
    }

    async fn generate_text_content(&self, prompt: &str) -> BackendResult<GeneratedText> {
        self.record("generate_text_content");
        Ok(GeneratedText {
            content: format!("Generated: {prompt}"),
        })
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _placement: ImagePlacement,
    ) -> BackendResult<GeneratedImage> {
        self.record("generate_image");
        Ok(GeneratedImage {
            url: "https://cdn.example/generated.png".into(),
            filename: "generated.png".into(),
        })
    }

    async fn list_automation_rules(
        &self,
        _platform: Platform,
        kind: AutomationKind,
    ) -> BackendResult<Vec<AutomationRule>> {
        self.record("list_automation_rules");
        Ok(self
            .rules
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_automation_rule(
        &self,
        id: &str,
        patch: &AutomationRulePatch,
    ) -> BackendResult<AutomationRule> {
        self.record("update_automation_rule");
        if let Some(err) = self.update_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|r| r.id == id)
            .ok_or_else(|| status_error(404, "Rule not found"))?;
        if let Some(active) = patch.is_active {
            rule.is_active = active;
        }
        Ok(rule.clone())
    }

    async fn delete_scheduled_post(&self, _id: &str) -> BackendResult<()> {
        self.record("delete_scheduled_post");
        self.delete_result.lock().unwrap().clone()
    }

    async fn get_current_user(&self) -> BackendResult<BackendUser> {
        self.record("get_current_user");
        self.user.lock().unwrap().clone()
    }
}
