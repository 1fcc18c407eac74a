//! Typed console endpoints over the [`RequestClient`].
//!
//! Every call goes through the request client, so each survives one access
//! token expiry transparently. Errors propagate to the caller unchanged.

mod models;

pub use models::{
    Project, ProjectCreate, ProjectUpdate, Remediation, Report, ReportQuery, ScanType, Setting,
    SettingUpdate, Task, TaskCreate, TaskQuery, TaskUpdate, User, Vulnerability,
};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::instrument;

use crate::client::RequestClient;
use crate::error::Result;
use crate::polling::{FetchError, StatusFetcher, TaskProgress};
use crate::transport::RequestDescriptor;

#[derive(Clone)]
pub struct ConsoleApi {
    client: RequestClient,
}

impl ConsoleApi {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    // Auth

    pub async fn current_user(&self) -> Result<User> {
        self.client.get_json("auth/users/me").await
    }

    /// Profile fields to change, e.g. `{"email": "..."}`.
    pub async fn update_profile(&self, profile: &Value) -> Result<Value> {
        self.client.put_json("auth/users/me", profile).await
    }

    // Projects

    pub async fn list_projects(&self, skip: u32, limit: u32) -> Result<Vec<Project>> {
        self.client
            .request_json(
                RequestDescriptor::get("projects/")
                    .query("skip", skip)
                    .query("limit", limit),
            )
            .await
    }

    pub async fn get_project(&self, id: i64) -> Result<Project> {
        self.client.get_json(&format!("projects/{id}")).await
    }

    pub async fn create_project(&self, project: &ProjectCreate) -> Result<Project> {
        self.client.post_json("projects/", project).await
    }

    pub async fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<Project> {
        self.client.put_json(&format!("projects/{id}"), update).await
    }

    pub async fn delete_project(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("projects/{id}")).await
    }

    // Tasks

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let request = query
            .pairs()
            .into_iter()
            .fold(RequestDescriptor::get("tasks/"), |req, (k, v)| req.query(k, v));
        self.client.request_json(request).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        self.client.get_json(&format!("tasks/{id}")).await
    }

    #[instrument(skip(self))]
    pub async fn task_progress(&self, id: i64) -> Result<TaskProgress> {
        self.client.get_json(&format!("tasks/{id}/progress")).await
    }

    pub async fn create_task(&self, task: &TaskCreate) -> Result<Task> {
        self.client.post_json("tasks/", task).await
    }

    pub async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task> {
        self.client.put_json(&format!("tasks/{id}"), update).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("tasks/{id}")).await
    }

    /// Start a scan for the task.
    pub async fn run_task(&self, id: i64) -> Result<Task> {
        self.client
            .request_json(RequestDescriptor::post(format!("tasks/{id}/run")))
            .await
    }

    pub async fn stop_task(&self, id: i64) -> Result<Task> {
        self.client
            .request_json(RequestDescriptor::post(format!("tasks/{id}/stop")))
            .await
    }

    // Reports

    pub async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        let request = query
            .pairs()
            .into_iter()
            .fold(RequestDescriptor::get("reports/"), |req, (k, v)| req.query(k, v));
        self.client.request_json(request).await
    }

    pub async fn get_report(&self, id: i64) -> Result<Report> {
        self.client.get_json(&format!("reports/{id}")).await
    }

    /// Store a report assembled by the caller; `report` follows the report
    /// schema and must carry `task_id`.
    pub async fn create_report(&self, report: &Value) -> Result<Report> {
        self.client.post_json("reports/", report).await
    }

    pub async fn delete_report(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("reports/{id}")).await
    }

    /// Raw report document.
    pub async fn download_report(&self, id: i64) -> Result<Bytes> {
        let response = self
            .client
            .send_checked(RequestDescriptor::get(format!("reports/{id}/download")))
            .await?;
        Ok(response.body)
    }

    pub async fn generate_report(&self, task_id: i64) -> Result<Value> {
        self.client
            .request_json(RequestDescriptor::post(format!(
                "reports/task/{task_id}/generate"
            )))
            .await
    }

    // Settings

    pub async fn get_settings(&self) -> Result<Vec<Setting>> {
        self.client.get_json("settings/").await
    }

    pub async fn update_setting(&self, id: i64, update: &SettingUpdate) -> Result<Setting> {
        self.client.put_json(&format!("settings/{id}"), update).await
    }

    // Tools

    pub async fn check_url(&self, url: &str) -> Result<Value> {
        self.tool("url-check/", &json!({ "url": url })).await
    }

    pub async fn validate_ip(&self, ip: &str) -> Result<Value> {
        self.tool("ip-validate/", &json!({ "ip": ip })).await
    }

    /// `options` toggles character classes, e.g. `{"numbers": true, "special": false}`.
    pub async fn generate_password(&self, length: u32, options: Value) -> Result<Value> {
        self.tool(
            "generate-password/",
            &json!({ "length": length, "options": options }),
        )
        .await
    }

    pub async fn base64_encode(&self, text: &str) -> Result<Value> {
        self.tool("base64-encode/", &json!({ "text": text })).await
    }

    pub async fn base64_decode(&self, text: &str) -> Result<Value> {
        self.tool("base64-decode/", &json!({ "text": text })).await
    }

    /// `action` is `encode` or `decode`; `encoding_type` one of base64, url,
    /// hex, ascii, binary.
    pub async fn convert_encoding(
        &self,
        text: &str,
        action: &str,
        encoding_type: &str,
    ) -> Result<Value> {
        self.tool(
            "encoding-converter/",
            &json!({ "text": text, "action": action, "encoding_type": encoding_type }),
        )
        .await
    }

    /// `ports` is a range (`1-1000`) or a comma list (`22,80,443`).
    pub async fn port_scan(&self, target: &str, ports: &str, timeout_secs: u32) -> Result<Value> {
        self.tool(
            "port-scan/",
            &json!({ "target": target, "ports": ports, "timeout": timeout_secs }),
        )
        .await
    }

    /// Split free text into IPs, domains, C segments and URLs.
    pub async fn sort_assets(&self, text: &str) -> Result<Value> {
        self.tool("asset-sorting/", &json!({ "text": text })).await
    }

    /// Run a scanner tool directly.
    pub async fn run_tool(&self, request: &Value) -> Result<Value> {
        self.client.post_json("tools/run", request).await
    }

    async fn tool(&self, name: &str, body: &Value) -> Result<Value> {
        self.client.post_json(&format!("tools/{name}"), body).await
    }
}

#[async_trait]
impl StatusFetcher for ConsoleApi {
    async fn fetch_status(&self, id: i64) -> std::result::Result<TaskProgress, FetchError> {
        self.task_progress(id).await.map_err(FetchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::credentials::CredentialPair;
    use crate::polling::TaskStatus;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> ConsoleApi {
        let config = ConsoleConfig::default()
            .with_base_url(&format!("{}/api", server.uri()))
            .unwrap();
        let client = RequestClient::from_config(&config).unwrap();
        client.sign_in(CredentialPair::new("T1", Some("R1".into())));
        ConsoleApi::new(client)
    }

    #[tokio::test]
    async fn test_list_tasks_with_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .and(query_param("status", "running"))
            .and(query_param("project_id", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let tasks = api
            .list_tasks(
                &TaskQuery::default()
                    .with_project(2)
                    .with_status(TaskStatus::Running),
            )
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_status_classifies_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/1/progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "status": "completed", "progress": 100,
                "started_at": null, "completed_at": "2024-05-01T10:05:00Z"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/2/progress"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "detail": "Task not found"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/3/progress"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = api_for(&server);

        let progress = api.fetch_status(1).await.unwrap();
        assert_eq!(progress.status, TaskStatus::Completed);
        assert_eq!(progress.progress, 100);

        assert_eq!(api.fetch_status(2).await.unwrap_err(), FetchError::NotFound);
        assert!(matches!(
            api.fetch_status(3).await.unwrap_err(),
            FetchError::Transient(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_status_after_failed_refresh_is_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tasks/4/progress"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        assert!(matches!(
            api.fetch_status(4).await.unwrap_err(),
            FetchError::Unauthorized(_)
        ));
        assert!(!api.client().store().is_signed_in());
    }

    #[tokio::test]
    async fn test_run_task_and_tools() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tasks/5/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "project_id": 1, "name": "weekly", "scan_type": "full",
                "status": "running", "target_url": "http://target.local",
                "created_by": 1, "created_at": "2024-05-01T10:00:00Z", "progress": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/tools/base64-encode/"))
            .and(body_json(json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "aGVsbG8="})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);

        let task = api.run_task(5).await.unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.scan_type, ScanType::Full);

        let encoded = api.base64_encode("hello").await.unwrap();
        assert_eq!(encoded["result"], "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_download_report_returns_raw_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reports/3/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>report</html>".to_vec()))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let body = api.download_report(3).await.unwrap();
        assert_eq!(&body[..], b"<html>report</html>");
    }

    #[tokio::test]
    async fn test_extra_tools() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tools/port-scan/"))
            .and(body_json(json!({"target": "10.0.0.5", "ports": "22,80", "timeout": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "target": "10.0.0.5", "open_ports": [{"port": 22, "service": "ssh"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/tools/encoding-converter/"))
            .and(body_json(json!({"text": "a b", "action": "encode", "encoding_type": "url"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "a%20b"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/tools/asset-sorting/"))
            .and(body_json(json!({"text": "10.0.0.1\nexample.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "internal_ips": ["10.0.0.1"], "main_domains": ["example.com"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/tools/run"))
            .and(body_json(json!({"tool": "wapiti", "target": "http://target.local"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);

        let scan = api.port_scan("10.0.0.5", "22,80", 2).await.unwrap();
        assert_eq!(scan["open_ports"][0]["port"], 22);

        let converted = api.convert_encoding("a b", "encode", "url").await.unwrap();
        assert_eq!(converted["result"], "a%20b");

        let assets = api.sort_assets("10.0.0.1\nexample.com").await.unwrap();
        assert_eq!(assets["internal_ips"][0], "10.0.0.1");

        let run = api
            .run_tool(&json!({"tool": "wapiti", "target": "http://target.local"}))
            .await
            .unwrap();
        assert_eq!(run["status"], "started");
    }

    #[tokio::test]
    async fn test_update_profile_and_create_report() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/auth/users/me"))
            .and(body_json(json!({"email": "new@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "username": "admin", "email": "new@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/reports/"))
            .and(body_json(json!({
                "task_id": 5, "project_id": 1, "scan_type": "full",
                "status": "completed", "created_by": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 9, "task_id": 5, "project_id": 1, "scan_type": "full",
                "status": "completed", "created_by": 1,
                "created_at": "2024-05-01T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);

        let profile = api
            .update_profile(&json!({"email": "new@example.com"}))
            .await
            .unwrap();
        assert_eq!(profile["email"], "new@example.com");

        let report = api
            .create_report(&json!({
                "task_id": 5, "project_id": 1, "scan_type": "full",
                "status": "completed", "created_by": 1
            }))
            .await
            .unwrap();
        assert_eq!(report.id, 9);
        assert_eq!(report.task_id, 5);
        assert!(report.vulnerabilities.is_none());
    }
}
