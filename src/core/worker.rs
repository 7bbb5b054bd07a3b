//! Distributed execution: worker processes fed newline-delimited JSON jobs.
//!
//! The pool writes one [`WorkerJob`] per line to a worker's stdin and reads one
//! [`WorkerReply`] per line from its stdout. A worker handles jobs one after
//! another until its stdin closes. Each job carries everything needed to run it,
//! so workers share no state with the pool or with each other; a worker keeps
//! its own Microsoft credential and refreshes it independently.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::{ExecutionConfig, ServiceConfig};
use crate::core::credential::{CredentialHolder, CredentialManager};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Credential, Engine, SourceText, TranslationRequest};
use crate::engines::{GoogleEngine, MicrosoftEngine};

/// One item of a batch, self-contained so it can cross a process boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub index: usize,
    pub engine: Engine,
    #[serde(flatten)]
    pub request: TranslationRequest,
    /// API key (Google) or subscription key (Microsoft)
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    pub service: ServiceConfig,
}

impl WorkerJob {
    /// Jobs for a whole batch, indexed in input order
    pub fn for_batch(
        engine: Engine,
        items: Vec<SourceText>,
        lang_to: &str,
        lang_from: &str,
        key: &str,
        credential: Option<&Credential>,
        service: &ServiceConfig,
    ) -> Vec<Self> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, text)| Self {
                index,
                engine,
                request: TranslationRequest::new(text, lang_to).with_source_lang(lang_from),
                key: key.to_string(),
                credential: credential.cloned(),
                service: service.clone(),
            })
            .collect()
    }
}

/// Outcome of one job as sent back by a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn from_outcome(index: usize, outcome: Result<String>) -> Self {
        match outcome {
            Ok(translation) => Self {
                index,
                translation: Some(translation),
                error: None,
            },
            Err(e) => Self {
                index,
                translation: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn into_outcome(self) -> Result<String> {
        match (self.translation, self.error) {
            (Some(translation), None) => Ok(translation),
            (_, Some(message)) => Err(TranslationError::WorkerError { message }),
            (None, None) => Err(TranslationError::WorkerError {
                message: format!("empty reply for item {}", self.index),
            }),
        }
    }
}

struct WorkerProcess {
    id: usize,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerProcess {
    /// Send one job and wait for its reply. Errors here mean the worker is unusable.
    async fn submit(&mut self, job: &WorkerJob) -> Result<WorkerReply> {
        let mut line = serde_json::to_string(job)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply).await? == 0 {
            return Err(TranslationError::WorkerError {
                message: format!("worker {} exited before answering item {}", self.id, job.index),
            });
        }

        let reply: WorkerReply = serde_json::from_str(reply.trim_end())?;
        if reply.index != job.index {
            return Err(TranslationError::WorkerError {
                message: format!(
                    "worker {} answered item {} while item {} was pending",
                    self.id, reply.index, job.index
                ),
            });
        }
        Ok(reply)
    }

    async fn shutdown(self) {
        let WorkerProcess {
            id,
            mut child,
            stdin,
            ..
        } = self;
        // EOF on stdin ends the worker loop
        drop(stdin);
        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) => debug!("Worker {} exited with {}", id, status),
            Ok(Err(e)) => warn!("Failed to reap worker {}: {}", id, e),
            Err(_) => {
                warn!("Worker {} did not exit, killing it", id);
                let _ = child.kill().await;
            }
        }
    }
}

/// Set of spawned worker processes for one batch
pub struct WorkerPool {
    workers: Vec<WorkerProcess>,
}

impl WorkerPool {
    /// Start `min(max_workers, jobs)` workers. Fails only if none could be started.
    pub fn spawn(execution: &ExecutionConfig, jobs: usize) -> Result<Self> {
        let program = match &execution.worker_program {
            Some(program) => program.clone(),
            None => std::env::current_exe()?,
        };
        let count = execution.max_workers.max(1).min(jobs.max(1));

        let mut workers = Vec::with_capacity(count);
        let mut last_error = None;
        for id in 0..count {
            match spawn_worker(id, &program, &execution.worker_args) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    warn!("Failed to start worker {} ({}): {}", id, program.display(), e);
                    last_error = Some(e);
                }
            }
        }

        if workers.is_empty() {
            return Err(TranslationError::WorkerError {
                message: format!(
                    "no worker process could be started from {}: {}",
                    program.display(),
                    last_error.map(|e| e.to_string()).unwrap_or_default()
                ),
            });
        }

        info!("Started {} worker processes", workers.len());
        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Feed every job through the pool and return outcomes in job-index order
    pub async fn run(self, jobs: Vec<WorkerJob>) -> Vec<Result<String>> {
        let total = jobs.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let mut set = JoinSet::new();

        for mut worker in self.workers {
            let queue = queue.clone();
            set.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let job = match queue.lock().await.pop_front() {
                        Some(job) => job,
                        None => break,
                    };
                    match worker.submit(&job).await {
                        Ok(reply) => done.push((job.index, reply.into_outcome())),
                        Err(e) => {
                            warn!("Retiring worker {}: {}", worker.id, e);
                            done.push((job.index, Err(e)));
                            break;
                        }
                    }
                }
                worker.shutdown().await;
                done
            });
        }

        let mut slots: Vec<Option<Result<String>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(done) => {
                    for (index, outcome) in done {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(outcome);
                        }
                    }
                }
                Err(e) => warn!("Worker driver task did not complete: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(TranslationError::WorkerError {
                        message: "no worker left to run this item".to_string(),
                    })
                })
            })
            .collect()
    }
}

fn spawn_worker(id: usize, program: &Path, args: &[String]) -> Result<WorkerProcess> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child.stdin.take().ok_or_else(|| TranslationError::WorkerError {
        message: format!("worker {} has no stdin", id),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| TranslationError::WorkerError {
        message: format!("worker {} has no stdout", id),
    })?;

    debug!("Spawned worker {} ({})", id, program.display());
    Ok(WorkerProcess {
        id,
        child,
        stdin,
        stdout: BufReader::new(stdout),
    })
}

/// Executes jobs inside a worker process
#[derive(Debug)]
pub struct JobRunner {
    client: reqwest::Client,
    credential: Option<CredentialHolder>,
}

impl JobRunner {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            credential: None,
        }
    }

    pub async fn execute(&mut self, job: &WorkerJob) -> Result<String> {
        match job.engine {
            Engine::Google => {
                let request = &job.request;
                GoogleEngine::new(self.client.clone(), job.service.clone())
                    .translate_one(&request.text, &request.target_lang, &request.source_lang, &job.key)
                    .await
            }
            Engine::Microsoft => {
                let engine = MicrosoftEngine::new(self.client.clone(), job.service.clone());
                let credential = self.credential_for(job, engine.credentials()).await?;
                let request = &job.request;
                engine
                    .translate_one(&request.text, &request.target_lang, &request.source_lang, &credential)
                    .await
            }
        }
    }

    async fn credential_for(
        &mut self,
        job: &WorkerJob,
        manager: &CredentialManager,
    ) -> Result<Arc<Credential>> {
        let holder = match (&self.credential, &job.credential) {
            (Some(holder), Some(offered)) => {
                holder.replace(Arc::new(offered.clone())).await;
                holder.clone()
            }
            (Some(holder), None) => holder.clone(),
            (None, Some(offered)) => CredentialHolder::new(Arc::new(offered.clone())),
            (None, None) => CredentialHolder::new(manager.acquire(&job.key).await?),
        };
        self.credential = Some(holder.clone());
        holder.refresh(manager, &job.key).await
    }
}

/// Worker loop: one job per input line, one reply per output line, until EOF
pub async fn run_worker<R, W>(reader: R, mut writer: W, client: reqwest::Client) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut runner = JobRunner::new(client);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let job: WorkerJob = serde_json::from_str(&line)?;
        debug!("Worker received item {}", job.index);

        let outcome = runner.execute(&job).await;
        if let Err(e) = &outcome {
            warn!("Item {} failed in worker: {}", job.index, e);
        }

        let mut reply = serde_json::to_string(&WorkerReply::from_outcome(job.index, outcome))?;
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use crate::core::credential::SUBSCRIPTION_KEY_HEADER;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn google_job(index: usize, text: &str, service: &ServiceConfig) -> WorkerJob {
        WorkerJob {
            index,
            engine: Engine::Google,
            request: TranslationRequest::new(text, "es"),
            key: "g-key".to_string(),
            credential: None,
            service: service.clone(),
        }
    }

    fn microsoft_job(index: usize, credential: Option<Credential>, service: &ServiceConfig) -> WorkerJob {
        WorkerJob {
            index,
            engine: Engine::Microsoft,
            request: TranslationRequest::new("Hello", "es"),
            key: "sub-key".to_string(),
            credential,
            service: service.clone(),
        }
    }

    async fn microsoft_server(auth_token: &str, auth_calls: u64) -> (MockServer, ServiceConfig) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issueToken"))
            .and(header(SUBSCRIPTION_KEY_HEADER, "sub-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(auth_token))
            .expect(auth_calls)
            .mount(&server)
            .await;
        let service = ServiceConfig {
            microsoft_auth_url: format!("{}/issueToken", server.uri()),
            microsoft_translate_url: format!("{}/Translate", server.uri()),
            ..Default::default()
        };
        (server, service)
    }

    async fn mount_translation(server: &MockServer, token: &str, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/Translate"))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hola"))
            .expect(calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_runner_refreshes_offered_expired_token_once() {
        let (server, service) = microsoft_server("worker-token", 1).await;
        mount_translation(&server, "worker-token", 2).await;
        mount_translation(&server, "batch-token", 1).await;

        let stale = Credential::new("batch-token", chrono::Duration::seconds(-5));
        let mut runner = JobRunner::new(reqwest::Client::new());

        // First job: the offered token is expired, so the worker acquires its own
        assert_eq!(runner.execute(&microsoft_job(0, Some(stale.clone()), &service)).await.unwrap(), "Hola");
        // Second job offers the same stale token; the held one expires later and is kept
        assert_eq!(runner.execute(&microsoft_job(1, Some(stale), &service)).await.unwrap(), "Hola");

        let held = runner.credential.as_ref().unwrap().current().await;
        assert_eq!(held.token, "worker-token");

        // A token expiring after the held one replaces it
        let newer = Credential::new("batch-token", chrono::Duration::minutes(30));
        assert_eq!(runner.execute(&microsoft_job(2, Some(newer), &service)).await.unwrap(), "Hola");
        assert_eq!(runner.credential.as_ref().unwrap().current().await.token, "batch-token");
    }

    #[tokio::test]
    async fn test_runner_without_offered_token_acquires_its_own() {
        let (server, service) = microsoft_server("own-token", 1).await;
        mount_translation(&server, "own-token", 2).await;

        let mut runner = JobRunner::new(reqwest::Client::new());
        for index in 0..2 {
            let translated = runner.execute(&microsoft_job(index, None, &service)).await.unwrap();
            assert_eq!(translated, "Hola");
        }
    }

    #[tokio::test]
    async fn test_runner_auth_failure_is_item_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
            .expect(1)
            .mount(&server)
            .await;
        let service = ServiceConfig {
            microsoft_auth_url: format!("{}/issueToken", server.uri()),
            microsoft_translate_url: format!("{}/Translate", server.uri()),
            ..Default::default()
        };

        let mut runner = JobRunner::new(reqwest::Client::new());
        let err = runner.execute(&microsoft_job(0, None, &service)).await.unwrap_err();

        assert!(matches!(err, TranslationError::AuthenticationError { status: 401, .. }));
        assert!(runner.credential.is_none());
    }

    #[test]
    fn test_job_wire_format() {
        let job = google_job(3, "Hello", &ServiceConfig::default());
        let value = serde_json::to_value(&job).unwrap();

        assert_json_eq!(
            value,
            json!({
                "index": 3,
                "engine": "google",
                "text": "Hello",
                "target_lang": "es",
                "source_lang": "en",
                "key": "g-key",
                "service": {
                    "google_translate_url": "https://translation.googleapis.com/language/translate/v2",
                    "microsoft_auth_url": "https://api.cognitive.microsoft.com/sts/v1.0/issueToken",
                    "microsoft_translate_url": "https://api.microsofttranslator.com/V2/Http.svc/Translate",
                    "token_lifetime_secs": 600,
                    "token_safety_margin_secs": 60,
                    "timeout_ms": 30000
                }
            })
        );
    }

    #[test]
    fn test_reply_outcomes() {
        let ok = WorkerReply::from_outcome(0, Ok("Hola".to_string()));
        assert_json_eq!(serde_json::to_value(&ok).unwrap(), json!({"index": 0, "translation": "Hola"}));
        assert_eq!(ok.into_outcome().unwrap(), "Hola");

        let failed = WorkerReply::from_outcome(
            1,
            Err(TranslationError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            }),
        );
        assert!(matches!(
            failed.into_outcome(),
            Err(TranslationError::WorkerError { ref message }) if message.contains("503")
        ));
    }

    #[test]
    fn test_batch_jobs_are_indexed_in_order() {
        let jobs = WorkerJob::for_batch(
            Engine::Microsoft,
            vec!["a".into(), "b".into()],
            "de",
            "en",
            "sub",
            Some(&Credential::new("tok", chrono::Duration::minutes(9))),
            &ServiceConfig::default(),
        );

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].index, 1);
        assert_eq!(jobs[1].request.text, SourceText::from("b"));
        assert_eq!(jobs[1].request.target_lang, "de");
        assert_eq!(jobs[0].credential.as_ref().unwrap().token, "tok");
    }

    #[tokio::test]
    async fn test_worker_loop_answers_each_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"translations": [{"translatedText": "Hola"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = ServiceConfig {
            google_translate_url: server.uri(),
            ..Default::default()
        };
        let mut bad_lang = google_job(1, "Bye", &service);
        bad_lang.request.target_lang = "xx".to_string();

        let input = format!(
            "{}\n\n{}\n",
            serde_json::to_string(&google_job(0, "Hello", &service)).unwrap(),
            serde_json::to_string(&bad_lang).unwrap()
        );
        let mut output = Vec::new();

        run_worker(input.as_bytes(), &mut output, reqwest::Client::new())
            .await
            .unwrap();

        let replies: Vec<WorkerReply> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].translation.as_deref(), Some("Hola"));
        assert_eq!(replies[1].index, 1);
        assert!(replies[1].error.as_deref().unwrap().contains("xx"));
    }

    #[tokio::test]
    async fn test_worker_loop_rejects_garbage() {
        let mut output = Vec::new();
        let result = run_worker("not json\n".as_bytes(), &mut output, reqwest::Client::new()).await;

        assert!(matches!(result, Err(TranslationError::JsonError(_))));
        assert!(output.is_empty());
    }

    #[test]
    fn test_spawn_fails_for_missing_program() {
        let execution = ExecutionConfig {
            max_workers: 2,
            worker_program: Some(std::path::PathBuf::from("/nonexistent/duo-translator-worker")),
            worker_args: vec![],
        };

        let err = tokio_test::block_on(async { WorkerPool::spawn(&execution, 4).map(|p| p.len()) })
            .unwrap_err();
        assert!(matches!(err, TranslationError::WorkerError { .. }));
    }
}
