#![allow(dead_code)]

use std::{
    fmt,
    fs::File,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use journey::{
    config::AppConfig,
    db::init_pool,
    routes::create_router,
    services::{
        mailer::{MailError, Mailer},
        store::TripStore,
    },
    state::AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailEvent {
    OwnerConfirmRequest {
        trip_id: String,
    },
    TripConfirmedBroadcast {
        trip_id: String,
    },
    InviteNotice {
        trip_id: String,
        participant_id: String,
    },
}

/// Mailer stub recording what would have been sent.
#[derive(Default)]
pub struct RecordingMailer {
    events: Mutex<Vec<MailEvent>>,
}

impl RecordingMailer {
    pub fn events(&self) -> Vec<MailEvent> {
        self.events.lock().expect("mail events lock").clone()
    }

    fn record(&self, event: MailEvent) {
        self.events.lock().expect("mail events lock").push(event);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_confirm_trip_email_to_trip_owner(&self, trip_id: &str) -> Result<(), MailError> {
        self.record(MailEvent::OwnerConfirmRequest {
            trip_id: trip_id.to_string(),
        });
        Ok(())
    }

    async fn send_trip_confirmed_emails(&self, trip_id: &str) -> Result<(), MailError> {
        self.record(MailEvent::TripConfirmedBroadcast {
            trip_id: trip_id.to_string(),
        });
        Ok(())
    }

    async fn send_trip_confirmed_email(
        &self,
        trip_id: &str,
        participant_id: &str,
    ) -> Result<(), MailError> {
        self.record(MailEvent::InviteNotice {
            trip_id: trip_id.to_string(),
            participant_id: participant_id.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _root: TempDir,
}

impl fmt::Debug for TestApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestApp").finish()
    }
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new()?;
        let db_path = root.path().join("journey.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            smtp_host: "localhost".into(),
            smtp_port: 1025,
            mail_from: "mailpit@journey.com".into(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let store = TripStore::new(db);
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, store, mailer.clone());
        let app = create_router(state.clone());

        Ok(Self {
            app,
            state,
            mailer,
            _root: root,
        })
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (u16, serde_json::Value) {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request must build");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router must respond");
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json response body")
        };
        (status, json)
    }

    /// Polls for detached notification tasks to land; returns false when
    /// the predicate never held within the window.
    pub async fn wait_for_mail<F>(&self, pred: F) -> bool
    where
        F: Fn(&[MailEvent]) -> bool,
    {
        for _ in 0..200 {
            if pred(&self.mailer.events()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}
