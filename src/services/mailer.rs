use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::{
    config::AppConfig,
    error::AppError,
    services::store::{StoreError, TripStore},
};

const CONFIRM_SUBJECT: &str = "Confirme sua viagem";
const CONFIRM_BODY: &str = "Você deve confirmar sua viagem";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to load mail data: {0}")]
    Store(#[from] StoreError),
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("failed to send message: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Transactional notifications around trip confirmation. No dedup and no
/// retry; callers run these as detached tasks and log the outcome.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Asks the trip owner to confirm a freshly created trip.
    async fn send_confirm_trip_email_to_trip_owner(&self, trip_id: &str) -> Result<(), MailError>;

    /// One email per participant of the trip; stops at the first transport
    /// error.
    async fn send_trip_confirmed_emails(&self, trip_id: &str) -> Result<(), MailError>;

    /// Confirmation request for a single, freshly invited participant.
    async fn send_trip_confirmed_email(
        &self,
        trip_id: &str,
        participant_id: &str,
    ) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    store: TripStore,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(store: TripStore, config: &AppConfig) -> Result<Self, AppError> {
        let sender: Mailbox = config
            .mail_from
            .parse()
            .map_err(|err| AppError::Config(format!("invalid MAIL_FROM: {err}")))?;

        // Plain SMTP; the relay is a local Mailpit-style catcher.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .build();

        Ok(Self {
            store,
            transport,
            sender,
        })
    }

    async fn send(&self, to: &str, body: String) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to.parse()?)
            .subject(CONFIRM_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirm_trip_email_to_trip_owner(&self, trip_id: &str) -> Result<(), MailError> {
        let trip = self.store.get_trip(trip_id).await?;
        let body = format!(
            "Olá, {}!\n\n\
             A sua viagem para {} que começa no dia {} precisa ser confirmada.\n\
             Clique no botão abaixo para confirmar.\n",
            trip.owner_name,
            trip.destination,
            trip.starts_at.format("%Y-%m-%d"),
        );
        self.send(&trip.owner_email, body).await
    }

    async fn send_trip_confirmed_emails(&self, trip_id: &str) -> Result<(), MailError> {
        let participants = self.store.get_participants(trip_id).await?;
        for participant in participants {
            self.send(&participant.email, CONFIRM_BODY.to_string())
                .await?;
        }
        Ok(())
    }

    async fn send_trip_confirmed_email(
        &self,
        _trip_id: &str,
        participant_id: &str,
    ) -> Result<(), MailError> {
        let participant = self.store.get_participant(participant_id).await?;
        self.send(&participant.email, CONFIRM_BODY.to_string()).await
    }
}
