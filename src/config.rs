use std::{env, net::SocketAddr};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub mail_from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://journey.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "1025".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SMTP_PORT: {err}")))?;

        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "mailpit@journey.com".to_string());

        Ok(Self {
            database_url,
            listen_addr,
            smtp_host,
            smtp_port,
            mail_from,
        })
    }
}
