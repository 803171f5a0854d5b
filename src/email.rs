use async_trait::async_trait;
use tracing::info;

/// Outbound mail collaborator. Delivery transport lives outside this service;
/// callers treat every send as best-effort and log failures instead of
/// propagating them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(
        &self,
        email: &str,
        token: &str,
        name: &str,
    ) -> anyhow::Result<()>;
    async fn send_welcome_email(&self, email: &str, name: &str) -> anyhow::Result<()>;
}

/// Default wiring: renders the links a real transport would send and logs the
/// dispatch. The verification URL matches the frontend route.
#[derive(Clone)]
pub struct LogMailer {
    client_url: String,
}

impl LogMailer {
    pub fn new(client_url: &str) -> Self {
        Self {
            client_url: client_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_email(
        &self,
        email: &str,
        token: &str,
        name: &str,
    ) -> anyhow::Result<()> {
        let url = format!("{}/verify-email?token={}", self.client_url, token);
        info!(%email, %name, %url, "verification email dispatched");
        Ok(())
    }

    async fn send_welcome_email(&self, email: &str, name: &str) -> anyhow::Result<()> {
        info!(%email, %name, "welcome email dispatched");
        Ok(())
    }
}

/// Test double that records every send so tests can assert on dispatches.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<SentMail>>,
    pub fail: std::sync::atomic::AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMail {
    Verification {
        email: String,
        token: String,
        name: String,
    },
    Welcome {
        email: String,
        name: String,
    },
}

impl RecordingMailer {
    fn record(&self, mail: SentMail) -> anyhow::Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_email(
        &self,
        email: &str,
        token: &str,
        name: &str,
    ) -> anyhow::Result<()> {
        self.record(SentMail::Verification {
            email: email.into(),
            token: token.into(),
            name: name.into(),
        })
    }

    async fn send_welcome_email(&self, email: &str, name: &str) -> anyhow::Result<()> {
        self.record(SentMail::Welcome {
            email: email.into(),
            name: name.into(),
        })
    }
}
