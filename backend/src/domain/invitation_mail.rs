//! Background delivery of invitation mail with a compensating delete.
//!
//! Registration hands an [`InvitationMailJob`] to the [`MailDispatcher`],
//! which runs it on its own task. Delivery is retried a fixed number of times
//! with a fixed backoff. When every attempt fails the freshly created user is
//! deleted so the email address can register again. The outcome is observable
//! through the returned [`MailJobHandle`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::TraceId;
use super::UserId;
use super::ports::{InvitationMail, Mailer, UserRepository};

/// Delivery attempts before compensating.
pub const MAX_ATTEMPTS: u32 = 3;
/// Pause between delivery attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Async sleeping abstraction so tests can skip real delays.
#[async_trait]
pub trait MailSleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl MailSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry budget for a mail job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailRetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for MailRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }
}

/// Mail to send for a newly registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationMailJob {
    pub user_id: UserId,
    pub mail: InvitationMail,
}

/// Terminal state of a mail job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailOutcome {
    /// The provider accepted the mail.
    Delivered { attempts: u32 },
    /// Delivery failed and the user was removed.
    Compensated { attempts: u32 },
    /// Delivery failed and removing the user failed too.
    CompensationFailed { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mail job aborted: {message}")]
pub struct MailJobAborted {
    pub message: String,
}

/// Handle to a running mail job.
#[derive(Debug)]
pub struct MailJobHandle(JoinHandle<MailOutcome>);

impl MailJobHandle {
    /// Wait for the job to finish.
    pub async fn outcome(self) -> Result<MailOutcome, MailJobAborted> {
        self.0.await.map_err(|err| MailJobAborted {
            message: err.to_string(),
        })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Runs invitation mail jobs on background tasks.
#[derive(Clone)]
pub struct MailDispatcher {
    mailer: Arc<dyn Mailer>,
    users: Arc<dyn UserRepository>,
    sleeper: Arc<dyn MailSleeper>,
    policy: MailRetryPolicy,
}

impl MailDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            mailer,
            users,
            sleeper: Arc::new(TokioSleeper),
            policy: MailRetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn MailSleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MailRetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start `job` on a new task carrying the current trace identifier.
    pub fn dispatch(&self, job: InvitationMailJob) -> MailJobHandle {
        let dispatcher = self.clone();
        MailJobHandle(tokio::spawn(TraceId::propagate(async move {
            dispatcher.run(job).await
        })))
    }

    /// Execute `job` to completion on the current task.
    pub async fn run(&self, job: InvitationMailJob) -> MailOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.mailer.send_invitation(&job.mail).await {
                Ok(()) => {
                    info!(user_id = %job.user_id, attempt, "invitation mail delivered");
                    return MailOutcome::Delivered { attempts: attempt };
                }
                Err(err) => {
                    warn!(
                        user_id = %job.user_id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "invitation mail attempt failed"
                    );
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        match self.users.delete(job.user_id).await {
            Ok(()) => {
                warn!(user_id = %job.user_id, "removed user after undeliverable invitation");
                MailOutcome::Compensated {
                    attempts: max_attempts,
                }
            }
            Err(err) => {
                error!(
                    user_id = %job.user_id,
                    error = %err,
                    "failed to remove user after undeliverable invitation"
                );
                MailOutcome::CompensationFailed {
                    attempts: max_attempts,
                }
            }
        }
    }
}
