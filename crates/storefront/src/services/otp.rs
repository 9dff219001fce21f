//! Pending OTP logins.
//!
//! The entry boxes send keystrokes concurrently, and the session record is
//! loaded at the start of a request and saved whole at the end, so two
//! overlapping keystrokes would each overwrite the other's slot. The flow
//! therefore lives here behind a per-flow mutex, and the session only holds
//! its id.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::Session;
use uuid::Uuid;

use shopeasy_core::otp::OtpFlow;

use crate::models::session_keys;

/// Upper bound on logins pending at once.
const FLOW_CAPACITY: u64 = 10_000;

/// A flow nobody touched for this long is dropped.
const FLOW_IDLE: Duration = Duration::from_secs(30 * 60);

/// Shared handle to one pending login.
pub type FlowHandle = Arc<Mutex<OtpFlow>>;

/// Registry of pending logins keyed by the id stored in the session.
#[derive(Clone)]
pub struct OtpFlows {
    flows: Cache<Uuid, FlowHandle>,
}

impl Default for OtpFlows {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpFlows {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flows: Cache::builder()
                .max_capacity(FLOW_CAPACITY)
                .time_to_idle(FLOW_IDLE)
                .build(),
        }
    }

    /// Register `flow` for this session, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn start(
        &self,
        session: &Session,
        flow: OtpFlow,
    ) -> Result<FlowHandle, tower_sessions::session::Error> {
        self.finish(session).await?;

        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(flow));
        self.flows.insert(id, Arc::clone(&handle)).await;
        session.insert(session_keys::OTP_FLOW, id).await?;
        Ok(handle)
    }

    /// The flow this session started, if it is still pending.
    ///
    /// Only reads the session, so concurrent keystrokes never race on the
    /// session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn current(
        &self,
        session: &Session,
    ) -> Result<Option<FlowHandle>, tower_sessions::session::Error> {
        let Some(id) = session.get::<Uuid>(session_keys::OTP_FLOW).await? else {
            return Ok(None);
        };
        Ok(self.flows.get(&id).await)
    }

    /// Forget this session's flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn finish(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        if let Some(id) = session.remove::<Uuid>(session_keys::OTP_FLOW).await? {
            self.flows.invalidate(&id).await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use shopeasy_core::Email;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn flow() -> OtpFlow {
        OtpFlow::start(Email::parse("buyer@example.com").unwrap(), Utc::now())
    }

    #[tokio::test]
    async fn test_current_follows_the_session() {
        let flows = OtpFlows::new();
        let session = session();
        assert!(flows.current(&session).await.unwrap().is_none());

        flows.start(&session, flow()).await.unwrap();
        let handle = flows.current(&session).await.unwrap().unwrap();
        assert_eq!(handle.lock().await.email().as_str(), "buyer@example.com");

        flows.finish(&session).await.unwrap();
        assert!(flows.current(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_flow() {
        let flows = OtpFlows::new();
        let session = session();

        let first = flows.start(&session, flow()).await.unwrap();
        first.lock().await.input_mut().paste("12");
        flows.start(&session, flow()).await.unwrap();

        let current = flows.current(&session).await.unwrap().unwrap();
        assert_eq!(current.lock().await.input().value(), "");
    }

    #[tokio::test]
    async fn test_concurrent_edits_all_land() {
        let flows = OtpFlows::new();
        let session = session();
        flows.start(&session, flow()).await.unwrap();

        let mut tasks = Vec::new();
        for index in 0..6 {
            let handle = flows.current(&session).await.unwrap().unwrap();
            tasks.push(tokio::spawn(async move {
                let mut flow = handle.lock().await;
                tokio::task::yield_now().await;
                flow.input_mut().edit(index, &(index + 1).to_string());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let handle = flows.current(&session).await.unwrap().unwrap();
        assert_eq!(handle.lock().await.input().value(), "123456");
    }
}
