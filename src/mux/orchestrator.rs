use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{SessionHost, SessionInfo};
use crate::codec::SessionId;
use crate::error::{Error, Result};

/// Reconciles managed sessions against the host.
///
/// Lifecycle per session: absent -> active -> exited -> active -> (killed)
/// absent. `current_session` is the ambient "running inside a multiplexer"
/// signal captured at startup.
pub struct SessionOrchestrator {
    host: Arc<dyn SessionHost>,
    current_session: Option<String>,
}

impl SessionOrchestrator {
    pub fn new(host: Arc<dyn SessionHost>, current_session: Option<String>) -> Self {
        Self {
            host,
            current_session,
        }
    }

    pub fn inside_session(&self) -> bool {
        self.current_session.is_some()
    }

    /// Nested multiplexers corrupt the terminal; switching sessions from
    /// inside one is refused.
    pub fn ensure_outside_session(&self) -> Result<()> {
        match &self.current_session {
            Some(current) => Err(Error::AlreadyInSession(current.clone())),
            None => Ok(()),
        }
    }

    /// Attach to `session` or create it rooted at `working_dir`.
    ///
    /// An existing session, active or exited, is attached with `working_dir`
    /// as the default directory for new tabs. Refuses to run inside a
    /// session, before touching the host.
    pub async fn open(&self, session: &SessionId, working_dir: &Path) -> Result<()> {
        self.ensure_outside_session()?;

        let exists = self
            .host
            .list_sessions()
            .await?
            .iter()
            .any(|s| s.name == session.as_str());

        if exists {
            info!(session = %session, dir = %working_dir.display(), "attaching");
            self.host.attach_session(session.as_str(), working_dir).await
        } else {
            info!(session = %session, dir = %working_dir.display(), "creating session");
            self.host
                .create_session(session.as_str(), working_dir)
                .await
                .map_err(|e| match e {
                    e @ Error::SessionCreationFailed { .. } => e,
                    other => Error::SessionCreationFailed {
                        name: session.to_string(),
                        reason: other.to_string(),
                    },
                })
        }
    }

    /// Open a tab in the current session. Outside a session the caller
    /// should fall back to a plain shell in `working_dir`.
    pub async fn open_new_tab(&self, working_dir: &Path, tab_name: &str) -> Result<()> {
        if !self.inside_session() {
            return Err(Error::NotInsideSession);
        }
        self.host.new_tab(working_dir, tab_name).await
    }

    /// Sessions carrying the reserved prefix, in host order.
    pub async fn list_managed(&self) -> Result<Vec<SessionInfo>> {
        Ok(self
            .host
            .list_sessions()
            .await?
            .into_iter()
            .filter(|s| SessionId::is_managed(&s.name))
            .collect())
    }

    /// Terminate `session` immediately.
    pub async fn kill(&self, session: &SessionId) -> Result<()> {
        let known = self
            .list_managed()
            .await?
            .iter()
            .any(|s| s.name == session.as_str());
        if !known {
            return Err(Error::SessionNotFound(session.to_string()));
        }
        self.host.kill_session(session.as_str()).await?;
        info!(session = %session, "session killed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::SessionStatus;
    use crate::testing::{FakeHost, HostCall};
    use std::path::PathBuf;

    fn sid(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_when_absent() {
        let host = Arc::new(FakeHost::default());
        let orch = SessionOrchestrator::new(host.clone(), None);

        orch.open(&sid("zz:a.b"), Path::new("/wt/a/b/main")).await.unwrap();

        assert_eq!(
            host.calls(),
            vec![
                HostCall::List,
                HostCall::Create("zz:a.b".to_string(), PathBuf::from("/wt/a/b/main")),
            ]
        );
    }

    #[tokio::test]
    async fn test_open_attaches_exited_session_with_new_cwd() {
        let host = Arc::new(FakeHost::with_sessions(&[("zz:a.b", SessionStatus::Exited)]));
        let orch = SessionOrchestrator::new(host.clone(), None);

        orch.open(&sid("zz:a.b"), Path::new("/wt/a/b/dev")).await.unwrap();

        assert_eq!(
            host.calls().last(),
            Some(&HostCall::Attach("zz:a.b".to_string(), PathBuf::from("/wt/a/b/dev")))
        );
    }

    #[tokio::test]
    async fn test_open_inside_session_makes_no_host_calls() {
        let host = Arc::new(FakeHost::with_sessions(&[("zz:a.b", SessionStatus::Active)]));
        let orch = SessionOrchestrator::new(host.clone(), Some("zz:a.b".to_string()));

        for target in ["zz:a.b", "zz:a.c"] {
            let err = orch.open(&sid(target), Path::new("/wt")).await.unwrap_err();
            assert!(matches!(err, Error::AlreadyInSession(_)));
        }
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_session_creation_failed() {
        let host = Arc::new(FakeHost::default());
        host.fail_create("no terminal");
        let orch = SessionOrchestrator::new(host, None);

        let err = orch.open(&sid("zz:a.b"), Path::new("/wt")).await.unwrap_err();
        assert!(matches!(err, Error::SessionCreationFailed { .. }));
    }

    #[tokio::test]
    async fn test_new_tab_requires_session() {
        let host = Arc::new(FakeHost::default());
        let outside = SessionOrchestrator::new(host.clone(), None);
        assert!(matches!(
            outside.open_new_tab(Path::new("/wt"), "dev").await,
            Err(Error::NotInsideSession)
        ));

        let inside = SessionOrchestrator::new(host.clone(), Some("zz:a.b".to_string()));
        inside.open_new_tab(Path::new("/wt"), "dev").await.unwrap();
        assert_eq!(
            host.calls(),
            vec![HostCall::NewTab(PathBuf::from("/wt"), "dev".to_string())]
        );
    }

    #[tokio::test]
    async fn test_list_managed_filters_prefix() {
        let host = Arc::new(FakeHost::with_sessions(&[
            ("scratch", SessionStatus::Active),
            ("zz:a.b", SessionStatus::Active),
            ("zz:a.c", SessionStatus::Exited),
        ]));
        let orch = SessionOrchestrator::new(host, None);

        let names: Vec<_> = orch
            .list_managed()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["zz:a.b", "zz:a.c"]);
    }

    #[tokio::test]
    async fn test_kill_unknown_session() {
        let host = Arc::new(FakeHost::with_sessions(&[("zz:a.b", SessionStatus::Active)]));
        let orch = SessionOrchestrator::new(host.clone(), None);

        assert!(matches!(
            orch.kill(&sid("zz:x.y")).await,
            Err(Error::SessionNotFound(_))
        ));
        orch.kill(&sid("zz:a.b")).await.unwrap();
        assert!(host.calls().contains(&HostCall::Kill("zz:a.b".to_string())));
        assert!(orch.list_managed().await.unwrap().is_empty());
    }
}
