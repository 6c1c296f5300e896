//! Mapping between repository identifiers and session names.
//!
//! A repository is identified by its path relative to the registry root
//! (`github.com/acme/widgets`). Its session is named by joining the same
//! segments with `.` behind the reserved prefix (`zz:github.com.acme.widgets`).
//! Encoding is authoritative: host names contain `.`, so splitting a session
//! name back into segments is only a hint and lookups verify by re-encoding.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Reserved prefix carried by every session this tool manages.
pub const SESSION_PREFIX: &str = "zz:";

const SEGMENT_SEPARATOR: char = '.';

/// Repository identifier: ordered, non-empty path segments relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId(Vec<String>);

impl RepoId {
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::InvalidRepository("empty identifier".to_string()));
        }
        for seg in &segments {
            if seg.is_empty() || seg == "." || seg == ".." || seg.contains(':') || seg.contains('/')
            {
                return Err(Error::InvalidRepository(segments.join("/")));
            }
        }
        Ok(Self(segments))
    }

    /// Parse the slash-separated form (`host/org/repo`).
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_segments(s.trim_matches('/').split('/'))
    }

    /// Build from a path relative to the registry root.
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(seg) => segments.push(seg.to_string_lossy().into_owned()),
                _ => {
                    return Err(Error::InvalidRepository(path.display().to_string()));
                }
            }
        }
        Self::from_segments(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn to_path(&self) -> PathBuf {
        self.0.iter().collect()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Multiplexer session name owned by this tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Encode a repository as its session name. Never fails.
    pub fn from_repo(repo: &RepoId) -> Self {
        let joined = repo.segments().join(&SEGMENT_SEPARATOR.to_string());
        Self(format!("{SESSION_PREFIX}{joined}"))
    }

    /// Wrap a raw session name, rejecting names without the reserved prefix.
    pub fn parse(name: &str) -> Result<Self> {
        if Self::is_managed(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::InvalidSessionId(name.to_string()))
        }
    }

    pub fn is_managed(name: &str) -> bool {
        name.starts_with(SESSION_PREFIX)
    }

    /// Naive decode: strip the prefix and split on `.`.
    ///
    /// Only exact for repositories whose segments contain no `.`; use
    /// [`lookup_repository`] when the original identifier must be recovered.
    pub fn segments(&self) -> Result<Vec<String>> {
        let rest = self
            .0
            .strip_prefix(SESSION_PREFIX)
            .ok_or_else(|| Error::InvalidSessionId(self.0.clone()))?;
        Ok(rest.split(SEGMENT_SEPARATOR).map(str::to_string).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the repository whose encoded session name equals `session`.
///
/// Linear scan over `known`; the first match wins.
pub fn lookup_repository<I>(session: &SessionId, known: I) -> Result<RepoId>
where
    I: IntoIterator<Item = RepoId>,
{
    known
        .into_iter()
        .find(|repo| SessionId::from_repo(repo) == *session)
        .ok_or_else(|| Error::NotFound(format!("no repository for session {session}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(s: &str) -> RepoId {
        RepoId::parse(s).unwrap()
    }

    #[test]
    fn test_encode() {
        let id = SessionId::from_repo(&repo("github.com/acme/widgets"));
        assert_eq!(id.as_str(), "zz:github.com.acme.widgets");
    }

    #[test]
    fn test_decode_without_dots_is_inverse() {
        for s in ["a/b", "host/org/repo", "gitlab/group/sub/project", "single"] {
            let r = repo(s);
            let decoded = SessionId::from_repo(&r).segments().unwrap();
            assert_eq!(decoded, r.segments());
        }
    }

    #[test]
    fn test_decode_requires_prefix() {
        let err = SessionId("other.session".to_string()).segments().unwrap_err();
        assert!(matches!(err, Error::InvalidSessionId(_)));
        assert!(SessionId::parse("main").is_err());
        assert!(SessionId::parse("zz:a.b").is_ok());
    }

    #[test]
    fn test_lookup_recovers_dotted_host() {
        let known = vec![repo("gitlab.com/x/y"), repo("github.com/acme/widgets")];
        let id = SessionId::from_repo(&repo("github.com/acme/widgets"));

        // The naive split cannot tell where the host ends.
        assert_eq!(id.segments().unwrap().len(), 4);
        assert_eq!(
            lookup_repository(&id, known).unwrap(),
            repo("github.com/acme/widgets")
        );
    }

    #[test]
    fn test_lookup_not_found() {
        let id = SessionId::parse("zz:nowhere.repo").unwrap();
        let err = lookup_repository(&id, vec![repo("a/b")]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_repo_id_validation() {
        assert!(RepoId::parse("").is_err());
        assert!(RepoId::parse("a//b").is_err());
        assert!(RepoId::parse("a/../b").is_err());
        assert!(RepoId::parse("a/zz:b").is_err());
        assert!(RepoId::from_relative_path(Path::new("/abs/path")).is_err());
        assert_eq!(
            RepoId::from_relative_path(Path::new("github.com/acme/widgets")).unwrap(),
            repo("github.com/acme/widgets")
        );
    }

    #[test]
    fn test_display_and_path() {
        let r = repo("github.com/acme/widgets");
        assert_eq!(r.to_string(), "github.com/acme/widgets");
        assert_eq!(r.to_path(), PathBuf::from("github.com/acme/widgets"));
    }
}
