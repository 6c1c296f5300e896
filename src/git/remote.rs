use url::Url;

use crate::codec::RepoId;
use crate::error::{Error, Result};

/// Derive the registry identifier from a remote URL.
///
/// `https://github.com/acme/widgets.git`, `ssh://git@github.com:22/acme/widgets`
/// and `git@github.com:acme/widgets.git` all map to `github.com/acme/widgets`.
pub fn repo_id_from_url(raw: &str) -> Result<RepoId> {
    let raw = raw.trim();
    let (host, path) = if raw.contains("://") {
        let url = Url::parse(raw).map_err(|e| Error::InvalidRepository(format!("{raw}: {e}")))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidRepository(format!("{raw}: missing host")))?
            .to_string();
        (host, url.path().to_string())
    } else if let Some((authority, path)) = scp_like(raw) {
        let host = authority.rsplit('@').next().unwrap_or(authority).to_string();
        (host, path.to_string())
    } else {
        let (host, path) = raw.split_once('/').unwrap_or((raw, ""));
        (host.to_string(), path.to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments = std::iter::once(host.as_str())
        .chain(path.split('/').filter(|s| !s.is_empty()))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if segments.len() < 2 {
        return Err(Error::InvalidRepository(raw.to_string()));
    }
    RepoId::from_segments(segments)
}

/// `user@host:path`, where the colon comes before any slash.
fn scp_like(raw: &str) -> Option<(&str, &str)> {
    let (authority, path) = raw.split_once(':')?;
    if authority.contains('/') || authority.is_empty() {
        return None;
    }
    Some((authority, path))
}
