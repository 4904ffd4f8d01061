//! Local cache and remote repository access
//!
//! [`RepositoryResolver::locate`] maps an artifact and file extension onto the
//! Maven repository layout, answers from the local cache when the file is
//! there, and otherwise probes the remote repositories in order. The first
//! repository that answers is remembered on the artifact.

use crate::artifact::{Artifact, POM_PACKAGING};
use crate::{ResolveError, Result};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use url::Url;

/// Remote repositories searched when none are configured
pub const DEFAULT_REMOTES: [&str; 2] = ["https://repo.maven.apache.org/maven2/", "https://jitpack.io/"];

/// Per-request timeout for remote repositories
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// Byte transport to remote repositories
///
/// Only a `200` answer counts as found; any other status is "not here".
/// Connection failures and timeouts are errors.
pub trait Transport {
    /// Existence check without transferring the body
    fn exists(&self, url: &Url) -> Result<bool>;

    /// Full transfer, `None` when the repository does not have the file
    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>>;
}

/// [`Transport`] over a blocking HTTP client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("mvnx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| transport_error("http client", e))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn exists(&self, url: &Url) -> Result<bool> {
        let response = self
            .client
            .head(url.as_str())
            .send()
            .map_err(|e| transport_error(url.as_str(), e))?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| transport_error(url.as_str(), e))?;
        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }
        let body = response
            .bytes()
            .map_err(|e| transport_error(url.as_str(), e))?;
        Ok(Some(body.to_vec()))
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> ResolveError {
    ResolveError::Transport {
        url: url.to_string(),
        source: Box::new(error),
    }
}

/// Shared cancellation signal, checked before every network call
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        Ok(())
    }
}

/// How a remote hit is turned into a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Existence check only; yields the remote URL
    Probe,
    /// Transfer the body and keep it in memory
    #[default]
    InMemory,
    /// Transfer the body into the local cache; yields the local path
    Materialize,
}

/// Where an artifact file was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Local(PathBuf),
    Remote(Url),
    Fetched { url: Url, bytes: Vec<u8> },
}

impl Located {
    pub fn is_local(&self) -> bool {
        matches!(self, Located::Local(_))
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Located::Local(path) => Some(path),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            Located::Local(_) => None,
            Located::Remote(url) | Located::Fetched { url, .. } => Some(url),
        }
    }
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Located::Local(path) => write!(f, "{}", path.display()),
            Located::Remote(url) | Located::Fetched { url, .. } => write!(f, "{}", url),
        }
    }
}

/// File extension for an artifact of the given packaging
///
/// Follows Maven's default artifact handlers: packagings that produce a jar
/// map to `jar`, everything else is its own extension.
pub fn artifact_extension(packaging: &str) -> &str {
    match packaging {
        "jar" | "bundle" | "maven-plugin" | "ejb" | "ejb-client" | "test-jar" | "java-source"
        | "javadoc" => "jar",
        other => other,
    }
}

/// Relative path of an artifact file in the Maven repository layout
///
/// `group/with/slashes/artifactId/version/artifactId-version[-classifier].ext`;
/// the classifier never applies to `pom` files.
pub fn repository_path(artifact: &Artifact, extension: &str) -> Result<String> {
    let missing = |field: &str| ResolveError::InvalidCoordinate {
        input: artifact.to_string(),
        reason: format!("missing {}", field),
    };
    let group_id = artifact.group_id.as_deref().ok_or_else(|| missing("groupId"))?;
    let artifact_id = artifact
        .artifact_id
        .as_deref()
        .ok_or_else(|| missing("artifactId"))?;
    let version = artifact
        .version
        .as_deref()
        .ok_or_else(|| ResolveError::UnresolvedVersion {
            coordinate: artifact.to_string(),
        })?;

    let classifier = match artifact.classifier.as_deref() {
        Some(classifier) if extension != POM_PACKAGING => format!("-{}", classifier),
        _ => String::new(),
    };

    Ok(format!(
        "{}/{}/{}/{}-{}{}.{}",
        group_id.replace('.', "/"),
        artifact_id,
        version,
        artifact_id,
        version,
        classifier,
        extension
    ))
}

/// Parse repository base URLs, normalizing each to end with `/`
pub fn parse_remotes<I, S>(urls: I) -> Result<Vec<Url>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|raw| {
            let raw = raw.as_ref().trim();
            let normalized = if raw.ends_with('/') {
                raw.to_string()
            } else {
                format!("{}/", raw)
            };
            let url = Url::parse(&normalized).map_err(|e| ResolveError::InvalidRepository {
                url: raw.to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ResolveError::InvalidRepository {
                    url: raw.to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Ok(url)
        })
        .collect()
}

/// Locates artifact files in the local cache and remote repositories
pub struct RepositoryResolver {
    local_root: PathBuf,
    remotes: Vec<Url>,
    transport: Box<dyn Transport + Send + Sync>,
    cancellation: CancellationFlag,
}

impl fmt::Debug for RepositoryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryResolver")
            .field("local_root", &self.local_root)
            .field("remotes", &self.remotes)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl RepositoryResolver {
    pub fn new(
        local_root: impl Into<PathBuf>,
        remotes: Vec<Url>,
        transport: impl Transport + Send + Sync + 'static,
    ) -> Self {
        Self {
            local_root: local_root.into(),
            remotes,
            transport: Box::new(transport),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Default remotes over HTTP with the default timeout
    pub fn with_defaults(local_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(
            local_root,
            parse_remotes(DEFAULT_REMOTES)?,
            HttpTransport::new(DEFAULT_TIMEOUT)?,
        ))
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn remotes(&self) -> &[Url] {
        &self.remotes
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Find the `extension` file of `artifact`
    ///
    /// On a remote hit the repository base URL is stored in
    /// `artifact.remote` and tried first next time.
    pub fn locate(&self, artifact: &mut Artifact, extension: &str, mode: FetchMode) -> Result<Located> {
        let path = repository_path(artifact, extension)?;
        let local = self.local_root.join(&path);
        if local.is_file() {
            trace!(path = %local.display(), "found in local repository");
            return Ok(Located::Local(local));
        }

        let mut candidates: Vec<Url> = Vec::with_capacity(self.remotes.len() + 1);
        if let Some(remembered) = artifact.remote.as_deref().and_then(|r| Url::parse(r).ok()) {
            candidates.push(remembered);
        }
        for remote in &self.remotes {
            if !candidates.contains(remote) {
                candidates.push(remote.clone());
            }
        }

        for base in &candidates {
            let url = base.join(&path).map_err(|e| ResolveError::InvalidRepository {
                url: base.to_string(),
                reason: e.to_string(),
            })?;
            self.cancellation.check()?;

            let located = match mode {
                FetchMode::Probe => self
                    .transport
                    .exists(&url)?
                    .then(|| Located::Remote(url.clone())),
                FetchMode::InMemory => self
                    .transport
                    .fetch(&url)?
                    .map(|bytes| Located::Fetched {
                        url: url.clone(),
                        bytes,
                    }),
                FetchMode::Materialize => match self.transport.fetch(&url)? {
                    Some(bytes) => {
                        persist(&local, &bytes)?;
                        Some(Located::Local(local.clone()))
                    }
                    None => None,
                },
            };

            match located {
                Some(located) => {
                    debug!(%url, ?mode, "found in remote repository");
                    artifact.remote = Some(base.to_string());
                    return Ok(located);
                }
                None => trace!(%url, "not found"),
            }
        }

        Err(ResolveError::DownloadFailed {
            coordinate: artifact.to_string(),
            path,
            repositories: candidates.iter().map(Url::to_string).collect(),
        })
    }

    /// Bytes behind a located reference
    pub fn read(&self, located: Located) -> Result<Vec<u8>> {
        match located {
            Located::Local(path) => fs::read(&path).map_err(|source| ResolveError::Io { path, source }),
            Located::Fetched { bytes, .. } => Ok(bytes),
            Located::Remote(url) => {
                self.cancellation.check()?;
                self.transport
                    .fetch(&url)?
                    .ok_or_else(|| ResolveError::DownloadFailed {
                        coordinate: url
                            .path_segments()
                            .and_then(|mut segments| segments.next_back())
                            .unwrap_or_default()
                            .to_string(),
                        path: url.path().to_string(),
                        repositories: vec![url.to_string()],
                    })
            }
        }
    }
}

fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_error)?;
    // Write a uniquely named sibling and rename so readers never see a partial file.
    let mut partial = NamedTempFile::new_in(parent).map_err(io_error)?;
    partial.write_all(bytes).map_err(io_error)?;
    partial
        .persist(path)
        .map(|_| ())
        .map_err(|e| io_error(e.error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory transport recording every request
    #[derive(Default)]
    struct FakeTransport {
        files: HashMap<String, Vec<u8>>,
        requests: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl FakeTransport {
        fn with_file(mut self, url: &str, body: &str) -> Self {
            self.files.insert(url.to_string(), body.as_bytes().to_vec());
            self
        }

        fn record(&self, method: &str, url: &Url) -> Result<()> {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{} {}", method, url));
            if self.fail {
                return Err(ResolveError::Transport {
                    url: url.to_string(),
                    source: "connection refused".into(),
                });
            }
            Ok(())
        }
    }

    impl Transport for FakeTransport {
        fn exists(&self, url: &Url) -> Result<bool> {
            self.record("HEAD", url)?;
            Ok(self.files.contains_key(url.as_str()))
        }

        fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
            self.record("GET", url)?;
            Ok(self.files.get(url.as_str()).cloned())
        }
    }

    const FIRST: &str = "https://first.example/repo/";
    const SECOND: &str = "https://second.example/";

    fn resolver(dir: &TempDir, transport: FakeTransport) -> (RepositoryResolver, Arc<Mutex<Vec<String>>>) {
        let requests = transport.requests.clone();
        let resolver = RepositoryResolver::new(
            dir.path(),
            parse_remotes([FIRST, SECOND]).unwrap(),
            transport,
        );
        (resolver, requests)
    }

    #[test]
    fn test_repository_path_layout() {
        let artifact = Artifact::new("org.slf4j", "slf4j-api", "1.7.30");
        assert_eq!(
            repository_path(&artifact, "pom").unwrap(),
            "org/slf4j/slf4j-api/1.7.30/slf4j-api-1.7.30.pom"
        );
        let sources = artifact.with_classifier("sources");
        assert_eq!(
            repository_path(&sources, "jar").unwrap(),
            "org/slf4j/slf4j-api/1.7.30/slf4j-api-1.7.30-sources.jar"
        );
        assert_eq!(
            repository_path(&sources, "pom").unwrap(),
            "org/slf4j/slf4j-api/1.7.30/slf4j-api-1.7.30.pom"
        );
    }

    #[test]
    fn test_repository_path_requires_version() {
        let mut artifact = Artifact::new("g", "a", "1");
        artifact.version = None;
        assert!(matches!(
            repository_path(&artifact, "pom"),
            Err(ResolveError::UnresolvedVersion { .. })
        ));
    }

    #[test]
    fn test_artifact_extension() {
        assert_eq!(artifact_extension("jar"), "jar");
        assert_eq!(artifact_extension("bundle"), "jar");
        assert_eq!(artifact_extension("pom"), "pom");
        assert_eq!(artifact_extension("war"), "war");
    }

    #[test]
    fn test_parse_remotes_adds_trailing_slash() {
        let remotes = parse_remotes(["https://jitpack.io", "http://localhost:8081/maven2/"]).unwrap();
        assert_eq!(remotes[0].as_str(), "https://jitpack.io/");
        assert_eq!(remotes[1].as_str(), "http://localhost:8081/maven2/");
        assert!(parse_remotes(["ftp://example.com"]).is_err());
        assert!(parse_remotes(["not a url"]).is_err());
    }

    #[test]
    fn test_local_hit_skips_network() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("g/a/1/a-1.pom");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<project/>").unwrap();

        let (resolver, requests) = resolver(&dir, FakeTransport::default());
        let mut artifact = Artifact::new("g", "a", "1");
        let located = resolver.locate(&mut artifact, "pom", FetchMode::InMemory).unwrap();

        assert_eq!(located, Located::Local(path));
        assert!(requests.lock().unwrap().is_empty());
        assert!(artifact.remote.is_none());
    }

    #[test]
    fn test_remote_order_and_memory() {
        let dir = TempDir::new().unwrap();
        let transport =
            FakeTransport::default().with_file(&format!("{}g/a/1/a-1.pom", SECOND), "<project/>");
        let (resolver, requests) = resolver(&dir, transport);

        let mut artifact = Artifact::new("g", "a", "1");
        let located = resolver.locate(&mut artifact, "pom", FetchMode::InMemory).unwrap();
        assert!(matches!(located, Located::Fetched { .. }));
        assert_eq!(artifact.remote.as_deref(), Some(SECOND));
        assert_eq!(
            *requests.lock().unwrap(),
            vec![
                format!("GET {}g/a/1/a-1.pom", FIRST),
                format!("GET {}g/a/1/a-1.pom", SECOND),
            ]
        );

        // The remembered repository is tried first for the jar.
        requests.lock().unwrap().clear();
        let err = resolver.locate(&mut artifact, "jar", FetchMode::Probe).unwrap_err();
        assert!(matches!(err, ResolveError::DownloadFailed { .. }));
        assert_eq!(
            *requests.lock().unwrap(),
            vec![
                format!("HEAD {}g/a/1/a-1.jar", SECOND),
                format!("HEAD {}g/a/1/a-1.jar", FIRST),
            ]
        );
    }

    #[test]
    fn test_probe_returns_remote_url() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::default().with_file(&format!("{}g/a/1/a-1.jar", FIRST), "jar");
        let (resolver, requests) = resolver(&dir, transport);

        let mut artifact = Artifact::new("g", "a", "1");
        let located = resolver.locate(&mut artifact, "jar", FetchMode::Probe).unwrap();
        assert_eq!(
            located.url().map(Url::as_str),
            Some(format!("{}g/a/1/a-1.jar", FIRST).as_str())
        );
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert!(requests.lock().unwrap()[0].starts_with("HEAD"));

        assert_eq!(resolver.read(located).unwrap(), b"jar".to_vec());
    }

    #[test]
    fn test_materialize_persists_into_local_repository() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::default().with_file(&format!("{}g/a/1/a-1.jar", FIRST), "jar");
        let (resolver, requests) = resolver(&dir, transport);

        let mut artifact = Artifact::new("g", "a", "1");
        let located = resolver.locate(&mut artifact, "jar", FetchMode::Materialize).unwrap();
        let path = dir.path().join("g/a/1/a-1.jar");
        assert_eq!(located, Located::Local(path.clone()));
        assert_eq!(fs::read(&path).unwrap(), b"jar".to_vec());

        // Second lookup is served locally.
        requests.lock().unwrap().clear();
        resolver.locate(&mut artifact, "jar", FetchMode::Materialize).unwrap();
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_materialize_pom_and_jar_keep_their_own_bytes() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::default()
            .with_file(&format!("{}g/a/1/a-1.pom", FIRST), "<project/>")
            .with_file(&format!("{}g/a/1/a-1.jar", FIRST), "jar");
        let (resolver, _) = resolver(&dir, transport);

        let mut artifact = Artifact::new("g", "a", "1");
        resolver.locate(&mut artifact, "pom", FetchMode::Materialize).unwrap();
        resolver.locate(&mut artifact, "jar", FetchMode::Materialize).unwrap();

        let folder = dir.path().join("g/a/1");
        assert_eq!(fs::read(folder.join("a-1.pom")).unwrap(), b"<project/>".to_vec());
        assert_eq!(fs::read(folder.join("a-1.jar")).unwrap(), b"jar".to_vec());
        let mut names: Vec<String> = fs::read_dir(&folder)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a-1.jar", "a-1.pom"]);
    }

    #[test]
    fn test_download_failed_names_path() {
        let dir = TempDir::new().unwrap();
        let (resolver, _) = resolver(&dir, FakeTransport::default());
        let mut artifact = Artifact::new("g", "a", "1");
        let err = resolver.locate(&mut artifact, "pom", FetchMode::InMemory).unwrap_err();
        match err {
            ResolveError::DownloadFailed {
                coordinate,
                path,
                repositories,
            } => {
                assert_eq!(coordinate, "g:a:1");
                assert_eq!(path, "g/a/1/a-1.pom");
                assert_eq!(repositories, vec![FIRST.to_string(), SECOND.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transport_error_aborts_immediately() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport {
            fail: true,
            ..Default::default()
        };
        let (resolver, requests) = resolver(&dir, transport);
        let mut artifact = Artifact::new("g", "a", "1");
        let err = resolver.locate(&mut artifact, "pom", FetchMode::InMemory).unwrap_err();
        assert!(matches!(err, ResolveError::Transport { .. }));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cancellation_checked_before_network() {
        let dir = TempDir::new().unwrap();
        let (resolver, requests) = resolver(&dir, FakeTransport::default());
        resolver.cancellation().cancel();
        let mut artifact = Artifact::new("g", "a", "1");
        let err = resolver.locate(&mut artifact, "pom", FetchMode::InMemory).unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled));
        assert!(requests.lock().unwrap().is_empty());
    }
}
