use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Segmenting a long
    /// video runs inside the request, hence the generous default.
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory that `frames_dir` requests are resolved against. Unset
    /// disables segmenting from frame directories over HTTP.
    pub frames_root: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `120`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `FRAMES_ROOT`          | unset (`frames_dir` off)   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            frames_root: non_empty_var("FRAMES_ROOT").map(PathBuf::from),
        }
    }
}

/// Which backends the service is wired to.
///
/// Unset optional variables select the local fallbacks: an in-memory store
/// instead of pgvector, the hashing embedder instead of OpenAI (with no
/// translation, expansion or script parsing), and no frame detector.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub database_url: Option<String>,
    pub embedding_dimension: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub chat_model: Option<String>,
    pub detector_url: Option<String>,
}

impl BackendConfig {
    /// Load backend selection from environment variables.
    ///
    /// | Env Var               | Default                          |
    /// |-----------------------|----------------------------------|
    /// | `DATABASE_URL`        | unset (in-memory store)          |
    /// | `EMBEDDING_DIMENSION` | `384`                            |
    /// | `OPENAI_API_KEY`      | unset (hashing embedder)         |
    /// | `OPENAI_BASE_URL`     | `https://api.openai.com/v1`      |
    /// | `EMBEDDING_MODEL`     | `text-embedding-3-small`         |
    /// | `CHAT_MODEL`          | `gpt-4o-mini`                    |
    /// | `DETECTOR_URL`        | unset (detection tracks only)    |
    pub fn from_env() -> Self {
        let embedding_dimension: usize = std::env::var("EMBEDDING_DIMENSION")
            .unwrap_or_else(|_| "384".into())
            .parse()
            .expect("EMBEDDING_DIMENSION must be a valid usize");

        Self {
            database_url: non_empty_var("DATABASE_URL"),
            embedding_dimension,
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL"),
            embedding_model: non_empty_var("EMBEDDING_MODEL"),
            chat_model: non_empty_var("CHAT_MODEL"),
            detector_url: non_empty_var("DETECTOR_URL"),
        }
    }

    /// Local-only configuration: memory store, hashing embedder, no detector.
    pub fn local(embedding_dimension: usize) -> Self {
        Self {
            database_url: None,
            embedding_dimension,
            openai_api_key: None,
            openai_base_url: None,
            embedding_model: None,
            chat_model: None,
            detector_url: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
