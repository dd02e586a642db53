use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_ms: i64,
    pub refresh_token_expiration_ms: i64,
    pub encryption_secret: String,
    pub upload_dir: String,
    /// Request paths starting with any of these skip bearer authentication.
    pub public_path_prefixes: Vec<String>,
    pub bcrypt_cost: u32,
    pub refresh_sweep_interval_secs: Option<u64>,
    pub max_upload_bytes: usize,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_ms: env::var("JWT_EXPIRATION_MS")
                .unwrap_or_else(|_| "3600000".into())
                .parse()?,
            refresh_token_expiration_ms: env::var("REFRESH_TOKEN_EXPIRATION_MS")
                .unwrap_or_else(|_| "604800000".into())
                .parse()?,
            encryption_secret: required("ENCRYPTION_SECRET")?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            public_path_prefixes: env::var("PUBLIC_PATH_PREFIXES")
                .map(|v| parse_prefixes(&v))
                .unwrap_or_else(|_| default_public_prefixes()),
            bcrypt_cost: match env::var("BCRYPT_COST") {
                Ok(v) => v.parse()?,
                Err(_) => bcrypt::DEFAULT_COST,
            },
            refresh_sweep_interval_secs: env::var("REFRESH_SWEEP_INTERVAL_SECS")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|v| v.parse::<u64>())
                .transpose()?,
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "52428800".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
        })
    }

    /// Deterministic configuration for tests. Uses the minimum bcrypt cost.
    pub fn test_default() -> Self {
        Self {
            database_url: "postgres://localhost/docvault_test".into(),
            jwt_secret: "test-signing-secret-that-is-long-enough".into(),
            jwt_expiration_ms: 60_000,
            refresh_token_expiration_ms: 3_600_000,
            encryption_secret: "test-path-secret".into(),
            upload_dir: "./uploads-test".into(),
            public_path_prefixes: default_public_prefixes(),
            bcrypt_cost: 4,
            refresh_sweep_interval_secs: None,
            max_upload_bytes: 1024 * 1024,
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}

fn default_public_prefixes() -> Vec<String> {
    vec!["/health".into(), "/auth/".into()]
}

fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
