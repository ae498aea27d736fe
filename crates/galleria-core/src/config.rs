//! Configuration module
//!
//! Settings are read from the environment (after loading a `.env` file when
//! present). Quota ceilings and the compression envelope live in
//! [`crate::constants`] and are not configurable.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SOURCE_SIZE_MB: usize = 50;
const MAX_VIDEO_SOURCE_SIZE_MB: usize = 200;
const RECONCILE_GRACE_PERIOD_SECS: u64 = 24 * 3600;
const RECONCILE_INTERVAL_SECS: u64 = 3600;
/// Shortest grace period accepted; younger objects may still be mid-ingest.
const MIN_RECONCILE_GRACE_PERIOD_SECS: u64 = 60;
const LOCAL_STORAGE_BUCKET: &str = "gallery-media";

/// Gallery configuration
#[derive(Clone, Debug)]
pub struct GalleryConfig {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_public_base_url: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_bucket: String,
    pub local_storage_base_url: Option<String>,
    // Ingestion configuration
    pub video_enabled: bool,
    pub max_image_source_bytes: usize,
    pub max_video_source_bytes: usize,
    pub image_allowed_content_types: Vec<String>,
    pub video_allowed_content_types: Vec<String>,
    // Orphan reconciliation
    pub reconcile_grace_period_secs: u64,
    pub reconcile_interval_secs: u64,
}

impl GalleryConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let config = GalleryConfig {
            environment,
            database_url: lookup("DATABASE_URL"),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(&lookup, "DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: lookup("S3_BUCKET"),
            s3_region: lookup("S3_REGION"),
            s3_endpoint: lookup("S3_ENDPOINT"),
            s3_public_base_url: lookup("S3_PUBLIC_BASE_URL"),
            aws_region: lookup("AWS_REGION"),
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            local_storage_bucket: lookup("LOCAL_STORAGE_BUCKET")
                .unwrap_or_else(|| LOCAL_STORAGE_BUCKET.to_string()),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL"),
            video_enabled: parse_or(&lookup, "GALLERY_VIDEO_ENABLED", false),
            max_image_source_bytes: parse_or(
                &lookup,
                "MAX_IMAGE_SOURCE_SIZE_MB",
                MAX_IMAGE_SOURCE_SIZE_MB,
            ) * 1024
                * 1024,
            max_video_source_bytes: parse_or(
                &lookup,
                "MAX_VIDEO_SOURCE_SIZE_MB",
                MAX_VIDEO_SOURCE_SIZE_MB,
            ) * 1024
                * 1024,
            image_allowed_content_types: list_or(
                &lookup,
                "IMAGE_ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/png,image/webp,image/gif",
            ),
            video_allowed_content_types: list_or(
                &lookup,
                "VIDEO_ALLOWED_CONTENT_TYPES",
                "video/mp4,video/quicktime,video/webm",
            ),
            reconcile_grace_period_secs: parse_or(
                &lookup,
                "RECONCILE_GRACE_PERIOD_SECS",
                RECONCILE_GRACE_PERIOD_SECS,
            ),
            reconcile_interval_secs: parse_or(
                &lookup,
                "RECONCILE_INTERVAL_SECS",
                RECONCILE_INTERVAL_SECS,
            ),
        };

        Ok(config)
    }

    /// S3 region, falling back to the generic AWS region.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region().is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.max_image_source_bytes == 0 || self.max_video_source_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum source sizes must be greater than zero"));
        }

        if self.reconcile_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "RECONCILE_INTERVAL_SECS must be greater than zero"
            ));
        }
        if self.reconcile_grace_period_secs < MIN_RECONCILE_GRACE_PERIOD_SECS {
            return Err(anyhow::anyhow!(
                "RECONCILE_GRACE_PERIOD_SECS must be at least {} seconds",
                MIN_RECONCILE_GRACE_PERIOD_SECS
            ));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|value| value.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

fn list_or<F>(lookup: &F, key: &str, default: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GalleryConfig, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GalleryConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert!(!config.video_enabled);
        assert_eq!(config.max_image_source_bytes, 50 * 1024 * 1024);
        assert_eq!(config.reconcile_grace_period_secs, 86_400);
        assert_eq!(config.local_storage_bucket, "gallery-media");
        assert!(config
            .image_allowed_content_types
            .contains(&"image/jpeg".to_string()));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("DB_MAX_CONNECTIONS", "many")]).unwrap();
        assert_eq!(config.db_max_connections, MAX_CONNECTIONS);
    }

    #[test]
    fn unknown_storage_backend_is_an_error() {
        assert!(config_from(&[("STORAGE_BACKEND", "ftp")]).is_err());
    }

    #[test]
    fn s3_requires_bucket_and_region() {
        let config = config_from(&[("STORAGE_BACKEND", "s3")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_BUCKET", "school-gallery"),
            ("AWS_REGION", "eu-west-1"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.s3_region(), Some("eu-west-1"));
    }

    #[test]
    fn local_requires_path_and_base_url() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/var/lib/galleria"),
        ])
        .unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/var/lib/galleria"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:3000/media"),
            ("GALLERY_VIDEO_ENABLED", "TRUE"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
        assert!(config.video_enabled);
    }

    #[test]
    fn database_url_must_be_postgres() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/g"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost/media"),
            ("DATABASE_URL", "mysql://localhost/gallery"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    fn local_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/var/lib/galleria"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:3000/media"),
        ]
    }

    #[test]
    fn zero_reconcile_interval_is_rejected() {
        let mut pairs = local_pairs();
        pairs.push(("RECONCILE_INTERVAL_SECS", "0"));
        let config = config_from(&pairs).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RECONCILE_INTERVAL_SECS"));
    }

    #[test]
    fn reconcile_grace_period_has_a_floor() {
        for grace in ["0", "59"] {
            let mut pairs = local_pairs();
            pairs.push(("RECONCILE_GRACE_PERIOD_SECS", grace));
            let config = config_from(&pairs).unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("RECONCILE_GRACE_PERIOD_SECS"));
        }

        let mut pairs = local_pairs();
        pairs.push(("RECONCILE_GRACE_PERIOD_SECS", "60"));
        pairs.push(("RECONCILE_INTERVAL_SECS", "1"));
        assert!(config_from(&pairs).unwrap().validate().is_ok());
    }
}
