use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use osclink_types::PoolConfig;

use crate::client::ClientConfig;
use crate::server::ServerConfig;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    client: ClientSection,
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    pools: PoolSection,
}

#[derive(Deserialize, Default)]
struct ClientSection {
    address: Option<String>,
    port: Option<u16>,
    max_queue_size: Option<usize>,
    send_interval_ms: Option<f64>,
}

#[derive(Deserialize, Default)]
struct ServerSection {
    port: Option<u16>,
    recv_buffer_size: Option<usize>,
}

#[derive(Deserialize, Default)]
struct PoolSection {
    value_bucket_capacity: Option<usize>,
    value_max_length: Option<usize>,
    byte_bucket_capacity: Option<usize>,
    byte_max_length: Option<usize>,
}

/// Embedded defaults overlaid with the user's `osclink/config.toml`.
pub struct Config {
    client: ClientSection,
    server: ServerSection,
    pools: PoolSection,
}

impl Config {
    /// Defaults merged with the file under the platform config directory, if any.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::from_file(embedded()),
        }
    }

    /// Defaults merged with `path`. An unreadable or malformed file is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let mut base = embedded();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => merge(&mut base, user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        Self::from_file(base)
    }

    /// Defaults merged with an in-memory TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let mut base = embedded();
        merge(&mut base, toml::from_str(contents)?);
        Ok(Self::from_file(base))
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            client: file.client,
            server: file.server,
            pools: file.pools,
        }
    }

    pub fn client(&self) -> ClientConfig {
        let fallback = ClientConfig::default();
        ClientConfig {
            address: self.client.address.clone().unwrap_or(fallback.address),
            port: self.client.port.unwrap_or(fallback.port),
            max_queue_size: self
                .client
                .max_queue_size
                .unwrap_or(fallback.max_queue_size)
                .clamp(1, 1_000_000),
            send_interval: self
                .client
                .send_interval_ms
                .filter(|ms| ms.is_finite())
                .map(|ms| Duration::from_micros((ms.clamp(0.0, 1_000.0) * 1_000.0).round() as u64))
                .unwrap_or(fallback.send_interval),
        }
    }

    pub fn server(&self) -> ServerConfig {
        let fallback = ServerConfig::default();
        ServerConfig {
            port: self.server.port.unwrap_or(fallback.port),
            recv_buffer_size: self
                .server
                .recv_buffer_size
                .unwrap_or(fallback.recv_buffer_size)
                .clamp(64, 65_536),
        }
    }

    pub fn value_pool(&self) -> PoolConfig {
        pool_config(
            self.pools.value_bucket_capacity,
            self.pools.value_max_length,
            PoolConfig::VALUES,
        )
    }

    pub fn byte_pool(&self) -> PoolConfig {
        pool_config(
            self.pools.byte_bucket_capacity,
            self.pools.byte_max_length,
            PoolConfig::BYTES,
        )
    }
}

fn pool_config(capacity: Option<usize>, max_length: Option<usize>, fallback: PoolConfig) -> PoolConfig {
    PoolConfig {
        bucket_capacity: capacity.unwrap_or(fallback.bucket_capacity).clamp(1, 65_536),
        max_array_length: max_length
            .unwrap_or(fallback.max_array_length)
            .clamp(16, 16 * 1024 * 1024),
    }
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
        log::error!(target: "config", "embedded config.toml is malformed: {}", e);
        ConfigFile::default()
    })
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("osclink").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_client(&mut base.client, user.client);
    merge_server(&mut base.server, user.server);
    merge_pools(&mut base.pools, user.pools);
}

fn merge_client(base: &mut ClientSection, user: ClientSection) {
    if user.address.is_some() {
        base.address = user.address;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.max_queue_size.is_some() {
        base.max_queue_size = user.max_queue_size;
    }
    if user.send_interval_ms.is_some() {
        base.send_interval_ms = user.send_interval_ms;
    }
}

fn merge_server(base: &mut ServerSection, user: ServerSection) {
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.recv_buffer_size.is_some() {
        base.recv_buffer_size = user.recv_buffer_size;
    }
}

fn merge_pools(base: &mut PoolSection, user: PoolSection) {
    if user.value_bucket_capacity.is_some() {
        base.value_bucket_capacity = user.value_bucket_capacity;
    }
    if user.value_max_length.is_some() {
        base.value_max_length = user.value_max_length;
    }
    if user.byte_bucket_capacity.is_some() {
        base.byte_bucket_capacity = user.byte_bucket_capacity;
    }
    if user.byte_max_length.is_some() {
        base.byte_max_length = user.byte_max_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults() {
        let config = Config::from_toml_str("").unwrap();
        let client = config.client();
        assert_eq!(client.address, "127.0.0.1");
        assert_eq!(client.port, 3333);
        assert_eq!(client.max_queue_size, 100);
        assert_eq!(client.send_interval, Duration::ZERO);

        let server = config.server();
        assert_eq!(server.port, 3333);
        assert_eq!(server.recv_buffer_size, 8192);

        assert_eq!(config.value_pool(), PoolConfig::VALUES);
        assert_eq!(config.byte_pool(), PoolConfig::BYTES);
    }

    #[test]
    fn user_values_override_only_what_they_set() {
        let config = Config::from_toml_str(
            r#"
            [client]
            port = 9000
            send_interval_ms = 2.5

            [pools]
            byte_max_length = 4096
            "#,
        )
        .unwrap();

        let client = config.client();
        assert_eq!(client.address, "127.0.0.1");
        assert_eq!(client.port, 9000);
        assert_eq!(client.send_interval, Duration::from_micros(2500));
        assert_eq!(config.byte_pool().max_array_length, 4096);
        assert_eq!(config.byte_pool().bucket_capacity, 1024);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config::from_toml_str(
            r#"
            [client]
            max_queue_size = 0
            send_interval_ms = -5.0

            [server]
            recv_buffer_size = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.client().max_queue_size, 1);
        assert_eq!(config.client().send_interval, Duration::ZERO);
        assert_eq!(config.server().recv_buffer_size, 64);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 7000").unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.server().port, 7000);
        assert_eq!(config.client().port, 3333);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client\nport = ").unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.client().port, 3333);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config.server().recv_buffer_size, 8192);
    }
}
