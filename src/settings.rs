//!
//! Process-wide settings, resolved once at startup from `CLOUD_CONNECTOR_*` environment variables.
//!
//! Resolution never fails: a missing variable takes its default, an unparsable one logs a warning
//! and takes its default as well.
//!
use config::{Config, ConfigError, Environment};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CLOUD_CONNECTOR";

pub const URL_APP_NAME: &str = "URL_App_Name";
pub const URL_PATH_PREFIX: &str = "URL_Path_Prefix";
pub const URL_BASE_PATH: &str = "URL_Base_Path";
pub const OPENAPI_SPEC_FILE_PATH: &str = "OpenAPI_Spec_File_Path";
pub const HTTP_SHUTDOWN_TIMEOUT: &str = "HTTP_Shutdown_Timeout";
pub const SERVICE_TO_SERVICE_CREDENTIALS: &str = "Service_To_Service_Credentials";
pub const PROFILE: &str = "Enable_Profile";
pub const MQTT_BROKER_ADDRESS: &str = "MQTT_Broker_Address";
pub const MQTT_BROKER_TLS_CERT_FILE: &str = "MQTT_Broker_Tls_Cert_File";
pub const MQTT_BROKER_TLS_KEY_FILE: &str = "MQTT_Broker_Tls_Key_File";
pub const MQTT_BROKER_TLS_CA_CERT_FILE: &str = "MQTT_Broker_Tls_CA_Cert_File";
pub const MQTT_BROKER_TLS_SKIP_VERIFY: &str = "MQTT_Broker_Tls_Skip_Verify";
pub const MQTT_BROKER_JWT_GENERATOR_IMPL: &str = "MQTT_Broker_JWT_Generator_Impl";
pub const MQTT_BROKER_JWT_FILE: &str = "MQTT_Broker_JWT_File";
pub const KAFKA_BROKERS: &str = "Kafka_Brokers";
pub const CLIENT_ID_TO_ACCOUNT_ID_IMPL: &str = "Client_Id_To_Account_Id_Impl";
pub const CLIENT_ID_TO_ACCOUNT_ID_CONFIG_FILE: &str = "Client_Id_To_Account_Id_Config_File";
pub const CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID: &str =
    "Client_Id_To_Account_Id_Default_Account_Id";

pub const DEFAULT_URL_PATH_PREFIX: &str = "api";
pub const DEFAULT_URL_APP_NAME: &str = "cloud-connector";
pub const DEFAULT_OPENAPI_SPEC_FILE_PATH: &str = "/opt/app-root/src/api/api.spec.file";
pub const DEFAULT_HTTP_SHUTDOWN_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_MQTT_BROKER_ADDRESS: &str = "ssl://localhost:8883";
pub const DEFAULT_MQTT_BROKER_JWT_GENERATOR_IMPL: &str = "jwt_file_reader";
pub const DEFAULT_MQTT_BROKER_JWT_FILE: &str = "cloud-connector-mqtt-jwt.txt";
pub const DEFAULT_KAFKA_BROKER_ADDRESS: &str = "kafka:29092";
pub const DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_IMPL: &str = "config_file_based";
pub const DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_CONFIG_FILE: &str = "client_id_to_account_id_map.json";
pub const DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID: &str = "111000";

/// Immutable settings snapshot handed to every component at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url_path_prefix: String,
    pub url_app_name: String,
    pub url_base_path: String,
    pub openapi_spec_file_path: String,
    pub http_shutdown_timeout: Duration,
    pub service_to_service_credentials: Map<String, Value>,
    pub profile: bool,
    pub mqtt_broker_address: String,
    pub mqtt_broker_tls_cert_file: String,
    pub mqtt_broker_tls_key_file: String,
    pub mqtt_broker_tls_ca_cert_file: String,
    pub mqtt_broker_tls_skip_verify: bool,
    pub mqtt_broker_jwt_generator_impl: String,
    pub mqtt_broker_jwt_file: String,
    pub kafka_brokers: Vec<String>,
    pub client_id_to_account_id_impl: String,
    pub client_id_to_account_id_config_file: String,
    pub client_id_to_account_id_default_account_id: String,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn resolve() -> Self {
        Settings::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Resolve settings from `vars` instead of the process environment.
    ///
    /// Keys are full variable names, e.g. `CLOUD_CONNECTOR_URL_APP_NAME`.
    pub fn resolve_from(vars: HashMap<String, String>) -> Self {
        let source: config::Map<String, String> = vars.into_iter().collect();
        Settings::load(Environment::with_prefix(ENV_PREFIX).source(Some(source)))
    }

    fn load(environment: Environment) -> Self {
        let options = match Config::builder()
            .add_source(environment.ignore_empty(true))
            .build()
        {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read environment, using default settings");
                Config::default()
            }
        };

        let url_path_prefix = lookup(&options, URL_PATH_PREFIX, DEFAULT_URL_PATH_PREFIX.to_owned());
        let url_app_name = lookup(&options, URL_APP_NAME, DEFAULT_URL_APP_NAME.to_owned());
        let url_base_path = build_url_base_path(&url_path_prefix, &url_app_name);

        Settings {
            url_base_path,
            url_path_prefix,
            url_app_name,
            openapi_spec_file_path: lookup(
                &options,
                OPENAPI_SPEC_FILE_PATH,
                DEFAULT_OPENAPI_SPEC_FILE_PATH.to_owned(),
            ),
            http_shutdown_timeout: Duration::from_secs(lookup(
                &options,
                HTTP_SHUTDOWN_TIMEOUT,
                DEFAULT_HTTP_SHUTDOWN_TIMEOUT_SECS,
            )),
            service_to_service_credentials: credentials(&options),
            profile: lookup(&options, PROFILE, false),
            mqtt_broker_address: lookup(
                &options,
                MQTT_BROKER_ADDRESS,
                DEFAULT_MQTT_BROKER_ADDRESS.to_owned(),
            ),
            mqtt_broker_tls_cert_file: lookup(&options, MQTT_BROKER_TLS_CERT_FILE, String::new()),
            mqtt_broker_tls_key_file: lookup(&options, MQTT_BROKER_TLS_KEY_FILE, String::new()),
            mqtt_broker_tls_ca_cert_file: lookup(
                &options,
                MQTT_BROKER_TLS_CA_CERT_FILE,
                String::new(),
            ),
            mqtt_broker_tls_skip_verify: lookup(&options, MQTT_BROKER_TLS_SKIP_VERIFY, false),
            mqtt_broker_jwt_generator_impl: lookup(
                &options,
                MQTT_BROKER_JWT_GENERATOR_IMPL,
                DEFAULT_MQTT_BROKER_JWT_GENERATOR_IMPL.to_owned(),
            ),
            mqtt_broker_jwt_file: lookup(
                &options,
                MQTT_BROKER_JWT_FILE,
                DEFAULT_MQTT_BROKER_JWT_FILE.to_owned(),
            ),
            kafka_brokers: kafka_brokers(&options),
            client_id_to_account_id_impl: lookup(
                &options,
                CLIENT_ID_TO_ACCOUNT_ID_IMPL,
                DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_IMPL.to_owned(),
            ),
            client_id_to_account_id_config_file: lookup(
                &options,
                CLIENT_ID_TO_ACCOUNT_ID_CONFIG_FILE,
                DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_CONFIG_FILE.to_owned(),
            ),
            client_id_to_account_id_default_account_id: lookup(
                &options,
                CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID,
                DEFAULT_CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID.to_owned(),
            ),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve_from(HashMap::new())
    }
}

/// Environment keys arrive lower-cased; option names are matched the same way.
fn option_key(name: &str) -> String {
    name.to_lowercase().replace(['-', ' '], "_")
}

fn lookup<T: DeserializeOwned>(options: &Config, name: &str, default: T) -> T {
    let key = option_key(name);
    match options.get::<T>(&key) {
        Ok(value) => value,
        Err(ConfigError::NotFound(_)) => default,
        Err(e) => {
            tracing::warn!(option = name, error = %e, "Invalid setting, using default");
            default
        }
    }
}

fn kafka_brokers(options: &Config) -> Vec<String> {
    let brokers: Vec<String> = lookup(options, KAFKA_BROKERS, String::new())
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if brokers.is_empty() {
        vec![DEFAULT_KAFKA_BROKER_ADDRESS.to_owned()]
    } else {
        brokers
    }
}

fn credentials(options: &Config) -> Map<String, Value> {
    let raw = lookup(options, SERVICE_TO_SERVICE_CREDENTIALS, String::new());
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Map<String, Value>>(&raw) {
        Ok(map) => map,
        Err(e) => {
            // The raw value may hold secrets; only the parse error is logged.
            tracing::warn!(
                option = SERVICE_TO_SERVICE_CREDENTIALS,
                error = %e,
                "Invalid setting, using default"
            );
            Map::new()
        }
    }
}

pub fn build_url_base_path(path_prefix: &str, app_name: &str) -> String {
    format!("/{}/{}/v1", path_prefix, app_name)
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", URL_PATH_PREFIX, self.url_path_prefix)?;
        writeln!(f, "{}: {}", URL_APP_NAME, self.url_app_name)?;
        writeln!(f, "{}: {}", URL_BASE_PATH, self.url_base_path)?;
        writeln!(f, "{}: {}", OPENAPI_SPEC_FILE_PATH, self.openapi_spec_file_path)?;
        writeln!(f, "{}: {:?}", HTTP_SHUTDOWN_TIMEOUT, self.http_shutdown_timeout)?;
        writeln!(
            f,
            "{}: <redacted {} entries>",
            SERVICE_TO_SERVICE_CREDENTIALS,
            self.service_to_service_credentials.len()
        )?;
        writeln!(f, "{}: {}", PROFILE, self.profile)?;
        writeln!(f, "{}: {}", MQTT_BROKER_ADDRESS, self.mqtt_broker_address)?;
        writeln!(f, "{}: {}", MQTT_BROKER_TLS_CERT_FILE, self.mqtt_broker_tls_cert_file)?;
        writeln!(f, "{}: {}", MQTT_BROKER_TLS_KEY_FILE, self.mqtt_broker_tls_key_file)?;
        writeln!(f, "{}: {}", MQTT_BROKER_TLS_CA_CERT_FILE, self.mqtt_broker_tls_ca_cert_file)?;
        writeln!(f, "{}: {}", MQTT_BROKER_TLS_SKIP_VERIFY, self.mqtt_broker_tls_skip_verify)?;
        writeln!(f, "{}: {}", MQTT_BROKER_JWT_GENERATOR_IMPL, self.mqtt_broker_jwt_generator_impl)?;
        writeln!(f, "{}: {}", MQTT_BROKER_JWT_FILE, self.mqtt_broker_jwt_file)?;
        writeln!(f, "{}: {:?}", KAFKA_BROKERS, self.kafka_brokers)?;
        writeln!(f, "{}: {}", CLIENT_ID_TO_ACCOUNT_ID_IMPL, self.client_id_to_account_id_impl)?;
        writeln!(
            f,
            "{}: {}",
            CLIENT_ID_TO_ACCOUNT_ID_CONFIG_FILE, self.client_id_to_account_id_config_file
        )?;
        writeln!(
            f,
            "{}: {}",
            CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID,
            self.client_id_to_account_id_default_account_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve_from(HashMap::new());
        assert_eq!(settings.url_path_prefix, "api");
        assert_eq!(settings.url_app_name, "cloud-connector");
        assert_eq!(settings.url_base_path, "/api/cloud-connector/v1");
        assert_eq!(settings.openapi_spec_file_path, "/opt/app-root/src/api/api.spec.file");
        assert_eq!(settings.http_shutdown_timeout, Duration::from_secs(2));
        assert!(settings.service_to_service_credentials.is_empty());
        assert!(!settings.profile);
        assert_eq!(settings.mqtt_broker_address, "ssl://localhost:8883");
        assert_eq!(settings.mqtt_broker_tls_cert_file, "");
        assert!(!settings.mqtt_broker_tls_skip_verify);
        assert_eq!(settings.mqtt_broker_jwt_generator_impl, "jwt_file_reader");
        assert_eq!(settings.mqtt_broker_jwt_file, "cloud-connector-mqtt-jwt.txt");
        assert_eq!(settings.kafka_brokers, vec!["kafka:29092".to_string()]);
        assert_eq!(settings.client_id_to_account_id_impl, "config_file_based");
        assert_eq!(
            settings.client_id_to_account_id_config_file,
            "client_id_to_account_id_map.json"
        );
        assert_eq!(settings.client_id_to_account_id_default_account_id, "111000");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_url_base_path_override() {
        let settings = Settings::resolve_from(vars(&[
            ("CLOUD_CONNECTOR_URL_PATH_PREFIX", "foo"),
            ("CLOUD_CONNECTOR_URL_APP_NAME", "bar"),
        ]));
        assert_eq!(settings.url_base_path, "/foo/bar/v1");
    }

    #[test]
    fn test_typed_overrides() {
        let settings = Settings::resolve_from(vars(&[
            ("CLOUD_CONNECTOR_HTTP_SHUTDOWN_TIMEOUT", "7"),
            ("CLOUD_CONNECTOR_ENABLE_PROFILE", "true"),
            ("CLOUD_CONNECTOR_MQTT_BROKER_TLS_SKIP_VERIFY", "yes"),
            ("CLOUD_CONNECTOR_KAFKA_BROKERS", "k1:9092, k2:9092,,"),
            ("CLOUD_CONNECTOR_MQTT_BROKER_ADDRESS", "tcp://broker:1883"),
            ("CLOUD_CONNECTOR_CLIENT_ID_TO_ACCOUNT_ID_DEFAULT_ACCOUNT_ID", "000042"),
        ]));
        assert_eq!(settings.http_shutdown_timeout, Duration::from_secs(7));
        assert!(settings.profile);
        assert!(settings.mqtt_broker_tls_skip_verify);
        assert_eq!(settings.kafka_brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(settings.mqtt_broker_address, "tcp://broker:1883");
        assert_eq!(settings.client_id_to_account_id_default_account_id, "000042");
    }

    #[test]
    fn test_kafka_brokers_whitespace_separated() {
        let settings = Settings::resolve_from(vars(&[(
            "CLOUD_CONNECTOR_KAFKA_BROKERS",
            "k1:9092 k2:9092\tk3:9092, k4:9092",
        )]));
        assert_eq!(
            settings.kafka_brokers,
            vec!["k1:9092", "k2:9092", "k3:9092", "k4:9092"]
        );
    }

    #[test]
    fn test_mixed_case_variables() {
        let settings = Settings::resolve_from(vars(&[("cloud_connector_url_app_name", "relay")]));
        assert_eq!(settings.url_base_path, "/api/relay/v1");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::resolve_from(vars(&[
            ("CLOUD_CONNECTOR_HTTP_SHUTDOWN_TIMEOUT", "soon"),
            ("CLOUD_CONNECTOR_ENABLE_PROFILE", "maybe"),
            ("CLOUD_CONNECTOR_SERVICE_TO_SERVICE_CREDENTIALS", "{not json"),
        ]));
        assert_eq!(settings.http_shutdown_timeout, Duration::from_secs(2));
        assert!(!settings.profile);
        assert!(settings.service_to_service_credentials.is_empty());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings = Settings::resolve_from(vars(&[("CLOUD_CONNECTOR_URL_PATH_PREFIX", "")]));
        assert_eq!(settings.url_base_path, "/api/cloud-connector/v1");
    }

    #[test]
    fn test_foreign_prefix_is_ignored() {
        let settings = Settings::resolve_from(vars(&[("OTHER_URL_APP_NAME", "nope")]));
        assert_eq!(settings.url_app_name, "cloud-connector");
    }

    #[test]
    fn test_credentials_are_redacted() {
        let settings = Settings::resolve_from(vars(&[(
            "CLOUD_CONNECTOR_SERVICE_TO_SERVICE_CREDENTIALS",
            r#"{"inventory": "s3cr3t", "sources": "hunter2"}"#,
        )]));
        assert_eq!(settings.service_to_service_credentials.len(), 2);
        assert_eq!(settings.service_to_service_credentials["inventory"], "s3cr3t");

        let rendered = settings.to_string();
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Service_To_Service_Credentials: <redacted 2 entries>"));
        assert!(rendered.contains("URL_Base_Path: /api/cloud-connector/v1\n"));
        assert!(rendered.contains("HTTP_Shutdown_Timeout: 2s\n"));
        assert_eq!(rendered.lines().count(), 18);
    }
}
