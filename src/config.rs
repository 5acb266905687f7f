use crate::dataset::StationFilter;
use crate::error::{AppError, Result};
use crate::models::{PointsCategory, PowerRange};
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port", deserialize_with = "deserialize_number")]
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_max_connections", deserialize_with = "deserialize_number")]
    pub max_connections: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    5
}

/// Accepts a number either as a YAML number or as a string, since
/// `${VAR}` substitution always produces text.
fn deserialize_number<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberValue<T> {
        Number(T),
        String(String),
    }

    match NumberValue::<T>::deserialize(deserializer)? {
        NumberValue::Number(n) => Ok(n),
        NumberValue::String(s) => s
            .trim()
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Invalid number '{}': {}", s, e))),
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_max_results", deserialize_with = "deserialize_number")]
    pub max_results: u32,
    #[serde(default = "default_timeout_secs", deserialize_with = "deserialize_number")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries", deserialize_with = "deserialize_number")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "https://api.openchargemap.io/v3/poi".to_string()
}

fn default_country_code() -> String {
    "PT".to_string()
}

fn default_max_results() -> u32 {
    10_000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            country_code: default_country_code(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl SourceConfig {
    /// The API key, or a configuration error when it was left empty.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && !key.contains("${") => Ok(key),
            _ => Err(AppError::Config(
                "OPENCHARGE_API_KEY is not set. \
                 Create a .env file (see .env.example) or export it before fetching."
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_json_path")]
    pub json_path: PathBuf,
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
}

fn default_json_path() -> PathBuf {
    PathBuf::from("data/postos_carregamento.json")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            csv_path: None,
        }
    }
}

/// Default dataset selection, written with the same labels the charts use.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub power_ranges: Vec<String>,
    #[serde(default)]
    pub points_categories: Vec<String>,
}

impl FilterConfig {
    pub fn to_station_filter(&self) -> Result<StationFilter> {
        let city = self
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);

        let power_ranges = self
            .power_ranges
            .iter()
            .map(|label| {
                PowerRange::parse(label).ok_or_else(|| {
                    AppError::Config(format!(
                        "Unknown power range '{}', expected one of 0-50, 51-100, 100+",
                        label
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let points_categories = self
            .points_categories
            .iter()
            .map(|label| {
                PointsCategory::parse(label).ok_or_else(|| {
                    AppError::Config(format!(
                        "Unknown points category '{}', expected one of 1 point, 2 points, 3-4 points, 5+ points",
                        label
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StationFilter {
            city,
            power_ranges,
            points_categories,
        })
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// The database section, required only by the export command.
    pub fn require_database(&self) -> Result<&DatabaseConfig> {
        self.database.as_ref().ok_or_else(|| {
            AppError::Config("A database section is required to export stations".to_string())
        })
    }

    fn validate(&self) -> Result<()> {
        if let Some(database) = &self.database {
            validate_database(database)?;
        }

        let parsed = url::Url::parse(&self.source.base_url).map_err(|e| {
            AppError::Config(format!(
                "Invalid source base_url '{}': {}",
                self.source.base_url, e
            ))
        })?;

        if parsed.scheme() != "https" {
            return Err(AppError::Config(format!(
                "Source base_url must use HTTPS, got: {}",
                parsed.scheme()
            )));
        }

        let country = &self.source.country_code;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::Config(format!(
                "Country code '{}' must be exactly 2 letters (e.g., 'PT', 'ES')",
                country
            )));
        }

        if self.source.max_results == 0 {
            return Err(AppError::Config(
                "Source max_results must be greater than 0".to_string(),
            ));
        }

        if self.source.timeout_secs == 0 {
            return Err(AppError::Config(
                "Source timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.source.max_retries > 10 {
            tracing::warn!(
                "Source max_retries of {} is high, backoff will wait a long time on outages",
                self.source.max_retries
            );
        }

        if self.data.json_path.as_os_str().is_empty() {
            return Err(AppError::Config("Data json_path cannot be empty".to_string()));
        }

        // Surface bad labels at startup rather than on first use
        self.filter.to_station_filter()?;

        Ok(())
    }
}

fn validate_database(database: &DatabaseConfig) -> Result<()> {
    let fields_to_check = [
        ("DB_HOST", &database.host),
        ("DB_NAME", &database.name),
        ("DB_USER", &database.user),
        ("DB_PASSWORD", &database.password),
    ];

    for (field_name, value) in &fields_to_check {
        if value.contains("${") {
            return Err(AppError::Config(format!(
                "{} environment variable is not set. \
                 Please set it or create a .env file. \
                 See .env.example for required variables.",
                field_name
            )));
        }
    }

    if database.host.is_empty() {
        return Err(AppError::Config("Database host cannot be empty".to_string()));
    }

    if database.name.is_empty() {
        return Err(AppError::Config("Database name cannot be empty".to_string()));
    }

    if database.user.is_empty() {
        return Err(AppError::Config("Database user cannot be empty".to_string()));
    }

    if database.port == 0 {
        return Err(AppError::Config("Database port cannot be 0".to_string()));
    }

    if database.max_connections == 0 {
        return Err(AppError::Config(
            "Database max_connections must be at least 1".to_string(),
        ));
    }

    if database.max_connections > 100 {
        return Err(AppError::Config(format!(
            "Database max_connections {} seems too high, maximum recommended is 100",
            database.max_connections
        )));
    }

    Ok(())
}

/// Replace `${VAR}` and `${VAR:-default}` with values from the environment.
fn expand_env_vars(content: &str) -> Result<String> {
    expand_with(content, |name| std::env::var(name).ok())
}

fn expand_with<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .map_err(|e| AppError::Config(format!("Invalid substitution pattern: {}", e)))?;

    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match (lookup(var_name), cap.get(2)) {
            (Some(value), _) => {
                result = result.replace(&cap[0], &value);
            }
            (None, Some(default)) => {
                result = result.replace(&cap[0], default.as_str());
            }
            (None, None) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or give it a default in the config: ${{{}:-value}}",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
            missing_vars[0]
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source:
  base_url: https://api.openchargemap.io/v3/poi
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.source.country_code, "PT");
        assert_eq!(config.source.max_results, 10_000);
        assert_eq!(config.data.json_path, PathBuf::from("data/postos_carregamento.json"));
        assert!(config.require_database().is_err());
    }

    #[test]
    fn test_empty_document_is_valid() {
        let config = Config::from_yaml("data:\n  json_path: stations.json\n").unwrap();
        assert_eq!(config.source.base_url, "https://api.openchargemap.io/v3/poi");
        assert_eq!(config.data.json_path, PathBuf::from("stations.json"));
    }

    #[test]
    fn test_rejects_http_base_url() {
        let yaml = "source:\n  base_url: http://api.openchargemap.io/v3/poi\n";
        let err = Config::from_yaml(yaml).unwrap_err().to_string();
        assert!(err.contains("must use HTTPS"));
    }

    #[test]
    fn test_rejects_bad_country_code() {
        let yaml = "source:\n  base_url: https://example.com\n  country_code: PRT\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::from_yaml(MINIMAL).unwrap();
        assert!(config.source.require_api_key().is_err());

        config.source.api_key = Some("  ".to_string());
        assert!(config.source.require_api_key().is_err());

        config.source.api_key = Some("abc123".to_string());
        assert_eq!(config.source.require_api_key().unwrap(), "abc123");
    }

    #[test]
    fn test_filter_config_parses_labels() {
        let filter = FilterConfig {
            city: Some("All".to_string()),
            power_ranges: vec!["0-50".to_string(), "100+".to_string()],
            points_categories: vec!["5+ points".to_string()],
        }
        .to_station_filter()
        .unwrap();

        assert_eq!(filter.city, None);
        assert_eq!(filter.power_ranges, vec![PowerRange::UpTo50, PowerRange::Above100]);
        assert_eq!(filter.points_categories, vec![PointsCategory::FivePlus]);
    }

    #[test]
    fn test_filter_config_rejects_unknown_label() {
        let filter = FilterConfig {
            power_ranges: vec!["0-49".to_string()],
            ..Default::default()
        };
        assert!(filter.to_station_filter().is_err());
    }

    #[test]
    fn test_expand_with_defaults() {
        let lookup = |name: &str| (name == "DB_HOST").then(|| "db.local".to_string());

        let expanded = expand_with("host: ${DB_HOST}\nport: ${DB_PORT:-5432}\n", lookup).unwrap();
        assert_eq!(expanded, "host: db.local\nport: 5432\n");
    }

    #[test]
    fn test_expand_reports_missing() {
        let err = expand_with("password: ${DB_PASSWORD}", |_| None)
            .unwrap_err()
            .to_string();
        assert!(err.contains("DB_PASSWORD"));
    }

    #[test]
    fn test_port_deserialize_from_number() {
        let yaml = r#"
host: localhost
port: 5432
name: test
user: test
password: test
"#;
        let config: DatabaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_port_deserialize_from_string() {
        let yaml = r#"
host: localhost
port: "5432"
name: test
user: test
password: test
"#;
        let config: DatabaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_port_deserialize_invalid_string() {
        let yaml = r#"
host: localhost
port: "not_a_number"
name: test
user: test
password: test
"#;
        let result: std::result::Result<DatabaseConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
