use std::fmt;

pub const DEFAULT_ENDPOINT: &str = "https://api.airbrake.io/notifier_api/v2/notices";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Process-wide notifier settings. Built once at startup and handed to
/// [`crate::Notifier::new`]; the notifier only ever reads it.
///
/// ```
/// let config = airbrake::Config::builder()
///     .api_key("0123456789abcdef")
///     .environment("production")
///     .build();
/// assert_eq!(config.environment(), "production");
/// ```
#[derive(Clone, typed_builder::TypedBuilder)]
pub struct Config {
    #[builder(default, setter(into))]
    pub(crate) api_key: String,

    #[builder(default = DEFAULT_ENDPOINT.to_owned(), setter(into))]
    pub(crate) endpoint: String,

    #[builder(default = DEFAULT_ENVIRONMENT.to_owned(), setter(into))]
    pub(crate) environment: String,

    #[builder(default, setter(into))]
    pub(crate) version: String,

    #[builder(default = default_hostname(), setter(into))]
    pub(crate) hostname: String,

    #[builder(default = default_project_root(), setter(into))]
    pub(crate) project_root: String,

    /// logs every payload and response body
    #[builder(default)]
    pub(crate) verbose: bool,

    /// duplicates request params under `?`-prefixed keys
    #[builder(default)]
    pub(crate) pretty_params: bool,

    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    pub(crate) queue_capacity: usize,
}

impl Config {
    /// Builds a configuration from `AIRBRAKE_*` environment variables, using the
    /// builder defaults for anything that is unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let flag = |name: &str| {
            var(name)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        Self {
            api_key: var("AIRBRAKE_API_KEY").unwrap_or_default(),
            endpoint: var("AIRBRAKE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            environment: var("AIRBRAKE_ENVIRONMENT")
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned()),
            version: var("AIRBRAKE_APP_VERSION").unwrap_or_default(),
            hostname: default_hostname(),
            project_root: default_project_root(),
            verbose: flag("AIRBRAKE_VERBOSE"),
            pretty_params: flag("AIRBRAKE_PRETTY_PARAMS"),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn pretty_params(&self) -> bool {
        self.pretty_params
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "" })
            .field("endpoint", &self.endpoint)
            .field("environment", &self.environment)
            .field("version", &self.version)
            .field("hostname", &self.hostname)
            .field("project_root", &self.project_root)
            .field("verbose", &self.verbose)
            .field("pretty_params", &self.pretty_params)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

fn default_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            log::debug!("Airbrake: cannot resolve hostname: {e}");
            String::new()
        }
    }
}

fn default_project_root() -> String {
    match std::env::current_dir() {
        Ok(dir) => dir.to_string_lossy().into_owned(),
        Err(e) => {
            log::debug!("Airbrake: cannot resolve working directory: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder().api_key("key").build();

        assert!(config.has_api_key());
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.environment(), "development");
        assert_eq!(config.version(), "");
        assert_eq!(config.queue_capacity(), 100);
        assert!(!config.verbose());
        assert!(!config.pretty_params());
        assert_eq!(
            config.project_root(),
            std::env::current_dir().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::builder().api_key("super-secret").build();
        let printed = format!("{config:?}");

        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("AIRBRAKE_API_KEY", "env-key");
        std::env::set_var("AIRBRAKE_ENVIRONMENT", "production");
        std::env::set_var("AIRBRAKE_PRETTY_PARAMS", "TRUE");
        std::env::remove_var("AIRBRAKE_ENDPOINT");

        let config = Config::from_env();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.environment(), "production");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert!(config.pretty_params());
        assert!(!config.verbose());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let config = Config::builder().queue_capacity(0).build();
        assert_eq!(config.queue_capacity(), 1);
        assert!(!config.has_api_key());
    }
}
