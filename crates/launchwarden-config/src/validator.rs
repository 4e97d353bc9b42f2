//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_monitor(config, &mut result);
        Self::validate_launchctl(config, &mut result);
        Self::validate_domains(config, &mut result);

        result
    }

    fn validate_monitor(config: &Config, result: &mut ValidationResult) {
        if config.monitor.debounce_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.debounce_ms",
                "debounce_ms must be greater than 0",
            ));
        }

        if config.monitor.debounce_ms > 60_000 {
            result.add_warning(ValidationWarning::new(
                "monitor.debounce_ms",
                "debounce_ms is over a minute, changes will be picked up slowly",
            ));
        }

        if config.monitor.settle_delay_ms > 10_000 {
            result.add_warning(ValidationWarning::new(
                "monitor.settle_delay_ms",
                "settle_delay_ms is over ten seconds",
            ));
        }
    }

    fn validate_launchctl(config: &Config, result: &mut ValidationResult) {
        if !config.launchctl.path.is_absolute() {
            result.add_error(ValidationError::new(
                "launchctl.path",
                "launchctl path must be absolute",
            ));
        }

        if !config.launchctl.osascript_path.is_absolute() {
            result.add_error(ValidationError::new(
                "launchctl.osascript_path",
                "osascript path must be absolute",
            ));
        }

        if config.launchctl.command_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "launchctl.command_timeout_secs",
                "command_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_domains(config: &Config, result: &mut ValidationResult) {
        for (id, path) in config.domains.overrides() {
            if !path.is_absolute() {
                result.add_error(ValidationError::new(
                    format!("domains.{}", id.replace('-', "_")),
                    "directory override must be absolute",
                ));
            } else if !path.exists() {
                result.add_warning(ValidationWarning::new(
                    format!("domains.{}", id.replace('-', "_")),
                    format!("directory does not exist: {:?}", path),
                ));
            }
        }
    }
}
