//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    DispatchConfig, DispatchMode, EnvelopeConfig, LogOutput, LoggingConfig, SignetConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &SignetConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_dispatch_config(&config.dispatch)?;
    validate_envelope_config(&config.envelope)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter module: {module:?}"
        )));
    }

    Ok(())
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.mode == DispatchMode::Pool && dispatch.workers == 0 {
        return Err(ConfigError::validation(
            "dispatch.workers must be greater than 0 in pool mode",
        ));
    }

    if dispatch.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "dispatch.queue_capacity must be greater than 0",
        ));
    }

    if dispatch.handler_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "dispatch.handler_timeout_ms must be greater than 0 when set",
        ));
    }

    Ok(())
}

fn validate_envelope_config(envelope: &EnvelopeConfig) -> ConfigResult<()> {
    let fields = [
        ("post_type_field", &envelope.post_type_field),
        ("sub_type_field", &envelope.sub_type_field),
        ("detail_type_field", &envelope.detail_type_field),
    ];

    for (name, value) in fields {
        if value.is_empty() {
            return Err(ConfigError::validation(format!(
                "envelope.{name} cannot be empty"
            )));
        }
    }

    if envelope.post_type_field == envelope.sub_type_field
        || envelope.post_type_field == envelope.detail_type_field
        || envelope.sub_type_field == envelope.detail_type_field
    {
        return Err(ConfigError::validation(
            "envelope discriminator fields must be distinct",
        ));
    }

    Ok(())
}
