//! Path expansion for configuration values.
//!
//! Every expandable setting (`tree.root`, `cache.path`, `mounts[].physical`)
//! is a filesystem path, so values get `${VAR}` / `${VAR:-default}`
//! substitution followed by a leading `~` for the home directory.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand environment variables and a leading `~` in a path setting.
///
/// Bare `$VAR` is only expanded when the value also contains a `${...}`
/// reference.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with_home(value, field, std::env::var("HOME").ok().as_deref())
}

fn expand_with_home(value: &str, field: &str, home: Option<&str>) -> Result<String, ConfigError> {
    let value = if value.contains("${") {
        shellexpand::env_with_context(value, |var| std::env::var(var).map(Some))
            .map(Cow::into_owned)
            .map_err(|e| ConfigError::EnvVar {
                field: field.to_owned(),
                message: format!("${{{}}} not set", e.var_name),
            })?
    } else {
        value.to_owned()
    };
    Ok(shellexpand::tilde_with_context(&value, || home).into_owned())
}
