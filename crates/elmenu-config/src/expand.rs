//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Supports:
/// - `${VAR}` - expands to the value of VAR, errors if unset
/// - `${VAR:-default}` - expands to VAR if set, otherwise uses default
///
/// Returns the original string unchanged if no `${` is present.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("ELMENU_TEST_VAR_SIMPLE", "menu.yaml");
        }
        let result = expand_env("${ELMENU_TEST_VAR_SIMPLE}", "store.path").unwrap();
        assert_eq!(result, "menu.yaml");
        unsafe {
            std::env::remove_var("ELMENU_TEST_VAR_SIMPLE");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("ELMENU_UNSET_VAR_TEST");
        }
        let result = expand_env("${ELMENU_UNSET_VAR_TEST:-/var/cache}", "cache.dir").unwrap();
        assert_eq!(result, "/var/cache");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("ELMENU_MISSING_VAR_TEST");
        }
        let err = expand_env("${ELMENU_MISSING_VAR_TEST}", "store.path").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("ELMENU_MISSING_VAR_TEST"));
        assert!(err.to_string().contains("store.path"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("ELMENU_DATA_DIR_TEST", "/srv/data");
        }
        let result = expand_env("${ELMENU_DATA_DIR_TEST}/menu.yaml", "store.path").unwrap();
        assert_eq!(result, "/srv/data/menu.yaml");
        unsafe {
            std::env::remove_var("ELMENU_DATA_DIR_TEST");
        }
    }

    #[test]
    fn test_expand_literal_unchanged() {
        let result = expand_env("data/menu.yaml", "store.path").unwrap();
        assert_eq!(result, "data/menu.yaml");
    }
}
