use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and parse a YAML file, flattening it into the values map.
///
/// A missing file is not an error.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        load_yaml_str(&content, values)?;
    }
    Ok(())
}

/// Parse a YAML string and flatten it into the values map.
pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
pub(crate) fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut HashMap<String, ConfigValue>,
) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(
                    prefix.to_string(),
                    ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
                );
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Overlay environment variables carrying the service prefix.
///
/// Convention: `TOP_USER_DOMAIN` <-> `user_domain`. Variables without the
/// prefix are ignored, as is the `{PREFIX}_CONFIG_YAML` locator itself.
pub(crate) fn overlay_env(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
    values: &mut HashMap<String, ConfigValue>,
) {
    let env_prefix = format!("{prefix}_");
    for (env_key, env_val) in vars {
        let Some(rest) = env_key.strip_prefix(&env_prefix) else {
            continue;
        };
        if rest.is_empty() || rest == "CONFIG_YAML" {
            continue;
        }
        values.insert(rest.to_lowercase(), ConfigValue::String(env_val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_env_strips_prefix_and_keeps_underscores() {
        let mut values = HashMap::new();
        overlay_env(
            "TOP",
            vec![
                ("TOP_USER_DOMAIN".to_string(), "dkfz.de".to_string()),
                ("TOPPING".to_string(), "cheese".to_string()),
                ("TOP_CONFIG_YAML".to_string(), "/etc/top.yaml".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
            &mut values,
        );
        assert_eq!(values.len(), 1);
        assert!(matches!(
            values.get("user_domain"),
            Some(ConfigValue::String(s)) if s == "dkfz.de"
        ));
    }

    #[test]
    fn nested_mappings_are_dot_joined() {
        let mut values = HashMap::new();
        load_yaml_str("server:\n  port: 9000\n", &mut values).unwrap();
        assert!(matches!(values.get("server.port"), Some(ConfigValue::Integer(9000))));
    }
}
