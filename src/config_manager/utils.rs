use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config_manager::main::Config;

/// Prefix for environment overrides, e.g. `VETLOOKUP__SYSTEM_CONFIG__PORT=8080`.
pub const ENV_PREFIX: &str = "VETLOOKUP";

/// Read a JSON-LD, JSON or YAML configuration file with environment
/// variable substitution (`${VAR_NAME}`). Unset variables are left as is.
pub fn read_config_value(config_path: &str) -> Result<Value> {
    if !Path::new(config_path).exists() {
        anyhow::bail!("Configuration file not found: {}", config_path);
    }

    let content = load_text_file_with_guess_encoding(config_path)?;
    if content.trim().is_empty() {
        anyhow::bail!("Configuration file is empty: {}", config_path);
    }

    let content = substitute_env_vars(&content);

    let path_lower = config_path.to_lowercase();
    let mut value: Value = if path_lower.ends_with(".jsonld") || path_lower.ends_with(".json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", config_path))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", config_path))?
    };

    // The JSON-LD @context only documents the vocabulary
    if let Value::Object(ref mut obj) = value {
        obj.remove("@context");
    }

    Ok(value)
}

pub fn substitute_env_vars(content: &str) -> String {
    let pattern = Regex::new(r"\$\{(\w+)\}").unwrap();
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Layer `VETLOOKUP__*` environment variables over the file contents and
/// deserialize the result.
pub fn validate_config(config_data: &Value, env_prefix: &str) -> Result<Config> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(
            &config_data.to_string(),
            config::FileFormat::Json,
        ))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let config: Config = settings.try_deserialize()?;
    debug!(backend = ?config.store_config.backend, "Validated configuration");
    Ok(config)
}

/// Load a text file, stripping a UTF-8 BOM and honouring UTF-16 BOMs.
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn load_text_file_with_guess_encoding(file_path: impl AsRef<Path>) -> Result<String> {
    let file_path = file_path.as_ref();
    let bytes = fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(&bytes) {
        let (cow, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return Ok(cow.into_owned());
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let (cow, _, _) = encoding_rs::UTF_8.decode(err.as_bytes());
            Ok(cow.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn substitutes_known_vars_only() {
        std::env::set_var("VET_LOOKUP_TEST_URI", "mongodb://db:27017");
        let out = substitute_env_vars(r#"{"uri": "${VET_LOOKUP_TEST_URI}", "x": "${VET_LOOKUP_UNSET_VAR}"}"#);
        assert_eq!(
            out,
            r#"{"uri": "mongodb://db:27017", "x": "${VET_LOOKUP_UNSET_VAR}"}"#
        );
    }

    #[test]
    fn strips_utf8_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xEF, 0xBB, 0xBF]).unwrap();
        file.write_all("दस्त".as_bytes()).unwrap();
        let text = load_text_file_with_guess_encoding(file.path()).unwrap();
        assert_eq!(text, "दस्त");
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "fever".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        file.write_all(&bytes).unwrap();
        let text = load_text_file_with_guess_encoding(file.path()).unwrap();
        assert_eq!(text, "fever");
    }

    #[test]
    fn reads_yaml_and_drops_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.yaml");
        fs::write(&path, "'@context': {}\nsystem_config:\n  port: 8080\n").unwrap();
        let value = read_config_value(path.to_str().unwrap()).unwrap();
        assert!(value.get("@context").is_none());
        assert_eq!(value["system_config"]["port"], 8080);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_config_value("/definitely/not/here.jsonld").is_err());
    }
}
