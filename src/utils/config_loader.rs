use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::{env, fs};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

/// Loads one named section out of a larger config file.
pub trait ConfigSectionLoader {
    type SectionType;

    fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError>;
}

pub fn load_from_file<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    load_from_str(&contents)
}

pub fn load_from_str<T: DeserializeOwned>(contents: &str) -> Result<T, LoadConfigError> {
    let contents = expand_vars(contents);
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

fn expand_vars(raw_config: &str) -> String {
    // https://stackoverflow.com/questions/62888154/rust-load-environment-variables-into-log4rs-yml-file
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}").unwrap();
    re.replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
        Ok(val) => val,
        Err(_) => caps[0].to_string(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        name: String,
        chain_id: u64,
    }

    #[test]
    fn test_load_from_str() {
        let sample: Sample = load_from_str("name = \"uniswap-v2\"\nchain_id = 1\n").unwrap();
        assert_eq!(sample.name, "uniswap-v2");
        assert_eq!(sample.chain_id, 1);
    }

    #[test]
    fn test_expand_vars() {
        unsafe { env::set_var("LM_TEST_PROTOCOL", "curve") };
        let expanded = expand_vars("name = \"${LM_TEST_PROTOCOL}\"");
        assert_eq!(expanded, "name = \"curve\"");

        // unknown variables are left untouched
        let untouched = expand_vars("name = \"${LM_TEST_MISSING_VAR}\"");
        assert_eq!(untouched, "name = \"${LM_TEST_MISSING_VAR}\"");
    }
}
