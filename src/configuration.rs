use config::{Config, File};
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::gradient::Palette;
use crate::models::LocationId;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub display: DisplaySettings,
    #[serde(default)]
    pub palette: Palette,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ProviderSettings {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DisplaySettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub location_id: LocationId,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_days: u32,
    #[serde(default)]
    pub ansi_colors: bool,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");

    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base")).required(true))
        .add_source(File::from(configuration_directory.join(environment.as_str())).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

pub enum Environment {
    Local,
    Production,
}
impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}
impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::Rgb;

    #[test]
    fn environment_names() {
        let env: Environment = "Production".to_string().try_into().unwrap();
        assert_eq!(env.as_str(), "production");
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn settings_accept_numbers_as_strings_and_default_the_palette() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                r#"
provider:
  base_url: "http://localhost:8000/api/opendata"
  timeout_secs: "15"
display:
  location_id: "3"
  window_days: 14
"#,
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.provider.timeout_secs, 15);
        assert_eq!(settings.display.location_id, 3);
        assert_eq!(settings.display.window_days, 14);
        assert!(!settings.display.ansi_colors);
        assert_eq!(settings.palette.floor, Rgb::new(0x00, 0xFF, 0x00));
    }
}
