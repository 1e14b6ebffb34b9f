//! Logic for loading configuration in to an object model
use displaydoc::Display;
use schemars::gen::SchemaGenerator;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),

    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// How schemas are compiled and executed.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with the builder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Runtime type resolution for interfaces and unions.
    #[serde(default)]
    pub type_resolution: TypeResolution,

    /// Field execution.
    #[serde(default)]
    pub execution: Execution,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(type_resolution: Option<TypeResolution>, execution: Option<Execution>) -> Self {
        Self {
            type_resolution: type_resolution.unwrap_or_default(),
            execution: execution.unwrap_or_default(),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(raw_yaml: &str) -> Result<Self, ConfigurationError> {
        let configuration: Configuration =
            serde_yaml::from_str(raw_yaml).map_err(ConfigurationError::DeserializeConfigError)?;
        if configuration.type_resolution.marker_field.is_empty() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "type_resolution.marker_field must not be empty",
                error: "empty marker field".to_string(),
            });
        }
        Ok(configuration)
    }

    /// The JSON schema of the configuration document.
    pub fn json_schema() -> RootSchema {
        SchemaGenerator::default().into_root_schema_for::<Configuration>()
    }
}

/// Runtime type resolution for interfaces and unions.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TypeResolution {
    /// Name of the field a value may carry to name its own type
    /// default: "__typename"
    #[serde(default = "default_marker_field")]
    pub marker_field: String,

    /// Identify a value's type by a field only that type declares
    /// enabled by default
    #[serde(default = "default_discriminants")]
    pub discriminants: bool,
}

#[buildstructor::buildstructor]
impl TypeResolution {
    #[builder]
    pub fn new(marker_field: Option<String>, discriminants: Option<bool>) -> Self {
        Self {
            marker_field: marker_field.unwrap_or_else(default_marker_field),
            discriminants: discriminants.unwrap_or_else(default_discriminants),
        }
    }
}

impl Default for TypeResolution {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Field execution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Execution {
    /// Resolve the sibling fields of a query concurrently.
    /// Mutation fields always resolve one after the other.
    /// enabled by default
    #[serde(default = "default_concurrent_fields")]
    pub concurrent_fields: bool,
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder]
    pub fn new(concurrent_fields: Option<bool>) -> Self {
        Self {
            concurrent_fields: concurrent_fields.unwrap_or_else(default_concurrent_fields),
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_marker_field() -> String {
    "__typename".to_string()
}

fn default_discriminants() -> bool {
    true
}

fn default_concurrent_fields() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let configuration = Configuration::default();
        assert_eq!(configuration.type_resolution.marker_field, "__typename");
        assert!(configuration.type_resolution.discriminants);
        assert!(configuration.execution.concurrent_fields);
        assert_eq!(Configuration::from_yaml("{}").unwrap(), configuration);
    }

    #[test]
    fn test_configuration_serde() {
        let result = Configuration::from_yaml(include_str!("testdata/resolution.yaml"));
        assert_eq!(
            result.unwrap(),
            Configuration::builder()
                .type_resolution(
                    TypeResolution::builder()
                        .marker_field("kind")
                        .discriminants(false)
                        .build()
                )
                .execution(Execution::builder().concurrent_fields(false).build())
                .build()
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let error = Configuration::from_yaml(include_str!("testdata/unknown_field.yaml"))
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::DeserializeConfigError(_)));
    }

    #[test]
    fn test_empty_marker_field_is_rejected() {
        let error = Configuration::from_yaml("type_resolution:\n  marker_field: ''\n")
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "type_resolution.marker_field must not be empty: empty marker field"
        );
    }

    #[test]
    fn test_json_schema_lists_options() {
        let schema = serde_json::to_value(Configuration::json_schema()).unwrap();
        let definitions = schema.get("definitions").unwrap();
        assert!(definitions
            .pointer("/TypeResolution/properties/marker_field")
            .is_some());
        assert!(definitions
            .pointer("/Execution/properties/concurrent_fields")
            .is_some());
    }
}
