use super::GenerationConfig;
use crate::constants::OUTLINE_SCHEMA;
use crate::errors::Error;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use std::fs;

use tracing::info;

static OUTLINE_VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    let schema = serde_json::from_str(OUTLINE_SCHEMA).expect("outline schema is valid JSON");
    jsonschema::validator_for(&schema).expect("outline schema compiles")
});

/// Loads and parses a generation configuration from a YAML file
///
/// # Arguments
///
/// * `file_path` - Path to the YAML configuration file
///
/// # Returns
///
/// * `Result<GenerationConfig, Error>` - The parsed configuration on success
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read
/// * The YAML content cannot be parsed into a GenerationConfig
/// * The outline section does not satisfy the outline schema
pub fn load_generation_config(file_path: &str) -> Result<GenerationConfig, Error> {
    let yaml_str = fs::read_to_string(file_path)?;
    let config: GenerationConfig = serde_yaml::from_str(&yaml_str)?;
    validate_outline(&config)?;
    info!(
        "Loaded outline '{}' with {} chapters",
        config.outline.title,
        config.outline.chapters.len()
    );
    Ok(config)
}

/// Checks the outline section against the embedded JSON Schema
fn validate_outline(config: &GenerationConfig) -> Result<(), Error> {
    let value = serde_json::to_value(&config.outline)?;
    if let Some(error) = OUTLINE_VALIDATOR.iter_errors(&value).next() {
        return Err(Error::OutlineInvalid(error.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID_CONFIG: &str = r#"
outline:
  title: "Systems Programming with Rust"
  subject: "Computer Science"
  level: "Intermediate"
  chapters:
    - title: "Ownership"
      order_index: 0
      topics: ["moves", "borrows"]
      learning_objectives: ["explain the borrow checker"]
output:
  format: "json"
  file: "out/book.json"
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_valid_config() {
        let file = write_config(VALID_CONFIG);
        let config = load_generation_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.outline.chapters.len(), 1);
        assert_eq!(config.outline.chapters[0].topics.len(), 2);
        assert_eq!(config.output.file, "out/book.json");
    }

    #[test]
    fn rejects_an_outline_without_chapters() {
        let file = write_config(
            r#"
outline:
  title: "Empty"
  subject: "Nothing"
  level: "Introductory"
  chapters: []
"#,
        );
        let err = load_generation_config(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::OutlineInvalid(_)));
    }

    #[test]
    fn rejects_a_missing_file() {
        let err = load_generation_config("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
