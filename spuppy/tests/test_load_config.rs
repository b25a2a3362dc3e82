use spuppy::load_config::{load_config, load_settings};
use std::fs::write;
use tempfile::NamedTempFile;

const VALID_YAML: &str = r#"
sharepoint:
  tenant: 00000000-0000-0000-0000-000000000000
  client: 11111111-1111-1111-1111-111111111111
  site: https://contoso.sharepoint.com/sites/team/
  secret: s3cr3t
runtime:
  chunk_size: 10485760
"#;

fn config_file(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), contents).unwrap();
    file
}

#[test]
fn test_load_config_success() {
    let file = config_file(VALID_YAML);

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.sharepoint.tenant, "00000000-0000-0000-0000-000000000000");
    assert_eq!(config.sharepoint.client, "11111111-1111-1111-1111-111111111111");
    assert_eq!(config.sharepoint.site, "https://contoso.sharepoint.com/sites/team/");
    assert_eq!(config.sharepoint.secret, "s3cr3t");
    assert_eq!(config.runtime.chunk_size, 10_485_760);
    assert!(!format!("{config:?}").contains("s3cr3t"), "secret must not be printed");
}

#[test]
fn test_load_settings_merges_command_line_values() {
    let file = config_file(VALID_YAML);

    let (credentials, runtime) =
        load_settings(file.path(), Some("projects".to_string()), true).expect("settings");

    assert_eq!(credentials.subsite(), Some("projects"));
    assert_eq!(
        credentials.target_url(),
        "https://contoso.sharepoint.com/sites/team/projects"
    );
    assert!(runtime.debug());
    assert_eq!(runtime.chunk_size(), 10_485_760);
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");

    let err = load_config(&path).unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Failed to read config file"), "{message}");
    assert!(message.contains("absent.yaml"), "{message}");
}

#[test]
fn test_invalid_yaml_is_rejected() {
    let file = config_file("sharepoint: [unterminated\n");

    let err = load_config(file.path()).unwrap_err();

    assert!(err.to_string().starts_with("Failed to parse config YAML"), "{err}");
}

#[test]
fn test_missing_key_is_rejected() {
    let file = config_file(
        r#"
sharepoint:
  tenant: t
  client: c
  site: https://contoso.sharepoint.com/sites/team
runtime:
  chunk_size: 1024
"#,
    );

    let err = load_config(file.path()).unwrap_err();

    assert!(err.to_string().contains("secret"), "{err}");
}

#[test]
fn test_zero_chunk_size_is_rejected() {
    let file = config_file(&VALID_YAML.replace("10485760", "0"));

    let err = load_settings(file.path(), None, false).unwrap_err();

    let chain = format!("{err:#}");
    assert!(chain.starts_with("Invalid configuration in"), "{chain}");
    assert!(chain.contains("runtime.chunk_size must be a positive number"), "{chain}");
}

#[test]
fn test_empty_site_is_rejected() {
    let file = config_file(&VALID_YAML.replace("https://contoso.sharepoint.com/sites/team/", "\"\""));

    let err = load_settings(file.path(), None, false).unwrap_err();

    assert!(format!("{err:#}").contains("sharepoint.site must not be empty"));
}
