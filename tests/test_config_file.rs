use odata_client::config::{ConfigError, load_config, load_config_from_path};
use odata_client::schema::RawEntity;
use std::fs;
use tempfile::tempdir;

const SAMPLE: &str = r#"
[connection]
base_url = "http://erp.local"
database = "trade"
username = "odata"
read_timeout_secs = 30.0

[entities.products]
entity_name = "Catalog_Номенклатура"
fields = [
    { name = "id", alias = "Ref_Key" },
    { name = "name", alias = "Description" },
    { name = "unit", alias = "ЕдиницаИзмерения", nested = [
        { name = "id", alias = "Ref_Key" },
        { name = "Code" },
    ] },
]
"#;

#[test]
fn test_load_connection_and_entities() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("odata.toml");
    fs::write(&path, SAMPLE).expect("write config");

    let config = load_config_from_path(&path).expect("config loads");
    assert_eq!(
        config.connection.service_root(),
        "http://erp.local/trade/odata/standard.odata/"
    );
    assert_eq!(config.connection.username.as_deref(), Some("odata"));
    assert_eq!(config.connection.password, None);
    assert_eq!(config.connection.read_timeout_secs, 30.0);
    assert_eq!(config.connection.connect_timeout_secs, 10.0);

    let descriptor = config
        .descriptor::<RawEntity>("products")
        .expect("configured entity");
    assert_eq!(descriptor.entity_name(), "Catalog_Номенклатура");
    assert_eq!(
        descriptor.mapping().select_paths(),
        vec![
            "Ref_Key",
            "Description",
            "ЕдиницаИзмерения/Ref_Key",
            "ЕдиницаИзмерения/Code",
        ]
    );
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");
    let err = load_config(Some(&path)).expect_err("missing file");
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[connection\nbase_url = 1").expect("write config");
    assert!(matches!(
        load_config_from_path(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_no_path_uses_defaults() {
    let config = load_config(None).expect("defaults");
    assert!(config.entities.is_empty());
    assert!(config.connection.validate().is_err());
}

#[test]
fn test_unusable_timeouts_fail_validation() {
    let dir = tempdir().expect("temp dir");
    let cases = [
        ("read_timeout_secs = inf", "read_timeout_secs"),
        ("read_timeout_secs = 1e30", "read_timeout_secs"),
        ("connect_timeout_secs = -5.0", "connect_timeout_secs"),
    ];

    for (line, expected_field) in cases {
        let path = dir.path().join("timeouts.toml");
        fs::write(
            &path,
            format!("[connection]\nbase_url = \"http://erp.local\"\n{line}\n"),
        )
        .expect("write config");

        let config = load_config_from_path(&path).expect("valid TOML loads");
        match config.connection.validate() {
            Err(ConfigError::InvalidTimeout { field, .. }) => {
                assert_eq!(field, expected_field, "for `{line}`")
            }
            other => panic!("expected invalid timeout for `{line}`, got {other:?}"),
        }
    }
}
