use std::io::Write;

use prototype_api::config::{
    AppConfig, LogFormat, MongoSection, OpenAiSection, ServerConfig, StoreBackendKind,
};

#[test]
fn mongo_password_requires_username() {
    let config = AppConfig {
        mongo: MongoSection {
            password: Some("secret".into()),
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(
        config.validate().is_err(),
        "Expected password without username to fail validation"
    );
}

#[test]
fn memory_backend_skips_mongo_checks() {
    let config = AppConfig {
        mongo: MongoSection {
            backend: StoreBackendKind::Memory,
            host: String::new(),
            port: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    config
        .validate()
        .expect("memory backend should not need a reachable host");
}

#[test]
fn blank_cors_origin_is_rejected() {
    let config = AppConfig {
        server: ServerConfig {
            cors_origin: "  ".into(),
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn blank_default_model_is_rejected() {
    let config = AppConfig {
        openai: OpenAiSection {
            default_model: String::new(),
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn config_file_is_layered_over_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        r#"
[server]
port = 9100
docs_enabled = false

[mongo]
backend = "memory"

[logging]
level = "debug"
format = "text"
"#
    )
    .unwrap();

    // Only this test touches the process environment
    std::env::set_var("PROTOTYPE_CONFIG", file.path());
    let config = AppConfig::load().expect("config should load");
    std::env::remove_var("PROTOTYPE_CONFIG");

    assert_eq!(config.server.port, 9100);
    assert!(!config.server.docs_enabled);
    assert_eq!(config.mongo.backend, StoreBackendKind::Memory);
    assert_eq!(config.logging.level, "debug");
    assert!(matches!(config.logging.format, LogFormat::Text));
    assert_eq!(config.server.host, "0.0.0.0");
}
