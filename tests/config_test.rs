//! Integration tests for configuration loading and environment overrides.

use std::path::PathBuf;

use serial_test::serial;
use vrs_core::config::Config;
use vrs_core::storage::StorageLayout;

const ENV_KEYS: [&str; 5] = ["INPUT_DIR", "OUTPUTS_DIR", "STORAGE_DIR", "HOST", "PORT"];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vrstream.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
#[serial]
fn file_values_are_used_without_env() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
        [server]
        host = "127.0.0.1"
        port = 9100

        [storage]
        base_dir = "/srv/vrstream"
        "#,
    );

    let config = Config::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9100);

    let layout = StorageLayout::from_config(&config.storage);
    assert_eq!(layout.ingest_root, PathBuf::from("/srv/vrstream/input"));
    assert_eq!(layout.output_root, PathBuf::from("/srv/vrstream/output"));
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    clear_env();
    let (_dir, path) = write_config("[server]\nport = 9100\n");

    std::env::set_var("INPUT_DIR", "/data/in");
    std::env::set_var("OUTPUTS_DIR", "/data/out");
    std::env::set_var("STORAGE_DIR", "/data/keep");
    std::env::set_var("PORT", "9200");
    let config = Config::load_or_default(Some(&path)).unwrap();
    clear_env();

    assert_eq!(config.server.port, 9200);
    let layout = StorageLayout::from_config(&config.storage);
    assert_eq!(layout.ingest_root, PathBuf::from("/data/in"));
    assert_eq!(layout.output_root, PathBuf::from("/data/out"));
    assert_eq!(layout.storage_root, PathBuf::from("/data/keep"));
    // Derived paths follow the overridden output root.
    assert_eq!(layout.stream_candidates[0], PathBuf::from("/data/out/stream"));
    assert_eq!(layout.final_hls_dir, PathBuf::from("/data/out/final_hls"));
}

#[test]
#[serial]
fn invalid_port_env_keeps_file_value() {
    clear_env();
    let (_dir, path) = write_config("[server]\nport = 9100\n");

    std::env::set_var("PORT", "eighty");
    let config = Config::load_or_default(Some(&path)).unwrap();
    clear_env();

    assert_eq!(config.server.port, 9100);
}

#[test]
#[serial]
fn malformed_file_is_an_error() {
    clear_env();
    let (_dir, path) = write_config("[server\nport = ");
    assert!(Config::load_or_default(Some(&path)).is_err());
}

#[test]
fn pipeline_commands_round_out_validation() {
    let config = Config::from_toml(
        r#"
        [pipeline.vr180]
        program = "python"
        args = ["-m", "src.main", "{input}"]

        [pipeline.anaglyph]
        program = "python"
        args = ["-m", "src.anaglyph", "{input}", "{add_audio}"]
        "#,
    )
    .unwrap();
    assert!(config.validate().is_empty());
}
