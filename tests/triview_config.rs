use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use triview::config::TriviewConfig;
use triview::media::FacingMode;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "TRIVIEW_CONFIG",
        "TRIVIEW_CAMERA_WIDTH",
        "TRIVIEW_CAMERA_HEIGHT",
        "TRIVIEW_CAMERA_FACING",
        "TRIVIEW_NOTICE_TTL_MS",
        "TRIVIEW_DETECT_TIMEOUT_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = TriviewConfig::load().expect("load config");

    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 360);
    assert_eq!(cfg.facing_mode(), FacingMode::Environment);
    assert_eq!(cfg.notice_ttl, Duration::from_millis(3000));
    assert_eq!(cfg.detect_timeout, None);
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": { "width": 1280, "height": 720, "facing": "user" },
        "notifications": { "ttl_ms": 5000 },
        "detection": { "timeout_ms": 10000 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("TRIVIEW_CONFIG", file.path());
    std::env::set_var("TRIVIEW_CAMERA_HEIGHT", "480");
    std::env::set_var("TRIVIEW_DETECT_TIMEOUT_MS", "0");

    let cfg = TriviewConfig::load().expect("load config");

    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.facing_mode(), FacingMode::User);
    assert_eq!(cfg.notice_ttl, Duration::from_millis(5000));
    assert_eq!(cfg.detect_timeout, None);

    clear_env();
}

#[test]
fn loads_toml_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[camera]
facing = "environment"

[detection]
timeout_ms = 2500
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("TRIVIEW_CONFIG", file.path());

    let cfg = TriviewConfig::load().expect("load config");

    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.detect_timeout, Some(Duration::from_millis(2500)));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("TRIVIEW_CAMERA_FACING", "sideways");
    assert!(TriviewConfig::load().is_err());
    clear_env();

    std::env::set_var("TRIVIEW_NOTICE_TTL_MS", "0");
    assert!(TriviewConfig::load().is_err());
    clear_env();

    std::env::set_var("TRIVIEW_CAMERA_WIDTH", "wide");
    let err = TriviewConfig::load().unwrap_err();
    assert!(err.to_string().contains("TRIVIEW_CAMERA_WIDTH"));
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("TRIVIEW_CONFIG", file.path());
    assert!(TriviewConfig::load().is_err());

    clear_env();
}
