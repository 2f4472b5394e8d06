use logvm::Settings;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// Environment variables are process-wide, so every override is checked in
// this one test.
#[test]
fn test_env_overrides_file_and_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "[loader]\nprogram_dir = \"/from/file\"\nextension = \"prog\"\n",
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("LOGVM_LOADER__PROGRAM_DIR", "/from/env");
        env::set_var("LOGVM_LOADER__DUMP_BYTECODE", "true");
        env::set_var("LOGVM_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("LOGVM_LOADER__PROGRAM_DIR");
        env::remove_var("LOGVM_LOADER__DUMP_BYTECODE");
        env::remove_var("LOGVM_LOGGING__DEFAULT");
    }

    assert_eq!(settings.loader.program_dir, PathBuf::from("/from/env"));
    assert!(settings.loader.dump_bytecode);
    assert_eq!(settings.logging.default, "debug");
    // Untouched by env, taken from the file
    assert_eq!(settings.loader.extension, "prog");
    assert_eq!(settings.version, 1);
}
