use leadbook::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "LEADBOOK_PROFILE",
    "LEADBOOK_API_BIND_ADDR",
    "LEADBOOK_LOG_LEVEL",
    "LEADBOOK_DATABASE_URL",
    "LEADBOOK_JWT_SECRET",
    "LEADBOOK_SESSION_TTL_MINUTES",
    "LEADBOOK_SEED_DEMO_USER",
    "LEADBOOK_RATE_LIMIT_WRITE_PER_MINUTE",
    "LEADBOOK_RATE_LIMIT_READ_PER_MINUTE",
];

const PRODUCTION_SECRET: &str = "a-production-secret-that-is-long-enough";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        for key in KEYS {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(dir.path().to_path_buf())
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.session_ttl_minutes, 720);
    assert_eq!(cfg.rate_limit.write_per_minute, 10);
    assert_eq!(cfg.rate_limit.read_per_minute, 30);
    assert!(!cfg.seed_demo_user);
    assert!(cfg.jwt_secret.is_none());
    cfg.signing_secret().expect("local profile has a signing secret");
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "LEADBOOK_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "LEADBOOK_API_BIND_ADDR=192.168.0.10:5000\nLEADBOOK_LOG_LEVEL=debug\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "LEADBOOK_API_BIND_ADDR=10.0.0.5:6000\n",
    );
    // Profile is chosen in .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "LEADBOOK_PROFILE=test\nLEADBOOK_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader(&temp_dir).load().expect("layered config loads");
    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "LEADBOOK_RATE_LIMIT_WRITE_PER_MINUTE=5\nLEADBOOK_SEED_DEMO_USER=false\nUNRELATED=1\n",
    );
    unsafe {
        env::set_var("LEADBOOK_RATE_LIMIT_WRITE_PER_MINUTE", "20");
        env::set_var("LEADBOOK_SEED_DEMO_USER", "true");
    }

    let cfg = loader(&temp_dir).load().expect("config loads");
    assert_eq!(cfg.rate_limit.write_per_minute, 20);
    assert!(cfg.seed_demo_user);
    clear_env();
}

#[test]
fn non_development_profile_requires_jwt_secret() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "LEADBOOK_PROFILE=prod\n");

    let err = loader(&temp_dir).load().expect_err("secret is mandatory");
    assert!(matches!(err, ConfigError::MissingJwtSecret));

    write_env_file(
        &temp_dir,
        ".env.prod",
        &format!("LEADBOOK_JWT_SECRET={PRODUCTION_SECRET}\n"),
    );
    let cfg = loader(&temp_dir).load().expect("secret provided");
    assert_eq!(cfg.signing_secret().unwrap(), PRODUCTION_SECRET);
    assert!(!cfg.redacted_json().unwrap().contains(PRODUCTION_SECRET));
}

#[test]
fn short_jwt_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "LEADBOOK_JWT_SECRET=short\n");

    let err = loader(&temp_dir).load().expect_err("short secret fails");
    assert!(matches!(err, ConfigError::JwtSecretTooShort { length: 5 }));
}

#[test]
fn invalid_values_are_reported() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();

    write_env_file(&temp_dir, ".env", "LEADBOOK_API_BIND_ADDR=not-an-address\n");
    let err = loader(&temp_dir).load().expect_err("bad bind addr");
    assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));

    write_env_file(&temp_dir, ".env", "LEADBOOK_SESSION_TTL_MINUTES=soon\n");
    let err = loader(&temp_dir).load().expect_err("non-numeric ttl");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    write_env_file(&temp_dir, ".env", "LEADBOOK_RATE_LIMIT_READ_PER_MINUTE=0\n");
    let err = loader(&temp_dir).load().expect_err("zero read limit");
    assert!(matches!(
        err,
        ConfigError::InvalidRateLimit {
            field: "read_per_minute",
            ..
        }
    ));
}
