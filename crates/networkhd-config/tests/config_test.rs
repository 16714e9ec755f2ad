#![allow(clippy::unwrap_used)]
// Loading, credential resolution, and translation to `CoordinatorConfig`.
//
// File and environment tests run inside `figment::Jail`, which isolates
// the working directory and restores environment variables afterwards.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use networkhd_config::{
    Config, ConfigError, Defaults, Profile, load_config_from, profile_to_coordinator_config,
    resolve_password, save_config_to,
};
use networkhd_core::HostKeyPolicy;

// ── Helpers ─────────────────────────────────────────────────────────

const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
poll_interval = 30

[profiles.home]
host = "10.0.0.5"
password = "hunter2"
use_keyring = false

[profiles.lab]
host = "192.168.50.2"
port = 2222
username = "admin"
use_keyring = false
host_key_policy = "reject"
poll_interval = 120
retry_attempts = 5
"#;

fn offline_profile(host: &str) -> Profile {
    Profile {
        use_keyring: false,
        ..Profile::new(host)
    }
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn loads_profiles_and_defaults_from_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

        assert_eq!(config.default_profile.as_deref(), Some("home"));
        assert_eq!(config.defaults.poll_interval, 30);
        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles["lab"].port, Some(2222));
        assert_eq!(
            config.profiles["lab"].host_key_policy,
            Some(HostKeyPolicy::Reject)
        );
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("NETWORKHD_PROFILES__HOME__HOST", "10.0.0.99");
        jail.set_env("NETWORKHD_DEFAULTS__TIMEOUT", "20");

        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

        assert_eq!(config.profiles["home"].host, "10.0.0.99");
        assert_eq!(config.defaults.timeout, 20);
        Ok(())
    });
}

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let config = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;

        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.poll_interval, 60);
        assert!(config.profiles.is_empty());
        Ok(())
    });
}

#[test]
fn profile_lookup_uses_default_name() {
    let mut config = Config::default();
    config
        .profiles
        .insert("default".into(), offline_profile("10.0.0.5"));

    let (name, profile) = config.profile(None).unwrap();
    assert_eq!(name, "default");
    assert_eq!(profile.host, "10.0.0.5");
    assert!(matches!(
        config.profile(Some("missing")),
        Err(ConfigError::Validation { .. })
    ));
}

#[test]
fn save_then_load_keeps_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut config = Config::default();
    config.profiles.insert(
        "office".into(),
        Profile {
            port: Some(10023),
            ..offline_profile("10.1.1.1")
        },
    );

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    let office = &loaded.profiles["office"];
    assert_eq!(office.host, "10.1.1.1");
    assert_eq!(office.port, Some(10023));
    assert!(!office.use_keyring);
}

// ── Credentials ─────────────────────────────────────────────────────

#[test]
fn password_env_wins_over_plaintext() {
    Jail::expect_with(|jail| {
        jail.set_env("NETWORKHD_PASSWORD", "from-env");
        let profile = Profile {
            password: Some("plaintext".into()),
            ..offline_profile("h")
        };

        let pw = resolve_password(&profile, "home").map_err(|e| e.to_string())?;
        assert_eq!(pw.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn password_falls_back_to_plaintext_then_default() {
    Jail::expect_with(|_| {
        let plaintext = Profile {
            password: Some("plaintext".into()),
            ..offline_profile("h")
        };
        let pw = resolve_password(&plaintext, "home").map_err(|e| e.to_string())?;
        assert_eq!(pw.expose_secret(), "plaintext");

        let bare = offline_profile("h");
        let pw = resolve_password(&bare, "home").map_err(|e| e.to_string())?;
        assert_eq!(pw.expose_secret(), "networkhd");

        let strict = Profile {
            allow_default_password: false,
            ..offline_profile("h")
        };
        assert!(matches!(
            resolve_password(&strict, "home"),
            Err(ConfigError::NoCredentials { .. })
        ));
        Ok(())
    });
}

// ── Translation ─────────────────────────────────────────────────────

#[test]
fn profile_overrides_apply_on_top_of_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
        let (name, lab) = config.profile(Some("lab")).map_err(|e| e.to_string())?;

        let cfg = profile_to_coordinator_config(lab, name, &config.defaults)
            .map_err(|e| e.to_string())?;

        assert_eq!(cfg.connection.host, "192.168.50.2");
        assert_eq!(cfg.connection.port, 2222);
        assert_eq!(cfg.connection.username, "admin");
        assert_eq!(cfg.connection.host_key_policy, HostKeyPolicy::Reject);
        assert_eq!(cfg.connection.timeout, Duration::from_secs(10));
        assert_eq!(cfg.poll_interval, Duration::from_secs(120));
        assert_eq!(cfg.retry_attempts, 5);
        assert_eq!(cfg.retry_delay, Duration::from_secs(2));
        assert!(cfg.connection.uses_default_password());

        let (name, home) = config.profile(None).map_err(|e| e.to_string())?;
        let cfg = profile_to_coordinator_config(home, name, &config.defaults)
            .map_err(|e| e.to_string())?;
        assert_eq!(cfg.connection.port, 10022);
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.connection.password.expose_secret(), "hunter2");
        Ok(())
    });
}

#[test]
fn poll_interval_outside_bounds_is_rejected() {
    let defaults = Defaults::default();
    for secs in [5, 301] {
        let profile = Profile {
            poll_interval: Some(secs),
            ..offline_profile("10.0.0.5")
        };
        let err = profile_to_coordinator_config(&profile, "p", &defaults).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "poll_interval"),
            "{secs}s accepted"
        );
    }
}

#[test]
fn empty_host_is_rejected() {
    let err = profile_to_coordinator_config(&offline_profile("  "), "p", &Defaults::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
}
