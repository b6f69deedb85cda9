use super::*;

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rwld.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.partitions, 16);
    assert_eq!(config.mirrors, 1);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let (_dir, path) = write_config("partitions = 4\n");
    let config = Config::load(&path).unwrap();

    assert_eq!(config.partitions, 4);
    assert_eq!(config.mirrors, 1);
    assert_eq!(config.log_filter, "info");
    assert_eq!(config.router().unwrap().partitions(), 4);
}

#[test]
fn full_file_is_parsed() {
    let (_dir, path) = write_config(
        r#"
partitions = 8
mirrors = 3
log_path = "/var/log/rwld.log"
log_filter = "rwl_engine=debug"
"#,
    );
    let config = Config::load(&path).unwrap();

    assert_eq!(
        config,
        Config {
            partitions: 8,
            mirrors: 3,
            log_path: Some(PathBuf::from("/var/log/rwld.log")),
            log_filter: "rwl_engine=debug".to_string(),
        }
    );
    assert_eq!(
        config.log_path().unwrap(),
        PathBuf::from("/var/log/rwld.log")
    );
}

#[test]
fn zero_partitions_is_rejected() {
    let (_dir, path) = write_config("partitions = 0\n");
    assert!(matches!(
        Config::load(&path),
        Err(LifecycleError::Router(RouterError::NoPartitions))
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let (_dir, path) = write_config("partitions = 2\nreplicas = 1\n");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, LifecycleError::Config(p, _) if p == path));
}

#[test]
fn malformed_toml_is_rejected() {
    let (_dir, path) = write_config("partitions = \"many\"\n");
    assert!(matches!(
        Config::load(&path),
        Err(LifecycleError::Config(_, _))
    ));
}
