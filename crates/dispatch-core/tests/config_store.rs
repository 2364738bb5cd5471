use std::path::PathBuf;

use tempfile::TempDir;

use dispatch_core::config::store::ConfigStore;

const SAMPLE: &str = r#"{
    "programs": [
        {
            "program_name": "api",
            "program_path": "/data/svn/api",
            "dest_path": "/srv/www/api/",
            "scripts": ["composer install --no-dev"],
            "ignore_files": ["runtime/"]
        },
        {
            "program_name": "worker",
            "program_path": "/data/svn/worker",
            "dest_path": "/srv/bin/worker/",
            "go_exec_path": "/usr/local/go/bin/go",
            "build_source_prefix": "/cmd"
        }
    ],
    "ignore_files": [".svn"],
    "dest_hosts": [
        {
            "alias": "web1",
            "username": "deploy",
            "host": "10.0.0.11",
            "key_file": "/home/deploy/.ssh/id_rsa"
        },
        {
            "alias": "web2",
            "username": "deploy",
            "host": "10.0.0.12",
            "port": 2222,
            "key_file": "/home/deploy/.ssh/id_rsa"
        }
    ],
    "save_path": "/var/log/dispatch"
}"#;

#[test]
fn explicit_path_is_used_as_is() {
    let store = ConfigStore::locate(Some(PathBuf::from("/etc/dispatch/prod.json"))).unwrap();
    assert_eq!(store.config_path(), PathBuf::from("/etc/dispatch/prod.json"));
}

#[test]
fn load_json_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = ConfigStore::from_path(&path).load().unwrap();

    assert_eq!(config.program_names(), vec!["api", "worker"]);
    assert_eq!(config.aliases(), vec!["web1", "web2"]);
    assert_eq!(config.host("web1").unwrap().port, 22);
    assert_eq!(config.host("web2").unwrap().port, 2222);
    assert_eq!(config.program("api").unwrap().build_exec(), None);
    assert_eq!(
        config.program("worker").unwrap().build_exec(),
        Some("/usr/local/go/bin/go")
    );
    assert_eq!(config.log_dir(), PathBuf::from("/var/log/dispatch"));
    assert_eq!(config.parallelism(), None);

    let api = config.program("api").unwrap();
    let excludes: Vec<&String> = config.excludes_for(api).collect();
    assert_eq!(excludes, vec![".svn", "runtime/"]);
}

#[test]
fn load_toml_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dispatch.toml");
    std::fs::write(
        &path,
        r#"
ignore_files = [".svn"]
save_path = ""
max_parallel = 4

[[programs]]
program_name = "api"
program_path = "/data/svn/api"
dest_path = "/srv/www/api/"

[[dest_hosts]]
alias = "web1"
username = "deploy"
host = "10.0.0.11"
key_file = "/home/deploy/.ssh/id_rsa"
"#,
    )
    .unwrap();

    let config = ConfigStore::from_path(&path).load().unwrap();

    assert_eq!(config.program_names(), vec!["api"]);
    assert_eq!(config.parallelism(), Some(4));
}

#[test]
fn missing_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigStore::from_path(&path).load().unwrap_err();

    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn malformed_json_points_at_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, "{\n  \"programs\": [\n    oops\n  ]\n}\n").unwrap();

    let err = ConfigStore::from_path(&path).load().unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("line 3"), "{message}");
}

#[test]
fn duplicate_host_alias_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let doubled = SAMPLE.replace("\"alias\": \"web2\"", "\"alias\": \"web1\"");
    std::fs::write(&path, doubled).unwrap();

    let err = ConfigStore::from_path(&path).load().unwrap_err();

    assert!(format!("{err:#}").contains("Duplicate destination host alias 'web1'"));
}

#[test]
fn reserved_program_name_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let reserved = SAMPLE.replace("\"program_name\": \"api\"", "\"program_name\": \"all\"");
    std::fs::write(&path, reserved).unwrap();

    let err = ConfigStore::from_path(&path).load().unwrap_err();

    assert!(format!("{err:#}").contains("'all' is reserved"));
}
