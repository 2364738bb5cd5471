//! Config parser with helpful error messages
//!
//! JSON is the primary format; a `.toml` file with the same keys is accepted
//! as well.

use super::schema::DispatchConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a config file, picking the format from its extension
pub fn parse_config(path: &Path) -> Result<DispatchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        parse_toml_str(&content)
    } else {
        parse_json_str(&content)
    };
    parsed.with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse JSON config content from string
pub fn parse_json_str(content: &str) -> Result<DispatchConfig> {
    let config: DispatchConfig =
        serde_json::from_str(content).map_err(|e| enhance_json_error(e, content))?;

    validate_config(&config)?;

    Ok(config)
}

/// Parse TOML config content from string
pub fn parse_toml_str(content: &str) -> Result<DispatchConfig> {
    let config: DispatchConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    validate_config(&config)?;

    Ok(config)
}

/// Point at the offending line of a JSON document
fn enhance_json_error(error: serde_json::Error, content: &str) -> anyhow::Error {
    let line_num = error.line();
    if line_num == 0 {
        return anyhow::anyhow!("JSON parsing error: {}", error);
    }
    let context = get_line_context(content, line_num);
    anyhow::anyhow!(
        "JSON parsing error at line {}:\n{}\n\nError: {}",
        line_num,
        context,
        error
    )
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].lines().count().max(1));

    match line_hint {
        Some(line_num) => {
            let context = get_line_context(content, line_num);
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line_num,
                context,
                error
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", error),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate configuration after parsing
fn validate_config(config: &DispatchConfig) -> Result<()> {
    config.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const SAMPLE: &str = r#"{
  "programs": [
    {
      "program_name": "api",
      "program_path": "/srv/src/api",
      "dest_path": "/srv/www/",
      "scripts": ["composer install"],
      "ignore_files": ["runtime/"]
    },
    {
      "program_name": "svc",
      "program_path": "/srv/src/svc",
      "dest_path": "/srv/bin/",
      "go_exec_path": "/usr/local/go/bin/go",
      "build_source_prefix": "/cmd"
    }
  ],
  "ignore_files": [".svn"],
  "dest_hosts": [
    {"username": "deploy", "host": "10.0.0.1", "port": 22, "key_file": "/k", "alias": "h1"},
    {"username": "deploy", "host": "10.0.0.2", "key_file": "/k", "alias": "h2"}
  ],
  "save_path": "/var/log/dispatch"
}"#;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_json_str(SAMPLE).unwrap();
        assert_eq!(config.programs.len(), 2);
        assert_eq!(config.dest_hosts.len(), 2);
        assert_eq!(config.dest_hosts[1].port, 22);
        assert_eq!(config.program("api").unwrap().scripts, vec!["composer install"]);
        assert_eq!(config.program("api").unwrap().build_exec(), None);
        assert_eq!(
            config.program("svc").unwrap().build_exec(),
            Some("/usr/local/go/bin/go")
        );
        assert_eq!(config.aliases(), vec!["h1", "h2"]);
        assert_eq!(config.parallelism(), None);
    }

    #[test]
    fn test_excludes_are_global_then_program() {
        let config = parse_json_str(SAMPLE).unwrap();
        let api = config.program("api").unwrap();
        let excludes: Vec<&String> = config.excludes_for(api).collect();
        assert_eq!(excludes, vec![".svn", "runtime/"]);
    }

    #[test]
    fn test_empty_go_exec_path_is_not_buildable() {
        let json = r#"{"programs": [{"program_name": "a", "program_path": "/a", "dest_path": "/b", "go_exec_path": ""}]}"#;
        let config = parse_json_str(json).unwrap();
        assert_eq!(config.programs[0].build_exec(), None);
    }

    #[test]
    fn test_parse_invalid_json_points_at_line() {
        let json = "{\n  \"programs\": [\n    {\"program_name\": }\n  ]\n}";
        let err = parse_json_str(json).unwrap_err().to_string();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains(">>>"), "{err}");
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let json = r#"{"dest_hosts": [
            {"username": "u", "host": "a", "key_file": "/k", "alias": "h1"},
            {"username": "u", "host": "b", "key_file": "/k", "alias": "h1"}
        ]}"#;
        let err = parse_json_str(json).unwrap_err().to_string();
        assert!(err.contains("Duplicate destination host alias 'h1'"));
    }

    #[test]
    fn test_duplicate_program_rejected() {
        let json = r#"{"programs": [
            {"program_name": "a", "program_path": "/a", "dest_path": "/x"},
            {"program_name": "a", "program_path": "/b", "dest_path": "/y"}
        ]}"#;
        assert!(parse_json_str(json).is_err());
    }

    #[test]
    fn test_parse_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
save_path = "/tmp/logs"
max_parallel = 4
ignore_files = [".svn"]

[[programs]]
program_name = "api"
program_path = "/srv/src/api"
dest_path = "/srv/www/"

[[dest_hosts]]
alias = "h1"
username = "deploy"
host = "10.0.0.1"
key_file = "/k"
"#
        )
        .unwrap();

        let config = parse_config(file.path()).unwrap();
        assert_eq!(config.programs[0].name, "api");
        assert_eq!(config.dest_hosts[0].port, 22);
        assert_eq!(config.parallelism(), Some(4));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = parse_config(Path::new("/nonexistent/dispatch.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/dispatch.json"));
    }
}
