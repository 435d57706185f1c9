//! Unit tests for CLI commands

use crate::cli::{execute, Cli, Commands, OutputFormat};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

fn run(command: &Commands) -> String {
    let mut out = Vec::new();
    execute(command, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_generate_command_parses() {
    let cli = Cli::try_parse_from([
        "routedoc",
        "generate",
        "--manifest",
        "routes.yaml",
        "--format",
        "yaml",
    ])
    .unwrap();

    match cli.command {
        Commands::Generate {
            manifest,
            config,
            format,
            output,
        } => {
            assert_eq!(manifest.to_string_lossy(), "routes.yaml");
            assert!(config.is_none());
            assert_eq!(format, OutputFormat::Yaml);
            assert!(output.is_none());
        }
        Commands::FormatUrl { .. } => panic!("Expected Generate command"),
    }
    assert_eq!(cli.log_level, "warn");
}

#[test]
fn test_generate_requires_manifest() {
    assert!(Cli::try_parse_from(["routedoc", "generate"]).is_err());
}

#[test]
fn test_format_url_prints_template() {
    let out = run(&Commands::FormatUrl {
        pattern: "/users/:id/files/*".to_string(),
    });
    assert_eq!(out, "/users/{id}/files/{wildcard}\n");
}

#[test]
fn test_generate_from_json_manifest() {
    let mut manifest = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        manifest,
        r#"{{
            "schemas": [{{ "$id": "Pet", "type": "object" }}],
            "routes": [{{
                "method": ["get", "head"],
                "url": "/pets/:id",
                "schema": {{ "response": {{ "200": {{ "$ref": "Pet#" }} }} }}
            }}]
        }}"#
    )
    .unwrap();

    let out = run(&Commands::Generate {
        manifest: manifest.path().to_path_buf(),
        config: None,
        format: OutputFormat::Json,
        output: None,
    });
    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(doc["swagger"], "2.0");
    assert!(doc["paths"]["/pets/{id}"]["head"].is_object());
    assert_eq!(
        doc["paths"]["/pets/{id}"]["get"]["responses"]["200"]["schema"]["$ref"],
        "#/definitions/Pet"
    );
}

#[test]
fn test_generate_rejects_bad_method() {
    let mut manifest = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(manifest, "routes:\n  - method: 'GE T'\n    url: /x").unwrap();

    let mut out = Vec::new();
    let err = execute(
        &Commands::Generate {
            manifest: manifest.path().to_path_buf(),
            config: None,
            format: OutputFormat::Yaml,
            output: None,
        },
        &mut out,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("invalid HTTP method"));
}

#[test]
fn test_missing_manifest_is_an_error() {
    let mut out = Vec::new();
    let result = execute(
        &Commands::Generate {
            manifest: PathBuf::from("/nonexistent/routes.yaml"),
            config: None,
            format: OutputFormat::Json,
            output: None,
        },
        &mut out,
    );
    assert!(result.is_err());
}
