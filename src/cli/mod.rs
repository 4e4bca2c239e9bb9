//! ST-011: CLI subcommands — render, check.

use crate::core::context::Context;
use crate::core::expr::is_name;
use crate::core::filters;
use crate::core::template::Template;
use crate::core::value::Value;
use clap::Subcommand;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a template to stdout or a file
    Render {
        /// Template file (`-` for stdin)
        template: PathBuf,

        /// Context file (.json, .yaml, .yml, .toml); repeatable, later files win
        #[arg(short, long = "context")]
        context: Vec<PathBuf>,

        /// Inline binding KEY=VALUE (VALUE parsed as YAML); applied after files
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Write output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not register the built-in filters
        #[arg(long)]
        no_builtins: bool,
    },

    /// Compile a template and list the names it needs
    Check {
        /// Template file (`-` for stdin)
        template: PathBuf,
    },
}

/// Install the stderr subscriber. `STENCIL_LOG` takes precedence over `verbose`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<(), String> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("STENCIL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {}", e))
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Render {
            template,
            context,
            set,
            output,
            no_builtins,
        } => cmd_render(&template, &context, &set, output.as_deref(), !no_builtins),
        Commands::Check { template } => cmd_check(&template),
    }
}

fn read_template(path: &Path) -> Result<String, String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

/// Parse one `KEY=VALUE` pair. Values go through YAML so `n=3` is an int.
pub fn parse_set(pair: &str) -> Result<(String, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", pair))?;
    let key = key.trim();
    if !is_name(key) {
        return Err(format!("not a valid name: {:?}", key));
    }
    if raw.is_empty() {
        return Ok((key.to_string(), Value::from("")));
    }
    let doc: serde_json::Value = serde_yaml_ng::from_str(raw)
        .map_err(|e| format!("bad value for {}: {}", key, e))?;
    Ok((key.to_string(), Value::from(doc)))
}

/// Base context layers, lowest precedence first.
fn build_layers(files: &[PathBuf], sets: &[String], builtins: bool) -> Result<Vec<Context>, String> {
    let mut layers = Vec::with_capacity(files.len() + 2);
    if builtins {
        layers.push(filters::builtins());
    }
    for path in files {
        let ctx = Context::from_file(path)?;
        debug!(path = %path.display(), names = ctx.len(), "loaded context file");
        layers.push(ctx);
    }
    let inline = sets
        .iter()
        .map(|pair| parse_set(pair))
        .collect::<Result<Context, String>>()?;
    layers.push(inline);
    Ok(layers)
}

fn cmd_render(
    template: &Path,
    files: &[PathBuf],
    sets: &[String],
    output: Option<&Path>,
    builtins: bool,
) -> Result<(), String> {
    let source = read_template(template)?;
    let layers = build_layers(files, sets, builtins)?;
    let compiled = Template::with_contexts(&source, layers)
        .map_err(|e| format!("{}: {}", template.display(), e))?;
    debug!(
        names = ?compiled.base_context().names().collect::<Vec<_>>(),
        "base context"
    );
    let rendered = compiled
        .render(None)
        .map_err(|e| format!("{}: {}", template.display(), e))?;

    match output {
        Some(path) => std::fs::write(path, &rendered)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e)),
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn cmd_check(template: &Path) -> Result<(), String> {
    let source = read_template(template)?;
    let compiled =
        Template::new(&source).map_err(|e| format!("{}: {}", template.display(), e))?;
    println!("OK: {}", template.display());
    for name in compiled.free_variables() {
        println!("  {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_st011_logging_installs_once() {
        let _ = init_logging(false);
        let err = init_logging(true).unwrap_err();
        assert!(err.contains("failed to initialize logging"));
    }

    #[test]
    fn test_st011_parse_set_types() {
        assert_eq!(parse_set("n=3").unwrap(), ("n".to_string(), Value::Int(3)));
        assert_eq!(
            parse_set("name=Ada Lovelace").unwrap(),
            ("name".to_string(), Value::from("Ada Lovelace"))
        );
        assert_eq!(parse_set("flag=true").unwrap().1, Value::Bool(true));
        assert_eq!(parse_set("empty=").unwrap().1, Value::from(""));
        assert_eq!(parse_set("xs=[a, b]").unwrap().1, Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_st011_parse_set_rejects() {
        assert!(parse_set("novalue").unwrap_err().contains("KEY=VALUE"));
        assert!(parse_set("9x=1").unwrap_err().contains("not a valid name"));
    }

    #[test]
    fn test_st011_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("page.tpl");
        std::fs::write(
            &template,
            "{% for t in topics %}{{t|upper}};{% endfor %}{{who}} {{n}}",
        )
        .unwrap();
        let ctx = dir.path().join("ctx.yaml");
        std::fs::write(&ctx, "topics: [rust, templates]\nwho: base\n").unwrap();
        let out = dir.path().join("out.txt");

        cmd_render(
            &template,
            &[ctx],
            &["who=cli".to_string(), "n=7".to_string()],
            Some(&out),
            true,
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "RUST;TEMPLATES;cli 7"
        );
    }

    #[test]
    fn test_st011_render_without_builtins_fails_on_filter() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t.tpl");
        std::fs::write(&template, "{{s|upper}}").unwrap();
        let err = cmd_render(&template, &[], &["s=x".to_string()], None, false).unwrap_err();
        assert!(err.contains("unbound name"));
    }

    #[test]
    fn test_st011_check_reports_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("bad.tpl");
        std::fs::write(&template, "{% if x %}").unwrap();
        let err = cmd_check(&template).unwrap_err();
        assert!(err.contains("unmatched action tag"));
    }

    #[test]
    fn test_st011_missing_template() {
        let err = cmd_check(Path::new("/nonexistent/t.tpl")).unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
