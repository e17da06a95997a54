//! binform - Inspect directive expressions and field annotations
//!
//! This tool parses the expression language and directive strings used in
//! binform schemas, prints their compiled form, and optionally evaluates
//! expressions against values supplied on the command line.

use anyhow::{bail, Context, Result};
use binform_core::{builtin_width, eval, Directive, Resolver, Value};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Inspect binform directive expressions and field annotations
#[derive(Parser, Debug)]
#[command(name = "binform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an expression, print its tree form and evaluate it
    Expr(ExprArgs),
    /// Parse a directive string and print its compiled components
    Directive(DirectiveArgs),
}

#[derive(Args, Debug)]
struct ExprArgs {
    /// The expression, e.g. '%Count > 0 && $limit != 0'
    expression: String,

    /// Print the parsed tree as a debug dump instead of evaluating
    #[arg(long)]
    ast: bool,

    /// Field value for `%name` references, as NAME=VALUE (repeatable)
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,

    /// Variable value for `$name` references, as NAME=VALUE (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

#[derive(Args, Debug)]
struct DirectiveArgs {
    /// The directive string, e.g. 'type=dynarray,size=uint32,if=%Flag'
    directive: String,
}

/// Resolver over command-line supplied values.
///
/// Bare identifiers resolve to the builtin type widths, matching what the
/// decode engine provides.
struct CliResolver {
    fields: HashMap<String, Value>,
    vars: HashMap<String, Value>,
}

impl Resolver for CliResolver {
    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn ident(&self, name: &str) -> Option<Value> {
        builtin_width(name).map(Value::Int)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Expr(args) => run_expr(args),
        Command::Directive(args) => run_directive(args),
    }
}

fn run_expr(args: &ExprArgs) -> Result<()> {
    let expr = binform_core::parse(&args.expression)
        .with_context(|| format!("failed to parse expression: {}", args.expression))?;

    debug!("parsed: {expr}");

    if args.ast {
        println!("{expr:#?}");
        return Ok(());
    }

    let resolver = CliResolver {
        fields: parse_bindings(&args.fields)?,
        vars: parse_bindings(&args.vars)?,
    };
    let value = eval(&resolver, &expr)
        .with_context(|| format!("failed to evaluate: {expr}"))?;

    println!("{expr} = {value}");
    Ok(())
}

fn run_directive(args: &DirectiveArgs) -> Result<()> {
    let dir = Directive::parse(&args.directive)
        .with_context(|| format!("failed to parse directive: {}", args.directive))?;

    if let Some(kind) = dir.kind {
        println!("type: {kind}");
    }
    if let Some(size) = &dir.size {
        println!("size: {size}");
    }
    if let Some(cond) = &dir.cond {
        println!("if:   {cond}");
    }
    if let Some(ptrs) = &dir.ptrs {
        println!("ptrs: {ptrs}");
    }
    for (name, expr) in &dir.vars {
        println!("${name} = {expr}");
    }
    Ok(())
}

/// Parse repeated NAME=VALUE pairs into a value map
fn parse_bindings(pairs: &[String]) -> Result<HashMap<String, Value>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let Some((name, raw)) = pair.split_once('=') else {
            bail!("binding '{pair}' is missing '='");
        };
        map.insert(name.trim().to_string(), parse_literal(raw.trim()));
    }
    Ok(map)
}

/// Interpret a command-line literal: bool, integer, float, else text
fn parse_literal(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("true"), Value::Bool(true));
        assert_eq!(parse_literal("-42"), Value::Int(-42));
        assert_eq!(parse_literal("1.5"), Value::Float(1.5));
        assert_eq!(parse_literal("hello"), Value::Text("hello".into()));
    }

    #[test]
    fn test_parse_bindings() {
        let map = parse_bindings(&["Count=3".into(), "Name=abc".into()]).unwrap();
        assert_eq!(map.get("Count"), Some(&Value::Int(3)));
        assert_eq!(map.get("Name"), Some(&Value::Text("abc".into())));
        assert!(parse_bindings(&["broken".into()]).is_err());
    }

    #[test]
    fn test_resolver_idents_are_builtin_widths() {
        let resolver = CliResolver {
            fields: HashMap::new(),
            vars: HashMap::new(),
        };
        assert_eq!(resolver.ident("uint32"), Some(Value::Int(4)));
        assert_eq!(resolver.ident("bogus"), None);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
