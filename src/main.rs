mod debug_report;

use citefield::{CitationField, Expansion, LogNotifier, Options, Resolver, StaticResolver, expand};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const LOG_ENV: &str = "CITEFIELD_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "warn")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let resolver = match build_resolver(&config.source) {
        Ok(resolver) => resolver,
        Err((code, err)) => {
            eprintln!("{err}");
            std::process::exit(code);
        }
    };

    let options = Options { resolve_timeout: config.timeout, require_boundary: config.boundary };
    let out = if config.typing {
        simulate_typing(&config.input, resolver, options).await
    } else {
        expand(&config.input, resolver, &options).await
    };
    debug_report::print_run(&config.input, &out, config.typing, config.color);
}

/// Feed the input one character at a time, the way an editor would, writing
/// back whatever the field hands out.
async fn simulate_typing(input: &str, resolver: Arc<dyn Resolver>, options: Options) -> Expansion {
    let started = Instant::now();
    let mut field = CitationField::new(resolver, Arc::new(LogNotifier), options);

    let mut buffer = String::with_capacity(input.len());
    for ch in input.chars() {
        buffer.push(ch);
        buffer = field.on_text_change(&buffer);
        tokio::task::yield_now().await;
    }
    field.settle().await;

    Expansion { elapsed: started.elapsed(), ..Expansion::from(&field) }
}

enum Source {
    Table(PathBuf),
    Http(String),
}

struct CliConfig {
    input: String,
    source: Source,
    timeout: Option<Duration>,
    typing: bool,
    boundary: bool,
    color: bool,
}

fn build_resolver(source: &Source) -> Result<Arc<dyn Resolver>, (i32, String)> {
    match source {
        Source::Table(path) => match StaticResolver::from_path(path) {
            Ok(table) => {
                log::debug!("loaded {} passage(s) from {}", table.len(), path.display());
                Ok(Arc::new(table))
            }
            Err(err) => Err((1, format!("error: {}: {err}", path.display()))),
        },
        #[cfg(feature = "http")]
        Source::Http(url) => match citefield::HttpResolver::new(url) {
            Ok(resolver) => Ok(Arc::new(resolver)),
            Err(err) => Err((2, format!("error: invalid --http '{url}': {err}"))),
        },
        #[cfg(not(feature = "http"))]
        Source::Http(_) => Err((2, "error: --http needs a build with the `http` feature".to_string())),
    }
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut source: Option<Source> = None;
    let mut timeout = Options::default().resolve_timeout;
    let mut typing = false;
    let mut boundary = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("citefield {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--typing" => typing = true,
            "--boundary" => boundary = true,
            "--no-timeout" => timeout = None,
            "--timeout" => {
                let value = args.next().ok_or_else(|| "error: --timeout expects a value".to_string())?;
                timeout = Some(parse_timeout(&value)?);
            }
            "--table" => {
                let value = args.next().ok_or_else(|| "error: --table expects a value".to_string())?;
                set_source(&mut source, Source::Table(PathBuf::from(value)))?;
            }
            "--http" => {
                let value = args.next().ok_or_else(|| "error: --http expects a value".to_string())?;
                set_source(&mut source, Source::Http(value))?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                set_input(&mut input, value)?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    set_input(&mut input, rest)?;
                }
                break;
            }
            _ if arg.starts_with("--timeout=") => {
                timeout = Some(parse_timeout(arg.trim_start_matches("--timeout="))?);
            }
            _ if arg.starts_with("--table=") => {
                let value = arg.trim_start_matches("--table=");
                set_source(&mut source, Source::Table(PathBuf::from(value)))?;
            }
            _ if arg.starts_with("--http=") => {
                let value = arg.trim_start_matches("--http=");
                set_source(&mut source, Source::Http(value.to_string()))?;
            }
            _ if arg.starts_with("--input=") => {
                set_input(&mut input, arg.trim_start_matches("--input=").to_string())?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
        }
    }

    let source = source.ok_or_else(|| format!("error: no resolver given (use --table or --http)\n\n{}", help_text()))?;

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, source, timeout, typing, boundary, color })
}

fn set_input(input: &mut Option<String>, value: String) -> Result<(), String> {
    if input.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *input = Some(value);
    Ok(())
}

fn set_source(source: &mut Option<Source>, value: Source) -> Result<(), String> {
    if source.is_some() {
        return Err("error: --table and --http given more than once".to_string());
    }
    *source = Some(value);
    Ok(())
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| format!("error: invalid --timeout '{value}' (expected seconds > 0)"))
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "citefield {version}

Detect scripture citations in text and expand them inline.

Usage:
  citefield --table <file> [OPTIONS] [--] <input...>
  citefield --http <url> [OPTIONS] --input <text>

Resolvers (exactly one):
  --table <file>             JSON passage table: {{\"John 3:16\": \"text\"}} or
                             {{\"John 3:16\": {{\"reference\": ..., \"text\": ...}}}}.
  --http <url>               Passage service, queried as GET <url>/<citation>.
                             Needs the `http` feature.

Options:
  -i, --input <text>         Input text. If omitted, reads remaining args
                             or stdin when no args are provided.
  --typing                   Feed the input one character at a time, like an
                             editor would, instead of all at once.
  --boundary                 Only look up a citation once the character after
                             it shows it is complete.
  --timeout <secs>           Per-lookup timeout. Default: {timeout}s
  --no-timeout               Wait for lookups indefinitely.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}=<filter>     Log filter (env_logger syntax). Default: warn

Exit codes:
  0  Success.
  1  Internal error (e.g. unreadable passage table).
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        timeout = citefield::DEFAULT_RESOLVE_TIMEOUT.as_secs(),
        log_env = LOG_ENV,
    )
}
