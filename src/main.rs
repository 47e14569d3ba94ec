mod debug_report;

use branchling::{Context, Options, resolve_verbose_with};
use std::io::{self, IsTerminal, Read};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let ctx = Context { seed: config.seed };
    match resolve_verbose_with(&config.mapping, &config.resources, &config.path, &ctx, &config.options) {
        Ok(res) => debug_report::print_run(&config.path, &res, config.color),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

struct CliConfig {
    mapping: String,
    resources: String,
    path: String,
    seed: Option<u64>,
    options: Options,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut mapping: Option<String> = None;
    let mut resources = String::new();
    let mut path = String::new();
    let mut seed: Option<u64> = None;
    let mut options = Options::default();
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("branchling {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-m" | "--mapping" => {
                let file = next_value(&mut args, "--mapping")?;
                mapping = Some(read_file(&file)?);
            }
            "-r" | "--resources" => {
                let file = next_value(&mut args, "--resources")?;
                resources = read_file(&file)?;
            }
            "-p" | "--path" => path = next_value(&mut args, "--path")?,
            "--seed" => seed = parse_seed(&next_value(&mut args, "--seed")?)?,
            "--tag-delim" => options.tag_delim = next_value(&mut args, "--tag-delim")?,
            "--text-delim" => options.text_delim = next_value(&mut args, "--text-delim")?,
            "--video-delim" => options.video_delim = next_value(&mut args, "--video-delim")?,
            "--weighting" => {
                options.weighting =
                    next_value(&mut args, "--weighting")?.parse().map_err(|e| format!("error: {e}"))?;
            }
            "--scale" => {
                let value = next_value(&mut args, "--scale")?;
                options.weight_scale = value
                    .parse::<f32>()
                    .ok()
                    .filter(|s| *s >= 0.0)
                    .ok_or_else(|| format!("error: invalid --scale '{value}' (expected non-negative float)"))?;
            }
            "--max-steps" => {
                let value = next_value(&mut args, "--max-steps")?;
                options.max_steps =
                    value.parse().map_err(|_| format!("error: invalid --max-steps '{value}'"))?;
            }
            "--desc-fallback" => {
                options.desc_fallback =
                    next_value(&mut args, "--desc-fallback")?.parse().map_err(|e| format!("error: {e}"))?;
            }
            _ if arg.starts_with("--path=") => path = arg.trim_start_matches("--path=").to_string(),
            _ if arg.starts_with("--seed=") => seed = parse_seed(arg.trim_start_matches("--seed="))?,
            _ if arg.starts_with("--mapping=") => {
                mapping = Some(read_file(arg.trim_start_matches("--mapping="))?);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if !path.is_empty() {
                    return Err("error: path provided multiple times".to_string());
                }
                path = arg;
            }
        }
    }

    let mapping = match mapping {
        Some(text) => text,
        None => read_stdin_mapping()?,
    };

    if mapping.trim().is_empty() {
        return Err(format!("error: no mapping provided\n\n{}", help_text()));
    }

    Ok(CliConfig { mapping, resources, path, seed, options, color })
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("error: {flag} expects a value"))
}

fn read_file(file: &str) -> Result<String, String> {
    std::fs::read_to_string(file).map_err(|err| format!("error: failed to read '{file}': {err}"))
}

fn read_stdin_mapping() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

/// Negative seeds keep the original node's convention: draw from entropy.
fn parse_seed(value: &str) -> Result<Option<u64>, String> {
    let parsed: i64 =
        value.parse().map_err(|_| format!("error: invalid --seed '{value}' (expected integer)"))?;
    if parsed < 0 { Ok(None) } else { Ok(Some(parsed as u64)) }
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "branchling {version}

Branching-wildcard resolver CLI.

Usage:
  branchling [OPTIONS] [path]
  branchling -m mapping.txt -p '*/leaf' --seed 7

Options:
  -m, --mapping <file>       Branch mapping DSL. Reads stdin when omitted.
  -r, --resources <file>     Resource mapping DSL. Default: none.
  -p, --path <request>       Path request (/-delimited, '*' leads backfill).
                             Default: empty (free walk).
  --seed <int>               Walk seed. Negative or omitted draws from entropy;
                             the effective seed is printed for replay.
  --tag-delim <s>            Tag join delimiter. Default: \" \".
  --text-delim <s>           Description-1 join delimiter. Default: \", \".
  --video-delim <s>          Description-2 join delimiter. Default: \", \".
  --weighting <mode>         uniform | depth | inverse_depth. Default: uniform.
  --scale <float>            Global strength scale (non-negative). Default: 1.0.
  --max-steps <n>            Random-draw budget per walk. Default: 1000.
  --desc-fallback <mode>     empty | tag | cascade. Default: empty.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  1  Resolution failed (no root, bad pin, cyclic mapping, ...).
  2  Invalid arguments or missing mapping.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
