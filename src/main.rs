use anyhow::{Context, Result};
use token_locker::core::cli::{self, OutputFormat};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "init" => run_init(&args[2..]),
        "add" => run_add(&args[2..]),
        "get" => run_get(&args[2..]),
        "list" => run_list(&args[2..]),
        "remove" | "rm" => run_remove(&args[2..]),
        "import" => run_import(&args[2..]),
        "export" => run_export(&args[2..]),
        "scan" => run_scan(&args[2..]),
        "test" => run_test(&args[2..]),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(2);
        }
    }
}

fn print_help() {
    println!("token-locker - Secure vault for API tokens");
    println!();
    println!("USAGE:");
    println!("  token-locker init [--force]");
    println!("  token-locker add <NAME> [VALUE] [--stdin] [--expires-days <N>]");
    println!("  token-locker get <NAME> [--json|--env]");
    println!("  token-locker list [--json|--env]");
    println!("  token-locker remove <NAME>");
    println!("  token-locker import [FILE] [--stdin] [--format env|json] [--expires-days <N>]");
    println!("  token-locker export [--json|--env]");
    println!("  token-locker scan [FILE] [--stdin] [--json]");
    println!("  token-locker test <NAME> | --value <TOKEN> [--provider <PROVIDER>]");
    println!();
    println!("  Commands that open the vault take --passphrase <PASS>; without it the");
    println!("  TOKEN_LOCKER_PASSPHRASE environment variable is used, then a prompt.");
    println!();
    println!("EXAMPLES:");
    println!("  token-locker add openai sk-abc123... --expires-days 90");
    println!("  token-locker scan .env");
    println!("  token-locker test openai");
}

fn run_init(args: &[String]) -> Result<()> {
    let mut force = false;
    let mut passphrase: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--force" => {
                force = true;
                i += 1;
            }
            "--passphrase" if i + 1 < args.len() => {
                passphrase = Some(&args[i + 1]);
                i += 2;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    let passphrase = cli::get_passphrase(passphrase)?;
    cli::cmd_init(&passphrase, force)
}

fn run_add(args: &[String]) -> Result<()> {
    let mut name: Option<&str> = None;
    let mut value: Option<&str> = None;
    let mut stdin = false;
    let mut expires_days: Option<u32> = None;
    let mut passphrase: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--stdin" => {
                stdin = true;
                i += 1;
            }
            "--expires-days" if i + 1 < args.len() => {
                expires_days = Some(
                    args[i + 1]
                        .parse()
                        .context("--expires-days expects a number")?,
                );
                i += 2;
            }
            "--passphrase" if i + 1 < args.len() => {
                passphrase = Some(&args[i + 1]);
                i += 2;
            }
            arg if !arg.starts_with("--") => {
                if name.is_none() {
                    name = Some(arg);
                } else if value.is_none() {
                    value = Some(arg);
                }
                i += 1;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    let name = name.context("Usage: token-locker add <NAME> [VALUE] [--stdin]")?;
    let passphrase = cli::get_passphrase(passphrase)?;
    cli::cmd_add(name, value, stdin, expires_days, &passphrase)
}

fn run_get(args: &[String]) -> Result<()> {
    let (name, format, passphrase) = parse_name_format_args(args)?;
    let name = name.context("Usage: token-locker get <NAME> [--json|--env]")?;
    let passphrase = cli::get_passphrase(passphrase.as_deref())?;
    cli::cmd_get(&name, format, &passphrase)
}

fn run_list(args: &[String]) -> Result<()> {
    let (_, format, passphrase) = parse_name_format_args(args)?;
    let passphrase = cli::get_passphrase(passphrase.as_deref())?;
    cli::cmd_list(format, &passphrase)
}

fn run_remove(args: &[String]) -> Result<()> {
    let (name, _, passphrase) = parse_name_format_args(args)?;
    let name = name.context("Usage: token-locker remove <NAME>")?;
    let passphrase = cli::get_passphrase(passphrase.as_deref())?;
    cli::cmd_remove(&name, &passphrase)
}

fn run_import(args: &[String]) -> Result<()> {
    let mut file: Option<&str> = None;
    let mut stdin = false;
    let mut format = "env".to_string();
    let mut expires_days: Option<u32> = None;
    let mut passphrase: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--stdin" => {
                stdin = true;
                i += 1;
            }
            "--format" if i + 1 < args.len() => {
                format = args[i + 1].clone();
                i += 2;
            }
            "--expires-days" if i + 1 < args.len() => {
                expires_days = Some(
                    args[i + 1]
                        .parse()
                        .context("--expires-days expects a number")?,
                );
                i += 2;
            }
            "--passphrase" if i + 1 < args.len() => {
                passphrase = Some(&args[i + 1]);
                i += 2;
            }
            arg if !arg.starts_with("--") => {
                file = Some(arg);
                i += 1;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    let passphrase = cli::get_passphrase(passphrase)?;
    cli::cmd_import(file, stdin, &format, expires_days, &passphrase)
}

fn run_export(args: &[String]) -> Result<()> {
    let (_, format, passphrase) = parse_name_format_args(args)?;
    // Export defaults to env output, the format other tools consume.
    let format = if format == OutputFormat::Human {
        OutputFormat::Env
    } else {
        format
    };
    let passphrase = cli::get_passphrase(passphrase.as_deref())?;
    cli::cmd_export(format, &passphrase)
}

fn run_scan(args: &[String]) -> Result<()> {
    let mut file: Option<&str> = None;
    let mut stdin = false;
    let mut json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--stdin" => {
                stdin = true;
                i += 1;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            arg if !arg.starts_with("--") => {
                file = Some(arg);
                i += 1;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    cli::cmd_scan(file, stdin, json)
}

fn run_test(args: &[String]) -> Result<()> {
    let mut name: Option<&str> = None;
    let mut value: Option<&str> = None;
    let mut provider: Option<&str> = None;
    let mut passphrase: Option<&str> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--value" if i + 1 < args.len() => {
                value = Some(&args[i + 1]);
                i += 2;
            }
            "--provider" if i + 1 < args.len() => {
                provider = Some(&args[i + 1]);
                i += 2;
            }
            "--passphrase" if i + 1 < args.len() => {
                passphrase = Some(&args[i + 1]);
                i += 2;
            }
            arg if !arg.starts_with("--") => {
                name = Some(arg);
                i += 1;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    cli::cmd_test(name, value, provider, passphrase)
}

/// Shared parsing for commands taking an optional name plus output flags.
fn parse_name_format_args(args: &[String]) -> Result<(Option<String>, OutputFormat, Option<String>)> {
    let mut name: Option<String> = None;
    let mut json = false;
    let mut env = false;
    let mut passphrase: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => {
                json = true;
                i += 1;
            }
            "--env" => {
                env = true;
                i += 1;
            }
            "--passphrase" if i + 1 < args.len() => {
                passphrase = Some(args[i + 1].clone());
                i += 2;
            }
            arg if !arg.starts_with("--") => {
                name = Some(arg.to_string());
                i += 1;
            }
            other => anyhow::bail!("Unknown option: {}", other),
        }
    }

    Ok((name, OutputFormat::from_args(json, env), passphrase))
}
