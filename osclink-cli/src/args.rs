//! Command-line parsing for the `osclink` tool.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use osclink_types::Value;

pub const USAGE: &str = "\
usage: osclink [-v] [--config PATH] <command>

commands:
  send <address> [args..] [--host H] [--port P] [--bundle]
  listen [--port P] [--count N]

arguments: i:42 f:1.5 s:text b:<hex> T F, or bare words
(inferred as int, float, true/false, else string)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send {
        address: String,
        values: Vec<Value>,
        host: Option<String>,
        port: Option<u16>,
        bundle: bool,
    },
    Listen {
        port: Option<u16>,
        count: Option<usize>,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    MissingCommand,
    UnknownCommand(String),
    UnknownFlag(String),
    MissingAddress,
    MissingFlagValue(&'static str),
    BadNumber { flag: &'static str, value: String },
    BadValue { arg: String, reason: &'static str },
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::MissingCommand => write!(f, "no command given"),
            ArgError::UnknownCommand(cmd) => write!(f, "unknown command '{}'", cmd),
            ArgError::UnknownFlag(flag) => write!(f, "unknown flag '{}'", flag),
            ArgError::MissingAddress => write!(f, "send needs an address"),
            ArgError::MissingFlagValue(flag) => write!(f, "{} needs a value", flag),
            ArgError::BadNumber { flag, value } => {
                write!(f, "{} expects a number, got '{}'", flag, value)
            }
            ArgError::BadValue { arg, reason } => write!(f, "bad argument '{}': {}", arg, reason),
        }
    }
}

impl std::error::Error for ArgError {}

/// Parse everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Cli, ArgError> {
    let mut verbose = false;
    let mut config = None;
    let mut host = None;
    let mut port = None;
    let mut count = None;
    let mut bundle = false;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => {
                return Ok(Cli {
                    verbose,
                    config,
                    command: Command::Help,
                })
            }
            "--config" => config = Some(PathBuf::from(flag_value(&mut iter, "--config")?)),
            "--host" => host = Some(flag_value(&mut iter, "--host")?.to_string()),
            "--port" => port = Some(number(flag_value(&mut iter, "--port")?, "--port")?),
            "--count" => count = Some(number(flag_value(&mut iter, "--count")?, "--count")?),
            "--bundle" => bundle = true,
            flag if flag.starts_with("--") => return Err(ArgError::UnknownFlag(flag.to_string())),
            _ => positional.push(arg.as_str()),
        }
    }

    let (name, rest) = positional.split_first().ok_or(ArgError::MissingCommand)?;
    let command = match *name {
        "send" => {
            let (address, words) = rest.split_first().ok_or(ArgError::MissingAddress)?;
            let values = words.iter().map(|w| parse_value(w)).collect::<Result<_, _>>()?;
            Command::Send {
                address: address.to_string(),
                values,
                host,
                port,
                bundle,
            }
        }
        "listen" => Command::Listen { port, count },
        "help" => Command::Help,
        other => return Err(ArgError::UnknownCommand(other.to_string())),
    };

    Ok(Cli {
        verbose,
        config,
        command,
    })
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &'static str,
) -> Result<&'a str, ArgError> {
    iter.next()
        .map(String::as_str)
        .ok_or(ArgError::MissingFlagValue(flag))
}

fn number<T: std::str::FromStr>(value: &str, flag: &'static str) -> Result<T, ArgError> {
    value.parse().map_err(|_| ArgError::BadNumber {
        flag,
        value: value.to_string(),
    })
}

/// `i:`, `f:`, `s:`, `b:` prefixes force a type; `T`/`F` are booleans.
///
/// Blob arguments alias their decoded bytes rather than renting from the
/// byte pool, which is only sized once the config has been read.
pub fn parse_value(arg: &str) -> Result<Value, ArgError> {
    let bad = |reason| ArgError::BadValue {
        arg: arg.to_string(),
        reason,
    };

    if let Some((prefix, body)) = arg.split_once(':') {
        match prefix {
            "i" => return body.parse().map(Value::Int).map_err(|_| bad("not an int32")),
            "f" => return body.parse().map(Value::Float).map_err(|_| bad("not a float")),
            "s" => return Ok(Value::from(body)),
            "b" => {
                return parse_hex(body)
                    .map(|bytes| Value::blob_shared(Arc::from(bytes)))
                    .ok_or_else(|| bad("not hex bytes"))
            }
            _ => {}
        }
    }

    Ok(match arg {
        "T" | "true" => Value::Bool(true),
        "F" | "false" => Value::Bool(false),
        _ => {
            if let Ok(v) = arg.parse::<i32>() {
                Value::Int(v)
            } else if let Ok(v) = arg.parse::<f32>() {
                Value::Float(v)
            } else {
                Value::from(arg)
            }
        }
    })
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn typed_values() {
        assert_eq!(parse_value("i:42"), Ok(Value::Int(42)));
        assert_eq!(parse_value("f:1.5"), Ok(Value::Float(1.5)));
        assert_eq!(parse_value("s:12"), Ok(Value::from("12")));
        assert_eq!(parse_value("b:00ff10"), Ok(Value::blob_shared(Arc::from(&[0x00, 0xFF, 0x10][..]))));
        assert_eq!(parse_value("T"), Ok(Value::Bool(true)));
        assert_eq!(parse_value("F"), Ok(Value::Bool(false)));
    }

    #[test]
    fn inferred_values() {
        assert_eq!(parse_value("-3"), Ok(Value::Int(-3)));
        assert_eq!(parse_value("0.5"), Ok(Value::Float(0.5)));
        assert_eq!(parse_value("false"), Ok(Value::Bool(false)));
        assert_eq!(parse_value("sine"), Ok(Value::from("sine")));
        assert_eq!(parse_value("x:y"), Ok(Value::from("x:y")));
    }

    #[test]
    fn blob_arguments_stay_off_the_byte_pool() {
        let Ok(Value::Blob(blob)) = parse_value("b:cafe") else {
            panic!("expected a blob");
        };
        assert!(!blob.owns_buffer());
        assert_eq!(&blob[..], &[0xCA, 0xFE]);
    }

    #[test]
    fn bad_values() {
        assert!(parse_value("i:abc").is_err());
        assert!(parse_value("b:abc").is_err());
        assert!(parse_value("b:zz").is_err());
    }

    #[test]
    fn send_command() {
        let cli = parse_args(&strings(&[
            "-v", "send", "/synth/freq", "440.0", "i:2", "--port", "57120", "--bundle",
        ]))
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Send {
                address: "/synth/freq".into(),
                values: vec![Value::Float(440.0), Value::Int(2)],
                host: None,
                port: Some(57120),
                bundle: true,
            }
        );
    }

    #[test]
    fn listen_command() {
        let cli = parse_args(&strings(&["listen", "--count", "3"])).unwrap();
        assert_eq!(cli.command, Command::Listen { port: None, count: Some(3) });
    }

    #[test]
    fn errors() {
        assert_eq!(parse_args(&[]), Err(ArgError::MissingCommand));
        assert_eq!(parse_args(&strings(&["send"])), Err(ArgError::MissingAddress));
        assert_eq!(
            parse_args(&strings(&["listen", "--port"])),
            Err(ArgError::MissingFlagValue("--port"))
        );
        assert!(matches!(
            parse_args(&strings(&["listen", "--port", "99999"])),
            Err(ArgError::BadNumber { flag: "--port", .. })
        ));
        assert_eq!(
            parse_args(&strings(&["fly"])),
            Err(ArgError::UnknownCommand("fly".into()))
        );
    }
}
