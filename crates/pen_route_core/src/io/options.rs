use std::{env, path::Path, time::Duration};

use log::LevelFilter;
use pen_route_derive::{CliOptions, CliValue, KvDisplay};

use crate::{Error, Result, geometry::Point, io::input::parse_point};

pub const DEFAULT_MERGE_THRESHOLD: f64 = 2.0;

/// Command-line options for a routing run.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct RouterOptions {
    /// Paths to route, one per line. Empty or `-` means stdin.
    #[cli(long = "input", value_name = "path")]
    pub input: String,
    /// Where to write the ordered paths. Empty or `-` means stdout.
    #[cli(long = "output", value_name = "path")]
    pub output: String,
    /// Run the greedy nearest-neighbour pass only.
    #[cli(long = "greedy", short = 'g', flag)]
    pub greedy: bool,
    /// Skip optimization and write the input order unchanged.
    #[cli(long = "no-opt", short = 'n', flag)]
    pub no_opt: bool,
    /// Search budget of the optimization stage in seconds.
    #[cli(long = "runtime", short = 't', value_name = "secs")]
    pub runtime: u64,
    /// Merge paths whose ends are closer than this distance (2.0 when given without a value).
    #[cli(long = "merge-paths", short = 'm', default_missing = "2.0", value_name = "f64")]
    #[kv(fmt = "opt")]
    pub merge_paths: Option<f64>,
    /// Fixed pen start and end position.
    #[cli(long = "origin", parse_with = "parse_point", value_name = "x,y")]
    pub origin: Point,
    /// Seed for the optimizer's move ordering.
    #[cli(long = "seed", value_name = "u64")]
    pub seed: u64,
    /// Log level: error, warn, info, debug, trace or off.
    #[cli(long = "log-level", parse_with = "LogLevel::parse", value_name = "level")]
    pub log_level: LogLevel,
    /// Log line format: compact or pretty.
    #[cli(long = "log-format", parse_with = "LogFormat::parse", value_name = "format")]
    pub log_format: LogFormat,
    /// Prefix log lines with a millisecond timestamp.
    #[cli(long = "log-timestamp", flag, negate)]
    pub log_timestamp: bool,
    /// Log file. Empty or `-` means stderr.
    #[cli(long = "log-output", value_name = "path")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            greedy: false,
            no_opt: false,
            runtime: 300,
            merge_paths: None,
            origin: Point::ORIGIN,
            seed: 12_345,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
        }
    }
}

impl RouterOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse_from_iter(env::args().skip(1))
    }

    pub fn parse_from_iter<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let raw_name = match (arg.strip_prefix("--"), arg.strip_prefix('-')) {
                (Some(long), _) => long.to_string(),
                (None, Some(short)) => {
                    let mut chars = short.chars();
                    let long = match (chars.next(), chars.next()) {
                        (Some(c), None) => Self::cli_long_name(c),
                        _ => None,
                    };
                    let Some(long) = long else {
                        return Err(Error::invalid_input(format!(
                            "Unknown option: {arg}\n\n{}",
                            Self::usage()
                        )));
                    };
                    long.to_string()
                }
                (None, None) => {
                    return Err(Error::invalid_input(format!(
                        "Unexpected argument: {arg}\n\n{}",
                        Self::usage()
                    )));
                }
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(&raw_name, &mut args);
            if !options.apply_cli_option(&name, value)? {
                return Err(Error::invalid_input(format!(
                    "Unknown option: --{name}\n\n{}",
                    Self::usage()
                )));
            }
        }

        Ok(options)
    }

    pub fn usage() -> String {
        let mut out = String::from(concat!(
            "Usage:\n",
            "  pen-route [options] [--input paths.txt] [--output route.txt]\n",
            "  pen-route [options] < paths.txt > route.txt\n\n",
            "Options:\n",
        ));
        for line in Self::cli_usage_lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("  -h, --help\n");
        out.push_str(&format!(
            "\nLog levels: {}\nLog formats: {}\n",
            LogLevel::CHOICES.join(", "),
            LogFormat::CHOICES.join(", ")
        ));
        out.push_str(concat!(
            "\n",
            "Examples:\n",
            "  pen-route --runtime 30 --merge-paths < art.txt > plot.txt\n",
            "  pen-route -g -m 0.5 --input art.txt --output plot.txt\n",
            "  pen-route --origin 100,0 --log-level=debug --log-format=pretty < art.txt\n",
        ));
        out
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.runtime)
    }

    /// Merge distance when merging is enabled.
    pub fn merge_threshold(&self) -> Option<f64> {
        self.merge_paths
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.log_output)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.output)
    }

    pub fn input_path(&self) -> Option<&Path> {
        non_stdio_path(&self.input)
    }
}

fn non_stdio_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use log::LevelFilter;

    use super::{DEFAULT_MERGE_THRESHOLD, LogFormat, LogLevel, RouterOptions};
    use crate::geometry::Point;

    #[test]
    fn defaults_match_the_documented_cli() {
        let options = RouterOptions::default();
        assert_eq!(options.runtime, 300);
        assert_eq!(options.time_limit(), Duration::from_secs(300));
        assert!(!options.greedy);
        assert!(!options.no_opt);
        assert!(options.merge_threshold().is_none());
        assert_eq!(options.origin, Point::ORIGIN);
        assert!(options.log_timestamp);
    }

    #[test]
    fn log_level_maps_to_expected_filter() {
        assert_eq!(LogLevel::Error.to_filter(), LevelFilter::Error);
        assert_eq!(LogLevel::Warn.to_filter(), LevelFilter::Warn);
        assert_eq!(LogLevel::Info.to_filter(), LevelFilter::Info);
        assert_eq!(LogLevel::Debug.to_filter(), LevelFilter::Debug);
        assert_eq!(LogLevel::Trace.to_filter(), LevelFilter::Trace);
        assert_eq!(LogLevel::Off.to_filter(), LevelFilter::Off);
    }

    #[test]
    fn log_level_parses_aliases_case_insensitively() {
        assert_eq!(LogLevel::parse("WARNING").expect("alias"), LogLevel::Warn);
        assert_eq!("pretty".parse::<LogFormat>().expect("parse"), LogFormat::Pretty);
        assert_eq!(LogFormat::Compact.to_string(), "compact");
        assert_eq!(LogFormat::CHOICES, &["compact", "pretty"]);
        assert!(RouterOptions::usage().contains("Log levels: error, warn, info, debug, trace, off"));

        let err = LogLevel::parse("loud").expect_err("unknown level");
        assert!(err.to_string().contains("Invalid value for --log-level: loud"));
    }

    #[test]
    fn parse_from_iter_applies_long_options() {
        let options = RouterOptions::parse_from_iter([
            "--input=art.txt",
            "--output",
            "plot.txt",
            "--runtime=12",
            "--merge-paths=0.75",
            "--origin=10,-2.5",
            "--seed",
            "7",
            "--log-level=debug",
            "--log-format=pretty",
            "--log-timestamp=false",
            "--log-output=run.log",
            "--greedy",
        ])
        .expect("parse options");

        assert_eq!(options.input, "art.txt");
        assert_eq!(options.output, "plot.txt");
        assert_eq!(options.runtime, 12);
        assert_eq!(options.merge_threshold(), Some(0.75));
        assert_eq!(options.origin, Point::new(10.0, -2.5));
        assert_eq!(options.seed, 7);
        assert_eq!(options.log_level, LogLevel::Debug);
        assert_eq!(options.log_format, LogFormat::Pretty);
        assert!(!options.log_timestamp);
        assert_eq!(options.log_output, "run.log");
        assert!(options.greedy);
    }

    #[test]
    fn parse_from_iter_maps_short_flags() {
        let options =
            RouterOptions::parse_from_iter(["-g", "-n", "-t", "45"]).expect("parse options");
        assert!(options.greedy);
        assert!(options.no_opt);
        assert_eq!(options.runtime, 45);
    }

    #[test]
    fn merge_paths_without_value_uses_default_threshold() {
        let options = RouterOptions::parse_from_iter(["--merge-paths", "--greedy"])
            .expect("parse options");
        assert_eq!(options.merge_threshold(), Some(DEFAULT_MERGE_THRESHOLD));
        assert!(options.greedy);

        let options = RouterOptions::parse_from_iter(["-m"]).expect("parse options");
        assert_eq!(options.merge_threshold(), Some(2.0));

        let options = RouterOptions::parse_from_iter(["-m", "3.5"]).expect("parse options");
        assert_eq!(options.merge_threshold(), Some(3.5));
    }

    #[test]
    fn flags_do_not_swallow_the_next_argument() {
        let err = RouterOptions::parse_from_iter(["--greedy", "art.txt"])
            .expect_err("positional after flag");
        assert!(err.to_string().contains("Unexpected argument: art.txt"));
    }

    #[test]
    fn parse_from_iter_accepts_no_log_timestamp_flag() {
        let options =
            RouterOptions::parse_from_iter(["--no-log-timestamp"]).expect("parse options");
        assert!(!options.log_timestamp);

        let err = RouterOptions::parse_from_iter(["--no-log-timestamp=true"])
            .expect_err("expected flag value rejection");
        assert!(err.to_string().contains("does not take a value"));
    }

    #[test]
    fn parse_from_iter_rejects_bad_values() {
        let err = RouterOptions::parse_from_iter(["--runtime=soon"]).expect_err("bad runtime");
        assert!(err.to_string().contains("Invalid value for --runtime: soon"));

        let err = RouterOptions::parse_from_iter(["--origin=1"]).expect_err("bad origin");
        assert!(err.to_string().contains("invalid input"));

        let err = RouterOptions::parse_from_iter(["--greedy=maybe"]).expect_err("bad bool");
        assert!(err.to_string().contains("Invalid boolean for --greedy: maybe"));

        let err = RouterOptions::parse_from_iter(["--seed"]).expect_err("missing value");
        assert!(err.to_string().contains("Missing value for --seed"));
    }

    #[test]
    fn parse_from_iter_rejects_unknown_options() {
        let err = RouterOptions::parse_from_iter(["--vis-output=x.svg"])
            .expect_err("unknown long option");
        assert!(err.to_string().contains("Unknown option: --vis-output"));

        let err = RouterOptions::parse_from_iter(["-x"]).expect_err("unknown short option");
        assert!(err.to_string().contains("Unknown option: -x"));
    }

    #[test]
    fn help_returns_usage_listing_every_option() {
        let err = RouterOptions::parse_from_iter(["--help"]).expect_err("help short-circuits");
        let usage = err.to_string();
        assert!(usage.contains("Usage:"));
        for option in [
            "--input",
            "--output",
            "-g, --greedy",
            "-n, --no-opt",
            "-t, --runtime <secs>",
            "-m, --merge-paths [<f64>]",
            "--origin <x,y>",
            "--no-log-timestamp",
        ] {
            assert!(usage.contains(option), "usage is missing {option}");
        }
    }

    #[test]
    fn stdio_paths_treat_empty_and_dash_as_streams() {
        let options = RouterOptions {
            input: "-".to_string(),
            ..RouterOptions::default()
        };
        assert!(options.input_path().is_none());
        assert!(options.output_path().is_none());
        assert!(options.log_output_path().is_none());

        let options = RouterOptions {
            output: "out/plot.txt".to_string(),
            ..RouterOptions::default()
        };
        assert_eq!(options.output_path(), Some(Path::new("out/plot.txt")));
    }

    #[test]
    fn display_lists_every_option() {
        let shown = RouterOptions::default().to_string();
        assert!(shown.contains("runtime"));
        assert!(shown.contains("merge_paths"));
        assert!(shown.contains("none"));
        assert!(shown.contains("0.0,0.0"));
    }
}
