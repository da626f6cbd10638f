use std::{path::PathBuf, thread, time::Duration};

use crate::{
    cli::Cli,
    collector::OutputOrder,
    columns,
    error::{Error, Result},
    gateway::Tuning,
    job::QuerySettings,
    pipeline::{PipelineOptions, Projection},
};

/// Where query text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Literal(String),
    File {
        path: PathBuf,
        projection: Projection,
    },
}

/// Everything a run needs, validated before any query is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub input: Input,
    pub settings: QuerySettings,
    pub options: PipelineOptions,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let workers = resolve_workers(cli.workers)?;

        let drain_timeout = match cli.drain_timeout {
            None => None,
            Some(secs) => {
                Some(Duration::try_from_secs_f64(secs).map_err(|_| {
                    Error::Config(format!(
                        "--drain-timeout must be non-negative seconds, \
                         got {secs}"
                    ))
                })?)
            }
        };

        // The file wins when both are given.
        let input = if let Some(path) = &cli.file {
            let metadata =
                std::fs::metadata(path).map_err(|source| Error::InputAccess {
                    path: path.clone(),
                    source,
                })?;
            if !metadata.is_file() {
                return Err(Error::InputAccess {
                    path: path.clone(),
                    source: std::io::Error::other("not a regular file"),
                });
            }
            let columns = columns::parse_indices(&cli.columns).map_err(|e| {
                Error::Config(format!(
                    "could not parse column indices {:?}: {e}",
                    cli.columns
                ))
            })?;
            if cli.delimiter.is_empty() {
                return Err(Error::Config(
                    "--delimiter must not be empty".into(),
                ));
            }
            Input::File {
                path: path.clone(),
                projection: Projection {
                    columns,
                    delimiter: cli.delimiter.clone(),
                },
            }
        } else if let Some(like) =
            cli.like.as_deref().filter(|like| !like.is_empty())
        {
            Input::Literal(like.to_string())
        } else {
            return Err(Error::Config(
                "either --like or --file is required".into(),
            ));
        };

        Ok(Self {
            host: cli.host.clone(),
            port: cli.port,
            input,
            settings: QuerySettings {
                collections: split_names(&cli.index),
                fields: split_names(&cli.index_fields),
                extract: cli.extract,
                null_value: cli.null_value.clone(),
                tuning: Tuning {
                    min_term_freq: cli.min_term_freq,
                    max_query_terms: cli.max_query_terms,
                    size: cli.size,
                },
            },
            options: PipelineOptions {
                workers,
                order: if cli.ordered {
                    OutputOrder::Input
                } else {
                    OutputOrder::Completion
                },
                drain_timeout,
            },
        })
    }
}

/// Turn the requested pool size into a concrete one; zero picks the
/// number of available CPUs.
pub fn resolve_workers(requested: i64) -> Result<usize> {
    match requested {
        n if n < 0 => Err(Error::Config(
            "value for --workers must be non-negative".into(),
        )),
        0 => Ok(thread::available_parallelism().map_or(1, |n| n.get())),
        n => usize::try_from(n)
            .map_err(|_| Error::Config(format!("--workers {n} is too large"))),
    }
}

fn split_names(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["dupsquash"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn literal_input() {
        let config = Config::from_cli(&cli(&["-l", "moby dick"])).unwrap();
        assert_eq!(config.input, Input::Literal("moby dick".into()));
        assert!(config.options.workers >= 1);
        assert_eq!(
            config.settings.fields,
            vec!["content.245.a", "content.245.b"]
        );
        assert!(config.settings.collections.is_empty());
    }

    #[test]
    fn missing_input_is_config_error() {
        let err = Config::from_cli(&cli(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_like_counts_as_missing() {
        let err = Config::from_cli(&cli(&["-l", ""])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn negative_workers_rejected() {
        let err = Config::from_cli(&cli(&["-l", "x", "-w", "-1"])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_workers_autodetects() {
        assert!(resolve_workers(0).unwrap() >= 1);
        assert_eq!(resolve_workers(3).unwrap(), 3);
    }

    #[test]
    fn missing_file_is_input_access_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.tsv");
        let err = Config::from_cli(&cli(&["-i", missing.to_str().unwrap()]))
            .unwrap_err();
        assert!(matches!(err, Error::InputAccess { .. }));
    }

    #[test]
    fn file_input_parses_columns() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let config = Config::from_cli(&cli(&[
            "-i",
            path,
            "-f",
            "1,3",
            "--index",
            "books  articles",
            "--ordered",
        ]))
        .unwrap();

        match config.input {
            Input::File { projection, .. } => {
                assert_eq!(projection.columns, vec![0, 2]);
                assert_eq!(projection.delimiter, "\t");
            }
            other => panic!("expected file input, got {other:?}"),
        }
        assert_eq!(config.settings.collections, vec!["books", "articles"]);
        assert_eq!(config.options.order, OutputOrder::Input);
    }

    #[test]
    fn malformed_columns_is_config_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let err =
            Config::from_cli(&cli(&["-i", path, "-f", "1a"])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn file_wins_over_literal() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let config =
            Config::from_cli(&cli(&["-i", path, "-l", "ignored"])).unwrap();
        assert!(matches!(config.input, Input::File { .. }));
    }

    #[test]
    fn drain_timeout_in_seconds() {
        let config =
            Config::from_cli(&cli(&["-l", "x", "--drain-timeout", "1.5"]))
                .unwrap();
        assert_eq!(
            config.options.drain_timeout,
            Some(Duration::from_millis(1500))
        );
    }
}
