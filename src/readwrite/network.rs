use std::fs;
use std::io::{BufRead, BufReader};

use crate::core::network::{HostId, HostNetwork};
use crate::errors::{ContagionError, Result};

pub trait NetworkIO: Sized {
    fn read(reader: &mut dyn BufRead) -> Result<Self>;
    fn read_from_file(path: &str) -> Result<Self>;
}

impl NetworkIO for HostNetwork {
    /// Reads directed edges given as `from to weight` per line.
    ///
    /// The edge is the first run of three consecutive numeric tokens anywhere in the line, so
    /// `edge 0 1 0.5` is read as well. Comment lines and lines without such a run are skipped.
    /// A run that looks numeric but does not parse as host ids and a weight is an error.
    /// Repeated edges keep the weight of the last line.
    fn read(reader: &mut dyn BufRead) -> Result<Self> {
        let mut network = HostNetwork::new();
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some(tokens) = tokens
                .windows(3)
                .find(|window| window.iter().all(|token| is_numeric(token)))
            else {
                if !line.is_empty() {
                    log::debug!("Skipping line {line_no} of network: {line}");
                }
                continue;
            };

            let from = parse_host(tokens[0], line_no)?;
            let to = parse_host(tokens[1], line_no)?;
            let weight: f64 = tokens[2].parse().map_err(|_| {
                ContagionError::parse(line_no, format!("invalid weight '{}'", tokens[2]))
            })?;
            network
                .add_weighted_connection(from, to, weight)
                .map_err(|err| ContagionError::parse(line_no, err.to_string()))?;
        }
        log::info!(
            "Loaded host network: {} hosts, {} connections",
            network.connected_pop_size(),
            network.edge_count()
        );
        Ok(network)
    }

    fn read_from_file(path: &str) -> Result<Self> {
        let file = fs::File::open(path)
            .map_err(|err| ContagionError::IoError(format!("Failed to read from {path}: {err}")))?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }
}

fn is_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

fn parse_host(token: &str, line_no: usize) -> Result<HostId> {
    token
        .parse()
        .map_err(|_| ContagionError::parse(line_no, format!("invalid host id '{token}'")))
}
