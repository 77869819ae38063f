//! Replay tokens: an encoded (parameters, path) pair that reproduces a
//! counterexample exactly.
//!
//! The token is URL-safe base64 over a `|`-separated text form:
//! `v1|seed|order|size|waypoint|path`, where the waypoint is `-` or
//! `seed:order` and the path is `:`-separated child indices.

use crate::data::{GenParameters, Rng, Size};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::str::FromStr;
use thiserror::Error;

const VERSION: &str = "v1";

/// Everything needed to re-run one generator iteration and find one node of
/// its example space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub parameters: GenParameters,
    pub path: Vec<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayDecodeError {
    #[error("replay is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("replay is not valid UTF-8")]
    Utf8,

    #[error("unsupported replay version '{0}'")]
    Version(String),

    #[error("malformed replay field '{field}': '{value}'")]
    Field { field: &'static str, value: String },

    #[error("expected 6 replay fields, found {0}")]
    FieldCount(usize),
}

impl Replay {
    pub fn new(parameters: GenParameters, path: Vec<usize>) -> Self {
        Replay { parameters, path }
    }

    pub fn encode(&self) -> String {
        let rng = self.parameters.rng;
        let waypoint = match self.parameters.rng_waypoint {
            Some(waypoint) => format!("{}:{}", waypoint.seed(), waypoint.order()),
            None => "-".to_string(),
        };
        let path: Vec<String> = self.path.iter().map(|index| index.to_string()).collect();
        let plain = format!(
            "{VERSION}|{}|{}|{}|{}|{}",
            rng.seed(),
            rng.order(),
            self.parameters.size.get(),
            waypoint,
            path.join(":")
        );
        URL_SAFE_NO_PAD.encode(plain)
    }

    pub fn decode(token: &str) -> Result<Self, ReplayDecodeError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
        let plain = String::from_utf8(bytes).map_err(|_| ReplayDecodeError::Utf8)?;
        let fields: Vec<&str> = plain.split('|').collect();
        if fields.len() != 6 {
            return Err(ReplayDecodeError::FieldCount(fields.len()));
        }
        if fields[0] != VERSION {
            return Err(ReplayDecodeError::Version(fields[0].to_string()));
        }

        let seed = parse_field("seed", fields[1])?;
        let order = parse_field("order", fields[2])?;
        let size: usize = parse_field("size", fields[3])?;
        if size > Size::MAX.get() {
            return Err(field_error("size", fields[3]));
        }
        let rng_waypoint = match fields[4] {
            "-" => None,
            waypoint => {
                let (seed, order) = waypoint
                    .split_once(':')
                    .ok_or_else(|| field_error("waypoint", waypoint))?;
                Some(Rng::at(
                    parse_field("waypoint", seed)?,
                    parse_field("waypoint", order)?,
                ))
            }
        };
        let path = if fields[5].is_empty() {
            Vec::new()
        } else {
            fields[5]
                .split(':')
                .map(|index| parse_field("path", index))
                .collect::<Result<Vec<usize>, _>>()?
        };

        Ok(Replay {
            parameters: GenParameters {
                rng: Rng::at(seed, order),
                size: Size::new(size),
                rng_waypoint,
            },
            path,
        })
    }
}

fn field_error(field: &'static str, value: &str) -> ReplayDecodeError {
    ReplayDecodeError::Field {
        field,
        value: value.to_string(),
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, ReplayDecodeError> {
    value.parse().map_err(|_| field_error(field, value))
}
