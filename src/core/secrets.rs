// Authentication keys and salts: local generation plus the remote salt service.
use std::time::Duration;

use getrandom::fill as fill_random;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::core::locator::{self, DefinitionKind};

pub const SALT_KEYS: [&str; 8] = [
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];

pub const DEFAULT_SALT_URL: &str = "https://api.wordpress.org/secret-key/1.1/salt/";

const SECRET_LEN: usize = 64;
const ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_ []{}<>~`+=,.;:/?|";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A 64-character secret drawn uniformly from the salt alphabet.
pub fn generate_secret() -> Result<String, Error> {
    // Bytes at or above this bound would bias the modulo; they are redrawn.
    let bound = (256 / ALPHABET.len() * ALPHABET.len()) as u8;
    let mut out = String::with_capacity(SECRET_LEN);
    let mut pool = [0u8; 128];
    while out.len() < SECRET_LEN {
        fill_random(&mut pool).map_err(|err| {
            Error::new(ErrorKind::KeyGeneration)
                .with_message(format!("failed to read system randomness: {err}"))
        })?;
        for byte in pool.iter().copied().filter(|byte| *byte < bound) {
            if out.len() == SECRET_LEN {
                break;
            }
            out.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
        }
    }
    Ok(out)
}

/// Value of a `define('KEY', '...');` line as served by the salt service.
pub fn parse_secret_line(line: &str) -> Option<String> {
    locator::find_all_in_code(line)
        .into_iter()
        .find(|definition| definition.kind == DefinitionKind::Constant)
        .map(|definition| definition.value.as_str().to_string())
}

#[derive(Clone, Debug)]
pub struct RemoteSalts {
    url: Url,
    agent: ureq::Agent,
}

impl RemoteSalts {
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid salt service url '{url}'"))
                .with_source(err)
        })?;
        let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
        Ok(Self { url, agent })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch one set of secrets, returned as the raw `define(...)` lines.
    pub fn fetch(&self) -> Result<Vec<String>, Error> {
        let response = match self.agent.get(self.url.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::new(ErrorKind::KeyGeneration)
                    .with_message(format!("salt service returned status {code}")));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::KeyGeneration)
                    .with_message("salt service request failed")
                    .with_source(err));
            }
        };
        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::KeyGeneration)
                .with_message("failed to read salt service response")
                .with_source(err)
        })?;
        let lines: Vec<String> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!(url = %self.url, lines = lines.len(), "fetched remote salts");
        Ok(lines)
    }
}
