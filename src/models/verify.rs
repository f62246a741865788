use std::collections::BTreeMap;
use std::io::BufRead;

use serde::Serialize;

use crate::error::{Result, ValidationError};
use crate::models::status::Status;

/// Fields returned by the verification service, keyed by name.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct VerifyResponse {
    fields: BTreeMap<String, String>,
}

impl VerifyResponse {
    /// Reads `key=value` lines until end of stream.
    ///
    /// Lines without a `=` are skipped. The value keeps everything after the
    /// first `=` minus its line terminator. A repeated key overwrites the
    /// earlier value.
    pub fn parse<R: BufRead>(mut reader: R) -> std::io::Result<Self> {
        let mut fields = BTreeMap::new();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            if let Some((key, value)) = line.split_once('=') {
                fields.insert(
                    key.to_string(),
                    value.trim_end_matches(['\r', '\n']).to_string(),
                );
            }
        }

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn status(&self) -> Status {
        self.get("status").map_or(Status::Unknown, Status::from_code)
    }

    /// The OTP echoed back by the service.
    pub fn otp(&self) -> Option<&str> {
        self.get("otp")
    }

    /// The nonce echoed back by the service.
    pub fn nonce(&self) -> Option<&str> {
        self.get("nonce")
    }

    /// Server timestamp (`t`).
    pub fn timestamp(&self) -> Option<&str> {
        self.get("t")
    }

    /// Percentage of sync servers that answered (`sl`).
    pub fn sync_level(&self) -> Option<&str> {
        self.get("sl")
    }

    /// Response signature (`h`). Not verified.
    pub fn signature(&self) -> Option<&str> {
        self.get("h")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Succeeds only for `status=OK`; anything else becomes a `Failure`
    /// carrying the whole response.
    pub fn into_outcome(self) -> Result<Self> {
        match self.status() {
            Status::Ok => Ok(self),
            status => Err(ValidationError::Failure {
                status,
                response: self,
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VerifyResponse {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
