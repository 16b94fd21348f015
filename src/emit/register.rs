//! Live registration call stream
//!
//! Each register call becomes one JSON line on the configured writer, for a
//! declarative-management session to pick up. The returned handle is what
//! later children use to name their parent.

use super::{LiveHandle, Registrar};
use crate::mapper::split_token;
use crate::model::sanitize_display_name;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct RegisterCall<'a> {
    #[serde(rename = "type")]
    type_token: &'a str,
    name: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
    handle: &'a str,
}

pub struct StreamRegistrar<W: Write + Send> {
    writer: W,
}

impl StreamRegistrar<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> StreamRegistrar<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> Registrar for StreamRegistrar<W> {
    async fn register(
        &mut self,
        type_token: &str,
        name: &str,
        identity: &str,
        parent: Option<&LiveHandle>,
    ) -> Result<LiveHandle> {
        if split_token(type_token).is_none() {
            anyhow::bail!("malformed type token '{}'", type_token);
        }

        let handle = uuid::Uuid::new_v4();
        let name = registration_name(name, identity, &handle);
        let handle = handle.to_string();
        let call = RegisterCall {
            type_token,
            name: &name,
            id: identity,
            parent: parent.map(String::as_str),
            handle: &handle,
        };

        let line = serde_json::to_string(&call).context("Failed to encode register call")?;
        writeln!(self.writer, "{}", line).context("Failed to write register call")?;
        self.writer.flush().context("Failed to flush register stream")?;

        tracing::debug!(type_token, identity, %handle, "registered");
        Ok(handle)
    }
}

/// Non-empty name for a register call
///
/// Names that sanitized away fall back to the sanitized identity, then to a
/// name derived from the handle.
fn registration_name(name: &str, identity: &str, handle: &uuid::Uuid) -> String {
    if !name.is_empty() {
        return name.to_string();
    }
    let from_identity = sanitize_display_name(identity).replace(' ', "");
    if !from_identity.is_empty() {
        tracing::debug!(identity, "empty name, using identity");
        return from_identity;
    }
    format!("resource{}", handle.simple())
}
