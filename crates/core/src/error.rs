// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error taxonomy shared by every component and the wire protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error kinds, used both internally and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    AlreadyExists,
    QueueFull,
    NoAvailableWorker,
    WorkerStartFailed,
    WorkerUnhealthy,
    Timeout,
    Cancelled,
    Cooldown,
    RateLimited,
    Io,
    Internal,
    UnknownCommand,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidConfig => "invalid-config",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::QueueFull => "queue-full",
            ErrorKind::NoAvailableWorker => "no-available-worker",
            ErrorKind::WorkerStartFailed => "worker-start-failed",
            ErrorKind::WorkerUnhealthy => "worker-unhealthy",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Cooldown => "cooldown",
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
            ErrorKind::UnknownCommand => "unknown-command",
        };
        write!(f, "{s}")
    }
}

/// A single `(path, message)` validation diagnostic, carried by `InvalidConfig`.
pub type Diagnostic = (String, String);

/// Top-level error type any component may return.
///
/// Carries the closed [`ErrorKind`] plus a human message and optional
/// structured details, matching the wire error shape `{kind, message, details}`.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct PoppoError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Diagnostic>,
}

impl PoppoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: Vec::new() }
    }

    pub fn with_details(mut self, details: Vec<Diagnostic>) -> Self {
        self.details = details;
        self
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, what)
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, what)
    }

    pub fn internal(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, what)
    }
}

pub type Result<T> = std::result::Result<T, PoppoError>;
