/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use http::StatusCode;
use thiserror::Error;

/// Stable, machine-readable identifiers. Clients match on these, never on the
/// message text.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const DELETED_CONFLICT: &str = "DELETED_CONFLICT";
    pub const UPSTREAM_WRITE_FAILURE: &str = "UPSTREAM_WRITE_FAILURE";
    pub const UPSTREAM_READ_FAILURE: &str = "UPSTREAM_READ_FAILURE";
    pub const NO_RESULTS: &str = "NO_RESULTS";
    pub const ERROR_FETCHING_CHILDREN: &str = "ERROR_FETCHING_CHILDREN";
}

/// Every failure the engine reports. `Display` is the user-facing message.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content not found")]
    NotFound,

    #[error("Content already exists with ContentId: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Content with ID {0} has been deleted and cannot be updated")]
    DeletedConflict(String),

    #[error("Failed to write content: {0}")]
    UpstreamWriteFailure(String),

    #[error("Failed to read content: {0}")]
    UpstreamReadFailure(String),

    #[error("No comments found or data fetching not complete")]
    NoResults,

    #[error("Error fetching content with children: {0}")]
    ErrorFetchingChildren(#[source] Box<ContentError>),
}

impl ContentError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => error_code::NOT_FOUND,
            Self::AlreadyExists(_) => error_code::ALREADY_EXISTS,
            Self::ValidationError(_) => error_code::VALIDATION_FAILED,
            Self::DeletedConflict(_) => error_code::DELETED_CONFLICT,
            Self::UpstreamWriteFailure(_) => error_code::UPSTREAM_WRITE_FAILURE,
            Self::UpstreamReadFailure(_) => error_code::UPSTREAM_READ_FAILURE,
            Self::NoResults => error_code::NO_RESULTS,
            Self::ErrorFetchingChildren(_) => error_code::ERROR_FETCHING_CHILDREN,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::DeletedConflict(_) | Self::NoResults => StatusCode::NOT_FOUND,
            Self::ErrorFetchingChildren(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamWriteFailure(_) | Self::UpstreamReadFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn write(err: anyhow::Error) -> Self {
        Self::UpstreamWriteFailure(format!("{err:#}"))
    }

    pub(crate) fn read(err: anyhow::Error) -> Self {
        Self::UpstreamReadFailure(format!("{err:#}"))
    }

    pub(crate) fn fetching_children(cause: ContentError) -> Self {
        Self::ErrorFetchingChildren(Box::new(cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_stable() {
        assert_eq!(ContentError::NotFound.to_string(), "Content not found");
        assert_eq!(
            ContentError::AlreadyExists("P1".into()).to_string(),
            "Content already exists with ContentId: P1"
        );
        assert_eq!(
            ContentError::DeletedConflict("P1".into()).to_string(),
            "Content with ID P1 has been deleted and cannot be updated"
        );
        assert_eq!(
            ContentError::ValidationError("Content must have a ContentId".into()).to_string(),
            "Content must have a ContentId"
        );
        assert_eq!(
            ContentError::NoResults.to_string(),
            "No comments found or data fetching not complete"
        );
    }

    #[test]
    fn children_error_keeps_its_cause() {
        let err = ContentError::fetching_children(ContentError::NotFound);
        assert_eq!(
            err.to_string(),
            "Error fetching content with children: Content not found"
        );
        assert_eq!(err.source().unwrap().to_string(), "Content not found");
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(ContentError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ContentError::AlreadyExists("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ContentError::ValidationError("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ContentError::DeletedConflict("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ContentError::UpstreamWriteFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ContentError::UpstreamReadFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ContentError::NoResults.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ContentError::fetching_children(ContentError::NoResults).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(ContentError::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ContentError::AlreadyExists("x".into()).error_code(), "ALREADY_EXISTS");
        assert_eq!(ContentError::DeletedConflict("x".into()).error_code(), "DELETED_CONFLICT");
        assert_eq!(ContentError::NoResults.error_code(), "NO_RESULTS");
    }
}
