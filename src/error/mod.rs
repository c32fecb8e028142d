use std::fmt;

use tracing::error;

/// Errors raised while configuring or running the transformation pipeline.
///
/// A `CriticalError` aborts the processing of the current document, while a
/// `GeneralError` signals something the host may report and move past.
#[derive(Clone, PartialEq, Debug)]
pub enum UtilityModulesError {
    /// A severe failure: the document cannot be processed any further.
    CriticalError(UtilityModulesErrorType),
    /// A recoverable failure, usually reported back to the host.
    GeneralError(UtilityModulesErrorType),
}

impl fmt::Display for UtilityModulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TYPE: {:?}\nKIND: {:?}\nACTION: {:?}\nMESSAGE: {}",
            self.get_type(),
            self.get_kind(),
            self.get_action(),
            self.get_message()
        )
    }
}

impl std::error::Error for UtilityModulesError {}

impl UtilityModulesError {
    /// Checks if the error is a critical error.
    ///
    /// # Returns
    /// `true` if the error is a `CriticalError`, otherwise `false`.
    pub fn is_critical(&self) -> bool {
        matches!(self, UtilityModulesError::CriticalError(_))
    }

    /// Checks if the error is a general error.
    ///
    /// # Returns
    /// `true` if the error is a `GeneralError`, otherwise `false`.
    pub fn is_general(&self) -> bool {
        matches!(self, UtilityModulesError::GeneralError(_))
    }

    /// Returns the action the host is expected to take.
    pub fn get_action(&self) -> ErrorAction {
        self.inner().get_action()
    }

    /// Retrieves the human readable message of the error.
    pub fn get_message(&self) -> String {
        self.inner().get_message()
    }

    /// Retrieves the kind of the error.
    pub fn get_kind(&self) -> ErrorKind {
        self.inner().get_kind()
    }

    /// Retrieves the layer the error originated from.
    pub fn get_type(&self) -> ErrorType {
        self.inner().get_type()
    }

    fn inner(&self) -> &UtilityModulesErrorType {
        match self {
            UtilityModulesError::CriticalError(err) => err,
            UtilityModulesError::GeneralError(err) => err,
        }
    }

    /// Raises a critical error related to the configuration of the pipeline.
    ///
    /// # Parameters
    /// - `kind`: The specific kind of error.
    /// - `message`: A message describing the error.
    /// - `action`: The action to be taken for this error.
    ///
    /// # Returns
    /// A `UtilityModulesError::CriticalError` with the associated `ConfigurationError` details.
    pub fn raise_critical_configuration_error(
        kind: ErrorKind,
        message: &str,
        action: ErrorAction,
    ) -> Self {
        error!(
            "Critical Configuration Error raised. Kind: {:?}, Message: '{}', Action: {:?}",
            kind, message, action
        );

        UtilityModulesError::CriticalError(UtilityModulesErrorType::ConfigurationError {
            kind,
            message: message.to_string(),
            action,
        })
    }

    /// Raises a critical error produced while reading a stylesheet.
    pub fn raise_critical_stylesheet_error(
        kind: ErrorKind,
        message: &str,
        action: ErrorAction,
    ) -> Self {
        error!(
            "Critical Stylesheet Error raised. Kind: {:?}, Message: '{}', Action: {:?}",
            kind, message, action
        );

        UtilityModulesError::CriticalError(UtilityModulesErrorType::StylesheetError {
            kind,
            message: message.to_string(),
            action,
        })
    }

    /// Raises a critical error produced while the pipeline was running.
    pub fn raise_critical_pipeline_error(
        kind: ErrorKind,
        message: &str,
        action: ErrorAction,
    ) -> Self {
        error!(
            "Critical Pipeline Error raised. Kind: {:?}, Message: '{}', Action: {:?}",
            kind, message, action
        );

        UtilityModulesError::CriticalError(UtilityModulesErrorType::PipelineError {
            kind,
            message: message.to_string(),
            action,
        })
    }

    /// Raises a general error produced while the pipeline was running.
    ///
    /// Used for failures reported by the host callbacks, which are handed
    /// back to the caller unchanged.
    pub fn raise_general_pipeline_error(
        kind: ErrorKind,
        message: &str,
        action: ErrorAction,
    ) -> Self {
        error!(
            "General Pipeline Error raised. Kind: {:?}, Message: '{}', Action: {:?}",
            kind, message, action
        );

        UtilityModulesError::GeneralError(UtilityModulesErrorType::PipelineError {
            kind,
            message: message.to_string(),
            action,
        })
    }

    /// Raises a general error that doesn't belong to any other layer.
    pub fn raise_general_other_error(kind: ErrorKind, message: &str, action: ErrorAction) -> Self {
        error!(
            "General Other Error raised. Kind: {:?}, Message: '{}', Action: {:?}",
            kind, message, action
        );

        UtilityModulesError::GeneralError(UtilityModulesErrorType::OtherError {
            kind,
            message: message.to_string(),
            action,
        })
    }
}

/// The layer an error belongs to, each carrying its kind, message and action.
#[derive(Clone, PartialEq, Debug)]
pub enum UtilityModulesErrorType {
    /// Invalid options or filter patterns.
    ConfigurationError {
        kind: ErrorKind,
        message: String,
        action: ErrorAction,
    },
    /// The stylesheet text could not be read into a tree.
    StylesheetError {
        kind: ErrorKind,
        message: String,
        action: ErrorAction,
    },
    /// A failure while transforming a document.
    PipelineError {
        kind: ErrorKind,
        message: String,
        action: ErrorAction,
    },
    OtherError {
        kind: ErrorKind,
        message: String,
        action: ErrorAction,
    },
}

impl UtilityModulesErrorType {
    /// Retrieves the action to take for this error.
    pub fn get_action(&self) -> ErrorAction {
        match self {
            UtilityModulesErrorType::ConfigurationError { action, .. }
            | UtilityModulesErrorType::StylesheetError { action, .. }
            | UtilityModulesErrorType::PipelineError { action, .. }
            | UtilityModulesErrorType::OtherError { action, .. } => action.clone(),
        }
    }

    /// Retrieves the message describing the error.
    pub fn get_message(&self) -> String {
        match self {
            UtilityModulesErrorType::ConfigurationError { message, .. }
            | UtilityModulesErrorType::StylesheetError { message, .. }
            | UtilityModulesErrorType::PipelineError { message, .. }
            | UtilityModulesErrorType::OtherError { message, .. } => message.clone(),
        }
    }

    /// Retrieves the kind of error that occurred.
    pub fn get_kind(&self) -> ErrorKind {
        match self {
            UtilityModulesErrorType::ConfigurationError { kind, .. }
            | UtilityModulesErrorType::StylesheetError { kind, .. }
            | UtilityModulesErrorType::PipelineError { kind, .. }
            | UtilityModulesErrorType::OtherError { kind, .. } => kind.clone(),
        }
    }

    /// Retrieves the `ErrorType` variant matching this error.
    pub fn get_type(&self) -> ErrorType {
        match self {
            UtilityModulesErrorType::ConfigurationError { .. } => ErrorType::ConfigurationError,
            UtilityModulesErrorType::StylesheetError { .. } => ErrorType::StylesheetError,
            UtilityModulesErrorType::PipelineError { .. } => ErrorType::PipelineError,
            UtilityModulesErrorType::OtherError { .. } => ErrorType::OtherError,
        }
    }
}

/// What the host should do about an error.
#[derive(Clone, PartialEq, Debug)]
pub enum ErrorAction {
    /// The input (options or stylesheet) has to be fixed.
    Fix,
    /// Report the error to the user.
    Notify,
    /// Nothing to be done, the error is informational.
    Ignore,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ErrorType {
    ConfigurationError,
    StylesheetError,
    PipelineError,
    OtherError,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ErrorKind {
    ConfigParsingError,
    InvalidFilterPattern,
    InvalidUsedClassPattern,
    StylesheetParsingError,
    ModulesCallbackFailed,
    UtilityModulesCallbackFailed,
    Other,
}
