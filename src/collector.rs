//! Thread-safe collection of independent failures
//!
//! Model building fans out across files (and, inside a file, across methods
//! and enums). Each unit of work records its failure here instead of
//! returning early, so a single run reports every problem at once.

use crate::GeneratorError;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects errors from any number of threads
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<GeneratorError>>,
}

impl ErrorCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn add(&self, error: impl Into<GeneratorError>) {
        self.lock().push(error.into());
    }

    /// Record the error of `result`, if any
    pub fn add_result<T, E>(&self, result: Result<T, E>) -> Option<T>
    where
        E: Into<GeneratorError>,
    {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.add(error);
                None
            }
        }
    }

    /// Number of recorded errors
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consume the collector, joining everything it recorded
    ///
    /// Returns `None` when no error was recorded.
    pub fn into_error(self) -> Option<AggregateError> {
        let errors = self
            .errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if errors.is_empty() {
            None
        } else {
            Some(AggregateError { errors })
        }
    }

    /// Like [`ErrorCollector::into_error`], shaped as a `Result`
    pub fn into_result(self) -> Result<(), GeneratorError> {
        match self.into_error() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    // A panicking worker must not hide the errors recorded by the others.
    fn lock(&self) -> MutexGuard<'_, Vec<GeneratorError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Several errors reported as one
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<GeneratorError>,
}

impl AggregateError {
    /// The joined errors, in append order
    pub fn iter(&self) -> impl Iterator<Item = &GeneratorError> {
        self.errors.iter()
    }

    /// Number of joined errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false for collector-built values; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Unwrap into the individual errors
    pub fn into_errors(self) -> Vec<GeneratorError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
