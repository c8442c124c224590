//! A success/failure container for sequencing fallible pipeline steps.
//!
//! [`Outcome`] carries either the value produced by a step or the error that
//! stopped the pipeline. Steps are chained with [`Outcome::then`]: once a step
//! fails, every later step is skipped and the original failure travels to the
//! end of the chain untouched. The caller decides what to do with the terminal
//! value, usually by converting it back into a [`Result`] with
//! [`Outcome::into_result`].

use std::fmt;
use std::future::Future;

use thiserror::Error;

/// Returned by [`Outcome::all`] when it is given nothing to combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no outcomes were supplied to combine")]
pub struct NoOutcomes;

/// The result of a fallible computation, represented as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    /// Wraps a plain value as a success.
    pub fn unit(value: T) -> Self {
        Outcome::Success(value)
    }

    /// Runs `f` and captures its error, if any, as a failure.
    ///
    /// The error is converted into `E`, so a step can use `?` internally on
    /// whatever error types it touches as long as they convert.
    pub fn attempt<F, X>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, X>,
        X: Into<E>,
    {
        match f() {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err.into()),
        }
    }

    /// Chains the next fallible step.
    ///
    /// `f` only runs on a success. A failure is returned as-is.
    pub fn then<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Outcome<U, E>,
    {
        match self {
            Outcome::Success(value) => f(value),
            Outcome::Failure(err) => Outcome::Failure(err),
        }
    }

    /// [`Outcome::then`] for steps that have to await I/O.
    pub async fn then_async<U, F, Fut>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Outcome<U, E>>,
    {
        match self {
            Outcome::Success(value) => f(value).await,
            Outcome::Failure(err) => Outcome::Failure(err),
        }
    }

    /// Applies an infallible transform to the success payload.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(err) => Outcome::Failure(err),
        }
    }

    /// Returns the payload, or `default` on failure.
    pub fn get_or_else(self, default: T) -> T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(_) => default,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }

    /// Combines several outcomes into one.
    ///
    /// Yields the first failure in iteration order if there is one, otherwise
    /// every payload in the order given. An empty input is a failure: there is
    /// nothing to vouch for.
    pub fn all<I>(outcomes: I) -> Outcome<Vec<T>, E>
    where
        I: IntoIterator<Item = Outcome<T, E>>,
        E: From<NoOutcomes>,
    {
        let mut values = Vec::new();
        let mut seen = false;

        for outcome in outcomes {
            seen = true;
            match outcome {
                Outcome::Success(value) => values.push(value),
                Outcome::Failure(err) => return Outcome::Failure(err),
            }
        }

        if !seen {
            return Outcome::Failure(NoOutcomes.into());
        }
        Outcome::Success(values)
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => write!(f, "Success: {value}"),
            Outcome::Failure(err) => write!(f, "Failure: {err}"),
        }
    }
}
