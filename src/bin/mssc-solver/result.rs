use mssc_solver::InstanceError;
use mssc_solver::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read the instance file: {0}")]
    Io(#[from] std::io::Error),
    #[error("instance file ended while reading the {0}")]
    UnexpectedEnd(&'static str),
    #[error("malformed {0}: {1:?}")]
    MalformedToken(&'static str, String),
    #[error("expected {expected} memberships, found {found} trailing tokens")]
    MembershipRowLength { expected: usize, found: usize },
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
