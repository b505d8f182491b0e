use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Girder operations.
#[derive(Debug, Error, Diagnostic)]
pub enum GirderError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed dependency coordinate or version text.
    #[error("Invalid coordinate: {message}")]
    #[diagnostic(help("Coordinates use the form group:name[:version][:classifier][:kind]"))]
    Coordinate { message: String },

    /// A `before`/`after` hint anchor matched zero or multiple entries.
    #[error("Ambiguous hint: {message}")]
    #[diagnostic(help("Anchor matchers must select exactly one existing entry"))]
    AmbiguousHint { message: String },

    /// A version range had no satisfying candidate.
    #[error("No version of {module} matches {range} (candidates: {candidates})")]
    NoMatchingVersion {
        module: String,
        range: String,
        candidates: String,
    },

    /// A dependency carries no version and none is managed for it.
    #[error("No version declared or managed for {module} (requested via {path})")]
    #[diagnostic(help("Declare a version on the dependency or add it to the managed table"))]
    MissingVersion { module: String, path: String },

    /// The repository collaborator failed or had no trace of a needed module.
    #[error("Failed to fetch {module} from {sources}: {message}")]
    RepositoryFetch {
        module: String,
        sources: String,
        message: String,
    },

    /// A `${token}` expansion re-entered a key it is already expanding.
    #[error("Interpolation cycle on `${{{token}}}` (chain: {chain})")]
    InterpolationCycle { token: String, chain: String },

    /// Adding a scope inheritance edge would create a cycle.
    #[error("Scope `{scope}` cannot inherit `{inherits}`: would create a cycle")]
    ScopeCycle { scope: String, inherits: String },

    /// A requested scope is not registered in the scope graph.
    #[error("Unknown scope `{scope}`")]
    UnknownScope { scope: String },

    /// Invalid or malformed build description (Girder.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Girder.toml for syntax errors"))]
    Manifest { message: String },

    /// Dependency resolution failed.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `Result` over [`GirderError`].
pub type GirderResult<T> = Result<T, GirderError>;
