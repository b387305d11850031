//! Deterministic folder and file naming for pipeline outputs.

pub mod resolver;
pub mod token;

pub use resolver::{
    generate_timestamp, resolve, Mode, NamingContext, PathResolver, ResolvedPaths,
    TIMESTAMP_FORMAT,
};
pub use token::{sanitize_token, MAX_TOKEN_LENGTH};
