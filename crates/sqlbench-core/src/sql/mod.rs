pub mod command;
pub mod params;

pub use command::{BoundParam, CommandBuilder, ResolvedStatement};
pub use params::{DeclaredParameter, ParameterExtractor, ParseError};
