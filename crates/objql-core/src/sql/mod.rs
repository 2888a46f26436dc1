//! SQL generation: dialects, parameter binding, and statement rendering.

mod dialect;
mod generator;
mod params;

pub use dialect::SqlDialect;
pub use generator::SqlGenerator;
pub use params::{GeneratedSql, ParameterBag};
