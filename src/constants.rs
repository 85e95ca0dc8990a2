/// Identifier field every document carries within its collection.
pub const ID_FIELD: &str = "_id";

/// Glue used by the field joiner when none is given.
pub(crate) const DEFAULT_JOIN_GLUE: &str = ", ";

/// Environment variable prefix for configuration overrides.
pub(crate) const ENV_PREFIX: &str = "DENORM";
