pub mod identity;
pub mod validate_utils;
