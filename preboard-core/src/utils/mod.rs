pub mod identifiers;
pub mod validation;
