//! Utility functions for input masking and string matching.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, mask_cep, mask_cpf, mask_phone, truncate_string};
