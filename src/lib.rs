mod depth;
mod error;
mod rbset;

pub use crate::depth::Depth;
pub use crate::error::RbsetError;
pub use crate::rbset::{Rbset, Stats};

#[cfg(test)]
mod rbset_test;
