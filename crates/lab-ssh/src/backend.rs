//! Transport backends for executing remote commands.

#[cfg(feature = "ssh")]
pub mod ssh;
