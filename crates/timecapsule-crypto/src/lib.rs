/// Timecapsule Crypto Library
///
/// Message subjects and bodies are sealed with AES-256-GCM under a single
/// server-held key. Content stays sealed in the database and is only opened
/// by the delivery engine right before the email goes out.

pub mod encrypt;
pub mod keys;

pub use encrypt::PayloadCodec;
