//! Exit codes for the CLI.
//!
//! These follow common Unix conventions so scripts can tell an
//! unreachable server apart from a request the server refused.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Command-line usage or configuration error
pub const USAGE_ERROR: u8 = 2;

/// Could not reach the detection server
pub const CONNECTION_FAILED: u8 = 3;

/// The server answered, but the request failed or was rejected
pub const REQUEST_FAILED: u8 = 4;
