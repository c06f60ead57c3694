//! Reply codes the client waits for.

// 1xx: Positive Preliminary Reply
/// Data connection already open; transfer starting.
pub const ALREADY_OPEN: u32 = 125;
/// File status okay; about to open data connection.
pub const ABOUT_TO_SEND: u32 = 150;

// 2xx: Positive Completion Reply
pub const COMMAND_OK: u32 = 200;
/// Command not implemented, superfluous at this site.
pub const COMMAND_NOT_IMPLEMENTED: u32 = 202;
/// System status, or system help reply. `FEAT` answers with it.
pub const SYSTEM: u32 = 211;
/// File status. `SIZE` and `MDTM` answer with it.
pub const FILE: u32 = 213;
/// Service ready for new user. Greeting, and the answer to `REIN`.
pub const READY: u32 = 220;
/// Service closing control connection.
pub const CLOSING: u32 = 221;
pub const CLOSING_DATA_CONNECTION: u32 = 226;
pub const PASSIVE_MODE: u32 = 227;
pub const EXTENDED_PASSIVE_MODE: u32 = 229;
pub const LOGGED_IN: u32 = 230;
pub const REQUESTED_FILE_ACTION_OK: u32 = 250;
pub const PATH_CREATED: u32 = 257;

// 3xx: Positive Intermediate Reply
pub const NEED_PASSWORD: u32 = 331;
/// Requested file action pending further information (`REST`, `RNFR`).
pub const REQUEST_FILE_PENDING: u32 = 350;
