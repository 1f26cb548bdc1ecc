//! CLI command implementations

pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod create;
pub(crate) mod down;
pub(crate) mod down_to;
pub(crate) mod redo;
pub(crate) mod reset;
pub(crate) mod status;
pub(crate) mod up;
pub(crate) mod up_to;
pub(crate) mod version;
