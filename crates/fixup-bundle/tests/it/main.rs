//! Integration tests for fixing bundles, against real files in temporary directories and a
//! scripted toolchain.

#![cfg(unix)]

pub(crate) mod common;

mod fix;
mod patch;
