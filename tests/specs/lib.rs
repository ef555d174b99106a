// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box specs for the `outbound` binary.
//!
//! The files under `cli/` are compiled as integration tests of the
//! `outbound-cli` package so they can locate the built binary.
