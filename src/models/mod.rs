// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire-format types.
//!
//! Everything the protocol reads or writes is a single-line JSON object.
//! Request bodies live in [`request`], reply envelopes in [`response`],
//! and the frames the server pushes without being asked in [`frames`].

pub mod frames;
pub mod request;
pub mod response;

use serde::Serialize;

/// Serializes a reply or frame to its wire form (no trailing newline; the
/// writer appends it).
pub fn to_frame<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("wire types always serialize")
}
