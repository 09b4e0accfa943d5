// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Format, compression and structure metadata carried by a configuration

use crate::{EngineKind, Error, Result};
use std::fmt;
use std::str::FromStr;

/// Sentinel meaning "resolve later from inference"
pub const AUTO: &str = "auto";

/// Compression codecs understood by the readers and writers downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    Auto,
    None,
    Gzip,
    Deflate,
    Brotli,
    Xz,
    Zstd,
    Lz4,
    Bzip2,
    Snappy,
}

impl CompressionMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionMethod::Auto => AUTO,
            CompressionMethod::None => "none",
            CompressionMethod::Gzip => "gzip",
            CompressionMethod::Deflate => "deflate",
            CompressionMethod::Brotli => "br",
            CompressionMethod::Xz => "xz",
            CompressionMethod::Zstd => "zstd",
            CompressionMethod::Lz4 => "lz4",
            CompressionMethod::Bzip2 => "bz2",
            CompressionMethod::Snappy => "snappy",
        }
    }
}

impl FromStr for CompressionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(CompressionMethod::Auto),
            "none" | "" => Ok(CompressionMethod::None),
            "gzip" | "gz" => Ok(CompressionMethod::Gzip),
            "deflate" => Ok(CompressionMethod::Deflate),
            "br" | "brotli" => Ok(CompressionMethod::Brotli),
            "xz" | "lzma" => Ok(CompressionMethod::Xz),
            "zstd" | "zst" => Ok(CompressionMethod::Zstd),
            "lz4" => Ok(CompressionMethod::Lz4),
            "bz2" | "bzip2" => Ok(CompressionMethod::Bzip2),
            "snappy" => Ok(CompressionMethod::Snappy),
            other => Err(format!("Unsupported compression method: {}", other)),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata field left as [`AUTO`] for a collaborator to infer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeferredField {
    Format,
    Compression,
    Structure,
}

/// Format, compression and schema strings of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: String,
    pub compression_method: String,
    pub structure: String,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            format: AUTO.to_string(),
            compression_method: AUTO.to_string(),
            structure: AUTO.to_string(),
        }
    }
}

#[must_use]
pub fn is_auto(value: &str) -> bool {
    value.eq_ignore_ascii_case(AUTO)
}

impl FormatSpec {
    /// Fields still holding [`AUTO`], in declaration order
    #[must_use]
    pub fn deferred(&self) -> Vec<DeferredField> {
        let mut out = Vec::new();
        if is_auto(&self.format) {
            out.push(DeferredField::Format);
        }
        if is_auto(&self.compression_method) {
            out.push(DeferredField::Compression);
        }
        if is_auto(&self.structure) {
            out.push(DeferredField::Structure);
        }
        out
    }

    /// Parse the compression string
    pub fn compression(&self, engine: EngineKind) -> Result<CompressionMethod> {
        self.compression_method
            .parse()
            .map_err(|e: String| Error::configuration(engine, e))
    }

    /// Canonicalize the compression string, rejecting unknown codecs
    pub(crate) fn normalize_compression(&mut self, engine: EngineKind) -> Result<()> {
        let method = self.compression(engine)?;
        self.compression_method = method.as_str().to_string();
        Ok(())
    }
}
