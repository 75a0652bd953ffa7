// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{RenderError, RenderResult};

pub const VERTEX_FILE: &str = "basic.vert.spirv";
pub const FRAGMENT_FILE: &str = "basic.frag.spirv";
pub const DEFAULT_DIR: &str = "spirv";

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// SPIR-V for the quad's vertex and fragment stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSet {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderSet {
    /// Reads `basic.vert.spirv` and `basic.frag.spirv` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> RenderResult<Self> {
        let dir = dir.as_ref();
        let vertex = read_spirv(&dir.join(VERTEX_FILE))?;
        let fragment = read_spirv(&dir.join(FRAGMENT_FILE))?;
        Ok(Self { vertex, fragment })
    }

    pub fn from_bytes(vertex: &[u8], fragment: &[u8]) -> RenderResult<Self> {
        Ok(Self {
            vertex: words(VERTEX_FILE, vertex)?,
            fragment: words(FRAGMENT_FILE, fragment)?,
        })
    }
}

fn read_spirv(path: &Path) -> RenderResult<Vec<u32>> {
    let bytes = fs::read(path).map_err(|source| RenderError::ShaderLoad {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    words(&path.display().to_string(), &bytes)
}

/// Converts little-endian SPIR-V bytes to words and checks the header.
fn words(name: &str, bytes: &[u8]) -> RenderResult<Vec<u32>> {
    let invalid = |reason| RenderError::InvalidShader {
        name: name.to_owned(),
        reason,
    };
    if bytes.is_empty() {
        return Err(invalid("empty"));
    }
    if bytes.len() % 4 != 0 {
        return Err(invalid("length is not a multiple of four"));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect();
    if words[0] != SPIRV_MAGIC {
        return Err(invalid("bad magic number"));
    }
    Ok(words)
}
