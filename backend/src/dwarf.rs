use std::{fs, path::Path};

use addr2line::Context;
use retsnoop_render::{InlineFrame, ResolvedFrame, Symbolizer};
use tracing::warn;

use crate::errors::AttachError;

// DWARF SYMBOLIZER
// ================================================================================================

/// Source-root prefixes the renderer recognizes and keeps; everything before the matched prefix
/// is dropped from a resolved path (SPEC_FULL.md §4.5 step 7).
const KNOWN_SOURCE_ROOTS: &[&str] = &["arch/", "kernel/", "fs/", "net/", "drivers/", "mm/", "include/", "lib/"];

/// DWARF-backed implementation of [`Symbolizer`], owning the parsed debug image for the lifetime
/// of a run.
///
/// `Context::new` copies the sections it needs out of the `object::File` into owned
/// `EndianRcSlice` buffers, so the context has no lifetime tied to the original file bytes.
pub struct DwarfSymbolizer {
    ctx: Context<gimli::EndianRcSlice<gimli::RunTimeEndian>>,
}

impl DwarfSymbolizer {
    /// Loads and parses `path` as an ELF/DWARF debug image (SPEC_FULL.md §6: `-k PATH`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AttachError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|source| AttachError::DebugImageUnreadable { path: path.to_path_buf(), source })?;
        let object = object::File::parse(&*data)
            .map_err(|e| AttachError::DebugImageMalformed(path.to_path_buf(), e.to_string()))?;
        let ctx = Context::new(&object)
            .map_err(|e| AttachError::DebugImageMalformed(path.to_path_buf(), e.to_string()))?;
        Ok(Self { ctx })
    }

    fn shorten(path: &str) -> String {
        for root in KNOWN_SOURCE_ROOTS {
            if let Some(idx) = path.find(root) {
                return path[idx..].to_string();
            }
        }
        path.to_string()
    }
}

impl Symbolizer for DwarfSymbolizer {
    fn resolve(&self, addr: u64) -> ResolvedFrame {
        let location = self.ctx.find_location(addr).ok().flatten();
        let mut frames = match self.ctx.find_frames(addr) {
            Ok(iter) => iter,
            Err(e) => {
                warn!(addr, error = %e, "dwarf frame lookup failed");
                return ResolvedFrame::default();
            },
        };

        let mut function = None;
        let mut inlines = Vec::new();
        loop {
            let frame = match frames.next() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(addr, error = %e, "dwarf frame iteration failed");
                    break;
                },
            };
            let name = frame
                .function
                .as_ref()
                .and_then(|f| f.demangle().ok().map(|n| n.into_owned()));
            if function.is_none() {
                function = name;
            } else {
                inlines.push(InlineFrame {
                    function: name,
                    file: frame.location.as_ref().and_then(|l| l.file).map(Self::shorten),
                    line: frame.location.as_ref().and_then(|l| l.line),
                });
            }
        }

        ResolvedFrame {
            function,
            offset: 0,
            file: location.as_ref().and_then(|l| l.file).map(Self::shorten),
            line: location.as_ref().and_then(|l| l.line),
            inlines,
        }
    }
}
