//! File-system module loader.
//!
//! # Responsibility
//! - Read the compiled module binary from disk without blocking the executor.
//! - Reject files that are not WebAssembly modules.
//!
//! # Invariants
//! - With no override, the binary is `<default_dir>/mize_bg.wasm`.
//! - A loaded image always carries a validated header.

use crate::config::MODULE_BINARY_NAME;
use crate::error::{ConstructionError, ModuleLoadError};
use crate::instance::{InstanceCore, MemoryInstance};
use crate::module::{CompiledModule, ModuleLoader};
use async_trait::async_trait;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const WASM_MAGIC: &[u8; 4] = b"\0asm";
const WASM_VERSION: [u8; 4] = [1, 0, 0, 0];
const WASM_HEADER_LEN: usize = 8;

/// Loader reading `mize_bg.wasm` from a directory.
#[derive(Debug, Clone)]
pub struct FileModuleLoader {
    default_dir: PathBuf,
}

impl FileModuleLoader {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }

    pub fn default_binary_path(&self) -> PathBuf {
        self.default_dir.join(MODULE_BINARY_NAME)
    }
}

#[async_trait]
impl ModuleLoader for FileModuleLoader {
    async fn load(
        &self,
        binary: Option<&Path>,
    ) -> Result<Arc<dyn CompiledModule>, ModuleLoadError> {
        let path = binary
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_binary_path());
        let started_at = Instant::now();
        debug!(
            "event=module_read module=loader status=start path={} override={}",
            path.display(),
            binary.is_some()
        );

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                error!(
                    "event=module_read module=loader status=error path={} duration_ms={} error={}",
                    path.display(),
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(ModuleLoadError::Io { path, source });
            }
        };

        let image = ModuleImage::from_bytes(path, &bytes)?;
        info!(
            "event=module_read module=loader status=ok path={} size_bytes={} duration_ms={}",
            image.path.display(),
            image.size_bytes,
            started_at.elapsed().as_millis()
        );
        Ok(Arc::new(image))
    }
}

/// Validated compiled module held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub path: PathBuf,
    pub size_bytes: usize,
}

impl ModuleImage {
    /// Validates the WebAssembly header of `bytes`.
    pub fn from_bytes(path: PathBuf, bytes: &[u8]) -> Result<Self, ModuleLoadError> {
        if bytes.len() < WASM_HEADER_LEN {
            return Err(ModuleLoadError::InvalidBinary {
                path,
                reason: format!("file is {} bytes, shorter than a module header", bytes.len()),
            });
        }
        if &bytes[..4] != WASM_MAGIC {
            return Err(ModuleLoadError::InvalidBinary {
                path,
                reason: "missing WebAssembly magic number".to_string(),
            });
        }
        if bytes[4..WASM_HEADER_LEN] != WASM_VERSION {
            return Err(ModuleLoadError::InvalidBinary {
                path,
                reason: format!(
                    "unsupported WebAssembly version {:?}",
                    &bytes[4..WASM_HEADER_LEN]
                ),
            });
        }
        Ok(Self {
            path,
            size_bytes: bytes.len(),
        })
    }
}

#[async_trait]
impl CompiledModule for ModuleImage {
    async fn construct(&self, config: &str) -> Result<Box<dyn InstanceCore>, ConstructionError> {
        let instance = MemoryInstance::from_config(config)?;
        Ok(Box::new(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::{FileModuleLoader, ModuleImage};
    use crate::error::ModuleLoadError;
    use crate::module::ModuleLoader;
    use serde_json::json;
    use std::path::PathBuf;

    const MINIMAL_MODULE: &[u8] = b"\0asm\x01\0\0\0";

    #[test]
    fn accepts_minimal_module_header() {
        let image = ModuleImage::from_bytes(PathBuf::from("m.wasm"), MINIMAL_MODULE)
            .expect("minimal module");
        assert_eq!(image.size_bytes, 8);
    }

    #[test]
    fn rejects_short_or_foreign_binaries() {
        for bytes in [&b"\0as"[..], &b"\x7fELF\x02\x01\x01\0"[..], &b"\0asm\x02\0\0\0"[..]] {
            let err = ModuleImage::from_bytes(PathBuf::from("m.wasm"), bytes)
                .expect_err("must reject");
            assert!(matches!(err, ModuleLoadError::InvalidBinary { .. }));
        }
    }

    #[tokio::test]
    async fn loads_from_default_dir_and_constructs_instance() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loader = FileModuleLoader::new(dir.path());
        std::fs::write(loader.default_binary_path(), MINIMAL_MODULE).expect("write module");

        let module = loader.load(None).await.expect("load should succeed");
        let instance = module
            .construct(r#"{"name": "a"}"#)
            .await
            .expect("construct should succeed");
        assert_eq!(instance.get("self/config/name"), Some(json!("a")));
    }

    #[tokio::test]
    async fn missing_binary_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loader = FileModuleLoader::new(dir.path());
        let err = match loader.load(None).await {
            Ok(_) => panic!("missing binary must fail"),
            Err(err) => err,
        };
        assert!(matches!(err, ModuleLoadError::Io { .. }));
    }
}
