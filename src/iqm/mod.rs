//! # IQM Import
//!
//! Reads Inter-Quake Model (version 2) files into [MeshData] and [Skeleton].
//!
//! ```no_run
//! use marrow::iqm::IqmImporter;
//! use marrow::LogDiagnostics;
//!
//! let (mesh, skeleton) = IqmImporter::new(&LogDiagnostics).import_file("assets/robot.iqm");
//! if mesh.is_empty() && skeleton.is_empty() {
//!     // nothing usable was imported, the reason has been logged
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::iqm::format::Header;
use crate::iqm::format::TextTable;
use crate::mesh::MeshData;
use crate::Diagnostics;
use crate::Severity;
use crate::Skeleton;

mod animation;
mod format;
mod vertex;

/// # Import Error
#[derive(Debug, Error)]
pub enum ImportError {
    /// The data is not a well formed IQM file.
    #[error("invalid IQM data: {0}")]
    InvalidFormat(String),
    /// The file uses another version of the format.
    #[error("unsupported IQM version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the file.
        found: u32,
        /// Supported version.
        expected: u32,
    },
    /// The file is larger than [ImportConfig::max_file_size].
    #[error("file size of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge {
        /// Size of the file.
        size: u64,
        /// Largest accepted size.
        limit: u64,
    },
    /// The file could not be read.
    #[error("failed to read file: {0}")]
    IoFailure(#[from] io::Error),
    /// A joint is listed before its parent.
    #[error("joint {joint} has parent {parent}, parents must precede their children")]
    UnsupportedHierarchy {
        /// Index of the joint.
        joint: usize,
        /// Parent index declared by the joint.
        parent: i32,
    },
}

/// # Import Config
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImportConfig {
    /// Largest file size accepted, in bytes.
    pub max_file_size: u64,
    /// Joint count above which a warning is logged.
    pub joint_warning_limit: usize,
}

impl ImportConfig {
    /// Default value of [ImportConfig::max_file_size], 16 MiB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 << 20;

    /// Default value of [ImportConfig::joint_warning_limit].
    pub const DEFAULT_JOINT_WARNING_LIMIT: usize = 64;
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            joint_warning_limit: Self::DEFAULT_JOINT_WARNING_LIMIT,
        }
    }
}

/// # IQM Model
///
/// Everything imported from one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IqmModel {
    /// Mesh of the file, empty if the file only holds animation data.
    pub mesh: MeshData,
    /// Skeleton and animations of the file, empty if the file has no joints.
    pub skeleton: Skeleton,
}

/// # IQM Importer
///
/// Warnings about recoverable problems are reported through the diagnostics the importer was
/// created with.
pub struct IqmImporter<'a> {
    diagnostics: &'a dyn Diagnostics,
    config: ImportConfig,
}

impl<'a> IqmImporter<'a> {
    /// Returns an importer with the default configuration.
    pub fn new(diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            diagnostics,
            config: ImportConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Imports a file held in memory.
    pub fn try_import_bytes(&self, bytes: &[u8]) -> Result<IqmModel, ImportError> {
        let header = Header::parse(bytes)?;
        if u64::from(header.file_size) > self.config.max_file_size {
            return Err(ImportError::TooLarge {
                size: u64::from(header.file_size),
                limit: self.config.max_file_size,
            });
        }

        let text = TextTable::read(bytes, &header)?;

        if header.num_vertexes == 0 {
            self.diagnostics.log(
                "no vertex data found, the file may only contain animation data",
                Severity::Warning,
            );
        }
        let mesh = vertex::build_mesh(bytes, &header, &text, self.diagnostics)?;
        let skeleton =
            animation::build_skeleton(bytes, &header, &text, &self.config, self.diagnostics)?;

        Ok(IqmModel { mesh, skeleton })
    }

    /// Reads and imports the file at the path.
    pub fn try_import_file(&self, path: impl AsRef<Path>) -> Result<IqmModel, ImportError> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size > self.config.max_file_size {
            return Err(ImportError::TooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        let bytes = fs::read(path)?;
        self.try_import_bytes(&bytes)
    }

    /// Imports a file held in memory. On failure the error is reported and an empty mesh and
    /// skeleton are returned.
    pub fn import_bytes(&self, bytes: &[u8]) -> (MeshData, Skeleton) {
        match self.try_import_bytes(bytes) {
            Ok(model) => (model.mesh, model.skeleton),
            Err(error) => {
                self.diagnostics.log(&error.to_string(), Severity::Error);
                Default::default()
            }
        }
    }

    /// Reads and imports the file at the path. On failure the error is reported and an empty mesh
    /// and skeleton are returned.
    pub fn import_file(&self, path: impl AsRef<Path>) -> (MeshData, Skeleton) {
        let path = path.as_ref();
        match self.try_import_file(path) {
            Ok(model) => (model.mesh, model.skeleton),
            Err(error) => {
                self.diagnostics
                    .log(&format!("{}: {error}", path.display()), Severity::Error);
                Default::default()
            }
        }
    }
}
