//! Slabio global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use slabio_storage::GzipCompressionLevel;

use crate::array_io::Verbosity;

/// Global configuration options for the slabio crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// An [`ArrayIO`](crate::array_io::ArrayIO) session takes a snapshot of the global configuration when it is created,
/// so later changes only affect new sessions.
///
/// # Dataset Creation Options
///
/// ## Compression Enabled
///  > default: [`true`]
///
/// If enabled, new datasets are created with gzip compression.
/// If the storage backend has no gzip codec, datasets are created uncompressed and a warning is logged.
///
/// ## Gzip Compression Level
///  > default: `9`
///
/// The gzip compression level of new compressed datasets, from 0 (fastest) to 9 (smallest).
///
/// # Session Options
///
/// ## Default Verbosity
///  > default: [`Verbosity::Off`]
///
/// The initial [`Verbosity`] of new sessions.
#[derive(Debug, Clone)]
pub struct Config {
    compression_enabled: bool,
    gzip_compression_level: GzipCompressionLevel,
    verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compression_enabled: true,
            gzip_compression_level: GzipCompressionLevel::default(),
            verbosity: Verbosity::Off,
        }
    }
}

impl Config {
    /// Get the [compression enabled](#compression-enabled) configuration.
    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    /// Set the [compression enabled](#compression-enabled) configuration.
    pub fn set_compression_enabled(&mut self, compression_enabled: bool) -> &mut Self {
        self.compression_enabled = compression_enabled;
        self
    }

    /// Get the [gzip compression level](#gzip-compression-level) configuration.
    #[must_use]
    pub fn gzip_compression_level(&self) -> GzipCompressionLevel {
        self.gzip_compression_level
    }

    /// Set the [gzip compression level](#gzip-compression-level) configuration.
    pub fn set_gzip_compression_level(
        &mut self,
        gzip_compression_level: GzipCompressionLevel,
    ) -> &mut Self {
        self.gzip_compression_level = gzip_compression_level;
        self
    }

    /// Get the [default verbosity](#default-verbosity) configuration.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Set the [default verbosity](#default-verbosity) configuration.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) -> &mut Self {
        self.verbosity = verbosity;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global slabio configuration.
///
/// This might deadlock if the global config is already mutably held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global slabio configuration.
///
/// This might deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn config_compression_enabled() {
        assert!(global_config().compression_enabled());
        global_config_mut().set_compression_enabled(false);
        assert!(!global_config().compression_enabled());
        global_config_mut().set_compression_enabled(true);
    }

    #[test]
    #[serial]
    fn config_gzip_compression_level() {
        assert_eq!(global_config().gzip_compression_level().as_u32(), 9);
        global_config_mut()
            .set_gzip_compression_level(GzipCompressionLevel::try_from(1u32).unwrap());
        assert_eq!(global_config().gzip_compression_level().as_u32(), 1);
        global_config_mut().set_gzip_compression_level(GzipCompressionLevel::default());
    }

    #[test]
    #[serial]
    fn config_verbosity() {
        assert_eq!(global_config().verbosity(), Verbosity::Off);
        global_config_mut().set_verbosity(Verbosity::Diagnostic);
        assert_eq!(global_config().verbosity(), Verbosity::Diagnostic);
        global_config_mut().set_verbosity(Verbosity::Off);
    }
}
