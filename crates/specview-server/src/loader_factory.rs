//! The narrow seam a deployment plugs a real astronomy I/O backend into.
//!
//! `specview_core::loader::FileLoader` is an external-collaborator
//! contract: concrete FITS/HDF5/CASA/MIRIAD readers live outside this
//! workspace. This binary only needs
//! something that can produce one from an `OPEN_FILE` request; it ships
//! with a factory that reports "no backend configured" so the server is
//! runnable and every other module is exercised end to end, and a real
//! deployment supplies its own [`LoaderFactory`] before accepting
//! connections.

use specview_core::loader::FileLoader;

pub trait LoaderFactory: Send + Sync {
    fn open(&self, directory: &str, filename: &str) -> anyhow::Result<Box<dyn FileLoader>>;
}

pub struct UnconfiguredLoaderFactory;

impl LoaderFactory for UnconfiguredLoaderFactory {
    fn open(&self, directory: &str, filename: &str) -> anyhow::Result<Box<dyn FileLoader>> {
        anyhow::bail!(
            "no file-format backend configured for {directory}/{filename} \
             (FITS/HDF5/CASA/MIRIAD readers are supplied by the deployment, see specview_core::loader::FileLoader)"
        )
    }
}
