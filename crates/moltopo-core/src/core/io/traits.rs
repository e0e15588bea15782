use super::backup;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Defines the interface for reading and writing one structural file format.
///
/// Implementors are zero-sized markers (e.g. [`GroFile`](super::gro::GroFile))
/// that parse a buffered stream into their `Data` and serialize it back.
/// Format knobs such as the length-scaling factor travel in `Options`.
pub trait MolecularFile {
    /// The in-memory representation produced by the reader.
    type Data;

    /// Format-specific settings shared by reading and writing.
    type Options: Default;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads the format from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `options` - Format settings (scale factors and the like).
    ///
    /// # Return
    ///
    /// Returns the parsed data.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(
        reader: &mut impl BufRead,
        options: &Self::Options,
    ) -> Result<Self::Data, Self::Error>;

    /// Writes data to a writer.
    ///
    /// # Arguments
    ///
    /// * `data` - The data to write.
    /// * `options` - Format settings.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or I/O operations encounter issues.
    fn write_to(
        data: &Self::Data,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads the format from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
        options: &Self::Options,
    ) -> Result<Self::Data, Self::Error> {
        let path = path.as_ref();
        info!("Reading {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }

    /// Writes data to a file path, first moving any existing file at that
    /// path to a numbered backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup or the file creation fails, or if
    /// writing fails.
    fn write_to_path<P: AsRef<Path>>(
        data: &Self::Data,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let path = path.as_ref();
        backup::prepare_path(path)?;
        info!("Writing {}", path.display());
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(data, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
