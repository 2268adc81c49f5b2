//! Attachments and inline-embedded files.

use std::{
    fmt, fs,
    io::{self, Write},
    path::Path,
};

use super::header::Headers;

pub(crate) type CopyFn = Box<dyn Fn(&mut dyn Write) -> io::Result<()> + Send + Sync>;

/// A file carried by a message, as an attachment or embedded inline.
///
/// The file name picks the displayed filename (its base name) and the MIME
/// type (from its extension); `Content-Type`, `Content-Disposition`,
/// `Content-ID` and `Content-Transfer-Encoding` can all be overridden with
/// [`File::header`]. Content comes from a copier callback, by default one
/// that reads the named file from disk. The copier may run once per
/// serialization, so it must be callable repeatedly.
///
/// ```
/// use missive::File;
///
/// let logo = File::new("assets/logo.png")
///     .rename("logo.png")
///     .header("Content-ID", ["<logo>"]);
/// ```
pub struct File {
    name: String,
    header: Headers,
    copier: CopyFn,
}

impl File {
    /// Creates a file that streams the contents of `path` when the message
    /// is serialized.
    pub fn new(path: impl Into<String>) -> Self {
        let name = path.into();
        let path = name.clone();
        File {
            name,
            header: Headers::new(),
            copier: Box::new(move |w| {
                let mut f = fs::File::open(&path)?;
                io::copy(&mut f, w)?;
                Ok(())
            }),
        }
    }

    /// Changes the name used for the displayed filename and MIME type
    /// detection. The copier is untouched.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides one header of the rendered part.
    pub fn header<N, I, V>(mut self, name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.header
            .set(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the content source.
    pub fn copy_fn<F>(mut self, copier: F) -> Self
    where
        F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync + 'static,
    {
        self.copier = Box::new(copier);
        self
    }

    /// The file name as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base name of the file, used as the displayed filename.
    pub(crate) fn filename(&self) -> &str {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    pub(crate) fn headers(&self) -> &Headers {
        &self.header
    }

    pub(crate) fn copier(&self) -> &CopyFn {
        &self.copier
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::File;

    #[test]
    fn filename_is_the_base_name() {
        assert_eq!(File::new("/tmp/test.pdf").filename(), "test.pdf");
        assert_eq!(File::new("test.pdf").filename(), "test.pdf");
    }

    #[test]
    fn rename_changes_the_filename() {
        let file = File::new("/tmp/report-final-v2.pdf").rename("report.pdf");
        assert_eq!(file.filename(), "report.pdf");
    }

    #[test]
    fn header_overrides_are_stored() {
        let file = File::new("image.jpg").header("Content-ID", ["<test-content-id>"]);
        assert_eq!(
            file.headers().get("Content-ID"),
            ["<test-content-id>".to_owned()]
        );
    }
}
