use crate::output::traits::{Converter, OutputFormat};
use url::Url;

/// Converter that returns the document unchanged
///
/// Stands in where no real renderer is plugged in. Only HTML output is
/// supported; the body is decoded as UTF-8 (lossily).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawHtmlConverter;

impl Converter for RawHtmlConverter {
    fn supports(&self, format: OutputFormat) -> bool {
        format == OutputFormat::Html
    }

    fn render(&self, html: &[u8], _source: &Url, _format: OutputFormat) -> String {
        String::from_utf8_lossy(html).into_owned()
    }
}
