use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};

const PARAMETERS_KEYWORD: &str = "parameters";

/// Generation parameters the WebUI embeds as a PNG text chunk, if any.
/// Formats other than PNG never carry them.
pub fn read_parameters(path: &Path) -> Result<Option<String>> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        return Ok(None);
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = png::Decoder::new(BufReader::new(file))
        .read_info()
        .with_context(|| format!("read png header of {}", path.display()))?;
    let info = reader.info();

    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        return Ok(Some(chunk.text.clone()));
    }
    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        return chunk.get_text().map(Some).context("inflate ztxt chunk");
    }
    if let Some(chunk) = info
        .utf8_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
    {
        return chunk.get_text().map(Some).context("decode itxt chunk");
    }
    Ok(None)
}

/// Spreads the single-line parameter dump over several lines for display.
pub fn format_parameters(raw: &str) -> String {
    raw.replace('\n', "\n\n")
        .replace(", ", ",\n")
        .replace("Negative prompt: ", "Negative prompt:\n")
}
