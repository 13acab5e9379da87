use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::info;

use crate::error::Result;

/// Writes the base64 encoding of `source`'s raw bytes to `output`.
pub fn write_bundle<P: AsRef<Path>, Q: AsRef<Path>>(source: P, output: Q) -> Result<()> {
    let bytes = std::fs::read(source.as_ref())?;
    std::fs::write(output.as_ref(), STANDARD.encode(&bytes))?;
    info!(
        "[Bundle] encoded {} bytes into {}",
        bytes.len(),
        output.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let links = dir.path().join("proxy_urls.txt");
        let bundle = dir.path().join("base64.txt");
        std::fs::write(&links, "ss://abc@1.1.1.1:1#n\n").unwrap();

        write_bundle(&links, &bundle).unwrap();
        let encoded = std::fs::read_to_string(&bundle).unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"ss://abc@1.1.1.1:1#n\n");
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_bundle(dir.path().join("nope"), dir.path().join("out")).is_err());
    }
}
