// JSON and spreadsheet sinks for one document's records

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::info;
use rust_xlsxwriter::Workbook;

use crate::{
    config::OutputConfig,
    consts::IMAGE,
    error::{ExtractError, Result},
    extractor::PageRecordSet,
};

pub fn encode_passport_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}

pub fn decode_passport_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| ExtractError::Export(format!("invalid base64 image: {e}")))
}

/// `<document-stem>_<YYYYmmddTHHMMSS>_<8 hex chars>`
pub fn unique_stem(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("{stem}_{timestamp}_{suffix}")
}

pub struct Exporter<'a> {
    config: &'a OutputConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(config: &'a OutputConfig) -> Self {
        Self { config }
    }

    /// Write every enabled sink and return the created paths.
    pub fn export(&self, document: &Path, pages: &[PageRecordSet]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.config.dir)?;
        let stem = unique_stem(document);
        let mut written = Vec::new();

        if self.config.json {
            let path = self.config.dir.join(format!("{stem}.json"));
            write_json(&path, pages)?;
            written.push(path);
        }
        if self.config.spreadsheet {
            let path = self.config.dir.join(format!("{stem}.xlsx"));
            write_spreadsheet(&path, pages)?;
            written.push(path);
        }

        for path in &written {
            info!("Wrote {}", path.display());
        }
        Ok(written)
    }
}

pub fn write_json(path: &Path, pages: &[PageRecordSet]) -> Result<()> {
    let nested: Vec<_> = pages.iter().map(|page| &page.records).collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &nested)
        .map_err(|e| ExtractError::Export(format!("{}: {e}", path.display())))
}

/// One row per record: page index, box index, then every field seen in the
/// document in first-seen order. The photo is left out; base64 images
/// overflow the per-cell size limit.
pub fn write_spreadsheet(path: &Path, pages: &[PageRecordSet]) -> Result<()> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| {
        ExtractError::Export(format!("{}: {e}", path.display()))
    };

    let mut columns: Vec<String> = Vec::new();
    for record in pages.iter().flat_map(|p| &p.records) {
        for key in record.keys() {
            let key = key.unwrap_or("null");
            if key != IMAGE && !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    sheet.write_string(0, 0, "page").map_err(xlsx_err)?;
    sheet.write_string(0, 1, "box").map_err(xlsx_err)?;
    for (i, column) in columns.iter().enumerate() {
        sheet
            .write_string(0, (i + 2) as u16, column.as_str())
            .map_err(xlsx_err)?;
    }

    let mut row: u32 = 1;
    for page in pages {
        for (box_index, record) in page.records.iter().enumerate() {
            sheet
                .write_number(row, 0, page.page_index as f64)
                .map_err(xlsx_err)?;
            sheet
                .write_number(row, 1, box_index as f64)
                .map_err(xlsx_err)?;
            for (key, value) in record.iter() {
                let key = key.unwrap_or("null");
                let (Some(col), Some(value)) = (columns.iter().position(|c| c == key), value) else {
                    continue;
                };
                sheet
                    .write_string(row, (col + 2) as u16, value)
                    .map_err(xlsx_err)?;
            }
            row += 1;
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}
