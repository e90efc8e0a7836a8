//! The queue of files selected for processing.
//!
//! Only spreadsheet files are retained; everything else is silently dropped
//! at intake, exactly like the dashboard's file filter.

/// Extensions accepted at intake. Matching is a case-sensitive suffix check.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".xls", ".xlsx"];

/// Informational per-file limit shown to users. Not enforced here; the
/// transport-level body cap is the hard stop.
pub const MAX_FILE_SIZE_MB: u64 = 200;

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn is_accepted(name: &str) -> bool {
    ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

#[derive(Debug, Default)]
pub struct UploadBatch {
    files: Vec<SelectedFile>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append accepted files, preserving order; returns how many made it in.
    pub fn add_files(&mut self, candidates: Vec<SelectedFile>) -> usize {
        let before = self.files.len();
        self.files
            .extend(candidates.into_iter().filter(|f| is_accepted(&f.name)));
        self.files.len() - before
    }

    /// Remove the first file with the given name; returns whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.files.iter().position(|f| f.name == name) {
            Some(index) => {
                self.files.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Human-readable size for file listings ("1.18 MB").
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            bytes: vec![0u8; 4],
        }
    }

    #[test]
    fn intake_keeps_only_spreadsheet_extensions() {
        let mut batch = UploadBatch::new();
        let accepted = batch.add_files(vec![file("report.csv"), file("report.xlsx")]);

        assert_eq!(accepted, 1);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.files()[0].name, "report.xlsx");
    }

    #[test]
    fn intake_accepts_both_xls_and_xlsx() {
        let mut batch = UploadBatch::new();
        batch.add_files(vec![file("a.xls"), file("b.xlsx"), file("c.pdf"), file("d.txt")]);
        let names: Vec<&str> = batch.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.xls", "b.xlsx"]);
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        assert!(!is_accepted("REPORT.XLSX"));
        assert!(is_accepted("report.xlsx"));
    }

    #[test]
    fn remove_drops_one_file_by_name() {
        let mut batch = UploadBatch::new();
        batch.add_files(vec![file("a.xls"), file("b.xlsx")]);

        assert!(batch.remove("a.xls"));
        assert!(!batch.remove("a.xls"));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut batch = UploadBatch::new();
        batch.add_files(vec![file("a.xls")]);
        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn sizes_format_with_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
