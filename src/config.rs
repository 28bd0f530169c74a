// Typed configuration, loaded once at start-up from TOML or JSON

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use opencv::imgproc;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub input: InputConfig,
    pub geometry: GeometryConfig,
    pub normalize: NormalizeConfig,
    pub ocr: OcrConfig,
    pub text: TextConfig,
    pub output: OutputConfig,
    /// Number of documents processed concurrently
    pub workers: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            geometry: GeometryConfig::default(),
            normalize: NormalizeConfig::default(),
            ocr: OcrConfig::default(),
            text: TextConfig::default(),
            output: OutputConfig::default(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    pub dpi: u32,
    /// First page index (0-based) that carries voter boxes
    pub start_page: usize,
    /// Number of trailing pages without voter boxes
    pub pages_to_exclude: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/pdf"),
            dpi: 900,
            start_page: 2,
            pages_to_exclude: 1,
        }
    }
}

/// Open interval used by every area / aspect-ratio filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Strict on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.min < value && value < self.max
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min < self.max) {
            return Err(ExtractError::config(format!(
                "{name}: min ({}) must be strictly below max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlurConfig {
    pub ksize: [i32; 2],
    pub sigma: f64,
}

impl BlurConfig {
    fn validate(&self, name: &str) -> Result<()> {
        if self.ksize.iter().any(|k| *k <= 0 || k % 2 == 0) {
            return Err(ExtractError::config(format!(
                "{name}: blur kernel {:?} must be positive and odd",
                self.ksize
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CannyConfig {
    pub threshold1: f64,
    pub threshold2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourMode {
    External,
    List,
    Tree,
    Ccomp,
}

impl ContourMode {
    pub fn to_cv(self) -> i32 {
        match self {
            ContourMode::External => imgproc::RETR_EXTERNAL,
            ContourMode::List => imgproc::RETR_LIST,
            ContourMode::Tree => imgproc::RETR_TREE,
            ContourMode::Ccomp => imgproc::RETR_CCOMP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourMethod {
    None,
    Simple,
}

impl ContourMethod {
    pub fn to_cv(self) -> i32 {
        match self {
            ContourMethod::None => imgproc::CHAIN_APPROX_NONE,
            ContourMethod::Simple => imgproc::CHAIN_APPROX_SIMPLE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContourConfig {
    pub mode: ContourMode,
    pub method: ContourMethod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub voter_box: VoterBoxConfig,
    pub passport_box: PassportBoxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoterBoxConfig {
    pub blur: BlurConfig,
    pub canny: CannyConfig,
    pub contours: ContourConfig,
    /// Bounding-rectangle area in px²
    pub area: Bounds,
    /// width / height
    pub aspect_ratio: Bounds,
    /// Max x/y distance for two rectangles to count as the same box
    pub position_tolerance: i32,
    /// Max width/height difference for two rectangles to count as the same box
    pub size_tolerance: i32,
    /// Max y distance for two boxes to share a row in reading order
    pub row_tolerance: i32,
}

impl Default for VoterBoxConfig {
    fn default() -> Self {
        Self {
            blur: BlurConfig {
                ksize: [13, 13],
                sigma: 0.0,
            },
            canny: CannyConfig {
                threshold1: 50.0,
                threshold2: 150.0,
            },
            contours: ContourConfig {
                mode: ContourMode::External,
                method: ContourMethod::Simple,
            },
            area: Bounds::new(2_000_000.0, 3_000_000.0),
            aspect_ratio: Bounds::new(2.4, 2.6),
            position_tolerance: 500,
            size_tolerance: 200,
            row_tolerance: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportBoxConfig {
    pub blur: BlurConfig,
    pub canny: CannyConfig,
    pub contours: ContourConfig,
    /// Fraction of the enclosing voter box area
    pub area_ratio: Bounds,
    pub aspect_ratio: Bounds,
    /// Image codec extension used for the crop
    pub extension: String,
}

impl Default for PassportBoxConfig {
    fn default() -> Self {
        Self {
            blur: BlurConfig {
                ksize: [5, 5],
                sigma: 0.0,
            },
            canny: CannyConfig {
                threshold1: 50.0,
                threshold2: 150.0,
            },
            contours: ContourConfig {
                mode: ContourMode::List,
                method: ContourMethod::Simple,
            },
            area_ratio: Bounds::new(0.05, 0.15),
            aspect_ratio: Bounds::new(0.7, 1.5),
            extension: "png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DenoiseConfig {
    pub h: f32,
    pub template_window: i32,
    pub search_window: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Base threshold, replaced by Otsu's value when `otsu` is set
    pub thresh: f64,
    pub max_value: f64,
    pub otsu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphOperation {
    Open,
    Close,
    Gradient,
    TopHat,
    BlackHat,
}

impl MorphOperation {
    pub fn to_cv(self) -> i32 {
        match self {
            MorphOperation::Open => imgproc::MORPH_OPEN,
            MorphOperation::Close => imgproc::MORPH_CLOSE,
            MorphOperation::Gradient => imgproc::MORPH_GRADIENT,
            MorphOperation::TopHat => imgproc::MORPH_TOPHAT,
            MorphOperation::BlackHat => imgproc::MORPH_BLACKHAT,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MorphologyConfig {
    pub operation: MorphOperation,
    pub kernel: [i32; 2],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErodeConfig {
    pub kernel: [i32; 2],
    pub iterations: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub denoise: DenoiseConfig,
    pub sharpen_kernel: [[f32; 3]; 3],
    pub threshold: ThresholdConfig,
    pub morphology: MorphologyConfig,
    pub erode: ErodeConfig,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            denoise: DenoiseConfig {
                h: 10.0,
                template_window: 7,
                search_window: 21,
            },
            sharpen_kernel: [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]],
            threshold: ThresholdConfig {
                thresh: 150.0,
                max_value: 255.0,
                otsu: true,
            },
            morphology: MorphologyConfig {
                operation: MorphOperation::Close,
                kernel: [3, 3],
            },
            erode: ErodeConfig {
                kernel: [2, 2],
                iterations: 1,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    Tesseract,
    Neural,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// tessdata directory; `None` uses the library default / TESSDATA_PREFIX
    pub datapath: Option<String>,
    /// Command-line style options, e.g. `--psm 6 --oem 3 -c key=value`
    pub config: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            datapath: None,
            config: "--psm 6 --oem 3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerModel {
    pub model: PathBuf,
    pub dict: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub detection_model: PathBuf,
    /// Keyed by the `+`-joined language list, e.g. `hin+eng`
    pub recognizers: BTreeMap<String, RecognizerModel>,
    pub min_confidence: f32,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            detection_model: PathBuf::from("models/PP-OCRv5_mobile_det.onnx"),
            recognizers: BTreeMap::new(),
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    /// Number of vertical sections a voter box is split into
    pub sections: i32,
    /// Languages for the left (Hindi label) column
    pub left_languages: Vec<String>,
    /// Languages for the right (English label) column
    pub right_languages: Vec<String>,
    pub tesseract: TesseractConfig,
    pub neural: NeuralConfig,
    pub slow_call_warning_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            sections: 2,
            left_languages: vec!["hin".to_string(), "eng".to_string()],
            right_languages: vec!["eng".to_string()],
            tesseract: TesseractConfig::default(),
            neural: NeuralConfig::default(),
            slow_call_warning_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// JSON: canonical term -> list of observed misspellings
    pub corrections_path: Option<PathBuf>,
    /// JSON: Devanagari numeral -> ASCII digit; built-in table when absent
    pub digits_path: Option<PathBuf>,
    /// Literal label -> canonical key, applied before positional renaming
    pub field_aliases: BTreeMap<String, String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        use crate::consts::{AGE, GENDER, HOUSE_NUMBER, VOTER_ID};

        let field_aliases = [
            ("Age", AGE),
            ("age", AGE),
            ("Gender", GENDER),
            ("gender", GENDER),
            ("Sex", GENDER),
            ("House Number", HOUSE_NUMBER),
            ("House No", HOUSE_NUMBER),
            ("EPIC", VOTER_ID),
            ("EPIC No", VOTER_ID),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            corrections_path: None,
            digits_path: None,
            field_aliases,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageEncoding {
    Base64,
    Omit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub json: bool,
    pub spreadsheet: bool,
    pub image_encoding: ImageEncoding,
    /// When set, annotated page images are written here
    pub debug_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            json: true,
            spreadsheet: true,
            image_encoding: ImageEncoding::Base64,
            debug_dir: None,
        }
    }
}

impl ExtractConfig {
    /// Reject values the pipeline cannot work with.
    ///
    /// Ranges with `min >= max` are reported, never repaired.
    pub fn validate(&self) -> Result<()> {
        if self.input.dpi == 0 {
            return Err(ExtractError::config("input.dpi must be positive"));
        }
        if self.workers == 0 {
            return Err(ExtractError::config("workers must be at least 1"));
        }
        if self.ocr.sections < 1 {
            return Err(ExtractError::config("ocr.sections must be at least 1"));
        }

        let voter = &self.geometry.voter_box;
        voter.blur.validate("geometry.voter_box.blur")?;
        voter.area.validate("geometry.voter_box.area")?;
        voter.aspect_ratio.validate("geometry.voter_box.aspect_ratio")?;
        if voter.position_tolerance < 0 || voter.size_tolerance < 0 || voter.row_tolerance < 0 {
            return Err(ExtractError::config(
                "geometry.voter_box tolerances must not be negative",
            ));
        }

        let passport = &self.geometry.passport_box;
        passport.blur.validate("geometry.passport_box.blur")?;
        passport.area_ratio.validate("geometry.passport_box.area_ratio")?;
        passport
            .aspect_ratio
            .validate("geometry.passport_box.aspect_ratio")?;

        let normalize = &self.normalize;
        if normalize.denoise.template_window % 2 == 0 || normalize.denoise.search_window % 2 == 0 {
            return Err(ExtractError::config(
                "normalize.denoise windows must be odd",
            ));
        }
        if normalize
            .morphology
            .kernel
            .iter()
            .chain(normalize.erode.kernel.iter())
            .any(|k| *k <= 0)
        {
            return Err(ExtractError::config(
                "normalize morphology/erode kernels must be positive",
            ));
        }
        if normalize.erode.iterations < 0 {
            return Err(ExtractError::config(
                "normalize.erode.iterations must not be negative",
            ));
        }

        if self.ocr.left_languages.is_empty() || self.ocr.right_languages.is_empty() {
            return Err(ExtractError::config(
                "ocr.left_languages and ocr.right_languages must not be empty",
            ));
        }

        Ok(())
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file, picking the format from the extension.
    pub fn load_from_file(path: &Path) -> Result<ExtractConfig> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            ExtractError::config(format!(
                "unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::load_from_str(&content, format)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ExtractConfig> {
        let config: ExtractConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| ExtractError::config(format!("TOML: {e}")))?,
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ExtractError::config(format!("JSON: {e}")))?,
        };
        config.validate()?;
        Ok(config)
    }
}
