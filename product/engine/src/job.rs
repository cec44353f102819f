use crate::config::DownloadSettings;
use crate::{EngineError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Trailing collaborator annotations: `, x`, `，x`, `& x`, `feat. x`, `ft. x`.
const COLLABORATOR_PATTERNS: [&str; 3] = [r"\s*[,，&].*$", r"\s*feat\..*$", r"\s*ft\..*$"];

static COLLABORATOR_RES: OnceLock<Vec<Regex>> = OnceLock::new();

fn collaborator_res() -> &'static [Regex] {
    COLLABORATOR_RES.get_or_init(|| {
        COLLABORATOR_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("collaborator regex"))
            .collect()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Artist,
    AlbumArtist,
    Channel,
    Uploader,
}

impl MetadataField {
    pub const ARTIST_LIKE: [MetadataField; 4] = [
        MetadataField::Artist,
        MetadataField::AlbumArtist,
        MetadataField::Channel,
        MetadataField::Uploader,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Artist => "artist",
            MetadataField::AlbumArtist => "album_artist",
            MetadataField::Channel => "channel",
            MetadataField::Uploader => "uploader",
        }
    }
}

/// A find/replace applied to one metadata field before download.
#[derive(Debug, Clone)]
pub struct MetadataRule {
    pub field: MetadataField,
    pub pattern: Regex,
    pub replacement: String,
}

impl MetadataRule {
    pub fn new(field: MetadataField, pattern: &str, replacement: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| EngineError::InvalidMetadataRule {
            field: field.as_str().to_string(),
            source,
        })?;
        Ok(Self {
            field,
            pattern,
            replacement: replacement.to_string(),
        })
    }

    pub fn apply(&self, value: &str) -> String {
        self.pattern
            .replace_all(value, self.replacement.as_str())
            .into_owned()
    }
}

fn collaborator_cleanup_rules() -> Vec<MetadataRule> {
    let mut rules = Vec::new();
    for field in MetadataField::ARTIST_LIKE {
        for pattern in collaborator_res() {
            rules.push(MetadataRule {
                field,
                pattern: pattern.clone(),
                replacement: String::new(),
            });
        }
    }
    rules
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    /// First non-empty of `fields`, else `default`.
    Field {
        fields: Vec<String>,
        default: Option<String>,
    },
}

impl TemplatePart {
    fn field(fields: &[&str], default: Option<&str>) -> Self {
        TemplatePart::Field {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            default: default.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    pub parts: Vec<TemplatePart>,
}

impl OutputTemplate {
    /// `<folder>/<artist>/<album|Various>/<track|01> <title>.<ext>`
    pub fn artist_album_tree(folder: &Path) -> Self {
        let folder = folder.to_string_lossy();
        let root = folder.trim_end_matches(['/', '\\']);
        Self {
            parts: vec![
                TemplatePart::Literal(format!("{root}/")),
                TemplatePart::field(&["artist", "album_artist", "channel", "uploader"], None),
                TemplatePart::Literal("/".to_string()),
                TemplatePart::field(&["album", "playlist"], Some("Various")),
                TemplatePart::Literal("/".to_string()),
                TemplatePart::field(&["track_number", "playlist_index"], Some("01")),
                TemplatePart::Literal(" ".to_string()),
                TemplatePart::field(&["track", "title"], None),
                TemplatePart::Literal(".".to_string()),
                TemplatePart::field(&["ext"], None),
            ],
        }
    }

    /// Renders yt-dlp's `%(a,b|default)s` syntax.
    pub fn to_yt_dlp(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(&text.replace('%', "%%")),
                TemplatePart::Field { fields, default } => {
                    out.push_str("%(");
                    out.push_str(&fields.join(","));
                    if let Some(default) = default {
                        out.push('|');
                        out.push_str(default);
                    }
                    out.push_str(")s");
                }
            }
        }
        out
    }

    /// Resolves the template against already-extracted metadata. Missing or
    /// empty fields fall through to the next alternative; a field with no
    /// value and no default renders as `NA`, like the external tool.
    pub fn resolve(&self, metadata: &BTreeMap<String, String>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Field { fields, default } => {
                    let value = fields
                        .iter()
                        .filter_map(|f| metadata.get(f))
                        .map(|v| v.trim())
                        .find(|v| !v.is_empty())
                        .map(sanitize_path_component)
                        .or_else(|| default.clone())
                        .unwrap_or_else(|| "NA".to_string());
                    out.push_str(&value);
                }
            }
        }
        out
    }
}

fn sanitize_path_component(value: &str) -> String {
    value.replace('/', "\u{29F8}")
}

/// When the external tool runs a step. Declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    PreProcess,
    BeforeDownload,
    PostProcess,
}

#[derive(Debug, Clone)]
pub enum PostProcessor {
    MetadataCleanup { rules: Vec<MetadataRule> },
    ConvertThumbnails { format: String },
    ExtractAudio { codec: String, quality: String },
    EmbedMetadata { chapters: bool },
    EmbedThumbnail,
}

impl PostProcessor {
    pub fn key(&self) -> &'static str {
        match self {
            PostProcessor::MetadataCleanup { .. } => "MetadataParser",
            PostProcessor::ConvertThumbnails { .. } => "FFmpegThumbnailsConvertor",
            PostProcessor::ExtractAudio { .. } => "FFmpegExtractAudio",
            PostProcessor::EmbedMetadata { .. } => "FFmpegMetadata",
            PostProcessor::EmbedThumbnail => "EmbedThumbnail",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PostProcessor::MetadataCleanup { .. } => Stage::PreProcess,
            PostProcessor::ConvertThumbnails { .. } => Stage::BeforeDownload,
            _ => Stage::PostProcess,
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            PostProcessor::MetadataCleanup { rules } => {
                for rule in rules {
                    args.push("--replace-in-metadata".to_string());
                    args.push(rule.field.as_str().to_string());
                    args.push(rule.pattern.as_str().to_string());
                    args.push(rule.replacement.clone());
                }
            }
            PostProcessor::ConvertThumbnails { format } => {
                args.push("--convert-thumbnails".to_string());
                args.push(format.clone());
            }
            PostProcessor::ExtractAudio { codec, quality } => {
                args.push("--extract-audio".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push(quality.clone());
            }
            PostProcessor::EmbedMetadata { chapters } => {
                args.push("--embed-metadata".to_string());
                if *chapters {
                    args.push("--embed-chapters".to_string());
                }
            }
            PostProcessor::EmbedThumbnail => args.push("--embed-thumbnail".to_string()),
        }
    }
}

/// Everything the external tool needs for one batch. Built fresh per batch.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub output_dir: PathBuf,
    pub template: OutputTemplate,
    pub format: String,
    pub overwrite: bool,
    pub cookies_from_browser: Option<String>,
    pub post_processors: Vec<PostProcessor>,
}

impl JobConfig {
    pub fn metadata_rules(&self) -> impl Iterator<Item = &MetadataRule> {
        self.post_processors.iter().flat_map(|pp| match pp {
            PostProcessor::MetadataCleanup { rules } => rules.as_slice(),
            _ => &[][..],
        })
    }

    /// Applies the cleanup rules in order to whichever fields are present.
    pub fn clean_metadata(&self, metadata: &mut BTreeMap<String, String>) {
        for rule in self.metadata_rules() {
            if let Some(value) = metadata.get_mut(rule.field.as_str()) {
                *value = rule.apply(value);
            }
        }
    }

    /// Where a track with this (raw) metadata would land.
    pub fn render_output_path(&self, metadata: &BTreeMap<String, String>) -> PathBuf {
        let mut cleaned = metadata.clone();
        self.clean_metadata(&mut cleaned);
        PathBuf::from(self.template.resolve(&cleaned))
    }

    pub fn to_yt_dlp_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.format.clone(),
            "--output".to_string(),
            self.template.to_yt_dlp(),
            "--output".to_string(),
            "pl_thumbnail:".to_string(),
            "--no-colors".to_string(),
        ];
        args.push(if self.overwrite {
            "--force-overwrites".to_string()
        } else {
            "--no-overwrites".to_string()
        });
        if let Some(browser) = &self.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        // No --write-thumbnail: embedding fetches the image and removes it afterwards.
        let mut ordered: Vec<&PostProcessor> = self.post_processors.iter().collect();
        ordered.sort_by_key(|pp| pp.stage());
        for pp in ordered {
            pp.push_args(&mut args);
        }
        args
    }
}

pub fn build_job_config(folder: impl AsRef<Path>) -> JobConfig {
    build_job_config_with(folder, &DownloadSettings::default())
}

pub fn build_job_config_with(folder: impl AsRef<Path>, settings: &DownloadSettings) -> JobConfig {
    let folder = folder.as_ref();
    JobConfig {
        output_dir: folder.to_path_buf(),
        template: OutputTemplate::artist_album_tree(folder),
        format: settings.audio_format.clone(),
        overwrite: settings.overwrite,
        cookies_from_browser: settings.cookies_from_browser.clone(),
        post_processors: vec![
            PostProcessor::MetadataCleanup {
                rules: collaborator_cleanup_rules(),
            },
            PostProcessor::ConvertThumbnails {
                format: settings.thumbnail_format.clone(),
            },
            PostProcessor::ExtractAudio {
                codec: settings.audio_codec.clone(),
                quality: settings.audio_quality.clone(),
            },
            PostProcessor::EmbedMetadata { chapters: true },
            PostProcessor::EmbedThumbnail,
        ],
    }
}
