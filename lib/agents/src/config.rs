//! Agent types and their configurations.
//!
//! An [`AgentConfig`] is a common header (name, description, optional model
//! profile) plus [`AgentSettings`], a closed union with one variant per
//! agent type. Result nodes use the same container with display settings and
//! no model profile.

use crate::error::ConfigurationError;
use crate::model::{ModelConfig, ModelType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of agent types a node can wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    WebScraper,
    WebSearcher,
    CodeInterpreter,
    DataAnalyst,
    ImageGenerator,
    TextGenerator,
    Translator,
    YoutubeSummarizer,
    /// Display sink; never dispatched.
    Result,
}

impl AgentType {
    /// All agent types, in palette order.
    pub const ALL: [Self; 9] = [
        Self::WebScraper,
        Self::WebSearcher,
        Self::CodeInterpreter,
        Self::DataAnalyst,
        Self::ImageGenerator,
        Self::TextGenerator,
        Self::Translator,
        Self::YoutubeSummarizer,
        Self::Result,
    ];

    /// Returns the snake_case wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WebScraper => "web_scraper",
            Self::WebSearcher => "web_searcher",
            Self::CodeInterpreter => "code_interpreter",
            Self::DataAnalyst => "data_analyst",
            Self::ImageGenerator => "image_generator",
            Self::TextGenerator => "text_generator",
            Self::Translator => "translator",
            Self::YoutubeSummarizer => "youtube_summarizer",
            Self::Result => "result",
        }
    }

    /// Returns true for types that perform a backend call when run.
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        !matches!(self, Self::Result)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = ConfigurationError;

    /// Accepts snake_case tags, the camelCase spellings used by the canvas,
    /// and the short backend aliases `search` and `video-summary`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "search" => return Ok(Self::WebSearcher),
            "videosummary" => return Ok(Self::YoutubeSummarizer),
            _ => {}
        }

        Self::ALL
            .into_iter()
            .find(|t| t.as_str().replace('_', "") == normalized)
            .ok_or_else(|| ConfigurationError::UnknownAgentType { tag: s.to_string() })
    }
}

/// Search engines a web searcher may query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    Bing,
    DuckDuckGo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperCapabilities {
    pub javascript: bool,
    pub cookies: bool,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRules {
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub blocked_domains: Vec<String>,
    pub max_depth: u32,
    pub max_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebScraperSettings {
    pub capabilities: ScraperCapabilities,
    pub rules: CrawlRules,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Result language; the backend call falls back to `"en"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub safe_search: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearcherSettings {
    /// The search query sent to the backend.
    #[serde(default)]
    pub query: String,
    /// Number of results requested from the backend.
    pub max_results: u32,
    pub search_engines: Vec<SearchEngine>,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtimes {
    pub python: bool,
    pub javascript: bool,
    pub r: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterPermissions {
    pub file_system: bool,
    pub network: bool,
    pub subprocess: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeInterpreterSettings {
    pub runtime: Runtimes,
    pub permissions: InterpreterPermissions,
    #[serde(default)]
    pub libraries: Vec<String>,
    pub memory_limit_mb: u32,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
    Excel,
    Sql,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub enabled: bool,
    #[serde(default)]
    pub libraries: Vec<String>,
}

/// Database an analyst may read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseTarget {
    /// Engine name, e.g. `postgresql`.
    pub kind: String,
    pub connection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnalystSettings {
    pub supported_formats: Vec<DataFormat>,
    pub visualization: Visualization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseTarget>,
    pub caching: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageProvider {
    Dalle,
    StableDiffusion,
    Midjourney,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeneratorSettings {
    pub provider: ImageProvider,
    pub resolution: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub sampling_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Markdown,
    Html,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    General,
    Technical,
    Academic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub tone: Tone,
    pub audience: Audience,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGeneratorSettings {
    pub max_length: u32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    pub format: TextFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorSettings {
    /// Source language code, or `auto`.
    pub source_lang: String,
    pub target_lang: String,
    pub preserve_formatting: bool,
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,
    /// Domain hint such as `legal` or `medical`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    Text,
    Bullet,
    Chapters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeSummarizerSettings {
    #[serde(default)]
    pub youtube_url: String,
    /// Question asked about the video.
    #[serde(default)]
    pub custom_prompt: String,
    pub output_format: SummaryFormat,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    pub include_thumbnail: bool,
    pub include_timestamps: bool,
}

/// How a result node renders the output it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Text,
    #[default]
    Json,
    Markdown,
    Html,
}

/// Display settings for result nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSettings {
    pub display_format: DisplayFormat,
    pub auto_refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_ms: Option<u64>,
    pub max_history_length: u32,
}

impl ResultSettings {
    /// Renders a propagated output according to the display format.
    #[must_use]
    pub fn render(&self, output: &JsonValue) -> String {
        let pretty = || serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string());
        match self.display_format {
            DisplayFormat::Text => match output {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            },
            DisplayFormat::Json => pretty(),
            DisplayFormat::Markdown => match output {
                JsonValue::String(s) => s.clone(),
                _ => format!("```json\n{}\n```", pretty()),
            },
            DisplayFormat::Html => {
                let body = match output {
                    JsonValue::String(s) => s.clone(),
                    _ => pretty(),
                };
                format!("<pre>{}</pre>", escape_html(&body))
            }
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Per-agent settings, tagged by agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agentType", rename_all = "snake_case")]
pub enum AgentSettings {
    WebScraper(WebScraperSettings),
    WebSearcher(WebSearcherSettings),
    CodeInterpreter(CodeInterpreterSettings),
    DataAnalyst(DataAnalystSettings),
    ImageGenerator(ImageGeneratorSettings),
    TextGenerator(TextGeneratorSettings),
    Translator(TranslatorSettings),
    YoutubeSummarizer(YoutubeSummarizerSettings),
    Result(ResultSettings),
}

impl AgentSettings {
    /// Returns the agent type these settings belong to.
    #[must_use]
    pub fn agent_type(&self) -> AgentType {
        match self {
            Self::WebScraper(_) => AgentType::WebScraper,
            Self::WebSearcher(_) => AgentType::WebSearcher,
            Self::CodeInterpreter(_) => AgentType::CodeInterpreter,
            Self::DataAnalyst(_) => AgentType::DataAnalyst,
            Self::ImageGenerator(_) => AgentType::ImageGenerator,
            Self::TextGenerator(_) => AgentType::TextGenerator,
            Self::Translator(_) => AgentType::Translator,
            Self::YoutubeSummarizer(_) => AgentType::YoutubeSummarizer,
            Self::Result(_) => AgentType::Result,
        }
    }

    /// Returns the default settings for an agent type.
    #[must_use]
    pub fn defaults(agent_type: AgentType) -> Self {
        match agent_type {
            AgentType::WebScraper => Self::WebScraper(WebScraperSettings {
                capabilities: ScraperCapabilities {
                    javascript: true,
                    cookies: true,
                    headers: BTreeMap::from([(
                        "User-Agent".to_string(),
                        "Mozilla/5.0 (compatible; AIAgent/1.0)".to_string(),
                    )]),
                    proxy: None,
                },
                rules: CrawlRules {
                    allowed_domains: Vec::new(),
                    blocked_domains: Vec::new(),
                    max_depth: 2,
                    max_pages: 10,
                },
            }),
            AgentType::WebSearcher => Self::WebSearcher(WebSearcherSettings {
                query: String::new(),
                max_results: 5,
                search_engines: vec![SearchEngine::Google, SearchEngine::Bing],
                filters: SearchFilters {
                    time_range: Some(TimeRange::Month),
                    safe_search: true,
                    ..SearchFilters::default()
                },
            }),
            AgentType::CodeInterpreter => Self::CodeInterpreter(CodeInterpreterSettings {
                runtime: Runtimes {
                    python: true,
                    javascript: true,
                    r: false,
                },
                permissions: InterpreterPermissions {
                    file_system: true,
                    network: false,
                    subprocess: false,
                },
                libraries: ["numpy", "pandas", "matplotlib"]
                    .map(String::from)
                    .to_vec(),
                memory_limit_mb: 1024,
                timeout_seconds: 30,
            }),
            AgentType::DataAnalyst => Self::DataAnalyst(DataAnalystSettings {
                supported_formats: vec![DataFormat::Csv, DataFormat::Json, DataFormat::Excel],
                visualization: Visualization {
                    enabled: true,
                    libraries: vec!["matplotlib".to_string(), "plotly".to_string()],
                },
                database: None,
                caching: true,
            }),
            AgentType::ImageGenerator => Self::ImageGenerator(ImageGeneratorSettings {
                provider: ImageProvider::Dalle,
                resolution: "1024x1024".to_string(),
                style: "natural".to_string(),
                negative_prompt: None,
                sampling_steps: 20,
                seed: None,
            }),
            AgentType::TextGenerator => Self::TextGenerator(TextGeneratorSettings {
                max_length: 2000,
                stop_sequences: Vec::new(),
                format: TextFormat::Markdown,
                style: Some(TextStyle {
                    tone: Tone::Professional,
                    audience: Audience::General,
                }),
            }),
            AgentType::Translator => Self::Translator(TranslatorSettings {
                source_lang: "auto".to_string(),
                target_lang: "tr".to_string(),
                preserve_formatting: true,
                glossary: BTreeMap::new(),
                specialization: Some("general".to_string()),
            }),
            AgentType::YoutubeSummarizer => Self::YoutubeSummarizer(YoutubeSummarizerSettings {
                youtube_url: String::new(),
                custom_prompt: String::new(),
                output_format: SummaryFormat::Text,
                language: "en".to_string(),
                max_length: None,
                include_thumbnail: false,
                include_timestamps: true,
            }),
            AgentType::Result => Self::Result(ResultSettings {
                display_format: DisplayFormat::Json,
                auto_refresh: false,
                refresh_interval_ms: Some(5000),
                max_history_length: 10,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::WebSearcher(s) if s.max_results == 0 => Err(ConfigurationError::Invalid {
                field: "maxResults",
                reason: "must request at least one result".to_string(),
            }),
            Self::WebScraper(s) if s.rules.max_pages == 0 => Err(ConfigurationError::Invalid {
                field: "maxPages",
                reason: "must allow at least one page".to_string(),
            }),
            Self::Result(s) => {
                if s.max_history_length == 0 {
                    return Err(ConfigurationError::Invalid {
                        field: "maxHistoryLength",
                        reason: "must keep at least one entry".to_string(),
                    });
                }
                match (s.auto_refresh, s.refresh_interval_ms) {
                    (true, None) => Err(ConfigurationError::Invalid {
                        field: "refreshIntervalMs",
                        reason: "required when auto refresh is on".to_string(),
                    }),
                    (true, Some(ms)) if ms < 1000 => Err(ConfigurationError::Invalid {
                        field: "refreshIntervalMs",
                        reason: format!("{ms}ms is below the 1000ms minimum"),
                    }),
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Complete configuration carried by a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Backend model profile. Present for agent-kind configs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
    pub settings: AgentSettings,
}

impl AgentConfig {
    /// Returns the agent type of this config.
    #[must_use]
    pub fn agent_type(&self) -> AgentType {
        self.settings.agent_type()
    }

    /// Validates the config as a whole.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Invalid` if the model profile is missing
    /// (or present on a result config) or any field is out of range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match (&self.model, self.agent_type().is_executable()) {
            (Some(model), true) => model.validate()?,
            (None, true) => {
                return Err(ConfigurationError::Invalid {
                    field: "model",
                    reason: format!("agent type '{}' requires a model profile", self.agent_type()),
                });
            }
            (Some(_), false) => {
                return Err(ConfigurationError::Invalid {
                    field: "model",
                    reason: "result nodes do not take a model profile".to_string(),
                });
            }
            (None, false) => {}
        }
        self.settings.validate()
    }
}

fn display_header(agent_type: AgentType) -> (&'static str, &'static str) {
    match agent_type {
        AgentType::WebScraper => ("Web Scraper", "Extracts and analyzes data from web pages"),
        AgentType::WebSearcher => ("Web Searcher", "Searches the web and gathers information"),
        AgentType::CodeInterpreter => ("Code Interpreter", "Runs code and assists with programming"),
        AgentType::DataAnalyst => ("Data Analyst", "Analyzes and visualizes data"),
        AgentType::ImageGenerator => ("Image Generator", "Creates images with generative models"),
        AgentType::TextGenerator => ("Text Generator", "Produces content and text"),
        AgentType::Translator => ("Translator", "Translates between languages"),
        AgentType::YoutubeSummarizer => ("YouTube Summarizer", "Answers questions about a video"),
        AgentType::Result => ("Result Viewer", "Displays output from connected agents"),
    }
}

/// Builds the default config for an agent type on a model profile.
///
/// Result configs ignore `model_type`: they never carry a model profile.
#[must_use]
pub fn create_default_config(agent_type: AgentType, model_type: ModelType) -> AgentConfig {
    let (name, description) = display_header(agent_type);
    AgentConfig {
        name: name.to_string(),
        description: description.to_string(),
        model: agent_type
            .is_executable()
            .then(|| ModelConfig::profile(model_type)),
        settings: AgentSettings::defaults(agent_type),
    }
}

/// Builds a default config from untyped tags, as received from an editor.
///
/// # Errors
///
/// Returns `ConfigurationError::UnknownAgentType` or
/// `ConfigurationError::UnknownModelType` for unrecognized tags.
pub fn create_default_config_from_tags(
    agent_tag: &str,
    model_tag: &str,
) -> Result<AgentConfig, ConfigurationError> {
    let agent_type: AgentType = agent_tag.parse()?;
    let model_type: ModelType = model_tag.parse()?;
    Ok(create_default_config(agent_type, model_type))
}
