//! Target language selection.
//!
//! A request targets an ordered list of languages; the first entry is the
//! "primary" language and decides execution behavior and the output file
//! extension. The query itself is scanned first so that "reverse a string
//! python" never has to ask.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Supported target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Language {
    /// Python 3.
    Python,
    /// JavaScript (Node).
    JavaScript,
    /// Java.
    Java,
    /// C#.
    CSharp,
    /// C.
    C,
    /// C++.
    Cpp,
    /// HTML markup.
    Html,
    /// CSS stylesheets.
    Css,
    /// Ruby.
    Ruby,
    /// Go.
    Go,
    /// PHP.
    Php,
}

impl Language {
    /// File extension for saved artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::JavaScript => "js",
            Self::Java => "java",
            Self::CSharp => "cs",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Html => "html",
            Self::Css => "css",
            Self::Ruby => "rb",
            Self::Go => "go",
            Self::Php => "php",
        }
    }

    /// Markup languages have no executable test concept.
    pub fn is_markup(self) -> bool {
        matches!(self, Self::Html | Self::Css)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::CSharp => "csharp",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Html => "html",
            Self::Css => "css",
            Self::Ruby => "ruby",
            Self::Go => "go",
            Self::Php => "php",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            "java" => Ok(Self::Java),
            "csharp" | "c#" => Ok(Self::CSharp),
            "c" => Ok(Self::C),
            "cpp" | "c++" => Ok(Self::Cpp),
            "html" => Ok(Self::Html),
            "css" => Ok(Self::Css),
            "ruby" | "rb" => Ok(Self::Ruby),
            "go" | "golang" => Ok(Self::Go),
            "php" => Ok(Self::Php),
            _ => anyhow::bail!(
                "Unknown language: '{s}'. Supported: python, javascript, java, csharp, c, \
                 cpp, html, css, ruby, go, php"
            ),
        }
    }
}

/// Scans a free-text query for a language mention.
///
/// Multi-word names win over their prefixes ("javascript" over "java",
/// "c++"/"c#" over "c"); the leftmost mention decides.
pub(crate) fn detect_language(query: &str) -> Option<Language> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(\bjavascript\b|\bpython\b|\bjava\b|\bcsharp\b|\bc\+\+|\bc#|\bcpp\b|\bhtml\b|\bcss\b|\bruby\b|\bgolang\b|\bgo\b|\bphp\b|\bc\b)",
        )
        .expect("language pattern is valid")
    });

    pattern
        .find(query)
        .and_then(|m| m.as_str().parse().ok())
}

/// A non-empty ordered list of target languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LanguageSelection {
    languages: Vec<Language>,
}

impl LanguageSelection {
    /// Creates a selection; fails on an empty list.
    pub fn new(languages: Vec<Language>) -> Result<Self> {
        if languages.is_empty() {
            anyhow::bail!("Language selection cannot be empty");
        }
        Ok(Self { languages })
    }

    /// Selection containing a single language.
    pub fn single(language: Language) -> Self {
        Self {
            languages: vec![language],
        }
    }

    /// Parses a comma-separated list, e.g. "python,javascript".
    pub fn parse(input: &str) -> Result<Self> {
        let languages = input
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Language>>>()?;
        Self::new(languages)
    }

    /// The primary language: first entry, drives execution and extension.
    pub fn primary(&self) -> Language {
        self.languages[0]
    }

    /// Comma-joined form for prompt interpolation.
    pub fn join(&self) -> String {
        self.languages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
