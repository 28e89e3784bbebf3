//! Versioned lexical conventions of the Bolt language

/// Delimiters and conventions the lexer consults instead of hard-coding them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
    pub version: &'static str,
    pub comment_prefix: &'static str,
    pub string_prefix: &'static str,
    pub string_suffix: &'static str,
    /// Extension of Bolt source files, without the dot
    pub source_extension: &'static str,
}

impl LanguageSpec {
    pub const V0_0_1: LanguageSpec = LanguageSpec {
        version: "0.0.1",
        comment_prefix: "//",
        string_prefix: "\"",
        string_suffix: "\"",
        source_extension: "bolt",
    };

    /// The specification new compilations use
    pub const fn current() -> &'static LanguageSpec {
        &Self::V0_0_1
    }
}

impl Default for LanguageSpec {
    fn default() -> Self {
        Self::current().clone()
    }
}
