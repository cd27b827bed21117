//! Fluent-based localization for bot replies.
//!
//! Russian and English bundles are compiled into the binary. Any other
//! Telegram language falls back to the configured default.

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

use crate::config::DEFAULT_LANGUAGE;

const RESOURCES: [(&str, &str); 2] = [
    ("ru", include_str!("../locales/ru/main.ftl")),
    ("en", include_str!("../locales/en/main.ftl")),
];

pub const SUPPORTED_LANGUAGES: [&str; 2] = ["ru", "en"];

/// Localization manager for the clinic bot
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
    default_language: &'static str,
}

impl LocalizationManager {
    /// Create a manager with every supported language loaded.
    pub fn new(default_language: &str) -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in RESOURCES {
            bundles.insert(language, Self::create_bundle(language, source)?);
        }

        Ok(Self {
            bundles,
            default_language: supported(default_language).unwrap_or(DEFAULT_LANGUAGE),
        })
    }

    fn create_bundle(language: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the Unicode isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("invalid {language} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("duplicate {language} messages: {errors:?}"))?;
        Ok(bundle)
    }

    pub fn default_language(&self) -> &'static str {
        self.default_language
    }

    /// Resolve a language code to a supported language.
    pub fn detect_language(&self, language_code: Option<&str>) -> &'static str {
        language_code.and_then(supported).unwrap_or(self.default_language)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = self.detect_language(Some(language));
        let Some(bundle) = self.bundles.get(language) else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key = key, language = language, errors = ?errors, "Localization formatting errors");
        }
        value.into_owned()
    }

    pub fn get_message_with_args(&self, key: &str, language: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }
}

fn supported(language_code: &str) -> Option<&'static str> {
    let primary = language_code
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    SUPPORTED_LANGUAGES.into_iter().find(|lang| *lang == primary)
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager.
///
/// Has no effect when the manager was already initialized.
pub fn init_localization(default_language: &str) -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_some() {
        return Ok(());
    }
    let manager = LocalizationManager::new(default_language)?;
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

/// Get the global localization manager, initializing it with the default
/// language on first use.
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::new(DEFAULT_LANGUAGE).unwrap_or_else(|e| {
            error!(error = %e, "Failed to load localization resources");
            LocalizationManager {
                bundles: HashMap::new(),
                default_language: DEFAULT_LANGUAGE,
            }
        })
    })
}

/// Resolve a Telegram language code with the global manager.
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    get_localization_manager().detect_language(language_code)
}

/// Localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    let manager = get_localization_manager();
    manager.get_message_in_language(key, manager.detect_language(language_code), None)
}

/// Localized message with arguments in the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let manager = get_localization_manager();
    manager.get_message_with_args(key, manager.detect_language(language_code), args)
}
