// crates/kpi-board-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Message catalog and translation utilities for the CLI.
// Purpose: Keep user-facing strings in one place for English and French.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! User-facing CLI output is routed through the [`t!`](crate::t) macro, which
//! looks messages up in a per-locale catalog.
//!
//! ## Invariants
//! - The locale is set once per process and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// French.
    Fr,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Parses a locale value, case-insensitive and tolerant of region tags.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_', '.']).next().unwrap_or("") {
            "en" => Some(Self::En),
            "fr" => Some(Self::Fr),
            _ => None,
        }
    }
}

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Preformatted value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "kpi-board {version}"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'fr'."),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.valid", "Config is valid: {path}"),
    ("config.defaults", "Config is valid (built-in defaults, {path} not found)"),
    ("store.open_failed", "Failed to open KPI store: {error}"),
    ("serve.init_failed", "Failed to start server: {error}"),
    ("serve.listening", "Serving KPI API on http://{bind}"),
    ("serve.seeded", "Seeded {kept} records from {path} ({dropped} dropped)"),
    ("serve.failed", "Server stopped: {error}"),
    ("ingest.failed", "Ingestion of {path} failed: {error}"),
    ("ingest.summary", "Ingested {path}: {read} rows read, {kept} stored, {dropped} dropped"),
    ("board.feed_failed", "Failed to build board feed: {error}"),
    ("board.render_failed", "Failed to render board: {error}"),
    ("board.empty", "No KPI records available."),
    ("board.source.api", "Source: API ({url})"),
    ("board.source.file", "Source: bulk file ({path})"),
    ("board.source.store", "Source: local store"),
    ("board.header.name", "KPI"),
    ("board.header.gauge", "Gauge"),
    ("board.header.percent", "Score"),
    ("board.header.rate", "Rate"),
    ("board.header.objective", "Objective"),
    ("board.header.realized", "Realized"),
    ("board.band.good", "good"),
    ("board.band.warn", "warn"),
    ("board.band.bad", "bad"),
    ("notice.api_empty", "API returned no data."),
    ("notice.api_failed", "API error: {error}"),
    ("notice.file_fallback", "No usable API data. Using {path} as fallback."),
    ("notice.file_missing", "{path} not found. Add it and rerun."),
    ("notice.file_invalid", "Bulk file rejected: {error}"),
    ("notice.mirror_failed", "Could not save records to the local store: {error}"),
    ("notice.store_failed", "Could not read the local store: {error}"),
];

/// French catalog.
const CATALOG_FR: &[(&str, &str)] = &[
    ("main.version", "kpi-board {version}"),
    ("output.write_failed", "Échec de l'écriture sur {stream} : {error}"),
    ("i18n.lang.invalid_env", "Valeur invalide pour {env} : {value}. Attendu 'en' ou 'fr'."),
    ("config.load_failed", "Échec du chargement de la configuration : {error}"),
    ("config.valid", "Configuration valide : {path}"),
    ("config.defaults", "Configuration valide (valeurs par défaut, {path} introuvable)"),
    ("store.open_failed", "Impossible d'ouvrir la base KPI : {error}"),
    ("serve.init_failed", "Échec du démarrage du serveur : {error}"),
    ("serve.listening", "API KPI disponible sur http://{bind}"),
    ("serve.seeded", "{kept} indicateurs chargés depuis {path} ({dropped} ignorés)"),
    ("serve.failed", "Serveur arrêté : {error}"),
    ("ingest.failed", "Échec de l'import de {path} : {error}"),
    (
        "ingest.summary",
        "Import de {path} : {read} lignes lues, {kept} enregistrées, {dropped} ignorées",
    ),
    ("board.feed_failed", "Impossible de préparer le tableau : {error}"),
    ("board.render_failed", "Impossible d'afficher le tableau : {error}"),
    ("board.empty", "Aucun indicateur disponible."),
    ("board.source.api", "Source : API ({url})"),
    ("board.source.file", "Source : fichier ({path})"),
    ("board.source.store", "Source : base locale"),
    ("board.header.name", "Indicateur"),
    ("board.header.gauge", "Jauge"),
    ("board.header.percent", "Score"),
    ("board.header.rate", "Taux"),
    ("board.header.objective", "Objectif"),
    ("board.header.realized", "Réalisé"),
    ("board.band.good", "bon"),
    ("board.band.warn", "moyen"),
    ("board.band.bad", "faible"),
    ("notice.api_empty", "L'API n'a renvoyé aucune donnée."),
    ("notice.api_failed", "Erreur API : {error}"),
    ("notice.file_fallback", "Aucune donnée API exploitable. Utilisation de {path} en secours."),
    ("notice.file_missing", "{path} introuvable. Ajoutez-le puis relancez."),
    ("notice.file_invalid", "Fichier rejeté : {error}"),
    ("notice.mirror_failed", "Impossible d'enregistrer les indicateurs localement : {error}"),
    ("notice.store_failed", "Impossible de lire la base locale : {error}"),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_FR_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Fr => CATALOG_FR_MAP.get_or_init(|| CATALOG_FR.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_in(current_locale(), key, args)
}

/// Translates `key` in an explicit locale.
#[must_use]
pub fn translate_in(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================
