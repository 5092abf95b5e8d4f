//! Internationalization (i18n) module.
//!
//! Provides localized strings for the CLI help and console notices.
//! English is the default language; Spanish is available as an alternative.
//! The architecture supports adding more languages in the future.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Spanish
    Es,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "es", "en_US", "es_ES").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `EML2MSG_LANG`, `LC_MESSAGES` or `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("EML2MSG_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $es:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Es => $es,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(
    app_about,
    "Convert an .eml message into an Outlook draft (.msg / .oft template)",
    "Convierte un mensaje .eml en un borrador de Outlook (plantilla .msg / .oft)"
);
msg!(
    app_long_about,
    "Convert an .eml message into an Outlook draft (.msg / .oft template).\nThe HTML body is kept verbatim and images referenced by cid: stay embedded,\nso the result opens in Outlook ready to edit and send.",
    "Convierte un mensaje .eml en un borrador de Outlook (plantilla .msg / .oft).\nEl cuerpo HTML se conserva tal cual y las im\u{e1}genes referenciadas con cid:\nsiguen incrustadas, as\u{ed} que el resultado se abre en Outlook listo para enviar."
);
msg!(
    app_after_help,
    "Examples:\n  eml2msg newsletter.eml template.oft\n  eml2msg build mail/newsletter newsletter.eml",
    "Ejemplos:\n  eml2msg newsletter.eml plantilla.oft\n  eml2msg build mail/boletin boletin.eml"
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_files_arg,
    "Input .eml file followed by the output .msg / .oft file",
    "Fichero .eml de entrada seguido del fichero .msg / .oft de salida"
);
msg!(
    help_verbose,
    "Verbose logging (-v info, -vv debug, -vvv trace)",
    "Registro detallado (-v info, -vv debug, -vvv trace)"
);
msg!(
    help_lang,
    "Language (en, es). Defaults to system locale",
    "Idioma (en, es). Por defecto usa el idioma del sistema"
);
msg!(
    help_output_json,
    "Print a JSON report instead of progress notices",
    "Mostrar un informe JSON en lugar de los avisos de progreso"
);
msg!(
    help_config,
    "Configuration file (defaults to EML2MSG_CONFIG or the user config dir)",
    "Fichero de configuraci\u{f3}n (por defecto EML2MSG_CONFIG o el directorio de configuraci\u{f3}n del usuario)"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "Generar completions para tu shell"
);
msg!(
    help_cmd_build,
    "Build an .eml template from a folder with index.html and its images",
    "Crear una plantilla .eml a partir de una carpeta con index.html y sus im\u{e1}genes"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "Generar p\u{e1}gina de manual"
);

// ── Usage ────────────────────────────────────────────────────────

msg!(
    usage_line,
    "Usage: eml2msg <eml_file> <oft_file>",
    "Uso: eml2msg <fichero_eml> <fichero_oft>"
);
msg!(
    usage_example,
    "Example: eml2msg newsletter.eml template.oft",
    "Ejemplo: eml2msg newsletter.eml plantilla.oft"
);

// ── Progress notices ─────────────────────────────────────────────

msg!(
    msg_looking_for,
    "Looking for file at:",
    "Buscando el fichero en:"
);
msg!(
    msg_reading,
    "Reading EML and converting...",
    "Leyendo el EML y convirtiendo..."
);
msg!(msg_inline_image, "Inline Image:", "Imagen incrustada:");
msg!(msg_attachment, "Attachment:", "Adjunto:");
msg!(
    msg_completed,
    "CONVERSION COMPLETED! File generated:",
    "\u{a1}CONVERSI\u{d3}N COMPLETADA! Fichero generado:"
);

// ── Template build ───────────────────────────────────────────────

msg!(
    build_usage_line,
    "Usage: eml2msg build <input_folder> <output_file>",
    "Uso: eml2msg build <carpeta_entrada> <fichero_salida>"
);
msg!(
    build_usage_example,
    "Example: eml2msg build mail/newsletter output.eml",
    "Ejemplo: eml2msg build mail/boletin salida.eml"
);
msg!(msg_embedded_image, "Embedded image:", "Imagen incrustada:");
msg!(
    warn_image_not_found,
    "Warning: Image not found ->",
    "Aviso: Imagen no encontrada ->"
);
msg!(
    msg_eml_generated,
    "EML generated successfully ->",
    "EML generado correctamente ->"
);
msg!(err_generic, "Error:", "Error:");

// ── Errors ───────────────────────────────────────────────────────

msg!(
    err_file_not_found,
    "CRITICAL ERROR: Cannot find",
    "ERROR CR\u{cd}TICO: No se encuentra"
);
msg!(err_exception, "Exception:", "Excepci\u{f3}n:");
msg!(
    err_images_hint,
    "Please check that all images referenced in your HTML exist.",
    "Comprueba que existen todas las im\u{e1}genes referenciadas en tu HTML."
);
msg!(
    err_report_json,
    "Cannot serialize the conversion report",
    "No se puede serializar el informe de conversi\u{f3}n"
);
