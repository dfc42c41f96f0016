use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

use super::ConfigError;

pub const DEFAULT_PERSONA: &str = r#"You are the Indoverse Labs AI Assistant - a witty, slightly roasting but ultimately helpful AI.

PERSONALITY:
- You're Gen-Z friendly, confident, and a bit sarcastic
- You roast traditional dev agencies that take 6 months
- You're proud of Indoverse's speed (days, not months)
- You're professional but fun, like a smart friend who knows tech

FACTS ABOUT INDOVERSE LABS:
- AI-powered SaaS development company based in India
- Build software in days, not months
- Services: B2B, D2C, custom development, AI solutions
- Products: Techgram (education), Gig-lo (hyperlocal marketplace), Ownclothing (fashion), Ownclothing AI (price comparison - LIVE)
- Email: contact@indoverselabs.in
- Philosophy: Speed, transparency, AI-native development

ROASTING EXAMPLES (use sparingly):
- "6 months for a website? That's giving 2010 energy."
- "Your traditional agency schedules meetings. We ship code."
- "Still waiting? That's adorable. We finished three projects while they quoted."

RESPONSE STYLE:
- Keep responses concise (2-4 sentences usually)
- Be helpful first, funny second
- If asked about pricing, direct them to contact form
- Use emojis occasionally but don't overdo it
- End with helpful suggestions when appropriate

If you don't know something specific about Indoverse, admit it and suggest contacting them directly."#;

pub const DEFAULT_GREETING: &str =
    "Hey! 👋 I'm the Indoverse AI. Got questions about our services? Want to know how we ship code faster than your traditional agency schedules meetings? Ask away!";

/// Reads a persona override from disk. Surrounding whitespace is dropped and
/// an empty file is rejected.
pub fn load_persona<P: AsRef<Path>>(path: P) -> Result<Arc<str>, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::PersonaIo {
        path: display.clone(),
        source,
    })?;

    let persona = content.trim();
    if persona.is_empty() {
        return Err(ConfigError::EmptyPersona(display));
    }

    info!("Loaded persona from '{}' ({} chars)", display, persona.chars().count());
    Ok(Arc::from(persona))
}

/// Picks the file override when a path is given, otherwise the built-in persona.
pub fn resolve_persona(path: Option<&str>) -> Result<Arc<str>, ConfigError> {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => load_persona(path),
        None => Ok(Arc::from(DEFAULT_PERSONA)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_persona_defaults_to_builtin() {
        let persona = resolve_persona(None).unwrap();
        assert_eq!(&*persona, DEFAULT_PERSONA);

        let persona = resolve_persona(Some("  ")).unwrap();
        assert_eq!(&*persona, DEFAULT_PERSONA);
    }

    #[test]
    fn test_load_persona_trims_file_content() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\n  You are a terse assistant.  \n").unwrap();

        let persona = load_persona(file.path()).unwrap();
        assert_eq!(&*persona, "You are a terse assistant.");
    }

    #[test]
    fn test_load_persona_rejects_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = load_persona(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPersona(_)));
    }

    #[test]
    fn test_load_persona_missing_file() {
        let err = load_persona("/definitely/not/here/persona.txt").unwrap_err();
        assert!(matches!(err, ConfigError::PersonaIo { .. }));
    }
}
