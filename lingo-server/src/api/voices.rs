//! Azure voice overview page

use axum::{extract::State, response::Html, Extension};

use super::ui::{escape_html, page};
use crate::auth::CurrentStudent;
use crate::providers::tts::{group_voices_by_language, AzureVoice};
use crate::AppState;

fn voice_table(voices: &[AzureVoice]) -> String {
    if voices.is_empty() {
        return "<p>No voices available.</p>".to_string();
    }
    let rows: String = voices
        .iter()
        .map(|v| {
            format!(
                "<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td></tr>",
                escape_html(&v.display_name),
                escape_html(&v.short_name),
                escape_html(&v.locale),
                escape_html(&v.gender),
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th>Name</th><th>Voice</th><th>Locale</th><th>Gender</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

/// GET /voices
///
/// Lists Azure voices per supported language; empty unless Azure
/// credentials are configured.
pub async fn voices_page(
    State(state): State<AppState>,
    Extension(student): Extension<CurrentStudent>,
) -> Html<String> {
    let voices = match &state.voices {
        Some(catalog) => catalog.list().await,
        None => Vec::new(),
    };

    let body = if state.voices.is_none() {
        "<p>Voice listing requires Azure Speech credentials.</p>".to_string()
    } else {
        let sections: String = group_voices_by_language(&voices)
            .into_iter()
            .map(|(language, voices)| {
                format!(
                    "<section><h2>{}</h2>{}</section>",
                    language.code().to_uppercase(),
                    voice_table(&voices)
                )
            })
            .collect();
        format!(r#"<div class="voices">{}</div>"#, sections)
    };

    page("Voices", Some(&student), None, &body)
}
