//! Tax-id lookup: fetches a tax-authority verification page (HTML or PDF)
//! and scrapes RFC, name and address out of it.

use std::time::Duration;

use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

const USER_AGENT: &str = concat!("unici/", env!("CARGO_PKG_VERSION"));
const SNIPPET_RADIUS: usize = 80;
const MAX_SNIPPETS: usize = 3;
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

static SCRIPT_OR_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>").unwrap());
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(td|th|tr|li|p|div|br|table|tbody|thead|span|label|h[1-6])(\s[^>]*)?/?>").unwrap()
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#\d+|[a-zA-Z]+);").unwrap());
static RFC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^A-Z0-9Ñ&])([A-ZÑ&]{3,4}\d{6}[A-Z0-9]{3})(?:[^A-Z0-9]|$)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "rfc": "LOPA850101AB1",
    "name": "ANA LOPEZ PEREZ",
    "address": "AV. CONSTITUCION, No. 100, Col. CENTRO, C.P. 64000, MONTERREY, NUEVO LEON"
}))]
pub struct TaxRecord {
    pub rfc: String,
    pub name: String,
    pub address: String,
}

/// Lookup failure with bits of the fetched text to diagnose the scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaxLookupError {
    pub error: String,
    pub snippets: Vec<String>,
}

impl TaxLookupError {
    fn new(error: impl Into<String>, snippets: Vec<String>) -> Self {
        Self {
            error: error.into(),
            snippets,
        }
    }
}

pub struct TaxLookup {
    client: reqwest::Client,
    cache: Cache<String, TaxRecord>,
}

impl TaxLookup {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        })
    }

    pub async fn lookup(&self, url: &str) -> Result<TaxRecord, TaxLookupError> {
        let url = url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(TaxLookupError::new("La URL debe comenzar con http:// o https://", vec![]));
        }

        if let Some(record) = self.cache.get(url).await {
            debug!(url, "Tax lookup served from cache");
            return Ok(record);
        }

        let text = self.fetch_text(url).await?;
        let record = parse_record(&text)?;

        self.cache.insert(url.to_string(), record.clone()).await;
        Ok(record)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, TaxLookupError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, url, "Tax page request failed");
            TaxLookupError::new(format!("No se pudo consultar la URL: {}", e), vec![])
        })?;

        let status = response.status();
        let is_pdf = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("pdf"));

        let body = read_body(response).await?;

        if !status.is_success() {
            let text = html_to_text(&String::from_utf8_lossy(&body));
            return Err(TaxLookupError::new(
                format!("La página respondió con estado {}", status),
                snippets(&text),
            ));
        }

        if is_pdf || body.starts_with(b"%PDF") {
            pdf_to_text(&body)
        } else {
            Ok(html_to_text(&String::from_utf8_lossy(&body)))
        }
    }
}

/// Reads the body, refusing anything over `MAX_BODY_BYTES`.
async fn read_body(mut response: reqwest::Response) -> Result<Vec<u8>, TaxLookupError> {
    let too_large = || {
        TaxLookupError::new(
            format!("La respuesta excede el límite de {} MB", MAX_BODY_BYTES / (1024 * 1024)),
            vec![],
        )
    };

    if response
        .content_length()
        .is_some_and(|len| len > MAX_BODY_BYTES as u64)
    {
        warn!(length = ?response.content_length(), "Tax page too large");
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TaxLookupError::new(format!("No se pudo leer la respuesta: {}", e), vec![]))?
    {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            warn!(read = body.len(), "Tax page exceeded the body limit");
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn pdf_to_text(bytes: &[u8]) -> Result<String, TaxLookupError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| TaxLookupError::new(format!("PDF ilegible: {}", e), vec![]))?;

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    document
        .extract_text(&pages)
        .map_err(|e| TaxLookupError::new(format!("No se pudo extraer texto del PDF: {}", e), vec![]))
}

/// Flattens markup into one cell or block per line.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = ENTITY.replace_all(&text, |caps: &regex::Captures| decode_entity(&caps[1]));

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entity(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        return code
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default();
    }

    let decoded = match name {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "aacute" => "á",
        "eacute" => "é",
        "iacute" => "í",
        "oacute" => "ó",
        "uacute" => "ú",
        "Aacute" => "Á",
        "Eacute" => "É",
        "Iacute" => "Í",
        "Oacute" => "Ó",
        "Uacute" => "Ú",
        "ntilde" => "ñ",
        "Ntilde" => "Ñ",
        "uuml" => "ü",
        "Uuml" => "Ü",
        _ => return format!("&{};", name),
    };
    decoded.to_string()
}

/// Lowercase without Spanish accents, for label matching.
fn fold(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Value of the first label found, either inline (`Label: value`) or in the
/// following line (`Label:` then `value`).
fn label_value(lines: &[&str], labels: &[&str]) -> Option<String> {
    for label in labels {
        let label = fold(label);
        for (i, line) in lines.iter().enumerate() {
            let folded = fold(line);

            if folded == label || folded == format!("{}:", label) {
                return lines
                    .get(i + 1)
                    .filter(|next| !next.ends_with(':'))
                    .map(|next| next.to_string());
            }

            if folded.starts_with(&format!("{}:", label)) {
                let value = line.split_once(':').map(|(_, v)| v.trim()).unwrap_or_default();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn find_rfc(text: &str, lines: &[&str]) -> Option<String> {
    if let Some(labelled) = label_value(lines, &["RFC", "R.F.C."]) {
        let candidate = labelled.to_uppercase();
        if let Some(caps) = RFC.captures(&candidate) {
            return Some(caps[1].to_string());
        }
    }
    RFC.captures(text).map(|caps| caps[1].to_string())
}

fn find_name(lines: &[&str]) -> Option<String> {
    if let Some(company) = label_value(lines, &["Denominación o Razón Social", "Razón Social"]) {
        return Some(company);
    }

    let given = label_value(lines, &["Nombre (s)", "Nombre(s)", "Nombre"])?;
    let parts = [
        Some(given),
        label_value(lines, &["Primer Apellido", "Apellido Paterno"]),
        label_value(lines, &["Segundo Apellido", "Apellido Materno"]),
    ];
    Some(parts.into_iter().flatten().collect::<Vec<_>>().join(" "))
}

fn find_address(lines: &[&str]) -> String {
    let part = |labels: &[&str], prefix: &str| label_value(lines, labels).map(|v| format!("{}{}", prefix, v));

    [
        part(&["Nombre de la Vialidad", "Vialidad", "Calle"], ""),
        part(&["Número Exterior"], "No. "),
        part(&["Número Interior"], "Int. "),
        part(&["Nombre de la Colonia", "Colonia"], "Col. "),
        part(&["Código Postal", "CP"], "C.P. "),
        part(
            &["Nombre del Municipio o Demarcación Territorial", "Municipio o delegación", "Municipio"],
            "",
        ),
        part(&["Nombre de la Entidad Federativa", "Entidad Federativa"], ""),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

/// Extracts the record from flattened page text. RFC and name are required.
pub fn parse_record(text: &str) -> Result<TaxRecord, TaxLookupError> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let rfc = find_rfc(text, &lines)
        .ok_or_else(|| TaxLookupError::new("No se encontró el RFC en el documento", snippets(text)))?;
    let name = find_name(&lines)
        .ok_or_else(|| TaxLookupError::new("No se encontró el nombre en el documento", snippets(text)))?;

    Ok(TaxRecord {
        rfc,
        name,
        address: find_address(&lines),
    })
}

/// Up to three windows of text around "RFC" mentions, or the start of the text.
fn snippets(text: &str) -> Vec<String> {
    let folded = text.to_lowercase();
    let mut found: Vec<String> = folded
        .match_indices("rfc")
        .map(|(idx, _)| window(text, idx))
        .take(MAX_SNIPPETS)
        .collect();

    if found.is_empty() && !text.is_empty() {
        found.push(window(text, 0));
    }
    found.dedup();
    found
}

fn window(text: &str, at: usize) -> String {
    let mut start = at.saturating_sub(SNIPPET_RADIUS).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (at + SNIPPET_RADIUS).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].replace('\n', " | ")
}
