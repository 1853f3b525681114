use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    #[serde(rename = "pdfText")]
    pdf_text: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    text: String,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

/// Client for the document backend (`/upload` and `/ask`)
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a PDF to the backend and return the text it extracted.
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let url = format!("{}/upload", self.base_url);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        log::info!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), url);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("pdf", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Upload request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Upload failed with status: {}", response.status()));
        }

        let upload_response: UploadResponse = response
            .json()
            .await
            .context("Upload response did not contain extracted text")?;
        log::info!("Backend extracted {} characters", upload_response.text.len());
        Ok(upload_response.text)
    }

    /// Ask a question about previously extracted text.
    pub async fn ask(&self, question: &str, pdf_text: &str) -> Result<String> {
        let url = format!("{}/ask", self.base_url);

        log::info!(
            "Asking {} ({} chars of question, {} chars of context)",
            url,
            question.len(),
            pdf_text.len()
        );

        let request = AskRequest { question, pdf_text };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Ask request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Ask failed with status: {}", response.status()));
        }

        let ask_response: AskResponse = response
            .json()
            .await
            .context("Ask response did not contain an answer")?;
        Ok(ask_response.answer)
    }
}
