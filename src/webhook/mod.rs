use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, Endpoints};

pub mod model;

/// One row of a bulk submit payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistroLote {
    pub cpf: String,
    pub nome: Option<String>,
    pub telefone: Option<String>,
}

/// Everything the console asks of the webhook host. The campaign engine and
/// the CLI handlers depend on this trait so tests can substitute a recording
/// fake.
#[async_trait]
pub trait ConsultaApi: Send + Sync {
    /// Single-CPF balance query.
    async fn consultar_cpf(&self, cpf: &str) -> Result<Value>;

    /// Submit a parsed CSV as a remote batch.
    async fn inserir_lote(&self, arquivo_nome: &str, registros: &[RegistroLote]) -> Result<Value>;

    /// Ask the partner to start a previously submitted batch.
    async fn iniciar_lote(&self, batch_id: &str) -> Result<Value>;

    /// Remote list of submitted batches.
    async fn lotes(&self) -> Result<Value>;

    /// Full consultation history.
    async fn historico(&self) -> Result<Value>;

    /// Registered-customer lookup.
    async fn buscar_cliente(&self, cpf: &str) -> Result<Value>;

    /// Forward an imported customer list to the registration flow.
    async fn cadastrar_clientes(&self, registros: &Value) -> Result<Value>;

    /// VCTEX protocol list.
    async fn vctex_protocolos(&self) -> Result<Value>;

    /// VCTEX protocol lookup / batch-query detail.
    async fn vctex_consulta_lote(&self, protocolo: &str) -> Result<Value>;
}

#[derive(Clone)]
pub struct WebhookClient {
    http: Client,
    endpoints: Endpoints,
}

impl fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookClient")
            .field("consulta", &self.endpoints.consulta)
            .finish_non_exhaustive()
    }
}

impl WebhookClient {
    pub fn from_config(cfg: &Config) -> Self {
        let http = Client::builder()
            .user_agent("consulta-fgts/0.1")
            .timeout(Duration::from_secs(cfg.app.http_timeout_seconds))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoints: cfg.endpoints.clone(),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        debug!(url, payload = %body, "webhook POST");
        let res = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        Self::ler_resposta(url, res).await
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(url, "webhook GET");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        Self::ler_resposta(url, res).await
    }

    async fn ler_resposta(url: &str, res: reqwest::Response) -> Result<Value> {
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!(url, "rate limited by webhook host: {}", body);
            return Err(anyhow!("Erro na consulta: 429 Too Many Requests"));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(url, %status, "webhook error: {}", body);
            return Err(anyhow!(
                "Erro na consulta: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ));
        }
        let body = res.text().await.context("failed to read webhook response")?;
        debug!(url, resposta = %body, "webhook response");
        serde_json::from_str(&body).context("invalid webhook response JSON")
    }
}

/// Build the bulk-submit payload exactly as the partner flow expects it.
pub fn build_lote_request(arquivo_nome: &str, registros: &[RegistroLote]) -> Value {
    json!({
        "tipo": "api",
        "arquivo_nome": arquivo_nome,
        "consultas": registros
            .iter()
            .map(|r| {
                json!({
                    "cpf": r.cpf,
                    "nome": r.nome,
                    "telefone": r.telefone,
                })
            })
            .collect::<Vec<_>>(),
    })
}

#[async_trait]
impl ConsultaApi for WebhookClient {
    async fn consultar_cpf(&self, cpf: &str) -> Result<Value> {
        self.post_json(&self.endpoints.consulta, &json!({ "cpf": cpf }))
            .await
    }

    async fn inserir_lote(&self, arquivo_nome: &str, registros: &[RegistroLote]) -> Result<Value> {
        let body = build_lote_request(arquivo_nome, registros);
        self.post_json(&self.endpoints.lote_inserir, &body).await
    }

    async fn iniciar_lote(&self, batch_id: &str) -> Result<Value> {
        self.post_json(&self.endpoints.lote_iniciar, &json!({ "batch_id": batch_id }))
            .await
    }

    async fn lotes(&self) -> Result<Value> {
        self.get_json(&self.endpoints.lote_historico).await
    }

    async fn historico(&self) -> Result<Value> {
        self.get_json(&self.endpoints.historico).await
    }

    async fn buscar_cliente(&self, cpf: &str) -> Result<Value> {
        self.post_json(&self.endpoints.cliente, &json!({ "cpf": cpf }))
            .await
    }

    async fn cadastrar_clientes(&self, registros: &Value) -> Result<Value> {
        self.post_json(&self.endpoints.cadastro_clientes, registros)
            .await
    }

    async fn vctex_protocolos(&self) -> Result<Value> {
        self.get_json(&self.endpoints.vctex_protocolos).await
    }

    async fn vctex_consulta_lote(&self, protocolo: &str) -> Result<Value> {
        self.post_json(
            &self.endpoints.vctex_consulta_lote,
            &json!({ "protocolo": protocolo }),
        )
        .await
    }
}
