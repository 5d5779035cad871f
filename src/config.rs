//! Configuration loader and validator for the FGTS consultation console.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub endpoints: Endpoints,
    pub facta: Facta,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Wall-clock delay between campaign ticks. One request is issued per tick.
    pub poll_interval_ms: u64,
    /// Upper bound for each outbound request; a hung partner endpoint must not
    /// stall the campaign loop indefinitely.
    pub http_timeout_seconds: u64,
}

/// Webhook endpoints hosted by the workflow-automation partner. The URLs are
/// opaque; request/response shapes are whatever the partner's flows emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoints {
    /// Single-CPF balance query (POST).
    pub consulta: String,
    /// Bulk submit of a parsed CSV (POST), returns a batch id.
    pub lote_inserir: String,
    /// Server-side start of a previously submitted batch (POST).
    pub lote_iniciar: String,
    /// Remote list of submitted batches (GET).
    pub lote_historico: String,
    /// Full consultation history (GET).
    pub historico: String,
    /// Registered-customer lookup by CPF (POST).
    pub cliente: String,
    /// Customer-base import (POST, raw array).
    pub cadastro_clientes: String,
    /// VCTEX protocol list (GET).
    pub vctex_protocolos: String,
    /// VCTEX protocol lookup / batch-query detail (POST).
    pub vctex_consulta_lote: String,
}

/// Facta partner token endpoints per environment. The exchange itself is
/// simulated (see the `facta` module); the URLs are kept so a real
/// integration has them at hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facta {
    pub url_homologacao: String,
    pub url_producao: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.http_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("app.http_timeout_seconds must be > 0"));
    }

    if cfg.endpoints.consulta.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.consulta must be non-empty"));
    }
    if cfg.endpoints.lote_inserir.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.lote_inserir must be non-empty"));
    }
    if cfg.endpoints.lote_iniciar.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.lote_iniciar must be non-empty"));
    }
    if cfg.endpoints.lote_historico.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.lote_historico must be non-empty"));
    }
    if cfg.endpoints.historico.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.historico must be non-empty"));
    }
    if cfg.endpoints.cliente.trim().is_empty() {
        return Err(ConfigError::Invalid("endpoints.cliente must be non-empty"));
    }
    if cfg.endpoints.cadastro_clientes.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "endpoints.cadastro_clientes must be non-empty",
        ));
    }
    if cfg.endpoints.vctex_protocolos.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "endpoints.vctex_protocolos must be non-empty",
        ));
    }
    if cfg.endpoints.vctex_consulta_lote.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "endpoints.vctex_consulta_lote must be non-empty",
        ));
    }

    if cfg.facta.url_homologacao.trim().is_empty() {
        return Err(ConfigError::Invalid("facta.url_homologacao must be non-empty"));
    }
    if cfg.facta.url_producao.trim().is_empty() {
        return Err(ConfigError::Invalid("facta.url_producao must be non-empty"));
    }

    Ok(())
}

/// Example YAML configuration, printed by `config exemplo`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 500
  http_timeout_seconds: 30

endpoints:
  consulta: "https://example-workflows.host/webhook/consulta"
  lote_inserir: "https://example-workflows.host/webhook/inserindo-consulta-lot"
  lote_iniciar: "https://example-workflows.host/webhook/iniciando-consulta-lot"
  lote_historico: "https://example-workflows.host/webhook/historico-lotes"
  historico: "https://example-workflows.host/webhook/inserindo-consulta"
  cliente: "https://example-workflows.host/webhook/consultacpf"
  cadastro_clientes: "https://example-workflows.host/webhook/cadastro/clientes"
  vctex_protocolos: "https://example-workflows.host/webhook/vctex/protocolos"
  vctex_consulta_lote: "https://example-workflows.host/webhook/vctex/consultalote"

facta:
  url_homologacao: "https://webservice-homol.facta.com.br/gera-token"
  url_producao: "https://webservice.facta.com.br/gera-token"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.poll_interval_ms, 500);
    }

    #[test]
    fn invalid_poll_interval() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.poll_interval_ms = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("poll_interval_ms")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_endpoints() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.endpoints.consulta = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("endpoints.consulta")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.endpoints.vctex_consulta_lote = "  ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_facta_urls() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.facta.url_homologacao = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("url_homologacao")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.http_timeout_seconds, 30);
    }
}
