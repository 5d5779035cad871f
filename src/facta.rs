//! Facta credential and token management.
//!
//! The token exchange is a simulation: no request ever leaves the process.
//! What is real is the shape of the flow the operator sees (save
//! credentials, generate a bearer valid for one hour, watch the countdown)
//! and the `Basic` material a real exchange would send, so the environment
//! URLs in the configuration are ready for a future live integration.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config;
use crate::model::{Ambiente, Credenciais, Token};

/// Fixed validity of a generated token.
pub fn validade() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Error)]
pub enum FactaError {
    #[error("Por favor, preencha o usuário e senha.")]
    CamposObrigatorios,
    #[error("Salve suas credenciais antes de gerar um token.")]
    SemCredenciais,
}

/// Presence check before saving credentials.
pub fn validar_credenciais(usuario: &str, senha: &str) -> Result<(), FactaError> {
    if usuario.trim().is_empty() || senha.trim().is_empty() {
        return Err(FactaError::CamposObrigatorios);
    }
    Ok(())
}

/// The HTTP Basic material a real token exchange would send.
pub fn material_basico(credenciais: &Credenciais) -> String {
    STANDARD.encode(format!("{}:{}", credenciais.usuario, credenciais.senha))
}

/// Token endpoint for the selected environment.
pub fn url_token(facta: &config::Facta, ambiente: Ambiente) -> &str {
    match ambiente {
        Ambiente::Homologacao => &facta.url_homologacao,
        Ambiente::Producao => &facta.url_producao,
    }
}

/// Generate a simulated bearer token valid for one hour. Deterministic for a
/// given credential pair, which keeps the simulation honest about never
/// talking to the partner.
pub fn gerar_token(credenciais: &Credenciais, agora: DateTime<Utc>) -> Token {
    Token {
        token: material_basico(credenciais),
        expira_em: agora + validade(),
        gerado_em: agora,
    }
}

/// Countdown label shown next to an active token: `Nm Ss`, or `Expirado`.
pub fn tempo_restante(token: &Token, agora: DateTime<Utc>) -> String {
    let restante = token.expira_em - agora;
    if restante <= Duration::zero() {
        return "Expirado".to_string();
    }
    let minutos = restante.num_minutes();
    let segundos = restante.num_seconds() % 60;
    format!("{minutos}m {segundos}s")
}

/// Expiry rendered the way the dashboard shows it.
pub fn expira_formatado(token: &Token) -> String {
    token.expira_em.format("%d/%m/%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credenciais() -> Credenciais {
        Credenciais {
            usuario: "operador".into(),
            senha: "segredo".into(),
            ambiente: Ambiente::Homologacao,
        }
    }

    #[test]
    fn valida_presenca_de_campos() {
        assert!(validar_credenciais("user", "pass").is_ok());
        assert!(matches!(
            validar_credenciais("", "pass"),
            Err(FactaError::CamposObrigatorios)
        ));
        assert!(matches!(
            validar_credenciais("user", "  "),
            Err(FactaError::CamposObrigatorios)
        ));
    }

    #[test]
    fn material_basico_e_base64_de_usuario_senha() {
        // "operador:segredo" in base64.
        assert_eq!(material_basico(&credenciais()), "b3BlcmFkb3I6c2VncmVkbw==");
    }

    #[test]
    fn token_expira_em_uma_hora() {
        let agora = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let token = gerar_token(&credenciais(), agora);
        assert_eq!(token.expira_em, agora + Duration::hours(1));
        assert_eq!(token.gerado_em, agora);
        assert!(!token.token.is_empty());
    }

    #[test]
    fn contagem_regressiva() {
        let agora = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let token = gerar_token(&credenciais(), agora);
        assert_eq!(tempo_restante(&token, agora), "60m 0s");
        assert_eq!(
            tempo_restante(&token, agora + Duration::minutes(59) + Duration::seconds(30)),
            "0m 30s"
        );
        assert_eq!(
            tempo_restante(&token, agora + Duration::hours(2)),
            "Expirado"
        );
    }

    #[test]
    fn url_por_ambiente() {
        let cfg: crate::config::Config = serde_yaml::from_str(config::example()).unwrap();
        assert!(url_token(&cfg.facta, Ambiente::Homologacao).contains("homol"));
        assert!(!url_token(&cfg.facta, Ambiente::Producao).contains("homol"));
    }
}
