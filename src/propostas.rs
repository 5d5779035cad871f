//! Loan proposal entry and tracking.
use chrono::NaiveDate;
use thiserror::Error;

use crate::db::PropostaRow;
use crate::format::formatar_cpf;
use crate::model::{ResumoPropostas, StatusProposta};

/// Partner banks accepted for proposal entry.
pub const BANCOS: [&str; 5] = ["FACTA", "VCTEX", "ICRED", "BMG", "MERCANTIL"];

#[derive(Debug, Error)]
pub enum PropostaError {
    #[error("Por favor, preencha todos os campos obrigatórios.")]
    CamposObrigatorios,
    #[error("Banco inválido: {0}. Bancos aceitos: FACTA, VCTEX, ICRED, BMG, MERCANTIL.")]
    BancoInvalido(String),
    #[error("Valor inválido: {0}")]
    ValorInvalido(String),
}

/// Raw proposal form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct NovaProposta {
    pub cliente: String,
    pub cpf: String,
    pub banco: String,
    pub valor: String,
    pub prazo: Option<i64>,
    pub taxa: Option<f64>,
    pub data_nascimento: String,
    pub telefone: Option<String>,
    pub observacoes: Option<String>,
}

/// A proposal that passed validation and is ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PropostaValidada {
    pub cliente: String,
    pub cpf: String,
    pub banco: String,
    pub valor: f64,
    pub prazo: Option<i64>,
    pub taxa: Option<f64>,
    pub data_nascimento: String,
    pub telefone: Option<String>,
    pub observacoes: Option<String>,
}

/// Validate the required fields (banco, cliente, cpf, data de nascimento,
/// valor), the bank whitelist and the monetary value; the CPF is normalized
/// to 11 digits.
pub fn validar(nova: &NovaProposta) -> Result<PropostaValidada, PropostaError> {
    if nova.banco.trim().is_empty()
        || nova.cliente.trim().is_empty()
        || nova.cpf.trim().is_empty()
        || nova.data_nascimento.trim().is_empty()
        || nova.valor.trim().is_empty()
    {
        return Err(PropostaError::CamposObrigatorios);
    }

    let banco = nova.banco.trim().to_uppercase();
    if !BANCOS.contains(&banco.as_str()) {
        return Err(PropostaError::BancoInvalido(nova.banco.clone()));
    }

    let valor = interpretar_valor(&nova.valor)
        .ok_or_else(|| PropostaError::ValorInvalido(nova.valor.clone()))?;
    if valor <= 0.0 {
        return Err(PropostaError::ValorInvalido(nova.valor.clone()));
    }

    Ok(PropostaValidada {
        cliente: nova.cliente.trim().to_string(),
        cpf: formatar_cpf(&nova.cpf),
        banco,
        valor,
        prazo: nova.prazo,
        taxa: nova.taxa,
        data_nascimento: nova.data_nascimento.trim().to_string(),
        telefone: nova.telefone.clone(),
        observacoes: nova.observacoes.clone(),
    })
}

/// Parse a monetary value in pt-BR notation (`5.000,00`, `R$ 1.234,56`) or
/// plain decimal (`5000.00`).
pub fn interpretar_valor(texto: &str) -> Option<f64> {
    let limpo = texto.trim().trim_start_matches("R$").trim();
    if limpo.is_empty() {
        return None;
    }
    let normalizado = if limpo.contains(',') {
        limpo.replace('.', "").replace(',', ".")
    } else {
        limpo.to_string()
    };
    normalizado.parse().ok()
}

#[derive(Debug, Clone, Default)]
pub struct FiltroPropostas {
    pub status: Option<StatusProposta>,
    pub banco: Option<String>,
    pub busca: Option<String>,
    pub inicio: Option<NaiveDate>,
    pub fim: Option<NaiveDate>,
}

pub fn filtrar(propostas: Vec<PropostaRow>, filtro: &FiltroPropostas) -> Vec<PropostaRow> {
    propostas
        .into_iter()
        .filter(|proposta| {
            if let Some(status) = filtro.status {
                if proposta.status != status {
                    return false;
                }
            }
            if let Some(banco) = &filtro.banco {
                if !proposta.banco.eq_ignore_ascii_case(banco) {
                    return false;
                }
            }
            if let Some(termo) = &filtro.busca {
                let termo = termo.to_lowercase();
                if !proposta.cliente.to_lowercase().contains(&termo)
                    && !proposta.cpf.contains(&termo)
                {
                    return false;
                }
            }
            let data = proposta.data_envio.date_naive();
            if let Some(inicio) = filtro.inicio {
                if data < inicio {
                    return false;
                }
            }
            if let Some(fim) = filtro.fim {
                if data > fim {
                    return false;
                }
            }
            true
        })
        .collect()
}

pub fn resumo(propostas: &[PropostaRow]) -> ResumoPropostas {
    let mut resumo = ResumoPropostas {
        total: propostas.len() as i64,
        ..Default::default()
    };
    for proposta in propostas {
        match proposta.status {
            StatusProposta::Pendente => resumo.pendentes += 1,
            StatusProposta::EmAnalise => resumo.em_analise += 1,
            StatusProposta::Aprovada => resumo.aprovadas += 1,
            StatusProposta::Negada => resumo.negadas += 1,
        }
    }
    resumo
}
