use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EstadoCampanha, StatusConsulta, StatusProposta};

/// One bulk-consultation campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campanha {
    pub id: i64,
    pub nome: String,
    pub arquivo_nome: Option<String>,
    pub batch_id: Option<String>,
    pub batch_status: Option<String>,
    pub estado: EstadoCampanha,
    pub created_at: DateTime<Utc>,
    pub finalizada_em: Option<DateTime<Utc>>,
}

/// One consultation record, either belonging to a campaign or standalone
/// (individual queries are recorded with `campanha_id = NULL`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultaRow {
    pub id: i64,
    pub campanha_id: Option<i64>,
    pub request_id: String,
    pub cpf: String,
    pub nome: Option<String>,
    pub telefone: Option<String>,
    pub status: StatusConsulta,
    pub valor_liberado: Option<f64>,
    pub banco: Option<String>,
    pub mensagem: Option<String>,
    pub log: Option<String>,
    pub api_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One loan proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropostaRow {
    pub id: i64,
    pub cliente: String,
    pub cpf: String,
    pub banco: String,
    pub valor: f64,
    pub prazo: Option<i64>,
    pub taxa: Option<f64>,
    pub data_nascimento: String,
    pub telefone: Option<String>,
    pub observacoes: Option<String>,
    pub status: StatusProposta,
    pub data_envio: DateTime<Utc>,
    pub data_situacao: Option<DateTime<Utc>>,
}
