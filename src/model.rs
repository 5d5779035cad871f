use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome classification of a single consultation record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusConsulta {
    Pendente,
    Processando,
    ComSaldo,
    SemSaldo,
    Erro,
}

impl StatusConsulta {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusConsulta::Pendente => "pendente",
            StatusConsulta::Processando => "processando",
            StatusConsulta::ComSaldo => "com_saldo",
            StatusConsulta::SemSaldo => "sem_saldo",
            StatusConsulta::Erro => "erro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pendente" => Some(StatusConsulta::Pendente),
            "processando" => Some(StatusConsulta::Processando),
            "com_saldo" => Some(StatusConsulta::ComSaldo),
            "sem_saldo" => Some(StatusConsulta::SemSaldo),
            "erro" => Some(StatusConsulta::Erro),
            _ => None,
        }
    }

    /// Human-readable label used in tables and CSV exports.
    pub fn rotulo(&self) -> &'static str {
        match self {
            StatusConsulta::Pendente => "Pendente",
            StatusConsulta::Processando => "Processando",
            StatusConsulta::ComSaldo => "Com Saldo",
            StatusConsulta::SemSaldo => "Sem Saldo",
            StatusConsulta::Erro => "Erro",
        }
    }
}

/// Campaign loop state. `Idle` is both the initial and the terminal state;
/// a completed or stopped campaign can be started again and will pick up
/// whatever records are still pending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EstadoCampanha {
    Idle,
    Running,
    Paused,
}

impl EstadoCampanha {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoCampanha::Idle => "idle",
            EstadoCampanha::Running => "running",
            EstadoCampanha::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(EstadoCampanha::Idle),
            "running" => Some(EstadoCampanha::Running),
            "paused" => Some(EstadoCampanha::Paused),
            _ => None,
        }
    }
}

/// Proposal lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusProposta {
    Pendente,
    EmAnalise,
    Aprovada,
    Negada,
}

impl StatusProposta {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusProposta::Pendente => "pendente",
            StatusProposta::EmAnalise => "em_analise",
            StatusProposta::Aprovada => "aprovada",
            StatusProposta::Negada => "negada",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pendente" => Some(StatusProposta::Pendente),
            "em_analise" => Some(StatusProposta::EmAnalise),
            "aprovada" => Some(StatusProposta::Aprovada),
            "negada" => Some(StatusProposta::Negada),
            _ => None,
        }
    }

    /// Human-readable label used in tables and CSV exports.
    pub fn rotulo(&self) -> &'static str {
        match self {
            StatusProposta::Pendente => "Pendente",
            StatusProposta::EmAnalise => "Em Análise",
            StatusProposta::Aprovada => "Aprovada",
            StatusProposta::Negada => "Negada",
        }
    }
}

/// Facta API environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Ambiente {
    Homologacao,
    Producao,
}

impl Ambiente {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ambiente::Homologacao => "homologacao",
            Ambiente::Producao => "producao",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "homologacao" => Some(Ambiente::Homologacao),
            "producao" => Some(Ambiente::Producao),
            _ => None,
        }
    }
}

/// One normalized installment of a release schedule, whichever of the two
/// partner formats it arrived in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parcela {
    pub vencimento: String,
    pub valor: f64,
}

/// Counters shown in the campaign statistics panel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumoCampanha {
    pub total: i64,
    pub com_saldo: i64,
    pub sem_saldo: i64,
    pub erros: i64,
    pub pendentes: i64,
}

impl ResumoCampanha {
    /// Records already resolved one way or another.
    pub fn processados(&self) -> i64 {
        self.com_saldo + self.sem_saldo + self.erros
    }
}

/// Counters for the proposal tracking view.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumoPropostas {
    pub total: i64,
    pub pendentes: i64,
    pub em_analise: i64,
    pub aprovadas: i64,
    pub negadas: i64,
}

/// A submitted batch as reported by the remote batch-history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoteRemoto {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub batch_id: String,
    #[serde(default)]
    pub type_consultation: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub total_records: i64,
    #[serde(default)]
    pub processed_records: i64,
    #[serde(default)]
    pub status: String,
}

/// Stored Facta credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credenciais {
    pub usuario: String,
    pub senha: String,
    pub ambiente: Ambiente,
}

/// A generated (simulated) Facta bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub token: String,
    pub expira_em: DateTime<Utc>,
    pub gerado_em: DateTime<Utc>,
}
