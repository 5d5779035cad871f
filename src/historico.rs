//! History filtering and statistics.
//!
//! Filtering happens in memory over the full list, the way the dashboard
//! filtered whatever the history endpoint returned: a text term matches CPF
//! or name, the end date is inclusive until end of day, and the error bucket
//! of the statistics counts everything that is neither `com_saldo` nor
//! `sem_saldo`.
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::ConsultaRow;
use crate::model::StatusConsulta;

#[derive(Debug, Clone, Default)]
pub struct FiltroHistorico {
    pub status: Option<StatusConsulta>,
    pub banco: Option<String>,
    pub busca: Option<String>,
    pub inicio: Option<NaiveDate>,
    pub fim: Option<NaiveDate>,
}

pub fn filtrar(registros: Vec<ConsultaRow>, filtro: &FiltroHistorico) -> Vec<ConsultaRow> {
    registros
        .into_iter()
        .filter(|registro| {
            if let Some(status) = filtro.status {
                if registro.status != status {
                    return false;
                }
            }
            if let Some(banco) = &filtro.banco {
                if registro.banco.as_deref() != Some(banco.as_str()) {
                    return false;
                }
            }
            if let Some(termo) = &filtro.busca {
                let termo = termo.to_lowercase();
                let bate_cpf = registro.cpf.to_lowercase().contains(&termo);
                let bate_nome = registro
                    .nome
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&termo))
                    .unwrap_or(false);
                if !bate_cpf && !bate_nome {
                    return false;
                }
            }
            let data = registro.created_at.date_naive();
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

/// The statistics tiles above the history table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Estatisticas {
    pub total: i64,
    pub com_saldo: i64,
    pub sem_saldo: i64,
    pub erro: i64,
}

pub fn estatisticas(registros: &[ConsultaRow]) -> Estatisticas {
    let mut stats = Estatisticas {
        total: registros.len() as i64,
        ..Default::default()
    };
    for registro in registros {
        match registro.status {
            StatusConsulta::ComSaldo => stats.com_saldo += 1,
            StatusConsulta::SemSaldo => stats.sem_saldo += 1,
            _ => stats.erro += 1,
        }
    }
    stats
}

/// Distinct banks present in the records, for the filter dropdown
/// equivalent.
pub fn bancos_disponiveis(registros: &[ConsultaRow]) -> Vec<String> {
    let mut bancos: Vec<String> = registros
        .iter()
        .filter_map(|r| r.banco.clone())
        .filter(|b| !b.is_empty())
        .collect();
    bancos.sort();
    bancos.dedup();
    bancos
}

/// One record of the remote history endpoint, read leniently: every field
/// the partner may omit defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsultaRemota {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub batch_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub cpf: String,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub valor_liberado: String,
    #[serde(default)]
    pub banco: String,
    #[serde(default)]
    pub mensagem: String,
    #[serde(default)]
    pub created_at: String,
}

/// Parse the remote history payload; anything that is not an array of
/// objects yields an empty list.
pub fn ler_historico_remoto(valor: serde_json::Value) -> Vec<ConsultaRemota> {
    serde_json::from_value(valor).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn registro(cpf: &str, nome: &str, banco: &str, status: StatusConsulta, dia: u32) -> ConsultaRow {
        ConsultaRow {
            id: 0,
            campanha_id: None,
            request_id: "r".into(),
            cpf: cpf.into(),
            nome: Some(nome.into()),
            telefone: None,
            status,
            valor_liberado: None,
            banco: Some(banco.into()),
            mensagem: None,
            log: None,
            api_response: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, dia, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn filtra_por_status_banco_e_termo() {
        let registros = vec![
            registro("11111111111", "Ana", "FACTA", StatusConsulta::ComSaldo, 1),
            registro("22222222222", "Bruno", "BMG", StatusConsulta::SemSaldo, 2),
            registro("33333333333", "Carla", "FACTA", StatusConsulta::Erro, 3),
        ];

        let filtro = FiltroHistorico {
            status: Some(StatusConsulta::ComSaldo),
            ..Default::default()
        };
        assert_eq!(filtrar(registros.clone(), &filtro).len(), 1);

        let filtro = FiltroHistorico {
            banco: Some("FACTA".into()),
            ..Default::default()
        };
        assert_eq!(filtrar(registros.clone(), &filtro).len(), 2);

        let filtro = FiltroHistorico {
            busca: Some("bru".into()),
            ..Default::default()
        };
        let achados = filtrar(registros.clone(), &filtro);
        assert_eq!(achados.len(), 1);
        assert_eq!(achados[0].nome.as_deref(), Some("Bruno"));

        let filtro = FiltroHistorico {
            busca: Some("2222".into()),
            ..Default::default()
        };
        assert_eq!(filtrar(registros, &filtro).len(), 1);
    }

    #[test]
    fn intervalo_de_datas_inclusivo() {
        let registros = vec![
            registro("1", "a", "X", StatusConsulta::ComSaldo, 1),
            registro("2", "b", "X", StatusConsulta::ComSaldo, 5),
            registro("3", "c", "X", StatusConsulta::ComSaldo, 9),
        ];
        let filtro = FiltroHistorico {
            inicio: NaiveDate::from_ymd_opt(2024, 3, 2),
            fim: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let achados = filtrar(registros, &filtro);
        assert_eq!(achados.len(), 1);
        assert_eq!(achados[0].cpf, "2");
    }

    #[test]
    fn estatisticas_agrupam_erro_por_exclusao() {
        let registros = vec![
            registro("1", "a", "X", StatusConsulta::ComSaldo, 1),
            registro("2", "b", "X", StatusConsulta::SemSaldo, 1),
            registro("3", "c", "X", StatusConsulta::Erro, 1),
            registro("4", "d", "X", StatusConsulta::Pendente, 1),
        ];
        let stats = estatisticas(&registros);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.com_saldo, 1);
        assert_eq!(stats.sem_saldo, 1);
        assert_eq!(stats.erro, 2);
    }

    #[test]
    fn bancos_unicos_ordenados() {
        let registros = vec![
            registro("1", "a", "FACTA", StatusConsulta::ComSaldo, 1),
            registro("2", "b", "BMG", StatusConsulta::ComSaldo, 1),
            registro("3", "c", "FACTA", StatusConsulta::ComSaldo, 1),
        ];
        assert_eq!(bancos_disponiveis(&registros), vec!["BMG", "FACTA"]);
    }

    #[test]
    fn historico_remoto_leniente() {
        let lista = ler_historico_remoto(json!([
            {"cpf": "12345678900", "status": "com_saldo"},
            {"cpf": "98765432100"}
        ]));
        assert_eq!(lista.len(), 2);
        assert_eq!(lista[0].status, "com_saldo");
        assert_eq!(lista[1].status, "");

        assert!(ler_historico_remoto(json!({"nada": true})).is_empty());
    }
}
